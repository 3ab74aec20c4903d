/// The trail record and its fixed attribute set.
///
/// A `Trail` is one row of the trailheads dataset. Its attributes are addressed
/// by name in three places: CSV header cells, filter criteria keys and JSON
/// keys. All three use the exact, case-sensitive names listed in [`Field::ALL`].
///
/// Name lookup goes through the `Field` enum rather than anything dynamic:
///
/// ```rust,ignore
/// let field = Field::from_name("RESTROOMS");      // Some(Field::Restrooms)
/// let missing = Field::from_name("restrooms");    // None, names are case-sensitive
/// trail.value(Field::Restrooms);                  // &str
/// ```
///
/// An unknown name resolving to `None` is what lets the parser ignore extra
/// columns and lets the filter reject criteria it cannot evaluate.
use serde::{Deserialize, Serialize};
use std::fmt;

/// One attribute of a [`Trail`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    AccessName,
    Restrooms,
    Picnic,
    Fishing,
    Fee,
    BikeRack,
    BikeTrail,
    DogTube,
    Grills,
    AdaToilet,
    AdaFishing,
    AdaCamping,
    AdaPicnic,
    AdaTrail,
    AdaParking,
    AdaFacilit,
    HorseTrail,
    RecycleBin,
    DogCompost,
    ThLeash,
}

impl Field {
    /// Every attribute, in display order
    pub const ALL: [Field; 20] = [
        Field::AccessName,
        Field::Restrooms,
        Field::Picnic,
        Field::Fishing,
        Field::Fee,
        Field::BikeRack,
        Field::BikeTrail,
        Field::DogTube,
        Field::Grills,
        Field::AdaToilet,
        Field::AdaFishing,
        Field::AdaCamping,
        Field::AdaPicnic,
        Field::AdaTrail,
        Field::AdaParking,
        Field::AdaFacilit,
        Field::HorseTrail,
        Field::RecycleBin,
        Field::DogCompost,
        Field::ThLeash,
    ];

    /// The canonical attribute name, as it appears in CSV headers
    pub fn name(self) -> &'static str {
        match self {
            Field::AccessName => "AccessName",
            Field::Restrooms => "RESTROOMS",
            Field::Picnic => "PICNIC",
            Field::Fishing => "FISHING",
            Field::Fee => "Fee",
            Field::BikeRack => "BikeRack",
            Field::BikeTrail => "BikeTrail",
            Field::DogTube => "DogTube",
            Field::Grills => "Grills",
            Field::AdaToilet => "ADAtoilet",
            Field::AdaFishing => "ADAfishing",
            Field::AdaCamping => "ADAcamping",
            Field::AdaPicnic => "ADApicnic",
            Field::AdaTrail => "ADAtrail",
            Field::AdaParking => "ADAparking",
            Field::AdaFacilit => "ADAfacilit",
            Field::HorseTrail => "HorseTrail",
            Field::RecycleBin => "RecycleBin",
            Field::DogCompost => "DogCompost",
            Field::ThLeash => "THLeash",
        }
    }

    /// The lowercase key used for CLI flags and HTTP query parameters
    pub fn query_key(self) -> String {
        self.name().to_ascii_lowercase()
    }

    /// Resolves a canonical attribute name. Matching is case-sensitive.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.name() == name)
    }

    /// Resolves a lowercase CLI flag / query parameter key
    pub fn from_query_key(key: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One trail-access facility
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trail {
    #[serde(rename = "AccessName")]
    pub access_name: String,
    #[serde(rename = "RESTROOMS")]
    pub restrooms: String,
    #[serde(rename = "PICNIC")]
    pub picnic: String,
    #[serde(rename = "FISHING")]
    pub fishing: String,
    #[serde(rename = "Fee")]
    pub fee: String,
    #[serde(rename = "BikeRack")]
    pub bike_rack: String,
    #[serde(rename = "BikeTrail")]
    pub bike_trail: String,
    #[serde(rename = "DogTube")]
    pub dog_tube: String,
    #[serde(rename = "Grills")]
    pub grills: String,
    #[serde(rename = "ADAtoilet")]
    pub ada_toilet: String,
    #[serde(rename = "ADAfishing")]
    pub ada_fishing: String,
    #[serde(rename = "ADAcamping")]
    pub ada_camping: String,
    #[serde(rename = "ADApicnic")]
    pub ada_picnic: String,
    #[serde(rename = "ADAtrail")]
    pub ada_trail: String,
    #[serde(rename = "ADAparking")]
    pub ada_parking: String,
    #[serde(rename = "ADAfacilit")]
    pub ada_facilit: String,
    #[serde(rename = "HorseTrail")]
    pub horse_trail: String,
    #[serde(rename = "RecycleBin")]
    pub recycle_bin: String,
    #[serde(rename = "DogCompost")]
    pub dog_compost: String,
    #[serde(rename = "THLeash")]
    pub th_leash: String,
}

impl Trail {
    /// Creates an empty trail with every attribute set to ""
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds a trail from `(field, value)` pairs, leaving the rest empty
    pub fn with_values<'a>(values: impl IntoIterator<Item = (Field, &'a str)>) -> Self {
        let mut trail = Trail::new();
        for (field, value) in values {
            trail.set(field, value);
        }
        trail
    }

    /// Returns the value of an attribute
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::AccessName => &self.access_name,
            Field::Restrooms => &self.restrooms,
            Field::Picnic => &self.picnic,
            Field::Fishing => &self.fishing,
            Field::Fee => &self.fee,
            Field::BikeRack => &self.bike_rack,
            Field::BikeTrail => &self.bike_trail,
            Field::DogTube => &self.dog_tube,
            Field::Grills => &self.grills,
            Field::AdaToilet => &self.ada_toilet,
            Field::AdaFishing => &self.ada_fishing,
            Field::AdaCamping => &self.ada_camping,
            Field::AdaPicnic => &self.ada_picnic,
            Field::AdaTrail => &self.ada_trail,
            Field::AdaParking => &self.ada_parking,
            Field::AdaFacilit => &self.ada_facilit,
            Field::HorseTrail => &self.horse_trail,
            Field::RecycleBin => &self.recycle_bin,
            Field::DogCompost => &self.dog_compost,
            Field::ThLeash => &self.th_leash,
        }
    }

    /// Looks up an attribute by its canonical name; `None` for unknown names
    pub fn value_by_name(&self, name: &str) -> Option<&str> {
        Field::from_name(name).map(|field| self.value(field))
    }

    /// Overwrites an attribute with a raw value
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.value_mut(field) = value.into();
    }

    fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::AccessName => &mut self.access_name,
            Field::Restrooms => &mut self.restrooms,
            Field::Picnic => &mut self.picnic,
            Field::Fishing => &mut self.fishing,
            Field::Fee => &mut self.fee,
            Field::BikeRack => &mut self.bike_rack,
            Field::BikeTrail => &mut self.bike_trail,
            Field::DogTube => &mut self.dog_tube,
            Field::Grills => &mut self.grills,
            Field::AdaToilet => &mut self.ada_toilet,
            Field::AdaFishing => &mut self.ada_fishing,
            Field::AdaCamping => &mut self.ada_camping,
            Field::AdaPicnic => &mut self.ada_picnic,
            Field::AdaTrail => &mut self.ada_trail,
            Field::AdaParking => &mut self.ada_parking,
            Field::AdaFacilit => &mut self.ada_facilit,
            Field::HorseTrail => &mut self.horse_trail,
            Field::RecycleBin => &mut self.recycle_bin,
            Field::DogCompost => &mut self.dog_compost,
            Field::ThLeash => &mut self.th_leash,
        }
    }

    /// Iterates `(field, value)` pairs in display order
    pub fn entries(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .map(move |field| (field, self.value(field)))
    }
}
