/// Partial-match filtering of trail batches.
///
/// Criteria map an attribute name to a substring. A trail survives when every
/// non-empty criterion is contained in the matching attribute, compared
/// case-insensitively after trimming both sides:
///
/// ```rust,ignore
/// let criteria: Criteria = [("RESTROOMS", "yes"), ("Fee", "")].into_iter().collect();
/// // "Fee" is empty, so only RESTROOMS constrains the result
/// let kept = filter_trails_parallel(&batch, &criteria);
/// ```
///
/// # Parallel evaluation
///
/// A batch is cut into at most [`PARTITION_COUNT`] contiguous slices, and each
/// slice is scanned on its own rayon task. Workers push their survivors into a
/// channel with one slot per slice, and the caller waits on the scope barrier
/// before draining it. Order inside a slice is kept; the order in which slices
/// are concatenated is whatever order the workers finished in.
///
/// # Unknown attributes
///
/// A non-empty criterion naming an attribute that `Trail` does not have can never
/// be satisfied, so it rejects every trail. Empty criteria are ignored no matter
/// what they are named.
use crossbeam_channel::bounded;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::trail::{Field, Trail};

/// Number of slices a batch is split into
pub const PARTITION_COUNT: usize = 4;

/// Attribute name to required substring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    entries: BTreeMap<String, String>,
}

impl Criteria {
    /// Creates criteria that accept every trail
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the substring required for `name`, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Builder form of [`Criteria::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builds criteria from lowercase keys (CLI flags, query parameters).
    ///
    /// Keys that name a known attribute are mapped to its canonical name; any
    /// other key is kept verbatim, so a non-empty value for it rejects everything.
    pub fn from_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut criteria = Criteria::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let name = Field::from_query_key(key)
                .map(|field| field.name().to_string())
                .unwrap_or_else(|| key.to_string());
            criteria.insert(name, value);
        }
        criteria
    }

    /// Returns the substring required for `name`, if any was set
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Criteria with a non-empty value
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// True when no criterion constrains the result
    pub fn is_unconstrained(&self) -> bool {
        self.active().next().is_none()
    }

    /// Evaluates every active criterion against `trail`, stopping at the first miss
    pub fn matches(&self, trail: &Trail) -> bool {
        for (name, wanted) in self.active() {
            match trail.value_by_name(name) {
                Some(value) if matches_partial(value, wanted) => {}
                _ => return false,
            }
        }
        true
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut criteria = Criteria::new();
        for (name, value) in iter {
            criteria.insert(name, value);
        }
        criteria
    }
}

/// Case-insensitive substring test with both sides trimmed
pub fn matches_partial(field_value: &str, filter_value: &str) -> bool {
    field_value
        .trim()
        .to_lowercase()
        .contains(&filter_value.trim().to_lowercase())
}

/// Splits `len` items into at most [`PARTITION_COUNT`] contiguous ranges.
///
/// Each range holds at least one item and the last one absorbs the remainder.
pub fn partition_bounds(len: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }

    let count = PARTITION_COUNT.min(len);
    let size = len / count;
    (0..count)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == count { len } else { start + size };
            start..end
        })
        .collect()
}

/// Keeps the trails of one slice that satisfy `criteria`, in slice order
pub fn filter_slice(trails: &[Trail], criteria: &Criteria) -> Vec<Trail> {
    trails
        .iter()
        .filter(|trail| criteria.matches(trail))
        .cloned()
        .collect()
}

/// Filters a batch across parallel workers.
///
/// Runs on the current rayon pool; call it inside `ThreadPool::install` to pin
/// it to a dedicated pool. Returns only after every worker has finished.
pub fn filter_trails_parallel(trails: &[Trail], criteria: &Criteria) -> Vec<Trail> {
    let ranges = partition_bounds(trails.len());
    if ranges.is_empty() {
        return Vec::new();
    }

    // One slot per worker, so no send ever blocks inside the scope
    let (sender, receiver) = bounded(ranges.len());

    rayon::scope(|scope| {
        for range in ranges {
            let slice = &trails[range];
            let sender = sender.clone();
            scope.spawn(move |_| {
                let kept = filter_slice(slice, criteria);
                // The receiver lives past the scope, so this cannot fail
                let _ = sender.send(kept);
            });
        }
    });
    drop(sender);

    let mut results = Vec::with_capacity(trails.len() / 10);
    for kept in receiver {
        results.extend(kept);
    }
    results
}
