/// Streaming CSV parsing with batched hand-off.
///
/// The parser runs on its own thread and talks to the consumer over two
/// channels:
///
/// - a bounded **batch** channel carrying `Vec<Trail>` chunks of at most
///   `batch_size` trails, closed when the parser stops;
/// - a one-slot **status** channel that receives exactly one value: `Ok(())`
///   after the last batch, or the error that stopped the parse.
///
/// The two channels race. A consumer keeps selecting over both until the batch
/// channel is closed and a status has arrived; [`BatchChannels::drain`] does
/// exactly that.
///
/// ```rust,ignore
/// let channels = spawn_parser(reader, NonZeroUsize::new(100).unwrap())?;
/// let mut trails = Vec::new();
/// channels.drain(|batch| trails.extend(batch))?;
/// ```
///
/// # Row handling
///
/// The first record is the header. Its cells are matched against [`Field`]
/// names; unknown columns are ignored and, for duplicate names, the last
/// column wins. A data row whose field count differs from the header's is
/// skipped. Any other read failure (invalid UTF-8, I/O error) ends the parse:
/// batches already sent stay delivered, the partially filled batch is dropped.
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::num::NonZeroUsize;
use std::thread::{self, JoinHandle};

use crate::errors::{TrailError, TrailResult};
use crate::trail::{Field, Trail};

/// Batches the parser may queue ahead of the consumer
pub const BATCH_CHANNEL_CAPACITY: usize = 1;

/// A chunk of consecutive trails, in source order
pub type Batch = Vec<Trail>;

/// Terminal outcome of a parse
pub type ParseStatus = TrailResult<()>;

/// Maps known attributes to the column that holds them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    width: usize,
    columns: Vec<(Field, usize)>,
}

impl HeaderIndex {
    /// Indexes a header record; the last occurrence of a repeated name wins
    pub fn from_header(header: &StringRecord) -> Self {
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (i, name) in header.iter().enumerate() {
            let name = if i == 0 {
                name.trim_start_matches('\u{feff}')
            } else {
                name
            };
            positions.insert(name, i);
        }

        let mut columns: Vec<(Field, usize)> = positions
            .into_iter()
            .filter_map(|(name, i)| Field::from_name(name).map(|field| (field, i)))
            .collect();
        columns.sort();

        Self {
            width: header.len(),
            columns,
        }
    }

    /// Number of cells in the header row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Column of `field`, if the header has it
    pub fn column(&self, field: Field) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, i)| *i)
    }

    /// Builds a trail from a data row. Values are copied raw.
    pub fn to_trail(&self, row: &StringRecord) -> Trail {
        let mut trail = Trail::new();
        for &(field, i) in &self.columns {
            if let Some(value) = row.get(i) {
                trail.set(field, value);
            }
        }
        trail
    }
}

/// Parses `reader` and streams batches to `batches`.
///
/// Blocks the calling thread until the input is exhausted, a read fails or the
/// consumer hangs up. Exactly one status is sent, unless the consumer is gone.
/// `batches` is dropped on return, which closes the batch channel.
pub fn parse_csv_concurrently<R: Read>(
    reader: R,
    batch_size: NonZeroUsize,
    batches: Sender<Batch>,
    status: Sender<ParseStatus>,
) {
    let _ = status.send(parse_into(reader, batch_size, &batches));
}

fn parse_into<R: Read>(
    reader: R,
    batch_size: NonZeroUsize,
    batches: &Sender<Batch>,
) -> ParseStatus {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut record = StringRecord::new();
    match csv_reader.read_record(&mut record) {
        Ok(true) => {}
        Ok(false) => return Err(TrailError::header_error("EOF")),
        Err(e) => return Err(TrailError::header_error(e)),
    }
    let index = HeaderIndex::from_header(&record);

    let batch_size = batch_size.get();
    let mut batch = Vec::with_capacity(batch_size);
    loop {
        match csv_reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(TrailError::record_error(e)),
        }
        if record.len() != index.width() {
            continue;
        }

        batch.push(index.to_trail(&record));
        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if batches.send(full).is_err() {
                // Consumer hung up; nobody is left to report to
                return Ok(());
            }
        }
    }

    if !batch.is_empty() && batches.send(batch).is_err() {
        return Ok(());
    }
    Ok(())
}

/// Consumer side of a running parse
#[derive(Debug)]
pub struct BatchChannels {
    pub batches: Receiver<Batch>,
    pub status: Receiver<ParseStatus>,
    handle: Option<JoinHandle<()>>,
}

impl BatchChannels {
    /// Receives every batch and the terminal status, in whatever order they
    /// arrive, calling `on_batch` for each batch.
    ///
    /// Returns the parser's error as soon as it is received; batches handed to
    /// `on_batch` before that are not retracted.
    pub fn drain<F>(mut self, mut on_batch: F) -> ParseStatus
    where
        F: FnMut(Batch),
    {
        let outcome = self.select_until_done(&mut on_batch);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(TrailError::record_error("CSV parser thread panicked"));
            }
        }
        outcome
    }

    /// Collects all batches into one vector, in emission order
    pub fn collect(self) -> TrailResult<Vec<Trail>> {
        let mut trails = Vec::new();
        self.drain(|batch| trails.extend(batch))?;
        Ok(trails)
    }

    fn select_until_done<F>(&self, on_batch: &mut F) -> ParseStatus
    where
        F: FnMut(Batch),
    {
        let closed_batches = never::<Batch>();
        let closed_status = never::<ParseStatus>();
        let mut batches_done = false;
        let mut status_done = false;

        while !(batches_done && status_done) {
            let batch_rx = if batches_done {
                &closed_batches
            } else {
                &self.batches
            };
            let status_rx = if status_done {
                &closed_status
            } else {
                &self.status
            };

            select! {
                recv(batch_rx) -> msg => match msg {
                    Ok(batch) => on_batch(batch),
                    Err(_) => batches_done = true,
                },
                recv(status_rx) -> msg => {
                    status_done = true;
                    match msg {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => return Err(e),
                        Err(_) => {
                            return Err(TrailError::record_error(
                                "CSV parser stopped without reporting a status",
                            ))
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Starts [`parse_csv_concurrently`] on a dedicated thread
pub fn spawn_parser<R>(reader: R, batch_size: NonZeroUsize) -> TrailResult<BatchChannels>
where
    R: Read + Send + 'static,
{
    let (batch_tx, batch_rx) = bounded(BATCH_CHANNEL_CAPACITY);
    let (status_tx, status_rx) = bounded(1);

    let handle = thread::Builder::new()
        .name("csv-parser".to_string())
        .spawn(move || parse_csv_concurrently(reader, batch_size, batch_tx, status_tx))?;

    Ok(BatchChannels {
        batches: batch_rx,
        status: status_rx,
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn parse_batches(input: &str, batch_size: usize) -> (Vec<Batch>, ParseStatus) {
        let reader = Cursor::new(input.as_bytes().to_vec());
        let channels = spawn_parser(reader, size(batch_size)).unwrap();
        let mut batches = Vec::new();
        let status = channels.drain(|batch| batches.push(batch));
        (batches, status)
    }

    fn named(name: &str, restrooms: &str, picnic: &str) -> Trail {
        Trail::with_values([
            (Field::AccessName, name),
            (Field::Restrooms, restrooms),
            (Field::Picnic, picnic),
        ])
    }

    /// Serves each sent chunk as one read, blocking until the next one arrives
    struct ChannelReader {
        chunks: Receiver<Vec<u8>>,
        pending: Cursor<Vec<u8>>,
    }

    impl Read for ChannelReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                let n = self.pending.read(buf)?;
                if n > 0 {
                    return Ok(n);
                }
                match self.chunks.recv() {
                    Ok(chunk) => self.pending = Cursor::new(chunk),
                    Err(_) => return Ok(0),
                }
            }
        }
    }

    #[test]
    fn test_parse_csv_concurrently() {
        let input = "AccessName,RESTROOMS,PICNIC\nTrail1,Yes,No\nTrail2,No,Yes\n";

        let (batches, status) = parse_batches(input, 2);
        assert!(status.is_ok());
        let expected = vec![
            named("Trail1", "Yes", "No"),
            named("Trail2", "No", "Yes"),
        ];
        assert_eq!(batches, vec![expected]);
    }

    #[test]
    fn test_trailing_partial_batch() {
        let input = "AccessName\nA\nB\nC\nD\nE\n";
        let (batches, status) = parse_batches(input, 2);
        assert!(status.is_ok());
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_batch_size_does_not_change_content() {
        let mut input = String::from("AccessName,RESTROOMS,PICNIC\n");
        for i in 0..23 {
            let restrooms = if i % 3 == 0 { "Yes" } else { "No" };
            input.push_str(&format!("Trail{i},{restrooms},No\n"));
        }

        let (whole, status) = parse_batches(&input, 23);
        assert!(status.is_ok());
        assert_eq!(whole.len(), 1);
        let expected = whole.concat();

        for batch_size in 1..=25 {
            let (batches, status) = parse_batches(&input, batch_size);
            assert!(status.is_ok());
            for batch in &batches {
                assert!(!batch.is_empty() && batch.len() <= batch_size);
            }
            assert_eq!(batches.concat(), expected, "batch size {batch_size}");
        }
    }

    #[test]
    fn test_ragged_rows_are_skipped() {
        let input = "AccessName,RESTROOMS,PICNIC\n\
                     Trail1,Yes,No\n\
                     Short,Yes\n\
                     Long,Yes,No,Extra\n\
                     Trail2,No,Yes\n";

        let (batches, status) = parse_batches(input, 10);
        assert!(status.is_ok());
        let trails = batches.concat();
        assert_eq!(trails.len(), 2);
        assert_eq!(trails[0].access_name, "Trail1");
        assert_eq!(trails[1].access_name, "Trail2");
    }

    #[test]
    fn test_unknown_and_missing_columns() {
        let input = "OBJECTID,AccessName,Grills\n1,North Lot,Yes\n";
        let (batches, status) = parse_batches(input, 5);
        assert!(status.is_ok());

        let trail = &batches[0][0];
        assert_eq!(trail.access_name, "North Lot");
        assert_eq!(trail.grills, "Yes");
        assert_eq!(trail.restrooms, "");
    }

    #[test]
    fn test_duplicate_header_last_wins() {
        let input = "AccessName,RESTROOMS,RESTROOMS\nA,first,second\n";
        let (batches, _) = parse_batches(input, 1);
        assert_eq!(batches[0][0].restrooms, "second");
    }

    #[test]
    fn test_values_are_raw_and_quoted_fields_parse() {
        let input =
            "AccessName,Fee\n\"Lake, East \"\"Shore\"\"\",  Daily Pass \n\"Multi\nLine\",No\n";
        let (batches, status) = parse_batches(input, 10);
        assert!(status.is_ok());

        let trails = batches.concat();
        assert_eq!(trails[0].access_name, "Lake, East \"Shore\"");
        assert_eq!(trails[0].fee, "  Daily Pass ");
        assert_eq!(trails[1].access_name, "Multi\nLine");
    }

    #[test]
    fn test_byte_order_mark_on_header() {
        let input = "\u{feff}AccessName,PICNIC\nBOM Trail,Yes\n";
        let (batches, _) = parse_batches(input, 1);
        assert_eq!(batches[0][0].access_name, "BOM Trail");
    }

    #[test]
    fn test_header_only() {
        let (batches, status) = parse_batches("AccessName,RESTROOMS\n", 3);
        assert!(status.is_ok());
        assert!(batches.is_empty());
    }

    #[test]
    fn test_empty_stream_is_header_error() {
        let (batches, status) = parse_batches("", 3);
        assert!(batches.is_empty());
        assert!(matches!(status, Err(TrailError::Header(_))));
    }

    #[test]
    fn test_read_failure_keeps_sent_batches_and_drops_partial() {
        let mut input = b"AccessName\nA\nB\nC\n".to_vec();
        input.extend_from_slice(b"\xff\xfe broken\nD\n");

        // Run the producer inline: a draining consumer may see the error first
        let (batch_tx, batch_rx) = crossbeam_channel::unbounded();
        let (status_tx, status_rx) = bounded(1);
        parse_csv_concurrently(Cursor::new(input), size(2), batch_tx, status_tx);

        assert!(matches!(status_rx.recv(), Ok(Err(TrailError::Record(_)))));
        let batches: Vec<Batch> = batch_rx.iter().collect();
        assert_eq!(batches.len(), 1);
        let names: Vec<_> = batches[0].iter().map(|t| t.access_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_full_batch_is_emitted_before_end_of_input() {
        let (chunk_tx, chunk_rx) = bounded::<Vec<u8>>(4);
        let reader = ChannelReader {
            chunks: chunk_rx,
            pending: Cursor::new(Vec::new()),
        };
        let channels = spawn_parser(reader, size(2)).unwrap();

        chunk_tx
            .send(b"AccessName\nFirst\nSecond\n".to_vec())
            .unwrap();
        let batch = channels
            .batches
            .recv_timeout(Duration::from_secs(5))
            .expect("batch should arrive while input is still open");
        assert_eq!(batch.len(), 2);

        chunk_tx.send(b"Third\n".to_vec()).unwrap();
        drop(chunk_tx);

        let mut rest = Vec::new();
        assert!(channels.drain(|b| rest.extend(b)).is_ok());
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].access_name, "Third");
    }

    #[test]
    fn test_parser_stops_when_consumer_hangs_up() {
        let mut input = String::from("AccessName\n");
        for i in 0..100 {
            input.push_str(&format!("T{i}\n"));
        }
        let (batch_tx, batch_rx) = bounded(0);
        let (status_tx, status_rx) = bounded(1);
        drop(batch_rx);

        let reader = Cursor::new(input.into_bytes());
        parse_csv_concurrently(reader, size(1), batch_tx, status_tx);
        assert!(matches!(status_rx.recv(), Ok(Ok(()))));
    }

    #[test]
    fn test_batch_after_status_is_still_delivered() {
        let (batch_tx, batch_rx) = bounded(BATCH_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = bounded(1);
        status_tx.send(Ok(())).unwrap();
        drop(status_tx);

        // The status is the only ready message when draining starts
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            batch_tx.send(vec![named("Last", "Yes", "No")]).unwrap();
        });
        let channels = BatchChannels {
            batches: batch_rx,
            status: status_rx,
            handle: Some(producer),
        };

        let mut batches = Vec::new();
        channels.drain(|batch| batches.push(batch)).unwrap();
        assert_eq!(batches, vec![vec![named("Last", "Yes", "No")]]);
    }

    #[test]
    fn test_buffered_batch_and_status_both_delivered() {
        let (batch_tx, batch_rx) = bounded(BATCH_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = bounded(1);
        batch_tx.send(vec![named("Buffered", "No", "No")]).unwrap();
        status_tx.send(Ok(())).unwrap();
        drop(batch_tx);
        drop(status_tx);

        let channels = BatchChannels {
            batches: batch_rx,
            status: status_rx,
            handle: None,
        };
        let trails = channels.collect().unwrap();
        assert_eq!(trails, vec![named("Buffered", "No", "No")]);
    }

    #[test]
    fn test_header_index() {
        let header = StringRecord::from(vec!["X", "PICNIC", "AccessName"]);
        let index = HeaderIndex::from_header(&header);
        assert_eq!(index.width(), 3);
        assert_eq!(index.column(Field::Picnic), Some(1));
        assert_eq!(index.column(Field::AccessName), Some(2));
        assert_eq!(index.column(Field::Fee), None);
    }
}
