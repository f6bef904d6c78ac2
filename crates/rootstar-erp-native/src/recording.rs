//! CSV recordings of signal containers.
//!
//! Layout: a header row `timestamps,<channel>...,Marker`, then one row per
//! sample holding the timestamp, one value per channel and a marker that is
//! `1` on samples registered as events and `0` otherwise.
//!
//! Loading reads channels by position. Columns beyond the requested channel
//! count are ignored; the marker is taken from the last column only when
//! the row has one beyond the channels.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;

use rootstar_erp_core::{Sample, SignalBlock, SignalContainer, SignalError};

/// Marker written on event rows.
pub const EVENT_MARKER: &str = "1";

/// Marker written on all other rows.
pub const NO_EVENT_MARKER: &str = "0";

/// Errors raised while reading or writing recordings.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// CSV encoding or decoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be interpreted
    #[error("Invalid recording at line {line}: {message}")]
    Parse {
        /// 1-based line number in the file
        line: u64,
        /// What was wrong
        message: String,
    },

    /// Parsed samples were rejected by the container
    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Result type for recording operations.
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Write a container as CSV.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_recording<W: Write>(container: &SignalContainer, writer: W) -> RecordingResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(container.channel_names().len() + 2);
    header.push("timestamps");
    header.extend(container.channel_names().iter().map(String::as_str));
    header.push("Marker");
    wtr.write_record(&header)?;

    for (i, timestamp) in container.timestamps().iter().enumerate() {
        wtr.write_field(timestamp.to_string())?;
        for signal in container.signals() {
            wtr.write_field(signal[i].to_string())?;
        }
        let marker = if container.events().contains(timestamp) {
            EVENT_MARKER
        } else {
            NO_EVENT_MARKER
        };
        wtr.write_field(marker)?;
        wtr.write_record(None::<&[u8]>)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a container to a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_recording(container: &SignalContainer, path: impl AsRef<Path>) -> RecordingResult<()> {
    let path = path.as_ref();
    write_recording(container, File::create(path)?)?;
    tracing::debug!("Saved {} samples to {}", container.len(), path.display());
    Ok(())
}

/// Read a CSV recording.
///
/// With `channel_names` given, that many channel columns are read by
/// position and named accordingly. Without, the channel names come from the
/// header (every column between `timestamps` and a trailing `Marker`).
///
/// # Errors
///
/// Returns [`RecordingError::Parse`] on short rows or non-numeric values.
pub fn read_recording<R: Read>(
    reader: R,
    channel_names: Option<&[String]>,
    sample_rate: u32,
) -> RecordingResult<SignalContainer> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let channel_names = match channel_names {
        Some(names) => names.to_vec(),
        None => header_channels(rdr.headers()?),
    };
    let n = channel_names.len();
    let mut container = SignalContainer::new(channel_names, sample_rate);

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);

        if record.len() < n + 1 {
            return Err(RecordingError::Parse {
                line,
                message: format!("expected at least {} columns, found {}", n + 1, record.len()),
            });
        }

        let parse = |field: &str| {
            field.trim().parse::<f64>().map_err(|e| RecordingError::Parse {
                line,
                message: format!("'{field}': {e}"),
            })
        };

        let timestamp = parse(&record[0])?;
        let values = (1..=n).map(|i| parse(&record[i])).collect::<RecordingResult<Vec<_>>>()?;
        container.add_sample(&Sample::new(timestamp, values))?;

        if record.len() > n + 1 && record[record.len() - 1].trim() == EVENT_MARKER {
            container.register_event(timestamp)?;
        }
    }

    Ok(container)
}

/// Read a CSV recording from a file. See [`read_recording`].
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn load_recording(
    path: impl AsRef<Path>,
    channel_names: Option<&[String]>,
    sample_rate: u32,
) -> RecordingResult<SignalContainer> {
    let path = path.as_ref();
    let container = read_recording(File::open(path)?, channel_names, sample_rate)?;
    tracing::debug!(
        "Loaded {} samples, {} events from {}",
        container.len(),
        container.events().len(),
        path.display()
    );
    Ok(container)
}

fn header_channels(header: &csv::StringRecord) -> Vec<String> {
    let mut columns: Vec<&str> = header.iter().skip(1).collect();
    if columns.last().is_some_and(|c| c.trim().eq_ignore_ascii_case("marker")) {
        columns.pop();
    }
    columns.into_iter().map(|c| c.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded() -> SignalContainer {
        let mut container = SignalContainer::new(vec!["TP9".into(), "TP10".into()], 4);
        for i in 0..8 {
            let t = 100.0 + f64::from(i) * 0.25;
            container.add_sample(&Sample::new(t, vec![f64::from(i) * 0.1, -f64::from(i) / 3.0])).unwrap();
        }
        container.register_event(100.5).unwrap();
        container.register_event(101.25).unwrap();
        container
    }

    #[test]
    fn test_csv_layout() {
        let mut buf = Vec::new();
        write_recording(&recorded(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "timestamps,TP9,TP10,Marker");
        assert_eq!(lines.len(), 9);
        assert!(lines[1].ends_with(",0"));
        assert!(lines[3].starts_with("100.5,"));
        assert!(lines[3].ends_with(",1"));
    }

    #[test]
    fn test_roundtrip_reproduces_container() {
        let container = recorded();
        let mut buf = Vec::new();
        write_recording(&container, &mut buf).unwrap();

        let names = container.channel_names().to_vec();
        let restored = read_recording(buf.as_slice(), Some(&names), 4).unwrap();
        assert_eq!(restored, container);

        let from_header = read_recording(buf.as_slice(), None, 4).unwrap();
        assert_eq!(from_header, container);
    }

    #[test]
    fn test_extra_channels_ignored() {
        let csv = "timestamps,A,B,C,Marker\n0.0,1,2,3,0\n0.5,4,5,6,1\n";
        let restored = read_recording(csv.as_bytes(), Some(&["A".to_string()]), 2).unwrap();

        assert_eq!(restored.signals(), &[vec![1.0, 4.0]]);
        assert_eq!(restored.events(), &[0.5]);
    }

    #[test]
    fn test_missing_marker_column() {
        let csv = "timestamps,A\n0.0,1\n0.5,1\n";
        let restored = read_recording(csv.as_bytes(), Some(&["A".to_string()]), 2).unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.events().is_empty());
    }

    #[test]
    fn test_bad_value_reports_line() {
        let csv = "timestamps,A,Marker\n0.0,1,0\n0.5,oops,0\n";
        let err = read_recording(csv.as_bytes(), None, 2).unwrap_err();
        assert!(matches!(err, RecordingError::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn test_short_row_rejected() {
        let csv = "timestamps,A,B,Marker\n0.0,1\n";
        let err = read_recording(csv.as_bytes(), None, 2).unwrap_err();
        assert!(matches!(err, RecordingError::Parse { .. }));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.csv");
        let container = recorded();

        save_recording(&container, &path).unwrap();
        assert_eq!(load_recording(&path, None, 4).unwrap(), container);
    }
}
