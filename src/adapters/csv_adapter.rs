//! CSV export of the event log.

use crate::domain::error::AbTestError;
use crate::domain::event::{Event, EventKind};
use std::io::Write;
use std::path::Path;

pub const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "subject_id",
    "experiment",
    "variant",
    "kind",
    "detail",
    "value",
];

/// Writes one row per event. `detail` holds the conversion type or event
/// name; `value` holds the conversion value or the custom event's JSON data.
pub fn write_events<W: Write>(writer: W, events: &[Event]) -> Result<(), AbTestError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;

    for event in events {
        let (detail, value) = match &event.kind {
            EventKind::Assignment => (String::new(), String::new()),
            EventKind::Conversion {
                conversion_type,
                value,
            } => (conversion_type.clone(), value.to_string()),
            EventKind::Custom { event_name, data } => {
                let value = if data.is_null() {
                    String::new()
                } else {
                    data.to_string()
                };
                (event_name.clone(), value)
            }
        };
        wtr.write_record([
            event.timestamp.to_rfc3339().as_str(),
            event.subject_id.as_str(),
            event.experiment_name.as_str(),
            event.variant.as_str(),
            event.kind.label(),
            detail.as_str(),
            value.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn export_events<P: AsRef<Path>>(path: P, events: &[Event]) -> Result<(), AbTestError> {
    let file = std::fs::File::create(path)?;
    write_events(file, events)
}
