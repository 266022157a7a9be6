//! Output formatting and persistence for trips.
//!
//! Supports one-line display, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::model::Trip;

/// Writes the one-line rendering of each trip.
pub fn print_lines<'t, W: Write>(
    out: &mut W,
    trips: impl IntoIterator<Item = &'t Trip>,
) -> Result<()> {
    for trip in trips {
        writeln!(out, "{trip}")?;
    }
    Ok(())
}

/// Writes the trips as a pretty-printed JSON array.
pub fn print_json<W: Write>(out: &mut W, trips: &[&Trip]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, trips)?;
    writeln!(out)?;
    Ok(())
}

/// Flat CSV rendering of a trip; stop times are reduced to the next and final
/// stop.
#[derive(Debug, Serialize)]
pub struct TripRow<'a> {
    pub recorded_at: DateTime<Utc>,
    pub trip_id: &'a str,
    pub train_id: Option<&'a str>,
    pub route_id: Option<&'a str>,
    pub shape_id: Option<&'a str>,
    pub direction: char,
    pub headsign: Option<&'a str>,
    pub origin_departure_time: Option<DateTime<Utc>>,
    pub is_assigned: Option<bool>,
    pub has_delay_alert: bool,
    pub location: Option<&'a str>,
    pub location_status: &'static str,
    pub last_position_update: Option<DateTime<Utc>>,
    pub next_stop_id: Option<&'a str>,
    pub final_stop_id: Option<&'a str>,
    pub remaining_stops: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<'a> TripRow<'a> {
    pub fn new(trip: &'a Trip, recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            trip_id: &trip.trip_id,
            train_id: trip.train_id.as_deref(),
            route_id: trip.route_id.as_deref(),
            shape_id: trip.shape_id.as_deref(),
            direction: trip.direction.code(),
            headsign: trip.headsign_text.as_deref(),
            origin_departure_time: trip.origin_departure_time,
            is_assigned: trip.is_assigned,
            has_delay_alert: trip.has_delay_alert,
            location: trip.location.as_deref(),
            location_status: trip.location_status.as_str(),
            last_position_update: trip.last_position_update,
            next_stop_id: trip.stop_time_updates.first().map(|s| s.stop_id.as_str()),
            final_stop_id: trip.final_stop().map(|s| s.stop_id.as_str()),
            remaining_stops: trip.stop_time_updates.len(),
            updated_at: trip.updated_at,
        }
    }
}

/// Appends one row per trip to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(
    path: impl AsRef<Path>,
    trips: &[&Trip],
    recorded_at: DateTime<Utc>,
) -> Result<()> {
    let path = path.as_ref();
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = trips.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for trip in trips {
        writer.serialize(TripRow::new(trip, recorded_at))?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, LocationStatus, StopTimeEntry};
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn trip(trip_id: &str) -> Trip {
        Trip {
            trip_id: trip_id.to_string(),
            train_id: Some("01 1556+ 242/SFT".to_string()),
            route_id: Some("1".to_string()),
            shape_id: Some("1..S03R".to_string()),
            start_date: None,
            direction: Direction::South,
            headsign_text: Some("South Ferry".to_string()),
            origin_departure_time: None,
            is_assigned: Some(true),
            has_delay_alert: false,
            location: None,
            location_name: None,
            location_status: LocationStatus::None,
            current_stop_sequence: None,
            last_position_update: None,
            stop_time_updates: vec![StopTimeEntry {
                stop_id: "142S".to_string(),
                stop_name: Some("South Ferry".to_string()),
                arrival: None,
                departure: None,
                scheduled_track: None,
                actual_track: None,
            }],
            updated_at: None,
        }
    }

    #[test]
    fn test_print_lines_one_per_trip() {
        let trips = vec![trip("a"), trip("b")];
        let mut out = Vec::new();
        print_lines(&mut out, &trips).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("Southbound 1 to South Ferry"));
    }

    #[test]
    fn test_print_json_is_array() {
        let t = trip("095650_1..S03R");
        let mut out = Vec::new();
        print_json(&mut out, &[&t]).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["trip_id"], "095650_1..S03R");
        assert_eq!(value[0]["direction"], "S");
    }

    #[test]
    fn test_append_records_writes_header_once() {
        let path = temp_path("nyct_realtime_test_header.csv");
        let _ = fs::remove_file(&path);

        let t = trip("095650_1..S03R");
        append_records(&path, &[&t], Utc::now()).unwrap();
        append_records(&path, &[&t, &t], Utc::now()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("recorded_at")).count();
        assert_eq!(header_count, 1);
        // 1 header + 3 data rows
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains(",142S,142S,1,"));

        fs::remove_file(&path).unwrap();
    }
}
