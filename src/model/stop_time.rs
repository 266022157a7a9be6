use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::convention::local_clock;

/// Projection for one remaining stop of a trip.
///
/// Departure times are published for the origin terminal, arrival times for
/// the destination terminal, and both for stops in between.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTimeEntry {
    pub stop_id: String,
    /// Display name from the stop reference, absent if the id is unknown.
    pub stop_name: Option<String>,
    pub arrival: Option<DateTime<Utc>>,
    pub departure: Option<DateTime<Utc>>,
    pub scheduled_track: Option<String>,
    /// Only set once the platform assignment is confirmed, normally for the
    /// first remaining stop.
    pub actual_track: Option<String>,
}

impl StopTimeEntry {
    /// Arrival, falling back to departure. Used for ordering.
    pub fn effective_time(&self) -> Option<DateTime<Utc>> {
        self.arrival.or(self.departure)
    }

    /// `true` when both tracks are known and differ.
    ///
    /// A `false` result does not prove the train is on its scheduled track;
    /// the actual track is usually only published for the next stop.
    pub fn unexpected_track_arrival(&self) -> bool {
        match (&self.scheduled_track, &self.actual_track) {
            (Some(scheduled), Some(actual)) => scheduled != actual,
            _ => false,
        }
    }
}

impl fmt::Display for StopTimeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.stop_name.as_deref().unwrap_or(&self.stop_id))?;
        if let Some(arrival) = &self.arrival {
            write!(f, "Projected Arrival {}. ", local_clock(arrival))?;
        }
        if let Some(departure) = &self.departure {
            write!(f, "Projected Departure {}. ", local_clock(departure))?;
        }
        if let Some(track) = &self.scheduled_track {
            write!(f, "Scheduled to arrive on track {track}. ")?;
        }
        if let Some(track) = &self.actual_track {
            write!(f, "Actually arriving on track {track}. ")?;
        }
        Ok(())
    }
}
