//! The user-facing trip model built from one feed snapshot.

mod stop_time;
mod trip;

pub use stop_time::StopTimeEntry;
pub use trip::{Trip, TripCollection};

use serde::Serialize;
use std::fmt;

/// Direction of travel. Grand Central bound shuttles count as north and
/// Times Square bound shuttles as south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "S")]
    South,
}

impl Direction {
    /// The single-letter code used in stop and shape ids.
    pub fn code(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::South => 'S',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "Northbound",
            Direction::South => "Southbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A train's relationship to its current `location`.
///
/// `None` means no position report has been seen for the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationStatus {
    #[default]
    None,
    IncomingAt,
    StoppedAt,
    InTransitTo,
}

impl LocationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationStatus::None => "NONE",
            LocationStatus::IncomingAt => "INCOMING_AT",
            LocationStatus::StoppedAt => "STOPPED_AT",
            LocationStatus::InTransitTo => "IN_TRANSIT_TO",
        }
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
