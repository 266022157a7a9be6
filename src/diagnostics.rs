//! Data-quality notes collected while building a snapshot.
//!
//! A diagnostic records a record or field the builder had to drop or leave
//! empty. Building never fails because of one.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Record without a trip id; dropped.
    MissingTripId,
    /// A second record of the same kind for a trip id; the later one wins.
    DuplicateRecord,
    /// Advisory naming a trip that is not in the snapshot; dropped.
    OrphanAdvisory,
    /// Stop id not present in the stop reference; name left empty.
    UnknownStop,
    /// Stop time entry without a stop id; dropped.
    MissingStopId,
    /// Stop time entry with neither arrival nor departure; dropped.
    MissingStopTimes,
    /// Stop time entries were not in time order and were re-sorted.
    OutOfOrderStopTimes,
    /// Stop time entries the train has already passed, per its position;
    /// dropped.
    PassedStopTimes,
    /// Timestamp outside the representable range; left empty.
    InvalidTimestamp,
    /// Stop id without a direction suffix where one was needed.
    UndecodableDirection,
    /// No stop id to derive the direction from; trip dropped.
    DirectionUnavailable,
    /// Start date or trip id prefix unusable; origin departure left empty.
    UnderivableOriginDeparture,
    /// Vehicle stop status outside the known values.
    UnknownStopStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub entity_id: Option<String>,
    pub trip_id: Option<String>,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(trip_id) = &self.trip_id {
            write!(f, " [trip {trip_id}]")?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " [entity {entity_id}]")?;
        }
        write!(f, ": {}", self.detail)
    }
}
