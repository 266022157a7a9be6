//! Summary counts over one snapshot, for logging and monitoring.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::diagnostics::DiagnosticKind;
use crate::model::Direction;
use crate::session::Snapshot;

#[derive(Debug, Default, Serialize)]
pub struct SnapshotStats {
    pub generated_at: Option<DateTime<Utc>>,
    pub total_trips: usize,

    // lifecycle
    pub underway: usize,
    pub assigned: usize,
    pub delayed: usize,
    pub northbound: usize,
    pub southbound: usize,

    // data quality
    pub dropped: usize,
    pub diagnostics: usize,
    pub diagnostics_by_kind: BTreeMap<DiagnosticKind, usize>,
}

impl SnapshotStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut s = SnapshotStats {
            generated_at: snapshot.metadata.generated_at,
            total_trips: snapshot.trips.len(),
            dropped: snapshot.dropped,
            diagnostics: snapshot.diagnostics.len(),
            ..Default::default()
        };

        for trip in &snapshot.trips {
            if trip.is_underway() {
                s.underway += 1;
            }

            if trip.train_assigned() {
                s.assigned += 1;
            }

            if trip.has_delay_alert {
                s.delayed += 1;
            }

            match trip.direction {
                Direction::North => s.northbound += 1,
                Direction::South => s.southbound += 1,
            }
        }

        for d in &snapshot.diagnostics {
            *s.diagnostics_by_kind.entry(d.kind).or_default() += 1;
        }

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn underway_pct(&self) -> f64 {
        Self::pct(self.underway, self.total_trips)
    }

    pub fn assigned_pct(&self) -> f64 {
        Self::pct(self.assigned, self.total_trips)
    }
}
