//! Model builder: turns the flat record sequence of one snapshot into trips.
//!
//! The build runs in two passes. The first pass sorts every record into a
//! per-trip slot (schedule update, position, advisory count) keyed by trip id,
//! remembering the order in which trip ids first appeared. The second pass
//! merges each slot into one [`Trip`]. Records that are malformed degrade to
//! absent fields and a [`Diagnostic`]; nothing here returns an error.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::convention::{
    direction_from_stop_id, origin_departure, parse_start_date, shape_id_from_trip_id,
    timestamp_from_posix, timestamp_from_posix_u64,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::gtfs_rt::trip_update::StopTimeEvent;
use crate::gtfs_rt::vehicle_position::VehicleStopStatus;
use crate::gtfs_rt::{NyctTripDescriptor, TripDescriptor, TripUpdate, VehiclePosition};
use crate::model::{LocationStatus, StopTimeEntry, Trip, TripCollection};
use crate::records::{RawRecord, descriptor_trip_id};
use crate::stops::StopLookup;

/// Result of one build: the trips plus everything that had to be dropped or
/// left empty on the way.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub trips: TripCollection,
    pub diagnostics: Vec<Diagnostic>,
    /// Trip ids seen in the records that did not make it into `trips`.
    pub dropped: usize,
}

/// Builds the trip collection for one snapshot.
pub fn build_trips<S>(records: &[RawRecord<'_>], stops: &S) -> BuildOutput
where
    S: StopLookup + ?Sized,
{
    ModelBuilder {
        stops,
        diagnostics: Vec::new(),
    }
    .build(records)
}

#[derive(Default)]
struct TripSlots<'r> {
    schedule: Option<(&'r str, &'r TripUpdate)>,
    position: Option<(&'r str, &'r VehiclePosition)>,
    advisories: usize,
}

impl<'r> TripSlots<'r> {
    /// Descriptors in order of preference: schedule update first.
    fn descriptors(&self) -> impl Iterator<Item = &'r TripDescriptor> + use<'r> {
        self.schedule
            .map(|(_, update)| &update.trip)
            .into_iter()
            .chain(self.position.and_then(|(_, position)| position.trip.as_ref()))
    }

    fn nyct(&self) -> impl Iterator<Item = &'r NyctTripDescriptor> + use<'r> {
        self.descriptors()
            .filter_map(|d| d.nyct_trip_descriptor.as_ref())
    }

    fn entity_id(&self) -> Option<&'r str> {
        self.schedule
            .map(|(id, _)| id)
            .or(self.position.map(|(id, _)| id))
    }
}

/// Per-trip slots in first-seen order, plus `(entity id, trip id)` for every
/// trip an advisory names.
type Indexed<'r> = (Vec<(&'r str, TripSlots<'r>)>, Vec<(&'r str, &'r str)>);

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

struct ModelBuilder<'s, S: ?Sized> {
    stops: &'s S,
    diagnostics: Vec<Diagnostic>,
}

impl<S: StopLookup + ?Sized> ModelBuilder<'_, S> {
    fn build(mut self, records: &[RawRecord<'_>]) -> BuildOutput {
        let (slots, advisories) = self.index(records);
        let seen = slots.len();

        let trips = TripCollection::new(
            slots
                .into_iter()
                .filter_map(|(trip_id, slots)| self.merge(trip_id, &slots))
                .collect(),
        );
        let dropped = seen - trips.len();

        // Advisories are matched against the merged trips, so one naming a
        // dropped trip is reported too.
        for (entity_id, trip_id) in advisories {
            if trips.get(trip_id).is_none() {
                self.note(
                    DiagnosticKind::OrphanAdvisory,
                    Some(trip_id),
                    Some(entity_id),
                    "advisory names a trip not in this snapshot",
                );
            }
        }

        info!(
            records = records.len(),
            trips = trips.len(),
            dropped,
            diagnostics = self.diagnostics.len(),
            "Trip model built"
        );

        BuildOutput {
            trips,
            diagnostics: self.diagnostics,
            dropped,
        }
    }

    /// First pass: group records by trip id, preserving first-seen order.
    /// Returns the slots and every `(entity id, trip id)` an advisory names.
    fn index<'r>(&mut self, records: &[RawRecord<'r>]) -> Indexed<'r> {
        let mut slots: Vec<(&'r str, TripSlots<'r>)> = Vec::new();
        let mut by_trip: HashMap<&'r str, usize> = HashMap::new();
        let mut advisories: Vec<(&'r str, &'r str)> = Vec::new();

        for record in records {
            let entity_id = record.entity_id();

            if let RawRecord::Advisory { alert, .. } = *record {
                let before = advisories.len();
                advisories.extend(
                    alert
                        .informed_entity
                        .iter()
                        .filter_map(|selector| selector.trip.as_ref())
                        .filter_map(descriptor_trip_id)
                        .map(|trip_id| (entity_id, trip_id)),
                );
                if advisories.len() == before {
                    self.note(
                        DiagnosticKind::MissingTripId,
                        None,
                        Some(entity_id),
                        "advisory does not name a trip",
                    );
                }
                continue;
            }

            let Some(trip_id) = record.trip_id() else {
                self.note(
                    DiagnosticKind::MissingTripId,
                    None,
                    Some(entity_id),
                    "record has no trip id",
                );
                continue;
            };

            let i = *by_trip.entry(trip_id).or_insert_with(|| {
                slots.push((trip_id, TripSlots::default()));
                slots.len() - 1
            });
            let slot = &mut slots[i].1;

            let replaced = match *record {
                RawRecord::ScheduleUpdate { update, .. } => {
                    slot.schedule.replace((entity_id, update)).is_some()
                }
                RawRecord::Position { position, .. } => {
                    slot.position.replace((entity_id, position)).is_some()
                }
                RawRecord::Advisory { .. } => false,
            };
            if replaced {
                self.note(
                    DiagnosticKind::DuplicateRecord,
                    Some(trip_id),
                    Some(entity_id),
                    "later record replaces an earlier one of the same kind",
                );
            }
        }

        for &(_, trip_id) in &advisories {
            if let Some(&i) = by_trip.get(trip_id) {
                slots[i].1.advisories += 1;
            }
        }

        (slots, advisories)
    }

    /// Second pass: merge one trip's slots.
    fn merge(&mut self, trip_id: &str, slots: &TripSlots<'_>) -> Option<Trip> {
        let entity_id = slots.entity_id();

        let mut stop_time_updates = match slots.schedule {
            Some((entity_id, update)) => self.stop_times(trip_id, entity_id, update),
            None => Vec::new(),
        };

        let position = slots.position.map(|(_, p)| p);
        let position_stop = position
            .and_then(|p| p.stop_id.as_deref())
            .filter(|s| !s.is_empty());

        let candidates = position_stop
            .into_iter()
            .chain(stop_time_updates.first().map(|s| s.stop_id.as_str()));
        let mut direction = None;
        for stop_id in candidates {
            match direction_from_stop_id(stop_id) {
                Some(d) => {
                    direction = Some(d);
                    break;
                }
                None => self.note(
                    DiagnosticKind::UndecodableDirection,
                    Some(trip_id),
                    entity_id,
                    format!("stop {stop_id} has no N/S suffix"),
                ),
            }
        }
        let Some(direction) = direction else {
            warn!(trip_id, "Trip dropped, no stop id to derive direction from");
            self.note(
                DiagnosticKind::DirectionUnavailable,
                Some(trip_id),
                entity_id,
                "no position stop and no stop times; trip dropped",
            );
            return None;
        };

        let headsign_text = stop_time_updates.last().and_then(|s| s.stop_name.clone());

        let start_date_raw = slots
            .descriptors()
            .find_map(|d| non_empty(d.start_date.as_ref()));
        let start_date = start_date_raw.as_deref().and_then(parse_start_date);
        let origin_departure_time = start_date.and_then(|date| origin_departure(trip_id, date));
        if origin_departure_time.is_none() {
            self.note(
                DiagnosticKind::UnderivableOriginDeparture,
                Some(trip_id),
                entity_id,
                format!(
                    "start date {} with trip id prefix does not give a departure",
                    start_date_raw.as_deref().unwrap_or("(none)")
                ),
            );
        }

        let (location_status, last_position_update, current_stop_sequence) = match slots.position {
            Some((position_entity, p)) => (
                self.location_status(trip_id, position_entity, p),
                p.timestamp
                    .and_then(|t| self.timestamp_u64(t, trip_id, position_entity)),
                p.current_stop_sequence,
            ),
            None => (LocationStatus::None, None, None),
        };
        let location = position_stop.map(str::to_string);
        let location_name = match (&location, slots.position) {
            (Some(stop_id), Some((position_entity, _))) => {
                self.stop_name(stop_id, trip_id, position_entity)
            }
            _ => None,
        };

        if let (Some(stop_id), Some((position_entity, _))) = (position_stop, slots.position) {
            self.drop_passed_stops(
                trip_id,
                position_entity,
                &mut stop_time_updates,
                stop_id,
                last_position_update,
            );
        }

        let schedule_timestamp = slots.schedule.and_then(|(schedule_entity, update)| {
            update
                .timestamp
                .and_then(|t| self.timestamp_u64(t, trip_id, schedule_entity))
        });

        Some(Trip {
            trip_id: trip_id.to_string(),
            train_id: slots.nyct().find_map(|n| non_empty(n.train_id.as_ref())),
            route_id: slots.descriptors().find_map(|d| non_empty(d.route_id.as_ref())),
            shape_id: shape_id_from_trip_id(trip_id).map(str::to_string),
            start_date,
            direction,
            headsign_text,
            origin_departure_time,
            is_assigned: slots.nyct().find_map(|n| n.is_assigned),
            has_delay_alert: slots.advisories > 0,
            location,
            location_name,
            location_status,
            current_stop_sequence,
            updated_at: last_position_update.or(schedule_timestamp),
            last_position_update,
            stop_time_updates,
        })
    }

    fn stop_times(&mut self, trip_id: &str, entity_id: &str, update: &TripUpdate) -> Vec<StopTimeEntry> {
        let mut entries = Vec::with_capacity(update.stop_time_update.len());

        for stu in &update.stop_time_update {
            let Some(stop_id) = stu.stop_id.as_deref().filter(|s| !s.is_empty()) else {
                self.note(
                    DiagnosticKind::MissingStopId,
                    Some(trip_id),
                    Some(entity_id),
                    "stop time update without stop id dropped",
                );
                continue;
            };

            let arrival = self.event_time(stu.arrival.as_ref(), trip_id, entity_id);
            let departure = self.event_time(stu.departure.as_ref(), trip_id, entity_id);
            if arrival.is_none() && departure.is_none() {
                self.note(
                    DiagnosticKind::MissingStopTimes,
                    Some(trip_id),
                    Some(entity_id),
                    format!("stop {stop_id} has neither arrival nor departure; dropped"),
                );
                continue;
            }

            let nyct = stu.nyct_stop_time_update.as_ref();
            entries.push(StopTimeEntry {
                stop_id: stop_id.to_string(),
                stop_name: self.stop_name(stop_id, trip_id, entity_id),
                arrival,
                departure,
                scheduled_track: nyct.and_then(|n| non_empty(n.scheduled_track.as_ref())),
                actual_track: nyct.and_then(|n| non_empty(n.actual_track.as_ref())),
            });
        }

        let out_of_order = entries.windows(2).any(|pair| {
            matches!(
                (pair[0].effective_time(), pair[1].effective_time()),
                (Some(a), Some(b)) if b < a
            )
        });
        if out_of_order {
            self.note(
                DiagnosticKind::OutOfOrderStopTimes,
                Some(trip_id),
                Some(entity_id),
                "stop times re-sorted by arrival",
            );
            entries.sort_by_key(StopTimeEntry::effective_time);
        }

        entries
    }

    /// Drops entries ahead of the position's stop whose time is strictly
    /// before both that stop's time and the position report. Nothing is
    /// dropped when the position's stop is not in the sequence.
    fn drop_passed_stops(
        &mut self,
        trip_id: &str,
        entity_id: &str,
        entries: &mut Vec<StopTimeEntry>,
        position_stop: &str,
        reported_at: Option<DateTime<Utc>>,
    ) {
        let Some(k) = entries.iter().position(|s| s.stop_id == position_stop) else {
            return;
        };
        let Some(current) = entries[k].effective_time() else {
            return;
        };
        let cutoff = reported_at.map_or(current, |at| at.min(current));

        let before = entries.len();
        let mut index = 0;
        entries.retain(|entry| {
            let passed = index < k && entry.effective_time().is_some_and(|t| t < cutoff);
            index += 1;
            !passed
        });

        let passed = before - entries.len();
        if passed > 0 {
            self.note(
                DiagnosticKind::PassedStopTimes,
                Some(trip_id),
                Some(entity_id),
                format!("{passed} stop(s) before {position_stop} already passed; dropped"),
            );
        }
    }

    fn location_status(&mut self, trip_id: &str, entity_id: &str, position: &VehiclePosition) -> LocationStatus {
        // GTFS-realtime: a missing current_status means IN_TRANSIT_TO.
        let Some(raw) = position.current_status else {
            return LocationStatus::InTransitTo;
        };
        match VehicleStopStatus::try_from(raw) {
            Ok(VehicleStopStatus::IncomingAt) => LocationStatus::IncomingAt,
            Ok(VehicleStopStatus::StoppedAt) => LocationStatus::StoppedAt,
            Ok(VehicleStopStatus::InTransitTo) => LocationStatus::InTransitTo,
            Err(_) => {
                self.note(
                    DiagnosticKind::UnknownStopStatus,
                    Some(trip_id),
                    Some(entity_id),
                    format!("current_status {raw} read as IN_TRANSIT_TO"),
                );
                LocationStatus::InTransitTo
            }
        }
    }

    fn stop_name(&mut self, stop_id: &str, trip_id: &str, entity_id: &str) -> Option<String> {
        match self.stops.lookup(stop_id) {
            Some(info) => Some(info.name.clone()),
            None => {
                self.note(
                    DiagnosticKind::UnknownStop,
                    Some(trip_id),
                    Some(entity_id),
                    format!("stop {stop_id} not in stop reference"),
                );
                None
            }
        }
    }

    fn event_time(&mut self, event: Option<&StopTimeEvent>, trip_id: &str, entity_id: &str) -> Option<DateTime<Utc>> {
        let secs = event?.time?;
        let instant = timestamp_from_posix(secs);
        if instant.is_none() {
            self.note(
                DiagnosticKind::InvalidTimestamp,
                Some(trip_id),
                Some(entity_id),
                format!("stop time {secs} out of range"),
            );
        }
        instant
    }

    fn timestamp_u64(&mut self, secs: u64, trip_id: &str, entity_id: &str) -> Option<DateTime<Utc>> {
        let instant = timestamp_from_posix_u64(secs);
        if instant.is_none() {
            self.note(
                DiagnosticKind::InvalidTimestamp,
                Some(trip_id),
                Some(entity_id),
                format!("timestamp {secs} out of range"),
            );
        }
        instant
    }

    fn note(
        &mut self,
        kind: DiagnosticKind,
        trip_id: Option<&str>,
        entity_id: Option<&str>,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        debug!(kind = ?kind, trip_id, entity_id, detail = %detail, "Feed data-quality issue");
        self.diagnostics.push(Diagnostic {
            kind,
            entity_id: entity_id.map(str::to_string),
            trip_id: trip_id.map(str::to_string),
            detail,
        });
    }
}
