//! Flat view over a decoded feed: the raw records the model builder consumes
//! and the header metadata passed through to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::convention::timestamp_from_posix_u64;
use crate::gtfs_rt::{Alert, FeedHeader, FeedMessage, TripDescriptor, TripUpdate, VehiclePosition};

/// One record of a feed snapshot, borrowed from the decoded message.
#[derive(Debug, Clone, Copy)]
pub enum RawRecord<'a> {
    ScheduleUpdate {
        entity_id: &'a str,
        update: &'a TripUpdate,
    },
    Position {
        entity_id: &'a str,
        position: &'a VehiclePosition,
    },
    Advisory {
        entity_id: &'a str,
        alert: &'a Alert,
    },
}

impl<'a> RawRecord<'a> {
    pub fn entity_id(&self) -> &'a str {
        match *self {
            RawRecord::ScheduleUpdate { entity_id, .. }
            | RawRecord::Position { entity_id, .. }
            | RawRecord::Advisory { entity_id, .. } => entity_id,
        }
    }

    /// Trip descriptor of a schedule-update or position record.
    pub fn trip(&self) -> Option<&'a TripDescriptor> {
        match *self {
            RawRecord::ScheduleUpdate { update, .. } => Some(&update.trip),
            RawRecord::Position { position, .. } => position.trip.as_ref(),
            RawRecord::Advisory { .. } => None,
        }
    }

    /// Trip id of a schedule-update or position record; empty ids count as
    /// missing.
    pub fn trip_id(&self) -> Option<&'a str> {
        self.trip().and_then(descriptor_trip_id)
    }
}

pub(crate) fn descriptor_trip_id(trip: &TripDescriptor) -> Option<&str> {
    trip.trip_id.as_deref().filter(|id| !id.is_empty())
}

/// Flattens the entities of a feed into records, in feed order.
///
/// An entity carrying more than one payload yields one record per payload.
/// Deleted entities are skipped.
pub fn records_from_feed(feed: &FeedMessage) -> Vec<RawRecord<'_>> {
    let mut records = Vec::with_capacity(feed.entity.len());
    for entity in &feed.entity {
        if entity.is_deleted == Some(true) {
            continue;
        }
        let entity_id = entity.id.as_str();
        if let Some(update) = &entity.trip_update {
            records.push(RawRecord::ScheduleUpdate { entity_id, update });
        }
        if let Some(position) = &entity.vehicle {
            records.push(RawRecord::Position { entity_id, position });
        }
        if let Some(alert) = &entity.alert {
            records.push(RawRecord::Advisory { entity_id, alert });
        }
    }
    records
}

/// End of the window within which the feed replaces the static schedule for
/// one route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplacementPeriod {
    pub route_id: String,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Header fields of a snapshot, extracted without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedMetadata {
    pub gtfs_realtime_version: String,
    pub nyct_subway_version: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
    pub replacement_periods: Vec<ReplacementPeriod>,
}

impl FeedMetadata {
    pub fn from_header(header: &FeedHeader) -> Self {
        let nyct = header.nyct_feed_header.as_ref();
        let replacement_periods = nyct
            .map(|n| n.trip_replacement_period.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|period| {
                Some(ReplacementPeriod {
                    route_id: period.route_id.clone()?,
                    ends_at: period
                        .replacement_period
                        .as_ref()
                        .and_then(|range| range.end)
                        .and_then(timestamp_from_posix_u64),
                })
            })
            .collect();

        Self {
            gtfs_realtime_version: header.gtfs_realtime_version.clone(),
            nyct_subway_version: nyct.and_then(|n| n.nyct_subway_version.clone()),
            generated_at: header.timestamp.and_then(timestamp_from_posix_u64),
            replacement_periods,
        }
    }

    /// Replacement window end for `route_id`, if the header lists one.
    pub fn replacement_period_end(&self, route_id: &str) -> Option<DateTime<Utc>> {
        self.replacement_periods
            .iter()
            .find(|p| p.route_id == route_id)
            .and_then(|p| p.ends_at)
    }
}
