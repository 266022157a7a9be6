//! Feed message builders shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::convention::AGENCY_TZ;
use crate::gtfs_rt::trip_update::{StopTimeEvent, StopTimeUpdate};
use crate::gtfs_rt::vehicle_position::VehicleStopStatus;
use crate::gtfs_rt::{
    Alert, EntitySelector, FeedEntity, FeedHeader, FeedMessage, NyctStopTimeUpdate,
    NyctTripDescriptor, TripDescriptor, TripUpdate, VehiclePosition,
};
use crate::stops::{StopInfo, StopReference};

/// 2021-11-26 at the given agency-local wall clock time.
pub fn local(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    AGENCY_TZ
        .with_ymd_and_hms(2021, 11, 26, h, m, s)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn posix(h: u32, m: u32, s: u32) -> i64 {
    local(h, m, s).timestamp()
}

pub fn descriptor(trip_id: &str, route_id: &str) -> TripDescriptor {
    TripDescriptor {
        trip_id: Some(trip_id.to_string()),
        route_id: Some(route_id.to_string()),
        start_date: Some("20211126".to_string()),
        ..Default::default()
    }
}

pub fn assigned(mut trip: TripDescriptor, train_id: &str, is_assigned: bool) -> TripDescriptor {
    trip.nyct_trip_descriptor = Some(NyctTripDescriptor {
        train_id: Some(train_id.to_string()),
        is_assigned: Some(is_assigned),
        direction: None,
    });
    trip
}

pub fn stop_time(stop_id: &str, arrival: Option<i64>, departure: Option<i64>) -> StopTimeUpdate {
    let event = |time: Option<i64>| {
        time.map(|t| StopTimeEvent {
            time: Some(t),
            ..Default::default()
        })
    };
    StopTimeUpdate {
        stop_id: Some(stop_id.to_string()),
        arrival: event(arrival),
        departure: event(departure),
        ..Default::default()
    }
}

pub fn tracked(mut update: StopTimeUpdate, scheduled: &str, actual: Option<&str>) -> StopTimeUpdate {
    update.nyct_stop_time_update = Some(NyctStopTimeUpdate {
        scheduled_track: Some(scheduled.to_string()),
        actual_track: actual.map(str::to_string),
    });
    update
}

pub fn schedule(trip: TripDescriptor, stops: Vec<StopTimeUpdate>) -> TripUpdate {
    TripUpdate {
        trip,
        stop_time_update: stops,
        ..Default::default()
    }
}

pub fn position(
    trip: TripDescriptor,
    stop_id: &str,
    status: VehicleStopStatus,
    timestamp: i64,
) -> VehiclePosition {
    VehiclePosition {
        trip: Some(trip),
        stop_id: Some(stop_id.to_string()),
        current_status: Some(status as i32),
        timestamp: Some(timestamp as u64),
        ..Default::default()
    }
}

pub fn delay_alert(trip_id: &str) -> Alert {
    Alert {
        informed_entity: vec![EntitySelector {
            trip: Some(TripDescriptor {
                trip_id: Some(trip_id.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn schedule_entity(id: &str, update: TripUpdate) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        trip_update: Some(update),
        ..Default::default()
    }
}

pub fn position_entity(id: &str, vehicle: VehiclePosition) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        vehicle: Some(vehicle),
        ..Default::default()
    }
}

pub fn alert_entity(id: &str, alert: Alert) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        alert: Some(alert),
        ..Default::default()
    }
}

pub fn feed(entities: Vec<FeedEntity>) -> FeedMessage {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "1.0".to_string(),
            timestamp: Some(posix(16, 22, 30) as u64),
            ..Default::default()
        },
        entity: entities,
    }
}

pub fn stop_reference() -> StopReference {
    let mut stops = StopReference::default();
    for (id, name) in [
        ("N10S", "86 St"),
        ("N06S", "Bay Ridge Av"),
        ("N02S", "8 Av"),
        ("R01N", "Astoria-Ditmars Blvd"),
        ("101N", "Van Cortlandt Park-242 St"),
        ("101S", "Van Cortlandt Park-242 St"),
        ("107N", "215 St"),
        ("123S", "72 St"),
        ("123N", "72 St"),
        ("142S", "South Ferry"),
    ] {
        stops.insert(
            id,
            StopInfo {
                name: name.to_string(),
                borough: None,
            },
        );
    }
    stops
}
