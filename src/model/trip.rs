use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::{Direction, LocationStatus, StopTimeEntry};
use crate::convention::local_clock;

/// One train currently scheduled or running.
///
/// A trip is published about half an hour before it leaves its origin. Shortly
/// before departure it is assigned to a physical train, and once a position
/// report appears it is underway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    /// Feed-assigned id, e.g. `090850_1..N03R`. Only unique within one
    /// snapshot.
    pub trip_id: String,
    /// NYCT rail operations id, e.g. `01 1508+ SFT/242`.
    pub train_id: Option<String>,
    pub route_id: Option<String>,
    /// Line, direction and stopping pattern, e.g. `1..S03R`.
    pub shape_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub direction: Direction,
    pub headsign_text: Option<String>,
    pub origin_departure_time: Option<DateTime<Utc>>,
    pub is_assigned: Option<bool>,
    pub has_delay_alert: bool,

    pub location: Option<String>,
    pub location_name: Option<String>,
    pub location_status: LocationStatus,
    pub current_stop_sequence: Option<u32>,
    pub last_position_update: Option<DateTime<Utc>>,

    pub stop_time_updates: Vec<StopTimeEntry>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Trip {
    /// A trip is underway once the feed carries a position report for it.
    pub fn is_underway(&self) -> bool {
        self.location_status != LocationStatus::None
    }

    /// Whether a train has been bound to this trip. A missing assignment flag
    /// means it has not.
    pub fn train_assigned(&self) -> bool {
        self.is_assigned.unwrap_or(false)
    }

    /// The stop this trip terminates at, as currently published.
    pub fn final_stop(&self) -> Option<&StopTimeEntry> {
        self.stop_time_updates.last()
    }

    /// `true` iff `stop_id` is among the remaining stops, including the one
    /// the train is standing at.
    pub fn headed_to_stop(&self, stop_id: &str) -> bool {
        self.stop_time_updates.iter().any(|s| s.stop_id == stop_id)
    }
}

impl fmt::Display for Trip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_delay_alert {
            f.write_str("DELAYED ")?;
        }

        let route = self.route_id.as_deref().unwrap_or("?");
        write!(f, "{} {}", self.direction.label(), route)?;

        match (&self.headsign_text, &self.shape_id) {
            (Some(headsign), _) => write!(f, " to {headsign}")?,
            (None, Some(shape)) => write!(f, " ({shape})")?,
            (None, None) => write!(f, " ({})", self.trip_id)?,
        }

        let verb = if self.is_underway() {
            "departed origin"
        } else {
            "departs origin"
        };
        match &self.origin_departure_time {
            Some(departure) => write!(f, ", {verb} {}", local_clock(departure))?,
            None => f.write_str(", origin departure not yet assigned")?,
        }

        if !self.is_underway() {
            if self.train_assigned() {
                f.write_str(" - train assigned")?;
            }
            return f.write_str(", not yet underway");
        }

        let location = self
            .location_name
            .as_deref()
            .or(self.location.as_deref())
            .unwrap_or("unknown stop");
        write!(f, ", Currently {} {}", self.location_status, location)?;

        match &self.last_position_update {
            Some(at) => write!(f, ", last update at {}", local_clock(at)),
            None => f.write_str(", last update unknown"),
        }
    }
}

/// The trips of one snapshot, in the order their records first appeared in
/// the feed, indexed by trip id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripCollection {
    trips: Vec<Trip>,
    index: HashMap<String, usize>,
}

impl TripCollection {
    pub fn new(trips: Vec<Trip>) -> Self {
        let index = trips
            .iter()
            .enumerate()
            .map(|(i, t)| (t.trip_id.clone(), i))
            .collect();
        Self { trips, index }
    }

    pub fn get(&self, trip_id: &str) -> Option<&Trip> {
        self.index.get(trip_id).map(|&i| &self.trips[i])
    }

    pub fn as_slice(&self) -> &[Trip] {
        &self.trips
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trip> {
        self.trips.iter()
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

impl<'a> IntoIterator for &'a TripCollection {
    type Item = &'a Trip;
    type IntoIter = std::slice::Iter<'a, Trip>;

    fn into_iter(self) -> Self::IntoIter {
        self.trips.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convention::AGENCY_TZ;
    use chrono::TimeZone;

    fn local(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        AGENCY_TZ
            .with_ymd_and_hms(2021, 11, 26, h, m, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn stop(stop_id: &str, name: &str) -> StopTimeEntry {
        StopTimeEntry {
            stop_id: stop_id.to_string(),
            stop_name: Some(name.to_string()),
            arrival: None,
            departure: None,
            scheduled_track: None,
            actual_track: None,
        }
    }

    fn trip() -> Trip {
        Trip {
            trip_id: "095650_1..S03R".to_string(),
            train_id: Some("01 1556+ 242/SFT".to_string()),
            route_id: Some("1".to_string()),
            shape_id: Some("1..S03R".to_string()),
            start_date: NaiveDate::from_ymd_opt(2021, 11, 26),
            direction: Direction::South,
            headsign_text: Some("South Ferry".to_string()),
            origin_departure_time: Some(local(15, 56, 30)),
            is_assigned: Some(true),
            has_delay_alert: false,
            location: None,
            location_name: None,
            location_status: LocationStatus::None,
            current_stop_sequence: None,
            last_position_update: None,
            stop_time_updates: vec![stop("101S", "Van Cortlandt Park-242 St"), stop("142S", "South Ferry")],
            updated_at: None,
        }
    }

    #[test]
    fn test_display_assigned_not_underway() {
        assert_eq!(
            trip().to_string(),
            "Southbound 1 to South Ferry, departs origin 15:56:30 - train assigned, not yet underway"
        );
    }

    #[test]
    fn test_display_unassigned_without_departure() {
        let mut t = trip();
        t.is_assigned = None;
        t.origin_departure_time = None;
        assert_eq!(
            t.to_string(),
            "Southbound 1 to South Ferry, origin departure not yet assigned, not yet underway"
        );
    }

    #[test]
    fn test_display_underway_delayed() {
        let mut t = trip();
        t.direction = Direction::North;
        t.headsign_text = Some("Van Cortlandt Park-242 St".to_string());
        t.origin_departure_time = Some(local(15, 3, 0));
        t.has_delay_alert = true;
        t.location = Some("107N".to_string());
        t.location_name = Some("215 St".to_string());
        t.location_status = LocationStatus::InTransitTo;
        t.last_position_update = Some(local(15, 56, 17));

        assert_eq!(
            t.to_string(),
            "DELAYED Northbound 1 to Van Cortlandt Park-242 St, departed origin 15:03:00, \
             Currently IN_TRANSIT_TO 215 St, last update at 15:56:17"
        );
    }

    #[test]
    fn test_display_without_headsign_uses_shape() {
        let mut t = trip();
        t.headsign_text = None;
        assert!(t.to_string().starts_with("Southbound 1 (1..S03R), departs origin"));
    }

    #[test]
    fn test_headed_to_stop() {
        let t = trip();
        assert!(t.headed_to_stop("142S"));
        assert!(!t.headed_to_stop("142N"));
        assert!(!t.headed_to_stop("142"));
        assert_eq!(t.final_stop().unwrap().stop_id, "142S");
    }

    #[test]
    fn test_collection_lookup_keeps_order() {
        let mut second = trip();
        second.trip_id = "096650_1..S04R".to_string();
        let collection = TripCollection::new(vec![trip(), second]);

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.as_slice()[1].trip_id, "096650_1..S04R");
        assert_eq!(
            collection.get("096650_1..S04R").unwrap().trip_id,
            "096650_1..S04R"
        );
        assert!(collection.get("missing").is_none());
    }
}
