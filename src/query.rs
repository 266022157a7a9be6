//! Multi-criteria trip filter.
//!
//! Every criterion is optional. Values inside one criterion are OR'd, distinct
//! criteria are AND'd, and the result keeps the snapshot order. Evaluation is
//! a single linear pass with no index.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::convention::timestamp_from_posix;
use crate::error::{Error, Result};
use crate::model::{Direction, Trip};

/// Names accepted by [`TripFilter::with_criterion`].
pub const CRITERIA: &[&str] = &[
    "line_id",
    "direction",
    "headed_for_stop_id",
    "shape_id",
    "underway",
    "assigned",
    "updated_after",
    "has_delay_alert",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripFilter {
    line_ids: Option<HashSet<String>>,
    direction: Option<Direction>,
    headed_for_stop_ids: Option<HashSet<String>>,
    shape_ids: Option<HashSet<String>>,
    underway: Option<bool>,
    assigned: Option<bool>,
    updated_after: Option<DateTime<Utc>>,
    has_delay_alert: Option<bool>,
}

fn id_set<I, S>(criterion: &str, values: I) -> Result<HashSet<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: HashSet<String> = values.into_iter().map(Into::into).collect();
    if set.is_empty() || set.iter().any(|v| v.is_empty()) {
        return Err(Error::invalid_criterion(
            criterion,
            "expected one or more non-empty ids",
        ));
    }
    Ok(set)
}

fn parse_bool(criterion: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(Error::invalid_criterion(
            criterion,
            format!("expected true or false, got {other:?}"),
        )),
    }
}

fn parse_direction(criterion: &str, value: &str) -> Result<Direction> {
    match value.trim().to_ascii_lowercase().as_str() {
        "n" | "north" | "northbound" => Ok(Direction::North),
        "s" | "south" | "southbound" => Ok(Direction::South),
        other => Err(Error::invalid_criterion(
            criterion,
            format!("expected N or S, got {other:?}"),
        )),
    }
}

fn parse_instant(criterion: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return timestamp_from_posix(secs)
            .ok_or_else(|| Error::invalid_criterion(criterion, "timestamp out of range"));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::invalid_criterion(criterion, format!("expected RFC 3339 or POSIX seconds: {e}")))
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim)
}

impl TripFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep trips whose route is one of `line_ids`.
    pub fn line_ids<I, S>(mut self, line_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.line_ids = Some(id_set("line_id", line_ids)?);
        Ok(self)
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Keep trips whose final remaining stop is one of `stop_ids`.
    pub fn headed_for_stop_ids<I, S>(mut self, stop_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headed_for_stop_ids = Some(id_set("headed_for_stop_id", stop_ids)?);
        Ok(self)
    }

    pub fn shape_ids<I, S>(mut self, shape_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shape_ids = Some(id_set("shape_id", shape_ids)?);
        Ok(self)
    }

    pub fn underway(mut self, underway: bool) -> Self {
        self.underway = Some(underway);
        self
    }

    pub fn assigned(mut self, assigned: bool) -> Self {
        self.assigned = Some(assigned);
        self
    }

    /// Keep trips whose last update is strictly after `instant`. Trips with no
    /// update time never match.
    pub fn updated_after(mut self, instant: DateTime<Utc>) -> Self {
        self.updated_after = Some(instant);
        self
    }

    pub fn has_delay_alert(mut self, has_delay_alert: bool) -> Self {
        self.has_delay_alert = Some(has_delay_alert);
        self
    }

    /// Sets one criterion from its textual form, as given on a command line.
    /// Lists are comma-separated.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownCriterion`] for a name not in [`CRITERIA`] (the older
    /// spellings `travel_direction` and `train_assigned` are also accepted),
    /// [`Error::InvalidCriterion`] for a value of the wrong shape.
    pub fn with_criterion(self, name: &str, value: &str) -> Result<Self> {
        match name.trim() {
            "line_id" => self.line_ids(split_list(value)),
            "direction" | "travel_direction" => Ok(self.direction(parse_direction(name, value)?)),
            "headed_for_stop_id" => self.headed_for_stop_ids(split_list(value)),
            "shape_id" => self.shape_ids(split_list(value)),
            "underway" => Ok(self.underway(parse_bool(name, value)?)),
            "assigned" | "train_assigned" => Ok(self.assigned(parse_bool(name, value)?)),
            "updated_after" => Ok(self.updated_after(parse_instant(name, value)?)),
            "has_delay_alert" => Ok(self.has_delay_alert(parse_bool(name, value)?)),
            other => Err(Error::UnknownCriterion(other.to_string())),
        }
    }

    /// Builds a filter from `(name, value)` pairs; see [`Self::with_criterion`].
    pub fn from_criteria<'a, I>(criteria: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        criteria
            .into_iter()
            .try_fold(Self::new(), |filter, (name, value)| filter.with_criterion(name, value))
    }

    /// Parses a `name=value` expression.
    pub fn parse_expression(self, expression: &str) -> Result<Self> {
        let (name, value) = expression.split_once('=').ok_or_else(|| {
            Error::invalid_criterion(expression, "expected name=value")
        })?;
        self.with_criterion(name, value)
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, trip: &Trip) -> bool {
        if let Some(line_ids) = &self.line_ids {
            match &trip.route_id {
                Some(route_id) if line_ids.contains(route_id) => {}
                _ => return false,
            }
        }

        if let Some(direction) = self.direction {
            if trip.direction != direction {
                return false;
            }
        }

        if let Some(stop_ids) = &self.headed_for_stop_ids {
            match trip.final_stop() {
                Some(stop) if stop_ids.contains(&stop.stop_id) => {}
                _ => return false,
            }
        }

        if let Some(shape_ids) = &self.shape_ids {
            match &trip.shape_id {
                Some(shape_id) if shape_ids.contains(shape_id) => {}
                _ => return false,
            }
        }

        if let Some(underway) = self.underway {
            if trip.is_underway() != underway {
                return false;
            }
        }

        if let Some(assigned) = self.assigned {
            if trip.train_assigned() != assigned {
                return false;
            }
        }

        if let Some(after) = self.updated_after {
            match trip.updated_at {
                Some(updated_at) if updated_at > after => {}
                _ => return false,
            }
        }

        if let Some(has_delay_alert) = self.has_delay_alert {
            if trip.has_delay_alert != has_delay_alert {
                return false;
            }
        }

        true
    }

    /// Returns the matching trips in their original order.
    pub fn apply<'t, I>(&self, trips: I) -> Vec<&'t Trip>
    where
        I: IntoIterator<Item = &'t Trip>,
    {
        trips.into_iter().filter(|trip| self.matches(trip)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::local;
    use crate::model::{LocationStatus, StopTimeEntry};

    fn stop(stop_id: &str) -> StopTimeEntry {
        StopTimeEntry {
            stop_id: stop_id.to_string(),
            stop_name: None,
            arrival: None,
            departure: Some(local(16, 0, 0)),
            scheduled_track: None,
            actual_track: None,
        }
    }

    fn trip(trip_id: &str, route: &str, direction: Direction, stops: &[&str]) -> Trip {
        Trip {
            trip_id: trip_id.to_string(),
            train_id: None,
            route_id: Some(route.to_string()),
            shape_id: trip_id.split_once('_').map(|(_, s)| s.to_string()),
            start_date: None,
            direction,
            headsign_text: None,
            origin_departure_time: None,
            is_assigned: None,
            has_delay_alert: false,
            location: None,
            location_name: None,
            location_status: LocationStatus::None,
            current_stop_sequence: None,
            last_position_update: None,
            stop_time_updates: stops.iter().map(|s| stop(s)).collect(),
            updated_at: None,
        }
    }

    fn underway(mut t: Trip, at: DateTime<Utc>) -> Trip {
        t.location = t.stop_time_updates.first().map(|s| s.stop_id.clone());
        t.location_status = LocationStatus::InTransitTo;
        t.last_position_update = Some(at);
        t.updated_at = Some(at);
        t.is_assigned = Some(true);
        t
    }

    fn collection() -> Vec<Trip> {
        let mut delayed = trip("4_B..S", "B", Direction::South, &["D01S", "D26S"]);
        delayed.has_delay_alert = true;
        vec![
            underway(trip("1_A..N", "A", Direction::North, &["A32N", "A02N"]), local(16, 20, 0)),
            trip("2_A..S", "A", Direction::South, &["A02S", "A55S"]),
            underway(trip("3_C..N", "C", Direction::North, &["A32N", "A09N"]), local(16, 10, 0)),
            delayed,
            trip("5_A..N", "A", Direction::North, &["A55N", "A32N"]),
        ]
    }

    fn ids(trips: &[&Trip]) -> Vec<String> {
        trips.iter().map(|t| t.trip_id.clone()).collect()
    }

    #[test]
    fn test_no_criteria_returns_everything_in_order() {
        let trips = collection();
        let filter = TripFilter::new();
        assert!(filter.is_unconstrained());
        let result = filter.apply(&trips);
        assert_eq!(result.len(), trips.len());
        assert!(result.iter().zip(&trips).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn test_line_ids_are_ored() {
        let trips = collection();
        let result = TripFilter::new().line_ids(["A", "B"]).unwrap().apply(&trips);
        assert_eq!(ids(&result), vec!["1_A..N", "2_A..S", "4_B..S", "5_A..N"]);
    }

    #[test]
    fn test_headed_for_checks_final_stop_only() {
        let trips = collection();
        let result = TripFilter::new()
            .headed_for_stop_ids(["A32N"])
            .unwrap()
            .apply(&trips);
        assert_eq!(ids(&result), vec!["5_A..N"]);

        let result = TripFilter::new()
            .headed_for_stop_ids(["A02N", "A55S"])
            .unwrap()
            .apply(&trips);
        assert_eq!(ids(&result), vec!["1_A..N", "2_A..S"]);
    }

    #[test]
    fn test_underway_partitions_collection() {
        let trips = collection();
        let moving = TripFilter::new().underway(true).apply(&trips);
        let waiting = TripFilter::new().underway(false).apply(&trips);
        assert_eq!(ids(&moving), vec!["1_A..N", "3_C..N"]);
        assert_eq!(moving.len() + waiting.len(), trips.len());
        assert!(waiting.iter().all(|t| !moving.iter().any(|m| m.trip_id == t.trip_id)));
    }

    #[test]
    fn test_assigned_treats_missing_flag_as_unassigned() {
        let trips = collection();
        let result = TripFilter::new().assigned(false).apply(&trips);
        assert_eq!(ids(&result), vec!["2_A..S", "4_B..S", "5_A..N"]);
    }

    #[test]
    fn test_updated_after_is_strict() {
        let trips = collection();
        let result = TripFilter::new().updated_after(local(16, 10, 0)).apply(&trips);
        assert_eq!(ids(&result), vec!["1_A..N"]);
    }

    #[test]
    fn test_shape_direction_and_delay() {
        let trips = collection();
        let result = TripFilter::new().shape_ids(["A..S", "B..S"]).unwrap().apply(&trips);
        assert_eq!(ids(&result), vec!["2_A..S", "4_B..S"]);

        let result = TripFilter::new().direction(Direction::North).apply(&trips);
        assert_eq!(ids(&result), vec!["1_A..N", "3_C..N", "5_A..N"]);

        let result = TripFilter::new().has_delay_alert(true).apply(&trips);
        assert_eq!(ids(&result), vec!["4_B..S"]);
    }

    #[test]
    fn test_criteria_compose_like_sequential_filters() {
        let trips = collection();
        let x = TripFilter::new().line_ids(["A"]).unwrap();
        let y = TripFilter::new().direction(Direction::North);
        let both = x.clone().direction(Direction::North);

        let combined = both.apply(&trips);
        let sequential = y.apply(x.apply(&trips));
        assert_eq!(ids(&combined), ids(&sequential));
        assert_eq!(ids(&combined), vec!["1_A..N", "5_A..N"]);
    }

    #[test]
    fn test_with_criterion_parses_text() {
        let trips = collection();
        let filter = TripFilter::from_criteria([
            ("line_id", "A, C"),
            ("travel_direction", "northbound"),
            ("underway", "true"),
        ])
        .unwrap();
        assert_eq!(ids(&filter.apply(&trips)), vec!["1_A..N", "3_C..N"]);

        let after = local(16, 15, 0).to_rfc3339();
        let filter = TripFilter::new().parse_expression(&format!("updated_after={after}")).unwrap();
        assert_eq!(ids(&filter.apply(&trips)), vec!["1_A..N"]);

        let secs = local(16, 15, 0).timestamp().to_string();
        let filter = TripFilter::new().with_criterion("updated_after", &secs).unwrap();
        assert_eq!(ids(&filter.apply(&trips)), vec!["1_A..N"]);
    }

    #[test]
    fn test_unknown_criterion_is_usage_error() {
        let err = TripFilter::new().with_criterion("colour", "red").unwrap_err();
        assert!(matches!(err, Error::UnknownCriterion(ref name) if name == "colour"));
        assert!(err.is_usage());
    }

    #[test]
    fn test_malformed_values_are_usage_errors() {
        for (name, value) in [
            ("underway", "maybe"),
            ("direction", "east"),
            ("line_id", ""),
            ("headed_for_stop_id", "A32N,,A02N"),
            ("updated_after", "yesterday"),
        ] {
            let err = TripFilter::new().with_criterion(name, value).unwrap_err();
            assert!(matches!(err, Error::InvalidCriterion { .. }), "{name}={value}");
        }
        assert!(TripFilter::new().parse_expression("underway").is_err());
        assert!(TripFilter::new().line_ids(Vec::<String>::new()).is_err());
    }
}
