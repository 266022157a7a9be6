//! Decoders for the NYCT conventions that are encoded in identifiers rather
//! than in explicit feed fields.
//!
//! Each convention lives behind one pure function. A value that does not
//! follow the convention decodes to `None`; callers decide whether that is
//! worth a diagnostic.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::model::Direction;

/// Wall-clock zone of the NYCT schedule.
pub const AGENCY_TZ: Tz = chrono_tz::America::New_York;

/// Reads the travel direction from the trailing character of a stop id.
///
/// Platform-level stop ids end in `N` or `S` (`"613N"` is the northbound
/// platform at Hunts Point Av).
pub fn direction_from_stop_id(stop_id: &str) -> Option<Direction> {
    match stop_id.chars().last()? {
        'N' => Some(Direction::North),
        'S' => Some(Direction::South),
        _ => None,
    }
}

/// Strips the direction suffix from a platform stop id, giving the parent
/// station id (`"123S"` becomes `"123"`).
pub fn parent_station_id(stop_id: &str) -> Option<&str> {
    direction_from_stop_id(stop_id)?;
    let parent = &stop_id[..stop_id.len() - 1];
    (!parent.is_empty()).then_some(parent)
}

/// Extracts the shape id from a trip id: everything after the first `_`
/// (`"095650_1..S03R"` gives `"1..S03R"`).
pub fn shape_id_from_trip_id(trip_id: &str) -> Option<&str> {
    let (_, shape) = trip_id.split_once('_')?;
    (!shape.is_empty()).then_some(shape)
}

/// Parses a GTFS service date in `YYYYMMDD` form.
pub fn parse_start_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

/// Derives the scheduled origin departure from the trip id prefix.
///
/// The digits before the `_` count hundredths of a minute since the start of
/// the service day, so `090300` is 903.00 minutes, i.e. 15:03:00. Service day
/// time is measured from noon minus twelve hours, which keeps the result
/// correct on daylight-saving transition days.
pub fn origin_departure(trip_id: &str, start_date: NaiveDate) -> Option<DateTime<Utc>> {
    let (prefix, _) = trip_id.split_once('_')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hundredths: i64 = prefix.parse().ok()?;

    let noon = AGENCY_TZ
        .from_local_datetime(&start_date.and_time(NaiveTime::from_hms_opt(12, 0, 0)?))
        .single()?;
    let day_origin = noon.checked_sub_signed(TimeDelta::hours(12))?;

    let offset = TimeDelta::try_milliseconds(hundredths.checked_mul(600)?)?;
    Some(day_origin.checked_add_signed(offset)?.with_timezone(&Utc))
}

/// Converts a POSIX timestamp from the feed into a UTC instant.
pub fn timestamp_from_posix(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Unsigned variant of [`timestamp_from_posix`] for header and position
/// timestamps.
pub fn timestamp_from_posix_u64(secs: u64) -> Option<DateTime<Utc>> {
    i64::try_from(secs).ok().and_then(timestamp_from_posix)
}

/// Formats an instant as agency-local `HH:MM:SS`.
pub fn local_clock(instant: &DateTime<Utc>) -> String {
    instant.with_timezone(&AGENCY_TZ).format("%H:%M:%S").to_string()
}
