//! Real-time trip model for the NYCT subway GTFS-realtime feeds.
//!
//! Raw feed bytes are decoded by [`parser`], flattened into records by
//! [`records`], merged into [`model::Trip`]s by [`builder`] and queried with
//! [`query::TripFilter`]. [`session::FeedSession`] ties these together behind
//! a refresh that swaps whole snapshots.

pub mod builder;
pub mod convention;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod query;
pub mod records;
pub mod session;
pub mod stats;
pub mod stops;

#[cfg(test)]
mod fixtures;

pub use error::{Error, Result};

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
