//! Feed session: owns the current snapshot and swaps it wholesale on refresh.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::builder::build_trips;
use crate::convention::local_clock;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::fetch::FeedSource;
use crate::model::{Trip, TripCollection};
use crate::parser::parse_feed;
use crate::query::TripFilter;
use crate::records::{FeedMetadata, records_from_feed};
use crate::stops::StopReference;

/// Everything built from one fetch of the feed. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub metadata: FeedMetadata,
    pub trips: TripCollection,
    pub diagnostics: Vec<Diagnostic>,
    /// Trips dropped because no direction could be derived.
    pub dropped: usize,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    /// Decodes `bytes` and builds the trip model against `stops`.
    pub fn from_bytes(bytes: &[u8], stops: &StopReference) -> Result<Self> {
        let feed = parse_feed(bytes)?;
        let records = records_from_feed(&feed);
        let output = build_trips(&records, stops);

        Ok(Self {
            metadata: FeedMetadata::from_header(&feed.header),
            trips: output.trips,
            diagnostics: output.diagnostics,
            dropped: output.dropped,
            loaded_at: Utc::now(),
        })
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NYCT Subway Feed")?;
        if let Some(generated_at) = &self.metadata.generated_at {
            write!(f, ", generated at {}", local_clock(generated_at))?;
        }
        write!(f, ", containing {} trips", self.trips.len())
    }
}

/// Holds the latest successfully built [`Snapshot`] for one feed.
///
/// Readers get an `Arc` to the snapshot current at the time of the call; a
/// later refresh replaces the session's snapshot but never the one a reader
/// already holds.
pub struct FeedSession<S> {
    source: S,
    stops: StopReference,
    snapshot: Option<Arc<Snapshot>>,
}

impl<S: FeedSource> FeedSession<S> {
    pub fn new(source: S, stops: StopReference) -> Self {
        Self {
            source,
            stops,
            snapshot: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stops(&self) -> &StopReference {
        &self.stops
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Fetches, decodes and builds a new snapshot, then swaps it in.
    ///
    /// # Errors
    ///
    /// Any fetch or decode failure is returned and the previous snapshot, if
    /// any, stays current.
    #[tracing::instrument(skip(self), fields(source = %self.source.describe()))]
    pub async fn refresh(&mut self) -> Result<Arc<Snapshot>> {
        let bytes = match self.source.fetch().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "Feed fetch failed, keeping previous snapshot");
                return Err(e);
            }
        };
        self.load_bytes(&bytes)
    }

    /// Builds a snapshot from already fetched feed bytes and swaps it in.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<Arc<Snapshot>> {
        let snapshot = match Snapshot::from_bytes(bytes, &self.stops) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                error!(error = %e, "Feed decode failed, keeping previous snapshot");
                return Err(e);
            }
        };

        info!(
            trips = snapshot.trips.len(),
            dropped = snapshot.dropped,
            diagnostics = snapshot.diagnostics.len(),
            "Snapshot swapped in"
        );
        self.snapshot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// The current snapshot.
    ///
    /// # Errors
    ///
    /// [`Error::NotLoaded`] before the first successful refresh.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.snapshot.clone().ok_or(Error::NotLoaded)
    }

    fn current(&self) -> Result<&Snapshot> {
        self.snapshot.as_deref().ok_or(Error::NotLoaded)
    }

    pub fn trips(&self) -> Result<&TripCollection> {
        Ok(&self.current()?.trips)
    }

    /// Trips of the current snapshot matching `filter`, in snapshot order.
    pub fn filter_trips(&self, filter: &TripFilter) -> Result<Vec<&Trip>> {
        Ok(filter.apply(&self.current()?.trips))
    }

    pub fn metadata(&self) -> Result<&FeedMetadata> {
        Ok(&self.current()?.metadata)
    }

    pub fn diagnostics(&self) -> Result<&[Diagnostic]> {
        Ok(&self.current()?.diagnostics)
    }
}
