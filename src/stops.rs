//! Static stop reference: stop id to display name and borough.
//!
//! Loaded once from a GTFS `stops.txt`-shaped CSV and only read afterwards.
//! Only `stop_id` and `stop_name` columns are required; `borough` is picked up
//! when present.

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::convention::parent_station_id;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopInfo {
    pub name: String,
    pub borough: Option<String>,
}

/// Read-only lookup of stop ids.
pub trait StopLookup {
    fn lookup(&self, stop_id: &str) -> Option<&StopInfo>;
}

#[derive(Debug, Deserialize)]
struct StopRow {
    stop_id: String,
    stop_name: String,
    #[serde(default)]
    borough: Option<String>,
}

/// In-memory stop table.
#[derive(Debug, Clone, Default)]
pub struct StopReference {
    stops: HashMap<String, StopInfo>,
}

impl StopReference {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reference = Self::from_reader(std::fs::File::open(path)?)?;
        info!(path = %path.display(), stops = reference.len(), "Stop reference loaded");
        Ok(reference)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut stops = HashMap::new();
        for row in rdr.deserialize::<StopRow>() {
            let row = row?;
            let borough = row.borough.filter(|b| !b.trim().is_empty());
            stops.insert(
                row.stop_id,
                StopInfo {
                    name: row.stop_name,
                    borough,
                },
            );
        }
        Ok(Self { stops })
    }

    pub fn insert(&mut self, stop_id: impl Into<String>, info: StopInfo) {
        self.stops.insert(stop_id.into(), info);
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

impl StopLookup for StopReference {
    /// Tries the exact id first, then the parent station (`"123S"` falls back
    /// to `"123"`).
    fn lookup(&self, stop_id: &str) -> Option<&StopInfo> {
        self.stops
            .get(stop_id)
            .or_else(|| parent_station_id(stop_id).and_then(|parent| self.stops.get(parent)))
    }
}
