//! Error type shared by the library.
//!
//! Failures fall into three groups: usage errors (the caller asked for
//! something malformed), upstream errors (fetching or decoding the feed
//! failed) and static-table errors. Problems with individual feed records are
//! not errors at all; see [`crate::diagnostics`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown filter criterion: {0}")]
    UnknownCriterion(String),
    #[error("Invalid value for criterion {criterion}: {reason}")]
    InvalidCriterion { criterion: String, reason: String },
    #[error("No feed snapshot loaded, refresh the session first")]
    NotLoaded,
    #[error("Invalid feed specifier: {0}")]
    InvalidFeedSpecifier(String),
    #[error("Invalid API key header: {0}")]
    InvalidApiKey(String),

    #[error("Feed fetch error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Feed fetch from {url} returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },
    #[error("Feed decode error: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stop table error: {0}")]
    StopTable(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid_criterion(criterion: &str, reason: impl Into<String>) -> Self {
        Error::InvalidCriterion {
            criterion: criterion.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by how the library was called.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::UnknownCriterion(_)
                | Error::InvalidCriterion { .. }
                | Error::NotLoaded
                | Error::InvalidFeedSpecifier(_)
                | Error::InvalidApiKey(_)
        )
    }

    /// Returns `true` for errors raised while fetching or decoding a feed.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Fetch(_) | Error::FetchStatus { .. } | Error::Decode(_) | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
