//! Protobuf parser for NYCT GTFS Realtime feeds.

use prost::Message;

use crate::error::Result;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes,
/// including the NYCT extension blocks.
///
/// # Errors
///
/// Returns [`crate::Error::Decode`] if the bytes are not valid protobuf for a
/// `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}
