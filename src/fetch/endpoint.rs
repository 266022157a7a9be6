use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const FEED_BASE: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2F";

/// Line id to feed path, one entry per published line or shuttle.
const LINE_FEEDS: &[(&str, &str)] = &[
    ("1", "gtfs"),
    ("2", "gtfs"),
    ("3", "gtfs"),
    ("4", "gtfs"),
    ("5", "gtfs"),
    ("6", "gtfs"),
    ("7", "gtfs"),
    ("S", "gtfs"),
    ("GS", "gtfs"),
    ("A", "gtfs-ace"),
    ("C", "gtfs-ace"),
    ("E", "gtfs-ace"),
    ("H", "gtfs-ace"),
    ("FS", "gtfs-ace"),
    ("SF", "gtfs-ace"),
    ("SR", "gtfs-ace"),
    ("B", "gtfs-bdfm"),
    ("D", "gtfs-bdfm"),
    ("F", "gtfs-bdfm"),
    ("M", "gtfs-bdfm"),
    ("G", "gtfs-g"),
    ("J", "gtfs-jz"),
    ("Z", "gtfs-jz"),
    ("N", "gtfs-nqrw"),
    ("Q", "gtfs-nqrw"),
    ("R", "gtfs-nqrw"),
    ("W", "gtfs-nqrw"),
    ("L", "gtfs-l"),
    ("SI", "gtfs-si"),
    ("SS", "gtfs-si"),
    ("SIR", "gtfs-si"),
];

/// Feed URL carrying `line_id`, if it is a known line.
pub fn feed_url_for_line(line_id: &str) -> Option<String> {
    LINE_FEEDS
        .iter()
        .find(|(line, _)| *line == line_id)
        .map(|(_, path)| format!("{FEED_BASE}{path}"))
}

/// Where a session gets its feed bytes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSpecifier {
    Url(Url),
    File(PathBuf),
}

impl FeedSpecifier {
    /// Accepts a line id (`"1"`, `"A"`, `"SIR"`) or an absolute feed URL.
    pub fn parse(specifier: &str) -> Result<Self> {
        if let Some(url) = feed_url_for_line(specifier) {
            let url = Url::parse(&url).map_err(|e| Error::InvalidFeedSpecifier(e.to_string()))?;
            return Ok(Self::Url(url));
        }

        match Url::parse(specifier) {
            Ok(url) if url.has_host() => Ok(Self::Url(url)),
            _ => Err(Error::InvalidFeedSpecifier(format!(
                "{specifier}: expected a line id or a feed URL with scheme and host"
            ))),
        }
    }

    /// Like [`Self::parse`], but an existing file path is taken as a stored
    /// feed.
    pub fn resolve(specifier: &str) -> Result<Self> {
        let path = Path::new(specifier);
        if feed_url_for_line(specifier).is_none() && path.is_file() {
            return Ok(Self::File(path.to_path_buf()));
        }
        Self::parse(specifier)
    }
}

impl fmt::Display for FeedSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_ids_share_feeds() {
        assert_eq!(feed_url_for_line("1"), feed_url_for_line("GS"));
        assert!(feed_url_for_line("A").unwrap().ends_with("nyct%2Fgtfs-ace"));
        assert!(feed_url_for_line("SIR").unwrap().ends_with("nyct%2Fgtfs-si"));
        assert_eq!(feed_url_for_line("X"), None);
    }

    #[test]
    fn test_parse_line_id() {
        let FeedSpecifier::Url(url) = FeedSpecifier::parse("Q").unwrap() else {
            panic!("expected a URL");
        };
        assert_eq!(url.host_str(), Some("api-endpoint.mta.info"));
        assert!(url.as_str().ends_with("gtfs-nqrw"));
    }

    #[test]
    fn test_parse_url() {
        let specifier = FeedSpecifier::parse("https://example.com/feeds/gtfs-l").unwrap();
        assert_eq!(specifier.to_string(), "https://example.com/feeds/gtfs-l");
    }

    #[test]
    fn test_parse_rejects_other_text() {
        for bad in ["", "X", "gtfs-ace", "/tmp/feed.pb", "mailto:someone"] {
            let err = FeedSpecifier::parse(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidFeedSpecifier(_)), "{bad}");
        }
    }

    #[test]
    fn test_resolve_missing_file_is_invalid() {
        let err = FeedSpecifier::resolve("/definitely/not/here.pb").unwrap_err();
        assert!(err.is_usage());
    }
}
