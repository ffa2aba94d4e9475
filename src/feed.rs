//! Live camera feed client.
//!
//! One HTTP GET against the public transport-data endpoint yields a JSON
//! document shaped as `items[0].cameras[]`, each camera carrying
//! `camera_id`, `image` (a URL) and `location.{latitude,longitude}`.
//! Decoding is split from transport so structural failures are testable
//! from string fixtures.
//!
//! The client performs no retries; retry policy, if any wanted, belongs to
//! the orchestrator.

use std::io::Read;

use serde::Deserialize;

use crate::camera::{Coordinate, FeedCamera};
use crate::errors::PipelineError;

const MAX_FEED_BYTES: u64 = 4 * 1024 * 1024;

/// Source of one feed snapshot. The HTTP client implements this; tests
/// substitute scripted sources.
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current camera list.
    ///
    /// Identifiers are unique within one snapshot per the feed contract;
    /// the client does not dedupe.
    fn fetch_snapshot(&self) -> Result<Vec<FeedCamera>, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct FeedDocument {
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    cameras: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    camera_id: String,
    image: String,
    location: FeedLocation,
}

#[derive(Debug, Deserialize)]
struct FeedLocation {
    latitude: f64,
    longitude: f64,
}

/// Decode a feed payload into feed cameras, preserving arrival order.
pub fn parse_snapshot(raw: &str) -> Result<Vec<FeedCamera>, PipelineError> {
    let document: FeedDocument =
        serde_json::from_str(raw).map_err(|e| PipelineError::FeedMalformed(e.to_string()))?;
    let item = document
        .items
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::FeedMalformed("empty items array".to_string()))?;
    Ok(item
        .cameras
        .into_iter()
        .map(|entry| FeedCamera {
            camera_id: entry.camera_id,
            image_url: entry.image,
            location: Coordinate::new(entry.location.latitude, entry.location.longitude),
        })
        .collect())
}

/// HTTP client for the live feed endpoint.
pub struct HttpFeedClient {
    agent: ureq::Agent,
    url: String,
}

impl HttpFeedClient {
    /// `agent` carries the per-call timeout; shared with the image fetcher.
    pub fn new(agent: ureq::Agent, url: impl Into<String>) -> Self {
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl SnapshotSource for HttpFeedClient {
    fn fetch_snapshot(&self) -> Result<Vec<FeedCamera>, PipelineError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| PipelineError::FeedUnavailable(e.to_string()))?;
        let mut raw = String::new();
        response
            .into_reader()
            .take(MAX_FEED_BYTES)
            .read_to_string(&mut raw)
            .map_err(|e| PipelineError::FeedUnavailable(format!("read feed body: {}", e)))?;
        parse_snapshot(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "items": [{
            "timestamp": "2020-03-29T11:28:07+08:00",
            "cameras": [
                {
                    "timestamp": "2020-03-29T11:25:49+08:00",
                    "camera_id": "1001",
                    "image": "https://images.example/1001.jpg",
                    "location": { "latitude": 1.29531332, "longitude": 103.871146 }
                },
                {
                    "timestamp": "2020-03-29T11:25:49+08:00",
                    "camera_id": "1004",
                    "image": "https://images.example/1004.jpg",
                    "location": { "latitude": 1.319541067, "longitude": 103.8785627 }
                }
            ]
        }],
        "api_info": { "status": "healthy" }
    }"#;

    #[test]
    fn parses_nested_snapshot_in_arrival_order() {
        let cameras = parse_snapshot(SNAPSHOT).unwrap();
        assert_eq!(cameras.len(), 2);
        assert_eq!(cameras[0].camera_id, "1001");
        assert_eq!(cameras[1].camera_id, "1004");
        assert_eq!(cameras[0].image_url, "https://images.example/1001.jpg");
        assert!((cameras[1].location.latitude - 1.319541067).abs() < 1e-12);
    }

    #[test]
    fn missing_structural_key_is_malformed() {
        let raw = r#"{ "items": [{ "cameras": [{ "camera_id": "1001" }] }] }"#;
        let err = parse_snapshot(raw).unwrap_err();
        assert!(matches!(err, PipelineError::FeedMalformed(_)));
    }

    #[test]
    fn empty_items_array_is_malformed() {
        let err = parse_snapshot(r#"{ "items": [] }"#).unwrap_err();
        assert!(matches!(err, PipelineError::FeedMalformed(_)));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_snapshot("<html>down for maintenance</html>").unwrap_err();
        assert!(matches!(err, PipelineError::FeedMalformed(_)));
    }

    #[test]
    fn empty_cameras_array_is_well_formed() {
        let cameras = parse_snapshot(r#"{ "items": [{ "cameras": [] }] }"#).unwrap();
        assert!(cameras.is_empty());
    }
}
