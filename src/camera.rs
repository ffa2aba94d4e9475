//! Core data carriers for one pipeline run.
//!
//! Everything here is request-scoped: records are built fresh from the live
//! feed on each run and discarded once the response is produced.

use serde::Serialize;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The caller's position, when location permission was granted.
///
/// Absent means "rank nothing": results keep feed-arrival order and carry
/// no distance field.
pub type QueryCoordinate = Coordinate;

/// One camera as it arrives from the live feed, before the catalog join
/// and before detection.
#[derive(Debug, Clone)]
pub struct FeedCamera {
    pub camera_id: String,
    pub image_url: String,
    pub location: Coordinate,
}

/// One fully assembled result record.
///
/// `area` is looked up from the catalog, never computed; it is empty when
/// the feed references a camera the catalog does not know (a newly added
/// camera is valid, not an error). `vehicle_count` is always present in a
/// returned record: a camera whose detection failed is dropped, never
/// emitted with a missing count. `distance` is the squared planar distance
/// to the query coordinate and exists only when one was supplied.
#[derive(Debug, Clone, Serialize)]
pub struct CameraRecord {
    pub camera_id: String,
    pub area: String,
    pub image_url: String,
    pub location: Coordinate,
    pub vehicle_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl CameraRecord {
    /// Build a record from a feed camera, the catalog's label for it and
    /// the detection result. Distance is attached later by the ranker.
    pub fn assemble(camera: FeedCamera, area: Option<&str>, vehicle_count: u32) -> Self {
        Self {
            camera_id: camera.camera_id,
            area: area.unwrap_or_default().to_string(),
            image_url: camera.image_url,
            location: camera.location,
            vehicle_count,
            distance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_without_catalog_match_leaves_area_empty() {
        let camera = FeedCamera {
            camera_id: "1501".into(),
            image_url: "https://images.example/1501.jpg".into(),
            location: Coordinate::new(1.274, 103.851),
        };
        let record = CameraRecord::assemble(camera, None, 4);
        assert_eq!(record.area, "");
        assert_eq!(record.vehicle_count, 4);
        assert!(record.distance.is_none());
    }

    #[test]
    fn distance_is_omitted_from_json_when_absent() {
        let record = CameraRecord {
            camera_id: "1001".into(),
            area: "Toa Payoh".into(),
            image_url: "https://images.example/1001.jpg".into(),
            location: Coordinate::new(1.33, 103.85),
            vehicle_count: 0,
            distance: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("distance"));
    }
}
