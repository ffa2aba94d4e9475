//! Proximity ranking.
//!
//! Orders result records by how close each camera sits to the caller.
//! The metric is the sum of squared coordinate differences in degrees — a
//! planar approximation, not geodesic distance. Over the few kilometers
//! separating cameras in one city the approximation is monotonic with true
//! distance, which is all an ordering needs; callers must not read the
//! value as meters.

use crate::camera::{CameraRecord, Coordinate, QueryCoordinate};

/// Squared planar distance between two coordinates, in degrees squared.
///
/// Zero for identical points, symmetric in its arguments, never negative.
pub fn squared_distance(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = a.latitude - b.latitude;
    let dlon = a.longitude - b.longitude;
    dlat * dlat + dlon * dlon
}

/// Attach distances and sort nearest-first when a query coordinate is
/// present; leave feed-arrival order untouched when it is not.
///
/// The sort is stable, so cameras at equal distance keep their feed order.
pub fn rank(mut records: Vec<CameraRecord>, query: Option<QueryCoordinate>) -> Vec<CameraRecord> {
    let Some(query) = query else {
        return records;
    };
    for record in &mut records {
        record.distance = Some(squared_distance(record.location, query));
    }
    records.sort_by(|a, b| {
        let da = a.distance.unwrap_or(f64::INFINITY);
        let db = b.distance.unwrap_or(f64::INFINITY);
        da.total_cmp(&db)
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(camera_id: &str, latitude: f64, longitude: f64) -> CameraRecord {
        CameraRecord {
            camera_id: camera_id.to_string(),
            area: String::new(),
            image_url: format!("https://images.example/{camera_id}.jpg"),
            location: Coordinate::new(latitude, longitude),
            vehicle_count: 0,
            distance: None,
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = Coordinate::new(1.3521, 103.8198);
        assert_eq!(squared_distance(p, p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinate::new(1.29, 103.85);
        let b = Coordinate::new(1.35, 103.99);
        assert_eq!(squared_distance(a, b), squared_distance(b, a));
    }

    #[test]
    fn distance_is_never_negative() {
        let a = Coordinate::new(-1.5, -103.0);
        let b = Coordinate::new(1.5, 103.0);
        assert!(squared_distance(a, b) >= 0.0);
    }

    #[test]
    fn ranks_nearest_first_with_non_decreasing_distances() {
        let query = Coordinate::new(1.30, 103.85);
        let records = vec![
            record("far", 2.30, 103.85),
            record("near", 1.30, 103.86),
            record("exact", 1.30, 103.85),
        ];
        let ranked = rank(records, Some(query));
        let ids: Vec<&str> = ranked.iter().map(|r| r.camera_id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near", "far"]);
        let distances: Vec<f64> = ranked.iter().map(|r| r.distance.unwrap()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn without_query_order_is_identity_and_distance_absent() {
        let records = vec![record("b", 1.4, 103.9), record("a", 1.3, 103.8)];
        let ranked = rank(records, None);
        assert_eq!(ranked[0].camera_id, "b");
        assert_eq!(ranked[1].camera_id, "a");
        assert!(ranked.iter().all(|r| r.distance.is_none()));
    }

    #[test]
    fn ties_keep_feed_order() {
        let query = Coordinate::new(0.0, 0.0);
        // Mirror-image cameras, identical squared distance.
        let records = vec![record("first", 1.0, 0.0), record("second", -1.0, 0.0)];
        let ranked = rank(records, Some(query));
        assert_eq!(ranked[0].camera_id, "first");
        assert_eq!(ranked[1].camera_id, "second");
    }
}
