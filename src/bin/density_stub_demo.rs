//! Offline walkthrough of the aggregation pipeline.
//!
//! Wires scripted sources through the real pipeline so the join, the
//! partial-failure policy and the ranking can be watched without network
//! access or a trained model. Run with `cargo run --bin density_stub_demo`.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::GrayImage;

use trafficscope::{
    Coordinate, FeedCamera, ImageSource, Pipeline, PipelineError, SnapshotSource, StubEstimator,
};

/// Fixed three-camera snapshot around central Singapore.
struct DemoFeed;

impl SnapshotSource for DemoFeed {
    fn fetch_snapshot(&self) -> Result<Vec<FeedCamera>, PipelineError> {
        Ok(vec![
            FeedCamera {
                camera_id: "1001".into(),
                image_url: "demo://1001".into(),
                location: Coordinate::new(1.29531332, 103.871146),
            },
            FeedCamera {
                camera_id: "1002".into(),
                image_url: "demo://1002".into(),
                location: Coordinate::new(1.319541067, 103.8785627),
            },
            FeedCamera {
                camera_id: "1501".into(),
                image_url: "demo://1501".into(),
                location: Coordinate::new(1.274143944, 103.8513168),
            },
        ])
    }
}

/// Hands every camera the same blank frame; the scripted estimator does
/// the talking.
struct BlankImages;

impl ImageSource for BlankImages {
    fn fetch(&self, _url: &str) -> Result<GrayImage, PipelineError> {
        Ok(GrayImage::new(64, 64))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let catalog_path = std::env::temp_dir().join(format!("trafficscope_demo_{}.csv", std::process::id()));
    {
        let mut catalog = std::fs::File::create(&catalog_path).context("demo catalog")?;
        writeln!(catalog, "id,latitude,longitude,area")?;
        writeln!(catalog, "1001,1.29531332,103.871146,Kallang")?;
        writeln!(catalog, "1002,1.319541067,103.8785627,Toa Payoh")?;
        // 1501 is deliberately missing: the feed may know cameras the
        // catalog does not, and such records keep an empty area label.
    }

    let pipeline = Pipeline::new(
        catalog_path.as_path(),
        Box::new(DemoFeed),
        Box::new(BlankImages),
        Arc::new(StubEstimator::fixed(5)),
        2,
    );

    let query = Some(Coordinate::new(1.30, 103.86));
    let records = pipeline.run(query).context("pipeline run");
    let _ = std::fs::remove_file(&catalog_path);
    println!("{}", serde_json::to_string_pretty(&records?)?);
    Ok(())
}
