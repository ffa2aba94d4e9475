//! trafficscope
//!
//! Given a caller's coordinates, how busy is traffic at the monitored
//! locations nearby? This crate fetches a live snapshot of roadside
//! traffic cameras from a public transport-data feed, joins it with a
//! static table of named areas, estimates vehicle density per camera with
//! a cascade classifier, and ranks the cameras by proximity to the caller.
//!
//! # Architecture
//!
//! Data flows one way through the pipeline:
//!
//! 1. `catalog` and `feed` load independently and meet at the join step,
//!    correlated by camera identifier.
//! 2. `fetch` and `detect` run per camera under a bounded worker pool; a
//!    failing camera is dropped, never the whole run.
//! 3. `rank` orders the surviving records by squared planar distance when
//!    a query coordinate was supplied, or leaves feed order untouched.
//!
//! Every run is request-scoped and stateless; only the detection model is
//! process-lifetime state, loaded once and read-only afterward.
//!
//! # Module Structure
//!
//! - `camera`: coordinate and record types flowing through a run
//! - `catalog`: static identifier-to-area table
//! - `feed`: live snapshot client and payload decoding
//! - `fetch`: per-camera image download and grayscale decode
//! - `detect`: cascade model, density estimator, test stub
//! - `rank`: proximity metric and ordering
//! - `pipeline`: the orchestrating context object
//! - `config`: file/env configuration
//! - `errors`: the failure taxonomy

pub mod camera;
pub mod catalog;
pub mod config;
pub mod detect;
pub mod errors;
pub mod feed;
pub mod fetch;
pub mod pipeline;
pub mod rank;

pub use camera::{CameraRecord, Coordinate, FeedCamera, QueryCoordinate};
pub use catalog::AreaCatalog;
pub use config::{DetectionSettings, TrafficscopeConfig};
pub use detect::{CascadeEstimator, CascadeModel, DensityEstimator, StubEstimator, StubOutcome};
pub use errors::PipelineError;
pub use feed::{parse_snapshot, HttpFeedClient, SnapshotSource};
pub use fetch::{decode_gray, HttpImageFetcher, ImageSource};
pub use pipeline::Pipeline;
pub use rank::{rank, squared_distance};
