//! Vehicle density estimation.
//!
//! A staged cascade classifier scans grayscale camera frames with a
//! multi-scale sliding window and reports how many vehicle-like regions
//! survive stage evaluation and neighbor grouping. The model is loaded
//! once at startup and is read-only afterward, so one estimator is safely
//! shared by every concurrent detection call.
//!
//! - `model`: the cascade resource (stages of rectangle-feature weak
//!   classifiers), its JSON format and validation
//! - `estimator`: the `DensityEstimator` trait and the cascade scan
//! - `stub`: scripted estimator for tests and offline demos

pub mod estimator;
pub mod model;
pub mod stub;

pub use estimator::{CascadeEstimator, DensityEstimator, Detection};
pub use model::CascadeModel;
pub use stub::{StubEstimator, StubOutcome};
