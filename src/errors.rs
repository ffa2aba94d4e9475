//! Error taxonomy for the aggregation pipeline.
//!
//! Every failure mode an external collaborator can trigger has its own
//! variant, because the pipeline reacts differently per kind: catalog and
//! feed failures abort the whole run, per-camera image failures only drop
//! that camera, and a missing detection model prevents startup entirely.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The camera catalog resource could not be read at all.
    #[error("camera catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A catalog row did not carry the expected columns.
    #[error("camera catalog malformed (line {line}): {reason}")]
    CatalogMalformed { line: usize, reason: String },

    /// Transport-level failure talking to the live camera feed.
    #[error("traffic feed unavailable: {0}")]
    FeedUnavailable(String),

    /// The feed answered, but the expected structural keys were missing.
    #[error("traffic feed malformed: {0}")]
    FeedMalformed(String),

    /// Transport-level failure downloading one camera's snapshot image.
    #[error("camera image unavailable: {0}")]
    ImageUnavailable(String),

    /// The downloaded bytes were not a decodable image.
    #[error("camera image decode failed: {0}")]
    ImageDecodeError(String),

    /// The cascade model could not be loaded. Fatal at startup; detection
    /// never begins without a model.
    #[error("detection model unavailable: {0}")]
    ModelUnavailable(String),

    /// Every camera in the snapshot failed its fetch-and-detect step.
    #[error("no camera produced a usable detection")]
    NoDataAvailable,
}

impl PipelineError {
    /// True for failures that drop a single camera rather than the run.
    /// Used by the pipeline's partial-failure policy.
    pub fn is_per_camera(&self) -> bool {
        matches!(
            self,
            PipelineError::ImageUnavailable(_) | PipelineError::ImageDecodeError(_)
        )
    }
}
