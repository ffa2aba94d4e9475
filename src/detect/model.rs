//! Cascade model resource.
//!
//! The model is a JSON file describing a staged classifier over Haar-style
//! rectangle features, pre-trained for roadside vehicle silhouettes. It is
//! loaded exactly once per process; a load or validation failure is
//! `ModelUnavailable`, which callers treat as fatal at startup.
//!
//! Feature convention: a weak classifier sums `weight * mean_luminance`
//! over its rectangles (mean normalized to 0..1), compares the sum against
//! its threshold and contributes `pass_value` or `fail_value` to the stage
//! total. A window survives a stage when the stage total reaches the stage
//! threshold; surviving every stage makes the window a raw detection.

use std::path::Path;

use serde::Deserialize;

use crate::errors::PipelineError;

/// One weighted rectangle of a Haar-style feature, in base-window
/// coordinates. Scaled along with the detection window during the scan.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeakClassifier {
    pub rects: Vec<FeatureRect>,
    pub threshold: f64,
    pub pass_value: f64,
    pub fail_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stage {
    pub threshold: f64,
    pub weak: Vec<WeakClassifier>,
}

/// A full staged cascade plus its base detection window size.
#[derive(Debug, Clone, Deserialize)]
pub struct CascadeModel {
    pub window_width: u32,
    pub window_height: u32,
    pub stages: Vec<Stage>,
}

impl CascadeModel {
    /// Load and validate the model file at `path`.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
        let model: CascadeModel = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
        model.validate()?;
        Ok(model)
    }

    /// Structural sanity: a degenerate model would otherwise only surface
    /// as silently wrong counts deep inside the scan.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(PipelineError::ModelUnavailable(
                "detection window has zero dimension".to_string(),
            ));
        }
        if self.stages.is_empty() {
            return Err(PipelineError::ModelUnavailable(
                "cascade has no stages".to_string(),
            ));
        }
        for (stage_index, stage) in self.stages.iter().enumerate() {
            if stage.weak.is_empty() {
                return Err(PipelineError::ModelUnavailable(format!(
                    "stage {} has no weak classifiers",
                    stage_index
                )));
            }
            for weak in &stage.weak {
                if weak.rects.is_empty() {
                    return Err(PipelineError::ModelUnavailable(format!(
                        "stage {} has a featureless weak classifier",
                        stage_index
                    )));
                }
                for rect in &weak.rects {
                    if rect.w == 0 || rect.h == 0 {
                        return Err(PipelineError::ModelUnavailable(format!(
                            "stage {} has a zero-area feature rectangle",
                            stage_index
                        )));
                    }
                    if rect.x + rect.w > self.window_width || rect.y + rect.h > self.window_height {
                        return Err(PipelineError::ModelUnavailable(format!(
                            "stage {} has a feature rectangle outside the detection window",
                            stage_index
                        )));
                    }
                    if !rect.weight.is_finite() {
                        return Err(PipelineError::ModelUnavailable(format!(
                            "stage {} has a non-finite feature weight",
                            stage_index
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
