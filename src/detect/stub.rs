//! Scripted estimator for tests and offline demos.

use std::sync::Mutex;

use image::GrayImage;

use crate::detect::estimator::DensityEstimator;
use crate::errors::PipelineError;

/// Returns a scripted sequence of counts (or failures) regardless of the
/// frame content, then repeats the final entry. Useful for exercising the
/// pipeline without a trained model.
pub struct StubEstimator {
    script: Mutex<ScriptState>,
}

struct ScriptState {
    entries: Vec<StubOutcome>,
    cursor: usize,
}

/// One scripted detection outcome.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    Count(u32),
    Fail(String),
}

impl StubEstimator {
    /// Always report `count` vehicles.
    pub fn fixed(count: u32) -> Self {
        Self::scripted(vec![StubOutcome::Count(count)])
    }

    /// Play back `entries` in order, repeating the last one.
    pub fn scripted(entries: Vec<StubOutcome>) -> Self {
        Self {
            script: Mutex::new(ScriptState { entries, cursor: 0 }),
        }
    }
}

impl DensityEstimator for StubEstimator {
    fn estimate(&self, _image: &GrayImage) -> Result<u32, PipelineError> {
        let mut state = match self.script.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let index = state.cursor.min(state.entries.len().saturating_sub(1));
        state.cursor += 1;
        match state.entries.get(index) {
            Some(StubOutcome::Count(count)) => Ok(*count),
            Some(StubOutcome::Fail(reason)) => {
                Err(PipelineError::ImageDecodeError(reason.clone()))
            }
            None => Ok(0),
        }
    }
}
