//! Per-camera image retrieval.
//!
//! Downloads one camera's snapshot bytes and decodes them into a grayscale
//! buffer ready for the cascade. A fetch is a pure function of its URL: no
//! state is shared between cameras, which is what makes the pipeline's
//! fan-out safe.

use std::io::Read;

use image::GrayImage;

use crate::errors::PipelineError;

/// Cap on a single camera image download. Feed snapshots are sub-megabyte
/// JPEGs; anything past this is a misbehaving server.
const MAX_IMAGE_BYTES: u64 = 8 * 1024 * 1024;

/// Source of decoded camera images. The HTTP fetcher implements this;
/// tests substitute scripted sources.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<GrayImage, PipelineError>;
}

/// Fetches images over HTTP with the shared agent's timeout.
pub struct HttpImageFetcher {
    agent: ureq::Agent,
}

impl HttpImageFetcher {
    pub fn new(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl ImageSource for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<GrayImage, PipelineError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| PipelineError::ImageUnavailable(format!("{}: {}", url, e)))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| PipelineError::ImageUnavailable(format!("{}: {}", url, e)))?;
        decode_gray(&bytes)
    }
}

/// Decode encoded image bytes to grayscale. The cascade operates on
/// luminance only, so conversion happens here rather than per detection.
pub fn decode_gray(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::ImageDecodeError(e.to_string()))?;
    Ok(decoded.to_luma8())
}
