use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_FEED_URL: &str = "https://api.data.gov.sg/v1/transport/traffic-images";
const DEFAULT_CATALOG_PATH: &str = "cameras.csv";
const DEFAULT_MODEL_PATH: &str = "cars_cascade.json";
const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SCALE_FACTOR: f64 = 1.1;
const DEFAULT_MIN_NEIGHBORS: u32 = 3;

#[derive(Debug, Deserialize, Default)]
struct TrafficscopeConfigFile {
    feed_url: Option<String>,
    catalog_path: Option<String>,
    model_path: Option<String>,
    concurrency: Option<usize>,
    timeout_secs: Option<u64>,
    detection: Option<DetectionConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    scale_factor: Option<f64>,
    min_neighbors: Option<u32>,
}

/// Resolved runtime configuration.
///
/// Loaded from an optional JSON file named by `TRAFFICSCOPE_CONFIG`, then
/// overridden by per-field environment variables, then validated. Every
/// field has a default, so a bare environment also works.
#[derive(Debug, Clone)]
pub struct TrafficscopeConfig {
    /// Live feed endpoint returning the `items[0].cameras` payload.
    pub feed_url: String,
    /// Path to the `[id, latitude, longitude, area]` catalog table.
    pub catalog_path: String,
    /// Path to the cascade model JSON, loaded once at startup.
    pub model_path: String,
    /// Upper bound on simultaneous per-camera fetch-and-detect workers.
    pub concurrency: usize,
    /// Timeout applied to every outbound HTTP call (feed and images).
    pub timeout: Duration,
    pub detection: DetectionSettings,
}

/// Cascade tuning, fixed at startup rather than taken per request. The
/// values were tuned once against this camera-image domain.
#[derive(Debug, Clone, Copy)]
pub struct DetectionSettings {
    /// Multi-scale search granularity: each scan pass grows the detection
    /// window by this factor. Smaller steps find more sizes and cost more.
    pub scale_factor: f64,
    /// False-positive suppression: a detection survives only when at least
    /// this many raw windows agree on roughly the same rectangle.
    pub min_neighbors: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
        }
    }
}

impl TrafficscopeConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TRAFFICSCOPE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: TrafficscopeConfigFile) -> Self {
        let detection = DetectionSettings {
            scale_factor: file
                .detection
                .as_ref()
                .and_then(|d| d.scale_factor)
                .unwrap_or(DEFAULT_SCALE_FACTOR),
            min_neighbors: file
                .detection
                .as_ref()
                .and_then(|d| d.min_neighbors)
                .unwrap_or(DEFAULT_MIN_NEIGHBORS),
        };
        Self {
            feed_url: file.feed_url.unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            catalog_path: file
                .catalog_path
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string()),
            model_path: file
                .model_path
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
            concurrency: file.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            detection,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("TRAFFICSCOPE_FEED_URL") {
            if !url.trim().is_empty() {
                self.feed_url = url;
            }
        }
        if let Ok(path) = std::env::var("TRAFFICSCOPE_CATALOG_PATH") {
            if !path.trim().is_empty() {
                self.catalog_path = path;
            }
        }
        if let Ok(path) = std::env::var("TRAFFICSCOPE_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = path;
            }
        }
        if let Ok(workers) = std::env::var("TRAFFICSCOPE_CONCURRENCY") {
            self.concurrency = workers
                .parse()
                .map_err(|_| anyhow!("TRAFFICSCOPE_CONCURRENCY must be an integer"))?;
        }
        if let Ok(timeout) = std::env::var("TRAFFICSCOPE_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("TRAFFICSCOPE_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.timeout = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        url::Url::parse(&self.feed_url)
            .map_err(|e| anyhow!("feed_url '{}' is not a valid url: {}", self.feed_url, e))?;
        if self.concurrency == 0 {
            return Err(anyhow!("concurrency must be greater than zero"));
        }
        if self.timeout.as_secs() == 0 {
            return Err(anyhow!("timeout must be greater than zero"));
        }
        if self.detection.scale_factor <= 1.0 {
            return Err(anyhow!("detection.scale_factor must be greater than 1.0"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<TrafficscopeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
