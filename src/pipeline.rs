//! The aggregation pipeline.
//!
//! One `run` answers one request: load the catalog and the live feed
//! snapshot (concurrently, both mandatory), join them by camera
//! identifier, fetch and analyze every camera image under a bounded worker
//! pool, then rank by proximity to the optional query coordinate.
//!
//! Partial-failure policy: a camera whose image fetch or detection fails
//! is logged with its identifier and dropped; the run itself fails only
//! when the catalog or feed is unusable, or when every camera dropped
//! (`NoDataAvailable`).
//!
//! The pipeline is an explicitly constructed context object: built once at
//! startup, handed to whoever serves requests, and stateless between runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::camera::{CameraRecord, FeedCamera, QueryCoordinate};
use crate::catalog::AreaCatalog;
use crate::config::TrafficscopeConfig;
use crate::detect::{CascadeEstimator, CascadeModel, DensityEstimator};
use crate::errors::PipelineError;
use crate::feed::{HttpFeedClient, SnapshotSource};
use crate::fetch::{HttpImageFetcher, ImageSource};
use crate::rank;

pub struct Pipeline {
    catalog_path: PathBuf,
    feed: Box<dyn SnapshotSource>,
    images: Box<dyn ImageSource>,
    // Shared read-only across the worker pool; the model is never mutated
    // after load.
    estimator: Arc<dyn DensityEstimator>,
    concurrency: usize,
}

impl Pipeline {
    /// Wire a pipeline from explicit parts. Tests use this with scripted
    /// sources; production wiring lives in [`Pipeline::from_config`].
    pub fn new(
        catalog_path: impl Into<PathBuf>,
        feed: Box<dyn SnapshotSource>,
        images: Box<dyn ImageSource>,
        estimator: Arc<dyn DensityEstimator>,
        concurrency: usize,
    ) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            feed,
            images,
            estimator,
            concurrency: concurrency.max(1),
        }
    }

    /// Production wiring: cascade model from disk (a failure here is fatal,
    /// the process must not start without a model) and one HTTP agent whose
    /// timeout covers both the feed call and every image download.
    pub fn from_config(cfg: &TrafficscopeConfig) -> Result<Self, PipelineError> {
        let model = CascadeModel::load(Path::new(&cfg.model_path))?;
        let estimator = Arc::new(CascadeEstimator::new(model, cfg.detection));
        let agent = ureq::AgentBuilder::new().timeout(cfg.timeout).build();
        Ok(Self::new(
            cfg.catalog_path.clone(),
            Box::new(HttpFeedClient::new(agent.clone(), cfg.feed_url.clone())),
            Box::new(HttpImageFetcher::new(agent)),
            estimator,
            cfg.concurrency,
        ))
    }

    /// Execute one request-scoped run.
    pub fn run(
        &self,
        query: Option<QueryCoordinate>,
    ) -> Result<Vec<CameraRecord>, PipelineError> {
        // Catalog and feed are independent; overlap their I/O. Both must
        // land before the join step.
        let (catalog_result, feed_result) = std::thread::scope(|scope| {
            let catalog_task = scope.spawn(|| AreaCatalog::load(&self.catalog_path));
            let feed_result = self.feed.fetch_snapshot();
            let catalog_result = match catalog_task.join() {
                Ok(result) => result,
                Err(_) => Err(PipelineError::CatalogUnavailable(
                    "catalog loader panicked".to_string(),
                )),
            };
            (catalog_result, feed_result)
        });
        let catalog = catalog_result?;
        let cameras = feed_result?;
        log::info!(
            "snapshot has {} cameras, catalog has {} entries",
            cameras.len(),
            catalog.len()
        );

        let records = self.fan_out(&cameras, &catalog);
        if records.is_empty() {
            return Err(PipelineError::NoDataAvailable);
        }
        log::info!(
            "kept {} of {} cameras after detection",
            records.len(),
            cameras.len()
        );
        Ok(rank::rank(records, query))
    }

    /// Bounded fan-out over the camera list. Workers pull indices from a
    /// shared cursor and write into their camera's slot, so feed order
    /// survives regardless of completion order.
    fn fan_out(&self, cameras: &[FeedCamera], catalog: &AreaCatalog) -> Vec<CameraRecord> {
        let total = cameras.len();
        let cursor = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<CameraRecord>>> = Mutex::new(vec![None; total]);
        let workers = self.concurrency.min(total);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    if index >= total {
                        break;
                    }
                    let camera = &cameras[index];
                    match self.process_camera(camera, catalog) {
                        Ok(record) => {
                            let mut slots = match slots.lock() {
                                Ok(slots) => slots,
                                Err(poisoned) => poisoned.into_inner(),
                            };
                            slots[index] = Some(record);
                        }
                        Err(err) if err.is_per_camera() => {
                            log::warn!("camera {} dropped: {}", camera.camera_id, err);
                        }
                        Err(err) => {
                            // Estimator backends can surface non-transport
                            // failures; still only this camera drops.
                            log::error!("camera {} dropped: {}", camera.camera_id, err);
                        }
                    }
                });
            }
        });

        let slots = match slots.into_inner() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.into_iter().flatten().collect()
    }

    fn process_camera(
        &self,
        camera: &FeedCamera,
        catalog: &AreaCatalog,
    ) -> Result<CameraRecord, PipelineError> {
        let image = self.images.fetch(&camera.image_url)?;
        let count = self.estimator.estimate(&image)?;
        log::debug!("camera {}: {} vehicles", camera.camera_id, count);
        Ok(CameraRecord::assemble(
            camera.clone(),
            catalog.area_for(&camera.camera_id),
            count,
        ))
    }
}
