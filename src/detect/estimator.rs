//! Cascade scan and density estimation.
//!
//! The estimator owns the loaded model and the fixed tuning settings. A
//! frame is scanned with a sliding window grown by `scale_factor` each
//! pass; windows surviving every cascade stage become raw detections, and
//! raw detections are partitioned into neighbor groups. The number of
//! groups with at least `min_neighbors` members is the density estimate.
//!
//! The estimator holds no mutable state after construction, so a single
//! instance serves concurrent detection calls.

use image::GrayImage;

use crate::config::DetectionSettings;
use crate::detect::model::{CascadeModel, Stage};
use crate::errors::PipelineError;

/// Guard against degenerate frames (for example a fully saturated image)
/// where nearly every window passes and pairwise grouping would blow up.
const MAX_RAW_DETECTIONS: usize = 4096;

/// Relative tolerance used when deciding whether two raw detections are
/// neighbors describing the same region.
const GROUPING_EPS: f64 = 0.2;

/// Counts vehicle-like regions in one grayscale frame.
///
/// Zero is a valid result: an empty road has no detections. Failure is
/// reserved for estimators with fallible backends; the cascade itself
/// cannot fail once its model is loaded.
pub trait DensityEstimator: Send + Sync {
    fn estimate(&self, image: &GrayImage) -> Result<u32, PipelineError>;
}

/// One detected region, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Cascade-backed density estimator.
pub struct CascadeEstimator {
    model: CascadeModel,
    settings: DetectionSettings,
}

impl CascadeEstimator {
    pub fn new(model: CascadeModel, settings: DetectionSettings) -> Self {
        Self { model, settings }
    }

    /// Run the full multi-scale scan and return grouped detections.
    pub fn detections(&self, image: &GrayImage) -> Vec<Detection> {
        let (img_w, img_h) = image.dimensions();
        if img_w < self.model.window_width || img_h < self.model.window_height {
            return Vec::new();
        }
        let integral = IntegralImage::new(image);

        let mut raw = Vec::new();
        let mut scale = 1.0f64;
        'scales: loop {
            let win_w = scaled(self.model.window_width, scale);
            let win_h = scaled(self.model.window_height, scale);
            if win_w > img_w || win_h > img_h {
                break;
            }
            // Shift grows with the window so large scales stay cheap.
            let step = (scale.round() as u32).max(1);
            let mut y = 0;
            while y + win_h <= img_h {
                let mut x = 0;
                while x + win_w <= img_w {
                    if self.window_passes(&integral, x, y, win_w, win_h, scale) {
                        raw.push(Detection {
                            x,
                            y,
                            w: win_w,
                            h: win_h,
                        });
                        if raw.len() >= MAX_RAW_DETECTIONS {
                            log::debug!(
                                "raw detection cap {} reached, stopping scan",
                                MAX_RAW_DETECTIONS
                            );
                            break 'scales;
                        }
                    }
                    x += step;
                }
                y += step;
            }
            scale *= self.settings.scale_factor;
        }

        group_detections(raw, self.settings.min_neighbors)
    }

    fn window_passes(
        &self,
        integral: &IntegralImage,
        x: u32,
        y: u32,
        win_w: u32,
        win_h: u32,
        scale: f64,
    ) -> bool {
        for stage in &self.model.stages {
            if !self.stage_passes(stage, integral, x, y, win_w, win_h, scale) {
                return false;
            }
        }
        true
    }

    fn stage_passes(
        &self,
        stage: &Stage,
        integral: &IntegralImage,
        x: u32,
        y: u32,
        win_w: u32,
        win_h: u32,
        scale: f64,
    ) -> bool {
        let mut total = 0.0;
        for weak in &stage.weak {
            let mut feature = 0.0;
            for rect in &weak.rects {
                // Scale the base-window rectangle and clamp rounding
                // overshoot back inside the window.
                let rx = (x + scaled_offset(rect.x, scale)).min(x + win_w - 1);
                let ry = (y + scaled_offset(rect.y, scale)).min(y + win_h - 1);
                let rw = scaled(rect.w, scale).min(x + win_w - rx);
                let rh = scaled(rect.h, scale).min(y + win_h - ry);
                let area = (rw as f64) * (rh as f64);
                let mean = integral.rect_sum(rx, ry, rw, rh) as f64 / (area * 255.0);
                feature += rect.weight * mean;
            }
            total += if feature >= weak.threshold {
                weak.pass_value
            } else {
                weak.fail_value
            };
        }
        total >= stage.threshold
    }
}

impl DensityEstimator for CascadeEstimator {
    fn estimate(&self, image: &GrayImage) -> Result<u32, PipelineError> {
        Ok(self.detections(image).len() as u32)
    }
}

/// Scale a window or feature dimension; never collapses below one pixel.
fn scaled(value: u32, scale: f64) -> u32 {
    ((value as f64) * scale).round().max(1.0) as u32
}

/// Scale a feature offset; zero stays zero.
fn scaled_offset(value: u32, scale: f64) -> u32 {
    ((value as f64) * scale).round() as u32
}

/// Summed-area table with one guard row and column, so any rectangle sum
/// is four lookups.
struct IntegralImage {
    stride: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let (w, h) = (w as usize, h as usize);
        let stride = w + 1;
        let mut sums = vec![0u64; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0u64;
            for x in 0..w {
                row_sum += u64::from(image.get_pixel(x as u32, y as u32)[0]);
                sums[(y + 1) * stride + (x + 1)] = sums[y * stride + (x + 1)] + row_sum;
            }
        }
        Self { stride, sums }
    }

    fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        let stride = self.stride;
        let a = self.sums[y * stride + x];
        let b = self.sums[y * stride + (x + w)];
        let c = self.sums[(y + h) * stride + x];
        let d = self.sums[(y + h) * stride + (x + w)];
        d + a - b - c
    }
}

/// Partition raw detections into neighbor groups and keep groups with at
/// least `min_neighbors` members, averaged into one rectangle each.
///
/// Similarity is transitive across the partition (union-find), so a dense
/// cloud of overlapping windows around one vehicle collapses into a single
/// group. `min_neighbors == 0` disables grouping and returns the raw
/// windows unchanged.
fn group_detections(raw: Vec<Detection>, min_neighbors: u32) -> Vec<Detection> {
    if min_neighbors == 0 || raw.is_empty() {
        return raw;
    }

    let mut parents: Vec<usize> = (0..raw.len()).collect();
    for i in 0..raw.len() {
        for j in (i + 1)..raw.len() {
            if similar(&raw[i], &raw[j]) {
                union(&mut parents, i, j);
            }
        }
    }

    // Accumulate per-root sums, then average. Roots are discovered in
    // first-member order, which keeps the output deterministic.
    let mut order: Vec<usize> = Vec::new();
    let mut groups: std::collections::HashMap<usize, (u64, u64, u64, u64, u32)> =
        std::collections::HashMap::new();
    for (index, det) in raw.iter().enumerate() {
        let root = find(&mut parents, index);
        let entry = groups.entry(root).or_insert_with(|| {
            order.push(root);
            (0, 0, 0, 0, 0)
        });
        entry.0 += u64::from(det.x);
        entry.1 += u64::from(det.y);
        entry.2 += u64::from(det.w);
        entry.3 += u64::from(det.h);
        entry.4 += 1;
    }

    order
        .into_iter()
        .filter_map(|root| {
            let (sx, sy, sw, sh, count) = groups[&root];
            if count < min_neighbors {
                return None;
            }
            let n = u64::from(count);
            Some(Detection {
                x: (sx / n) as u32,
                y: (sy / n) as u32,
                w: (sw / n) as u32,
                h: (sh / n) as u32,
            })
        })
        .collect()
}

fn similar(a: &Detection, b: &Detection) -> bool {
    let delta = GROUPING_EPS * 0.5 * ((a.w.min(b.w) + a.h.min(b.h)) as f64);
    let close = |p: u32, q: u32| (f64::from(p) - f64::from(q)).abs() <= delta;
    close(a.x, b.x)
        && close(a.y, b.y)
        && close(a.x + a.w, b.x + b.w)
        && close(a.y + a.h, b.y + b.h)
}

fn find(parents: &mut Vec<usize>, mut index: usize) -> usize {
    while parents[index] != index {
        parents[index] = parents[parents[index]];
        index = parents[index];
    }
    index
}

fn union(parents: &mut Vec<usize>, a: usize, b: usize) {
    let ra = find(parents, a);
    let rb = find(parents, b);
    if ra != rb {
        parents[rb] = ra;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::model::{FeatureRect, WeakClassifier};
    use image::Luma;

    /// Single-stage model that fires when the window's mean luminance
    /// exceeds one half of full scale.
    fn brightness_model() -> CascadeModel {
        CascadeModel {
            window_width: 24,
            window_height: 24,
            stages: vec![Stage {
                threshold: 0.5,
                weak: vec![WeakClassifier {
                    rects: vec![FeatureRect {
                        x: 0,
                        y: 0,
                        w: 24,
                        h: 24,
                        weight: 1.0,
                    }],
                    threshold: 0.5,
                    pass_value: 1.0,
                    fail_value: 0.0,
                }],
            }],
        }
    }

    fn settings(scale_factor: f64, min_neighbors: u32) -> DetectionSettings {
        DetectionSettings {
            scale_factor,
            min_neighbors,
        }
    }

    fn paint_square(image: &mut GrayImage, x0: u32, y0: u32, side: u32, value: u8) {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                image.put_pixel(x, y, Luma([value]));
            }
        }
    }

    #[test]
    fn all_black_image_yields_zero() {
        let estimator = CascadeEstimator::new(brightness_model(), settings(1.2, 3));
        let image = GrayImage::new(64, 64);
        assert_eq!(estimator.estimate(&image).unwrap(), 0);
    }

    #[test]
    fn single_bright_square_is_one_group() {
        let mut image = GrayImage::new(64, 64);
        paint_square(&mut image, 8, 8, 24, 255);
        let estimator = CascadeEstimator::new(brightness_model(), settings(1.2, 3));
        assert_eq!(estimator.estimate(&image).unwrap(), 1);
    }

    #[test]
    fn separated_bright_squares_are_two_groups() {
        let mut image = GrayImage::new(128, 64);
        paint_square(&mut image, 4, 8, 24, 255);
        paint_square(&mut image, 90, 20, 24, 255);
        let estimator = CascadeEstimator::new(brightness_model(), settings(1.2, 3));
        assert_eq!(estimator.estimate(&image).unwrap(), 2);
    }

    #[test]
    fn frame_smaller_than_window_yields_zero() {
        let estimator = CascadeEstimator::new(brightness_model(), settings(1.2, 3));
        let image = GrayImage::from_pixel(10, 10, Luma([255]));
        assert_eq!(estimator.estimate(&image).unwrap(), 0);
    }

    #[test]
    fn min_neighbors_zero_keeps_raw_windows() {
        let mut image = GrayImage::new(64, 64);
        paint_square(&mut image, 8, 8, 24, 255);
        let grouped = CascadeEstimator::new(brightness_model(), settings(1.2, 3));
        let ungrouped = CascadeEstimator::new(brightness_model(), settings(1.2, 0));
        let grouped_count = grouped.estimate(&image).unwrap();
        let raw_count = ungrouped.estimate(&image).unwrap();
        assert!(raw_count > grouped_count);
    }

    #[test]
    fn integral_rect_sums_match_direct_summation() {
        let mut image = GrayImage::new(8, 6);
        for y in 0..6 {
            for x in 0..8 {
                image.put_pixel(x, y, Luma([(x * 10 + y) as u8]));
            }
        }
        let integral = IntegralImage::new(&image);
        let mut expected = 0u64;
        for y in 1..5 {
            for x in 2..7 {
                expected += u64::from(image.get_pixel(x, y)[0]);
            }
        }
        assert_eq!(integral.rect_sum(2, 1, 5, 4), expected);
    }

    #[test]
    fn grouping_requires_enough_neighbors() {
        // Two overlapping windows agree; a distant loner does not survive
        // a min_neighbors of two.
        let raw = vec![
            Detection { x: 10, y: 10, w: 24, h: 24 },
            Detection { x: 12, y: 11, w: 24, h: 24 },
            Detection { x: 200, y: 200, w: 24, h: 24 },
        ];
        let grouped = group_detections(raw, 2);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].x, 11);
    }
}
