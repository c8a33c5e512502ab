use image::imageops::FilterType;
use image::DynamicImage;
use shelftag_core::{merge_overlapping, DetectionConfig, Detection, ScaleTransform};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Detector error: {0}")]
    Engine(String),
}

/// Abstraction over a price-tag object detector.
///
/// Boxes are returned in the coordinates of the image passed in, with
/// proposals below `confidence` already dropped and the detector's own
/// suppression applied at `iou`.
pub trait Detector: Send + Sync {
    fn detect(
        &self,
        image: &DynamicImage,
        confidence: f32,
        iou: f32,
    ) -> Result<Vec<Detection>, DetectError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns the same boxes for every image, minus those under the threshold.
#[derive(Debug, Clone, Default)]
pub struct MockDetector {
    pub boxes: Vec<Detection>,
}

impl MockDetector {
    pub fn new(boxes: Vec<Detection>) -> Self {
        Self { boxes }
    }
}

impl Detector for MockDetector {
    fn detect(
        &self,
        _image: &DynamicImage,
        confidence: f32,
        _iou: f32,
    ) -> Result<Vec<Detection>, DetectError> {
        Ok(self.boxes.iter().copied().filter(|d| d.confidence >= confidence).collect())
    }
}

// ── Multi-scale aggregation ───────────────────────────────────────────────────

/// Runs the detector over an image pyramid and merges the results in native coordinates.
pub struct DetectionAggregator<D: Detector> {
    detector: D,
    config: DetectionConfig,
}

impl<D: Detector> DetectionAggregator<D> {
    pub fn new(detector: D, config: DetectionConfig) -> Self {
        Self { detector, config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect at every configured scale, map back to native pixels, pool, then NMS.
    /// An image with no detections at any scale yields an empty list.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        let pool = self.detect_all_scales(image)?;
        let raw = pool.len();
        let merged = merge_overlapping(pool, self.config.merge_iou);
        tracing::info!(raw, merged = merged.len(), "merged multi-scale detections");
        Ok(merged)
    }

    /// The pooled, unmerged detections from every scale, in native coordinates.
    pub fn detect_all_scales(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        let side = self.config.input_size;
        let threshold = self.config.confidence_threshold;
        let mut pool = Vec::new();

        for &scale in &self.config.scales {
            let transform = ScaleTransform::new(image.width(), image.height(), scale, side);
            let scaled = image.resize_exact(
                transform.scaled_width,
                transform.scaled_height,
                FilterType::Triangle,
            );
            // Non-uniform stretch to the square input; aspect ratio is not kept.
            let square = scaled.resize_exact(side, side, FilterType::Triangle);

            let proposals = self.detector.detect(&square, threshold, self.config.detector_iou)?;
            let before = pool.len();
            pool.extend(
                proposals
                    .into_iter()
                    .filter(|p| p.confidence >= threshold)
                    .map(|p| Detection::new(transform.to_native(&p.bbox), p.confidence)),
            );
            tracing::debug!(scale, found = pool.len() - before, "detector pass");
        }

        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use shelftag_core::BBox;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn shelf(width: u32, height: u32) -> DynamicImage {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        DynamicImage::ImageRgb8(img)
    }

    /// One preset response per detector call; records the input sizes it saw.
    struct ScriptedDetector {
        responses: Mutex<VecDeque<Vec<Detection>>>,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedDetector {
        fn new(responses: Vec<Vec<Detection>>) -> Self {
            Self { responses: Mutex::new(responses.into()), seen: Mutex::new(vec![]) }
        }
    }

    impl Detector for ScriptedDetector {
        fn detect(
            &self,
            image: &DynamicImage,
            _confidence: f32,
            _iou: f32,
        ) -> Result<Vec<Detection>, DetectError> {
            self.seen.lock().unwrap().push((image.width(), image.height()));
            Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    struct BrokenDetector;

    impl Detector for BrokenDetector {
        fn detect(&self, _: &DynamicImage, _: f32, _: f32) -> Result<Vec<Detection>, DetectError> {
            Err(DetectError::Engine("weights missing".into()))
        }
    }

    fn config(scales: Vec<f32>) -> DetectionConfig {
        DetectionConfig { scales, input_size: 64, ..DetectionConfig::default() }
    }

    #[test]
    fn no_detections_is_empty_not_error() {
        let agg = DetectionAggregator::new(MockDetector::default(), config(vec![0.5, 1.0]));
        assert!(agg.detect(&shelf(200, 100)).unwrap().is_empty());
    }

    #[test]
    fn detector_sees_square_input_once_per_scale() {
        let det = ScriptedDetector::new(vec![]);
        let agg = DetectionAggregator::new(det, config(vec![0.4, 1.0, 1.5]));
        agg.detect(&shelf(200, 100)).unwrap();
        assert_eq!(*agg.detector.seen.lock().unwrap(), vec![(64, 64); 3]);
    }

    #[test]
    fn same_tag_at_two_scales_merges_to_best() {
        let native = BBox::new(40.0, 20.0, 120.0, 60.0);
        let t_half = ScaleTransform::new(200, 100, 0.5, 64);
        let t_full = ScaleTransform::new(200, 100, 1.0, 64);

        let det = ScriptedDetector::new(vec![
            vec![Detection::new(t_half.to_square(&native), 0.6)],
            vec![
                Detection::new(t_full.to_square(&native), 0.8),
                // Below the 0.10 default threshold.
                Detection::new(BBox::new(0.0, 0.0, 5.0, 5.0), 0.05),
            ],
        ]);
        let agg = DetectionAggregator::new(det, config(vec![0.5, 1.0]));

        let pooled = agg.detect_all_scales(&shelf(200, 100)).unwrap();
        assert_eq!(pooled.len(), 2);
        for d in &pooled {
            assert!((d.bbox.x1 - native.x1).abs() < 1e-3);
            assert!((d.bbox.y2 - native.y2).abs() < 1e-3);
        }
    }

    #[test]
    fn pooled_duplicates_collapse_after_merge() {
        let native = BBox::new(40.0, 20.0, 120.0, 60.0);
        let t_half = ScaleTransform::new(200, 100, 0.5, 64);
        let t_full = ScaleTransform::new(200, 100, 1.0, 64);
        let det = ScriptedDetector::new(vec![
            vec![Detection::new(t_half.to_square(&native), 0.6)],
            vec![Detection::new(t_full.to_square(&native), 0.8)],
        ]);
        let agg = DetectionAggregator::new(det, config(vec![0.5, 1.0]));

        let merged = agg.detect(&shelf(200, 100)).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.8);
    }

    #[test]
    fn square_coordinates_are_unstretched_per_axis() {
        // 200x100 at scale 1.0 into 64x64: x factor 200/64, y factor 100/64.
        let det = ScriptedDetector::new(vec![vec![Detection::new(BBox::new(32.0, 32.0, 64.0, 64.0), 0.9)]]);
        let agg = DetectionAggregator::new(det, config(vec![1.0]));
        let out = agg.detect(&shelf(200, 100)).unwrap();
        assert_eq!(out[0].bbox, BBox::new(100.0, 50.0, 200.0, 100.0));
    }

    #[test]
    fn detector_failure_propagates() {
        let agg = DetectionAggregator::new(BrokenDetector, config(vec![1.0]));
        assert!(agg.detect(&shelf(50, 50)).is_err());
    }
}
