use std::path::{Path, PathBuf};

use image::DynamicImage;
use shelftag_core::{CropOcrResult, Detection, OcrConfig, PipelineConfig, PriceTagRecord};
use thiserror::Error;

use crate::crop::{Crop, CropBuilder};
use crate::detect::{DetectError, DetectionAggregator, Detector};
use crate::recognizer::{read_best_variant, read_dual_language, OcrBackend, OcrError};
use crate::structure::TagStructurer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("Detection failed: {0}")]
    Detect(#[from] DetectError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Everything produced for one shelf image.
#[derive(Debug)]
pub struct ImageResult {
    pub source_image_id: String,
    /// Merged detections in native coordinates, confidence-descending.
    pub detections: Vec<Detection>,
    pub crops: Vec<Crop>,
    /// OCR output for every crop that produced at least one line.
    pub ocr: Vec<CropOcrResult>,
    pub records: Vec<PriceTagRecord>,
    /// Crops whose OCR failed; the rest of the image is still processed.
    pub failed_crops: Vec<String>,
}

/// Read and decode an image file.
pub async fn read_image(path: &Path) -> Result<DynamicImage, PipelineError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Orchestrates: multi-scale detect → merge → crop → OCR → structure.
pub struct ShelfPipeline<D: Detector, R: OcrBackend> {
    aggregator: DetectionAggregator<D>,
    cropper: CropBuilder,
    recognizer: R,
    ocr_config: OcrConfig,
}

impl<D: Detector, R: OcrBackend> ShelfPipeline<D, R> {
    pub fn new(detector: D, recognizer: R, config: PipelineConfig) -> Self {
        Self {
            aggregator: DetectionAggregator::new(detector, config.detection),
            cropper: CropBuilder::new(config.crop),
            recognizer,
            ocr_config: config.ocr,
        }
    }

    /// Process an image file on disk. The file name is the source image id.
    pub async fn process_file(&self, path: &Path) -> Result<ImageResult, PipelineError> {
        let image = read_image(path).await?;
        let source_image_id = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        self.process_image(&source_image_id, &image)
    }

    /// Process every image of a split in order. Images that cannot be read or
    /// processed are logged and skipped.
    pub async fn process_split(&self, paths: &[PathBuf]) -> Vec<ImageResult> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            match self.process_file(path).await {
                Ok(result) => results.push(result),
                Err(e) => tracing::warn!("Skipping {}: {e}", path.display()),
            }
        }
        results
    }

    pub fn process_image(
        &self,
        source_image_id: &str,
        image: &DynamicImage,
    ) -> Result<ImageResult, PipelineError> {
        let stem = Path::new(source_image_id)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(source_image_id);

        let detections = self.detect(image)?;
        if detections.is_empty() {
            tracing::info!(image = source_image_id, "no detections");
        }

        let crops = self.cropper.build_all(image, &detections, stem, source_image_id);

        let mut ocr = Vec::with_capacity(crops.len());
        let mut records = Vec::with_capacity(crops.len());
        let mut failed_crops = Vec::new();
        for crop in &crops {
            let reading = match self.read_crop(crop) {
                Ok(Some(reading)) => reading,
                Ok(None) => {
                    tracing::debug!(crop = %crop.id, "no text recognized");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(crop = %crop.id, "OCR failed: {e}");
                    failed_crops.push(crop.id.clone());
                    continue;
                }
            };
            if let Some(record) = TagStructurer::structure(&reading) {
                records.push(record);
            }
            ocr.push(reading);
        }

        tracing::info!(
            image = source_image_id,
            detections = detections.len(),
            crops = crops.len(),
            records = records.len(),
            "image processed"
        );

        Ok(ImageResult {
            source_image_id: source_image_id.to_string(),
            detections,
            crops,
            ocr,
            records,
            failed_crops,
        })
    }

    /// Merged multi-scale detections of one image, in native coordinates.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, PipelineError> {
        Ok(self.aggregator.detect(image)?)
    }

    /// OCR one crop. `None` when the recognizer found nothing.
    pub fn read_crop(&self, crop: &Crop) -> Result<Option<CropOcrResult>, PipelineError> {
        let (variant, lines) = if self.ocr_config.enhance_variants {
            match read_best_variant(&self.recognizer, &crop.image)? {
                Some(reading) => (Some(reading.variant), reading.lines),
                None => return Ok(None),
            }
        } else {
            (None, read_dual_language(&self.recognizer, &crop.image)?)
        };

        if lines.is_empty() {
            return Ok(None);
        }

        Ok(Some(CropOcrResult {
            crop_id: crop.id.clone(),
            source_image_id: crop.source_image_id.clone(),
            variant,
            lines,
        }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::MockDetector;
    use crate::recognizer::{MockRecognizer, RecognizedText};
    use image::{ImageBuffer, Rgb, RgbImage};
    use shelftag_core::{BBox, Currency, DetectionConfig, Quad};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shelf_png(width: u32, height: u32) -> Vec<u8> {
        let img: RgbImage = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn config(enhance_variants: bool) -> PipelineConfig {
        PipelineConfig {
            detection: DetectionConfig { input_size: 64, ..DetectionConfig::default() },
            ocr: OcrConfig { enhance_variants },
            ..PipelineConfig::default()
        }
    }

    fn text(t: &str, conf: f32, top: f32) -> RecognizedText {
        RecognizedText::new(Quad::from_rect(0.0, top, 80.0, top + 15.0), t, conf)
    }

    fn milk_recognizer() -> MockRecognizer {
        MockRecognizer::new(
            vec![text("Fresh Milk", 0.9, 0.0), text("4912345", 0.5, 60.0)],
            vec![text("¥198", 0.95, 60.0)],
        )
    }

    fn one_tag_detector() -> MockDetector {
        MockDetector::new(vec![Detection::new(BBox::new(8.0, 8.0, 40.0, 40.0), 0.8)])
    }

    #[tokio::test]
    async fn process_file_produces_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.png");
        std::fs::write(&path, shelf_png(320, 160)).unwrap();

        let pipeline = ShelfPipeline::new(one_tag_detector(), milk_recognizer(), config(true));
        let result = pipeline.process_file(&path).await.unwrap();

        // The same square box at every scale collapses to one region.
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.crops.len(), 1);
        assert_eq!(result.crops[0].id, "shelf_tag0");
        assert_eq!(result.records.len(), 1);

        let rec = &result.records[0];
        assert_eq!(rec.source_image_id, "shelf.png");
        assert_eq!(rec.crop_id, "shelf_tag0");
        assert_eq!(rec.product_name.as_deref(), Some("Fresh Milk"));
        assert_eq!(rec.currency, Some(Currency::Jpy));
        assert_eq!(rec.value.as_deref(), Some("198"));
        assert_eq!(rec.variant_used.as_deref(), Some("orig"));
        assert_eq!(rec.extra_info, "Fresh Milk|4912345");
    }

    #[test]
    fn direct_read_has_no_variant() {
        let image = image::load_from_memory(&shelf_png(320, 160)).unwrap();
        let pipeline = ShelfPipeline::new(one_tag_detector(), milk_recognizer(), config(false));
        let result = pipeline.process_image("shelf.png", &image).unwrap();
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].variant_used.is_none());
        assert_eq!(result.ocr[0].lines.len(), 3);
    }

    #[test]
    fn no_detections_is_empty_result() {
        let image = image::load_from_memory(&shelf_png(100, 100)).unwrap();
        let pipeline =
            ShelfPipeline::new(MockDetector::default(), milk_recognizer(), config(true));
        let result = pipeline.process_image("empty.jpg", &image).unwrap();
        assert!(result.detections.is_empty());
        assert!(result.records.is_empty());
    }

    #[test]
    fn crops_without_text_yield_no_record() {
        let image = image::load_from_memory(&shelf_png(320, 160)).unwrap();
        let pipeline =
            ShelfPipeline::new(one_tag_detector(), MockRecognizer::default(), config(true));
        let result = pipeline.process_image("shelf.png", &image).unwrap();
        assert_eq!(result.crops.len(), 1);
        assert!(result.ocr.is_empty());
        assert!(result.records.is_empty());
    }

    #[tokio::test]
    async fn split_skips_unreadable_images() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.png");
        let corrupt = dir.path().join("b.png");
        let missing = dir.path().join("c.png");
        std::fs::write(&good, shelf_png(320, 160)).unwrap();
        std::fs::write(&corrupt, b"not an image").unwrap();

        let pipeline = ShelfPipeline::new(one_tag_detector(), milk_recognizer(), config(true));
        let results = pipeline.process_split(&[good, corrupt, missing]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_image_id, "a.png");
    }

    /// Answers like `milk_recognizer` for the first `healthy_calls` calls, then fails.
    struct FlakyRecognizer {
        inner: MockRecognizer,
        healthy_calls: usize,
        calls: AtomicUsize,
    }

    impl OcrBackend for FlakyRecognizer {
        fn recognize(
            &self,
            image: &DynamicImage,
            language: shelftag_core::Language,
        ) -> Result<Vec<RecognizedText>, OcrError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy_calls {
                return Err(OcrError::Engine("boom".into()));
            }
            self.inner.recognize(image, language)
        }
    }

    #[test]
    fn failed_crop_does_not_discard_the_image() {
        let image = image::load_from_memory(&shelf_png(320, 160)).unwrap();
        let detector = MockDetector::new(vec![
            Detection::new(BBox::new(8.0, 8.0, 40.0, 40.0), 0.9),
            Detection::new(BBox::new(44.0, 8.0, 60.0, 40.0), 0.8),
        ]);
        // Direct reads: two calls (primary, secondary) per crop; the second crop fails.
        let recognizer = FlakyRecognizer { inner: milk_recognizer(), healthy_calls: 2, calls: AtomicUsize::new(0) };
        let pipeline = ShelfPipeline::new(detector, recognizer, config(false));

        let result = pipeline.process_image("shelf.png", &image).unwrap();
        assert_eq!(result.crops.len(), 2);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].crop_id, "shelf_tag0");
        assert_eq!(result.records[0].value.as_deref(), Some("198"));
        assert_eq!(result.failed_crops, vec!["shelf_tag1".to_string()]);
    }
}
