use image::imageops::FilterType;
use image::DynamicImage;
use shelftag_core::{BBox, CropConfig, CropMetadata, Detection};

/// A pixel region cut from a shelf image around one merged detection.
#[derive(Debug, Clone)]
pub struct Crop {
    pub id: String,
    pub source_image_id: String,
    /// Expanded and clamped region `[x1, y1, x2, y2]` in the source image.
    pub bbox: [u32; 4],
    pub confidence: f32,
    pub image: DynamicImage,
}

impl Crop {
    pub fn metadata(&self, split: &str) -> CropMetadata {
        CropMetadata {
            crop_id: self.id.clone(),
            source_image_id: self.source_image_id.clone(),
            bbox: self.bbox,
            confidence: self.confidence,
            split: split.to_string(),
        }
    }
}

pub struct CropBuilder {
    config: CropConfig,
}

impl CropBuilder {
    pub fn new(config: CropConfig) -> Self {
        Self { config }
    }

    /// Expand `bbox` by the configured margin and clamp it to the image.
    /// `None` when nothing of positive area is left.
    pub fn region(&self, bbox: &BBox, width: u32, height: u32) -> Option<[u32; 4]> {
        if width == 0 || height == 0 {
            return None;
        }
        let (x1, y1, x2, y2) = (bbox.x1 as i64, bbox.y1 as i64, bbox.x2 as i64, bbox.y2 as i64);
        let pad_x = ((x2 - x1) as f32 * self.config.margin) as i64;
        let pad_y = ((y2 - y1) as f32 * self.config.margin) as i64;

        let max_x = width as i64 - 1;
        let max_y = height as i64 - 1;
        let x1 = (x1 - pad_x).clamp(0, max_x);
        let y1 = (y1 - pad_y).clamp(0, max_y);
        let x2 = (x2 + pad_x).clamp(0, max_x);
        let y2 = (y2 + pad_y).clamp(0, max_y);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some([x1 as u32, y1 as u32, x2 as u32, y2 as u32])
    }

    /// Cut one crop; small regions are upsampled for the recognizer.
    pub fn build(
        &self,
        image: &DynamicImage,
        detection: &Detection,
        id: String,
        source_image_id: &str,
    ) -> Option<Crop> {
        let Some(bbox) = self.region(&detection.bbox, image.width(), image.height()) else {
            tracing::debug!(crop = %id, "dropping degenerate region");
            return None;
        };
        let [x1, y1, x2, y2] = bbox;
        let mut pixels = image.crop_imm(x1, y1, x2 - x1, y2 - y1);

        if pixels.width().min(pixels.height()) < self.config.min_side {
            let w = (pixels.width() as f32 * self.config.magnification).round() as u32;
            let h = (pixels.height() as f32 * self.config.magnification).round() as u32;
            pixels = pixels.resize_exact(w, h, FilterType::CatmullRom);
        }

        Some(Crop {
            id,
            source_image_id: source_image_id.to_string(),
            bbox,
            confidence: detection.confidence,
            image: pixels,
        })
    }

    /// Crop every detection of one image. Detections under `min_confidence`
    /// are skipped. Ids are `{stem}_tag{n}`, numbered over the crops actually produced.
    pub fn build_all(
        &self,
        image: &DynamicImage,
        detections: &[Detection],
        image_stem: &str,
        source_image_id: &str,
    ) -> Vec<Crop> {
        let mut crops = Vec::with_capacity(detections.len());
        for det in detections {
            if det.confidence < self.config.min_confidence {
                tracing::debug!(image = source_image_id, confidence = det.confidence, "below crop threshold");
                continue;
            }
            let id = format!("{image_stem}_tag{}", crops.len());
            if let Some(crop) = self.build(image, det, id, source_image_id) {
                crops.push(crop);
            }
        }
        crops
    }
}
