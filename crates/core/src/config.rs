use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Multi-scale detector settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// Pyramid factors applied to the native image before the square stretch.
    pub scales: Vec<f32>,
    /// Proposals below this confidence are discarded by the detector.
    pub confidence_threshold: f32,
    /// IoU handed to the detector for its own internal suppression.
    pub detector_iou: f32,
    /// Side of the square detector input.
    pub input_size: u32,
    /// Cross-scale merge threshold.
    pub merge_iou: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scales: vec![0.4, 0.6, 1.0, 1.25, 1.5],
            confidence_threshold: 0.10,
            detector_iou: 0.55,
            input_size: 640,
            merge_iou: 0.55,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CropConfig {
    /// Fraction of width/height added on every side.
    pub margin: f32,
    /// Crops whose shorter side is below this are upsampled.
    pub min_side: u32,
    pub magnification: f32,
    /// Stored detections below this confidence are not cropped.
    pub min_confidence: f32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self { margin: 0.20, min_side: 80, magnification: 1.8, min_confidence: 0.25 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    /// Read every enhancement variant and keep the best; otherwise read the crop as-is.
    pub enhance_variants: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { enhance_variants: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub detection: DetectionConfig,
    pub crop: CropConfig,
    pub ocr: OcrConfig,
}

impl PipelineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        if d.scales.is_empty() {
            return Err(ConfigError::Invalid("detection.scales must not be empty".into()));
        }
        if let Some(s) = d.scales.iter().find(|s| !(**s > 0.0)) {
            return Err(ConfigError::Invalid(format!("scale must be positive, got {s}")));
        }
        if d.input_size == 0 {
            return Err(ConfigError::Invalid("detection.input_size must be positive".into()));
        }
        for (name, v) in [
            ("detection.confidence_threshold", d.confidence_threshold),
            ("detection.detector_iou", d.detector_iou),
            ("detection.merge_iou", d.merge_iou),
            ("crop.min_confidence", self.crop.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1], got {v}")));
            }
        }
        if !(self.crop.margin >= 0.0) {
            return Err(ConfigError::Invalid("crop.margin must not be negative".into()));
        }
        if !(self.crop.magnification >= 1.0) {
            return Err(ConfigError::Invalid("crop.magnification must be at least 1".into()));
        }
        Ok(())
    }
}
