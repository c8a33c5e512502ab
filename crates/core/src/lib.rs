pub mod config;
pub mod detection;
pub mod geometry;
pub mod types;

pub use config::{ConfigError, CropConfig, DetectionConfig, OcrConfig, PipelineConfig};
pub use detection::{merge_overlapping, Detection};
pub use geometry::{BBox, Quad, ScaleTransform};
pub use types::{
    CropMetadata, CropOcrResult, Currency, Language, OcrLine, PriceMatch, PriceTagRecord,
};
