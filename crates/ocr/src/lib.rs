pub mod classify;
pub mod crop;
pub mod detect;
pub mod pipeline;
pub mod preprocess;
pub mod price;
pub mod recognizer;
pub mod structure;

pub use classify::is_code_like;
pub use crop::{Crop, CropBuilder};
pub use detect::{DetectError, DetectionAggregator, Detector, MockDetector};
pub use pipeline::{read_image, ImageResult, PipelineError, ShelfPipeline};
pub use preprocess::generate_variants;
pub use price::extract_price;
pub use recognizer::{
    read_best_variant, read_dual_language, MockRecognizer, OcrBackend, OcrError, RecognizedText,
    VariantReading,
};
pub use structure::TagStructurer;
