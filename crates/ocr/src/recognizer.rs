use image::DynamicImage;
use shelftag_core::{Language, OcrLine, Quad};
use thiserror::Error;

use crate::preprocess::generate_variants;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// One fragment as reported by an OCR engine, before it is tagged with a language.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub quad: Quad,
    pub text: String,
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self { quad, text: text.into(), confidence }
    }
}

/// Abstraction over a text recognizer.
/// Implementations read one image region with the model for `language`.
pub trait OcrBackend: Send + Sync {
    fn recognize(
        &self,
        image: &DynamicImage,
        language: Language,
    ) -> Result<Vec<RecognizedText>, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns preset fragments per language regardless of the image.
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    pub primary: Vec<RecognizedText>,
    pub secondary: Vec<RecognizedText>,
}

impl MockRecognizer {
    pub fn new(primary: Vec<RecognizedText>, secondary: Vec<RecognizedText>) -> Self {
        Self { primary, secondary }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(
        &self,
        _image: &DynamicImage,
        language: Language,
    ) -> Result<Vec<RecognizedText>, OcrError> {
        Ok(match language {
            Language::Primary => self.primary.clone(),
            Language::Secondary => self.secondary.clone(),
        })
    }
}

// ── Reading a crop ────────────────────────────────────────────────────────────

/// Read `image` once per language and merge the outputs, primary lines first.
pub fn read_dual_language<R: OcrBackend + ?Sized>(
    backend: &R,
    image: &DynamicImage,
) -> Result<Vec<OcrLine>, OcrError> {
    let mut lines = Vec::new();
    for language in Language::ALL {
        for found in backend.recognize(image, language)? {
            lines.push(OcrLine::new(found.text.trim(), found.confidence, found.quad, language));
        }
    }
    Ok(lines)
}

/// Lines read from the enhancement variant that won.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantReading {
    pub variant: String,
    pub lines: Vec<OcrLine>,
}

/// Read every enhancement variant of `image` and keep the one whose lines have
/// the highest mean confidence. Variants with no lines are skipped; on a tie
/// the earlier variant wins. `None` when no variant produced any text.
pub fn read_best_variant<R: OcrBackend + ?Sized>(
    backend: &R,
    image: &DynamicImage,
) -> Result<Option<VariantReading>, OcrError> {
    let mut best: Option<(f32, VariantReading)> = None;

    for (name, variant) in generate_variants(image) {
        let lines = read_dual_language(backend, &variant)?;
        if lines.is_empty() {
            continue;
        }
        let mean = mean_confidence(&lines);
        tracing::debug!(variant = name, lines = lines.len(), mean, "variant read");

        if best.as_ref().map_or(true, |(score, _)| mean > *score) {
            best = Some((mean, VariantReading { variant: name.to_string(), lines }));
        }
    }

    Ok(best.map(|(_, reading)| reading))
}

fn mean_confidence(lines: &[OcrLine]) -> f32 {
    if lines.is_empty() {
        return 0.0;
    }
    lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32
}
