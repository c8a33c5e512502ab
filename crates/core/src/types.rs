use serde::{Deserialize, Serialize};

use crate::geometry::Quad;

/// Which recognizer produced a line. Shelf tags are read with an English
/// (primary) and a Japanese (secondary) model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[serde(alias = "en")]
    Primary,
    #[serde(alias = "ja")]
    Secondary,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Primary, Language::Secondary];
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Primary => write!(f, "primary"),
            Language::Secondary => write!(f, "secondary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "JPY")]
    Jpy,
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Inr => write!(f, "INR"),
            Currency::Jpy => write!(f, "JPY"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INR" => Ok(Currency::Inr),
            "JPY" => Ok(Currency::Jpy),
            other => Err(format!("Unknown currency: '{other}'")),
        }
    }
}

/// One recognized text fragment inside a crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub text: String,
    #[serde(alias = "conf")]
    pub confidence: f32,
    #[serde(alias = "bbox")]
    pub quad: Quad,
    #[serde(alias = "lang")]
    pub language: Language,
}

impl OcrLine {
    pub fn new(text: impl Into<String>, confidence: f32, quad: Quad, language: Language) -> Self {
        Self { text: text.into(), confidence, quad, language }
    }

    pub fn height(&self) -> f32 {
        self.quad.height()
    }
}

/// A price found inside a single line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMatch {
    pub raw_text: String,
    pub matched_text: String,
    /// `None` when no currency marker was part of the match.
    pub currency: Option<Currency>,
    /// Digits (and decimal point) only; leading zeros preserved.
    pub value: String,
}

/// The structured output for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTagRecord {
    pub source_image_id: String,
    pub crop_id: String,
    pub variant_used: Option<String>,
    pub product_name: Option<String>,
    pub price: Option<String>,
    pub currency: Option<Currency>,
    pub value: Option<String>,
    pub extra_info: String,
}

/// Persisted description of one crop taken from a source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropMetadata {
    pub crop_id: String,
    pub source_image_id: String,
    /// Expanded and clamped region, integer pixels.
    pub bbox: [u32; 4],
    pub confidence: f32,
    pub split: String,
}

/// OCR output for one crop: the winning enhancement variant and its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropOcrResult {
    pub crop_id: String,
    pub source_image_id: String,
    pub variant: Option<String>,
    pub lines: Vec<OcrLine>,
}
