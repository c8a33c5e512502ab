use serde::Serialize;
use shelftag_core::PriceTagRecord;
use std::collections::{BTreeMap, HashMap};

use crate::ground_truth::GroundTruth;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub gt_price_tags: usize,
    pub detected_price_tags: usize,
    pub price_correct: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    /// Annotated tags that produced a record at all.
    pub detection_coverage: f64,
    /// Correct prices among the detected tags.
    pub price_accuracy: f64,
    /// Correct prices among all annotated tags.
    pub end_to_end_accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageStats {
    pub gt_tags: usize,
    pub detected_tags: usize,
    pub price_correct: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvalMiss {
    MissedDetection {
        crop_name: String,
        source_image: String,
    },
    PriceMismatch {
        crop_name: String,
        source_image: String,
        gt_price: String,
        predicted: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalSummary {
    pub totals: Totals,
    pub metrics: Metrics,
    pub per_image: BTreeMap<String, ImageStats>,
    pub errors: Vec<EvalMiss>,
}

/// Bring a price string to a comparable form: no currency marks (`Rs.` included), separators
/// or whitespace, and no redundant leading zeros (`"007"` → `"7"`, `"0.5"` stays).
pub fn normalize_price(v: &str) -> String {
    let mut s = v.trim().to_string();
    for mark in ["¥", "￥", "₹", "Rs.", "Rs", "円", ","] {
        s = s.replace(mark, "");
    }
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();

    let mut digits = s.as_str();
    while digits.len() > 1 && digits.starts_with('0') && digits[1..].starts_with(|c: char| c.is_ascii_digit()) {
        digits = &digits[1..];
    }
    digits.to_string()
}

/// Compare structured records against annotated prices.
pub fn evaluate(records: &[PriceTagRecord], ground_truth: &GroundTruth) -> EvalSummary {
    let by_crop: HashMap<&str, &PriceTagRecord> =
        records.iter().map(|r| (r.crop_id.as_str(), r)).collect();

    let mut summary = EvalSummary::default();
    summary.totals.gt_price_tags = ground_truth.len();

    for (crop, entry) in ground_truth {
        let stats = summary.per_image.entry(entry.source_image.clone()).or_default();
        stats.gt_tags += 1;

        let Some(record) = by_crop.get(crop.as_str()) else {
            summary.errors.push(EvalMiss::MissedDetection {
                crop_name: crop.clone(),
                source_image: entry.source_image.clone(),
            });
            continue;
        };

        stats.detected_tags += 1;
        summary.totals.detected_price_tags += 1;

        let gt_price = normalize_price(&entry.price);
        let predicted = record.value.as_deref().map(normalize_price);

        if predicted.as_deref() == Some(gt_price.as_str()) {
            stats.price_correct += 1;
            summary.totals.price_correct += 1;
        } else {
            summary.errors.push(EvalMiss::PriceMismatch {
                crop_name: crop.clone(),
                source_image: entry.source_image.clone(),
                gt_price,
                predicted,
            });
        }
    }

    let t = &summary.totals;
    summary.metrics = Metrics {
        detection_coverage: ratio(t.detected_price_tags, t.gt_price_tags),
        price_accuracy: ratio(t.price_correct, t.detected_price_tags),
        end_to_end_accuracy: ratio(t.price_correct, t.gt_price_tags),
    };
    summary
}

/// `num / den` rounded to three decimals, 0 when `den` is 0.
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        return 0.0;
    }
    (num as f64 / den as f64 * 1000.0).round() / 1000.0
}
