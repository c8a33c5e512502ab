use shelftag_core::{CropOcrResult, OcrLine, PriceMatch, PriceTagRecord};

use crate::classify::is_code_like;
use crate::price::extract_price;

/// Separator between residual fragments in `extra_info`.
const EXTRA_SEPARATOR: &str = "|";

pub struct TagStructurer;

impl TagStructurer {
    /// Turn the OCR lines of one crop into a price-tag record.
    ///
    /// Returns `None` only when the crop has no lines at all. A crop without
    /// any price still yields a record with the price fields left empty.
    pub fn structure(ocr: &CropOcrResult) -> Option<PriceTagRecord> {
        let lines = &ocr.lines;
        if lines.is_empty() {
            return None;
        }

        let price = Self::pick_price_line(lines);
        let price_idx = price.as_ref().map(|(idx, _)| *idx);
        let product_name = Self::pick_product_name(lines, price_idx);
        let extra_info = Self::collect_extra_info(lines, price_idx);
        let price = price.map(|(_, m)| m);

        Some(PriceTagRecord {
            source_image_id: ocr.source_image_id.clone(),
            crop_id: ocr.crop_id.clone(),
            variant_used: ocr.variant.clone(),
            product_name,
            price: price.as_ref().map(|m| m.matched_text.clone()),
            currency: price.as_ref().and_then(|m| m.currency),
            value: price.map(|m| m.value),
            extra_info,
        })
    }

    // ── Price ─────────────────────────────────────────────────────────────────

    /// Highest-confidence line carrying a price. Ties go to the earlier line.
    fn pick_price_line(lines: &[OcrLine]) -> Option<(usize, PriceMatch)> {
        let mut candidates: Vec<(usize, PriceMatch)> = lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| {
                let text = line.text.trim();
                if text.is_empty() {
                    return None;
                }
                extract_price(text).map(|m| (idx, m))
            })
            .collect();

        // Stable: equal confidences keep input order.
        candidates.sort_by(|a, b| lines[b.0].confidence.total_cmp(&lines[a.0].confidence));
        candidates.into_iter().next()
    }

    // ── Product name ──────────────────────────────────────────────────────────

    fn pick_product_name(lines: &[OcrLine], price_idx: Option<usize>) -> Option<String> {
        let remaining: Vec<&OcrLine> = lines
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != price_idx)
            .map(|(_, line)| line)
            .collect();

        let mut candidates: Vec<&OcrLine> =
            remaining.iter().copied().filter(|l| !is_code_like(&l.text)).collect();
        if candidates.is_empty() {
            candidates = remaining;
        }

        // Reading order first, then the longer text, then the surer read.
        candidates.sort_by(|a, b| {
            a.quad
                .top()
                .total_cmp(&b.quad.top())
                .then_with(|| b.text.chars().count().cmp(&a.text.chars().count()))
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });

        candidates.first().map(|l| l.text.clone())
    }

    // ── Residual text ─────────────────────────────────────────────────────────

    fn collect_extra_info(lines: &[OcrLine], price_idx: Option<usize>) -> String {
        lines
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != price_idx)
            .map(|(_, line)| line.text.trim())
            .filter(|t| t.chars().count() >= 2)
            .collect::<Vec<_>>()
            .join(EXTRA_SEPARATOR)
    }
}
