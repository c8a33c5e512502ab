use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

/// A candidate price-tag region with the detector's confidence (0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}

/// Greedy non-max suppression.
///
/// Sorts by confidence descending (stable, so equal confidences keep their
/// input order) and keeps a detection only if its IoU against every already
/// kept detection is strictly below `iou_threshold`.
pub fn merge_overlapping(mut pool: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    pool.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(pool.len());
    for det in pool {
        if kept.iter().all(|k| k.bbox.iou(&det.bbox) < iou_threshold) {
            kept.push(det);
        }
    }
    kept
}
