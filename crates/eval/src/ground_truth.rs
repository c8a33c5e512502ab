use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// One annotated row of the ground-truth sheet.
#[derive(Debug, Clone, Deserialize)]
struct GroundTruthRow {
    crop_name: String,
    source_image: String,
    #[serde(default)]
    gt_price: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundTruthEntry {
    pub source_image: String,
    pub price: String,
}

/// Annotated prices keyed by crop id.
pub type GroundTruth = BTreeMap<String, GroundTruthEntry>;

/// Read a `crop_name,source_image,gt_price` CSV. Rows without a price are
/// unannotated and skipped.
pub fn load_ground_truth<R: Read>(data: R) -> Result<GroundTruth, EvalError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(data);

    let mut gt = GroundTruth::new();
    for result in reader.deserialize::<GroundTruthRow>() {
        let row = result?;
        if row.gt_price.is_empty() {
            continue;
        }
        gt.insert(row.crop_name, GroundTruthEntry { source_image: row.source_image, price: row.gt_price });
    }
    Ok(gt)
}

pub fn load_ground_truth_file(path: &Path) -> Result<GroundTruth, EvalError> {
    let file = std::fs::File::open(path)?;
    load_ground_truth(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_unannotated_rows() {
        let data = "crop_name,source_image,gt_price\n\
                    shelf_01_tag0,shelf_01.jpg,198\n\
                    shelf_01_tag1,shelf_01.jpg,\n\
                    shelf_02_tag0,shelf_02.jpg,\" ¥1,280 \"\n";
        let gt = load_ground_truth(data.as_bytes()).unwrap();
        assert_eq!(gt.len(), 2);
        assert_eq!(gt["shelf_01_tag0"].price, "198");
        assert_eq!(gt["shelf_02_tag0"].price, "¥1,280");
        assert_eq!(gt["shelf_02_tag0"].source_image, "shelf_02.jpg");
        assert!(!gt.contains_key("shelf_01_tag1"));
    }

    #[test]
    fn header_only_is_empty() {
        let gt = load_ground_truth("crop_name,source_image,gt_price\n".as_bytes()).unwrap();
        assert!(gt.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_ground_truth_file(Path::new("/nonexistent/gt.csv")).unwrap_err();
        assert!(matches!(err, EvalError::IoError(_)));
    }
}
