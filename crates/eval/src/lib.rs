pub mod ground_truth;
pub mod metrics;

pub use ground_truth::{load_ground_truth, load_ground_truth_file, EvalError, GroundTruth, GroundTruthEntry};
pub use metrics::{evaluate, normalize_price, EvalMiss, EvalSummary, ImageStats, Metrics, Totals};
