//! Command line arguments backing the `shelftag` binary.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "shelftag",
    about = "Turn shelf photographs into structured price-tag records",
    version
)]
pub struct Args {
    /// Pipeline settings (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Artifact root holding raw/, detections/, crops/, ocr/ and records/
    #[arg(long, global = true, default_value = "data")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version information
    Version,
    /// Detect price tags at every configured scale and store the merged boxes
    Detect {
        #[arg(long, short = 's', default_value = "val")]
        split: String,
    },
    /// Merge a split's detections and cut out one crop per price tag
    Crop {
        #[arg(long, short = 's', default_value = "val")]
        split: String,
    },
    /// Read the text of every stored crop
    Ocr {
        #[arg(long, short = 's', default_value = "val")]
        split: String,
    },
    /// Build price-tag records from a split's OCR results
    Structure {
        #[arg(long, short = 's', default_value = "val")]
        split: String,
    },
    /// Detect, crop, read and structure a split in one pass
    Run {
        #[arg(long, short = 's', default_value = "val")]
        split: String,
    },
    /// Score a split's records against annotated prices
    Evaluate {
        #[arg(long, short = 's', default_value = "val")]
        split: String,

        /// CSV with crop_name, source_image, gt_price columns
        #[arg(long, short = 'g')]
        ground_truth: PathBuf,

        /// Also write the summary JSON here
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}
