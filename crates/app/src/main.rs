use anyhow::{Context, Result};
use clap::Parser;
use shelftag_core::PipelineConfig;
use shelftag_ocr::{MockDetector, MockRecognizer, ShelfPipeline};
use shelftag_storage::ArtifactStore;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Args, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.validate()?;

    let store = ArtifactStore::new(&args.root);

    // TODO: load a model-backed Detector and OcrBackend from the config once one is
    // packaged; the mocks find no tags and read no text.
    let pipeline = ShelfPipeline::new(MockDetector::default(), MockRecognizer::default(), config.clone());

    match args.command {
        Commands::Version => {
            println!("shelftag {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Detect { split } => {
            commands::detect(&store, &pipeline, &split).await?;
        }
        Commands::Crop { split } => {
            commands::crop(&store, &config, &split).await?;
        }
        Commands::Ocr { split } => {
            commands::ocr(&store, &pipeline, &split).await?;
        }
        Commands::Run { split } => {
            commands::run(&store, &pipeline, &split).await?;
        }
        Commands::Structure { split } => {
            commands::structure(&store, &split).await?;
        }
        Commands::Evaluate { split, ground_truth, output } => {
            commands::evaluate(&store, &split, &ground_truth, output.as_deref()).await?;
        }
    }
    Ok(())
}
