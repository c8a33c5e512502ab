use anyhow::{Context, Result};
use shelftag_core::{merge_overlapping, CropMetadata, CropOcrResult, PipelineConfig, PriceTagRecord};
use shelftag_eval::EvalSummary;
use shelftag_ocr::{read_image, Crop, CropBuilder, Detector, OcrBackend, ShelfPipeline, TagStructurer};
use shelftag_storage::{ArtifactStore, SplitDetections};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Run multi-scale detection over a split's source images and store the merged boxes.
pub async fn detect<D: Detector, R: OcrBackend>(
    store: &ArtifactStore,
    pipeline: &ShelfPipeline<D, R>,
    split: &str,
) -> Result<SplitDetections> {
    let paths = store.list_split_images(split).await.context("listing source images")?;

    let mut detections = SplitDetections::new();
    for path in &paths {
        let Some(image_id) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let found = match read_image(path).await {
            Ok(image) => pipeline.detect(&image),
            Err(e) => Err(e),
        };
        match found {
            Ok(dets) => {
                detections.insert(image_id.to_string(), dets);
            }
            Err(e) => tracing::warn!("Skipping {image_id}: {e}"),
        }
    }

    let path = store.save_detections(split, &detections).await?;
    println!("Saved detections for {} images to {}", detections.len(), path.display());
    Ok(detections)
}

/// Merge each image's stored detections and write one crop per surviving box.
pub async fn crop(store: &ArtifactStore, config: &PipelineConfig, split: &str) -> Result<Vec<CropMetadata>> {
    let detections = store
        .load_detections(split)
        .await
        .with_context(|| format!("loading detections for split '{split}'"))?;

    let images: HashMap<String, PathBuf> = store
        .list_split_images(split)
        .await
        .context("listing source images")?
        .into_iter()
        .filter_map(|p| {
            let name = p.file_name()?.to_str()?.to_string();
            Some((name, p))
        })
        .collect();

    let builder = CropBuilder::new(config.crop.clone());
    let mut metadata = Vec::new();

    for (image_id, dets) in detections {
        let Some(path) = images.get(&image_id) else {
            tracing::warn!("Skipping {image_id}: source image not found");
            continue;
        };
        let image = match read_image(path).await {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("Skipping {image_id}: {e}");
                continue;
            }
        };

        let merged = merge_overlapping(dets, config.detection.merge_iou);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(&image_id);
        let crops = builder.build_all(&image, &merged, stem, &image_id);
        tracing::info!("{image_id}: {} merged boxes, {} crops", merged.len(), crops.len());

        for crop in &crops {
            store
                .save_crop_image(split, &crop.id, &crop.image)
                .await
                .with_context(|| format!("saving crop {}", crop.id))?;
            metadata.push(crop.metadata(split));
        }
    }

    let path = store.save_crop_metadata(split, &metadata).await?;
    println!("Saved {} crops to {}", metadata.len(), path.display());
    Ok(metadata)
}

/// OCR every stored crop of a split.
pub async fn ocr<D: Detector, R: OcrBackend>(
    store: &ArtifactStore,
    pipeline: &ShelfPipeline<D, R>,
    split: &str,
) -> Result<Vec<CropOcrResult>> {
    let crops = store
        .load_crop_metadata(split)
        .await
        .with_context(|| format!("loading crop metadata for split '{split}'"))?;

    let mut results = Vec::with_capacity(crops.len());
    for meta in crops {
        let image = match store.load_crop_image(split, &meta.crop_id).await {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!("Skipping {}: {e}", meta.crop_id);
                continue;
            }
        };
        let crop = Crop {
            id: meta.crop_id,
            source_image_id: meta.source_image_id,
            bbox: meta.bbox,
            confidence: meta.confidence,
            image,
        };
        match pipeline.read_crop(&crop) {
            Ok(Some(reading)) => results.push(reading),
            Ok(None) => tracing::debug!(crop = %crop.id, "no text recognized"),
            Err(e) => tracing::warn!(crop = %crop.id, "OCR failed: {e}"),
        }
    }

    let path = store.save_ocr_results(split, &results).await?;
    println!("Saved OCR results for {} crops to {}", results.len(), path.display());
    Ok(results)
}

/// Every stage in one pass: detect, crop, OCR and structure, saving each stage's artifacts.
pub async fn run<D: Detector, R: OcrBackend>(
    store: &ArtifactStore,
    pipeline: &ShelfPipeline<D, R>,
    split: &str,
) -> Result<Vec<PriceTagRecord>> {
    let paths = store.list_split_images(split).await.context("listing source images")?;
    let results = pipeline.process_split(&paths).await;

    let mut detections = SplitDetections::new();
    let mut metadata = Vec::new();
    let mut ocr = Vec::new();
    let mut records = Vec::new();
    for result in results {
        for crop in &result.crops {
            store
                .save_crop_image(split, &crop.id, &crop.image)
                .await
                .with_context(|| format!("saving crop {}", crop.id))?;
            metadata.push(crop.metadata(split));
        }
        detections.insert(result.source_image_id, result.detections);
        ocr.extend(result.ocr);
        records.extend(result.records);
    }

    store.save_detections(split, &detections).await?;
    store.save_crop_metadata(split, &metadata).await?;
    store.save_ocr_results(split, &ocr).await?;
    let path = store.save_records(split, &records).await?;
    println!(
        "Processed {} images: {} crops, {} records saved to {}",
        detections.len(),
        metadata.len(),
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Turn a split's OCR results into price-tag records.
pub async fn structure(store: &ArtifactStore, split: &str) -> Result<Vec<PriceTagRecord>> {
    let ocr = store
        .load_ocr_results(split)
        .await
        .with_context(|| format!("loading OCR results for split '{split}'"))?;

    let records: Vec<PriceTagRecord> = ocr.iter().filter_map(TagStructurer::structure).collect();
    tracing::info!("{} of {} crops structured", records.len(), ocr.len());

    let path = store.save_records(split, &records).await?;
    println!("Saved {} records to {}", records.len(), path.display());
    Ok(records)
}

/// Compare a split's records with the ground-truth sheet.
pub async fn evaluate(
    store: &ArtifactStore,
    split: &str,
    ground_truth: &Path,
    output: Option<&Path>,
) -> Result<EvalSummary> {
    let records = store
        .load_records(split)
        .await
        .with_context(|| format!("loading records for split '{split}'"))?;
    let gt = shelftag_eval::load_ground_truth_file(ground_truth)
        .with_context(|| format!("reading ground truth {}", ground_truth.display()))?;

    let summary = shelftag_eval::evaluate(&records, &gt);
    let json = serde_json::to_string_pretty(&summary)?;
    println!("{json}");

    if let Some(out) = output {
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(out, &json)
            .await
            .with_context(|| format!("writing {}", out.display()))?;
        tracing::info!("Evaluation written to {}", out.display());
    }
    Ok(summary)
}
