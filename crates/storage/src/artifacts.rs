use image::DynamicImage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shelftag_core::{CropMetadata, CropOcrResult, Detection, PriceTagRecord};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Artifact not found: {} (run the producing stage first)", .0.display())]
    MissingArtifact(PathBuf),
}

/// Detections per source image id.
pub type SplitDetections = BTreeMap<String, Vec<Detection>>;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// File layout for every stage's inputs and outputs under one root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── Paths ─────────────────────────────────────────────────────────────────

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn detections_path(&self, split: &str) -> PathBuf {
        self.root.join("detections").join(format!("{split}_detections.json"))
    }

    pub fn crop_image_path(&self, split: &str, crop_id: &str) -> PathBuf {
        self.root.join("crops").join("images").join(split).join(format!("{crop_id}.jpg"))
    }

    pub fn crop_metadata_path(&self, split: &str) -> PathBuf {
        self.root.join("crops").join("metadata").join(format!("{split}_crops.json"))
    }

    pub fn ocr_path(&self, split: &str) -> PathBuf {
        self.root.join("ocr").join(format!("{split}_ocr.json"))
    }

    pub fn records_path(&self, split: &str) -> PathBuf {
        self.root.join("records").join(format!("{split}_records.json"))
    }

    // ── Typed artifacts ───────────────────────────────────────────────────────

    pub async fn load_detections(&self, split: &str) -> Result<SplitDetections, StorageError> {
        read_json(&self.detections_path(split)).await
    }

    pub async fn save_detections(
        &self,
        split: &str,
        detections: &SplitDetections,
    ) -> Result<PathBuf, StorageError> {
        let path = self.detections_path(split);
        write_json(&path, detections).await?;
        Ok(path)
    }

    pub async fn load_crop_metadata(&self, split: &str) -> Result<Vec<CropMetadata>, StorageError> {
        read_json(&self.crop_metadata_path(split)).await
    }

    pub async fn save_crop_metadata(
        &self,
        split: &str,
        crops: &[CropMetadata],
    ) -> Result<PathBuf, StorageError> {
        let path = self.crop_metadata_path(split);
        write_json(&path, crops).await?;
        Ok(path)
    }

    pub async fn save_crop_image(
        &self,
        split: &str,
        crop_id: &str,
        image: &DynamicImage,
    ) -> Result<PathBuf, StorageError> {
        let path = self.crop_image_path(split, crop_id);
        ensure_parent(&path).await?;
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let target = path.clone();
        tokio::task::spawn_blocking(move || rgb.save(&target))
            .await
            .map_err(std::io::Error::other)??;
        Ok(path)
    }

    pub async fn load_crop_image(&self, split: &str, crop_id: &str) -> Result<DynamicImage, StorageError> {
        let path = self.crop_image_path(split, crop_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::MissingArtifact(path));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(image::load_from_memory(&bytes)?)
    }

    pub async fn load_ocr_results(&self, split: &str) -> Result<Vec<CropOcrResult>, StorageError> {
        read_json(&self.ocr_path(split)).await
    }

    pub async fn save_ocr_results(
        &self,
        split: &str,
        results: &[CropOcrResult],
    ) -> Result<PathBuf, StorageError> {
        let path = self.ocr_path(split);
        write_json(&path, results).await?;
        Ok(path)
    }

    pub async fn load_records(&self, split: &str) -> Result<Vec<PriceTagRecord>, StorageError> {
        read_json(&self.records_path(split)).await
    }

    pub async fn save_records(
        &self,
        split: &str,
        records: &[PriceTagRecord],
    ) -> Result<PathBuf, StorageError> {
        let path = self.records_path(split);
        write_json(&path, records).await?;
        Ok(path)
    }

    /// Source images of a split: `raw/{split}/` if it exists, else the flat `raw/` directory.
    pub async fn list_split_images(&self, split: &str) -> Result<Vec<PathBuf>, StorageError> {
        let split_dir = self.raw_dir().join(split);
        let dir = if tokio::fs::try_exists(&split_dir).await? { split_dir } else { self.raw_dir() };

        if !tokio::fs::try_exists(&dir).await? {
            return Err(StorageError::MissingArtifact(dir));
        }

        let mut images = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && entry.file_type().await?.is_file() {
                images.push(path);
            }
        }
        images.sort();
        Ok(images)
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::MissingArtifact(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    ensure_parent(path).await?;
    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, json).await?;
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
