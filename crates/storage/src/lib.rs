pub mod artifacts;

pub use artifacts::{ArtifactStore, SplitDetections, StorageError};
