pub mod chunker;
pub mod reader;

pub use chunker::{Chunker, ChunkerConfig};
pub use reader::{output_path, ComplaintMetadata, FileReader};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// A complaint document loaded from disk together with its sidecar metadata.
#[derive(Debug, Clone)]
pub struct Complaint {
    pub path: PathBuf,
    pub file_name: String,
    pub text: String,
    pub metadata: ComplaintMetadata,
}

/// Load a complaint and its metadata. Missing metadata yields empty fields.
pub async fn load_complaint(path: &Path) -> Result<Complaint> {
    let text = FileReader::read_file(path).await?;
    let metadata = FileReader::read_metadata(path).await?.unwrap_or_default();

    Ok(Complaint {
        path: path.to_path_buf(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        text,
        metadata,
    })
}
