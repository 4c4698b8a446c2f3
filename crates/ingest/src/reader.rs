use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Sidecar metadata written next to a generated complaint (`<stem>.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplaintMetadata {
    #[serde(default)]
    pub scenario_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

pub struct FileReader;

impl FileReader {
    pub async fn read_file(path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension {
            "txt" | "md" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read file: {:?}", path))?;
                Ok(content)
            }
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Read the sidecar metadata for a complaint, if one exists.
    pub async fn read_metadata(complaint_path: &Path) -> Result<Option<ComplaintMetadata>> {
        let metadata_path = complaint_path.with_extension("json");
        if !fs::try_exists(&metadata_path).await.unwrap_or(false) {
            debug!(path = ?metadata_path, "No sidecar metadata");
            return Ok(None);
        }

        let json = fs::read_to_string(&metadata_path)
            .await
            .context(format!("Failed to read metadata: {:?}", metadata_path))?;
        let metadata: ComplaintMetadata = match serde_json::from_str(&json) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = ?metadata_path, error = %e, "Sidecar metadata is not valid JSON");
                return Err(e).context(format!("Failed to parse metadata: {:?}", metadata_path));
            }
        };

        Ok(Some(metadata))
    }

    /// List complaint files (`*.txt`) in a directory, sorted by path.
    pub async fn list_complaints(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let mut entries = fs::read_dir(dir)
            .await
            .context(format!("Failed to read directory: {:?}", dir))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                files.push(path);
            }
        }

        files.sort();
        debug!(dir = ?dir, count = files.len(), "Listed complaint files");
        Ok(files)
    }
}

/// Path of the artifact produced for a complaint: `<dir>/<stem><suffix>`.
pub fn output_path(complaint_path: &Path, suffix: &str) -> PathBuf {
    let stem = complaint_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    complaint_path.with_file_name(format!("{}{}", stem, suffix))
}
