use anyhow::{Context, Result};
use futures::{FutureExt, StreamExt, stream};
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

use ingest::{output_path, FileReader};

/// Run `evaluate` over every complaint in `dir` with at most `max_workers`
/// documents in flight.
///
/// Documents whose `<stem><output_suffix>` artifact already exists are
/// skipped. A document that fails is logged and left out of the returned
/// results; it never aborts the batch. Results arrive in completion order.
pub async fn run_directory<T, F, Fut>(
    dir: &Path,
    output_suffix: &str,
    max_workers: usize,
    evaluate: F,
) -> Result<Vec<T>>
where
    T: Serialize,
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let files = FileReader::list_complaints(dir).await?;
    if files.is_empty() {
        info!(dir = ?dir, "No complaint files found");
        return Ok(Vec::new());
    }

    let workers = max_workers.max(1);
    info!(documents = files.len(), workers, "Processing complaints");

    let evaluate = &evaluate;
    let results: Vec<T> = stream::iter(files)
        .map(|path| process_one(path, output_suffix, evaluate))
        .buffer_unordered(workers)
        .filter_map(|result| async move { result })
        .collect()
        .await;

    info!(completed = results.len(), "Batch finished");
    Ok(results)
}

async fn process_one<T, F, Fut>(path: PathBuf, output_suffix: &str, evaluate: &F) -> Option<T>
where
    T: Serialize,
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let document = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = output_path(&path, output_suffix);

    if fs::try_exists(&output).await.unwrap_or(false) {
        info!(document = %document, "Skipping (already evaluated)");
        return None;
    }

    info!(document = %document, "Processing");

    let outcome = AssertUnwindSafe(async {
        let result = evaluate(path.clone()).await?;
        write_json(&output, &result).await?;
        Ok::<_, anyhow::Error>(result)
    })
    .catch_unwind()
    .await;

    match outcome {
        Ok(Ok(result)) => Some(result),
        Ok(Err(e)) => {
            error!(document = %document, error = %format!("{:#}", e), "Error processing complaint");
            None
        }
        Err(_) => {
            error!(document = %document, "Evaluation panicked");
            None
        }
    }
}

pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .await
        .context(format!("Failed to write {:?}", path))
}
