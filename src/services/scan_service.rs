use std::path::Path;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::AppError;
use crate::models::{FileNode, ScanResult};

/// Wide directories would otherwise fan out one stat per entry with no cap.
const MAX_CONCURRENT_STATS: usize = 64;

/// Capture an immutable snapshot of the tree rooted at `directory`.
///
/// Fails only when the root itself cannot be read. Anything below the root
/// that cannot be stat'd or listed is dropped with a warning; partial results
/// beat total failure. Symlinks and other special entries below the root are
/// skipped; the root itself is followed if it is a symlink.
pub async fn scan(directory: &str) -> Result<ScanResult, AppError> {
    let metadata = tokio::fs::metadata(directory).await?;
    if !metadata.is_dir() {
        return Err(AppError::General(format!(
            "scan root is not a directory: {directory}"
        )));
    }

    let name = Path::new(directory)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| directory.to_string());
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_STATS));

    let mut root = scan_directory(
        directory.to_string(),
        name,
        modified_millis(&metadata),
        semaphore,
    )
    .await
    .ok_or_else(|| AppError::General(format!("failed to list scan root: {directory}")))?;

    root.sort_children();
    let file_count = root.file_count();
    let total_size = root.size;

    Ok(ScanResult {
        root,
        file_count,
        total_size,
    })
}

fn scan_directory(
    path: String,
    name: String,
    modified_at: i64,
    semaphore: Arc<Semaphore>,
) -> BoxFuture<'static, Option<FileNode>> {
    async move {
        let mut reader = {
            let _permit = semaphore.acquire().await.ok()?;
            match tokio::fs::read_dir(&path).await {
                Ok(reader) => reader,
                Err(e) => {
                    warn!("dropping unreadable directory {path}: {e}");
                    return None;
                }
            }
        };

        let mut pending = Vec::new();
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => pending.push(entry),
                Ok(None) => break,
                Err(e) => {
                    warn!("stopped listing {path}: {e}");
                    break;
                }
            }
        }

        let children = join_all(pending.into_iter().map(|entry| {
            let semaphore = semaphore.clone();
            async move {
                let entry_path = entry.path().to_string_lossy().to_string();
                let metadata = {
                    let _permit = semaphore.acquire().await.ok()?;
                    match tokio::fs::symlink_metadata(&entry_path).await {
                        Ok(metadata) => metadata,
                        Err(e) => {
                            warn!("skipping unreadable entry {entry_path}: {e}");
                            return None;
                        }
                    }
                };
                let entry_name = entry.file_name().to_string_lossy().to_string();

                if metadata.is_file() {
                    Some(FileNode::file(
                        entry_path,
                        entry_name,
                        metadata.len(),
                        modified_millis(&metadata),
                    ))
                } else if metadata.is_dir() {
                    scan_directory(
                        entry_path,
                        entry_name,
                        modified_millis(&metadata),
                        semaphore,
                    )
                    .await
                } else {
                    // Symlinks, sockets, devices.
                    None
                }
            }
        }))
        .await
        .into_iter()
        .flatten()
        .collect();

        Some(FileNode::directory(path, name, modified_at, children))
    }
    .boxed()
}

fn modified_millis(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis())
        .unwrap_or(0)
}
