use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{BatchLogEntry, ExecutionResult, MoveOperation};

/// Applies move batches to the real filesystem and keeps a one-level undo log.
///
/// The log directory is an explicit handle so tests and concurrent instances
/// stay isolated. One batch in flight at a time is assumed; nothing locks the
/// log directory.
pub struct BatchExecutor {
    log_dir: PathBuf,
}

impl BatchExecutor {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Perform the moves in input order. Collisions are renamed to
    /// `name (n).ext`; per-operation failures are collected and the batch
    /// continues. When at least one move succeeded, the as-executed batch is
    /// persisted for undo.
    pub async fn execute(&self, operations: &[MoveOperation]) -> Result<ExecutionResult, AppError> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut executed = Vec::new();
        let mut errors = Vec::new();

        for operation in operations {
            match self.apply_move(operation).await {
                Ok(actual) => {
                    executed.push(MoveOperation::new(operation.source.clone(), actual));
                }
                Err(e) => errors.push(format!("{}: {e}", operation.source)),
            }
        }

        if !executed.is_empty() {
            let entry = BatchLogEntry {
                timestamp,
                operations: executed,
            };
            self.write_log(&entry).await?;
            debug!(
                "executed batch {timestamp}: {} moved, {} failed",
                entry.operations.len(),
                errors.len()
            );
            return Ok(ExecutionResult::from_errors(entry.operations.len(), errors));
        }

        Ok(ExecutionResult::from_errors(0, errors))
    }

    /// Replay the most recent batch in reverse, moving each file from its
    /// logged destination back to its source. The log file is deleted only
    /// when every operation reversed cleanly, so a failed undo can be retried.
    pub async fn undo_last_batch(&self) -> Result<ExecutionResult, AppError> {
        let Some(log_path) = self.latest_log().await? else {
            return Ok(ExecutionResult {
                success: false,
                processed: 0,
                errors: vec!["No undo history found".to_string()],
            });
        };

        let raw = tokio::fs::read_to_string(&log_path).await?;
        let entry: BatchLogEntry = serde_json::from_str(&raw)?;

        let mut processed = 0;
        let mut errors = Vec::new();
        for operation in entry.operations.iter().rev() {
            match undo_move(operation).await {
                Ok(()) => processed += 1,
                Err(e) => errors.push(format!("{}: {e}", operation.destination)),
            }
        }

        if errors.is_empty() {
            tokio::fs::remove_file(&log_path).await?;
            debug!("undid batch {}", entry.timestamp);
        } else {
            warn!(
                "undo of batch {} left {} operations unreversed; log retained",
                entry.timestamp,
                errors.len()
            );
        }

        Ok(ExecutionResult::from_errors(processed, errors))
    }

    async fn apply_move(&self, operation: &MoveOperation) -> Result<String, AppError> {
        let destination = Path::new(&operation.destination);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let actual = available_destination(destination).await?;
        tokio::fs::rename(&operation.source, &actual).await?;
        Ok(actual.to_string_lossy().to_string())
    }

    async fn write_log(&self, entry: &BatchLogEntry) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.log_dir).await?;
        // Zero-padded millis keep lexicographic order chronological.
        let path = self.log_dir.join(format!("batch-{:013}.json", entry.timestamp));
        tokio::fs::write(&path, serde_json::to_string_pretty(entry)?).await?;
        Ok(())
    }

    async fn latest_log(&self) -> Result<Option<PathBuf>, AppError> {
        let mut reader = match tokio::fs::read_dir(&self.log_dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut newest: Option<(String, PathBuf)> = None;
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.ends_with(".json") {
                continue;
            }
            if newest.as_ref().map_or(true, |(best, _)| name > *best) {
                newest = Some((name, entry.path()));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }
}

async fn undo_move(operation: &MoveOperation) -> Result<(), AppError> {
    if !tokio::fs::try_exists(&operation.destination).await? {
        if tokio::fs::try_exists(&operation.source).await? {
            // Left over from a partially failed undo that was retried.
            debug!("already reverted: {}", operation.source);
            return Ok(());
        }
        return Err(AppError::General(format!(
            "logged destination no longer exists: {}",
            operation.destination
        )));
    }
    if let Some(parent) = Path::new(&operation.source).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(&operation.destination, &operation.source).await?;
    Ok(())
}

/// Probe `name (1).ext`, `name (2).ext`, … until a free destination is found.
async fn available_destination(destination: &Path) -> Result<PathBuf, AppError> {
    if !tokio::fs::try_exists(destination).await? {
        return Ok(destination.to_path_buf());
    }

    let parent = destination.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = destination.extension().map(|e| e.to_string_lossy().to_string());

    let mut n: u32 = 1;
    loop {
        let candidate_name = match &extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = parent.join(candidate_name);
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}
