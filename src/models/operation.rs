use serde::{Deserialize, Serialize};

/// One planned filesystem move. After execution the destination reflects any
/// collision renaming actually applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOperation {
    pub source: String,
    pub destination: String,
}

impl MoveOperation {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// The as-executed record of one batch, persisted for undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchLogEntry {
    pub timestamp: i64,
    pub operations: Vec<MoveOperation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub processed: usize,
    pub errors: Vec<String>,
}

impl ExecutionResult {
    pub fn from_errors(processed: usize, errors: Vec<String>) -> Self {
        Self {
            success: errors.is_empty(),
            processed,
            errors,
        }
    }
}
