//! Folder reorganization engine.
//!
//! Scan a directory into an immutable snapshot, run a strategy to propose a
//! new layout, let the caller adjust the proposal tree, diff it against the
//! original paths, then execute the resulting moves with collision-safe
//! naming and a one-level undo log. The UI, the directory-picker dialog, and
//! the chat-completion client behind [`TopicClassifier`] all live outside
//! this crate.

pub mod error;
pub mod models;
pub mod services;

pub use error::AppError;
pub use models::{BatchLogEntry, ExecutionResult, FileKind, FileNode, MoveOperation, ScanResult};
pub use services::diff_service::compute_moves;
pub use services::execute_service::BatchExecutor;
pub use services::scan_service::scan;
pub use services::strategy_service::{apply_strategy, StrategyKind};
pub use services::topic_service::TopicClassifier;
pub use services::tree_service::move_node;
