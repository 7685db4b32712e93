pub mod file_node;
pub mod operation;

pub use file_node::{FileKind, FileNode, ScanResult};
pub use operation::{BatchLogEntry, ExecutionResult, MoveOperation};
