pub mod diff_service;
pub mod execute_service;
pub mod scan_service;
pub mod strategy_service;
pub mod topic_service;
pub mod tree_service;
