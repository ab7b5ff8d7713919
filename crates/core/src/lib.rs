pub mod backend;
pub mod filename;
pub mod prefix;
pub mod retention;
pub mod transfer;
pub mod tree;

pub use prefix::Prefix;
pub use retention::{RetentionAnchor, select_files_to_delete};
pub use transfer::{BatchReport, Transfer, TransferConfig};
pub use tree::ObjectTree;
