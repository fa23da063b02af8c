//! 流程层（Workflow Layer）
//!
//! 定义一次提交、一次导出的完整处理流程，以及两者共享的当前结果集。
//!
//! ```text
//! SubmissionFlow ──写──> ResultCell <──读── ExportFlow
//!       │                                      │
//!       └──── BusyActionGuard(Submission)      └──── BusyActionGuard(Export)
//! ```

pub mod export;
pub mod state;
pub mod submission;

pub use export::{export_file_name, ExportFlow, ExportOutcome};
pub use state::{result_cell, ResultReader, ResultWriter, Snapshot};
pub use submission::{validate_reply, SubmissionFlow, SubmissionOutcome};
