pub mod display;
pub mod labels;
pub mod record;
pub mod response;
pub mod upload;

pub use display::{DisplayItem, LoadMoreControl};
pub use labels::{Interpretation, FIELD_LABELS};
pub use record::{FieldValue, ResultRecord, ResultSet, ResultSummary};
pub use response::{AnalysisResponse, ExportErrorBody};
pub use upload::{DocumentUpload, UploadPolicy};
