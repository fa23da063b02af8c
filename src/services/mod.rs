pub mod guard;
pub mod notification;
pub mod remote;
pub mod renderer;

pub use guard::{BusyActionGuard, BusyPermit, GuardOutcome, OperationState};
pub use notification::{NoticeEvent, NoticeKind, NoticeTiming, Notification, NotificationService};
pub use remote::{AnalysisReply, AnalysisService, ExportReply, ExportService};
pub use renderer::{BatchRenderer, RenderCursor, SharedRenderer, WindowSpan};
