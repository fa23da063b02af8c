//! 基础设施层
//!
//! 持有稀缺资源，只暴露能力：HTTP 客户端、入口注册表、结果显示区、下载目录。

pub mod downloads;
pub mod http;
pub mod surface;
pub mod view;

pub use downloads::DownloadDir;
pub use http::HttpGateway;
pub use surface::{ActionId, SurfaceId, SurfaceRegistry, SurfaceState};
pub use view::{MemoryView, MemoryViewState, ResultsView, TerminalView};
