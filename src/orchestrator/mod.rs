//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责事件调度和生命周期，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 初始化日志文件、启动信息、HTTP 网关
//! - 读取终端命令，转换成 `UiEvent`
//! - 打印通知，输出会话统计
//!
//! ### `controller` - 事件循环
//! - 装配入口注册表、守卫、结果集、渲染器、通知服务
//! - 顺序处理 `UiEvent`，受守卫保护的操作在独立任务中运行
//! - 汇总每次操作的结果
//!
//! ## 层次关系
//!
//! ```text
//! app (终端命令)
//!     ↓
//! controller (UiEvent 循环)
//!     ↓
//! workflow::{SubmissionFlow, ExportFlow}
//!     ↓
//! services (能力层：guard / renderer / notification / remote)
//!     ↓
//! infrastructure (基础设施：HttpGateway / SurfaceRegistry / ResultsView / DownloadDir)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → infrastructure
//! 2. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod app;
pub mod controller;

// 重新导出主要类型
pub use app::{App, Command};
pub use controller::{
    Controller, ControllerHandle, ControllerReport, ControllerStatus, Resolution, UiEvent,
};
