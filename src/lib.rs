//! # Soil Analysis Client
//!
//! 土壤分析报告的客户端：上传 PDF，分批显示分析结果，导出 Excel。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `HttpGateway` - 唯一的 HTTP 客户端，实现分析与导出两个远程服务
//! - `SurfaceRegistry` - 操作入口（按钮）的状态
//! - `ResultsView` - 结果显示区（终端 / 内存）
//! - `DownloadDir` - 导出文件的落盘
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `BusyActionGuard` - 同一操作只允许一个在途实例
//! - `BatchRenderer` - 按固定窗口分批显示结果
//! - `NotificationService` - 定时消失的成功/错误通知
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义一次提交、一次导出的完整流程
//! - `SubmissionFlow` - 上传 → 校验 → 替换结果集 → 渲染
//! - `ExportFlow` - 当前结果集 → 表格文件 → 保存
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/controller` - UiEvent 事件循环
//! - `orchestrator/app` - 应用生命周期与终端命令
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{HttpGateway, SurfaceId};
pub use models::{ResultRecord, ResultSet};
pub use orchestrator::{App, Controller, ControllerHandle};
pub use workflow::{ExportFlow, SubmissionFlow};
