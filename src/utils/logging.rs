//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use crate::config::Config;
use crate::orchestrator::ControllerReport;
use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 订阅者
///
/// `RUST_LOG` 优先；否则为 `info`，详细模式下为 `debug`。重复调用无副作用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n土壤分析会话日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 土壤分析客户端");
    info!("🌐 分析接口: {}", config.analysis_url());
    info!("📊 导出接口: {}", config.export_url());
    info!(
        "📄 每批显示 {} 条，文件上限 {} MB",
        config.window_size,
        config.max_file_bytes / (1024 * 1024)
    );
    info!("📁 下载目录: {}", config.download_dir.display());
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 控制器汇总的会话统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(report: &ControllerReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 会话统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!(
        "🔬 分析: 成功 {} / 失败 {}",
        report.submissions_completed, report.submissions_failed
    );
    info!(
        "📥 导出: 成功 {} / 失败 {}",
        report.exports_saved, report.exports_failed
    );
    info!("✅ 成功: {}/{}", report.succeeded(), report.total());
    info!("❌ 失败: {}", report.failed());
    if report.rejected > 0 || report.selections_rejected > 0 {
        info!(
            "⏭️ 重复触发: {}，文件未通过校验: {}",
            report.rejected, report.selections_rejected
        );
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
