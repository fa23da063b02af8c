//! 应用生命周期 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、启动信息、HTTP 网关、控制器
//! 2. **命令循环**：逐行读取标准输入，转换成 `UiEvent` 交给控制器
//! 3. **通知输出**：订阅通知事件，打印到终端
//! 4. **全局统计**：退出时汇总本次会话的结果

use crate::config::Config;
use crate::infrastructure::{HttpGateway, SurfaceId, TerminalView};
use crate::orchestrator::controller::{Controller, ControllerHandle, ControllerStatus};
use crate::services::{NoticeEvent, NoticeKind};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats, truncate_text};
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};

const HELP: &str = "\
命令:
  open <path>              选择 PDF 文件
  submit                   上传并分析
  export [header|inline]   导出当前结果为 Excel
  more                     加载更多记录
  dismiss <id>             关闭通知
  status                   查看当前状态
  quit                     退出";

/// 终端命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    Submit,
    Export(SurfaceId),
    More,
    Dismiss(u64),
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "open" => {
                if rest.is_empty() {
                    bail!("用法: open <path>");
                }
                Command::Open(PathBuf::from(rest.trim_matches('"')))
            }
            "submit" => Command::Submit,
            "export" => {
                if rest.is_empty() {
                    Command::Export(SurfaceId::EXPORT_HEADER)
                } else {
                    let surface = SurfaceId::parse(&format!("export.{}", rest))
                        .ok_or_else(|| anyhow!("未知的导出入口: {}", rest))?;
                    Command::Export(surface)
                }
            }
            "more" => Command::More,
            "dismiss" => Command::Dismiss(
                rest.trim_start_matches('#')
                    .parse()
                    .map_err(|_| anyhow!("用法: dismiss <id>"))?,
            ),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "" => bail!("空命令"),
            other => bail!("未知命令: {}（输入 help 查看帮助）", other),
        };
        Ok(command)
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    controller: Controller,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(&config);

        let gateway = Arc::new(HttpGateway::new(&config)?);
        let controller = Controller::assemble(
            &config,
            gateway.clone(),
            gateway,
            Box::new(TerminalView::stdout()),
        );

        Ok(Self { config, controller })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<()> {
        let printer = tokio::spawn(print_notices(self.controller.notifier().subscribe()));
        let (handle, controller) = self.controller.spawn();

        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    if !line.trim().is_empty() {
                        println!("⚠️ {}", e);
                    }
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            if !dispatch(&handle, command).await {
                warn!("⚠️ 控制器已停止，结束命令循环");
                break;
            }
        }

        handle.shutdown().await;
        let report = controller.await?;
        printer.abort();

        print_final_stats(&report, &self.config.output_log_file);
        Ok(())
    }
}

/// 把命令交给控制器；控制器已停止时返回 false
async fn dispatch(handle: &ControllerHandle, command: Command) -> bool {
    match command {
        Command::Open(path) => handle.open(path).await,
        Command::Submit => handle.submit().await,
        Command::Export(surface) => handle.export(surface).await,
        Command::More => handle.load_more().await,
        Command::Dismiss(id) => handle.dismiss(id).await,
        Command::Status => match handle.status().await {
            Some(status) => {
                print_status(&status);
                true
            }
            None => false,
        },
        Command::Help => {
            println!("{}", HELP);
            true
        }
        Command::Quit => true,
    }
}

fn print_status(status: &ControllerStatus) {
    println!("{}", "─".repeat(60));
    println!(
        "📄 文件: {}",
        status.pending_file.as_deref().unwrap_or("（未选择）")
    );
    println!(
        "📊 结果: 版本 {}，已显示 {}/{}{}",
        status.result_version,
        status.rendered,
        status.total,
        if status.has_more { "（可加载更多）" } else { "" }
    );
    println!(
        "⚙️ 提交: {:?}  导出: {:?}  后台任务: {}",
        status.submission, status.export, status.in_flight
    );
    println!("🔔 通知: {:?}", status.active_notices);
    println!("{}", "─".repeat(60));
}

async fn print_notices(mut events: broadcast::Receiver<NoticeEvent>) {
    loop {
        match events.recv().await {
            Ok(NoticeEvent::Shown(notice)) => {
                let icon = match notice.kind {
                    NoticeKind::Success => "✅",
                    NoticeKind::Error => "❌",
                };
                println!(
                    "{} [#{} {}] {}",
                    icon,
                    notice.id,
                    notice.created_at.format("%H:%M:%S"),
                    truncate_text(&notice.message, 200)
                );
            }
            Ok(NoticeEvent::Leaving(_)) | Ok(NoticeEvent::Removed(_)) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                info!("通知输出落后，跳过 {} 条", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
