//! 远程服务能力 - 业务能力层
//!
//! 分析服务与导出服务对核心来说是不透明的协作方，只通过这里的接口访问。

use crate::error::AppResult;
use crate::models::{AnalysisResponse, DocumentUpload, ExportErrorBody, ResultSet};
use async_trait::async_trait;

/// 分析服务的回复
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReply {
    pub http_status: u16,
    /// 非 2xx 且响应体无法解析时为 None
    pub body: Option<AnalysisResponse>,
}

impl AnalysisReply {
    pub fn ok(body: AnalysisResponse) -> Self {
        Self {
            http_status: 200,
            body: Some(body),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}

/// 导出服务的回复
#[derive(Debug, Clone, PartialEq)]
pub enum ExportReply {
    /// 二进制表格文件
    Document(Vec<u8>),
    Failed {
        status: u16,
        body: Option<ExportErrorBody>,
    },
}

/// 分析服务：上传一个文件，返回结构化结果
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// 网络不可达等传输错误以 Err 返回；HTTP 状态原样放进回复
    async fn analyze(&self, upload: &DocumentUpload) -> AppResult<AnalysisReply>;

    /// 日志用的接口标识
    fn endpoint(&self) -> String;
}

/// 导出服务：提交当前结果集，返回表格文件
#[async_trait]
pub trait ExportService: Send + Sync {
    async fn export(&self, records: &ResultSet) -> AppResult<ExportReply>;

    fn endpoint(&self) -> String;
}
