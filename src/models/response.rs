//! 远程服务响应结构

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 分析服务的 JSON 响应
///
/// `data` 保留原始 JSON，以便区分"不是数组"和"空数组"。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<JsonValue>,
    /// 部分服务端版本附带的 HTTP 状态码镜像
    #[serde(default)]
    pub code: Option<u16>,
    /// 旧版服务端用 `error` 而不是 `message`
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalysisResponse {
    pub fn is_error_status(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
    }

    /// 服务端给出的错误信息
    pub fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

/// 导出失败时的 JSON 响应体
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExportErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExportErrorBody {
    /// 从响应字节尽力解析，无法解析时返回 None
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    pub fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}
