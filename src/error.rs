use thiserror::Error;

/// 兜底提示：分析服务没有给出可用的错误信息
pub const GENERIC_ANALYSIS_FAILURE: &str = "Unknown error while processing the PDF";
/// 兜底提示：分析服务返回 status == "error" 但未附带信息
pub const GENERIC_ERROR_STATUS: &str = "Error processing the PDF";
/// 兜底提示：导出服务没有给出可用的错误信息
pub const GENERIC_EXPORT_FAILURE: &str = "Error generating the spreadsheet";
/// 导出失败通知的前缀，用来与分析失败区分
pub const EXPORT_FAILURE_PREFIX: &str = "Error downloading the file: ";

/// 应用程序错误类型
///
/// 所有错误在流程层被转换成恰好一条通知，不会向上冒泡到进程层。
/// 重复触发（GuardRejection）不是错误，见 `services::guard::GuardOutcome`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 客户端校验失败，未发出任何网络请求
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 网络或 HTTP 层失败
    #[error("传输错误: {0}")]
    Transport(#[from] TransportError),
    /// 服务端明确返回的业务错误
    #[error("业务错误: {0}")]
    Application(#[from] ApplicationError),
    /// 本地文件读写错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 客户端校验错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 未选择文件
    #[error("Please select a PDF file to analyze")]
    NoFileSelected,
    /// 文件为空
    #[error("The selected file is empty")]
    EmptyFile,
    /// 文件类型不被接受
    #[error("Please select a valid PDF file (got {found})")]
    UnsupportedType { found: String },
    /// 文件过大
    #[error("The file is too large. Maximum {limit_mb} MB allowed")]
    TooLarge { size: u64, limit_mb: u64 },
}

/// 传输层错误
#[derive(Debug, Error)]
pub enum TransportError {
    /// 网络请求失败（不可达、超时等）
    #[error("Connection error: {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 非 2xx 响应，message 已在构造时回退到兜底提示
    #[error("{message}")]
    BadStatus {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 响应体无法解析
    #[error("Malformed response from {endpoint}: {source}")]
    MalformedBody {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 服务端业务错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// status == "error"
    #[error("{message}")]
    ErrorStatus { message: String },
    /// data 为空或不是数组
    #[error("no valid data found in the PDF file")]
    NoValidData,
    /// 第一条记录带有错误标记，整批视为失败
    #[error("{0}")]
    BatchMarker(String),
    /// 没有可导出的结果集
    #[error("nothing to export")]
    NothingToExport,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 配置值非法
    #[error("配置项 {field} 非法: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建请求失败错误
    pub fn request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Transport(TransportError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建非 2xx 响应错误
    pub fn bad_status(
        endpoint: impl Into<String>,
        status: u16,
        message: Option<String>,
        fallback: &'static str,
    ) -> Self {
        AppError::Transport(TransportError::BadStatus {
            endpoint: endpoint.into(),
            status,
            message: non_blank(message).unwrap_or_else(|| fallback.to_string()),
        })
    }

    /// 创建 status == "error" 的业务错误
    pub fn error_status(message: Option<String>) -> Self {
        AppError::Application(ApplicationError::ErrorStatus {
            message: non_blank(message).unwrap_or_else(|| GENERIC_ERROR_STATUS.to_string()),
        })
    }

    /// 创建响应体解析错误
    pub fn malformed_body(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Transport(TransportError::MalformedBody {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为客户端校验错误（未发出网络请求）
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// 面向用户的通知文本
    ///
    /// 服务端给出的信息优先，其次是各分类的兜底提示。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Application(e) => e.to_string(),
            AppError::Transport(e) => e.to_string(),
            AppError::File(e) => format!("Error saving the file: {}", e),
            AppError::Config(e) => e.to_string(),
        }
    }
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_status_prefers_service_message() {
        let err = AppError::bad_status("/api", 500, Some("bad format".into()), GENERIC_ANALYSIS_FAILURE);
        assert_eq!(err.user_message(), "bad format");
    }

    #[test]
    fn test_bad_status_falls_back_on_blank_message() {
        let err = AppError::bad_status("/api", 502, Some("   ".into()), GENERIC_EXPORT_FAILURE);
        assert_eq!(err.user_message(), GENERIC_EXPORT_FAILURE);

        let err = AppError::bad_status("/api", 502, None, GENERIC_ANALYSIS_FAILURE);
        assert_eq!(err.user_message(), GENERIC_ANALYSIS_FAILURE);
    }

    #[test]
    fn test_application_messages() {
        assert_eq!(AppError::error_status(None).user_message(), GENERIC_ERROR_STATUS);
        assert_eq!(
            AppError::error_status(Some("bad format".into())).user_message(),
            "bad format"
        );
        assert_eq!(
            AppError::from(ApplicationError::NoValidData).user_message(),
            "no valid data found in the PDF file"
        );
        assert_eq!(
            AppError::from(ApplicationError::NothingToExport).user_message(),
            "nothing to export"
        );
    }

    #[test]
    fn test_validation_is_flagged() {
        let err = AppError::from(ValidationError::NoFileSelected);
        assert!(err.is_validation());
        assert!(!AppError::from(ApplicationError::NoValidData).is_validation());
    }
}
