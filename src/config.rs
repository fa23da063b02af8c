use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 服务端基础地址
    pub api_base_url: String,
    /// 分析接口路径（multipart 上传）
    pub analysis_path: String,
    /// 导出接口路径（JSON -> 表格文件）
    pub export_path: String,
    /// 上传时文件字段名
    pub upload_field: String,
    /// 每批渲染的记录数
    pub window_size: usize,
    /// 上传文件大小上限（字节）
    pub max_file_bytes: u64,
    /// 接受的文件类型
    pub accepted_mime: String,
    /// 成功通知停留时间（毫秒）
    pub success_notice_ms: u64,
    /// 错误通知停留时间（毫秒）
    pub error_notice_ms: u64,
    /// 通知退出动画时长（毫秒）
    pub exit_transition_ms: u64,
    /// 导出文件保存目录
    pub download_dir: PathBuf,
    /// 导出文件名前缀
    pub export_file_prefix: String,
    /// 传输层超时（秒），0 表示不设置
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".to_string(),
            analysis_path: "/api/procesar-pdf".to_string(),
            export_path: "/api/descargar-excel".to_string(),
            upload_field: "pdf".to_string(),
            window_size: 20,
            max_file_bytes: 10 * 1024 * 1024,
            accepted_mime: "application/pdf".to_string(),
            success_notice_ms: 4000,
            error_notice_ms: 6000,
            exit_transition_ms: 300,
            download_dir: PathBuf::from("."),
            export_file_prefix: "analisis_suelo_INIFAP".to_string(),
            request_timeout_secs: 0,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    /// 配置文件路径所在的环境变量
    pub const CONFIG_FILE_ENV: &'static str = "SOIL_CLIENT_CONFIG";

    /// 从环境变量覆盖默认配置
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 读取 TOML 配置文件，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: e,
            })
        })
    }

    /// 配置文件（若 SOIL_CLIENT_CONFIG 指定）+ 环境变量覆盖，最后校验
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var(Self::CONFIG_FILE_ENV) {
            Ok(path) if !path.is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(self.api_base_url),
            analysis_path: std::env::var("ANALYSIS_PATH").unwrap_or(self.analysis_path),
            export_path: std::env::var("EXPORT_PATH").unwrap_or(self.export_path),
            upload_field: std::env::var("UPLOAD_FIELD").unwrap_or(self.upload_field),
            window_size: env_parse("WINDOW_SIZE").unwrap_or(self.window_size),
            max_file_bytes: env_parse("MAX_FILE_BYTES").unwrap_or(self.max_file_bytes),
            accepted_mime: std::env::var("ACCEPTED_MIME").unwrap_or(self.accepted_mime),
            success_notice_ms: env_parse("SUCCESS_NOTICE_MS").unwrap_or(self.success_notice_ms),
            error_notice_ms: env_parse("ERROR_NOTICE_MS").unwrap_or(self.error_notice_ms),
            exit_transition_ms: env_parse("EXIT_TRANSITION_MS").unwrap_or(self.exit_transition_ms),
            download_dir: std::env::var("DOWNLOAD_DIR").map(PathBuf::from).unwrap_or(self.download_dir),
            export_file_prefix: std::env::var("EXPORT_FILE_PREFIX").unwrap_or(self.export_file_prefix),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window_size",
                reason: "必须大于 0".to_string(),
            });
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "不能为空".to_string(),
            });
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_file_bytes",
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 分析接口完整地址
    pub fn analysis_url(&self) -> String {
        join_url(&self.api_base_url, &self.analysis_path)
    }

    /// 导出接口完整地址
    pub fn export_url(&self) -> String {
        join_url(&self.api_base_url, &self.export_path)
    }

    pub fn success_notice(&self) -> Duration {
        Duration::from_millis(self.success_notice_ms)
    }

    pub fn error_notice(&self) -> Duration {
        Duration::from_millis(self.error_notice_ms)
    }

    pub fn exit_transition(&self) -> Duration {
        Duration::from_millis(self.exit_transition_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, 20);
        assert_eq!(config.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = Config {
            window_size: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "window_size", .. })
        ));
    }

    #[test]
    fn test_join_url_handles_slashes() {
        let config = Config {
            api_base_url: "http://host:8000/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.analysis_url(), "http://host:8000/api/procesar-pdf");
        assert_eq!(config.export_url(), "http://host:8000/api/descargar-excel");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            api_base_url = "https://soil.example"
            window_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://soil.example");
        assert_eq!(config.window_size, 50);
        assert_eq!(config.upload_field, "pdf");
        assert_eq!(config.error_notice_ms, 6000);
    }
}
