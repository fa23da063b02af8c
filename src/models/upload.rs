//! 待上传文件
//!
//! 选择文件时做客户端校验（类型、大小），提交时只检查是否已选择。

use crate::error::{AppError, AppResult, ValidationError};
use std::path::Path;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// 已读入内存、待提交的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// 选择文件时的校验规则
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub accepted_mime: String,
    pub max_bytes: u64,
}

impl UploadPolicy {
    pub fn new(accepted_mime: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            accepted_mime: accepted_mime.into(),
            max_bytes,
        }
    }

    /// 校验文件名推断出的类型与文件大小
    pub fn check(&self, file_name: &str, size: u64) -> Result<String, ValidationError> {
        let mime = guess_mime(file_name);
        if mime != self.accepted_mime {
            return Err(ValidationError::UnsupportedType { found: mime });
        }
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size,
                limit_mb: self.max_bytes.div_ceil(BYTES_PER_MB),
            });
        }
        Ok(mime)
    }
}

impl DocumentUpload {
    /// 读取并校验文件（文件读取是一个挂起点）
    pub async fn from_path(path: &Path, policy: &UploadPolicy) -> AppResult<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let mime = policy.check(&file_name, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        Ok(Self {
            file_name,
            mime,
            bytes,
        })
    }

    /// 大小（MB，保留两位小数）
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.bytes.len() as f64 / BYTES_PER_MB as f64)
    }
}

fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
