//! 下载目录 - 基础设施层
//!
//! 先写入临时 `.part` 文件，关闭句柄后再改名，失败时删除临时文件。

use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const PARTIAL_SUFFIX: &str = "part";

#[derive(Debug, Clone)]
pub struct DownloadDir {
    dir: PathBuf,
}

impl DownloadDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 保存二进制内容，返回最终路径
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::file_write_failed(self.dir.display().to_string(), e))?;

        let target = self.dir.join(file_name);
        let partial = target.with_extension(match target.extension() {
            Some(ext) => format!("{}.{}", ext.to_string_lossy(), PARTIAL_SUFFIX),
            None => PARTIAL_SUFFIX.to_string(),
        });

        if let Err(e) = write_and_close(&partial, bytes).await {
            discard(&partial).await;
            return Err(AppError::file_write_failed(partial.display().to_string(), e));
        }

        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            discard(&partial).await;
            return Err(AppError::file_write_failed(target.display().to_string(), e));
        }

        debug!("已保存 {} 字节到 {}", bytes.len(), target.display());
        Ok(target)
    }
}

async fn write_and_close(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    // file 在此处被 drop，句柄在改名前关闭
    Ok(())
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("临时文件清理失败 {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("soil-downloads-{}-{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_save_leaves_no_partial_file() {
        let dir = scratch("save");
        let downloads = DownloadDir::new(&dir);

        let path = downloads.save("report.xlsx", b"PK\x03\x04").await.unwrap();
        assert_eq!(path, dir.join("report.xlsx"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"PK\x03\x04");
        assert!(!dir.join("report.xlsx.part").exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_into_missing_parent_fails_cleanly() {
        let dir = scratch("blocked");
        tokio::fs::write(&dir, b"not a directory").await.unwrap();

        let downloads = DownloadDir::new(dir.join("nested"));
        let result = downloads.save("report.xlsx", b"data").await;
        assert!(matches!(result, Err(AppError::File(_))));

        tokio::fs::remove_file(&dir).await.unwrap();
    }
}
