//! HTTP 网关 - 基础设施层
//!
//! 唯一持有 reqwest Client 的地方，同时实现分析服务与导出服务。

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{AnalysisResponse, DocumentUpload, ExportErrorBody, ResultSet};
use crate::services::remote::{AnalysisReply, AnalysisService, ExportReply, ExportService};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, warn};

/// HTTP 网关
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    analysis_url: String,
    export_url: String,
    upload_field: String,
}

impl HttpGateway {
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::request_failed(config.api_base_url.clone(), e))?;

        Ok(Self {
            client,
            analysis_url: config.analysis_url(),
            export_url: config.export_url(),
            upload_field: config.upload_field.clone(),
        })
    }
}

/// 解析分析服务的响应体
///
/// 2xx 却无法解析是传输错误；非 2xx 时响应体只用来提取错误信息，解析失败不算错。
fn parse_analysis_body(
    endpoint: &str,
    status: u16,
    bytes: &[u8],
) -> AppResult<Option<AnalysisResponse>> {
    match serde_json::from_slice::<AnalysisResponse>(bytes) {
        Ok(body) => Ok(Some(body)),
        Err(e) if (200..300).contains(&status) => Err(AppError::malformed_body(endpoint, e)),
        Err(e) => {
            debug!("非 2xx 响应体无法解析 ({}): {}", status, e);
            Ok(None)
        }
    }
}

#[async_trait]
impl AnalysisService for HttpGateway {
    async fn analyze(&self, upload: &DocumentUpload) -> AppResult<AnalysisReply> {
        debug!(
            "上传文件: {} ({} MB) -> {}",
            upload.file_name,
            upload.size_mb(),
            self.analysis_url
        );

        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)
            .map_err(|e| AppError::request_failed(&self.analysis_url, e))?;
        let form = Form::new().part(self.upload_field.clone(), part);

        let response = self
            .client
            .post(&self.analysis_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&self.analysis_url, e))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::request_failed(&self.analysis_url, e))?;

        let body = parse_analysis_body(&self.analysis_url, status, &bytes)?;
        Ok(AnalysisReply {
            http_status: status,
            body,
        })
    }

    fn endpoint(&self) -> String {
        self.analysis_url.clone()
    }
}

#[async_trait]
impl ExportService for HttpGateway {
    async fn export(&self, records: &ResultSet) -> AppResult<ExportReply> {
        debug!("导出 {} 条记录 -> {}", records.len(), self.export_url);

        let response = self
            .client
            .post(&self.export_url)
            .json(records)
            .send()
            .await
            .map_err(|e| AppError::request_failed(&self.export_url, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::request_failed(&self.export_url, e))?;

        if status.is_success() {
            return Ok(ExportReply::Document(bytes.to_vec()));
        }

        let body = ExportErrorBody::parse(&bytes);
        if body.is_none() {
            warn!("导出失败响应体无法解析 (HTTP {})", status.as_u16());
        }
        Ok(ExportReply::Failed {
            status: status.as_u16(),
            body,
        })
    }

    fn endpoint(&self) -> String {
        self.export_url.clone()
    }
}
