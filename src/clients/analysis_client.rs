/// 文档分析 API 客户端
///
/// 封装分析任务的创建、上传、处理、状态查询和结果获取
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, UploadError};
use crate::infrastructure::http::{expect_success, join_url, read_json};
use crate::models::{
    CreateAnalysisResponse, FormalAnalysis, JobStatus, StatusResponse, UploadFile,
};

/// 分析服务的能力边界
///
/// 流程层只依赖这个 trait，测试时用内存实现替换。
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// `POST /analyses/` → 任务 id
    async fn create(&self) -> AppResult<String>;

    /// `POST /analyses/{id}/documents/`，multipart 字段名 `files`
    async fn upload_documents(&self, job_id: &str, files: &[UploadFile]) -> AppResult<()>;

    /// `POST /analyses/{id}/processing/`
    async fn start_processing(&self, job_id: &str) -> AppResult<JobStatus>;

    /// `GET /analyses/{id}/status/`
    async fn status(&self, job_id: &str) -> AppResult<JobStatus>;

    /// `GET /analyses/{id}/formal-analysis/`
    async fn formal_analysis(&self, job_id: &str) -> AppResult<FormalAnalysis>;
}

/// 基于 reqwest 的分析客户端
#[derive(Clone)]
pub struct AnalysisClient {
    http: Client,
    base_url: String,
}

impl AnalysisClient {
    /// 创建新的分析客户端
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.analysis_api_base_url.clone(),
        }
    }

    fn job_url(&self, job_id: &str, action: &str) -> String {
        join_url(&self.base_url, &format!("{}/{}/", job_id, action))
    }

    async fn build_form(files: &[UploadFile]) -> AppResult<Form> {
        let mut form = Form::new();
        for file in files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|e| UploadError::FileReadFailed {
                    path: file.path.display().to_string(),
                    reason: e.to_string(),
                })?;
            let part = Part::bytes(bytes)
                .file_name(file.name.clone())
                .mime_str(crate::models::upload::PDF_MIME)?;
            form = form.part("files", part);
        }
        Ok(form)
    }
}

#[async_trait]
impl AnalysisApi for AnalysisClient {
    async fn create(&self) -> AppResult<String> {
        let endpoint = join_url(&self.base_url, "");
        let response = self
            .http
            .post(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::network_failure(&endpoint, e))?;
        let created: CreateAnalysisResponse = read_json(response, &endpoint).await?;
        info!("✓ 已创建分析任务: {}", created.id);
        Ok(created.id)
    }

    async fn upload_documents(&self, job_id: &str, files: &[UploadFile]) -> AppResult<()> {
        let endpoint = self.job_url(job_id, "documents");
        let form = Self::build_form(files).await?;
        info!("📤 上传 {} 个文件到任务 {}", files.len(), job_id);

        let response = self
            .http
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::network_failure(&endpoint, e))?;
        expect_success(response, &endpoint).await
    }

    async fn start_processing(&self, job_id: &str) -> AppResult<JobStatus> {
        let endpoint = self.job_url(job_id, "processing");
        let response = self
            .http
            .post(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::network_failure(&endpoint, e))?;
        let status: StatusResponse = read_json(response, &endpoint).await?;
        debug!("任务 {} 开始处理, 状态: {}", job_id, status.status);
        Ok(status.job_status())
    }

    async fn status(&self, job_id: &str) -> AppResult<JobStatus> {
        let endpoint = self.job_url(job_id, "status");
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::network_failure(&endpoint, e))?;
        let status: StatusResponse = read_json(response, &endpoint).await?;
        Ok(status.job_status())
    }

    async fn formal_analysis(&self, job_id: &str) -> AppResult<FormalAnalysis> {
        let endpoint = self.job_url(job_id, "formal-analysis");
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::network_failure(&endpoint, e))?;
        read_json(response, &endpoint).await
    }
}
