//! 文档分析流程 - 流程层
//!
//! 核心职责：定义"一次分析"的完整处理流程
//!
//! 流程顺序：
//! 1. 创建任务
//! 2. 上传 pending/error 文件（失败只标记文件，继续）
//! 3. 触发处理
//! 4. 轮询状态
//! 5. 获取形式分析结果（失败时使用固定结论）

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::AnalysisApi;
use crate::error::{AnalysisError, AppResult, UploadError};
use crate::models::FormalAnalysis;
use crate::services::{AnalysisPoller, CancelToken, PollConfig, PollReport, TerminalStatus, UploadQueue};

/// 一次分析的结果
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub job_id: String,
    /// 本批上传的文件数
    pub uploaded_files: usize,
    pub upload_succeeded: bool,
    pub poll: PollReport,
    pub analysis: FormalAnalysis,
    /// 结果获取失败，`analysis` 为固定结论
    pub used_fallback: bool,
}

/// 文档分析流程
///
/// - 编排上传、处理、轮询、取结果
/// - 只依赖 `AnalysisApi` 能力
/// - 上传队列由调用方持有
pub struct AnalysisFlow {
    api: Arc<dyn AnalysisApi>,
    poller: AnalysisPoller,
}

impl AnalysisFlow {
    pub fn new(api: Arc<dyn AnalysisApi>, poll_config: PollConfig) -> Self {
        let poller = AnalysisPoller::new(api.clone(), poll_config);
        Self { api, poller }
    }

    /// 执行完整分析
    ///
    /// # 参数
    /// - `queue`: 上传队列，文件状态在流程中更新
    /// - `cancel`: 取消令牌；取消后跳过结果获取
    ///
    /// # 返回
    /// 返回分析结果；创建任务或触发处理失败时返回错误，
    /// 轮询被取消时返回 `Cancelled`
    pub async fn run(
        &self,
        queue: &mut UploadQueue,
        mut cancel: CancelToken,
    ) -> AppResult<AnalysisOutcome> {
        let files = queue.pending_for_upload();
        if files.is_empty() {
            return Err(UploadError::NothingToUpload.into());
        }

        // ========== 1. 创建任务 ==========
        let job_id = self.api.create().await?;

        // ========== 2. 上传 ==========
        let ids: Vec<String> = files.iter().map(|f| f.id.clone()).collect();
        queue.begin_batch(&ids)?;
        let upload_succeeded = match self.api.upload_documents(&job_id, &files).await {
            Ok(()) => {
                let done = queue.finish_batch(true);
                info!("✓ {} 个文件上传完成", done);
                true
            }
            Err(e) => {
                let failed = queue.finish_batch(false);
                warn!("⚠️ 上传失败，{} 个文件标记为 error: {}", failed, e);
                false
            }
        };

        // ========== 3. 触发处理 ==========
        let initial = self.api.start_processing(&job_id).await?;
        info!("🚀 任务 {} 已开始处理 (状态: {})", job_id, initial);

        // ========== 4. 轮询 ==========
        let poll = self.poller.poll(&job_id, &mut cancel).await;
        if poll.status == TerminalStatus::Cancelled {
            return Err(AnalysisError::Cancelled { job_id }.into());
        }

        // ========== 5. 获取结果 ==========
        let (analysis, used_fallback) = match self.api.formal_analysis(&job_id).await {
            Ok(analysis) => (analysis, false),
            Err(e) => {
                warn!("⚠️ 获取形式分析失败，使用默认结论: {}", e);
                (FormalAnalysis::fallback(), true)
            }
        };

        info!(
            "📊 分析结束: {} (轮询 {} 次, 出错 {} 次)",
            analysis.verdict(),
            poll.attempts,
            poll.errors
        );

        Ok(AnalysisOutcome {
            job_id,
            uploaded_files: files.len(),
            upload_succeeded,
            poll,
            analysis,
            used_fallback,
        })
    }
}
