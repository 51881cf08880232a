//! 状态轮询服务 - 业务能力层
//!
//! 只负责"等待任务到达终态"：固定间隔查询，次数有上限，可取消。
//! 不获取最终结果，也不关心上传。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clients::AnalysisApi;
use crate::error::{AnalysisError, AppResult};
use crate::models::JobStatus;

/// 轮询参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u64,
    pub interval: Duration,
    /// 收到 failed 时是否停止；关闭时 failed 与 pending 同样处理
    pub stop_on_failed: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 500_000,
            interval: Duration::from_millis(2000),
            stop_on_failed: false,
        }
    }
}

/// 轮询结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Completed,
    Failed,
    Exhausted,
    Cancelled,
}

/// 一次轮询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub job_id: String,
    pub status: TerminalStatus,
    /// 实际发出的状态查询次数
    pub attempts: u64,
    /// 查询出错次数
    pub errors: u64,
}

impl PollReport {
    /// 只有 `Completed` 视为成功
    pub fn into_result(self) -> AppResult<Self> {
        let job_id = self.job_id.clone();
        match self.status {
            TerminalStatus::Completed => Ok(self),
            TerminalStatus::Failed => Err(AnalysisError::Failed { job_id }.into()),
            TerminalStatus::Exhausted => Err(AnalysisError::Timeout {
                job_id,
                attempts: self.attempts,
            }
            .into()),
            TerminalStatus::Cancelled => Err(AnalysisError::Cancelled { job_id }.into()),
        }
    }
}

/// 取消信号的发送端
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// 取消信号的接收端
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// 永远不会被取消的令牌
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消；发送端全部释放且未取消时永不返回
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// 创建一对取消句柄
pub fn cancel_pair() -> (Canceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx: Arc::new(tx) }, CancelToken { rx })
}

/// 分析任务状态轮询器
pub struct AnalysisPoller {
    api: Arc<dyn AnalysisApi>,
    config: PollConfig,
}

impl AnalysisPoller {
    pub fn new(api: Arc<dyn AnalysisApi>, config: PollConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// 轮询任务状态
    ///
    /// 每次迭代先等待 `interval` 再查询；查询严格串行。
    /// 查询出错只记录并继续。
    ///
    /// # 参数
    /// - `job_id`: 任务 id
    /// - `cancel`: 取消令牌，只在等待期间生效
    ///
    /// # 返回
    /// 返回结束原因和统计
    pub async fn poll(&self, job_id: &str, cancel: &mut CancelToken) -> PollReport {
        let mut attempts = 0u64;
        let mut errors = 0u64;
        info!(
            "⏳ 开始轮询任务 {} (间隔 {:?}, 最多 {} 次)",
            job_id, self.config.interval, self.config.max_attempts
        );

        let finish = |status: TerminalStatus, attempts: u64, errors: u64| PollReport {
            job_id: job_id.to_string(),
            status,
            attempts,
            errors,
        };

        while attempts < self.config.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("⚠️ 任务 {} 的轮询已取消 (第 {} 次之后)", job_id, attempts);
                    return finish(TerminalStatus::Cancelled, attempts, errors);
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            attempts += 1;
            match self.api.status(job_id).await {
                Ok(JobStatus::Completed) => {
                    info!("✓ 任务 {} 已完成 (共查询 {} 次)", job_id, attempts);
                    return finish(TerminalStatus::Completed, attempts, errors);
                }
                Ok(JobStatus::Failed) => {
                    error!("❌ 任务 {} 报告失败 (第 {} 次查询)", job_id, attempts);
                    if self.config.stop_on_failed {
                        return finish(TerminalStatus::Failed, attempts, errors);
                    }
                }
                Ok(status) => {
                    debug!("任务 {} 状态: {} (第 {} 次)", job_id, status, attempts);
                }
                Err(e) => {
                    errors += 1;
                    warn!("⚠️ 查询任务 {} 状态失败 (第 {} 次): {}", job_id, attempts, e);
                }
            }
        }

        warn!("⚠️ 任务 {} 轮询次数耗尽 ({} 次)", job_id, attempts);
        finish(TerminalStatus::Exhausted, attempts, errors)
    }
}
