//! 文档分析接口的数据结构

use serde::{Deserialize, Serialize};
use std::fmt;

/// 服务端任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// 未知字符串按 `pending` 处理
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

/// `POST /analyses/` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAnalysisResponse {
    pub id: String,
}

/// 状态类响应：`{status: string}`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::parse(&self.status)
    }
}

/// 形式分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormalAnalysis {
    pub qualifies_as_work_accident: bool,
    #[serde(default)]
    pub overall_conclusion: String,
    #[serde(default)]
    pub recommendations: String,
}

impl FormalAnalysis {
    /// 获取结果失败时展示的固定结论
    pub fn fallback() -> Self {
        Self {
            qualifies_as_work_accident: false,
            overall_conclusion: "Błąd podczas analizy formalnej.".to_string(),
            recommendations: "Proszę spróbować ponownie później.".to_string(),
        }
    }

    /// 界面上的资格标签
    pub fn verdict(&self) -> &'static str {
        if self.qualifies_as_work_accident {
            "Zakwalifikowano"
        } else {
            "Nie zakwalifikowano"
        }
    }
}
