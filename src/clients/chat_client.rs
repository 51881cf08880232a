/// 聊天助手 API 客户端
///
/// 封装与事故信息收集助手的对话调用
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::http::{join_url, read_json};
use crate::models::{ChatRequest, ChatResponse};
use crate::utils::logging::truncate_text;

/// 服务端的聊天助手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatAgent {
    /// 受害人说明
    #[default]
    DataCollector,
    /// 事故陈述
    StatementCollector,
    /// 事故报告
    ReportCollector,
}

impl ChatAgent {
    /// 助手对应的接口路径
    pub fn endpoint(&self) -> &'static str {
        match self {
            ChatAgent::DataCollector => "accident-data-collector/",
            ChatAgent::StatementCollector => "accident-statement-collector/",
            ChatAgent::ReportCollector => "accident-report-collector/",
        }
    }
}

impl fmt::Display for ChatAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChatAgent::DataCollector => "data-collector",
            ChatAgent::StatementCollector => "statement-collector",
            ChatAgent::ReportCollector => "report-collector",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ChatAgent {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches("accident-").trim_end_matches('/') {
            "data-collector" => Ok(ChatAgent::DataCollector),
            "statement-collector" => Ok(ChatAgent::StatementCollector),
            "report-collector" => Ok(ChatAgent::ReportCollector),
            other => Err(AppError::Other(format!("未知的聊天助手: {}", other))),
        }
    }
}

/// 聊天能力边界
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send(&self, input: &str, session_id: &str) -> AppResult<ChatResponse>;
}

/// 聊天客户端
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    agent: ChatAgent,
}

impl ChatClient {
    /// 创建新的聊天客户端
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.chat_api_base_url.clone(),
            agent: config.chat_agent,
        }
    }

    /// 切换助手
    pub fn with_agent(mut self, agent: ChatAgent) -> Self {
        self.agent = agent;
        self
    }

    pub fn agent(&self) -> ChatAgent {
        self.agent
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    /// 发送一条消息
    ///
    /// # 参数
    /// - `input`: 用户输入
    /// - `session_id`: 会话标识
    ///
    /// # 返回
    /// 返回助手回复及已收集的数据
    async fn send(&self, input: &str, session_id: &str) -> AppResult<ChatResponse> {
        let endpoint = join_url(&self.base_url, self.agent.endpoint());
        debug!("📤 发送聊天消息 [{}]: {}", self.agent, truncate_text(input, 60));

        let request = ChatRequest {
            input: input.to_string(),
            session_id: session_id.to_string(),
        };
        let response = self
            .http
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::network_failure(&endpoint, e))?;

        let parsed: ChatResponse = read_json(response, &endpoint).await?;
        debug!("📥 助手回复: {}", truncate_text(&parsed.response, 60));
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_parse_accepts_endpoint_form() {
        assert_eq!(
            "accident-report-collector/".parse::<ChatAgent>().unwrap(),
            ChatAgent::ReportCollector
        );
        assert_eq!(
            "statement-collector".parse::<ChatAgent>().unwrap(),
            ChatAgent::StatementCollector
        );
        assert!("weather".parse::<ChatAgent>().is_err());
    }

    #[test]
    fn test_agent_display_roundtrips() {
        for agent in [
            ChatAgent::DataCollector,
            ChatAgent::StatementCollector,
            ChatAgent::ReportCollector,
        ] {
            assert_eq!(agent.to_string().parse::<ChatAgent>().unwrap(), agent);
        }
    }
}
