use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::clients::ChatAgent;
use crate::error::{AppResult, ConfigError};
use crate::services::poller::PollConfig;

/// 指定配置文件路径的环境变量
pub const CONFIG_FILE_ENV: &str = "ACCIDENT_INTAKE_CONFIG";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 服务地址 ---
    /// 聊天助手服务根地址
    pub chat_api_base_url: String,
    /// 文档分析接口地址（以 `/analyses/` 结尾）
    pub analysis_api_base_url: String,
    /// 默认聊天助手
    pub chat_agent: ChatAgent,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 轮询 ---
    /// 两次状态查询之间的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 最大查询次数
    pub poll_max_attempts: u64,
    /// 服务端报告 failed 时是否立即停止
    pub stop_on_failed: bool,
    // --- 表单与上传 ---
    /// 队列中未完成文件的上限
    pub max_upload_files: usize,
    /// 提交时是否清除已关闭分区的残留数据
    pub prune_on_submit: bool,
    /// 会话存储文件
    pub session_file: String,
    // --- 日志 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_api_base_url:
                "https://webapp-user-assistant-ejhpgseje3f5c7ft.swedencentral-01.azurewebsites.net"
                    .to_string(),
            analysis_api_base_url:
                "https://webapp-clerk-assistant-hhezgzg9gzcrckfs.swedencentral-01.azurewebsites.net/api/analyses/"
                    .to_string(),
            chat_agent: ChatAgent::DataCollector,
            request_timeout_secs: 60,
            poll_interval_ms: 2000,
            poll_max_attempts: 500_000,
            stop_on_failed: false,
            max_upload_files: 5,
            prune_on_submit: false,
            session_file: ".accident-intake/session.json".to_string(),
            verbose_logging: false,
            output_log_file: "intake_log.txt".to_string(),
        }
    }
}

impl Config {
    /// 默认值 + 环境变量覆盖
    pub fn from_env() -> AppResult<Self> {
        Self::default().apply_env()
    }

    /// 读取 TOML 配置文件，缺省字段取默认值
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::FileParseFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(config)
    }

    /// 完整加载顺序：默认值 → 配置文件（若设置了 `ACCIDENT_INTAKE_CONFIG`）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        base.apply_env()
    }

    /// 用环境变量覆盖已有字段
    pub fn apply_env(self) -> AppResult<Self> {
        Ok(Self {
            chat_api_base_url: env_string("CHAT_API_BASE_URL", self.chat_api_base_url),
            analysis_api_base_url: env_string("ANALYSIS_API_BASE_URL", self.analysis_api_base_url),
            chat_agent: env_parse("CHAT_AGENT", "chat agent", self.chat_agent)?,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", "u64", self.request_timeout_secs)?,
            poll_interval_ms: env_parse("POLL_INTERVAL_MS", "u64", self.poll_interval_ms)?,
            poll_max_attempts: env_parse("POLL_MAX_ATTEMPTS", "u64", self.poll_max_attempts)?,
            stop_on_failed: env_parse("STOP_ON_FAILED", "bool", self.stop_on_failed)?,
            max_upload_files: env_parse("MAX_UPLOAD_FILES", "usize", self.max_upload_files)?,
            prune_on_submit: env_parse("PRUNE_ON_SUBMIT", "bool", self.prune_on_submit)?,
            session_file: env_string("SESSION_FILE", self.session_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool", self.verbose_logging)?,
            output_log_file: env_string("OUTPUT_LOG_FILE", self.output_log_file),
        })
    }

    /// 轮询参数
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            max_attempts: self.poll_max_attempts,
            interval: Duration::from_millis(self.poll_interval_ms),
            stop_on_failed: self.stop_on_failed,
        }
    }
}

// ========== 辅助函数 ==========

fn env_string(name: &str, current: String) -> String {
    std::env::var(name).unwrap_or(current)
}

fn env_parse<T: FromStr>(name: &str, expected_type: &str, current: T) -> AppResult<T> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value: raw.clone(),
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(current),
    }
}
