//! HTTP 客户端 - 基础设施层
//!
//! 全进程共享一个 `reqwest::Client`（内部连接池），各 API 客户端只持有它的克隆。

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 按配置构建共享 HTTP 客户端
///
/// # 参数
/// - `config`: 程序配置（读取请求超时）
///
/// # 返回
/// 返回可克隆的 `reqwest::Client`
pub fn build_client(config: &Config) -> AppResult<Client> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    debug!("构建 HTTP 客户端, 超时 {:?}", timeout);
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("accident-intake/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// 拼接基础地址与相对路径，保证中间只有一个 `/`
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// 检查状态码并解析 JSON 响应体
///
/// 非 2xx 响应返回 `BadResponse`，携带响应正文便于排查。
pub async fn read_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("⚠️ {} 返回 {}: {}", endpoint, status, body);
        return Err(AppError::bad_response(endpoint, status.as_u16(), body));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// 只检查状态码，忽略响应体
pub async fn expect_success(response: Response, endpoint: &str) -> AppResult<()> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("⚠️ {} 返回 {}: {}", endpoint, status, body);
        return Err(AppError::bad_response(endpoint, status.as_u16(), body));
    }
    Ok(())
}
