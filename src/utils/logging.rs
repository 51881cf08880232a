/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::AppResult;

/// 初始化 tracing 订阅者
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 `debug` 或 `info`。
/// 重复调用不会报错（测试中会多次调用）。
///
/// # 参数
/// - `verbose`: 是否显示详细日志
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `title`: 本次运行的标题
pub fn init_log_file(log_file_path: &str, title: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n{} - {}\n{}\n\n",
        "=".repeat(60),
        title,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 向日志文件追加一行（带时间戳）
pub fn append_log(log_file_path: &str, line: &str) -> AppResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `command`: 子命令名
/// - `config`: 程序配置
pub fn log_startup(command: &str, config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", command);
    info!("💬 聊天助手: {}", config.chat_agent);
    info!(
        "⏱️ 轮询间隔: {} ms, 最多 {} 次",
        config.poll_interval_ms, config.poll_max_attempts
    );
    info!("{}", "=".repeat(60));
}

/// 分析运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub files_uploaded: usize,
    pub files_failed: usize,
    pub poll_attempts: u64,
    pub poll_errors: u64,
    pub qualified: bool,
    pub used_fallback: bool,
}

/// 打印最终统计信息
///
/// # 参数
/// - `stats`: 运行统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(stats: &RunStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 分析完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 上传成功: {}", stats.files_uploaded);
    info!("❌ 上传失败: {}", stats.files_failed);
    info!("🔁 状态查询: {} 次 (出错 {} 次)", stats.poll_attempts, stats.poll_errors);
    info!(
        "⚖️ 结论: {}{}",
        if stats.qualified {
            "Zakwalifikowano"
        } else {
            "Nie zakwalifikowano"
        },
        if stats.used_fallback { " (默认结论)" } else { "" }
    );
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
