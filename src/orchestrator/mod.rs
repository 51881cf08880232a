//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责应用生命周期和命令调度，是整个系统的"指挥中心"。
//!
//! ### `app` - 应用主结构
//! - 初始化日志文件、HTTP 客户端、会话存储
//! - 分发 chat / analyze / record / session 命令
//! - 输出分析统计信息
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (命令)
//!     ↓
//! workflow (FormStore / AnalysisFlow)
//!     ↓
//! services (UploadQueue / AnalysisPoller / ChatSession)
//!     ↓
//! clients + infrastructure (reqwest / SessionStore)
//! ```
//!
//! 编排层只做调度和统计，不做具体业务判断。

pub mod app;

pub use app::{parse_assignment, App, Command};
