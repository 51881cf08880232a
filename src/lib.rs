//! # Accident Intake
//!
//! 工伤事故登记客户端：事故说明表、事故报告表、聊天预填、PDF 文档形式分析
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 共享 HTTP 客户端、本地会话存储
//! - `clients/` - 聊天接口与分析接口的薄封装（`ChatApi` / `AnalysisApi`）
//!
//! ### ② 状态与模型（State / Models）
//! - `state/` - 记录树 `Node`、路径 `Path`、`update`、分区可见性
//! - `models/` - 类型化的表单、聊天数据、分析结果、上传文件
//!
//! ### ③ 业务能力层（Services）
//! - `UploadQueue` - PDF 上传队列与文件状态
//! - `AnalysisPoller` - 有界轮询与取消
//! - `ChatSession` - 聊天消息列表
//!
//! ### ④ 流程层（Workflow）
//! - `FormStore` - 表单状态、聊天数据写入、提交
//! - `AnalysisFlow` - 创建任务 → 上传 → 处理 → 轮询 → 取结果
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator::App` - 生命周期与命令分发

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod state;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::{App, Command};
pub use state::{get, update, Node, Path, SectionId, SectionVisibility};
pub use workflow::{AnalysisFlow, FormKind, FormStore};
