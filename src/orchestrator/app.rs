//! 应用主结构 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、启动信息、共享 HTTP 客户端、会话存储
//! 2. **命令分发**：chat / analyze / record / session
//! 3. **资源管理**：唯一持有 `reqwest::Client` 和 `SessionStore` 的模块
//! 4. **统计输出**：分析结束后汇总结果
//!
//! 不做具体业务判断，全部委托给 workflow 和 services。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::clients::{AnalysisClient, ChatAgent, ChatClient};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{build_client, SessionStore};
use crate::models::{CandidateFile, FileStatus};
use crate::services::{cancel_pair, ChatSession, UploadQueue};
use crate::state::{Node, Path};
use crate::utils::logging::{self, RunStats};
use crate::workflow::{AnalysisFlow, AnalysisOutcome, FormKind, FormStore};

const GREETING: &str = "Dzień dobry! Proszę opisać, co się wydarzyło.";

/// 命令行解析后的命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 交互式聊天，收集到的数据写入表单
    Chat {
        agent: Option<ChatAgent>,
        form: FormKind,
    },
    /// 上传 PDF 并运行形式分析
    Analyze { files: Vec<PathBuf> },
    /// 按 `path=value` 编辑表单并输出提交内容
    Record {
        form: FormKind,
        assignments: Vec<String>,
    },
    /// 查看或重建会话 id
    Session { renew: bool },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Chat { .. } => "chat",
            Command::Analyze { .. } => "analyze",
            Command::Record { .. } => "record",
            Command::Session { .. } => "session",
        }
    }
}

/// 聊天 REPL 中的指令
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplInput {
    Show,
    Sections,
    Submit,
    Reset,
    Quit,
    Message(String),
}

/// 应用主结构
pub struct App {
    config: Config,
    http: Client,
    sessions: Arc<SessionStore>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file, "Accident Intake")?;

        let http = build_client(&config)?;
        let sessions = Arc::new(SessionStore::file(&config.session_file));

        Ok(Self {
            config,
            http,
            sessions,
        })
    }

    /// 运行命令
    pub async fn run(&self, command: Command) -> Result<()> {
        logging::log_startup(command.name(), &self.config);

        match command {
            Command::Chat { agent, form } => self.run_chat(agent, form).await,
            Command::Analyze { files } => self.run_analysis(files).await,
            Command::Record { form, assignments } => self.run_record(form, &assignments),
            Command::Session { renew } => self.run_session(renew),
        }
    }

    // ========== chat ==========

    async fn run_chat(&self, agent: Option<ChatAgent>, form: FormKind) -> Result<()> {
        let client = ChatClient::new(self.http.clone(), &self.config)
            .with_agent(agent.unwrap_or(self.config.chat_agent));
        let agent = client.agent();
        let mut session = ChatSession::with_store(Arc::new(client), self.sessions.clone())?
            .with_greeting(GREETING);
        info!("💬 会话 {} 使用助手 {}", session.session_id(), agent);
        let mut store = FormStore::new(form, self.config.prune_on_submit)?;

        println!("{}", GREETING);
        println!("Polecenia: /show /sections /submit /reset /quit");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_repl_input(&line) {
                None => continue,
                Some(ReplInput::Quit) => break,
                Some(ReplInput::Show) => {
                    println!("{}", serde_json::to_string_pretty(&store.record().to_json())?);
                }
                Some(ReplInput::Sections) => {
                    for (id, open) in store.sections().iter() {
                        println!("[{}] {}", if open { "x" } else { " " }, id.title());
                    }
                }
                Some(ReplInput::Submit) => self.print_submission(&store)?,
                Some(ReplInput::Reset) => {
                    store.reset()?;
                    session.push_system("Formularz wyczyszczony.");
                    println!("Formularz wyczyszczony.");
                }
                Some(ReplInput::Message(text)) => {
                    let Some(collected) = session.send(&text).await else {
                        println!("(brak odpowiedzi, spróbuj ponownie)");
                        continue;
                    };
                    if let Some(reply) = session.last_agent_message() {
                        println!("> {}", reply.text);
                    }
                    let report = store.ingest(&collected)?;
                    if !report.is_empty() {
                        let titles: Vec<&str> = report.opened.iter().map(|s| s.title()).collect();
                        info!("✓ 写入 {} 个字段，打开分区: {:?}", report.written.len(), titles);
                        if !titles.is_empty() {
                            session.push_system(format!("Uzupełniono: {}", titles.join(", ")));
                        }
                        logging::append_log(
                            &self.config.output_log_file,
                            &format!("ingest {} fields", report.written.len()),
                        )?;
                    }
                }
            }
        }

        info!("👋 聊天结束，共 {} 条消息", session.messages().len());
        Ok(())
    }

    // ========== analyze ==========

    async fn run_analysis(&self, files: Vec<PathBuf>) -> Result<()> {
        let mut queue = UploadQueue::new(self.config.max_upload_files);

        let mut candidates = Vec::new();
        for path in &files {
            match CandidateFile::from_path(path) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!("⚠️ 跳过文件 {}: {}", path.display(), e),
            }
        }

        let added = queue.add_files(candidates);
        if added.rejected_non_pdf > 0 {
            warn!("⚠️ {} 个非 PDF 文件被忽略", added.rejected_non_pdf);
        }
        if added.max_reached {
            warn!(
                "⚠️ 已达到文件上限 {}，{} 个文件未加入",
                queue.max_files(),
                added.dropped_over_cap
            );
        }
        if added.accepted.is_empty() {
            warn!("⚠️ 没有可上传的 PDF 文件，程序结束");
            return Ok(());
        }

        let api = Arc::new(AnalysisClient::new(self.http.clone(), &self.config));
        let flow = AnalysisFlow::new(api, self.config.poll_config());

        let (canceller, token) = cancel_pair();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⚠️ 收到中断信号，停止轮询");
                canceller.cancel();
            }
        });

        match flow.run(&mut queue, token).await {
            Ok(outcome) => {
                self.report_outcome(&outcome, &queue)?;
                Ok(())
            }
            Err(AppError::Analysis(e)) => {
                error!("❌ 分析中止: {}", e);
                logging::append_log(&self.config.output_log_file, &e.to_string())?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn report_outcome(&self, outcome: &AnalysisOutcome, queue: &UploadQueue) -> AppResult<()> {
        let failed = queue
            .files()
            .iter()
            .filter(|f| f.status == FileStatus::Error)
            .count();
        let stats = RunStats {
            files_uploaded: if outcome.upload_succeeded {
                outcome.uploaded_files
            } else {
                0
            },
            files_failed: failed,
            poll_attempts: outcome.poll.attempts,
            poll_errors: outcome.poll.errors,
            qualified: outcome.analysis.qualifies_as_work_accident,
            used_fallback: outcome.used_fallback,
        };

        logging::append_log(
            &self.config.output_log_file,
            &format!(
                "job {} -> {:?}, {}",
                outcome.job_id,
                outcome.poll.status,
                outcome.analysis.verdict()
            ),
        )?;

        println!("{}", outcome.analysis.verdict());
        println!("{}", outcome.analysis.overall_conclusion);
        println!("{}", outcome.analysis.recommendations);

        logging::print_final_stats(&stats, &self.config.output_log_file);
        Ok(())
    }

    // ========== record ==========

    fn run_record(&self, form: FormKind, assignments: &[String]) -> Result<()> {
        let mut store = FormStore::new(form, self.config.prune_on_submit)?;
        for raw in assignments {
            let (path, value) = parse_assignment(raw)?;
            match form.section_for_path(&path) {
                Some(section) => info!("✏️ {} ({})", path, section.title()),
                None => debug!("{} 不是已知的表单字段", path),
            }
            store.update(&path, value)?;
        }
        self.print_submission(&store)?;
        Ok(())
    }

    fn print_submission(&self, store: &FormStore) -> Result<()> {
        let submission = store.submit()?;
        for warning in &submission.warnings {
            warn!("⚠️ {}", warning);
        }
        println!("{}", serde_json::to_string_pretty(&submission.payload)?);
        Ok(())
    }

    // ========== session ==========

    fn run_session(&self, renew: bool) -> Result<()> {
        let id = if renew {
            self.sessions.init_session()?
        } else {
            self.sessions.session_id()?
        };
        println!("{}", id);
        Ok(())
    }
}

// ========== 辅助函数 ==========

/// 解析 `path=value`
///
/// 布尔值、`null`、对象、数组和带引号的字符串按 JSON 解析；
/// 数字（PESEL、电话号码等）和其他内容一律作为文本。
pub fn parse_assignment(raw: &str) -> AppResult<(Path, Node)> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| AppError::Other(format!("缺少 '=': {}", raw)))?;
    let path: Path = path.parse()?;
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(serde_json::Value::Number(_)) | Err(_) => Node::text(value),
        Ok(json) => Node::from(json),
    };
    Ok((path, value))
}

fn parse_repl_input(line: &str) -> Option<ReplInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let input = match line {
        "/show" => ReplInput::Show,
        "/sections" => ReplInput::Sections,
        "/submit" => ReplInput::Submit,
        "/reset" => ReplInput::Reset,
        "/quit" | "/exit" => ReplInput::Quit,
        text => ReplInput::Message(text.to_string()),
    };
    Some(input)
}
