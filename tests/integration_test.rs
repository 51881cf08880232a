use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use accident_intake::clients::{AnalysisApi, AnalysisClient, ChatApi, ChatClient};
use accident_intake::error::{AnalysisError, AppError, AppResult, UploadError};
use accident_intake::infrastructure::{build_client, FileStore, SessionStore};
use accident_intake::models::{
    CandidateFile, ChatResponse, CollectedData, FileStatus, FormalAnalysis, JobStatus, UploadFile,
};
use accident_intake::services::{cancel_pair, CancelToken, ChatSession, PollConfig, TerminalStatus, UploadQueue};
use accident_intake::state::{Node, Path, SectionId};
use accident_intake::utils::logging;
use accident_intake::workflow::{AnalysisFlow, FormKind, FormStore};
use accident_intake::Config;
use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};

// ========== 模拟分析接口 ==========

/// 状态查询的脚本步骤
#[derive(Clone, Copy)]
enum Step {
    Status(JobStatus),
    Error,
}

#[derive(Default)]
struct MockAnalysis {
    script: Mutex<VecDeque<Step>>,
    upload_fails: bool,
    fetch_fails: bool,
    creates: AtomicUsize,
    uploads: AtomicUsize,
    status_calls: AtomicUsize,
    fetches: AtomicUsize,
}

impl MockAnalysis {
    /// 脚本用完后一直返回 `processing`
    fn scripted(steps: &[Step]) -> Self {
        Self {
            script: Mutex::new(steps.iter().copied().collect()),
            ..Default::default()
        }
    }

    fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisApi for MockAnalysis {
    async fn create(&self) -> AppResult<String> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(format!("job-{}", n + 1))
    }

    async fn upload_documents(&self, _job_id: &str, files: &[UploadFile]) -> AppResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        assert!(!files.is_empty());
        if self.upload_fails {
            return Err(AppError::bad_response("documents/", 500, "storage unavailable"));
        }
        Ok(())
    }

    async fn start_processing(&self, _job_id: &str) -> AppResult<JobStatus> {
        Ok(JobStatus::Processing)
    }

    async fn status(&self, _job_id: &str) -> AppResult<JobStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Status(JobStatus::Processing));
        match step {
            Step::Status(status) => Ok(status),
            Step::Error => Err(AppError::bad_response("status/", 502, "bad gateway")),
        }
    }

    async fn formal_analysis(&self, _job_id: &str) -> AppResult<FormalAnalysis> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fetch_fails {
            return Err(AppError::bad_response("formal-analysis/", 500, ""));
        }
        Ok(FormalAnalysis {
            qualifies_as_work_accident: true,
            overall_conclusion: "Zdarzenie spełnia definicję wypadku przy pracy.".into(),
            recommendations: "Brak.".into(),
        })
    }
}

// ========== 辅助函数 ==========

fn poll_config(max_attempts: u64, stop_on_failed: bool) -> PollConfig {
    PollConfig {
        max_attempts,
        interval: Duration::from_millis(2000),
        stop_on_failed,
    }
}

fn queue_with_pdfs(names: &[&str]) -> UploadQueue {
    let mut queue = UploadQueue::new(5);
    let outcome = queue.add_files(names.iter().map(|n| CandidateFile::new(*n, 1024)));
    assert_eq!(outcome.accepted.len(), names.len());
    queue
}

fn statuses(queue: &UploadQueue) -> Vec<FileStatus> {
    queue.files().iter().map(|f| f.status).collect()
}

// ========== 分析流程 ==========

#[tokio::test(start_paused = true)]
async fn test_flow_completes_on_third_query() {
    let mock = Arc::new(MockAnalysis::scripted(&[
        Step::Status(JobStatus::Pending),
        Step::Status(JobStatus::Processing),
        Step::Status(JobStatus::Completed),
    ]));
    let flow = AnalysisFlow::new(mock.clone(), poll_config(10, false));
    let mut queue = queue_with_pdfs(&["karta_wypadku.pdf", "protokol.pdf"]);

    let started = tokio::time::Instant::now();
    let outcome = assert_ok!(flow.run(&mut queue, CancelToken::never()).await);

    assert_eq!(outcome.poll.status, TerminalStatus::Completed);
    assert_eq!(outcome.poll.attempts, 3);
    assert_eq!(mock.status_calls(), 3);
    assert_eq!(mock.fetches(), 1);
    assert!(!outcome.used_fallback);
    assert!(outcome.analysis.qualifies_as_work_accident);
    assert_eq!(outcome.uploaded_files, 2);
    assert_eq!(statuses(&queue), vec![FileStatus::Complete, FileStatus::Complete]);
    // 每次查询前都等待一个间隔
    assert_eq!(started.elapsed(), Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn test_flow_exhausts_attempts_and_falls_back() {
    let mock = Arc::new(MockAnalysis {
        script: Mutex::new(std::iter::repeat(Step::Error).take(100).collect()),
        fetch_fails: true,
        ..Default::default()
    });
    let flow = AnalysisFlow::new(mock.clone(), poll_config(7, false));
    let mut queue = queue_with_pdfs(&["a.pdf"]);

    let outcome = assert_ok!(flow.run(&mut queue, CancelToken::never()).await);

    assert_eq!(outcome.poll.status, TerminalStatus::Exhausted);
    assert_eq!(outcome.poll.attempts, 7);
    assert_eq!(outcome.poll.errors, 7);
    assert_eq!(mock.status_calls(), 7);
    // 轮询耗尽后仍然获取一次结果
    assert_eq!(mock.fetches(), 1);
    assert!(outcome.used_fallback);
    assert_eq!(outcome.analysis, FormalAnalysis::fallback());
    assert!(!outcome.analysis.qualifies_as_work_accident);
    assert!(outcome.poll.clone().into_result().unwrap_err().is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_failed_status_respects_switch() {
    let steps = [Step::Status(JobStatus::Failed), Step::Status(JobStatus::Completed)];

    let stopping = Arc::new(MockAnalysis::scripted(&steps));
    let flow = AnalysisFlow::new(stopping.clone(), poll_config(10, true));
    let outcome = assert_ok!(flow.run(&mut queue_with_pdfs(&["a.pdf"]), CancelToken::never()).await);
    assert_eq!(outcome.poll.status, TerminalStatus::Failed);
    assert_eq!(stopping.status_calls(), 1);
    assert_eq!(stopping.fetches(), 1);

    let continuing = Arc::new(MockAnalysis::scripted(&steps));
    let flow = AnalysisFlow::new(continuing.clone(), poll_config(10, false));
    let outcome = assert_ok!(flow.run(&mut queue_with_pdfs(&["a.pdf"]), CancelToken::never()).await);
    assert_eq!(outcome.poll.status, TerminalStatus::Completed);
    assert_eq!(continuing.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_wait_skips_fetch() {
    let mock = Arc::new(MockAnalysis::default());
    let flow = AnalysisFlow::new(mock.clone(), poll_config(1000, false));
    let mut queue = queue_with_pdfs(&["a.pdf"]);
    let (canceller, token) = cancel_pair();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5000)).await;
        canceller.cancel();
    });

    let err = assert_err!(flow.run(&mut queue, token).await);
    assert!(matches!(err, AppError::Analysis(AnalysisError::Cancelled { .. })));
    // 第 2 秒和第 4 秒各查询一次，第 5 秒取消
    assert_eq!(mock.status_calls(), 2);
    assert_eq!(mock.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_marks_files_and_continues() {
    let mock = Arc::new(MockAnalysis {
        script: Mutex::new([Step::Status(JobStatus::Completed)].into_iter().collect()),
        upload_fails: true,
        ..Default::default()
    });
    let flow = AnalysisFlow::new(mock.clone(), poll_config(10, false));
    let mut queue = queue_with_pdfs(&["a.pdf", "b.pdf"]);

    let outcome = assert_ok!(flow.run(&mut queue, CancelToken::never()).await);

    assert!(!outcome.upload_succeeded);
    assert_eq!(mock.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(statuses(&queue), vec![FileStatus::Error, FileStatus::Error]);
    assert_eq!(outcome.poll.status, TerminalStatus::Completed);
    assert_eq!(mock.fetches(), 1);
    // error 文件在下一批中重新上传
    assert_eq!(queue.pending_for_upload().len(), 2);
}

#[tokio::test]
async fn test_empty_queue_does_not_create_job() {
    let mock = Arc::new(MockAnalysis::default());
    let flow = AnalysisFlow::new(mock.clone(), poll_config(10, false));
    let mut queue = UploadQueue::new(5);

    let err = assert_err!(flow.run(&mut queue, CancelToken::never()).await);
    assert!(matches!(err, AppError::Upload(UploadError::NothingToUpload)));
    assert_eq!(mock.creates.load(Ordering::SeqCst), 0);
}

// ========== 上传队列 ==========

#[test]
fn test_upload_cap_and_pdf_filter() {
    let mut queue = queue_with_pdfs(&["1.pdf", "2.pdf", "3.pdf"]);

    let offered = ["4.pdf", "zdjecie.jpg", "5.pdf", "6.pdf", "7.pdf", "8.pdf", "9.pdf"];
    let outcome = queue.add_files(offered.iter().map(|n| CandidateFile::new(*n, 10)));

    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.rejected_non_pdf, 1);
    assert_eq!(outcome.dropped_over_cap, 4);
    assert!(outcome.max_reached);
    assert_eq!(queue.files().len(), 5);

    let first = queue.files()[0].id.clone();
    assert_ok!(queue.remove(&first));
    assert!(!queue.max_reached());
}

// ========== 表单与聊天 ==========

struct ScriptedChat;

#[async_trait]
impl ChatApi for ScriptedChat {
    async fn send(&self, _input: &str, session_id: &str) -> AppResult<ChatResponse> {
        Ok(ChatResponse {
            response: "Gdzie doszło do wypadku?".into(),
            session_id: session_id.to_string(),
            collected_data: CollectedData {
                location: Some("Magazyn B".into()),
                injury_type: Some("złamanie".into()),
                cause: Some("   ".into()),
                ..Default::default()
            },
        })
    }
}

#[tokio::test]
async fn test_chat_data_opens_sections() {
    let mut session = ChatSession::new(Arc::new(ScriptedChat), "sess-1");
    let mut store = assert_ok!(FormStore::new(FormKind::Victim, false));
    let mut rx = store.subscribe();

    let collected = session.send("Spadłem z rampy").await.unwrap();
    let report = assert_ok!(store.ingest(&collected));

    assert_eq!(report.written.len(), 2);
    assert!(store.sections().is_open(SectionId::AccidentDetails));
    assert!(store.sections().is_open(SectionId::MedicalHelp));
    assert!(!store.sections().is_open(SectionId::Intoxication));

    let location: Path = "accidentDetails.location".parse().unwrap();
    assert_eq!(store.get(&location), Some(&Node::text("Magazyn B")));

    assert_ok!(rx.changed().await);
    assert_eq!(rx.borrow().version, store.version());

    // 相同数据再次写入不产生新的字段
    let again = assert_ok!(store.ingest(&collected));
    assert!(again.written.is_empty());
}

#[test]
fn test_record_submit_after_path_updates() {
    let mut store = FormStore::new(FormKind::Victim, false).unwrap();
    let path: Path = "personalData.pesel".parse().unwrap();
    assert_ok!(store.update(&path, Node::text("90010112345")));

    let submission = assert_ok!(store.submit());
    assert_eq!(submission.payload["personalData"]["pesel"], "90010112345");
}

// ========== 会话存储 ==========

#[test]
fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("nested").join("session.json");

    let first = SessionStore::new(FileStore::new(&file));
    assert!(!assert_ok!(first.has_session()));
    let id = assert_ok!(first.session_id());

    let second = SessionStore::file(&file);
    assert!(assert_ok!(second.has_session()));
    assert_eq!(assert_ok!(second.session_id()), id);

    let renewed = assert_ok!(second.init_session());
    assert_ne!(renewed, id);
}

// ========== 在线测试 ==========

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_live_chat_round_trip() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    let http = build_client(&config).expect("创建 HTTP 客户端失败");
    let client = ChatClient::new(http, &config);

    let response = client
        .send("Dzień dobry, chcę zgłosić wypadek.", "integration-test")
        .await
        .expect("发送聊天消息失败");

    assert!(!response.response.is_empty(), "助手应该返回回复");
}

#[tokio::test]
#[ignore]
async fn test_live_create_analysis() {
    logging::init(true);

    let config = Config::load().expect("加载配置失败");
    let http = build_client(&config).expect("创建 HTTP 客户端失败");
    let client = AnalysisClient::new(http, &config);

    let job_id = client.create().await.expect("创建分析任务失败");
    assert!(!job_id.is_empty(), "应该返回任务 id");

    let status = client.status(&job_id).await.expect("查询状态失败");
    assert_ne!(status, JobStatus::Completed, "新任务不应已完成");
}
