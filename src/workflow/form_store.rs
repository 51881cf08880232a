//! 表单存储 - 流程层
//!
//! 一份表单的全部可变状态：记录树 + 分区展开状态。
//! 所有修改都经过 `update`，每次修改后向订阅者广播新快照。
//!
//! 修改来源：
//! 1. 用户编辑（路径写入、复合编辑、分区开关）
//! 2. 聊天数据到达（写入映射字段并强制展开所在分区）

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{
    report_field_section, AccidentExplanationRecord, AccidentReportData, CollectedData,
    RecordField,
};
use crate::state::{get, update, Node, Path, SectionId, SectionVisibility};
use crate::workflow::record_edit::RecordEdit;

const VICTIM_SECTIONS: [SectionId; 8] = [
    SectionId::PersonalData,
    SectionId::AccidentDetails,
    SectionId::MachineCause,
    SectionId::OtherMachinery,
    SectionId::SafetyCompliance,
    SectionId::Intoxication,
    SectionId::StateAuthority,
    SectionId::MedicalHelp,
];

const REPORT_SECTIONS: [SectionId; 6] = [
    SectionId::General,
    SectionId::WorkCircumstances,
    SectionId::Machinery,
    SectionId::SafetyCompliance,
    SectionId::Investigation,
    SectionId::Medical,
];

/// 聊天字段 → 受害人记录字段
const VICTIM_INGESTION: [(&str, RecordField); 9] = [
    ("accident_date", RecordField::AccidentDate),
    ("accident_time", RecordField::AccidentTime),
    ("location", RecordField::AccidentLocation),
    ("work_start_time", RecordField::PlannedWorkStart),
    ("work_end_time", RecordField::PlannedWorkEnd),
    ("injury_type", RecordField::DiagnosedInjury),
    ("circumstances", RecordField::AccidentCircumstances),
    ("cause", RecordField::AccidentCause),
    ("activity_before_accident", RecordField::WorkActivityBeforeAccident),
];

/// 聊天字段 → 报告字段（同名字段之外的映射）
const REPORT_RENAMES: [(&str, &str); 1] = [("injury_type", "diagnosed_injury")];

/// 表单种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    /// 受害人说明
    Victim,
    /// 事故报告
    Report,
}

impl FormKind {
    pub fn sections(&self) -> &'static [SectionId] {
        match self {
            FormKind::Victim => &VICTIM_SECTIONS,
            FormKind::Report => &REPORT_SECTIONS,
        }
    }

    /// 默认展开的分区
    pub fn default_section(&self) -> SectionId {
        match self {
            FormKind::Victim => SectionId::PersonalData,
            FormKind::Report => SectionId::General,
        }
    }

    pub fn initial_record(&self) -> AppResult<Node> {
        match self {
            FormKind::Victim => AccidentExplanationRecord::default().to_node(),
            FormKind::Report => AccidentReportData::default().to_node(),
        }
    }

    pub fn initial_sections(&self) -> SectionVisibility {
        SectionVisibility::new(self.sections(), self.default_section())
    }

    /// 路径所属分区（`record --set` 的日志提示）
    pub fn section_for_path(&self, path: &Path) -> Option<SectionId> {
        match self {
            FormKind::Victim => RecordField::from_path(path).map(|f| f.section()),
            FormKind::Report => path
                .segments()
                .first()
                .and_then(|s| report_field_section(&s.to_string())),
        }
    }

    /// 聊天数据的写入目标（只含非空字段）
    pub fn ingestion_targets(&self, data: &CollectedData) -> Vec<IngestTarget> {
        let filled = data.filled();
        match self {
            FormKind::Victim => VICTIM_INGESTION
                .iter()
                .filter_map(|(source, field)| {
                    filled
                        .iter()
                        .find(|(name, _)| name == source)
                        .map(|(_, value)| IngestTarget {
                            source: *source,
                            path: field.path(),
                            section: field.section(),
                            value: value.to_string(),
                        })
                })
                .collect(),
            FormKind::Report => filled
                .iter()
                .filter_map(|(source, value)| {
                    let target = REPORT_RENAMES
                        .iter()
                        .find(|(from, _)| from == source)
                        .map(|(_, to)| *to)
                        .unwrap_or(*source);
                    report_field_section(target).map(|section| IngestTarget {
                        source: *source,
                        path: Path::new().key(target),
                        section,
                        value: value.to_string(),
                    })
                })
                // 报告中的布尔开关不接受聊天文本
                .filter(|t| !is_report_flag(t.path.to_string().as_str()))
                .collect(),
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::Victim => write!(f, "victim"),
            FormKind::Report => write!(f, "report"),
        }
    }
}

impl FromStr for FormKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "victim" => Ok(FormKind::Victim),
            "report" => Ok(FormKind::Report),
            other => Err(AppError::Other(format!("未知的表单类型: {}", other))),
        }
    }
}

fn is_report_flag(field: &str) -> bool {
    matches!(field, "machines_involved")
}

/// 一次聊天字段写入
#[derive(Debug, Clone, PartialEq)]
pub struct IngestTarget {
    pub source: &'static str,
    pub path: Path,
    pub section: SectionId,
    pub value: String,
}

/// 聊天数据合并结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// 实际写入的路径
    pub written: Vec<Path>,
    /// 由折叠变为展开的分区
    pub opened: Vec<SectionId>,
    /// 写入失败而跳过的路径
    pub skipped: Vec<Path>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.opened.is_empty()
    }
}

/// 广播给订阅者的快照
#[derive(Debug, Clone)]
pub struct FormSnapshot {
    pub version: u64,
    pub record: Node,
    pub sections: SectionVisibility,
}

/// 提交结果
#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: FormKind,
    pub payload: JsonValue,
    /// 软校验提示，不阻止提交
    pub warnings: Vec<String>,
}

/// 表单存储
pub struct FormStore {
    kind: FormKind,
    record: Node,
    sections: SectionVisibility,
    version: u64,
    prune_on_submit: bool,
    tx: watch::Sender<FormSnapshot>,
}

impl FormStore {
    /// 创建处于初始状态的表单
    pub fn new(kind: FormKind, prune_on_submit: bool) -> AppResult<Self> {
        let record = kind.initial_record()?;
        let sections = kind.initial_sections();
        let (tx, _rx) = watch::channel(FormSnapshot {
            version: 0,
            record: record.clone(),
            sections: sections.clone(),
        });
        Ok(Self {
            kind,
            record,
            sections,
            version: 0,
            prune_on_submit,
            tx,
        })
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn record(&self) -> &Node {
        &self.record
    }

    pub fn sections(&self) -> &SectionVisibility {
        &self.sections
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            version: self.version,
            record: self.record.clone(),
            sections: self.sections.clone(),
        }
    }

    /// 订阅快照变化
    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.tx.subscribe()
    }

    /// 读取路径上的值
    pub fn get(&self, path: &Path) -> Option<&Node> {
        get(&self.record, path)
    }

    /// 用户编辑：写入单个路径
    ///
    /// 不改变分区展开状态。
    pub fn update(&mut self, path: &Path, value: Node) -> AppResult<()> {
        self.record = update(&self.record, path, value)?;
        debug!("更新字段 {}", path);
        self.publish();
        Ok(())
    }

    /// 用户编辑：复合编辑（仅受害人表单）
    pub fn apply(&mut self, edit: &RecordEdit) -> AppResult<()> {
        if self.kind != FormKind::Victim {
            return Err(AppError::Other(format!(
                "{:?} 只适用于受害人表单",
                edit
            )));
        }
        self.record = edit.apply(&self.record)?;
        self.sections.force_open(edit.section());
        debug!("复合编辑 {:?}", edit);
        self.publish();
        Ok(())
    }

    /// 用户点击分区标题
    pub fn toggle_section(&mut self, id: SectionId) -> bool {
        let open = self.sections.toggle(id);
        self.publish();
        open
    }

    /// 合并聊天收集到的数据
    ///
    /// 每个非空字段独立写入对应路径并强制展开所在分区；
    /// 值未变化时跳过写入，但仍展开分区。
    /// 单个字段写入失败只记录日志，不影响其他字段。
    pub fn ingest(&mut self, data: &CollectedData) -> AppResult<IngestReport> {
        let mut report = IngestReport::default();
        let targets = self.kind.ingestion_targets(data);
        if targets.is_empty() {
            return Ok(report);
        }

        for target in &targets {
            let value = Node::text(target.value.clone());
            if get(&self.record, &target.path) != Some(&value) {
                match update(&self.record, &target.path, value) {
                    Ok(record) => {
                        self.record = record;
                        report.written.push(target.path.clone());
                    }
                    Err(e) => {
                        warn!("⚠️ 跳过聊天字段 {} → {}: {}", target.source, target.path, e);
                        report.skipped.push(target.path.clone());
                        continue;
                    }
                }
            }
            if self.sections.force_open(target.section) {
                report.opened.push(target.section);
            }
        }

        if !report.written.is_empty() || !report.opened.is_empty() {
            info!(
                "📝 聊天数据已合并: 写入 {} 个字段, 展开 {} 个分区",
                report.written.len(),
                report.opened.len()
            );
            self.publish();
        }
        Ok(report)
    }

    /// 提交
    ///
    /// 记录按表单结构序列化；结构不一致时原样提交并给出提示。
    pub fn submit(&self) -> AppResult<Submission> {
        let mut warnings = Vec::new();
        let payload = match self.kind {
            FormKind::Victim => match AccidentExplanationRecord::from_node(&self.record) {
                Ok(mut typed) => {
                    for field in typed.missing_required() {
                        warnings.push(format!("缺少必填字段: {}", field.path()));
                    }
                    if !typed.has_valid_email() {
                        warnings.push(format!(
                            "邮箱格式不正确: {}",
                            typed.personal_data.email.trim()
                        ));
                    }
                    if self.prune_on_submit {
                        typed.prune_disabled();
                    }
                    serde_json::to_value(&typed)?
                }
                Err(e) => {
                    warnings.push(format!("记录结构与表单不一致，按原样提交: {}", e));
                    self.record.to_json()
                }
            },
            FormKind::Report => match AccidentReportData::from_node(&self.record) {
                Ok(mut typed) => {
                    for field in typed.missing_required() {
                        warnings.push(format!("缺少必填字段: {}", field));
                    }
                    if self.prune_on_submit {
                        typed.prune_disabled();
                    }
                    serde_json::to_value(&typed)?
                }
                Err(e) => {
                    warnings.push(format!("记录结构与表单不一致，按原样提交: {}", e));
                    self.record.to_json()
                }
            },
        };

        for warning in &warnings {
            warn!("⚠️ {}", warning);
        }
        info!("💾 表单 {} 已提交 (版本 {})", self.kind, self.version);
        Ok(Submission {
            kind: self.kind,
            payload,
            warnings,
        })
    }

    /// 恢复初始记录和默认分区
    pub fn reset(&mut self) -> AppResult<()> {
        self.record = self.kind.initial_record()?;
        self.sections = self.kind.initial_sections();
        info!("↺ 表单 {} 已重置", self.kind);
        self.publish();
        Ok(())
    }

    fn publish(&mut self) {
        self.version += 1;
        self.tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collected() -> CollectedData {
        CollectedData {
            accident_date: Some("2024-05-01".into()),
            injury_type: Some("złamanie nadgarstka".into()),
            location: Some("".into()),
            witnesses: Some("Jan Nowak".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_store_has_default_section_open() {
        let store = FormStore::new(FormKind::Victim, false).unwrap();
        assert_eq!(store.sections().open_sections(), vec![SectionId::PersonalData]);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_victim_ingestion_writes_and_opens() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        let report = store.ingest(&collected()).unwrap();

        assert_eq!(report.written.len(), 2);
        assert!(report.opened.contains(&SectionId::AccidentDetails));
        assert!(report.opened.contains(&SectionId::MedicalHelp));
        assert_eq!(
            store.get(&RecordField::DiagnosedInjury.path()),
            Some(&Node::text("złamanie nadgarstka"))
        );
        // 空白字段不写入
        assert_eq!(store.get(&RecordField::AccidentLocation.path()), Some(&Node::text("")));
    }

    #[test]
    fn test_ingesting_same_data_twice_only_writes_once() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        store.ingest(&collected()).unwrap();
        let version = store.version();

        let again = store.ingest(&collected()).unwrap();
        assert!(again.is_empty());
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_report_ingestion_uses_flat_fields() {
        let mut store = FormStore::new(FormKind::Report, false).unwrap();
        let report = store.ingest(&collected()).unwrap();

        assert_eq!(store.get(&Path::new().key("witnesses")), Some(&Node::text("Jan Nowak")));
        assert_eq!(
            store.get(&Path::new().key("diagnosed_injury")),
            Some(&Node::text("złamanie nadgarstka"))
        );
        assert!(report.opened.contains(&SectionId::Medical));
        assert!(report.opened.contains(&SectionId::WorkCircumstances));
    }

    #[test]
    fn test_report_flag_is_not_overwritten_by_chat_text() {
        let mut store = FormStore::new(FormKind::Report, false).unwrap();
        let data = CollectedData {
            machines_involved: Some("tak, wózek widłowy".into()),
            ..Default::default()
        };
        store.ingest(&data).unwrap();
        assert_eq!(
            store.get(&Path::new().key("machines_involved")),
            Some(&Node::Bool(false))
        );
    }

    #[test]
    fn test_user_update_does_not_open_sections() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        store
            .update(&RecordField::AccidentCause.path(), Node::text("poślizg"))
            .unwrap();
        assert!(!store.sections().is_open(SectionId::AccidentDetails));
    }

    #[tokio::test]
    async fn test_subscribers_see_each_change() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        let mut rx = store.subscribe();

        store.toggle_section(SectionId::MedicalHelp);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().sections.is_open(SectionId::MedicalHelp));

        store
            .update(&RecordField::Pesel.path(), Node::text("90010112345"))
            .unwrap();
        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.version, 2);
        assert_eq!(
            get(&snapshot.record, &RecordField::Pesel.path()),
            Some(&Node::text("90010112345"))
        );
    }

    #[test]
    fn test_submit_keeps_stale_data_unless_pruning() {
        let path: Path = "machineryToolsInfo.machineOrToolName".parse().unwrap();

        let mut keep = FormStore::new(FormKind::Victim, false).unwrap();
        keep.update(&path, Node::text("Piła")).unwrap();
        let submitted = keep.submit().unwrap();
        assert_eq!(submitted.payload["machineryToolsInfo"]["machineOrToolName"], json!("Piła"));
        assert!(!submitted.warnings.is_empty());

        let mut prune = FormStore::new(FormKind::Victim, true).unwrap();
        prune.update(&path, Node::text("Piła")).unwrap();
        let submitted = prune.submit().unwrap();
        assert_eq!(submitted.payload["machineryToolsInfo"], json!({"involved": false}));
    }

    #[test]
    fn test_submit_survives_mismatched_shape() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        store
            .update(&Path::new().key("bhpCompliance"), Node::text("tak"))
            .unwrap();
        let submitted = store.submit().unwrap();
        assert_eq!(submitted.payload["bhpCompliance"], json!("tak"));
        assert!(submitted.warnings.iter().any(|w| w.contains("结构")));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        store.ingest(&collected()).unwrap();
        store.apply(&RecordEdit::MedicalHelp(false)).unwrap();
        store.reset().unwrap();

        assert_eq!(store.record(), &FormKind::Victim.initial_record().unwrap());
        assert_eq!(store.sections(), &FormKind::Victim.initial_sections());
    }

    #[test]
    fn test_bad_chat_field_is_skipped_and_rest_is_committed() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        let rx = store.subscribe();
        store
            .update(&Path::new().key("medicalHelp"), Node::text("tak"))
            .unwrap();
        let version = store.version();

        let data = CollectedData {
            accident_date: Some("2024-05-01".into()),
            injury_type: Some("stłuczenie".into()),
            ..Default::default()
        };
        let report = store.ingest(&data).unwrap();

        assert_eq!(report.written, vec![RecordField::AccidentDate.path()]);
        assert_eq!(report.skipped, vec![RecordField::DiagnosedInjury.path()]);
        assert_eq!(report.opened, vec![SectionId::AccidentDetails]);
        assert!(!store.sections().is_open(SectionId::MedicalHelp));
        assert_eq!(
            store.get(&RecordField::AccidentDate.path()),
            Some(&Node::text("2024-05-01"))
        );
        assert_eq!(store.version(), version + 1);

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.version, store.version());
        assert!(snapshot.sections.is_open(SectionId::AccidentDetails));
    }

    #[test]
    fn test_composite_edit_opens_its_section() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        store.apply(&RecordEdit::AddAuthorityAction).unwrap();
        assert!(store.sections().is_open(SectionId::StateAuthority));
        assert!(!store.sections().is_open(SectionId::MedicalHelp));
    }

    #[test]
    fn test_submit_warns_on_malformed_email() {
        let mut store = FormStore::new(FormKind::Victim, false).unwrap();
        store
            .update(&RecordField::Email.path(), Node::text("jan.kowalski"))
            .unwrap();
        let submitted = store.submit().unwrap();
        assert!(submitted.warnings.iter().any(|w| w.contains("jan.kowalski")));
    }

    #[test]
    fn test_section_for_path() {
        assert_eq!(
            FormKind::Victim.section_for_path(&RecordField::DiagnosedInjury.path()),
            Some(SectionId::MedicalHelp)
        );
        assert_eq!(
            FormKind::Report.section_for_path(&Path::new().key("witnesses")),
            Some(SectionId::WorkCircumstances)
        );
        assert_eq!(FormKind::Victim.section_for_path(&Path::new().key("nic")), None);
    }

    #[test]
    fn test_composite_edit_rejected_on_report() {
        let mut store = FormStore::new(FormKind::Report, false).unwrap();
        assert!(store.apply(&RecordEdit::MedicalHelp(true)).is_err());
    }
}
