//! 受害人表单的复合编辑
//!
//! 复选框和下拉框会整体替换子对象（`false` ↔ 对象/列表）。
//! 每个编辑先规划为一次 `(路径, 新值)` 写入，再交给 `update` 执行。

use crate::error::{AppError, AppResult};
use crate::state::{get, update, Node, Path, SectionId};

/// 表单上的复合编辑操作
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEdit {
    /// 事故由机器/工具造成
    MachineCause(bool),
    /// 其他机器/工具参与
    OtherMachinery(bool),
    /// 防护装备：`None` 表示未使用；文本按逗号拆分
    ProtectiveEquipment(Option<String>),
    /// 需要安全保障措施
    SafetySupport(bool),
    /// 受害人是否接受了医疗救助
    MedicalHelp(bool),
    /// 国家机关是否介入
    AuthoritiesInvolved(bool),
    /// 新增一条机关处理记录
    AddAuthorityAction,
    /// 删除一条机关处理记录；删光后恢复为 `false`
    RemoveAuthorityAction(usize),
}

impl RecordEdit {
    /// 受影响的分区
    pub fn section(&self) -> SectionId {
        match self {
            RecordEdit::MachineCause(_) => SectionId::MachineCause,
            RecordEdit::OtherMachinery(_) => SectionId::OtherMachinery,
            RecordEdit::ProtectiveEquipment(_) | RecordEdit::SafetySupport(_) => {
                SectionId::SafetyCompliance
            }
            RecordEdit::MedicalHelp(_) => SectionId::MedicalHelp,
            RecordEdit::AuthoritiesInvolved(_)
            | RecordEdit::AddAuthorityAction
            | RecordEdit::RemoveAuthorityAction(_) => SectionId::StateAuthority,
        }
    }

    /// 规划为单次路径写入
    pub fn plan(&self, record: &Node) -> AppResult<(Path, Node)> {
        let planned = match self {
            RecordEdit::MachineCause(on) => (
                Path::new().key("causedByMachineOrTool"),
                if *on {
                    Node::map([("machineInfo", empty_machine_info())])
                } else {
                    Node::Bool(false)
                },
            ),
            RecordEdit::OtherMachinery(on) => (
                Path::new().key("machineryToolsInfo").key("involved"),
                Node::Bool(*on),
            ),
            RecordEdit::ProtectiveEquipment(items) => (
                Path::new().key("usedProtectiveEquipment"),
                match items {
                    Some(text) => Node::seq(split_items(text).into_iter().map(Node::Text)),
                    None => Node::Bool(false),
                },
            ),
            RecordEdit::SafetySupport(on) => (
                Path::new().key("usedSafetySupport"),
                if *on {
                    Node::map([("requiredMoreThanOnePerson", Node::Bool(false))])
                } else {
                    Node::Bool(false)
                },
            ),
            RecordEdit::MedicalHelp(on) => (
                Path::new().key("medicalHelp"),
                if *on {
                    Node::map([("sickLeaveOnAccidentDay", Node::Bool(false))])
                } else {
                    Node::Bool(false)
                },
            ),
            RecordEdit::AuthoritiesInvolved(on) => (
                Path::new().key("stateAuthorityActions"),
                if *on { Node::empty_seq() } else { Node::Bool(false) },
            ),
            RecordEdit::AddAuthorityAction => {
                let actions = authority_actions(record);
                let mut items: Vec<Node> = actions.to_vec();
                items.push(blank_authority_action());
                (Path::new().key("stateAuthorityActions"), Node::seq(items))
            }
            RecordEdit::RemoveAuthorityAction(index) => {
                let actions = authority_actions(record);
                if *index >= actions.len() {
                    return Err(AppError::invalid_path(
                        format!("stateAuthorityActions.{}", index),
                        format!("只有 {} 条处理记录", actions.len()),
                    ));
                }
                let remaining: Vec<Node> = actions
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i != index)
                    .map(|(_, n)| n.clone())
                    .collect();
                let value = if remaining.is_empty() {
                    Node::Bool(false)
                } else {
                    Node::seq(remaining)
                };
                (Path::new().key("stateAuthorityActions"), value)
            }
        };
        Ok(planned)
    }

    /// 规划并执行
    pub fn apply(&self, record: &Node) -> AppResult<Node> {
        let (path, value) = self.plan(record)?;
        update(record, &path, value)
    }
}

// ========== 辅助函数 ==========

fn empty_machine_info() -> Node {
    Node::map([
        ("name", Node::text("")),
        ("type", Node::text("")),
        ("productionDate", Node::text("")),
    ])
}

fn blank_authority_action() -> Node {
    Node::map([
        ("name", Node::text("")),
        ("address", Node::text("")),
        ("status", Node::text("pending")),
    ])
}

fn authority_actions(record: &Node) -> &[Node] {
    get(record, &Path::new().key("stateAuthorityActions"))
        .and_then(Node::as_seq)
        .unwrap_or(&[])
}

/// 逗号分隔文本拆成列表；空文本得到一个空项（"是"但尚未填写）
fn split_items(text: &str) -> Vec<String> {
    let items: Vec<String> = text
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        vec![String::new()]
    } else {
        items
    }
}
