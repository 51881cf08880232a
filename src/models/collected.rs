//! 聊天接口的数据结构

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 对话中已收集到的事故信息
///
/// 所有字段都可能为 `null`；接口返回的未知字段直接忽略。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectedData {
    pub accident_date: Option<String>,
    pub accident_time: Option<String>,
    pub location: Option<String>,
    pub work_start_time: Option<String>,
    pub work_end_time: Option<String>,
    pub injury_type: Option<String>,
    pub circumstances: Option<String>,
    pub cause: Option<String>,
    pub place_description: Option<String>,
    pub medical_help: Option<String>,
    pub investigation: Option<String>,
    pub machines_involved: Option<String>,
    pub machine_condition: Option<String>,
    pub proper_use: Option<String>,
    pub machine_description: Option<String>,
    pub machine_certification: Option<String>,
    pub machine_registry: Option<String>,
    pub witnesses: Option<String>,
    pub activity_before_accident: Option<String>,
    pub event_sequence: Option<String>,
    pub direct_cause: Option<String>,
    pub indirect_causes: Option<String>,
}

impl CollectedData {
    /// 非空字段（字段名, 值），按声明顺序
    pub fn filled(&self) -> Vec<(&'static str, &str)> {
        let fields: [(&'static str, &Option<String>); 22] = [
            ("accident_date", &self.accident_date),
            ("accident_time", &self.accident_time),
            ("location", &self.location),
            ("work_start_time", &self.work_start_time),
            ("work_end_time", &self.work_end_time),
            ("injury_type", &self.injury_type),
            ("circumstances", &self.circumstances),
            ("cause", &self.cause),
            ("place_description", &self.place_description),
            ("medical_help", &self.medical_help),
            ("investigation", &self.investigation),
            ("machines_involved", &self.machines_involved),
            ("machine_condition", &self.machine_condition),
            ("proper_use", &self.proper_use),
            ("machine_description", &self.machine_description),
            ("machine_certification", &self.machine_certification),
            ("machine_registry", &self.machine_registry),
            ("witnesses", &self.witnesses),
            ("activity_before_accident", &self.activity_before_accident),
            ("event_sequence", &self.event_sequence),
            ("direct_cause", &self.direct_cause),
            ("indirect_causes", &self.indirect_causes),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (name, v))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filled().is_empty()
    }
}

/// 聊天请求体
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub input: String,
    pub session_id: String,
}

/// 聊天响应体
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub collected_data: CollectedData,
}

/// 消息发送方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
}

/// 对话中的一条消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub sent_at: DateTime<Local>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            sent_at: Local::now(),
        }
    }
}
