//! 聊天会话服务 - 业务能力层
//!
//! 维护消息列表并转发用户输入；发送失败只记录日志。
//! 绑定会话存储时，每次请求都从存储读取会话 id，服务端换发的 id 写回存储。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::ChatApi;
use crate::error::AppResult;
use crate::infrastructure::SessionStore;
use crate::models::{CollectedData, Message, Sender};

/// 聊天会话
pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    session_id: String,
    store: Option<Arc<SessionStore>>,
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn new(api: Arc<dyn ChatApi>, session_id: impl Into<String>) -> Self {
        Self {
            api,
            session_id: session_id.into(),
            store: None,
            messages: Vec::new(),
        }
    }

    /// 以会话存储中的 id 创建
    pub fn with_store(api: Arc<dyn ChatApi>, store: Arc<SessionStore>) -> AppResult<Self> {
        let session_id = store.session_id()?;
        let mut session = Self::new(api, session_id);
        session.store = Some(store);
        Ok(session)
    }

    /// 带开场消息创建
    pub fn with_greeting(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::new(Sender::Agent, text));
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 追加系统提示（不发送到服务端）
    pub fn push_system(&mut self, text: impl Into<String>) {
        self.messages.push(Message::new(Sender::System, text));
    }

    /// 发送用户输入
    ///
    /// # 参数
    /// - `input`: 用户输入；去掉首尾空白后为空则忽略
    ///
    /// # 返回
    /// 成功时返回本轮收集到的数据；忽略或失败时返回 `None`
    pub async fn send(&mut self, input: &str) -> Option<CollectedData> {
        if input.trim().is_empty() {
            debug!("忽略空白输入");
            return None;
        }
        self.messages.push(Message::new(Sender::User, input));
        self.refresh_session_id();

        match self.api.send(input, &self.session_id).await {
            Ok(response) => {
                self.messages
                    .push(Message::new(Sender::Agent, response.response));
                if !response.session_id.is_empty() && response.session_id != self.session_id {
                    debug!("服务端返回新的会话 id: {}", response.session_id);
                    self.session_id = response.session_id;
                    self.persist_session_id();
                }
                Some(response.collected_data)
            }
            Err(e) => {
                warn!("⚠️ 聊天消息发送失败: {}", e);
                None
            }
        }
    }

    fn refresh_session_id(&mut self) {
        let Some(store) = &self.store else { return };
        match store.session_id() {
            Ok(id) => self.session_id = id,
            Err(e) => warn!("⚠️ 读取会话 id 失败，沿用 {}: {}", self.session_id, e),
        }
    }

    fn persist_session_id(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.set_session(&self.session_id) {
                warn!("⚠️ 保存会话 id 失败: {}", e);
            }
        }
    }

    /// 最后一条助手消息
    pub fn last_agent_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Agent)
    }
}
