//! 本地会话存储 - 基础设施层
//!
//! 只保存一个键 `sessionId`，用于在多次运行之间延续同一段聊天。
//! 存储后端可替换：文件（JSON 对象）或内存。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult, SessionError};

/// 会话键名
pub const SESSION_KEY: &str = "sessionId";

/// 简单的字符串键值存储
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// 内存存储（测试和一次性运行）
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Other("内存存储锁已损坏".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// 文件存储：整个文件是一个 JSON 对象
///
/// 文件不存在视为空存储；每次写入都整体重写。
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn read_all(&self) -> AppResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.read_error(e))?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content).map_err(|e| self.read_error(e))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }
        let content = serde_json::to_string_pretty(entries).map_err(|e| self.write_error(e))?;
        std::fs::write(&self.path, content).map_err(|e| self.write_error(e))?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> AppResult<()> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| AppError::Other("文件存储锁已损坏".to_string()))?;
        let mut entries = self.read_all()?;
        f(&mut entries);
        self.write_all(&entries)
    }

    fn read_error(&self, e: impl std::error::Error + Send + Sync + 'static) -> AppError {
        SessionError::ReadFailed {
            path: self.path.display().to_string(),
            source: Box::new(e),
        }
        .into()
    }

    fn write_error(&self, e: impl std::error::Error + Send + Sync + 'static) -> AppError {
        SessionError::WriteFailed {
            path: self.path.display().to_string(),
            source: Box::new(e),
        }
        .into()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

/// 会话标识管理
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// 文件后端
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileStore::new(path))
    }

    /// 内存后端
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// 是否已有会话
    pub fn has_session(&self) -> AppResult<bool> {
        Ok(self
            .backend
            .get(SESSION_KEY)?
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false))
    }

    /// 生成新的会话标识并保存（覆盖旧值）
    pub fn init_session(&self) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        self.backend.set(SESSION_KEY, &id)?;
        info!("✓ 已创建新会话: {}", id);
        Ok(id)
    }

    /// 读取会话标识，不存在时创建
    pub fn session_id(&self) -> AppResult<String> {
        match self.backend.get(SESSION_KEY)? {
            Some(id) if !id.trim().is_empty() => {
                debug!("沿用会话: {}", id);
                Ok(id)
            }
            _ => self.init_session(),
        }
    }

    /// 保存服务端指定的会话标识
    pub fn set_session(&self, id: &str) -> AppResult<()> {
        self.backend.set(SESSION_KEY, id)?;
        debug!("会话已更新: {}", id);
        Ok(())
    }

    /// 丢弃当前会话
    pub fn clear(&self) -> AppResult<()> {
        self.backend.remove(SESSION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_created_once() {
        let store = SessionStore::in_memory();
        assert!(!store.has_session().unwrap());

        let first = store.session_id().unwrap();
        assert!(store.has_session().unwrap());
        assert_eq!(store.session_id().unwrap(), first);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_init_session_replaces_existing() {
        let store = SessionStore::in_memory();
        let first = store.session_id().unwrap();
        let second = store.init_session().unwrap();
        assert_ne!(first, second);
        assert_eq!(store.session_id().unwrap(), second);
    }

    #[test]
    fn test_set_session_overrides_stored_id() {
        let store = SessionStore::in_memory();
        store.session_id().unwrap();
        store.set_session("srv-7").unwrap();
        assert_eq!(store.session_id().unwrap(), "srv-7");
    }

    #[test]
    fn test_clear_removes_session() {
        let store = SessionStore::in_memory();
        store.session_id().unwrap();
        store.clear().unwrap();
        assert!(!store.has_session().unwrap());
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let store = FileStore::new("/nonexistent/dir/session.json");
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }
}
