//! 上传队列中的文件

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppResult, UploadError};

pub const PDF_MIME: &str = "application/pdf";

/// 单个文件的上传状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Uploading,
    Complete,
    Error,
}

impl FileStatus {
    /// 允许的状态迁移
    ///
    /// `pending|error → uploading → complete|error`
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (FileStatus::Pending, FileStatus::Uploading)
                | (FileStatus::Error, FileStatus::Uploading)
                | (FileStatus::Uploading, FileStatus::Complete)
                | (FileStatus::Uploading, FileStatus::Error)
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FileStatus::Pending => "pending",
            FileStatus::Uploading => "uploading",
            FileStatus::Complete => "complete",
            FileStatus::Error => "error",
        };
        write!(f, "{}", text)
    }
}

/// 用户选中、尚未入队的文件
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub mime: String,
}

impl CandidateFile {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_from_extension(&path).to_string();
        Self {
            name,
            path,
            size,
            mime,
        }
    }

    /// 从磁盘读取文件大小
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| UploadError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(path, meta.len()))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime == PDF_MIME
    }
}

/// 队列中的文件
#[derive(Debug, Clone, Serialize)]
pub struct UploadFile {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size: u64,
    pub status: FileStatus,
    pub progress: u8,
}

/// 按扩展名推断 MIME 类型
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
