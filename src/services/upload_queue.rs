//! 上传队列服务 - 业务能力层
//!
//! 只负责"维护待上传文件列表"，不发网络请求

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppResult, UploadError};
use crate::models::{CandidateFile, FileStatus, UploadFile};

/// 一次添加操作的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// 新入队文件的 id
    pub accepted: Vec<String>,
    /// 非 PDF 被忽略的数量
    pub rejected_non_pdf: usize,
    /// 因上限被丢弃的数量
    pub dropped_over_cap: usize,
    /// 添加后是否已达到上限
    pub max_reached: bool,
}

/// 上传队列
///
/// 职责：
/// - 只接受 PDF
/// - 未完成文件数不超过 `max_files`
/// - 校验每个文件的状态迁移
#[derive(Debug)]
pub struct UploadQueue {
    files: Vec<UploadFile>,
    max_files: usize,
    max_reached: bool,
}

impl UploadQueue {
    pub fn new(max_files: usize) -> Self {
        Self {
            files: Vec::new(),
            max_files,
            max_reached: false,
        }
    }

    pub fn files(&self) -> &[UploadFile] {
        &self.files
    }

    pub fn get(&self, id: &str) -> Option<&UploadFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// 是否显示"已达上限"提示
    pub fn max_reached(&self) -> bool {
        self.max_reached
    }

    /// 未完成（非 complete）文件数
    pub fn active_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status != FileStatus::Complete)
            .count()
    }

    /// 添加文件
    ///
    /// # 参数
    /// - `candidates`: 用户选择的文件，按顺序处理
    ///
    /// # 返回
    /// 返回入队、忽略、丢弃的统计
    pub fn add_files(&mut self, candidates: impl IntoIterator<Item = CandidateFile>) -> AddOutcome {
        let mut outcome = AddOutcome::default();
        let mut count = self.active_count();

        for candidate in candidates {
            if !candidate.is_pdf() {
                debug!("忽略非 PDF 文件: {} ({})", candidate.name, candidate.mime);
                outcome.rejected_non_pdf += 1;
                continue;
            }
            if count >= self.max_files {
                outcome.dropped_over_cap += 1;
                continue;
            }
            let file = UploadFile {
                id: Uuid::new_v4().to_string(),
                name: candidate.name,
                path: candidate.path,
                size: candidate.size,
                status: FileStatus::Pending,
                progress: 0,
            };
            outcome.accepted.push(file.id.clone());
            self.files.push(file);
            count += 1;
        }

        self.max_reached = count >= self.max_files;
        outcome.max_reached = self.max_reached;

        if outcome.dropped_over_cap > 0 {
            warn!(
                "⚠️ 已达到 {} 个文件上限，丢弃 {} 个文件",
                self.max_files, outcome.dropped_over_cap
            );
        }
        if !outcome.accepted.is_empty() {
            info!("✓ 已加入 {} 个文件", outcome.accepted.len());
        }
        outcome
    }

    /// 移除文件
    ///
    /// 移除后 pending + uploading 少于上限时清除上限提示。
    pub fn remove(&mut self, id: &str) -> AppResult<UploadFile> {
        let index = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| UploadError::UnknownFile { id: id.to_string() })?;
        let removed = self.files.remove(index);

        let in_flight = self
            .files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Pending | FileStatus::Uploading))
            .count();
        if in_flight < self.max_files {
            self.max_reached = false;
        }
        debug!("已移除文件: {}", removed.name);
        Ok(removed)
    }

    /// 需要上传的文件（pending 或 error）
    pub fn pending_for_upload(&self) -> Vec<UploadFile> {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Pending | FileStatus::Error))
            .cloned()
            .collect()
    }

    /// 单个文件的状态迁移
    pub fn transition(&mut self, id: &str, next: FileStatus) -> AppResult<()> {
        let file = self
            .files
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| UploadError::UnknownFile { id: id.to_string() })?;
        if !file.status.can_transition_to(next) {
            return Err(UploadError::InvalidTransition {
                id: id.to_string(),
                from: file.status.to_string(),
                to: next.to_string(),
            }
            .into());
        }
        file.status = next;
        file.progress = match next {
            FileStatus::Complete => 100,
            _ => 0,
        };
        Ok(())
    }

    /// 开始一批上传：把给定文件标记为 uploading
    pub fn begin_batch(&mut self, ids: &[String]) -> AppResult<()> {
        if ids.is_empty() {
            return Err(UploadError::NothingToUpload.into());
        }
        for id in ids {
            self.transition(id, FileStatus::Uploading)?;
        }
        Ok(())
    }

    /// 结束一批上传：所有 uploading 文件统一变为 complete 或 error
    ///
    /// # 返回
    /// 返回受影响的文件数
    pub fn finish_batch(&mut self, success: bool) -> usize {
        let next = if success {
            FileStatus::Complete
        } else {
            FileStatus::Error
        };
        let mut affected = 0;
        for file in self
            .files
            .iter_mut()
            .filter(|f| f.status == FileStatus::Uploading)
        {
            file.status = next;
            file.progress = if success { 100 } else { 0 };
            affected += 1;
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> CandidateFile {
        CandidateFile::new(format!("/tmp/{}.pdf", name), 10)
    }

    #[test]
    fn test_cap_counts_existing_files() {
        let mut queue = UploadQueue::new(5);
        queue.add_files((0..3).map(|i| pdf(&format!("a{}", i))));

        let outcome = queue.add_files((0..6).map(|i| pdf(&format!("b{}", i))));
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.dropped_over_cap, 4);
        assert!(outcome.max_reached);
        assert_eq!(queue.files().len(), 5);
    }

    #[test]
    fn test_non_pdf_is_ignored() {
        let mut queue = UploadQueue::new(5);
        let outcome = queue.add_files(vec![
            CandidateFile::new("/tmp/photo.png", 1),
            pdf("ok"),
        ]);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejected_non_pdf, 1);
        assert!(!outcome.max_reached);
    }

    #[test]
    fn test_completed_files_do_not_count_toward_cap() {
        let mut queue = UploadQueue::new(2);
        let first = queue.add_files(vec![pdf("a"), pdf("b")]);
        assert!(first.max_reached);

        queue.begin_batch(&first.accepted).unwrap();
        queue.finish_batch(true);

        let second = queue.add_files(vec![pdf("c")]);
        assert_eq!(second.accepted.len(), 1);
        assert!(!second.max_reached);
    }

    #[test]
    fn test_remove_clears_max_reached() {
        let mut queue = UploadQueue::new(2);
        let outcome = queue.add_files(vec![pdf("a"), pdf("b")]);
        assert!(queue.max_reached());

        queue.remove(&outcome.accepted[0]).unwrap();
        assert!(!queue.max_reached());
        assert!(queue.remove("missing").is_err());
    }

    #[test]
    fn test_batch_lifecycle_and_retry_after_error() {
        let mut queue = UploadQueue::new(5);
        let outcome = queue.add_files(vec![pdf("a"), pdf("b")]);

        queue.begin_batch(&outcome.accepted).unwrap();
        assert_eq!(queue.finish_batch(false), 2);
        assert_eq!(queue.pending_for_upload().len(), 2);
        assert!(queue
            .files()
            .iter()
            .all(|f| f.status == FileStatus::Error && f.progress == 0));

        queue.begin_batch(&outcome.accepted).unwrap();
        queue.finish_batch(true);
        assert!(queue.pending_for_upload().is_empty());
        assert!(queue.files().iter().all(|f| f.progress == 100));
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut queue = UploadQueue::new(5);
        let id = queue.add_files(vec![pdf("a")]).accepted.remove(0);
        assert!(queue.transition(&id, FileStatus::Complete).is_err());
        assert!(queue.begin_batch(&[]).is_err());
    }
}
