use std::collections::HashMap;
use chrono::Utc;
use tracing::warn;
use super::types::{Thumbnail, UploadId, UploadItem, UploadStatus, VideoMetadata};

/// 上传队列，保持到达顺序
#[derive(Default)]
pub struct TaskStore {
    items: HashMap<UploadId, UploadItem>,
    order: Vec<UploadId>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: UploadItem) {
        let id = item.id;
        self.items.insert(id, item);
        self.order.push(id);
    }

    pub fn get(&self, id: &UploadId) -> Option<&UploadItem> {
        self.items.get(id)
    }

    /// 按到达顺序返回快照
    pub fn snapshot(&self) -> Vec<UploadItem> {
        self.order
            .iter()
            .filter_map(|id| self.items.get(id))
            .cloned()
            .collect()
    }

    pub fn count(&self, status: UploadStatus) -> usize {
        self.items.values().filter(|item| item.status == status).count()
    }

    /// 状态变更，非法流转返回 None
    pub fn update_status(&mut self, id: &UploadId, status: UploadStatus) -> Option<UploadStatus> {
        let item = self.items.get_mut(id)?;
        let from = item.status;

        if !from.can_transition_to(status) {
            warn!(upload_id = %id, %from, to = %status, "Ignoring invalid status transition");
            return None;
        }

        item.status = status;
        match status {
            UploadStatus::Uploading => {
                item.started_at = Some(Utc::now());
            }
            UploadStatus::Completed | UploadStatus::Failed => {
                item.completed_at = Some(Utc::now());
            }
            UploadStatus::Queued => {}
        }

        Some(from)
    }

    /// 进度只增不减
    pub fn set_progress(&mut self, id: &UploadId, progress: f64) {
        if let Some(item) = self.items.get_mut(id) {
            if item.status == UploadStatus::Uploading && progress > item.progress {
                item.progress = progress.min(100.0);
            }
        }
    }

    pub fn set_media(&mut self, id: &UploadId, metadata: VideoMetadata, thumbnails: Vec<Thumbnail>) {
        if let Some(item) = self.items.get_mut(id) {
            item.metadata = Some(metadata);
            if item.thumbnails.is_empty() {
                item.thumbnails = thumbnails;
            }
        }
    }

    pub fn set_file_url(&mut self, id: &UploadId, file_url: String) {
        if let Some(item) = self.items.get_mut(id) {
            item.file_url = Some(file_url);
        }
    }

    pub fn mark_completed(&mut self, id: &UploadId, content_id: String) -> Option<UploadStatus> {
        let from = self.update_status(id, UploadStatus::Completed)?;
        if let Some(item) = self.items.get_mut(id) {
            item.content_id = Some(content_id);
        }
        Some(from)
    }

    pub fn mark_failed(&mut self, id: &UploadId, reason: String) -> Option<UploadStatus> {
        let from = self.update_status(id, UploadStatus::Failed)?;
        if let Some(item) = self.items.get_mut(id) {
            item.error = Some(reason);
        }
        Some(from)
    }

    pub fn remove(&mut self, id: &UploadId) -> Option<UploadItem> {
        let item = self.items.remove(id)?;
        self.order.retain(|x| x != id);
        Some(item)
    }

    /// 清除所有 <Failed/Completed> 状态的任务
    pub fn remove_terminal(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|_, item| !item.status.is_terminal());
        let items = &self.items;
        self.order.retain(|id| items.contains_key(id));
        before - self.items.len()
    }
}
