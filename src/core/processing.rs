//! 上传完成后的模拟处理流程。
//!
//! 各阶段只是本地计时，不对接任何后端任务。全部阶段结束后内容进入审核队列。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};
use super::types::{deserialize_millis, serialize_millis, UploadEvent, UploadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Transcoding,
    ThumbnailGeneration,
    ContentAnalysis,
    ModerationCheck,
}

impl ProcessingStage {
    /// 固定执行顺序
    pub const ALL: [ProcessingStage; 4] = [
        ProcessingStage::Transcoding,
        ProcessingStage::ThumbnailGeneration,
        ProcessingStage::ContentAnalysis,
        ProcessingStage::ModerationCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStage::Transcoding => "transcoding",
            ProcessingStage::ThumbnailGeneration => "thumbnail_generation",
            ProcessingStage::ContentAnalysis => "content_analysis",
            ProcessingStage::ModerationCheck => "moderation_check",
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 各阶段的模拟耗时（毫秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    #[serde(serialize_with = "serialize_millis", deserialize_with = "deserialize_millis")]
    pub transcoding: Duration,
    #[serde(serialize_with = "serialize_millis", deserialize_with = "deserialize_millis")]
    pub thumbnail_generation: Duration,
    #[serde(serialize_with = "serialize_millis", deserialize_with = "deserialize_millis")]
    pub content_analysis: Duration,
    #[serde(serialize_with = "serialize_millis", deserialize_with = "deserialize_millis")]
    pub moderation_check: Duration,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            transcoding: Duration::from_millis(5000),
            thumbnail_generation: Duration::from_millis(2000),
            content_analysis: Duration::from_millis(3000),
            moderation_check: Duration::from_millis(1000),
        }
    }
}

impl ProcessingConfig {
    /// 所有阶段都不等待，测试用
    pub fn instant() -> Self {
        Self {
            transcoding: Duration::ZERO,
            thumbnail_generation: Duration::ZERO,
            content_analysis: Duration::ZERO,
            moderation_check: Duration::ZERO,
        }
    }

    pub fn duration_for(&self, stage: ProcessingStage) -> Duration {
        match stage {
            ProcessingStage::Transcoding => self.transcoding,
            ProcessingStage::ThumbnailGeneration => self.thumbnail_generation,
            ProcessingStage::ContentAnalysis => self.content_analysis,
            ProcessingStage::ModerationCheck => self.moderation_check,
        }
    }

    pub fn total(&self) -> Duration {
        ProcessingStage::ALL.iter().map(|s| self.duration_for(*s)).sum()
    }
}

/// 待审核的内容 ID
#[derive(Clone, Default)]
pub struct ModerationQueue {
    inner: Arc<RwLock<VecDeque<String>>>,
}

impl ModerationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, content_id: String) {
        self.inner.write().await.push_back(content_id);
    }

    pub async fn snapshot(&self) -> Vec<String> {
        self.inner.read().await.iter().cloned().collect()
    }
}

#[derive(Clone)]
pub struct ProcessingPipeline {
    pub config: ProcessingConfig,
    pub moderation: ModerationQueue,
    pub event_tx: broadcast::Sender<UploadEvent>,
}

impl ProcessingPipeline {
    pub async fn run(&self, upload_id: UploadId, content_id: String) {
        info!(%upload_id, %content_id, "Processing started");

        for stage in ProcessingStage::ALL {
            debug!(%upload_id, %stage, "Entering processing stage");
            let _ = self.event_tx.send(UploadEvent::ProcessingStage {
                upload_id,
                content_id: content_id.clone(),
                stage,
            });

            let delay = self.config.duration_for(stage);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        self.moderation.push(content_id.clone()).await;
        info!(%upload_id, %content_id, "Processing finished, queued for moderation");
        let _ = self.event_tx.send(UploadEvent::ProcessingFinished {
            upload_id,
            content_id,
        });
    }
}
