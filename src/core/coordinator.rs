use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch, Mutex, OwnedSemaphorePermit, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use crate::media::ThumbnailExtractor;
use crate::uploaders::ChunkedUploader;
use super::errors::{Result, UploadError};
use super::processing::{ModerationQueue, ProcessingConfig, ProcessingPipeline};
use super::store::TaskStore;
use super::traits::{ContentRecord, MediaProbe, ProgressCallback, UploadApi};
use super::types::{
    ChunkProgress,
    ContentDetails,
    SourceFile,
    UploadConfig,
    UploadEvent,
    UploadId,
    UploadItem,
    UploadStatus,
    VideoMetadata,
};
use super::validation::validate_file;
use super::worker::WorkerPool;

/// 上传成功后的结果
struct Completion {
    file_url: String,
    content_id: String,
}

pub(crate) struct Shared {
    pub(crate) config: UploadConfig,
    pub(crate) shutdown: CancellationToken,
    store: RwLock<TaskStore>,
    event_tx: broadcast::Sender<UploadEvent>,
    /// 未结束的任务数（含处理流程）
    pending: watch::Sender<usize>,
    api: Arc<dyn UploadApi>,
    uploader: ChunkedUploader,
    extractor: ThumbnailExtractor,
    pipeline: ProcessingPipeline,
}

impl Shared {
    fn begin(&self) {
        self.pending.send_modify(|pending| *pending += 1);
    }

    fn finish(&self) {
        self.pending.send_modify(|pending| *pending = pending.saturating_sub(1));
    }

    /// 排队 -> 上传中
    pub(crate) async fn start(&self, upload_id: UploadId) -> bool {
        let mut store = self.store.write().await;
        match store.update_status(&upload_id, UploadStatus::Uploading) {
            Some(from) => {
                info!(%upload_id, "Upload started");
                let _ = self.event_tx.send(UploadEvent::StatusChanged {
                    upload_id,
                    from,
                    to: UploadStatus::Uploading,
                });
                true
            }
            None => false,
        }
    }

    /// 丢弃尚未开始的任务
    pub(crate) async fn discard(&self, upload_id: UploadId) {
        let mut store = self.store.write().await;
        let queued = store
            .get(&upload_id)
            .map(|item| item.status == UploadStatus::Queued)
            .unwrap_or(false);

        if queued {
            store.remove(&upload_id);
            self.finish();
            info!(%upload_id, "Discarded queued upload");
        }
    }

    pub(crate) async fn run_upload(self: Arc<Self>, upload_id: UploadId, permit: OwnedSemaphorePermit) {
        // 单独的任务里跑，外部实现 panic 时也能把任务标记为失败
        let shared = self.clone();
        let result = match tokio::spawn(async move { shared.transfer(upload_id).await }).await {
            Ok(result) => result,
            Err(err) => Err(UploadError::TaskPanicked(err.to_string())),
        };

        {
            let mut store = self.store.write().await;
            match result {
                Ok(Completion { file_url, content_id }) => {
                    if let Some(from) = store.mark_completed(&upload_id, content_id.clone()) {
                        info!(%upload_id, %content_id, "Upload completed");
                        let _ = self.event_tx.send(UploadEvent::StatusChanged {
                            upload_id,
                            from,
                            to: UploadStatus::Completed,
                        });
                        let _ = self.event_tx.send(UploadEvent::Completed {
                            upload_id,
                            content_id: content_id.clone(),
                            file_url,
                        });

                        // 处理流程不占用上传槽位
                        self.begin();
                        let shared = self.clone();
                        tokio::spawn(async move {
                            let pipeline = shared.pipeline.clone();
                            let run = tokio::spawn(async move { pipeline.run(upload_id, content_id).await });
                            if let Err(err) = run.await {
                                warn!(%upload_id, "Processing task panicked: {}", err);
                            }
                            shared.finish();
                        });
                    }
                }
                Err(err) => {
                    let reason = err.to_string();
                    warn!(%upload_id, "Upload failed: {}", reason);
                    if let Some(from) = store.mark_failed(&upload_id, reason.clone()) {
                        let _ = self.event_tx.send(UploadEvent::StatusChanged {
                            upload_id,
                            from,
                            to: UploadStatus::Failed,
                        });
                        let _ = self.event_tx.send(UploadEvent::Failed {
                            upload_id,
                            error: reason,
                        });
                    }
                }
            }
        }

        drop(permit);
        self.finish();
    }

    async fn transfer(&self, upload_id: UploadId) -> Result<Completion> {
        let (file, details) = {
            let store = self.store.read().await;
            let item = store
                .get(&upload_id)
                .ok_or_else(|| UploadError::NotFound(upload_id.to_string()))?;
            (item.file.clone(), item.details.clone())
        };

        let info = self.extractor.probe(&file.path).await?;
        let metadata = VideoMetadata::new(&file, &info);
        let thumbnails = self.extractor.extract(&file.path, info.duration).await?;
        let cover = thumbnails.first().map(|thumbnail| thumbnail.data_url());
        self.store.write().await.set_media(&upload_id, metadata.clone(), thumbnails);

        let file_url = self.uploader.upload(upload_id, &file, &metadata, self).await?;
        self.store.write().await.set_file_url(&upload_id, file_url.clone());

        let title = details
            .title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| file.stem().to_string());
        let record = ContentRecord {
            title,
            description: details.description,
            category: details.category,
            tags: details.tags,
            visibility: details.visibility,
            file_url: file_url.clone(),
            duration: metadata.duration,
            width: metadata.width,
            height: metadata.height,
            thumbnail: cover,
        };
        let content_id = self.api.create_content(&record).await?;

        Ok(Completion {
            file_url,
            content_id,
        })
    }
}

#[async_trait]
impl ProgressCallback for Shared {
    async fn on_progress(&self, upload_id: UploadId, progress: &ChunkProgress) {
        let mut store = self.store.write().await;
        store.set_progress(&upload_id, progress.percentage);
        let _ = self.event_tx.send(UploadEvent::Progress {
            upload_id,
            progress: *progress,
        });
    }
}

/// 上传协调器，克隆后共享同一个队列
#[derive(Clone)]
pub struct UploadCoordinator {
    shared: Arc<Shared>,
    queue_tx: mpsc::UnboundedSender<UploadId>,
    worker_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl UploadCoordinator {
    pub fn builder() -> UploadCoordinatorBuilder {
        UploadCoordinatorBuilder::new()
    }

    pub fn config(&self) -> &UploadConfig {
        &self.shared.config
    }

    /// 校验并入队，校验失败的文件不会进入队列
    pub async fn enqueue(&self, file: SourceFile, details: ContentDetails) -> Result<UploadId> {
        if self.shared.shutdown.is_cancelled() {
            return Err(UploadError::Shutdown);
        }

        if let Err(err) = validate_file(&file, &self.shared.config) {
            warn!(file = %file.name, "Rejected file: {}", err);
            return Err(err.into());
        }

        let item = UploadItem::new(file, details);
        let upload_id = item.id;
        let name = item.file.name.clone();
        {
            let mut store = self.shared.store.write().await;
            store.add(item);
            self.shared.begin();
            let _ = self.shared.event_tx.send(UploadEvent::Queued {
                upload_id,
                name: name.clone(),
            });
        }

        if self.queue_tx.send(upload_id).is_err() {
            self.shared.discard(upload_id).await;
            return Err(UploadError::Shutdown);
        }

        info!(%upload_id, file = %name, "File queued");
        Ok(upload_id)
    }

    pub async fn enqueue_path(&self, path: impl AsRef<Path>, details: ContentDetails) -> Result<UploadId> {
        let file = SourceFile::from_path(path).await?;
        self.enqueue(file, details).await
    }

    pub async fn get(&self, upload_id: UploadId) -> Option<UploadItem> {
        self.shared.store.read().await.get(&upload_id).cloned()
    }

    /// 按到达顺序返回所有任务
    pub async fn items(&self) -> Vec<UploadItem> {
        self.shared.store.read().await.snapshot()
    }

    pub async fn active_count(&self) -> usize {
        self.shared.store.read().await.count(UploadStatus::Uploading)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.shared.event_tx.subscribe()
    }

    /// 等待所有任务结束且处理流程跑完
    pub async fn wait_idle(&self) {
        let mut pending_rx = self.shared.pending.subscribe();
        let _ = pending_rx.wait_for(|pending| *pending == 0).await;
    }

    /// 清除已完成/失败的任务
    pub async fn clean(&self) -> usize {
        self.shared.store.write().await.remove_terminal()
    }

    pub async fn moderation_queue(&self) -> Vec<String> {
        self.shared.pipeline.moderation.snapshot().await
    }

    /// 取消尚未开始的任务，并等待进行中的任务结束
    pub async fn shutdown(&self) {
        self.shared.shutdown.cancel();

        if let Some(handle) = self.worker_handle.lock().await.take() {
            let _ = handle.await;
        }

        self.wait_idle().await;
        info!("Upload coordinator shut down");
    }
}

pub struct UploadCoordinatorBuilder {
    config: UploadConfig,
    processing: ProcessingConfig,
    media_timeout: Duration,
    api: Option<Arc<dyn UploadApi>>,
    probe: Option<Arc<dyn MediaProbe>>,
}

impl Default for UploadCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            config: UploadConfig::default(),
            processing: ProcessingConfig::default(),
            media_timeout: Duration::from_secs(30),
            api: None,
            probe: None,
        }
    }

    pub fn config(mut self, config: UploadConfig) -> Self {
        self.config = config;
        self
    }

    pub fn processing(mut self, processing: ProcessingConfig) -> Self {
        self.processing = processing;
        self
    }

    pub fn media_timeout(mut self, timeout: Duration) -> Self {
        self.media_timeout = timeout;
        self
    }

    pub fn api(mut self, api: Arc<dyn UploadApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// 需要在 tokio 运行时内调用
    pub fn build(self) -> Result<UploadCoordinator> {
        self.config.validate()?;

        let api = self
            .api
            .ok_or_else(|| UploadError::Config("Upload api is required".to_string()))?;
        let probe = self
            .probe
            .ok_or_else(|| UploadError::Config("Media probe is required".to_string()))?;

        let (event_tx, _) = broadcast::channel(self.config.event_capacity);
        let (pending, _) = watch::channel(0usize);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            uploader: ChunkedUploader::new(api.clone(), self.config.chunk_size),
            extractor: ThumbnailExtractor::new(probe, self.media_timeout),
            pipeline: ProcessingPipeline {
                config: self.processing,
                moderation: ModerationQueue::new(),
                event_tx: event_tx.clone(),
            },
            shutdown: CancellationToken::new(),
            store: RwLock::new(TaskStore::new()),
            config: self.config.clone(),
            event_tx,
            pending,
            api,
        });

        let worker = WorkerPool::new(shared.clone(), self.config.max_concurrent);
        let worker_handle = tokio::spawn(worker.run(queue_rx));

        Ok(UploadCoordinator {
            shared,
            queue_tx,
            worker_handle: Arc::new(Mutex::new(Some(worker_handle))),
        })
    }
}
