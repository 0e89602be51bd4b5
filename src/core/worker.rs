use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;
use super::coordinator::Shared;
use super::types::UploadId;

/// 按到达顺序取任务，拿到信号量许可后才开始上传
pub(crate) struct WorkerPool {
    shared: Arc<Shared>,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub(crate) fn new(shared: Arc<Shared>, max_concurrent: usize) -> Self {
        Self {
            shared,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    pub(crate) async fn run(self, mut queue_rx: mpsc::UnboundedReceiver<UploadId>) {
        let shutdown = self.shared.shutdown.clone();

        loop {
            let upload_id = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = queue_rx.recv() => match next {
                    Some(upload_id) => upload_id,
                    None => break,
                },
            };

            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.shared.discard(upload_id).await;
                    break;
                }
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        self.shared.discard(upload_id).await;
                        break;
                    }
                },
            };

            if !self.shared.start(upload_id).await {
                continue;
            }

            let shared = self.shared.clone();
            tokio::spawn(async move {
                shared.run_upload(upload_id, permit).await;
            });
        }

        // 关闭后丢弃尚未开始的任务
        queue_rx.close();
        while let Ok(upload_id) = queue_rx.try_recv() {
            self.shared.discard(upload_id).await;
        }
        debug!("Worker pool stopped");
    }
}
