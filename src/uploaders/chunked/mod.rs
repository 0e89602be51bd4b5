use std::sync::Arc;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};
use crate::core::{
    ChunkProgress,
    InitializeRequest,
    ProgressCallback,
    Result,
    SourceFile,
    UploadApi,
    UploadError,
    UploadId,
    ValidationError,
    VideoMetadata,
};

/// 分片信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub index: usize,
    pub offset: u64,
    pub size: usize,
}

/// 计算分片信息，最后一片可能小于 chunk_size
pub fn calculate_chunks(file_size: u64, chunk_size: usize) -> Vec<ChunkInfo> {
    let chunk_size = chunk_size.max(1) as u64;
    let mut chunks = Vec::new();
    let mut offset = 0;
    let mut index = 0;

    while offset < file_size {
        let size = std::cmp::min(chunk_size, file_size - offset) as usize;
        chunks.push(ChunkInfo {
            index,
            offset,
            size,
        });
        offset += size as u64;
        index += 1;
    }

    chunks
}

/// 分片上传器，分片严格按顺序逐个发送
#[derive(Clone)]
pub struct ChunkedUploader {
    api: Arc<dyn UploadApi>,
    chunk_size: usize,
}

impl ChunkedUploader {
    pub fn new(api: Arc<dyn UploadApi>, chunk_size: usize) -> Self {
        Self {
            api,
            chunk_size,
        }
    }

    /// 读取单个分片
    async fn read_chunk(file: &mut File, chunk: &ChunkInfo) -> Result<Bytes> {
        file.seek(std::io::SeekFrom::Start(chunk.offset)).await?;

        let mut buffer = vec![0u8; chunk.size];
        file.read_exact(&mut buffer).await?;

        Ok(Bytes::from(buffer))
    }

    /// 初始化、逐片上传、结束传输，返回文件地址。任一分片失败则整体失败，不重试。
    pub async fn upload(
        &self,
        upload_id: UploadId,
        source: &SourceFile,
        metadata: &VideoMetadata,
        callback: &dyn ProgressCallback,
    ) -> Result<String> {
        // 空文件不在远端建立传输
        let chunks = calculate_chunks(source.size, self.chunk_size);
        let total_chunks = chunks.len();
        if total_chunks == 0 {
            return Err(UploadError::Validation(ValidationError::Empty));
        }

        let request = InitializeRequest {
            filename: source.name.clone(),
            filesize: source.size,
            content_type: source.content_type.clone(),
            metadata: metadata.clone(),
        };
        let transfer_id = self.api.initialize(&request).await?;
        info!(%upload_id, %transfer_id, file = %source.name, "Transfer initialized");

        let mut file = File::open(&source.path).await?;
        let mut bytes_uploaded = 0u64;

        for chunk in &chunks {
            let data = Self::read_chunk(&mut file, chunk).await?;
            self.api.upload_chunk(&transfer_id, chunk.index, data).await?;

            bytes_uploaded += chunk.size as u64;
            let progress = ChunkProgress {
                chunk_index: chunk.index,
                total_chunks,
                bytes_uploaded,
                total_bytes: source.size,
                percentage: (chunk.index + 1) as f64 / total_chunks as f64 * 100.0,
            };
            debug!(
                %upload_id,
                chunk = chunk.index + 1,
                total_chunks,
                "Chunk acknowledged ({:.1}%)",
                progress.percentage
            );
            callback.on_progress(upload_id, &progress).await;
        }

        let file_url = self.api.finalize(&transfer_id).await?;
        info!(%upload_id, %file_url, "Transfer finalized");

        Ok(file_url)
    }
}
