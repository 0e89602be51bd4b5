use std::path::Path;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use super::errors::Result;
use super::types::{ChunkProgress, MediaInfo, UploadId, VideoMetadata, Visibility};

/// 初始化上传时提交的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    pub filename: String,
    pub filesize: u64,
    pub content_type: String,
    pub metadata: VideoMetadata,
}

/// 创建内容记录时提交的描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub file_url: String,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub thumbnail: Option<String>,
}

/// 远端上传接口，四个调用都需要鉴权
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// 申请传输标识
    async fn initialize(&self, request: &InitializeRequest) -> Result<String>;

    /// 上传单个分片，返回即表示已确认
    async fn upload_chunk(&self, upload_id: &str, chunk_index: usize, chunk: Bytes) -> Result<()>;

    /// 结束传输，返回文件的持久地址
    async fn finalize(&self, upload_id: &str) -> Result<String>;

    /// 创建内容记录，返回内容 ID
    async fn create_content(&self, record: &ContentRecord) -> Result<String>;
}

/// 媒体解码器
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// 截取指定时间点（秒）的一帧 JPEG
    async fn capture_frame(&self, path: &Path, timestamp: f64) -> Result<Bytes>;
}

/// 鉴权令牌提供者
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// 固定令牌
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// 进度回调 trait
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// 分片确认后回调
    async fn on_progress(&self, upload_id: UploadId, progress: &ChunkProgress);
}
