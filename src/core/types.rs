use std::path::{Path, PathBuf};
use std::time::Duration;
use bytes::Bytes;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use super::errors::{Result, UploadError};
use super::processing::ProcessingStage;

pub const MIB: usize = 1024 * 1024;
pub const GIB: u64 = 1024 * 1024 * 1024;

// 用于序列化 Duration（秒）
pub(crate) fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

// 用于序列化 Duration（毫秒）
pub(crate) fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

pub(crate) fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

/// 上传任务唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UploadId(pub Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 上传状态，只能单向流转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// 等待中（在队列中）
    Queued,
    /// 上传中（占用一个并发槽位）
    Uploading,
    /// 已完成
    Completed,
    /// 失败
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Failed)
    }

    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        use UploadStatus::*;

        matches!(
            (self, next),
            (Queued, Uploading) | (Queued, Failed) | (Uploading, Completed) | (Uploading, Failed)
        )
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadStatus::Queued => "queued",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 待上传的本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    /// 声明的 MIME 类型
    pub content_type: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, size: u64, content_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size,
            content_type: content_type.into(),
        }
    }

    /// 从本地路径读取文件名、大小，并按扩展名推断类型
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(UploadError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::Config(format!("Invalid file name: {}", path.display())))?
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            content_type: content_type_for(path).to_string(),
            name,
            size: metadata.len(),
        })
    }

    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("ogg") | Some("ogv") => "video/ogg",
        _ => "application/octet-stream",
    }
}

/// 从媒体文件中读取的基础信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// 时长（秒）
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// 随初始化请求一起提交的元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub name: String,
}

impl VideoMetadata {
    pub fn new(file: &SourceFile, info: &MediaInfo) -> Self {
        Self {
            duration: info.duration,
            width: info.width,
            height: info.height,
            size: file.size,
            content_type: file.content_type.clone(),
            name: file.name.clone(),
        }
    }
}

/// 截取的缩略图（JPEG）
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// 占总时长的比例
    pub fraction: f64,
    /// 截取位置（秒）
    pub timestamp: f64,
    pub data: Bytes,
}

impl Thumbnail {
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(&self.data))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

/// 内容的描述字段，创建内容记录时提交
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentDetails {
    pub title: Option<String>,
    pub description: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: Visibility,
}

/// 单个文件从入队到完成/失败的内存记录
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub id: UploadId,
    pub file: SourceFile,
    pub details: ContentDetails,
    pub status: UploadStatus,
    /// 0 - 100
    pub progress: f64,
    pub metadata: Option<VideoMetadata>,
    pub thumbnails: Vec<Thumbnail>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub file_url: Option<String>,
    pub content_id: Option<String>,
    pub error: Option<String>,
}

impl UploadItem {
    pub fn new(file: SourceFile, details: ContentDetails) -> Self {
        Self {
            id: UploadId::new(),
            file,
            details,
            status: UploadStatus::Queued,
            progress: 0.0,
            metadata: None,
            thumbnails: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            file_url: None,
            content_id: None,
            error: None,
        }
    }
}

/// 单个分片确认后的进度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkProgress {
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 最大并发上传数
    pub max_concurrent: usize,
    /// 分片大小
    pub chunk_size: usize,
    /// 单个文件大小上限
    pub max_file_size: u64,
    /// 允许的 MIME 类型
    pub allowed_types: Vec<String>,
    /// 事件通道容量
    pub event_capacity: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            chunk_size: 5 * MIB,
            max_file_size: 2 * GIB,
            allowed_types: vec![
                "video/mp4".to_string(),
                "video/webm".to_string(),
                "video/ogg".to_string(),
            ],
            event_capacity: 1024,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(UploadError::Config("max_concurrent must be at least 1".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(UploadError::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.allowed_types.is_empty() {
            return Err(UploadError::Config("allowed_types must not be empty".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(UploadError::Config("event_capacity must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// 文件已入队
    Queued {
        upload_id: UploadId,
        name: String,
    },

    /// 状态变更
    StatusChanged {
        upload_id: UploadId,
        from: UploadStatus,
        to: UploadStatus,
    },

    /// 分片确认后的进度
    Progress {
        upload_id: UploadId,
        progress: ChunkProgress,
    },

    /// 上传及内容创建完成
    Completed {
        upload_id: UploadId,
        content_id: String,
        file_url: String,
    },

    /// 任务失败
    Failed {
        upload_id: UploadId,
        error: String,
    },

    /// 进入处理阶段
    ProcessingStage {
        upload_id: UploadId,
        content_id: String,
        stage: ProcessingStage,
    },

    /// 处理完成，已进入审核队列
    ProcessingFinished {
        upload_id: UploadId,
        content_id: String,
    },
}

// 静态断言确保类型是 Send的
const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_types() {
        assert_send::<UploadItem>();
        assert_send::<UploadEvent>();
        assert_send::<ChunkProgress>();
    }
};
