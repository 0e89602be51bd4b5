#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use bytes::Bytes;
use reel_upload::core::{ContentRecord, InitializeRequest, MediaInfo, MediaProbe, UploadApi};
use reel_upload::{Result, UploadError};

#[derive(Default)]
pub struct Calls {
    pub initialize: Vec<InitializeRequest>,
    /// (transfer id, chunk index, chunk size)
    pub chunks: Vec<(String, usize, usize)>,
    pub received: HashMap<String, Vec<u8>>,
    pub finalize: Vec<String>,
    pub content: Vec<ContentRecord>,
}

/// 模拟远端接口 - 用于测试
#[derive(Default)]
pub struct MockApi {
    pub reject_chunk: Option<usize>,
    pub reject_initialize_for: Option<String>,
    /// 对该传输 ID 的分片直接 panic
    pub panic_for: Option<String>,
    pub chunk_delay: Duration,
    pub calls: Mutex<Calls>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_chunk(index: usize) -> Self {
        Self {
            reject_chunk: Some(index),
            ..Default::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            chunk_delay: delay,
            ..Default::default()
        }
    }
}

#[async_trait]
impl UploadApi for MockApi {
    async fn initialize(&self, request: &InitializeRequest) -> Result<String> {
        if self.reject_initialize_for.as_deref() == Some(request.filename.as_str()) {
            return Err(UploadError::server_error(400, "Initialize upload failed"));
        }

        self.calls.lock().unwrap().initialize.push(request.clone());
        Ok(format!("transfer-{}", request.filename))
    }

    async fn upload_chunk(&self, upload_id: &str, chunk_index: usize, chunk: Bytes) -> Result<()> {
        if !self.chunk_delay.is_zero() {
            tokio::time::sleep(self.chunk_delay).await;
        }

        if self.panic_for.as_deref() == Some(upload_id) {
            panic!("chunk handler crashed for {}", upload_id);
        }

        let mut calls = self.calls.lock().unwrap();
        calls.chunks.push((upload_id.to_string(), chunk_index, chunk.len()));

        if self.reject_chunk == Some(chunk_index) {
            return Err(UploadError::server_error(500, format!("Upload chunk {} failed", chunk_index)));
        }

        calls
            .received
            .entry(upload_id.to_string())
            .or_default()
            .extend_from_slice(&chunk);
        Ok(())
    }

    async fn finalize(&self, upload_id: &str) -> Result<String> {
        self.calls.lock().unwrap().finalize.push(upload_id.to_string());
        Ok(format!("https://cdn.example.com/{}", upload_id))
    }

    async fn create_content(&self, record: &ContentRecord) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.content.push(record.clone());
        Ok(format!("content-{}", calls.content.len()))
    }
}

/// 固定时长的解码器
pub struct MockProbe {
    pub duration: f64,
}

impl Default for MockProbe {
    fn default() -> Self {
        Self { duration: 60.0 }
    }
}

#[async_trait]
impl MediaProbe for MockProbe {
    async fn probe(&self, _path: &Path) -> Result<MediaInfo> {
        Ok(MediaInfo {
            duration: self.duration,
            width: 1280,
            height: 720,
        })
    }

    async fn capture_frame(&self, _path: &Path, timestamp: f64) -> Result<Bytes> {
        Ok(Bytes::from(format!("jpeg@{:.1}", timestamp)))
    }
}

/// 永远不返回的解码器
pub struct StalledProbe;

#[async_trait]
impl MediaProbe for StalledProbe {
    async fn probe(&self, _path: &Path) -> Result<MediaInfo> {
        std::future::pending().await
    }

    async fn capture_frame(&self, _path: &Path, _timestamp: f64) -> Result<Bytes> {
        std::future::pending().await
    }
}

pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

// 创建测试文件
pub async fn create_test_file(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, pattern(size)).await.unwrap();
    path
}
