mod ffmpeg;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::core::{MediaInfo, MediaProbe, Result, Thumbnail, UploadError};
use crate::core::types::{deserialize_duration, serialize_duration};

pub use ffmpeg::{parse_ffprobe_output, FfmpegProbe};

/// 缩略图截取位置，按时长比例递增
pub const THUMBNAIL_FRACTIONS: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffprobe_path: PathBuf,
    pub ffmpeg_path: PathBuf,
    /// 单次解码/截帧的超时（秒）
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            timeout: Duration::from_secs(30),
        }
    }
}

/// 读取元数据并截取缩略图，每次调用都有超时
#[derive(Clone)]
pub struct ThumbnailExtractor {
    probe: Arc<dyn MediaProbe>,
    timeout: Duration,
}

impl ThumbnailExtractor {
    pub fn new(probe: Arc<dyn MediaProbe>, timeout: Duration) -> Self {
        Self {
            probe,
            timeout,
        }
    }

    pub async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let info = tokio::time::timeout(self.timeout, self.probe.probe(path))
            .await
            .map_err(|_| UploadError::Timeout(format!("Decoding {}", path.display())))??;

        if !info.duration.is_finite() || info.duration <= 0.0 {
            return Err(UploadError::decode(format!(
                "Invalid duration {} for {}",
                info.duration,
                path.display()
            )));
        }

        Ok(info)
    }

    /// 按固定比例截取 5 帧，任一帧失败即整体失败
    pub async fn extract(&self, path: &Path, duration: f64) -> Result<Vec<Thumbnail>> {
        let mut thumbnails = Vec::with_capacity(THUMBNAIL_FRACTIONS.len());

        for fraction in THUMBNAIL_FRACTIONS {
            let timestamp = duration * fraction;
            let data = tokio::time::timeout(self.timeout, self.probe.capture_frame(path, timestamp))
                .await
                .map_err(|_| UploadError::Timeout(format!("Seeking to {:.2}s in {}", timestamp, path.display())))??;

            if data.is_empty() {
                return Err(UploadError::decode(format!("Empty frame at {:.2}s", timestamp)));
            }

            debug!(path = %path.display(), timestamp, bytes = data.len(), "Captured thumbnail");
            thumbnails.push(Thumbnail {
                fraction,
                timestamp,
                data,
            });
        }

        Ok(thumbnails)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;

    struct FixedProbe {
        duration: f64,
    }

    #[async_trait]
    impl MediaProbe for FixedProbe {
        async fn probe(&self, _path: &Path) -> Result<MediaInfo> {
            Ok(MediaInfo {
                duration: self.duration,
                width: 640,
                height: 360,
            })
        }

        async fn capture_frame(&self, _path: &Path, timestamp: f64) -> Result<Bytes> {
            Ok(Bytes::from(format!("frame@{:.1}", timestamp)))
        }
    }

    struct StalledProbe;

    #[async_trait]
    impl MediaProbe for StalledProbe {
        async fn probe(&self, _path: &Path) -> Result<MediaInfo> {
            std::future::pending().await
        }

        async fn capture_frame(&self, _path: &Path, _timestamp: f64) -> Result<Bytes> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_extracts_five_ordered_frames() {
        let extractor = ThumbnailExtractor::new(Arc::new(FixedProbe { duration: 100.0 }), Duration::from_secs(1));

        let thumbnails = extractor.extract(Path::new("clip.mp4"), 100.0).await.unwrap();

        assert_eq!(thumbnails.len(), 5);
        let timestamps: Vec<f64> = thumbnails.iter().map(|t| t.timestamp).collect();
        assert_eq!(timestamps, vec![10.0, 30.0, 50.0, 70.0, 90.0]);
        assert!(thumbnails.windows(2).all(|w| w[0].fraction < w[1].fraction));
        assert_eq!(thumbnails[0].data, Bytes::from("frame@10.0"));
    }

    #[tokio::test]
    async fn test_rejects_zero_duration() {
        let extractor = ThumbnailExtractor::new(Arc::new(FixedProbe { duration: 0.0 }), Duration::from_secs(1));

        let err = extractor.probe(Path::new("clip.mp4")).await.unwrap_err();
        assert!(matches!(err, UploadError::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_decode_times_out() {
        let extractor = ThumbnailExtractor::new(Arc::new(StalledProbe), Duration::from_secs(30));

        let err = extractor.probe(Path::new("clip.mp4")).await.unwrap_err();
        assert!(matches!(err, UploadError::Timeout(_)));

        let err = extractor.extract(Path::new("clip.mp4"), 10.0).await.unwrap_err();
        assert!(matches!(err, UploadError::Timeout(_)));
    }
}
