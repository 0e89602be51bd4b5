use std::path::Path;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{error, info};
use crate::core::{MediaInfo, MediaProbe, Result, UploadError};
use super::MediaConfig;

/// 调用 ffprobe / ffmpeg 解码本地文件
#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    config: MediaConfig,
}

impl FfmpegProbe {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MediaProbe for FfmpegProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        info!("Extracting metadata from file: {}", path.display());

        let output = Command::new(&self.config.ffprobe_path)
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            error!("ffprobe failed with status: {:?}", output.status);
            return Err(UploadError::decode(format!("ffprobe failed for {}", path.display())));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|err| UploadError::decode(format!("Invalid ffprobe output: {}", err)))?;

        parse_ffprobe_output(&ffprobe_data)
    }

    async fn capture_frame(&self, path: &Path, timestamp: f64) -> Result<Bytes> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-v")
            .arg("error")
            .arg("-ss")
            .arg(format!("{:.3}", timestamp))
            .arg("-i")
            .arg(path)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("mjpeg")
            .arg("-")
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            error!("ffmpeg failed with status: {:?}", output.status);
            return Err(UploadError::decode(format!(
                "ffmpeg could not capture frame at {:.2}s: {}",
                timestamp,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(Bytes::from(output.stdout))
    }
}

/// 从 ffprobe 的 JSON 输出中读取时长和首个视频流的尺寸
pub fn parse_ffprobe_output(ffprobe_data: &serde_json::Value) -> Result<MediaInfo> {
    let duration = ffprobe_data
        .get("format")
        .and_then(|format| format.get("duration"))
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| UploadError::decode("No duration in ffprobe output"))?;

    let video = ffprobe_data
        .get("streams")
        .and_then(|v| v.as_array())
        .and_then(|streams| {
            streams
                .iter()
                .find(|stream| stream.get("codec_type").and_then(|v| v.as_str()) == Some("video"))
        })
        .ok_or_else(|| UploadError::decode("No video stream found"))?;

    let width = video.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let height = video.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    Ok(MediaInfo {
        duration,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ffprobe_output() {
        let data = json!({
            "streams": [
                { "codec_type": "audio", "codec_name": "aac", "sample_rate": "48000" },
                { "codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080 }
            ],
            "format": { "duration": "12.480000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2" }
        });

        let info = parse_ffprobe_output(&data).unwrap();
        assert_eq!(info, MediaInfo { duration: 12.48, width: 1920, height: 1080 });
    }

    #[test]
    fn test_parse_audio_only_is_decode_error() {
        let data = json!({
            "streams": [{ "codec_type": "audio" }],
            "format": { "duration": "3.0" }
        });

        assert!(matches!(parse_ffprobe_output(&data), Err(UploadError::Decode(_))));
    }

    #[test]
    fn test_parse_missing_duration() {
        let data = json!({ "streams": [{ "codec_type": "video", "width": 1, "height": 1 }], "format": {} });

        assert!(matches!(parse_ffprobe_output(&data), Err(UploadError::Decode(_))));
    }
}
