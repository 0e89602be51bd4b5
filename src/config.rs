use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::core::{ProcessingConfig, Result, UploadConfig, UploadError};
use crate::media::MediaConfig;

pub const DEFAULT_CONFIG_FILE: &str = "reel-upload.toml";

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub token: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            token: String::new(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub upload: UploadConfig,
    pub media: MediaConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|err| {
            UploadError::Config(format!("Can't read {}: {}", path.display(), err))
        })?;
        Self::from_toml(&content)
    }

    /// 文件不存在时使用默认配置
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if tokio::fs::try_exists(path).await? {
            Self::load(path).await
        } else {
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(UploadError::Config("api.endpoint must not be empty".to_string()));
        }
        self.upload.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.upload.max_concurrent, 3);
        assert_eq!(config.upload.chunk_size, 5 * 1024 * 1024);
        assert_eq!(config.upload.max_file_size, 2 * 1024 * 1024 * 1024);
        assert_eq!(config.upload.allowed_types, ["video/mp4", "video/webm", "video/ogg"]);
        assert_eq!(config.media.timeout, Duration::from_secs(30));
        assert_eq!(config.processing.transcoding, Duration::from_millis(5000));
    }

    #[test]
    fn test_load_sections() {
        let config = Config::from_toml(
            r#"
            [api]
            endpoint = "https://videos.example.com"
            token = "abc"

            [upload]
            max_concurrent = 2
            chunk_size = 1048576

            [media]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            timeout = 5

            [processing]
            transcoding = 10
            moderation_check = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.api.endpoint, "https://videos.example.com");
        assert_eq!(config.api.token, "abc");
        assert_eq!(config.upload.max_concurrent, 2);
        assert_eq!(config.upload.chunk_size, 1024 * 1024);
        assert_eq!(config.upload.max_file_size, 2 * 1024 * 1024 * 1024);
        assert_eq!(config.media.ffmpeg_path, Path::new("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.media.ffprobe_path, Path::new("ffprobe"));
        assert_eq!(config.media.timeout, Duration::from_secs(5));
        assert_eq!(config.processing.transcoding, Duration::from_millis(10));
        assert_eq!(config.processing.moderation_check, Duration::ZERO);
        assert_eq!(config.processing.content_analysis, Duration::from_millis(3000));
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = Config::from_toml("[upload]\nmax_concurrent = 0\n").unwrap_err();
        assert!(matches!(err, UploadError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = Config::from_toml("[upload\n").unwrap_err();
        assert!(matches!(err, UploadError::ConfigParse(_)));
    }
}
