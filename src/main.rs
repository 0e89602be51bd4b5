use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use reel_upload::config::{Config, DEFAULT_CONFIG_FILE};
use reel_upload::core::StaticToken;
use reel_upload::utils::{format_bytes, format_duration, progress_bar};
use reel_upload::{
    ContentDetails,
    FfmpegProbe,
    HttpUploadApi,
    UploadCoordinator,
    UploadError,
    UploadEvent,
    UploadStatus,
};

/// 分片上传视频文件，完成后进入处理流程
#[derive(Parser, Debug)]
#[command(name = "reel-upload", version, about = "Upload video files in chunks")]
struct Args {
    /// Config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Video files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load_or_default(&args.config)
        .await
        .with_context(|| format!("Failed to load config: {}", args.config.display()))?;

    let api = HttpUploadApi::new(&config.api.endpoint, Arc::new(StaticToken::new(config.api.token.clone())))
        .context("Invalid api endpoint")?;
    info!(endpoint = %api.endpoint(), "Using upload api");
    let coordinator = UploadCoordinator::builder()
        .config(config.upload.clone())
        .processing(config.processing.clone())
        .media_timeout(config.media.timeout)
        .api(Arc::new(api))
        .probe(Arc::new(FfmpegProbe::new(config.media.clone())))
        .build()?;

    let upload_config = coordinator.config();
    info!(
        max_concurrent = upload_config.max_concurrent,
        "Chunk size {}, size limit {}",
        format_bytes(upload_config.chunk_size as u64),
        format_bytes(upload_config.max_file_size)
    );

    let mut event_rx = coordinator.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(UploadEvent::Progress { upload_id, progress }) => {
                    println!(
                        "{} {} {}/{}",
                        upload_id,
                        progress_bar(progress.percentage, 30),
                        format_bytes(progress.bytes_uploaded),
                        format_bytes(progress.total_bytes)
                    );
                }
                Ok(UploadEvent::ProcessingStage { content_id, stage, .. }) => {
                    println!("content {}: {}", content_id, stage);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} progress events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let started = Instant::now();
    let mut rejected = 0;
    for path in &args.files {
        match coordinator.enqueue_path(path, ContentDetails::default()).await {
            Ok(upload_id) => info!(%upload_id, file = %path.display(), "Queued"),
            Err(UploadError::Validation(err)) => {
                rejected += 1;
                warn!("Rejected {}: {}", path.display(), err);
            }
            Err(err) => {
                rejected += 1;
                error!("{}: {}", path.display(), err);
            }
        }
    }

    coordinator.wait_idle().await;

    // 汇总
    let items = coordinator.items().await;
    let mut failed = rejected;
    for item in &items {
        match item.status {
            UploadStatus::Completed => {
                info!(
                    file = %item.file.name,
                    content_id = item.content_id.as_deref().unwrap_or_default(),
                    "Uploaded {}",
                    format_bytes(item.file.size)
                );
            }
            UploadStatus::Failed => {
                failed += 1;
                error!(file = %item.file.name, "{}", item.error.as_deref().unwrap_or("unknown error"));
            }
            UploadStatus::Queued | UploadStatus::Uploading => {}
        }
    }

    coordinator.shutdown().await;
    printer.abort();
    info!("Finished in {}", format_duration(started.elapsed()));

    if failed > 0 {
        bail!("{} file(s) failed", failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_config_defaults_to_local_file() {
        let args = Args::try_parse_from(["reel-upload", "a.mp4", "b.webm"]).unwrap();
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(args.files, vec![PathBuf::from("a.mp4"), PathBuf::from("b.webm")]);
    }

    #[test]
    fn test_config_flag() {
        let args = Args::try_parse_from(["reel-upload", "-c", "custom.toml", "a.mp4"]).unwrap();
        assert_eq!(args.config, PathBuf::from("custom.toml"));

        let args = Args::try_parse_from(["reel-upload", "--config", "other.toml", "a.mp4"]).unwrap();
        assert_eq!(args.config, PathBuf::from("other.toml"));
    }

    #[test]
    fn test_files_required() {
        assert!(Args::try_parse_from(["reel-upload"]).is_err());
        assert!(Args::try_parse_from(["reel-upload", "--config", "custom.toml"]).is_err());
    }
}
