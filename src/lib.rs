pub mod client;
pub mod config;
pub mod core;
pub mod media;
pub mod uploaders;
pub mod utils;

// 重新导出核心类型
pub use core::{
    ContentDetails,
    Result,
    SourceFile,
    UploadConfig,
    UploadCoordinator,
    UploadCoordinatorBuilder,
    UploadError,
    UploadEvent,
    UploadId,
    UploadItem,
    UploadStatus,
    ValidationError,
};

pub use client::HttpUploadApi;
pub use config::Config;
pub use media::{FfmpegProbe, ThumbnailExtractor};
pub use uploaders::ChunkedUploader;
