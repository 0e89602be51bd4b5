mod coordinator;
mod errors;
mod store;
mod traits;
mod validation;
mod worker;
pub mod processing;
pub mod types;

pub use coordinator::{UploadCoordinator, UploadCoordinatorBuilder};
pub use errors::{Result, UploadError, ValidationError};
pub use processing::{ModerationQueue, ProcessingConfig, ProcessingStage};
pub use store::TaskStore;
pub use traits::{
    ContentRecord,
    InitializeRequest,
    MediaProbe,
    ProgressCallback,
    StaticToken,
    TokenProvider,
    UploadApi,
};
pub use types::{
    content_type_for,
    ChunkProgress,
    ContentDetails,
    MediaInfo,
    SourceFile,
    Thumbnail,
    UploadConfig,
    UploadEvent,
    UploadId,
    UploadItem,
    UploadStatus,
    VideoMetadata,
    Visibility,
    GIB,
    MIB,
};
pub use validation::validate_file;

#[cfg(test)]
mod tests;
