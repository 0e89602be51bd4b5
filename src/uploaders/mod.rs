pub mod chunked;

pub use chunked::{calculate_chunks, ChunkInfo, ChunkedUploader};
