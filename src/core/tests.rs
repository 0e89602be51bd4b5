use std::path::Path;
use super::types::{content_type_for, Thumbnail, UploadId, UploadStatus};

#[test]
fn test_upload_status_transition() {
    use UploadStatus::*;

    // valid
    assert!(Queued.can_transition_to(Uploading));
    assert!(Uploading.can_transition_to(Completed));
    assert!(Uploading.can_transition_to(Failed));
    assert!(Queued.can_transition_to(Failed));

    // invalid
    assert!(!Uploading.can_transition_to(Queued));
    assert!(!Completed.can_transition_to(Uploading));
    assert!(!Completed.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(Queued));
    assert!(!Failed.can_transition_to(Uploading));
    assert!(!Queued.can_transition_to(Completed));

    assert!(Completed.is_terminal());
    assert!(Failed.is_terminal());
    assert!(!Queued.is_terminal());
    assert!(!Uploading.is_terminal());
}

#[test]
fn test_upload_id_generation() {
    let id1 = UploadId::new();
    let id2 = UploadId::new();

    assert_ne!(id1, id2);
    assert_eq!(id1, id1);

    let id_str = id1.to_string();
    assert!(!id_str.is_empty());
}

#[test]
fn test_content_type_from_extension() {
    assert_eq!(content_type_for(Path::new("a/clip.MP4")), "video/mp4");
    assert_eq!(content_type_for(Path::new("clip.webm")), "video/webm");
    assert_eq!(content_type_for(Path::new("clip.ogv")), "video/ogg");
    assert_eq!(content_type_for(Path::new("clip.mov")), "application/octet-stream");
    assert_eq!(content_type_for(Path::new("clip")), "application/octet-stream");
}

#[test]
fn test_thumbnail_data_url() {
    let thumbnail = Thumbnail {
        fraction: 0.1,
        timestamp: 1.0,
        data: bytes::Bytes::from_static(b"jpg"),
    };

    assert_eq!(thumbnail.data_url(), "data:image/jpeg;base64,anBn");
}
