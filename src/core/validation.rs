use super::errors::ValidationError;
use super::types::{SourceFile, UploadConfig};

/// 检查类型白名单和大小上限，先查类型
pub fn validate_file(file: &SourceFile, config: &UploadConfig) -> Result<(), ValidationError> {
    let declared = file.content_type.trim().to_ascii_lowercase();
    let allowed = config
        .allowed_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(&declared));

    if !allowed {
        return Err(ValidationError::UnsupportedType {
            content_type: file.content_type.clone(),
            allowed: config.allowed_types.join(", "),
        });
    }

    if file.size > config.max_file_size {
        return Err(ValidationError::TooLarge {
            size: file.size,
            max_size: config.max_file_size,
        });
    }

    if file.size == 0 {
        return Err(ValidationError::Empty);
    }

    Ok(())
}
