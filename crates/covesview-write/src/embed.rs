use covesview_core::error::{AppError, AppResult};

pub const MAX_BLOB_BYTES: usize = 1_048_576;
pub const ALLOWED_IMAGE_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// An image a client wants attached to a new post or comment, before it's
/// been uploaded to the writer's data server.
pub struct ImageUpload {
    pub alt: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn validate_image_upload(upload: &ImageUpload) -> AppResult<()> {
    if upload.bytes.len() > MAX_BLOB_BYTES {
        return Err(AppError::Validation(format!(
            "image blob is {} bytes, limit is {MAX_BLOB_BYTES}",
            upload.bytes.len()
        )));
    }
    if !ALLOWED_IMAGE_MIME_TYPES.contains(&upload.mime_type.as_str()) {
        return Err(AppError::Validation(format!(
            "unsupported image mime type: {}",
            upload.mime_type
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_blob() {
        let upload = ImageUpload {
            alt: "x".into(),
            mime_type: "image/png".into(),
            bytes: vec![0u8; MAX_BLOB_BYTES + 1],
        };
        assert!(validate_image_upload(&upload).is_err());
    }

    #[test]
    fn rejects_unsupported_mime() {
        let upload = ImageUpload {
            alt: "x".into(),
            mime_type: "image/gif".into(),
            bytes: vec![0u8; 10],
        };
        assert!(validate_image_upload(&upload).is_err());
    }

    #[test]
    fn accepts_valid_upload() {
        let upload = ImageUpload {
            alt: "x".into(),
            mime_type: "image/webp".into(),
            bytes: vec![0u8; 10],
        };
        assert!(validate_image_upload(&upload).is_ok());
    }
}
