use std::path::PathBuf;

/// Error type for the finishing pipeline
#[derive(Debug, thiserror::Error)]
pub enum FinishError {
    /// Source path does not exist (or vanished mid-operation)
    #[error("Image not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The bytes are not an image container we can parse
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    /// The encoder refused every quality down to the configured floor
    #[error("Encoder rejected JPEG quality {0}")]
    EncodeQualityRejected(u8),
    /// EXIF write-back failed; pixel data may already be committed
    #[error("Metadata write failed: {0}")]
    MetadataWriteFailed(String),
    /// Header was readable but the pixel data was not
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FinishError {
    /// Maps an I/O error on `path` to `NotFound` when the file is gone.
    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            FinishError::NotFound(path.to_path_buf())
        } else {
            FinishError::Io(err)
        }
    }
}
