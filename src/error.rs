use photo_finisher::FinishError;
use std::path::PathBuf;

use crate::options::MediaKind;

/// Central error type for picker operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The file the picker handed back (or a working copy) is gone
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The picked/captured file is not an image we can process
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The encoder refused every quality down to the configured floor
    #[error("Encoder rejected JPEG quality {0}")]
    EncodeQualityRejected(u8),
    /// Another capture or pick is still active on this picker
    #[error("A {0} operation is already active")]
    ConcurrentOperation(MediaKind),
    /// The caller's cancellation token fired
    #[error("Operation canceled")]
    Canceled,
    /// Permission denied (e.g. camera)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Platform not supported: {0}")]
    PlatformNotSupported(String),
    /// The native UI never answered
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Any other failure reported by the platform bridge
    #[error("Platform error: {0}")]
    Platform(String),
    /// Finishing failed for a reason without a dedicated variant above
    #[error("Image processing error: {0}")]
    Finish(FinishError),
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FinishError> for MediaError {
    fn from(e: FinishError) -> Self {
        match e {
            FinishError::NotFound(path) => MediaError::NotFound(path),
            FinishError::UnsupportedFormat(msg) => MediaError::UnsupportedFormat(msg),
            FinishError::EncodeQualityRejected(q) => MediaError::EncodeQualityRejected(q),
            other => MediaError::Finish(other),
        }
    }
}

/// User-friendly error messages for UI
impl MediaError {
    pub fn user_message(&self) -> String {
        match self {
            MediaError::NotFound(_) => "The photo or video could not be found.".to_string(),
            MediaError::UnsupportedFormat(_) => "This file type is not supported.".to_string(),
            MediaError::EncodeQualityRejected(_) | MediaError::Finish(_) => {
                "Error processing image.".to_string()
            }
            MediaError::ConcurrentOperation(_) => {
                "Please finish the current photo or video first.".to_string()
            }
            MediaError::Canceled => "Canceled.".to_string(),
            MediaError::PermissionDenied(msg) => format!("Permission required: {}", msg),
            MediaError::PlatformNotSupported(_) => {
                "Camera and gallery are not available on this device.".to_string()
            }
            MediaError::Timeout(_) => "No response from the camera or gallery.".to_string(),
            MediaError::Platform(msg) => msg.clone(),
            MediaError::Io(_) => "Error accessing files. Please check app permissions.".to_string(),
        }
    }

    /// Whether the caller asked for this outcome rather than something failing.
    pub fn is_canceled(&self) -> bool {
        matches!(self, MediaError::Canceled)
    }
}
