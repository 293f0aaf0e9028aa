use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::{Capabilities, CaptureRequest, PickerBackend, PickerOutcome, VideoRequest};
use crate::error::MediaError;

/// Backend for targets without a native picker
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedBackend;

fn not_available<T>(what: &str) -> Result<T, MediaError> {
    Err(MediaError::PlatformNotSupported(format!(
        "{} not available on this platform",
        what
    )))
}

impl PickerBackend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn capture_photo(
        &self,
        _request: &CaptureRequest,
        _cancel: &CancellationToken,
    ) -> Result<PickerOutcome<PathBuf>, MediaError> {
        not_available("Camera")
    }

    fn pick_photo(&self, _cancel: &CancellationToken) -> Result<PickerOutcome<PathBuf>, MediaError> {
        not_available("Image picker")
    }

    fn pick_photos(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<PickerOutcome<Vec<PathBuf>>, MediaError> {
        not_available("Multi image picker")
    }

    fn capture_video(
        &self,
        _request: &VideoRequest,
        _cancel: &CancellationToken,
    ) -> Result<PickerOutcome<PathBuf>, MediaError> {
        not_available("Video camera")
    }

    fn pick_video(&self, _cancel: &CancellationToken) -> Result<PickerOutcome<PathBuf>, MediaError> {
        not_available("Video picker")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_unsupported() {
        let backend = UnsupportedBackend;
        let cancel = CancellationToken::new();
        assert!(!backend.capabilities().camera_available);
        assert!(matches!(
            backend.pick_photo(&cancel),
            Err(MediaError::PlatformNotSupported(_))
        ));
        assert!(matches!(
            backend.save_to_album(std::path::Path::new("a.jpg"), crate::options::MediaKind::Photo),
            Err(MediaError::PlatformNotSupported(_))
        ));
        assert!(backend.device_info().is_none());
    }
}
