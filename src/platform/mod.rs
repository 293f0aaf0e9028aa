//! Native camera/gallery bridges.
//!
//! A backend only shows the native UI and reports which file came back.
//! Finishing, naming and the one-operation rule live in `MediaPicker`.

use photo_finisher::DeviceInfo;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::PickerConfig;
use crate::error::MediaError;
use crate::options::{CameraDevice, MediaKind, VideoQuality};

#[cfg(target_os = "android")]
pub mod android;
pub mod unsupported;

/// What the platform can do right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub camera_available: bool,
    pub take_photo: bool,
    pub pick_photo: bool,
    pub take_video: bool,
    pub pick_video: bool,
}

/// How a native picker interaction ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome<T> {
    Selected(T),
    /// The user closed the UI without choosing anything
    Dismissed,
    /// Our cancellation token fired and the UI was torn down
    Canceled,
}

impl<T> PickerOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PickerOutcome<U> {
        match self {
            PickerOutcome::Selected(value) => PickerOutcome::Selected(f(value)),
            PickerOutcome::Dismissed => PickerOutcome::Dismissed,
            PickerOutcome::Canceled => PickerOutcome::Canceled,
        }
    }

    /// `Dismissed` becomes `None`; `Canceled` becomes an error.
    pub fn into_result(self) -> Result<Option<T>, MediaError> {
        match self {
            PickerOutcome::Selected(value) => Ok(Some(value)),
            PickerOutcome::Dismissed => Ok(None),
            PickerOutcome::Canceled => Err(MediaError::Canceled),
        }
    }
}

/// A photo capture the backend should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Where the photo should be written. The backend may return another
    /// path if the platform insists on choosing one.
    pub target: PathBuf,
    pub camera: CameraDevice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub target: PathBuf,
    pub camera: CameraDevice,
    pub quality: VideoQuality,
    pub max_duration: Option<Duration>,
    pub max_size_bytes: Option<u64>,
}

/// One platform's native picker. Calls block until the UI returns.
///
/// Implementations poll `cancel` while their UI is showing and, when it
/// fires, dismiss the UI and return `PickerOutcome::Canceled`.
pub trait PickerBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    fn capture_photo(
        &self,
        request: &CaptureRequest,
        cancel: &CancellationToken,
    ) -> Result<PickerOutcome<PathBuf>, MediaError>;

    fn pick_photo(&self, cancel: &CancellationToken) -> Result<PickerOutcome<PathBuf>, MediaError>;

    fn pick_photos(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PickerOutcome<Vec<PathBuf>>, MediaError>;

    fn capture_video(
        &self,
        request: &VideoRequest,
        cancel: &CancellationToken,
    ) -> Result<PickerOutcome<PathBuf>, MediaError>;

    fn pick_video(&self, cancel: &CancellationToken) -> Result<PickerOutcome<PathBuf>, MediaError>;

    /// Copies `path` into the public photo/video album and returns the copy.
    fn save_to_album(&self, path: &Path, kind: MediaKind) -> Result<PathBuf, MediaError> {
        let _ = path;
        Err(MediaError::PlatformNotSupported(format!(
            "{} cannot save a {} to the album",
            self.name(),
            kind
        )))
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        None
    }
}

/// The backend for the platform this crate was compiled for.
pub fn default_backend(config: &PickerConfig) -> Arc<dyn PickerBackend> {
    #[cfg(target_os = "android")]
    {
        Arc::new(android::AndroidBackend::new(config.android.clone()))
    }

    #[cfg(not(target_os = "android"))]
    {
        let _ = config;
        Arc::new(unsupported::UnsupportedBackend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(PickerOutcome::Selected(3).into_result().unwrap(), Some(3));
        assert_eq!(PickerOutcome::<u8>::Dismissed.into_result().unwrap(), None);
        assert!(matches!(
            PickerOutcome::<u8>::Canceled.into_result(),
            Err(MediaError::Canceled)
        ));
        assert_eq!(PickerOutcome::Selected(2).map(|v| v * 2), PickerOutcome::Selected(4));
    }

    #[cfg(not(target_os = "android"))]
    #[test]
    fn test_default_backend_on_desktop() {
        let backend = default_backend(&PickerConfig::default());
        assert_eq!(backend.name(), "unsupported");
        assert_eq!(backend.capabilities(), Capabilities::default());
    }
}
