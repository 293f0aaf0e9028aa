//! Take or pick photos and videos through the platform's native camera and
//! gallery UI, and get back a plain file.
//!
//! Photos go through [`photo_finisher`] before they are handed out: rotated
//! upright, resized and recompressed as requested, with EXIF carried over.
//! Videos are passed through untouched.
//!
//! ```no_run
//! use media_picker::{MediaPicker, PickerConfig, StoreCameraMediaOptions};
//! use photo_finisher::{PercentPreset, Quality, SizePolicy};
//!
//! # async fn run() -> Result<(), media_picker::MediaError> {
//! let picker = MediaPicker::new(PickerConfig::default());
//! let options = StoreCameraMediaOptions {
//!     size: SizePolicy::PercentPreset(PercentPreset::Medium),
//!     quality: Quality::new(80),
//!     ..Default::default()
//! };
//! if let Some(photo) = picker.take_photo(options).await? {
//!     println!("saved to {:?}", photo.path());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod filesystem;
pub mod media_file;
pub mod options;
pub mod picker;
pub mod platform;
mod session;

pub use config::{AndroidPickerConfig, PickerConfig};
pub use error::MediaError;
pub use media_file::MediaFile;
pub use options::{
    CameraDevice, MediaKind, PickMediaOptions, StoreCameraMediaOptions, VideoOptions, VideoQuality,
};
pub use picker::{MediaOperation, MediaPicker};
pub use platform::{
    default_backend, Capabilities, CaptureRequest, PickerBackend, PickerOutcome, VideoRequest,
};

pub use photo_finisher::{DeviceInfo, FinishOptions, FinishOutcome, LocationFix, Quality, SizePolicy};
