use photo_finisher::{FinishOptions, LocationFix, Quality, SizePolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Which camera the native UI should open with. A hint; not every platform
/// honors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraDevice {
    #[default]
    Rear,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    Low,
    Medium,
    #[default]
    High,
}

/// Options for taking a photo with the camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreCameraMediaOptions {
    /// Sub-directory of the working directory
    pub directory: Option<String>,
    /// File name; defaults to `IMG_yyyyMMdd_HHmmss.jpg`
    pub name: Option<String>,
    pub save_to_album: bool,
    pub camera: CameraDevice,
    pub size: SizePolicy,
    pub quality: Quality,
    pub rotate: bool,
    pub save_metadata: bool,
    /// Backfilled into the photo if the camera didn't record a fix
    pub location: Option<LocationFix>,
}

impl Default for StoreCameraMediaOptions {
    fn default() -> Self {
        Self {
            directory: None,
            name: None,
            save_to_album: false,
            camera: CameraDevice::default(),
            size: SizePolicy::Full,
            quality: Quality::MAX,
            rotate: true,
            save_metadata: true,
            location: None,
        }
    }
}

impl StoreCameraMediaOptions {
    pub(crate) fn finish_options(&self) -> FinishOptions {
        FinishOptions {
            size: self.size,
            quality: self.quality,
            rotate: self.rotate,
            save_metadata: self.save_metadata,
            location: self.location.clone(),
            ..Default::default()
        }
    }
}

/// Options for picking photos from the gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickMediaOptions {
    pub size: SizePolicy,
    pub quality: Quality,
    pub rotate: bool,
    pub save_metadata: bool,
}

impl Default for PickMediaOptions {
    fn default() -> Self {
        Self {
            size: SizePolicy::Full,
            quality: Quality::MAX,
            rotate: true,
            save_metadata: true,
        }
    }
}

impl PickMediaOptions {
    pub(crate) fn finish_options(&self) -> FinishOptions {
        FinishOptions {
            size: self.size,
            quality: self.quality,
            rotate: self.rotate,
            save_metadata: self.save_metadata,
            ..Default::default()
        }
    }
}

/// Options for recording a video. Video is never re-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    pub directory: Option<String>,
    /// File name; defaults to `VID_yyyyMMdd_HHmmss.mp4`
    pub name: Option<String>,
    pub save_to_album: bool,
    pub camera: CameraDevice,
    pub quality: VideoQuality,
    /// Recording limit passed to the native UI
    pub desired_length: Option<Duration>,
    /// Size limit in bytes passed to the native UI
    pub desired_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_finisher::PercentPreset;

    #[test]
    fn test_defaults_are_no_op_finishing() {
        let options = StoreCameraMediaOptions::default();
        assert!(options.rotate);
        assert!(options.save_metadata);
        let finish = options.finish_options();
        assert_eq!(finish.size, SizePolicy::Full);
        assert!(finish.quality.is_max());
        assert!(finish.captured_at.is_none());
    }

    #[test]
    fn test_pick_options_carry_over() {
        let options = PickMediaOptions {
            size: SizePolicy::PercentPreset(PercentPreset::Small),
            quality: Quality::new(60),
            rotate: false,
            save_metadata: false,
        };
        let finish = options.finish_options();
        assert_eq!(finish.size, SizePolicy::PercentPreset(PercentPreset::Small));
        assert_eq!(finish.quality.value(), 60);
        assert!(!finish.rotate);
        assert!(!finish.save_metadata);
        assert!(finish.location.is_none());
    }

    #[test]
    fn test_quality_clamped_when_deserialized() {
        let options: PickMediaOptions = toml::from_str("quality = 250").unwrap();
        assert!(options.quality.is_max());
        let options: PickMediaOptions = toml::from_str("quality = -3").unwrap();
        assert_eq!(options.quality.value(), 0);
    }
}
