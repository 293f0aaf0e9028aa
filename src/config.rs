use photo_finisher::{DeviceInfo, FinisherConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_MAIN_ACTIVITY_CLASS: &str = "dev/dioxus/main/MainActivity";

/// Configuration for the picker on Android
///
/// This allows customization of the MainActivity class name for different apps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidPickerConfig {
    /// Fully qualified class name in slash format (e.g., "com/example/myapp/MainActivity")
    pub main_activity_class: String,
    /// How often the activity is asked for a result
    pub poll_interval_ms: u64,
    /// Give up if the native UI hasn't answered by then
    pub response_timeout_secs: u64,
}

impl Default for AndroidPickerConfig {
    fn default() -> Self {
        Self {
            main_activity_class: DEFAULT_MAIN_ACTIVITY_CLASS.to_string(),
            poll_interval_ms: 100,
            response_timeout_secs: 300,
        }
    }
}

/// Configuration for a `MediaPicker`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Where captures and working copies go; the platform's app files
    /// directory when unset
    pub working_dir: Option<PathBuf>,
    /// Make/model backfilled into photos when the platform can't tell
    pub device: Option<DeviceInfo>,
    pub finisher: FinisherConfig,
    pub android: AndroidPickerConfig,
}

impl PickerConfig {
    /// Converts to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Loads from TOML string
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .unwrap_or_else(crate::filesystem::default_working_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_finisher::ResampleFilter;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PickerConfig::from_toml(
            r#"
working_dir = "/sdcard/media"

[finisher]
resample_filter = "lanczos3"

[android]
main_activity_class = "com/example/app/MainActivity"
"#,
        )
        .unwrap();

        assert_eq!(config.working_dir(), PathBuf::from("/sdcard/media"));
        assert_eq!(config.finisher.resample_filter, ResampleFilter::Lanczos3);
        assert_eq!(config.finisher.quality_step, 5);
        assert_eq!(config.android.main_activity_class, "com/example/app/MainActivity");
        assert_eq!(config.android.poll_interval_ms, 100);
        assert!(config.device.is_none());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PickerConfig {
            working_dir: Some(PathBuf::from("/tmp/pictures")),
            device: Some(DeviceInfo {
                make: "Acme".to_string(),
                model: "One".to_string(),
                software: Some("media-picker".to_string()),
            }),
            ..Default::default()
        };

        let toml_str = config.to_toml().unwrap();
        let parsed = PickerConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(PickerConfig::from_toml("").unwrap(), PickerConfig::default());
    }
}
