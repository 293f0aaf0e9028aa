use serde::{Deserialize, Serialize};

/// Fixed percentage presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PercentPreset {
    Large,  // 75%
    Medium, // 50%
    Small,  // 25%
}

impl PercentPreset {
    pub fn percent(self) -> u8 {
        match self {
            PercentPreset::Large => 75,
            PercentPreset::Medium => 50,
            PercentPreset::Small => 25,
        }
    }
}

/// Requested output dimensions for a finished photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SizePolicy {
    #[default]
    Full,
    PercentPreset(PercentPreset),
    /// 1..=100, clamped when planning
    CustomPercent(u8),
    /// Cap for the longest side in pixels. Never upscales.
    MaxDimension(u32),
}

impl SizePolicy {
    /// Builds a `CustomPercent`, clamping to 1..=100.
    pub fn custom_percent(percent: i32) -> Self {
        SizePolicy::CustomPercent(percent.clamp(1, 100) as u8)
    }

    pub fn is_full(self) -> bool {
        self == SizePolicy::Full
    }

    /// Scale factor for an image with the given natural size.
    pub fn scale_for(self, width: u32, height: u32) -> f64 {
        match self {
            SizePolicy::Full => 1.0,
            SizePolicy::PercentPreset(preset) => preset.percent() as f64 / 100.0,
            SizePolicy::CustomPercent(p) => p.clamp(1, 100) as f64 / 100.0,
            SizePolicy::MaxDimension(max) => {
                let longest = width.max(height);
                if max > 0 && longest > max {
                    max as f64 / longest as f64
                } else {
                    1.0
                }
            }
        }
    }
}

/// JPEG quality, 0..=100. 100 is the least lossy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: Quality = Quality(100);

    /// Clamps into 0..=100.
    pub fn new(value: i32) -> Self {
        Quality(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self.0 == 100
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality::MAX
    }
}

impl From<i32> for Quality {
    fn from(value: i32) -> Self {
        Quality::new(value)
    }
}

impl From<Quality> for i32 {
    fn from(q: Quality) -> Self {
        q.0 as i32
    }
}
