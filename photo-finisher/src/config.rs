use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Resampling filter used when the decoded bitmap is not the planned size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    /// Bilinear
    Triangle,
    /// Bicubic
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Tuning for the finishing pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinisherConfig {
    pub resample_filter: ResampleFilter,
    /// How far quality drops after the encoder rejects a value
    pub quality_step: u8,
    /// Lowest quality tried before giving up
    pub quality_floor: u8,
}

impl Default for FinisherConfig {
    fn default() -> Self {
        Self {
            resample_filter: ResampleFilter::default(),
            quality_step: 5,
            quality_floor: 10,
        }
    }
}
