use image::DynamicImage;

use crate::codec::ImageCodec;
use crate::config::FinisherConfig;
use crate::error::FinishError;
use crate::orientation::OrientationTag;
use crate::plan::ResizePlan;
use crate::size::Quality;

/// Encoded result of a transform, not yet committed to disk
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub jpeg: Vec<u8>,
    /// Final size, after rotation
    pub width: u32,
    pub height: u32,
    /// Pixels were rotated/flipped upright
    pub rotated: bool,
    /// Quality the encoder finally accepted
    pub quality: Quality,
}

/// Decode, resample, rotate and re-encode `bytes` according to `plan`.
pub fn transform(
    codec: &dyn ImageCodec,
    bytes: &[u8],
    orientation: OrientationTag,
    plan: &ResizePlan,
    rotate: bool,
    quality: Quality,
    config: &FinisherConfig,
) -> Result<TransformedImage, FinishError> {
    let mut img = codec.decode(bytes, plan.downsample)?;

    if !plan.is_identity(img.width(), img.height()) {
        log::debug!(
            "Resampling {}x{} -> {}x{}",
            img.width(),
            img.height(),
            plan.target_width,
            plan.target_height
        );
        img = img.resize_exact(
            plan.target_width,
            plan.target_height,
            config.resample_filter.into(),
        );
    }

    let rotated = rotate && !orientation.is_normal();
    if rotated {
        log::debug!("Rotating pixels upright ({:?})", orientation);
        img = orientation.apply(img);
    }

    let (jpeg, quality) = encode_with_step_down(codec, &img, quality, config)?;

    Ok(TransformedImage {
        jpeg,
        width: img.width(),
        height: img.height(),
        rotated,
        quality,
    })
}

/// Encodes at `quality`, lowering it by `quality_step` whenever the encoder
/// rejects a value, until `quality_floor`.
pub fn encode_with_step_down(
    codec: &dyn ImageCodec,
    img: &DynamicImage,
    quality: Quality,
    config: &FinisherConfig,
) -> Result<(Vec<u8>, Quality), FinishError> {
    let floor = config.quality_floor.min(100);
    let mut current = quality;

    loop {
        match codec.encode_jpeg(img, current) {
            Ok(jpeg) => {
                if current != quality {
                    log::info!(
                        "Encoder accepted quality {} (requested {})",
                        current.value(),
                        quality.value()
                    );
                }
                return Ok((jpeg, current));
            }
            Err(FinishError::EncodeQualityRejected(_)) => {
                let next = current.value().saturating_sub(config.quality_step).max(floor);
                if current.value() <= floor || next >= current.value() {
                    return Err(FinishError::EncodeQualityRejected(current.value()));
                }
                log::warn!(
                    "Encoder rejected quality {}, retrying at {}",
                    current.value(),
                    next
                );
                current = Quality::new(next as i32);
            }
            Err(e) => return Err(e),
        }
    }
}
