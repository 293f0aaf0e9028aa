use crate::orientation::OrientationTag;
use crate::size::{Quality, SizePolicy};

/// Output of the resize planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub target_width: u32,
    pub target_height: u32,
    /// Power-of-two decode hint. 1 means decode at full resolution.
    pub downsample: u32,
}

impl ResizePlan {
    pub fn is_identity(&self, width: u32, height: u32) -> bool {
        self.target_width == width && self.target_height == height
    }
}

/// Returns `false` only for the exact "do nothing" request: upright pixels,
/// full size and quality 100. Everything else goes through a recompress.
///
/// The gate looks at the request only, never at the image dimensions, so a
/// `MaxDimension` bound counts as a resize even when the image already fits
/// and the photo is recompressed.
pub fn should_process(orientation: OrientationTag, size: SizePolicy, quality: Quality) -> bool {
    !(orientation.is_normal() && size.is_full() && quality.is_max())
}

/// Computes target dimensions for `size` applied to a `width` x `height`
/// image, in stored (pre-rotation) orientation.
pub fn plan_resize(size: SizePolicy, width: u32, height: u32) -> ResizePlan {
    let percent = size.scale_for(width, height);

    // A zero-sized target is never useful; keep at least one pixel.
    let target_width = ((width as f64 * percent).round() as u32).max(1);
    let target_height = ((height as f64 * percent).round() as u32).max(1);

    ResizePlan {
        target_width,
        target_height,
        downsample: downsample_factor(width, height, target_width, target_height),
    }
}

/// Smallest power of two at which a further halving of the half-size image
/// would drop below the target on either axis. 4000x3000 to 2000x1500 gives 2.
pub fn downsample_factor(width: u32, height: u32, target_width: u32, target_height: u32) -> u32 {
    let mut factor = 1u32;
    if height > target_height || width > target_width {
        let half_height = height / 2;
        let half_width = width / 2;
        while half_height / factor >= target_height && half_width / factor >= target_width {
            factor *= 2;
        }
    }
    factor
}
