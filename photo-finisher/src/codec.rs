//! Pixel decode/encode behind a trait, so the pipeline can run against the
//! `image` crate in production and a scripted codec in tests.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageError, ImageReader};
use std::io::Cursor;

use crate::error::FinishError;
use crate::size::Quality;

pub trait ImageCodec: Send + Sync {
    /// Natural (stored) dimensions, read from headers only.
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), FinishError>;

    /// Decodes pixels. `downsample` is a power-of-two hint that an
    /// implementation may use to decode a smaller bitmap directly.
    fn decode(&self, bytes: &[u8], downsample: u32) -> Result<DynamicImage, FinishError>;

    /// Encodes as baseline JPEG. Fails with `EncodeQualityRejected` when the
    /// encoder won't produce output at this quality.
    fn encode_jpeg(&self, image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, FinishError>;
}

fn classify(err: ImageError) -> FinishError {
    match err {
        ImageError::Unsupported(e) => FinishError::UnsupportedFormat(e.to_string()),
        ImageError::IoError(e) => FinishError::Io(e),
        other => FinishError::Decode(other.to_string()),
    }
}

/// `ImageCodec` backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), FinishError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(classify)
    }

    fn decode(&self, bytes: &[u8], downsample: u32) -> Result<DynamicImage, FinishError> {
        // The image crate has no DCT-domain scaling, so the hint only matters
        // for how much the resampler has to shrink afterwards.
        log::trace!("Decoding {} bytes (downsample hint {})", bytes.len(), downsample);
        image::load_from_memory(bytes).map_err(classify)
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, FinishError> {
        // The encoder's scale starts at 1
        let q = quality.value().max(1);
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, q)
            .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| {
                log::warn!("JPEG encode at quality {} failed: {}", q, e);
                FinishError::EncodeQualityRejected(quality.value())
            })?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::jpeg_bytes;
    use image::GenericImageView;

    #[test]
    fn test_dimensions_from_header() {
        let codec = JpegCodec;
        assert_eq!(codec.dimensions(&jpeg_bytes(40, 30)).unwrap(), (40, 30));
    }

    #[test]
    fn test_garbage_is_not_decodable() {
        let codec = JpegCodec;
        assert!(codec.dimensions(b"nope").is_err());
        assert!(codec.decode(b"nope", 1).is_err());
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let codec = JpegCodec;
        let img = codec.decode(&jpeg_bytes(64, 64), 1).unwrap();
        let high = codec.encode_jpeg(&img, Quality::new(95)).unwrap();
        let low = codec.encode_jpeg(&img, Quality::new(10)).unwrap();
        assert!(low.len() < high.len());

        // quality 0 still encodes
        let zero = codec.encode_jpeg(&img, Quality::new(0)).unwrap();
        let back = image::load_from_memory(&zero).unwrap();
        assert_eq!(back.dimensions(), (64, 64));
    }
}
