use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::atomic::replace_file;
use crate::codec::{ImageCodec, JpegCodec};
use crate::config::FinisherConfig;
use crate::error::FinishError;
use crate::exif_writer::{apply_metadata, insert_exif, MetadataUpdate};
use crate::location::{DeviceInfo, LocationFix};
use crate::metadata::{read_metadata_from_bytes, ImageMetadata};
use crate::orientation::OrientationTag;
use crate::plan::{plan_resize, should_process};
use crate::size::{Quality, SizePolicy};
use crate::transform::transform;

/// What the caller wants done to a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishOptions {
    pub size: SizePolicy,
    pub quality: Quality,
    /// Rotate pixels upright according to the orientation tag
    pub rotate: bool,
    /// Carry EXIF over and backfill what's missing
    pub save_metadata: bool,
    pub location: Option<LocationFix>,
    pub device: Option<DeviceInfo>,
    pub captured_at: Option<NaiveDateTime>,
}

impl Default for FinishOptions {
    fn default() -> Self {
        Self {
            size: SizePolicy::Full,
            quality: Quality::MAX,
            rotate: true,
            save_metadata: true,
            location: None,
            device: None,
            captured_at: None,
        }
    }
}

/// Result of `PhotoFinisher::finish`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishOutcome {
    /// `false` means the file was not touched
    pub changed: bool,
    pub width: u32,
    pub height: u32,
    pub metadata_written: bool,
}

/// Runs the read / gate / plan / transform / write-back sequence on files
/// in place.
#[derive(Clone)]
pub struct PhotoFinisher {
    config: FinisherConfig,
    codec: Arc<dyn ImageCodec>,
}

impl Default for PhotoFinisher {
    fn default() -> Self {
        Self::new(FinisherConfig::default())
    }
}

impl std::fmt::Debug for PhotoFinisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoFinisher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PhotoFinisher {
    pub fn new(config: FinisherConfig) -> Self {
        Self::with_codec(config, Arc::new(JpegCodec))
    }

    pub fn with_codec(config: FinisherConfig, codec: Arc<dyn ImageCodec>) -> Self {
        Self { config, codec }
    }

    pub fn config(&self) -> &FinisherConfig {
        &self.config
    }

    /// Orientation as the gate sees it: without rotation the tag is left
    /// alone, so it can't be a reason to recompress.
    fn effective_orientation(metadata: &ImageMetadata, options: &FinishOptions) -> OrientationTag {
        if options.rotate {
            metadata.orientation
        } else {
            OrientationTag::Normal
        }
    }

    /// Pixels without the merged EXIF. Keeps the bare orientation tag when
    /// the pixels were not rotated.
    fn fallback_output(jpeg: &[u8], original: &ImageMetadata, needs_orientation: bool) -> Vec<u8> {
        if !needs_orientation {
            return jpeg.to_vec();
        }
        let orientation = original.orientation_only();
        match insert_exif(jpeg, orientation.fields(), orientation.little_endian()) {
            Ok(tagged) => tagged,
            Err(e) => {
                log::warn!("Dropping orientation tag as well: {}", e);
                jpeg.to_vec()
            }
        }
    }

    /// Whether `finish` would rewrite the file at `path`.
    pub fn needs_processing(&self, path: &Path, options: &FinishOptions) -> Result<bool, FinishError> {
        let bytes = std::fs::read(path).map_err(|e| FinishError::from_io(path, e))?;
        let metadata = read_metadata_from_bytes(&bytes)?;
        Ok(should_process(
            Self::effective_orientation(&metadata, options),
            options.size,
            options.quality,
        ))
    }

    /// Finishes the photo at `path` in place.
    ///
    /// The output, metadata included, is assembled in memory and committed
    /// with a single atomic replace, so any error leaves the file exactly as
    /// it was. A metadata failure is logged and reported via
    /// `metadata_written == false`.
    pub fn finish(&self, path: &Path, options: &FinishOptions) -> Result<FinishOutcome, FinishError> {
        let bytes = std::fs::read(path).map_err(|e| FinishError::from_io(path, e))?;
        let metadata = read_metadata_from_bytes(&bytes)?;
        let (width, height) = self.codec.dimensions(&bytes)?;

        let orientation = Self::effective_orientation(&metadata, options);
        if !should_process(orientation, options.size, options.quality) {
            log::debug!("{:?} needs no finishing", path);
            return Ok(FinishOutcome {
                changed: false,
                width,
                height,
                metadata_written: false,
            });
        }

        let plan = plan_resize(options.size, width, height);
        log::debug!(
            "Finishing {:?}: {}x{} {:?} -> {}x{} (downsample {}), quality {}",
            path,
            width,
            height,
            metadata.orientation,
            plan.target_width,
            plan.target_height,
            plan.downsample,
            options.quality.value()
        );

        let transformed = transform(
            self.codec.as_ref(),
            &bytes,
            metadata.orientation,
            &plan,
            options.rotate,
            options.quality,
            &self.config,
        )?;

        let update = MetadataUpdate {
            width: transformed.width,
            height: transformed.height,
            rotated: transformed.rotated,
            location: options.location.clone(),
            device: options.device.clone(),
            captured_at: options.captured_at,
        };

        // Without save_metadata the output only keeps an orientation tag the
        // pixels still depend on.
        let needs_orientation = !transformed.rotated && !metadata.orientation.is_normal();
        let carried = if options.save_metadata {
            Some(metadata)
        } else if needs_orientation {
            Some(metadata.orientation_only())
        } else {
            None
        };

        let (output, metadata_written) = match carried {
            Some(original) => match apply_metadata(&transformed.jpeg, &original, &update) {
                Ok(jpeg) => (jpeg, true),
                Err(e) => {
                    log::warn!("Could not carry metadata over for {:?}: {}", path, e);
                    (
                        Self::fallback_output(&transformed.jpeg, &original, needs_orientation),
                        false,
                    )
                }
            },
            None => (transformed.jpeg, false),
        };

        replace_file(path, &output)?;

        log::info!(
            "Finished {:?}: {}x{} at quality {}{}",
            path,
            transformed.width,
            transformed.height,
            transformed.quality.value(),
            if transformed.rotated { ", rotated upright" } else { "" }
        );

        Ok(FinishOutcome {
            changed: true,
            width: transformed.width,
            height: transformed.height,
            metadata_written,
        })
    }
}

/// [`PhotoFinisher::finish`] with the default configuration.
pub fn finish_photo(path: &Path, options: &FinishOptions) -> Result<FinishOutcome, FinishError> {
    PhotoFinisher::default().finish(path, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::read_metadata;
    use crate::size::PercentPreset;
    use crate::test_support::{init_logger, orientation_field, sha256_of, write_jpeg};
    use exif::{Field, In, Tag, Value};
    use image::{DynamicImage, GenericImageView};

    fn options(size: SizePolicy, quality: i32) -> FinishOptions {
        FinishOptions {
            size,
            quality: Quality::new(quality),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_leave_file_untouched() {
        init_logger();
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 64, 48, &[orientation_field(1)]);
        let before = sha256_of(&path);

        let outcome = finish_photo(&path, &FinishOptions::default()).unwrap();

        assert!(!outcome.changed);
        assert_eq!((outcome.width, outcome.height), (64, 48));
        assert_eq!(sha256_of(&path), before);
    }

    #[test]
    fn test_untagged_defaults_leave_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "plain.jpg", 20, 10, &[]);
        let before = sha256_of(&path);

        let outcome = finish_photo(&path, &FinishOptions::default()).unwrap();
        assert!(!outcome.changed);
        assert_eq!(sha256_of(&path), before);
    }

    #[test]
    fn test_quality_99_still_recompresses() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 32, 32, &[]);
        let outcome = finish_photo(&path, &options(SizePolicy::Full, 99)).unwrap();
        assert!(outcome.changed);
        assert_eq!((outcome.width, outcome.height), (32, 32));
    }

    #[test]
    fn test_max_dimension_never_upscales() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 120, 80, &[]);

        let outcome = finish_photo(&path, &options(SizePolicy::MaxDimension(500), 90)).unwrap();
        assert!(outcome.changed);
        assert_eq!((outcome.width, outcome.height), (120, 80));

        let img = image::open(&path).unwrap();
        assert_eq!(img.dimensions(), (120, 80));
    }

    #[test]
    fn test_custom_percent_longest_side() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 301, 157, &[]);

        let outcome = finish_photo(&path, &options(SizePolicy::CustomPercent(37), 85)).unwrap();
        let expected = (301.0f64 * 0.37).round() as i64;
        let longest = outcome.width.max(outcome.height) as i64;
        assert!((longest - expected).abs() <= 1);
        assert_eq!(image::open(&path).unwrap().width() as i64, longest);
    }

    #[test]
    fn test_rotate90_swaps_and_resets_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 60, 40, &[orientation_field(6)]);

        let outcome = finish_photo(&path, &FinishOptions::default()).unwrap();

        assert!(outcome.changed);
        assert!(outcome.metadata_written);
        assert_eq!((outcome.width, outcome.height), (40, 60));
        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta.orientation, OrientationTag::Normal);
        assert_eq!(meta.pixel_dimensions(), Some((40, 60)));
        assert_eq!(image::open(&path).unwrap().dimensions(), (40, 60));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 60, 40, &[orientation_field(8)]);

        let first = finish_photo(&path, &FinishOptions::default()).unwrap();
        assert!(first.changed);
        let after_first = sha256_of(&path);

        let second = finish_photo(&path, &FinishOptions::default()).unwrap();
        assert!(!second.changed);
        assert_eq!(sha256_of(&path), after_first);
    }

    #[test]
    fn test_no_rotate_keeps_tag_and_skips_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 60, 40, &[orientation_field(6)]);
        let before = sha256_of(&path);

        let opts = FinishOptions {
            rotate: false,
            ..Default::default()
        };
        let finisher = PhotoFinisher::default();
        assert!(!finisher.needs_processing(&path, &opts).unwrap());
        assert!(!finisher.finish(&path, &opts).unwrap().changed);
        assert_eq!(sha256_of(&path), before);

        // Recompressing without rotation, and without metadata, still keeps
        // the tag the pixels rely on.
        let opts = FinishOptions {
            rotate: false,
            save_metadata: false,
            quality: Quality::new(70),
            ..Default::default()
        };
        let outcome = finisher.finish(&path, &opts).unwrap();
        assert_eq!((outcome.width, outcome.height), (60, 40));
        assert_eq!(read_metadata(&path).unwrap().orientation, OrientationTag::Rotate90);
    }

    #[test]
    fn test_oversized_exif_keeps_pixels_and_orientation() {
        init_logger();
        let dir = tempfile::tempdir().unwrap();
        // Fits on its own, but not once GPS and pixel dimensions are merged in
        let maker_note = Field {
            tag: Tag::MakerNote,
            ifd_num: In::PRIMARY,
            value: Value::Undefined(vec![0x5a; 65_420], 0),
        };
        let path = write_jpeg(
            dir.path(),
            "a.jpg",
            60,
            40,
            &[orientation_field(6), maker_note],
        );
        assert_eq!(read_metadata(&path).unwrap().orientation, OrientationTag::Rotate90);

        let opts = FinishOptions {
            rotate: false,
            quality: Quality::new(80),
            location: Some(LocationFix::new(37.5, -122.3)),
            ..Default::default()
        };
        let outcome = finish_photo(&path, &opts).unwrap();

        assert!(outcome.changed);
        assert!(!outcome.metadata_written);
        assert_eq!((outcome.width, outcome.height), (60, 40));
        assert_eq!(image::open(&path).unwrap().dimensions(), (60, 40));
        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta.orientation, OrientationTag::Rotate90);
        assert!(!meta.has_gps());
    }

    #[test]
    fn test_without_save_metadata_output_has_no_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 60, 40, &[orientation_field(3)]);

        let opts = FinishOptions {
            save_metadata: false,
            location: Some(LocationFix::new(1.0, 2.0)),
            ..Default::default()
        };
        let outcome = finish_photo(&path, &opts).unwrap();
        assert!(outcome.changed);
        assert!(!outcome.metadata_written);
        assert!(!read_metadata(&path).unwrap().has_exif());
    }

    #[test]
    fn test_gps_backfill_and_no_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let fix = LocationFix::new(37.5, -122.3);
        let opts = FinishOptions {
            quality: Quality::new(90),
            location: Some(fix),
            ..Default::default()
        };

        let bare = write_jpeg(dir.path(), "bare.jpg", 32, 32, &[]);
        finish_photo(&bare, &opts).unwrap();
        let meta = read_metadata(&bare).unwrap();
        let (lat, lon) = meta.gps_coordinates().unwrap();
        assert!((lat - 37.5).abs() < 1e-6);
        assert!((lon + 122.3).abs() < 1e-6);
        assert_eq!(meta.ascii(Tag::GPSLatitudeRef).as_deref(), Some("N"));
        assert_eq!(meta.ascii(Tag::GPSLongitudeRef).as_deref(), Some("W"));

        let tagged = write_jpeg(
            dir.path(),
            "tagged.jpg",
            32,
            32,
            &LocationFix::new(51.0, 7.25).to_exif_fields(),
        );
        finish_photo(&tagged, &opts).unwrap();
        let (lat, lon) = read_metadata(&tagged).unwrap().gps_coordinates().unwrap();
        assert!((lat - 51.0).abs() < 1e-6);
        assert!((lon - 7.25).abs() < 1e-6);
    }

    #[test]
    fn test_4000x3000_rotate90_medium() {
        init_logger();
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "big.jpg", 4000, 3000, &[orientation_field(6)]);
        let finisher = PhotoFinisher::new(FinisherConfig {
            resample_filter: crate::config::ResampleFilter::Triangle,
            ..Default::default()
        });

        let opts = FinishOptions {
            size: SizePolicy::PercentPreset(PercentPreset::Medium),
            quality: Quality::new(80),
            ..Default::default()
        };
        let outcome = finisher.finish(&path, &opts).unwrap();

        assert!(outcome.changed);
        assert_eq!((outcome.width, outcome.height), (1500, 2000));
        assert_eq!(image::open(&path).unwrap().dimensions(), (1500, 2000));
        let meta = read_metadata(&path).unwrap();
        assert_eq!(meta.orientation, OrientationTag::Normal);
        assert_eq!(meta.pixel_dimensions(), Some((1500, 2000)));
    }

    struct BrokenEncoder;

    impl ImageCodec for BrokenEncoder {
        fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), FinishError> {
            JpegCodec.dimensions(bytes)
        }

        fn decode(&self, bytes: &[u8], downsample: u32) -> Result<DynamicImage, FinishError> {
            JpegCodec.decode(bytes, downsample)
        }

        fn encode_jpeg(&self, _: &DynamicImage, quality: Quality) -> Result<Vec<u8>, FinishError> {
            Err(FinishError::EncodeQualityRejected(quality.value()))
        }
    }

    #[test]
    fn test_encode_failure_leaves_original_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jpeg(dir.path(), "a.jpg", 40, 40, &[orientation_field(6)]);
        let before = sha256_of(&path);

        let finisher = PhotoFinisher::with_codec(FinisherConfig::default(), Arc::new(BrokenEncoder));
        let err = finisher.finish(&path, &options(SizePolicy::Full, 50)).unwrap_err();

        assert!(matches!(err, FinishError::EncodeQualityRejected(10)));
        assert_eq!(sha256_of(&path), before);
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn test_missing_and_unsupported_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jpg");
        assert!(matches!(
            finish_photo(&missing, &FinishOptions::default()),
            Err(FinishError::NotFound(_))
        ));

        let junk = dir.path().join("junk.jpg");
        std::fs::write(&junk, b"definitely not a jpeg").unwrap();
        assert!(matches!(
            finish_photo(&junk, &FinishOptions::default()),
            Err(FinishError::UnsupportedFormat(_))
        ));
        assert_eq!(std::fs::read(&junk).unwrap(), b"definitely not a jpeg");
    }
}
