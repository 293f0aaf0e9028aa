//! Finishing step for freshly captured or picked photos.
//!
//! Reads the EXIF orientation, decides whether anything needs doing, and if
//! so resamples, rotates upright and recompresses the JPEG in place, then
//! writes the EXIF back with the new size and orientation (optionally
//! backfilling GPS, timestamps and device tags).
//!
//! ```no_run
//! use photo_finisher::{finish_photo, FinishOptions, PercentPreset, Quality, SizePolicy};
//!
//! let outcome = finish_photo(
//!     std::path::Path::new("IMG_20240309_081500.jpg"),
//!     &FinishOptions {
//!         size: SizePolicy::PercentPreset(PercentPreset::Medium),
//!         quality: Quality::new(80),
//!         ..Default::default()
//!     },
//! )?;
//! println!("changed: {}", outcome.changed);
//! # Ok::<(), photo_finisher::FinishError>(())
//! ```

pub mod atomic;
pub mod codec;
pub mod config;
pub mod error;
pub mod exif_writer;
pub mod location;
pub mod metadata;
pub mod orientation;
pub mod pipeline;
pub mod plan;
pub mod size;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_support;

/// The EXIF types `ImageMetadata` and `MetadataUpdate` are expressed in.
pub use exif;

pub use codec::{ImageCodec, JpegCodec};
pub use config::{FinisherConfig, ResampleFilter};
pub use error::FinishError;
pub use exif_writer::{apply_metadata, write_back, MetadataUpdate};
pub use location::{DeviceInfo, LocationFix};
pub use metadata::{read_metadata, read_metadata_from_bytes, ImageMetadata};
pub use orientation::OrientationTag;
pub use pipeline::{finish_photo, FinishOptions, FinishOutcome, PhotoFinisher};
pub use plan::{plan_resize, should_process, ResizePlan};
pub use size::{PercentPreset, Quality, SizePolicy};
pub use transform::{transform, TransformedImage};
