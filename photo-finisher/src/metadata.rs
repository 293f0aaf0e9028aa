//! Read-only access to the EXIF block of an image.
//!
//! A photo without EXIF, or with EXIF we can't parse, is still a valid photo:
//! it just reads as `OrientationTag::Normal` with no fields. Only a missing
//! file or bytes that aren't an image container are errors.

use exif::{Field, In, Tag, Value};
use std::io::Cursor;
use std::path::Path;

use crate::error::FinishError;
use crate::location::from_dms;
use crate::orientation::OrientationTag;

/// Orientation plus every primary-image EXIF field, kept for write-back
#[derive(Debug, Clone, Default)]
pub struct ImageMetadata {
    pub orientation: OrientationTag,
    fields: Vec<Field>,
    little_endian: bool,
}

impl ImageMetadata {
    /// Primary and Exif/GPS/Interop sub-IFD fields. The thumbnail IFD is
    /// not kept.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn has_exif(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn field(&self, tag: Tag) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag == tag)
    }

    /// First string of an ASCII field, without trailing NULs.
    pub fn ascii(&self, tag: Tag) -> Option<String> {
        match &self.field(tag)?.value {
            Value::Ascii(values) => values.first().map(|v| {
                String::from_utf8_lossy(v)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            }),
            _ => None,
        }
    }

    pub fn has_gps(&self) -> bool {
        self.field(Tag::GPSLatitude).is_some() || self.field(Tag::GPSLongitude).is_some()
    }

    /// Signed decimal (latitude, longitude) if both are present.
    pub fn gps_coordinates(&self) -> Option<(f64, f64)> {
        let latitude = self.coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
        let longitude = self.coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef)?;
        Some((latitude, longitude))
    }

    fn coordinate(&self, tag: Tag, reference: Tag) -> Option<f64> {
        let dms = match &self.field(tag)?.value {
            Value::Rational(v) => v,
            _ => return None,
        };
        let reference = self.ascii(reference).unwrap_or_default();
        from_dms(dms, &reference)
    }

    /// `PixelXDimension` / `PixelYDimension` as recorded.
    pub fn pixel_dimensions(&self) -> Option<(u32, u32)> {
        let width = self.field(Tag::PixelXDimension)?.value.get_uint(0)?;
        let height = self.field(Tag::PixelYDimension)?.value.get_uint(0)?;
        Some((width, height))
    }

    /// Same byte order, only the orientation field (if any).
    pub fn orientation_only(&self) -> Self {
        Self {
            orientation: self.orientation,
            fields: self
                .fields
                .iter()
                .filter(|f| f.tag == Tag::Orientation)
                .cloned()
                .collect(),
            little_endian: self.little_endian,
        }
    }

    pub(crate) fn from_exif(exif: &exif::Exif) -> Self {
        let orientation = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            .and_then(OrientationTag::from_exif)
            .unwrap_or_default();

        let fields = exif
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .cloned()
            .collect();

        Self {
            orientation,
            fields,
            little_endian: exif.little_endian(),
        }
    }
}

/// Reads orientation and EXIF fields from the file at `path`.
pub fn read_metadata(path: &Path) -> Result<ImageMetadata, FinishError> {
    let bytes = std::fs::read(path).map_err(|e| FinishError::from_io(path, e))?;
    read_metadata_from_bytes(&bytes)
}

/// Same as [`read_metadata`] for an in-memory file.
pub fn read_metadata_from_bytes(bytes: &[u8]) -> Result<ImageMetadata, FinishError> {
    image::guess_format(bytes)
        .map_err(|e| FinishError::UnsupportedFormat(format!("Unknown container: {}", e)))?;

    let exif = exif::Reader::new().read_from_container(&mut Cursor::new(bytes));

    match exif {
        Ok(exif) => Ok(ImageMetadata::from_exif(&exif)),
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF block, treating orientation as normal");
            Ok(ImageMetadata::default())
        }
        Err(e) => {
            log::warn!("Unreadable EXIF, treating orientation as normal: {}", e);
            Ok(ImageMetadata::default())
        }
    }
}
