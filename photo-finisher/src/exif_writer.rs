//! EXIF write-back after a transform.
//!
//! The encoder produces a bare JPEG, so the original fields are merged with
//! the post-transform facts (size, orientation) and optional backfills, then
//! serialized with kamadak-exif's writer and spliced in as an APP1 segment.

use chrono::NaiveDateTime;
use exif::{Field, In, Tag, Value};
use std::io::Cursor;
use std::path::Path;

use crate::atomic::replace_file;
use crate::error::FinishError;
use crate::location::{DeviceInfo, LocationFix};
use crate::metadata::ImageMetadata;
use crate::orientation::OrientationTag;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// What changed during the transform, plus optional backfill data
#[derive(Debug, Clone, Default)]
pub struct MetadataUpdate {
    /// Final pixel size, after any rotation
    pub width: u32,
    pub height: u32,
    /// Pixels were physically rotated; orientation becomes Normal
    pub rotated: bool,
    pub location: Option<LocationFix>,
    pub device: Option<DeviceInfo>,
    /// Local wall-clock capture time for DateTime* backfill
    pub captured_at: Option<NaiveDateTime>,
}

// Offsets and pointers are regenerated by the writer, and the old thumbnail
// would show the pre-transform image.
fn is_structural(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::ExifIFDPointer
            | Tag::GPSInfoIFDPointer
            | Tag::InteropIFDPointer
            | Tag::JPEGInterchangeFormat
            | Tag::JPEGInterchangeFormatLength
            | Tag::StripOffsets
            | Tag::StripByteCounts
            | Tag::TileOffsets
            | Tag::TileByteCounts
    )
}

fn primary(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn set(fields: &mut Vec<Field>, field: Field) {
    match fields.iter_mut().find(|f| f.tag == field.tag) {
        Some(existing) => *existing = field,
        None => fields.push(field),
    }
}

fn set_if_absent(fields: &mut Vec<Field>, field: Field) {
    if !fields.iter().any(|f| f.tag == field.tag) {
        fields.push(field);
    }
}

/// Fields to write for `original` after a transform described by `update`.
pub fn merge_fields(original: &ImageMetadata, update: &MetadataUpdate) -> Vec<Field> {
    let mut fields: Vec<Field> = original
        .fields()
        .iter()
        .filter(|f| f.ifd_num == In::PRIMARY && !is_structural(f.tag))
        .filter(|f| !matches!(f.value, Value::Unknown(..)))
        .cloned()
        .collect();

    set(&mut fields, primary(Tag::PixelXDimension, Value::Long(vec![update.width])));
    set(&mut fields, primary(Tag::PixelYDimension, Value::Long(vec![update.height])));
    if original.field(Tag::ImageWidth).is_some() {
        set(&mut fields, primary(Tag::ImageWidth, Value::Long(vec![update.width])));
    }
    if original.field(Tag::ImageLength).is_some() {
        set(&mut fields, primary(Tag::ImageLength, Value::Long(vec![update.height])));
    }

    if update.rotated {
        set(
            &mut fields,
            primary(
                Tag::Orientation,
                Value::Short(vec![OrientationTag::Normal.to_exif()]),
            ),
        );
    }

    if let Some(location) = &update.location {
        if original.has_gps() {
            log::debug!("Photo already has a GPS fix, keeping it");
        } else {
            for field in location.to_exif_fields() {
                set(&mut fields, field);
            }
        }
    }

    if let Some(captured_at) = update.captured_at {
        let stamp = captured_at.format(EXIF_DATETIME_FORMAT).to_string();
        for tag in [Tag::DateTime, Tag::DateTimeOriginal, Tag::DateTimeDigitized] {
            set_if_absent(&mut fields, primary(tag, ascii(&stamp)));
        }
    }

    if let Some(device) = &update.device {
        if !device.make.is_empty() {
            set_if_absent(&mut fields, primary(Tag::Make, ascii(&device.make)));
        }
        if !device.model.is_empty() {
            set_if_absent(&mut fields, primary(Tag::Model, ascii(&device.model)));
        }
        if let Some(software) = &device.software {
            set_if_absent(&mut fields, primary(Tag::Software, ascii(software)));
        }
    }

    fields.sort_by_key(|f| f.tag.number());
    fields
}

/// Serializes `fields` into a TIFF-structured EXIF block (no "Exif\0\0").
pub fn build_exif_block(fields: &[Field], little_endian: bool) -> Result<Vec<u8>, FinishError> {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }

    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, little_endian)
        .map_err(|e| FinishError::MetadataWriteFailed(format!("EXIF encode failed: {}", e)))?;
    Ok(buf.into_inner())
}

/// Serializes `fields` and splices them into `jpeg`.
pub fn insert_exif(jpeg: &[u8], fields: &[Field], little_endian: bool) -> Result<Vec<u8>, FinishError> {
    let block = build_exif_block(fields, little_endian)?;
    splice_exif_segment(jpeg, &block)
}

/// `jpeg` with its EXIF rebuilt from `original` + `update`.
pub fn apply_metadata(
    jpeg: &[u8],
    original: &ImageMetadata,
    update: &MetadataUpdate,
) -> Result<Vec<u8>, FinishError> {
    let fields = merge_fields(original, update);
    insert_exif(jpeg, &fields, original.little_endian())
}

/// Rewrites the EXIF of the JPEG at `path` in place.
///
/// `original` is the metadata read before the transform, since the freshly
/// encoded file carries none.
pub fn write_back(
    path: &Path,
    original: &ImageMetadata,
    update: &MetadataUpdate,
) -> Result<(), FinishError> {
    let jpeg = std::fs::read(path).map_err(|e| FinishError::from_io(path, e))?;
    let updated = apply_metadata(&jpeg, original, update)?;
    replace_file(path, &updated)?;
    log::debug!(
        "EXIF written to {:?} ({}x{}, rotated={})",
        path,
        update.width,
        update.height,
        update.rotated
    );
    Ok(())
}

struct Segment<'a> {
    marker: u8,
    bytes: &'a [u8],
}

fn is_exif_app1(segment: &Segment) -> bool {
    segment.marker == APP1 && segment.bytes.len() >= 4 && segment.bytes[4..].starts_with(EXIF_HEADER)
}

/// Splits the header of a JPEG into marker segments. The second value is the
/// offset where entropy-coded data (SOS) starts.
fn header_segments(jpeg: &[u8]) -> Result<(Vec<Segment<'_>>, usize), FinishError> {
    let malformed = |what: &str| FinishError::MetadataWriteFailed(format!("Malformed JPEG: {}", what));

    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != SOI {
        return Err(malformed("missing SOI"));
    }

    let mut segments = Vec::new();
    let mut pos = 2;
    loop {
        if pos + 2 > jpeg.len() {
            return Err(malformed("no scan data"));
        }
        if jpeg[pos] != 0xFF {
            return Err(malformed("expected marker"));
        }
        let marker = jpeg[pos + 1];
        if marker == 0xFF {
            // fill byte
            pos += 1;
            continue;
        }
        if marker == SOS || marker == EOI {
            return Ok((segments, pos));
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            segments.push(Segment {
                marker,
                bytes: &jpeg[pos..pos + 2],
            });
            pos += 2;
            continue;
        }
        if pos + 4 > jpeg.len() {
            return Err(malformed("truncated segment length"));
        }
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        if len < 2 || pos + 2 + len > jpeg.len() {
            return Err(malformed("segment overruns file"));
        }
        segments.push(Segment {
            marker,
            bytes: &jpeg[pos..pos + 2 + len],
        });
        pos += 2 + len;
    }
}

/// Replaces every EXIF APP1 segment in `jpeg` with one holding `exif_block`,
/// placed right after SOI and any APP0 (JFIF) segments.
pub fn splice_exif_segment(jpeg: &[u8], exif_block: &[u8]) -> Result<Vec<u8>, FinishError> {
    let payload_len = EXIF_HEADER.len() + exif_block.len() + 2;
    if payload_len > u16::MAX as usize {
        return Err(FinishError::MetadataWriteFailed(format!(
            "EXIF block too large: {} bytes",
            exif_block.len()
        )));
    }

    let (segments, scan_start) = header_segments(jpeg)?;

    let mut out = Vec::with_capacity(jpeg.len() + payload_len + 2);
    out.extend_from_slice(&[0xFF, SOI]);

    let mut kept = segments.iter().filter(|s| !is_exif_app1(s)).peekable();
    while let Some(segment) = kept.next_if(|s| s.marker == APP0) {
        out.extend_from_slice(segment.bytes);
    }

    out.extend_from_slice(&[0xFF, APP1]);
    out.extend_from_slice(&(payload_len as u16).to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(exif_block);

    for segment in kept {
        out.extend_from_slice(segment.bytes);
    }
    out.extend_from_slice(&jpeg[scan_start..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::read_metadata_from_bytes;
    use crate::test_support::{jpeg_bytes, orientation_field};
    use chrono::NaiveDate;
    use image::GenericImageView;

    fn captured() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_splice_keeps_image_decodable() {
        let jpeg = jpeg_bytes(12, 6);
        let with_exif = insert_exif(&jpeg, &[orientation_field(3)], false).unwrap();
        assert_eq!(&with_exif[..2], &[0xFF, 0xD8]);

        let img = image::load_from_memory(&with_exif).unwrap();
        assert_eq!(img.dimensions(), (12, 6));
        let meta = read_metadata_from_bytes(&with_exif).unwrap();
        assert_eq!(meta.orientation, OrientationTag::Rotate180);
    }

    #[test]
    fn test_splice_replaces_existing_exif() {
        let jpeg = jpeg_bytes(8, 8);
        let first = insert_exif(&jpeg, &[orientation_field(6)], true).unwrap();
        let second = insert_exif(&first, &[orientation_field(8)], true).unwrap();

        let count = second
            .windows(8)
            .filter(|w| w[0] == 0xFF && w[1] == APP1 && &w[4..8] == b"Exif")
            .count();
        assert_eq!(count, 1);
        let meta = read_metadata_from_bytes(&second).unwrap();
        assert_eq!(meta.orientation, OrientationTag::Rotate270);
    }

    #[test]
    fn test_splice_rejects_non_jpeg() {
        let err = splice_exif_segment(b"\x89PNG\r\n\x1a\n", &[0; 8]).unwrap_err();
        assert!(matches!(err, FinishError::MetadataWriteFailed(_)));
    }

    #[test]
    fn test_rotation_resets_orientation_and_sets_dimensions() {
        let source = insert_exif(&jpeg_bytes(8, 4), &[orientation_field(6)], false).unwrap();
        let original = read_metadata_from_bytes(&source).unwrap();

        let update = MetadataUpdate {
            width: 4,
            height: 8,
            rotated: true,
            ..Default::default()
        };
        let out = apply_metadata(&jpeg_bytes(4, 8), &original, &update).unwrap();
        let meta = read_metadata_from_bytes(&out).unwrap();

        assert_eq!(meta.orientation, OrientationTag::Normal);
        assert_eq!(meta.pixel_dimensions(), Some((4, 8)));
    }

    #[test]
    fn test_orientation_kept_when_not_rotated() {
        let source = insert_exif(&jpeg_bytes(8, 4), &[orientation_field(6)], false).unwrap();
        let original = read_metadata_from_bytes(&source).unwrap();

        let update = MetadataUpdate {
            width: 8,
            height: 4,
            ..Default::default()
        };
        let meta = read_metadata_from_bytes(&apply_metadata(&source, &original, &update).unwrap())
            .unwrap();
        assert_eq!(meta.orientation, OrientationTag::Rotate90);
    }

    #[test]
    fn test_gps_backfill_only_when_missing() {
        let fix = LocationFix::new(37.5, -122.3);
        let update = MetadataUpdate {
            width: 8,
            height: 8,
            location: Some(fix),
            ..Default::default()
        };

        let bare = read_metadata_from_bytes(&jpeg_bytes(8, 8)).unwrap();
        let filled = read_metadata_from_bytes(&apply_metadata(&jpeg_bytes(8, 8), &bare, &update).unwrap())
            .unwrap();
        let (lat, lon) = filled.gps_coordinates().unwrap();
        assert!((lat - 37.5).abs() < 1e-6);
        assert!((lon + 122.3).abs() < 1e-6);

        let tagged_source = insert_exif(
            &jpeg_bytes(8, 8),
            &LocationFix::new(48.2, 16.4).to_exif_fields(),
            true,
        )
        .unwrap();
        let tagged = read_metadata_from_bytes(&tagged_source).unwrap();
        let kept = read_metadata_from_bytes(&apply_metadata(&tagged_source, &tagged, &update).unwrap())
            .unwrap();
        let (lat, lon) = kept.gps_coordinates().unwrap();
        assert!((lat - 48.2).abs() < 1e-6);
        assert!((lon - 16.4).abs() < 1e-6);
    }

    #[test]
    fn test_datetime_and_device_backfill() {
        let make = primary(Tag::Make, ascii("Acme"));
        let original_time = primary(Tag::DateTimeOriginal, ascii("2020:01:01 00:00:00"));
        let source = insert_exif(&jpeg_bytes(8, 8), &[make, original_time], false).unwrap();
        let original = read_metadata_from_bytes(&source).unwrap();

        let update = MetadataUpdate {
            width: 8,
            height: 8,
            device: Some(DeviceInfo {
                make: "Other".to_string(),
                model: "Phone 3".to_string(),
                software: None,
            }),
            captured_at: Some(captured()),
            ..Default::default()
        };
        let meta = read_metadata_from_bytes(&apply_metadata(&source, &original, &update).unwrap())
            .unwrap();

        assert_eq!(meta.ascii(Tag::Make).as_deref(), Some("Acme"));
        assert_eq!(meta.ascii(Tag::Model).as_deref(), Some("Phone 3"));
        assert_eq!(
            meta.ascii(Tag::DateTimeOriginal).as_deref(),
            Some("2020:01:01 00:00:00")
        );
        assert_eq!(
            meta.ascii(Tag::DateTimeDigitized).as_deref(),
            Some("2024:03:09 08:15:00")
        );
        assert!(meta.field(Tag::Software).is_none());
    }

    #[test]
    fn test_write_back_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, jpeg_bytes(10, 5)).unwrap();

        let original = ImageMetadata::default();
        let update = MetadataUpdate {
            width: 10,
            height: 5,
            location: Some(LocationFix::new(-1.0, 1.0)),
            ..Default::default()
        };
        write_back(&path, &original, &update).unwrap();

        let meta = crate::metadata::read_metadata(&path).unwrap();
        assert_eq!(meta.pixel_dimensions(), Some((10, 5)));
        assert_eq!(meta.ascii(Tag::GPSLatitudeRef).as_deref(), Some("S"));
    }
}
