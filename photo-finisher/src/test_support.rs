//! Fixture builders shared by the unit tests.

use exif::{Field, In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::exif_writer::insert_exif;

/// A gradient image, so resampling and rotation have something to move.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Baseline JPEG with no metadata at all.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    out
}

pub fn orientation_field(value: u32) -> Field {
    Field {
        tag: Tag::Orientation,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![value as u16]),
    }
}

/// Writes a `width` x `height` JPEG carrying `fields` into `dir`.
pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32, fields: &[Field]) -> PathBuf {
    let mut bytes = jpeg_bytes(width, height);
    if !fields.is_empty() {
        bytes = insert_exif(&bytes, fields, false).unwrap();
    }
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn sha256_of(path: &Path) -> Vec<u8> {
    Sha256::digest(std::fs::read(path).unwrap()).to_vec()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
