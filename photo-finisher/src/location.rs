use chrono::{DateTime, Datelike, Timelike, Utc};
use exif::{Field, In, Rational, Tag, Value};
use serde::{Deserialize, Serialize};

/// A position fix used to backfill GPS tags on photos that lack them
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub altitude: Option<f64>,
    /// Meters per second
    pub speed: Option<f64>,
    /// Degrees clockwise from true north
    pub bearing: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Camera make/model written when the capture didn't record them
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub make: String,
    pub model: String,
    pub software: Option<String>,
}

// Arc-seconds are stored with millisecond precision
const SECONDS_DENOMINATOR: u32 = 1000;

/// Splits an absolute coordinate into degree/minute/second rationals.
pub fn to_dms(coordinate: f64) -> [Rational; 3] {
    let total_millis = (coordinate.abs() * 3600.0 * SECONDS_DENOMINATOR as f64).round() as u64;
    let per_degree = 3600 * SECONDS_DENOMINATOR as u64;
    let per_minute = 60 * SECONDS_DENOMINATOR as u64;

    let degrees = total_millis / per_degree;
    let minutes = (total_millis % per_degree) / per_minute;
    let millis = total_millis % per_minute;

    [
        rational(degrees as u32, 1),
        rational(minutes as u32, 1),
        rational(millis as u32, SECONDS_DENOMINATOR),
    ]
}

/// Reassembles a coordinate from DMS rationals and its hemisphere ref.
pub fn from_dms(dms: &[Rational], reference: &str) -> Option<f64> {
    if dms.len() < 3 || dms.iter().any(|r| r.denom == 0) {
        return None;
    }
    let value = dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0;
    match reference.trim() {
        "S" | "W" => Some(-value),
        _ => Some(value),
    }
}

fn rational(num: u32, denom: u32) -> Rational {
    Rational { num, denom }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn gps_field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn decimal(value: f64, denom: u32) -> Rational {
    rational((value.abs() * denom as f64).round() as u32, denom)
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    /// The GPS IFD fields for this fix.
    pub fn to_exif_fields(&self) -> Vec<Field> {
        let lat_ref = if self.latitude < 0.0 { "S" } else { "N" };
        let lon_ref = if self.longitude < 0.0 { "W" } else { "E" };

        let mut fields = vec![
            gps_field(Tag::GPSVersionID, Value::Byte(vec![2, 2, 0, 0])),
            gps_field(Tag::GPSLatitudeRef, ascii(lat_ref)),
            gps_field(Tag::GPSLatitude, Value::Rational(to_dms(self.latitude).to_vec())),
            gps_field(Tag::GPSLongitudeRef, ascii(lon_ref)),
            gps_field(
                Tag::GPSLongitude,
                Value::Rational(to_dms(self.longitude).to_vec()),
            ),
        ];

        if let Some(altitude) = self.altitude {
            let below_sea_level = if altitude < 0.0 { 1 } else { 0 };
            fields.push(gps_field(Tag::GPSAltitudeRef, Value::Byte(vec![below_sea_level])));
            fields.push(gps_field(
                Tag::GPSAltitude,
                Value::Rational(vec![decimal(altitude, 100)]),
            ));
        }

        if let Some(speed) = self.speed {
            // K = km/h
            fields.push(gps_field(Tag::GPSSpeedRef, ascii("K")));
            fields.push(gps_field(
                Tag::GPSSpeed,
                Value::Rational(vec![decimal(speed * 3.6, 100)]),
            ));
        }

        if let Some(bearing) = self.bearing {
            fields.push(gps_field(Tag::GPSImgDirectionRef, ascii("T")));
            fields.push(gps_field(
                Tag::GPSImgDirection,
                Value::Rational(vec![decimal(bearing.rem_euclid(360.0), 100)]),
            ));
        }

        if let Some(timestamp) = self.timestamp {
            fields.push(gps_field(
                Tag::GPSTimeStamp,
                Value::Rational(vec![
                    rational(timestamp.hour(), 1),
                    rational(timestamp.minute(), 1),
                    rational(timestamp.second(), 1),
                ]),
            ));
            fields.push(gps_field(
                Tag::GPSDateStamp,
                ascii(&format!(
                    "{:04}:{:02}:{:02}",
                    timestamp.year(),
                    timestamp.month(),
                    timestamp.day()
                )),
            ));
        }

        fields
    }
}
