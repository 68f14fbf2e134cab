use crate::{error::Error, metadata::Scalar};
use exif::{In, Reader, Value};
use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

/// Reads the image's container metadata and flattens every field of the
/// primary image into name/scalar pairs.
///
/// Field names are the standard tag names ("GPSLatitude", "DateTime") so
/// they key the same attributes across camera vendors. A file without a
/// metadata block reads as [`Error::UnreadableMetadata`].
pub fn flatten(path: &Path) -> Result<BTreeMap<String, Scalar>, Error> {
    let file = File::open(path).map_err(|e| Error::unreadable(format!("open: {e}")))?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(&file))
        .map_err(|e| Error::unreadable(format!("container metadata: {e}")))?;

    let mut attrs = BTreeMap::new();
    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        if let Some(scalar) = scalar_of(&field.value) {
            attrs.insert(field.tag.to_string(), scalar);
        }
    }

    Ok(attrs)
}

/// Reduces a raw field value to a [`Scalar`], or `None` for the opaque
/// variants that have no scalar reading.
fn scalar_of(value: &Value) -> Option<Scalar> {
    match value {
        Value::Byte(v) => pack(v.iter().map(|&n| n.into()).collect()),
        Value::Short(v) => pack(v.iter().map(|&n| n.into()).collect()),
        Value::Long(v) => pack(v.iter().map(|&n| n.into()).collect()),
        Value::SByte(v) => pack(v.iter().map(|&n| n.into()).collect()),
        Value::SShort(v) => pack(v.iter().map(|&n| n.into()).collect()),
        Value::SLong(v) => pack(v.iter().map(|&n| n.into()).collect()),
        Value::Float(v) => pack(v.iter().map(|&n| n.into()).collect()),
        Value::Double(v) => pack(v.clone()),
        Value::Rational(v) => pack(v.iter().map(|r| r.to_f64()).collect()),
        Value::SRational(v) => pack(v.iter().map(|r| r.to_f64()).collect()),
        Value::Ascii(lines) => {
            let text = lines
                .iter()
                .map(|line| String::from_utf8_lossy(line).into_owned())
                .collect::<Vec<_>>()
                .join("\n");

            // Ascii fields are NUL padded to their declared length.
            let text = text.trim_end_matches(['\0', ' ']).to_string();
            Some(Scalar::Text(text))
        }
        Value::Undefined(..) | Value::Unknown(..) => None,
    }
}

/// Folds a list of numbers into a [`Scalar`], squashing the non-finite
/// readings a zero denominator produces down to 0.0.
fn pack(mut nums: Vec<f64>) -> Option<Scalar> {
    for n in &mut nums {
        if !n.is_finite() {
            *n = 0.0;
        }
    }

    match nums.len() {
        0 => None,
        1 => Some(Scalar::Number(nums[0])),
        _ => Some(Scalar::Numbers(nums)),
    }
}
