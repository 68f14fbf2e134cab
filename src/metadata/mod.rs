use crate::error::Error;
use std::{collections::BTreeMap, path::Path};

pub mod container;
pub mod xmp;

/// Attributes that hold opaque vendor blobs and never carry pose data.
const DROPPED_ATTRS: &[&str] = &["MakerNote", "UserComment"];

/// Longest attribute text retained during normalization.
const MAX_TEXT_LEN: usize = 2000;

/// A single metadata value, reduced to the shapes the pose math consumes.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
}

impl Scalar {
    /// Reads the value as one number.
    ///
    /// Conversions that cannot produce a finite number resolve to 0.0 so a
    /// junk attribute reads the same as an absent one.
    pub fn to_f64(&self) -> f64 {
        match self {
            Scalar::Number(n) if n.is_finite() => *n,
            Scalar::Number(_) => 0.0,
            Scalar::Numbers(_) => 0.0,
            Scalar::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .unwrap_or(0.0),
        }
    }
}

/// An image's metadata attributes after every embedded source is folded into
/// one flat map.
///
/// Keys are bare attribute names: container tags keep their standard names
/// ("GPSLatitude", "Model") and XMP names lose their namespace prefixes, so
/// "drone-dji:RelativeAltitude" is found under "RelativeAltitude". When both
/// sources define a key, the XMP value wins. It is written by the vendor's
/// flight firmware and is the fresher of the two.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedMetadata {
    attrs: BTreeMap<String, Scalar>,
}

impl NormalizedMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every metadata source embedded in the image at `path`.
    ///
    /// Returns [`Error::UnreadableMetadata`] when the image has no GPS
    /// position attributes, since nothing useful can be derived without a
    /// fix.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let mut meta = Self::new();

        for (key, value) in container::flatten(path)? {
            meta.insert(key, value);
        }

        // The XMP packet is not always indexed by the container, so scan the
        // raw bytes for it. Merged second; its values overwrite.
        let bytes =
            std::fs::read(path).map_err(|e| Error::unreadable(format!("read: {e}")))?;
        if let Some(doc) = xmp::scan(&bytes) {
            for (key, value) in xmp::flatten(&doc)? {
                meta.insert(key, value);
            }
        }

        match meta.contains("GPSLatitude") && meta.contains("GPSLongitude") {
            true => Ok(meta),
            false => Err(Error::unreadable("no GPS position attributes")),
        }
    }

    /// Inserts an attribute, applying the retention policy.
    ///
    /// Attributes on the drop list and texts longer than the retention cap
    /// are discarded. Inserting an existing key overwrites it.
    pub fn insert(&mut self, key: impl Into<String>, value: Scalar) {
        let key = key.into();

        if DROPPED_ATTRS.contains(&key.as_str()) {
            return;
        }

        if let Scalar::Text(text) = &value {
            if text.len() > MAX_TEXT_LEN {
                return;
            }
        }

        self.attrs.insert(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.attrs.get(key)
    }

    /// Numeric view of an attribute.
    ///
    /// Absent attributes and failed conversions both read as 0.0, which is
    /// the sentinel every downstream default keys on.
    pub fn num(&self, key: &str) -> f64 {
        self.get(key).map(Scalar::to_f64).unwrap_or(0.0)
    }

    /// Text view of an attribute. Numeric attributes read as `None`.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(Scalar::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// The numeric components of an attribute, for angle triples like
    /// "GPSLatitude". A plain number reads as a single component.
    pub fn components(&self, key: &str) -> Option<Vec<f64>> {
        match self.get(key)? {
            Scalar::Number(n) => Some(vec![*n]),
            Scalar::Numbers(v) => Some(v.clone()),
            Scalar::Text(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl FromIterator<(String, Scalar)> for NormalizedMetadata {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        let mut meta = Self::new();
        for (key, value) in iter {
            meta.insert(key, value);
        }
        meta
    }
}
