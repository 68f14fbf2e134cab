use crate::{
    config::Config,
    error::Error,
    footprint::{self, GroundFootprint},
    geodesy,
    metadata::NormalizedMetadata,
    pose::{self, CameraPose, LensModel},
};
use std::path::Path;

/// How far and which way the aircraft moved since the previous shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leg {
    pub distance_m: f64,
    pub bearing_deg: f64,
}

/// Everything the document builder needs about one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRecord {
    /// File name of the image inside its directory.
    pub filename: String,

    /// Short display label: the file stem without the vendor's prefix.
    pub label: String,

    /// Capture timestamp exactly as recorded, "YYYY:MM:DD HH:MM:SS".
    /// Kept as text: the format sorts chronologically as-is.
    pub taken_at: String,

    pub pose: CameraPose,
    pub lens: LensModel,
    pub footprint: GroundFootprint,

    /// Movement from the previous record. None on the first of a track.
    pub leg: Option<Leg>,
}

impl ImageRecord {
    /// Builds a record from one image file.
    ///
    /// Fails with [`Error::UnreadableMetadata`] when the image cannot place
    /// itself: no metadata block, no position fix, or no capture timestamp.
    pub fn read_from(path: &Path, cfg: &Config) -> Result<Self, Error> {
        let meta = NormalizedMetadata::from_file(path)?;
        let (pose, lens) = pose::resolve(&meta, cfg)?;

        let taken_at = meta
            .text("DateTime")
            .filter(|stamp| !stamp.is_empty())
            .ok_or_else(|| Error::unreadable("no capture timestamp"))?
            .to_string();

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = label_of(&filename);

        Ok(Self {
            filename,
            label,
            taken_at,
            pose,
            lens,
            footprint: footprint::project(&pose, &lens, cfg),
            leg: None,
        })
    }
}

/// The display label for an image file: its stem, without the counter
/// prefix DJI firmware puts on every file.
fn label_of(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);

    stem.strip_prefix("DJI_").unwrap_or(stem).to_string()
}

/// The images of one directory, ordered into a flight.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlightTrack {
    records: Vec<ImageRecord>,
}

impl FlightTrack {
    /// Orders records by capture time and measures the leg flown between
    /// each consecutive pair.
    ///
    /// The sort is stable, so burst shots with equal timestamps keep their
    /// input order.
    pub fn from_records(mut records: Vec<ImageRecord>) -> Self {
        records.sort_by(|a, b| a.taken_at.cmp(&b.taken_at));

        for i in 1..records.len() {
            let (distance_m, bearing_deg) = geodesy::distance_and_bearing(
                records[i - 1].pose.position(),
                records[i].pose.position(),
            );
            records[i].leg = Some(Leg {
                distance_m,
                bearing_deg,
            });
        }

        Self { records }
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    /// The latest record. It names the output document.
    pub fn last(&self) -> Option<&ImageRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
