use crate::{config::Config, error::Error, geodesy::GeoPoint, metadata::NormalizedMetadata};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 35 mm-equivalent focal length assumed when the image does not report one.
/// Wide-angle drone cameras cluster around this value.
const DEFAULT_FOCAL35_MM: f64 = 24.0;

/// Zoom factor substituted in the focal-in-pixels computation when the
/// recorded ratio reads "not applicable" (0.0).
const NOMINAL_ZOOM: f64 = 1.4;

const DEFAULT_SENSOR_WIDTH_PX: u32 = 4000;
const DEFAULT_SENSOR_HEIGHT_PX: u32 = 3000;

/// Where the camera was and where it pointed at the moment of exposure.
///
/// Angles are in degrees. The azimuth is compass-style: clockwise from
/// north on [0, 360). Pitch is negative below the horizon, so a camera
/// looking straight down reads -90.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraPose {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
    pub azimuth_deg: f64,
    pub pitch_deg: f64,
}

impl CameraPose {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat_deg, self.lon_deg)
    }
}

/// The lens geometry needed to cast rays through the image corners.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LensModel {
    /// 35 mm-equivalent focal length in millimeters.
    pub focal35_mm: f64,

    /// Digital zoom ratio, 0.0 when the camera reports none.
    pub zoom: f64,

    /// Image frame size in pixels.
    pub width_px: u32,
    pub height_px: u32,
}

impl LensModel {
    /// The focal length expressed in pixels on this sensor.
    ///
    /// Scales the 35 mm-equivalent focal length by the ratio of the frame
    /// diagonal in pixels to the full-frame diagonal (sqrt(36^2 + 24^2) mm).
    pub fn focal_px(&self) -> f64 {
        let zoom = match self.zoom > 0.0 {
            true => self.zoom,
            false => NOMINAL_ZOOM,
        };
        let diag35_mm = (36.0f64.powi(2) + 24.0f64.powi(2)).sqrt();
        let diag_px = ((self.width_px as f64).powi(2) + (self.height_px as f64).powi(2)).sqrt();

        self.focal35_mm * zoom / diag35_mm * diag_px
    }

    /// Angle subtended by one pixel at the image center, in degrees.
    pub fn pixel_angle_deg(&self) -> f64 {
        (1.0 / self.focal_px()).atan().to_degrees()
    }
}

impl Default for LensModel {
    fn default() -> Self {
        Self {
            focal35_mm: DEFAULT_FOCAL35_MM,
            zoom: 0.0,
            width_px: DEFAULT_SENSOR_WIDTH_PX,
            height_px: DEFAULT_SENSOR_HEIGHT_PX,
        }
    }
}

/// Attribute-name and calibration overrides for camera models whose
/// metadata departs from the common layout.
#[derive(Debug)]
struct ModelQuirks {
    yaw_key: Option<&'static str>,
    pitch_key: Option<&'static str>,
    altitude_keys: Option<(&'static str, &'static str)>,
    focal35_mm: Option<f64>,
    broken_zoom: bool,
}

const MODEL_QUIRKS: &[(&str, ModelQuirks)] = &[
    // Autel EVO II: gimbal attitude lives under the bare Camera namespace,
    // height above ground comes from the rangefinder pair, and the reported
    // focal length already folds the digital zoom in.
    (
        "XT701",
        ModelQuirks {
            yaw_key: Some("Yaw"),
            pitch_key: Some("Pitch"),
            altitude_keys: Some(("AboveGroundAltitude", "TargetAbsAltitude")),
            focal35_mm: None,
            broken_zoom: true,
        },
    ),
    // Mavic Pro: the reported 35 mm focal length measures short.
    (
        "FC220",
        ModelQuirks {
            yaw_key: None,
            pitch_key: None,
            altitude_keys: None,
            focal35_mm: Some(26.0),
            broken_zoom: false,
        },
    ),
];

fn quirks_for(model: Option<&str>) -> Option<&'static ModelQuirks> {
    let model = model?.trim();
    MODEL_QUIRKS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, quirks)| quirks)
}

/// Resolves normalized metadata into a camera pose and lens model,
/// defaulting every attribute a camera is allowed to omit.
///
/// Fails with [`Error::UnreadableMetadata`] when the position angles are
/// missing or the longitude reads exactly 0.0, the value cameras write
/// before their GPS has a fix.
pub fn resolve(meta: &NormalizedMetadata, cfg: &Config) -> Result<(CameraPose, LensModel), Error> {
    let quirks = quirks_for(meta.text("Model"));

    let lat_deg = angle_of(meta, "GPSLatitude", "GPSLatitudeRef", "S")?;
    let lon_deg = angle_of(meta, "GPSLongitude", "GPSLongitudeRef", "W")?;
    if lon_deg == 0.0 {
        return Err(Error::unreadable("longitude 0.0 means the GPS had no fix"));
    }

    let alt_m = match quirks.and_then(|q| q.altitude_keys) {
        Some((above_ground, target_abs)) => meta.num(above_ground) - meta.num(target_abs),
        None => meta.num("RelativeAltitude"),
    };

    let pose = CameraPose {
        lat_deg,
        lon_deg,
        alt_m,
        azimuth_deg: azimuth_of(meta, quirks),
        pitch_deg: pitch_of(meta, quirks, cfg),
    };

    Ok((pose, lens_of(meta, quirks)))
}

/// Reads a positioning angle stored as degree/minute/second components,
/// negated when its hemisphere reference points south or west.
fn angle_of(
    meta: &NormalizedMetadata,
    key: &str,
    ref_key: &str,
    negative_ref: &str,
) -> Result<f64, Error> {
    let parts = meta
        .components(key)
        .ok_or_else(|| Error::unreadable(format!("no {key} angle")))?;

    let part = |i: usize| parts.get(i).copied().unwrap_or(0.0);
    let degrees = part(0) + part(1) / 60.0 + part(2) / 3600.0;

    match meta.text(ref_key) == Some(negative_ref) {
        true => Ok(-degrees),
        false => Ok(degrees),
    }
}

/// The compass azimuth of the shot on [0, 360).
///
/// The gimbal yaw is preferred since it tracks where the camera points, but
/// it reads absent-or-zero on fixed-gimbal frames, where the aircraft yaw
/// stands in.
fn azimuth_of(meta: &NormalizedMetadata, quirks: Option<&ModelQuirks>) -> f64 {
    let candidates = [
        quirks.and_then(|q| q.yaw_key),
        Some("GimbalYawDegree"),
        Some("FlightYawDegree"),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(|key| meta.num(key))
        .find(|&yaw| yaw != 0.0)
        .unwrap_or(0.0)
        .rem_euclid(360.0)
}

/// The gimbal pitch, or the configured default when the recorded value is
/// missing, zero, or points at or above the horizon. Cameras that failed to
/// record a pitch overwhelmingly shot obliques, not panoramas.
fn pitch_of(meta: &NormalizedMetadata, quirks: Option<&ModelQuirks>, cfg: &Config) -> f64 {
    let key = quirks
        .and_then(|q| q.pitch_key)
        .unwrap_or("GimbalPitchDegree");
    let pitch = meta.num(key);

    match pitch < 0.0 {
        true => pitch,
        false => cfg.default_pitch_deg,
    }
}

fn lens_of(meta: &NormalizedMetadata, quirks: Option<&ModelQuirks>) -> LensModel {
    let focal35_mm = match quirks.and_then(|q| q.focal35_mm) {
        Some(corrected) => corrected,
        None => match meta.num("FocalLengthIn35mmFilm") {
            f if f > 0.0 => f,
            _ => DEFAULT_FOCAL35_MM,
        },
    };

    let zoom = match quirks.map(|q| q.broken_zoom).unwrap_or(false) {
        true => 0.0,
        false => meta.num("DigitalZoomRatio"),
    };

    LensModel {
        focal35_mm,
        zoom,
        width_px: dimension(meta, "PixelXDimension", "ImageWidth", DEFAULT_SENSOR_WIDTH_PX),
        height_px: dimension(meta, "PixelYDimension", "ImageLength", DEFAULT_SENSOR_HEIGHT_PX),
    }
}

fn dimension(meta: &NormalizedMetadata, primary: &str, fallback: &str, default: u32) -> u32 {
    [primary, fallback]
        .into_iter()
        .map(|key| meta.num(key))
        .find(|&px| px > 0.0)
        .map(|px| px as u32)
        .unwrap_or(default)
}
