#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunable constants for the projection of camera poses onto the ground.
///
/// Every field has a default that matches common survey flights, so most
/// callers just use [`Config::default`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Downward gimbal pitch in degrees substituted when the recorded pitch
    /// is missing, zero, or points at or above the horizon.
    pub default_pitch_deg: f64,

    /// Height of the assumed flat ground plane in meters above the takeoff
    /// point. Keeping it slightly above zero draws footprint lines over the
    /// terrain instead of under it.
    pub ground_height_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_pitch_deg: -45.0,
            ground_height_m: 2.0,
        }
    }
}
