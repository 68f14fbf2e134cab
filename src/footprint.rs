use crate::{
    config::Config,
    geodesy::{self, GeoPoint},
    pose::{CameraPose, LensModel},
};
use nalgebra::{Rotation3, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length every viewing ray is scaled to before grounding, in meters.
pub const NOMINAL_RAY_M: f64 = 50.0;

/// Length a ray keeps when it cannot reach the ground plane, in meters.
/// Long enough to read as "off into the sky" next to a real footprint.
pub const SKY_RAY_M: f64 = 500.0;

/// A point of a footprint: a position over the terrain with the altitude
/// the outline is drawn at.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroundPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
}

impl GroundPoint {
    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.lat_deg, self.lon_deg)
    }
}

/// The ground coverage of one shot, drawn as a six point outline.
///
/// The order is fixed: the camera's own position, the point the frame
/// center looks at, then the bottom-left, top-left, and top-right frame
/// corners, and the bottom-left corner once more to close the loop.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroundFootprint {
    points: [GroundPoint; 6],
}

impl GroundFootprint {
    pub fn points(&self) -> &[GroundPoint; 6] {
        &self.points
    }

    /// The camera's own position.
    pub fn camera(&self) -> GroundPoint {
        self.points[0]
    }

    /// Where the center of the frame looks.
    pub fn forward(&self) -> GroundPoint {
        self.points[1]
    }

    /// The closed frame outline, bottom-left through top-right and back.
    pub fn frame(&self) -> &[GroundPoint] {
        &self.points[2..6]
    }
}

/// Projects a camera pose onto the assumed flat ground plane.
///
/// Projection never fails: poses that cannot reach the ground produce sky
/// rays of [`SKY_RAY_M`] instead, and every malformed attribute has already
/// been defaulted upstream.
pub fn project(pose: &CameraPose, lens: &LensModel, cfg: &Config) -> GroundFootprint {
    let attitude = attitude(pose);
    let dz = cfg.ground_height_m - pose.alt_m;

    let forward = ground(pose, attitude * forward_ray(), dz);
    let corners = corner_rays(lens).map(|ray| ground(pose, attitude * ray, dz));

    let camera = GroundPoint {
        lat_deg: pose.lat_deg,
        lon_deg: pose.lon_deg,
        alt_m: pose.alt_m,
    };

    GroundFootprint {
        points: [
            camera, forward, corners[0], corners[1], corners[2], corners[0],
        ],
    }
}

/// Rotation taking camera coordinates (x right, y forward, z up) into the
/// local east/north/up frame.
///
/// Pitch tilts the frame about the lateral axis first, then the azimuth
/// swings it about the vertical. Compass azimuths run clockwise from north,
/// opposite the right-handed sense about up, hence the negation.
fn attitude(pose: &CameraPose) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), -pose.azimuth_deg.to_radians())
        * Rotation3::from_axis_angle(&Vector3::x_axis(), pose.pitch_deg.to_radians())
}

/// The ray through the frame center, scaled to [`NOMINAL_RAY_M`].
fn forward_ray() -> Vector3<f64> {
    Vector3::new(0.0, NOMINAL_RAY_M, 0.0)
}

/// Rays through the frame corners in camera coordinates, scaled to
/// [`NOMINAL_RAY_M`]: bottom-left, top-left, top-right, bottom-right.
fn corner_rays(lens: &LensModel) -> [Vector3<f64>; 4] {
    let half_w = lens.width_px as f64 / 2.0;
    let half_h = lens.height_px as f64 / 2.0;
    let focal_px = lens.focal_px();

    [
        Vector3::new(-half_w, focal_px, -half_h),
        Vector3::new(-half_w, focal_px, half_h),
        Vector3::new(half_w, focal_px, half_h),
        Vector3::new(half_w, focal_px, -half_h),
    ]
    .map(|ray| ray.normalize() * NOMINAL_RAY_M)
}

/// Stretches a ray until its tip reaches `dz` below the camera, or keeps a
/// [`SKY_RAY_M`] ray when the ray cannot get there (it runs level or away
/// from the ground plane).
fn normalize_z(ray: Vector3<f64>, dz: f64) -> Vector3<f64> {
    match ray.z * dz > 0.0 {
        true => ray * (dz / ray.z),
        false => ray.normalize() * SKY_RAY_M,
    }
}

/// Grounds a ray: stretches it to the ground plane and walks its east and
/// north components from the camera as geodesic offsets.
fn ground(pose: &CameraPose, ray: Vector3<f64>, dz: f64) -> GroundPoint {
    let ray = normalize_z(ray, dz);

    let east = geodesy::destination(pose.position(), 90.0, ray.x);
    let tip = geodesy::destination(east, 0.0, ray.y);

    GroundPoint {
        lat_deg: tip.lat_deg,
        lon_deg: tip.lon_deg,
        alt_m: pose.alt_m + ray.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck::quickcheck;
    use rstest::rstest;

    fn kingston_pose(azimuth_deg: f64, pitch_deg: f64, alt_m: f64) -> CameraPose {
        CameraPose {
            lat_deg: 44.2187,
            lon_deg: -76.4747,
            alt_m,
            azimuth_deg,
            pitch_deg,
        }
    }

    /// Horizontal meters and vertical meters from the camera to a point.
    fn offset_from(pose: &CameraPose, point: GroundPoint) -> (f64, f64) {
        let (horizontal, _) = geodesy::distance_and_bearing(pose.position(), point.geo());
        (horizontal, point.alt_m - pose.alt_m)
    }

    #[test]
    fn the_outline_closes_on_the_bottom_left_corner() {
        let pose = kingston_pose(15.0, -52.1, 30.2);
        let fp = project(&pose, &LensModel::default(), &Config::default());

        assert_eq!(fp.points()[5], fp.points()[2]);
        assert_eq!(fp.frame().first(), fp.frame().last());
    }

    #[test]
    fn the_first_point_is_the_camera_itself() {
        let pose = kingston_pose(15.0, -52.1, 30.2);
        let fp = project(&pose, &LensModel::default(), &Config::default());

        assert_relative_eq!(fp.camera().lat_deg, pose.lat_deg);
        assert_relative_eq!(fp.camera().lon_deg, pose.lon_deg);
        assert_relative_eq!(fp.camera().alt_m, pose.alt_m);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(90.0, 90.0)]
    #[case(123.4, 123.4)]
    #[case(270.0, 270.0)]
    fn the_forward_point_lies_along_the_azimuth(
        #[case] azimuth_deg: f64,
        #[case] expect_bearing_deg: f64,
    ) {
        let pose = kingston_pose(azimuth_deg, -45.0, 30.2);
        let fp = project(&pose, &LensModel::default(), &Config::default());

        let (_, bearing) = geodesy::distance_and_bearing(pose.position(), fp.forward().geo());

        assert_relative_eq!(bearing, expect_bearing_deg, epsilon = 1e-6);
    }

    #[test]
    fn a_45_degree_oblique_grounds_one_altitude_away() {
        let pose = kingston_pose(0.0, -45.0, 30.2);
        let cfg = Config::default();
        let fp = project(&pose, &LensModel::default(), &cfg);

        // tan(45) = 1: the forward ray lands as far north as it drops.
        let (horizontal, vertical) = offset_from(&pose, fp.forward());

        assert_relative_eq!(horizontal, 28.2, max_relative = 1e-4);
        assert_relative_eq!(vertical, -28.2, max_relative = 1e-9);
        assert_relative_eq!(fp.forward().alt_m, cfg.ground_height_m);
    }

    #[test]
    fn skyward_rays_keep_a_long_fixed_length() {
        // Pitch so shallow the top corners clear the horizon.
        let pose = kingston_pose(0.0, -1.0, 30.2);
        let fp = project(&pose, &LensModel::default(), &Config::default());

        for &point in &fp.points()[3..5] {
            let (horizontal, vertical) = offset_from(&pose, point);
            let length = (horizontal.powi(2) + vertical.powi(2)).sqrt();

            assert!(vertical > 0.0);
            assert_relative_eq!(length, SKY_RAY_M, max_relative = 1e-4);
        }
    }

    #[test]
    fn a_camera_on_the_ground_plane_has_no_reachable_footprint() {
        let cfg = Config::default();
        let pose = kingston_pose(0.0, -45.0, cfg.ground_height_m);
        let fp = project(&pose, &LensModel::default(), &cfg);

        for &point in &fp.points()[1..] {
            let (horizontal, vertical) = offset_from(&pose, point);
            let length = (horizontal.powi(2) + vertical.powi(2)).sqrt();

            assert_relative_eq!(length, SKY_RAY_M, max_relative = 1e-4);
        }
    }

    #[test]
    fn corners_sit_left_and_right_of_the_flight_line() {
        // Looking due north: bottom-left lands west, top-right lands east,
        // and the top corner grounds farther out than the bottom one.
        let pose = kingston_pose(0.0, -45.0, 30.2);
        let fp = project(&pose, &LensModel::default(), &Config::default());
        let [_, _, bottom_left, top_left, top_right, _] = *fp.points();

        assert!(bottom_left.lon_deg < pose.lon_deg);
        assert!(top_right.lon_deg > pose.lon_deg);

        let (near, _) = offset_from(&pose, bottom_left);
        let (far, _) = offset_from(&pose, top_left);
        assert!(near < far);
    }

    quickcheck! {
        /// Aim to have the same number of cases on either side of zero.
        fn every_footprint_closes_and_stays_finite(
            lat_seed: i16,
            lon_seed: i16,
            azimuth_seed: u16,
            pitch_seed: i16,
            alt_seed: u16
        ) -> bool {
            // Scale the seeds onto plausible flights: latitudes away from
            // the poles, any azimuth, any pitch a gimbal can reach, and
            // altitudes up to a few hundred meters.
            let pose = CameraPose {
                lat_deg: lat_seed as f64 / i16::MAX as f64 * 80.0,
                lon_deg: lon_seed as f64 / i16::MAX as f64 * 179.9,
                alt_m: alt_seed as f64 / 100.0,
                azimuth_deg: azimuth_seed as f64 / u16::MAX as f64 * 359.9,
                pitch_deg: pitch_seed as f64 / i16::MAX as f64 * 90.0,
            };
            let fp = project(&pose, &LensModel::default(), &Config::default());

            let closes = fp.points()[5] == fp.points()[2];
            let finite = fp
                .points()
                .iter()
                .all(|p| p.lat_deg.is_finite() && p.lon_deg.is_finite() && p.alt_m.is_finite());

            closes && finite
        }
    }
}
