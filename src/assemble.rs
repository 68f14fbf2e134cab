use crate::{
    footprint::GroundPoint,
    kml::{
        self, AltitudeMode, Coord, Feature, Folder, Geometry, LineStyle, NetworkLink, Placemark,
        Style,
    },
    track::{FlightTrack, ImageRecord},
};
use chrono::NaiveDateTime;

/// Builds the per-directory KML document: flight path, shooting directions,
/// shooting frames, and a folder of image markers, in that order.
pub fn document(track: &FlightTrack) -> kml::Document {
    kml::Document {
        name: None,
        styles: vec![
            line_style("shootline", "7f0000ff", None),
            line_style("shootside", "7fffff00", None),
            line_style("flightline", "7fff0000", Some(3)),
        ],
        features: vec![
            Feature::Placemark(flight_path(track)),
            Feature::Placemark(shooting_directions(track)),
            Feature::Placemark(shooting_frames(track)),
            Feature::Folder(image_folder(track)),
        ],
    }
}

/// The document file name, derived from the track's latest capture
/// timestamp: colons become hyphens, underscores become a `T`.
pub fn document_name(track: &FlightTrack) -> Option<String> {
    let stamp = &track.last()?.taken_at;
    Some(format!(
        "drone_{}.kml",
        stamp.replace(':', "-").replace('_', "T")
    ))
}

/// Builds the root index document: one link per produced per-directory
/// document, as (display name, relative href) pairs.
pub fn index_document(links: &[(String, String)]) -> kml::Document {
    kml::Document {
        name: Some("drone flights".into()),
        styles: Vec::new(),
        features: links
            .iter()
            .map(|(name, href)| {
                Feature::NetworkLink(NetworkLink {
                    name: name.clone(),
                    href: href.clone(),
                })
            })
            .collect(),
    }
}

fn line_style(id: &str, color: &str, width: Option<u32>) -> Style {
    Style {
        id: id.into(),
        line: LineStyle {
            color: color.into(),
            width,
        },
    }
}

/// One line through every camera position in capture order, drawn at
/// altitude.
fn flight_path(track: &FlightTrack) -> Placemark {
    let coords = track.records().iter().map(camera_coord).collect();

    Placemark {
        name: "flight".into(),
        style_url: Some("#flightline".into()),
        description: None,
        time_stamp: None,
        geometry: Geometry::Multi(vec![Geometry::LineString {
            coords,
            altitude_mode: Some(AltitudeMode::RelativeToGround),
        }]),
    }
}

/// One ground-level line per shot from the camera toward where it looked.
fn shooting_directions(track: &FlightTrack) -> Placemark {
    let parts = track
        .records()
        .iter()
        .map(|record| Geometry::LineString {
            coords: vec![
                flat_coord(record.footprint.camera()),
                flat_coord(record.footprint.forward()),
            ],
            altitude_mode: None,
        })
        .collect();

    Placemark {
        name: "shooting directions".into(),
        style_url: Some("#shootline".into()),
        description: None,
        time_stamp: None,
        geometry: Geometry::Multi(parts),
    }
}

/// One closed outline per shot tracing its ground footprint.
fn shooting_frames(track: &FlightTrack) -> Placemark {
    let parts = track
        .records()
        .iter()
        .map(|record| Geometry::LineString {
            coords: record.footprint.points().iter().map(ground_coord).collect(),
            altitude_mode: Some(AltitudeMode::RelativeToGround),
        })
        .collect();

    Placemark {
        name: "shooting frames".into(),
        style_url: Some("#shootside".into()),
        description: None,
        time_stamp: None,
        geometry: Geometry::Multi(parts),
    }
}

/// One extruded marker per image, with the image and its shot facts in the
/// balloon.
fn image_folder(track: &FlightTrack) -> Folder {
    Folder {
        name: "Drone images".into(),
        features: track
            .records()
            .iter()
            .map(|record| {
                Feature::Placemark(Placemark {
                    name: record.label.clone(),
                    style_url: None,
                    description: Some(description_of(record)),
                    time_stamp: time_stamp_of(&record.taken_at),
                    geometry: Geometry::Point {
                        coord: camera_coord(record),
                        extrude: true,
                        altitude_mode: Some(AltitudeMode::RelativeToGround),
                    },
                })
            })
            .collect(),
    }
}

/// The balloon HTML: the image itself, sized down, then one line of shot
/// facts. Viewers open the image relative to the document, which is why the
/// document is written into the image directory.
fn description_of(record: &ImageRecord) -> String {
    let mut html = format!(
        r#"<img style="max-width:500px;" src="{}">"#,
        record.filename
    );

    html.push_str(&format!(
        "<br/>alt {:.1} m, azimuth {:.1}°, pitch {:.1}°, pixel {:.4}°",
        record.pose.alt_m,
        record.pose.azimuth_deg,
        record.pose.pitch_deg,
        record.lens.pixel_angle_deg(),
    ));

    if let Some(leg) = record.leg {
        html.push_str(&format!(
            "<br/>{:.1} m at {:.0}° from previous shot",
            leg.distance_m, leg.bearing_deg
        ));
    }

    html
}

/// The capture stamp as an ISO 8601 instant, or None when it does not
/// parse. A marker without a TimeStamp just sits outside the time slider.
fn time_stamp_of(taken_at: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(taken_at, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|stamp| stamp.format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn camera_coord(record: &ImageRecord) -> Coord {
    Coord {
        lon_deg: record.pose.lon_deg,
        lat_deg: record.pose.lat_deg,
        alt_m: Some(record.pose.alt_m),
    }
}

fn flat_coord(point: GroundPoint) -> Coord {
    Coord {
        lon_deg: point.lon_deg,
        lat_deg: point.lat_deg,
        alt_m: None,
    }
}

fn ground_coord(point: &GroundPoint) -> Coord {
    Coord {
        lon_deg: point.lon_deg,
        lat_deg: point.lat_deg,
        alt_m: Some(point.alt_m),
    }
}
