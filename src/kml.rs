use crate::error::Error;
use quick_xml::{
    Writer,
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::{fmt, io};

pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// A KML document: optional name, shared styles, then features in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub name: Option<String>,
    pub styles: Vec<Style>,
    pub features: Vec<Feature>,
}

/// A shared line style, referenced from placemarks as `#id`.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    pub id: String,
    pub line: LineStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    /// KML byte order: aabbggrr hex.
    pub color: String,
    pub width: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Feature {
    Placemark(Placemark),
    Folder(Folder),
    NetworkLink(NetworkLink),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Folder {
    pub name: String,
    pub features: Vec<Feature>,
}

/// A link pulling another KML file into the viewer.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkLink {
    pub name: String,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placemark {
    pub name: String,
    pub style_url: Option<String>,
    /// HTML fragment shown in the placemark balloon. Serialized as CDATA.
    pub description: Option<String>,
    /// ISO 8601 instant for the viewer's time slider.
    pub time_stamp: Option<String>,
    pub geometry: Geometry,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point {
        coord: Coord,
        extrude: bool,
        altitude_mode: Option<AltitudeMode>,
    },
    LineString {
        coords: Vec<Coord>,
        altitude_mode: Option<AltitudeMode>,
    },
    Multi(Vec<Geometry>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AltitudeMode {
    ClampToGround,
    RelativeToGround,
    Absolute,
}

impl AltitudeMode {
    fn as_str(&self) -> &'static str {
        match self {
            AltitudeMode::ClampToGround => "clampToGround",
            AltitudeMode::RelativeToGround => "relativeToGround",
            AltitudeMode::Absolute => "absolute",
        }
    }
}

/// One coordinate tuple. KML orders them longitude first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coord {
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub alt_m: Option<f64>,
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alt_m {
            Some(alt_m) => write!(f, "{},{},{}", self.lon_deg, self.lat_deg, alt_m),
            None => write!(f, "{},{}", self.lon_deg, self.lat_deg),
        }
    }
}

/// Serializes a document as UTF-8 KML with an XML declaration.
pub fn write_document<W: io::Write>(out: W, doc: &Document) -> Result<(), Error> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut kml = BytesStart::new("kml");
    kml.push_attribute(("xmlns", KML_NAMESPACE));
    writer.write_event(Event::Start(kml))?;
    writer.write_event(Event::Start(BytesStart::new("Document")))?;

    if let Some(name) = &doc.name {
        text_element(&mut writer, "name", name)?;
    }
    for style in &doc.styles {
        write_style(&mut writer, style)?;
    }
    for feature in &doc.features {
        write_feature(&mut writer, feature)?;
    }

    writer.write_event(Event::End(BytesEnd::new("Document")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;
    Ok(())
}

fn write_style<W: io::Write>(writer: &mut Writer<W>, style: &Style) -> Result<(), Error> {
    let mut start = BytesStart::new("Style");
    start.push_attribute(("id", style.id.as_str()));
    writer.write_event(Event::Start(start))?;

    writer.write_event(Event::Start(BytesStart::new("LineStyle")))?;
    text_element(writer, "color", &style.line.color)?;
    if let Some(width) = style.line.width {
        text_element(writer, "width", &width.to_string())?;
    }
    writer.write_event(Event::End(BytesEnd::new("LineStyle")))?;

    writer.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}

fn write_feature<W: io::Write>(writer: &mut Writer<W>, feature: &Feature) -> Result<(), Error> {
    match feature {
        Feature::Placemark(placemark) => write_placemark(writer, placemark),
        Feature::Folder(folder) => {
            writer.write_event(Event::Start(BytesStart::new("Folder")))?;
            text_element(writer, "name", &folder.name)?;
            for feature in &folder.features {
                write_feature(writer, feature)?;
            }
            writer.write_event(Event::End(BytesEnd::new("Folder")))?;
            Ok(())
        }
        Feature::NetworkLink(link) => {
            writer.write_event(Event::Start(BytesStart::new("NetworkLink")))?;
            text_element(writer, "name", &link.name)?;
            writer.write_event(Event::Start(BytesStart::new("Link")))?;
            text_element(writer, "href", &link.href)?;
            writer.write_event(Event::End(BytesEnd::new("Link")))?;
            writer.write_event(Event::End(BytesEnd::new("NetworkLink")))?;
            Ok(())
        }
    }
}

fn write_placemark<W: io::Write>(
    writer: &mut Writer<W>,
    placemark: &Placemark,
) -> Result<(), Error> {
    writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
    text_element(writer, "name", &placemark.name)?;

    if let Some(style_url) = &placemark.style_url {
        text_element(writer, "styleUrl", style_url)?;
    }
    if let Some(description) = &placemark.description {
        writer.write_event(Event::Start(BytesStart::new("description")))?;
        writer.write_event(Event::CData(BytesCData::new(description.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new("description")))?;
    }
    if let Some(when) = &placemark.time_stamp {
        writer.write_event(Event::Start(BytesStart::new("TimeStamp")))?;
        text_element(writer, "when", when)?;
        writer.write_event(Event::End(BytesEnd::new("TimeStamp")))?;
    }

    write_geometry(writer, &placemark.geometry)?;
    writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
    Ok(())
}

fn write_geometry<W: io::Write>(writer: &mut Writer<W>, geometry: &Geometry) -> Result<(), Error> {
    match geometry {
        Geometry::Point {
            coord,
            extrude,
            altitude_mode,
        } => {
            writer.write_event(Event::Start(BytesStart::new("Point")))?;
            if *extrude {
                text_element(writer, "extrude", "1")?;
            }
            if let Some(mode) = altitude_mode {
                text_element(writer, "altitudeMode", mode.as_str())?;
            }
            text_element(writer, "coordinates", &coord.to_string())?;
            writer.write_event(Event::End(BytesEnd::new("Point")))?;
        }
        Geometry::LineString {
            coords,
            altitude_mode,
        } => {
            writer.write_event(Event::Start(BytesStart::new("LineString")))?;
            if let Some(mode) = altitude_mode {
                text_element(writer, "altitudeMode", mode.as_str())?;
            }
            text_element(writer, "coordinates", &coords_text(coords))?;
            writer.write_event(Event::End(BytesEnd::new("LineString")))?;
        }
        Geometry::Multi(parts) => {
            writer.write_event(Event::Start(BytesStart::new("MultiGeometry")))?;
            for part in parts {
                write_geometry(writer, part)?;
            }
            writer.write_event(Event::End(BytesEnd::new("MultiGeometry")))?;
        }
    }
    Ok(())
}

fn coords_text(coords: &[Coord]) -> String {
    coords
        .iter()
        .map(Coord::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn text_element<W: io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
