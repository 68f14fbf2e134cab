use exif::{Field, In, Rational, Tag, Value, experimental::Writer};
use flightprint::{config::Config, survey};
use std::{fs, io::Cursor, path::Path};
use tempfile::tempdir;

#[test]
fn a_photo_directory_becomes_one_flight_document() {
    let root = tempdir().unwrap();

    // Stamps deliberately disagree with the file name order.
    write_drone_photo(root.path(), "DJI_0001.JPG", "2024:05:01 10:30:00", 110);
    write_drone_photo(root.path(), "DJI_0002.JPG", "2024:05:01 10:00:00", 74);
    write_drone_photo(root.path(), "DJI_0003.JPG", "2024:05:01 10:15:00", 90);
    write_photo_without_gps(root.path(), "DJI_0004.JPG");

    let summary = survey::run(root.path(), &Config::default());

    assert_eq!(summary.folders, 1);
    assert_eq!(summary.jpg_files, 4);
    assert_eq!(summary.jpg_err, 1);

    let documents = kml_files_in(root.path());
    assert_eq!(documents, ["drone_2024-05-01 10-30-00.kml"]);
    assert!(!root.path().join("drone_index.kml").exists());

    let kml = fs::read_to_string(root.path().join(&documents[0])).unwrap();
    assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(kml.contains("<styleUrl>#flightline</styleUrl>"));

    // The flight path is the first geometry and must run in stamp order,
    // which here means ascending latitude.
    let flight = first_between(&kml, "<coordinates>", "</coordinates>");
    let latitudes: Vec<f64> = flight
        .split_whitespace()
        .map(|triple| triple.split(',').nth(1).unwrap().parse().unwrap())
        .collect();
    assert_eq!(latitudes.len(), 3);
    assert!(latitudes.windows(2).all(|pair| pair[0] < pair[1]));

    assert!(kml.contains("<name>Drone images</name>"));
    assert!(kml.contains("<name>0002</name>"));
    assert!(kml.contains(r#"src="DJI_0002.JPG""#));
    assert!(!kml.contains("DJI_0004.JPG"));
    assert!(kml.contains("<when>2024-05-01T10:00:00</when>"));
}

#[test]
fn sibling_directories_get_their_own_documents_and_an_index() {
    let root = tempdir().unwrap();
    fs::create_dir(root.path().join("a")).unwrap();
    fs::create_dir(root.path().join("b")).unwrap();

    write_drone_photo(&root.path().join("a"), "DJI_0010.JPG", "2024:05:01 09:00:00", 74);
    write_drone_photo(&root.path().join("b"), "DJI_0020.JPG", "2024:05:01 09:30:00", 90);
    write_drone_photo(&root.path().join("b"), "DJI_0021.JPG", "2024:05:01 09:45:00", 110);

    let summary = survey::run(root.path(), &Config::default());

    assert_eq!(summary.folders, 3);
    assert_eq!(summary.jpg_files, 3);
    assert_eq!(summary.jpg_err, 0);

    assert!(root.path().join("a/drone_2024-05-01 09-00-00.kml").exists());
    assert!(root.path().join("b/drone_2024-05-01 09-45-00.kml").exists());

    let index = fs::read_to_string(root.path().join("drone_index.kml")).unwrap();
    assert!(index.contains("<href>a/drone_2024-05-01 09-00-00.kml</href>"));
    assert!(index.contains("<href>b/drone_2024-05-01 09-45-00.kml</href>"));
    assert!(index.contains("<name>a</name>"));
}

/// A minimal JPEG holding real EXIF GPS fields and a DJI style XMP packet,
/// laid out the way drones write them: SOI, Exif APP1, XMP APP1, EOI.
fn write_drone_photo(dir: &Path, name: &str, stamp: &str, lat_sec_tenths: u32) {
    let fields = located_fields(stamp, lat_sec_tenths);
    let packet = drone_packet("+30.20", "+15.00", "-52.10");

    let mut jpeg = vec![0xFF, 0xD8];
    push_app1(&mut jpeg, b"Exif\0\0", &tiff_bytes(&fields));
    push_app1(&mut jpeg, b"http://ns.adobe.com/xap/1.0/\0", packet.as_bytes());
    jpeg.extend_from_slice(&[0xFF, 0xD9]);

    fs::write(dir.join(name), jpeg).unwrap();
}

fn write_photo_without_gps(dir: &Path, name: &str) {
    let fields = vec![
        field(Tag::Model, ascii("FC7303")),
        field(Tag::DateTime, ascii("2024:05:01 10:20:00")),
    ];

    let mut jpeg = vec![0xFF, 0xD8];
    push_app1(&mut jpeg, b"Exif\0\0", &tiff_bytes(&fields));
    jpeg.extend_from_slice(&[0xFF, 0xD9]);

    fs::write(dir.join(name), jpeg).unwrap();
}

fn located_fields(stamp: &str, lat_sec_tenths: u32) -> Vec<Field> {
    vec![
        field(Tag::Model, ascii("FC7303")),
        field(Tag::DateTime, ascii(stamp)),
        field(Tag::GPSLatitudeRef, ascii("N")),
        field(
            Tag::GPSLatitude,
            Value::Rational(vec![r(44, 1), r(13, 1), r(lat_sec_tenths, 10)]),
        ),
        field(Tag::GPSLongitudeRef, ascii("W")),
        field(
            Tag::GPSLongitude,
            Value::Rational(vec![r(76, 1), r(28, 1), r(289, 10)]),
        ),
    ]
}

fn drone_packet(alt: &str, yaw: &str, pitch: &str) -> String {
    format!(
        concat!(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">"#,
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">"#,
            r#"<rdf:Description rdf:about="DJI Meta Data" "#,
            r#"xmlns:drone-dji="http://www.dji.com/drone-dji/1.0/" "#,
            r#"drone-dji:RelativeAltitude="{alt}" "#,
            r#"drone-dji:GimbalYawDegree="{yaw}" "#,
            r#"drone-dji:GimbalPitchDegree="{pitch}"/>"#,
            r#"</rdf:RDF></x:xmpmeta>"#,
        ),
        alt = alt,
        yaw = yaw,
        pitch = pitch,
    )
}

fn tiff_bytes(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }

    let mut cursor = Cursor::new(Vec::new());
    writer.write(&mut cursor, false).unwrap();
    cursor.into_inner()
}

fn push_app1(jpeg: &mut Vec<u8>, header: &[u8], body: &[u8]) {
    let length = (header.len() + body.len() + 2) as u16;
    jpeg.extend_from_slice(&[0xFF, 0xE1]);
    jpeg.extend_from_slice(&length.to_be_bytes());
    jpeg.extend_from_slice(header);
    jpeg.extend_from_slice(body);
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

fn r(num: u32, denom: u32) -> Rational {
    Rational { num, denom }
}

fn kml_files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".kml"))
        .collect();
    names.sort();
    names
}

fn first_between<'a>(text: &'a str, open: &str, close: &str) -> &'a str {
    let start = text.find(open).unwrap() + open.len();
    let end = text[start..].find(close).unwrap() + start;
    text[start..end].trim()
}
