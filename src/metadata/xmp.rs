use crate::{error::Error, metadata::Scalar};
use quick_xml::{
    Reader,
    escape::unescape,
    events::{BytesStart, Event},
};
use std::{borrow::Cow, collections::BTreeMap};

const XMP_OPEN: &[u8] = b"<x:xmpmeta";
const XMP_CLOSE: &[u8] = b"</x:xmpmeta";

/// Scans raw image bytes for an embedded XMP packet.
///
/// The packet is located by its markers rather than by walking the container
/// segments, which also finds packets that vendors tuck into places the
/// container index does not cover.
pub fn scan(bytes: &[u8]) -> Option<Cow<'_, str>> {
    let open = find(bytes, XMP_OPEN)?;
    let close = open + find(&bytes[open..], XMP_CLOSE)?;

    // Keep the closing tag itself, through its '>'.
    let stop = (close + XMP_CLOSE.len() + 1).min(bytes.len());
    Some(String::from_utf8_lossy(&bytes[open..stop]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Flattens an XMP document into name/scalar pairs.
///
/// Every element and attribute name loses its namespace prefix, and element
/// text is keyed by its enclosing element's name. XMP stores numbers as
/// strings ("+30.20"), so values stay [`Scalar::Text`] and get parsed at the
/// point of use.
pub fn flatten(doc: &str) -> Result<BTreeMap<String, Scalar>, Error> {
    let mut reader = Reader::from_str(doc);
    let mut attrs = BTreeMap::new();
    let mut open_elements: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                put_attributes(&e, &mut attrs);
                open_elements.push(name_of(e.name().local_name().as_ref()));
            }
            Event::Empty(e) => put_attributes(&e, &mut attrs),
            Event::Text(e) => {
                let text = unescaped(&e);
                let text = text.trim();
                if !text.is_empty() {
                    if let Some(element) = open_elements.last() {
                        attrs.insert(element.clone(), Scalar::Text(text.to_string()));
                    }
                }
            }
            Event::End(_) => {
                open_elements.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(attrs)
}

fn put_attributes(element: &BytesStart<'_>, attrs: &mut BTreeMap<String, Scalar>) {
    for attr in element.attributes().flatten() {
        // Namespace declarations describe the document, not the image.
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }

        let key = name_of(attr.key.local_name().as_ref());
        let value = unescaped(&attr.value);
        attrs.insert(key, Scalar::Text(value));
    }
}

fn name_of(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn unescaped(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw).into_owned();
    unescape(&text).map(Cow::into_owned).unwrap_or(text)
}
