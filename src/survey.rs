use crate::{
    assemble,
    config::Config,
    error::Error,
    kml,
    track::{FlightTrack, ImageRecord},
};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters reported after a run.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Directories visited, the survey root included.
    pub folders: u32,

    /// JPEG files seen, whether or not they could be read.
    pub jpg_files: u32,

    /// JPEG files skipped because their metadata was missing or unreadable.
    pub jpg_err: u32,
}

/// Walks `root`, renders one KML document into every directory that holds
/// usable drone images, and writes an index document at the root when more
/// than one came out. Unreadable images and unwritable directories are
/// logged and skipped, never fatal.
pub fn run(root: &Path, cfg: &Config) -> RunSummary {
    let mut summary = RunSummary::default();
    let mut by_directory: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() {
            summary.folders += 1;
            continue;
        }

        let path = entry.path();
        if !entry.file_type().is_file() || !is_jpg(path) {
            continue;
        }

        summary.jpg_files += 1;
        if let Some(parent) = path.parent() {
            by_directory
                .entry(parent.to_path_buf())
                .or_default()
                .push(path.to_path_buf());
        }
    }

    let mut written = Vec::new();

    for (dir, files) in &by_directory {
        let mut records = Vec::new();

        for file in files {
            match ImageRecord::read_from(file, cfg) {
                Ok(record) => records.push(record),
                Err(e) => {
                    summary.jpg_err += 1;
                    warn!(
                        path = file.display().to_string(),
                        err = e.to_string(),
                        "skipping unreadable image"
                    );
                }
            }
        }

        let track = FlightTrack::from_records(records);
        let Some(name) = assemble::document_name(&track) else {
            info!(dir = dir.display().to_string(), "no usable images");
            continue;
        };

        let path = dir.join(name);
        match write_kml(&path, &assemble::document(&track)) {
            Ok(()) => {
                info!(
                    path = path.display().to_string(),
                    images = track.len(),
                    "wrote flight document"
                );
                written.push(path);
            }
            Err(e) => error!(
                path = path.display().to_string(),
                err = e.to_string(),
                "failed to write flight document"
            ),
        }
    }

    if written.len() > 1 {
        if let Err(e) = write_index(root, &written) {
            error!(err = e.to_string(), "failed to write index document");
        }
    }

    summary
}

fn is_jpg(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase() == "jpg")
        .unwrap_or(false)
}

fn write_kml(path: &Path, doc: &kml::Document) -> Result<(), Error> {
    let mut out = BufWriter::new(File::create(path)?);
    kml::write_document(&mut out, doc)?;
    out.flush()?;
    Ok(())
}

/// Links every produced document from a `drone_index.kml` beside the
/// traversal root, so one open pulls in the whole survey.
fn write_index(root: &Path, written: &[PathBuf]) -> Result<(), Error> {
    let links: Vec<(String, String)> = written
        .iter()
        .map(|path| {
            let href = relative_href(root, path);
            (link_name(&href), href)
        })
        .collect();

    let path = root.join("drone_index.kml");
    write_kml(&path, &assemble::index_document(&links))?;
    info!(
        path = path.display().to_string(),
        links = links.len(),
        "wrote index document"
    );

    Ok(())
}

/// Hrefs are relative to the index and always forward-slashed, which KML
/// viewers expect on every platform.
fn relative_href(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Links display the directory they point into, or the file name for a
/// document at the root itself.
fn link_name(href: &str) -> String {
    match href.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => href.to_string(),
    }
}
