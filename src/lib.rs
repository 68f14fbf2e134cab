// #![warn(missing_docs)]

//! Drone Photo Survey Utilities
//!
//! Reads the EXIF and XMP metadata embedded in drone photos, reconstructs
//! where each shot was taken and what patch of ground it covered, and renders
//! the result as KML flight documents, one per photo directory.

#[allow(missing_docs)]
pub mod error;

pub mod assemble;
pub mod config;
pub mod footprint;
pub mod geodesy;
pub mod kml;
pub mod metadata;
pub mod pose;
pub mod survey;
pub mod track;
