use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The image carries no usable position fix, so no record can be built
    /// from it. Callers are expected to skip the image and keep going.
    #[error("unreadable metadata: {reason}")]
    UnreadableMetadata { reason: String },

    #[error("malformed metadata document: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn unreadable(reason: impl Into<String>) -> Self {
        Error::UnreadableMetadata {
            reason: reason.into(),
        }
    }
}
