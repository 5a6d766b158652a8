use std::fmt;

/// Errors surfaced to the host UI. All variants are recoverable: they are
/// reported at the boundary where they occur and never leave the store in a
/// partially mutated state.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The tracklet file is not the expected tabular format.
    Format(String),
    /// An add/relabel would give two rows in the same frame the same id.
    DuplicateIdentity { filename: String, id: i64 },
    /// An operation requiring exactly one selected shape was invoked with
    /// zero or several.
    Selection(String),
    /// No frames found on disk for the configured stacks/filters.
    EmptySequence,
    /// Disk I/O failed while loading or saving.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "Invalid tracklet file: {}", msg),
            Error::DuplicateIdentity { filename, id } => {
                write!(f, "ID {} already exists in frame {}", id, filename)
            }
            Error::Selection(msg) => write!(f, "{}", msg),
            Error::EmptySequence => write!(f, "No images found for the selected stacks"),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
