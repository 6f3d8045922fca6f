use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a catalog run. None of these are retried: the
/// page is parsed in a single deterministic pass.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A "Levels:" marker was never followed by a level list before the
    /// course block closed.
    #[error("course block \"{title}\" closed while still waiting for its levels")]
    MalformedBlock { title: String },

    #[error("unknown course level \"{0}\"")]
    UnknownLevel(String),

    /// Text showed up after every field of the course was already filled.
    #[error("not sure what to do with this (inside <{tag}>): \"{text}\"")]
    UnexpectedText { tag: String, text: String },

    #[error("course finalized without a title")]
    MissingTitle,

    #[error("unable to parse course name \"{0}\"")]
    UnparsableName(String),

    #[error("URLs are not yet supported: {0}")]
    FetchNotSupported(String),

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed markup at byte {position}: {message}")]
    Markup { position: u64, message: String },
}
