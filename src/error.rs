use std::path::PathBuf;

/// Errors that can occur in ruSNAP.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    Parameter(String),

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("FASTA parsing error: {0}")]
    Fasta(String),

    #[error("genome index error: {0}")]
    Index(String),

    #[error("malformed read: {0}")]
    Read(String),

    #[error("alignment error: {0}")]
    Alignment(String),

    #[error("CIGAR buffer too small (needed {needed} ops, had room for {capacity})")]
    CigarBufferTooSmall { needed: usize, capacity: usize },
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}
