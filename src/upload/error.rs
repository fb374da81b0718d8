use std::path::PathBuf;

/// Error returned by an [`UploadTransport`](super::UploadTransport) when no
/// HTTP response was obtained for a file.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Error raised while building a [`FileSelection`](super::FileSelection).
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),
    #[error("cannot inspect {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
