mod cancel;
mod controller;
mod error;
mod selection;
mod transport;
mod types;

pub use cancel::CancelToken;
pub use controller::{BatchController, BatchSettings, DEFAULT_GROUP_SIZE, DEFAULT_REQUEST_TIMEOUT};
pub use selection::FileSelection;
pub use transport::HttpTransport;
pub use types::{BatchEvent, BatchReport, UploadOutcome};

#[cfg(test)]
pub use selection::SelectedFile;
#[cfg(test)]
pub use types::{FailureReason, FileStatus};
