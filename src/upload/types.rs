use std::fmt;
use std::time::Duration;

/// Why a single upload did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The server answered with something other than 201 Created.
    Status(u16),
    /// The request never produced a response (connect error, read error, ...).
    Transport(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Status(code) => write!(f, "server answered HTTP {}", code),
            FailureReason::Transport(msg) => write!(f, "{}", msg),
        }
    }
}

/// Settled outcome of one file. A file without an outcome is still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Success,
    Failure(FailureReason),
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub name: String,
    pub outcome: UploadOutcome,
}

/// What the server said about one POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: u16,
    pub location: Option<String>,
}

impl UploadResponse {
    pub const CREATED: u16 = 201;

    pub fn outcome(&self) -> UploadOutcome {
        if self.status == Self::CREATED {
            UploadOutcome::Success
        } else {
            UploadOutcome::Failure(FailureReason::Status(self.status))
        }
    }
}

/// Summary of one submission, built from the settled tasks (not from the
/// name-keyed mapping, so duplicate names are counted once per file).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    /// Files that never settled because the batch was cancelled.
    pub unsettled: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn settled(&self) -> usize {
        self.succeeded + self.failed + self.timed_out
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.succeeded == self.total
    }
}

/// Progress notifications sent by the controller while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { total: usize },
    FileSettled(FileStatus),
    GroupSettled { upload_count: usize },
    Finished(BatchReport),
    /// The batch could not be started at all (runtime or transport setup).
    Aborted(String),
}
