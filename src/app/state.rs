use crate::upload::{BatchEvent, BatchReport, CancelToken, FileSelection, UploadOutcome};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;

/// The upload page's view of the running batch. It is rebuilt from the
/// controller's events; the controller itself lives on the upload thread.
#[derive(Default)]
pub struct UploadState {
    pub files: FileSelection,
    pub statuses: HashMap<String, UploadOutcome>,
    pub upload_count: usize,
    pub error: Option<String>,
    pub report: Option<BatchReport>,
    pub is_uploading: bool,
    pub show_details: bool,
    pub event_receiver: Option<Receiver<BatchEvent>>,
    pub cancel: Option<CancelToken>,
}

impl UploadState {
    pub fn begin(
        &mut self,
        selection: &FileSelection,
        receiver: Receiver<BatchEvent>,
        cancel: CancelToken,
    ) {
        self.files = selection.clone();
        self.statuses.clear();
        self.upload_count = 0;
        self.error = None;
        self.report = None;
        self.is_uploading = true;
        self.event_receiver = Some(receiver);
        self.cancel = Some(cancel);
    }

    /// Drops the previous batch and shows `message` instead. Used when a
    /// selection is refused before anything is sent.
    pub fn reject(&mut self, message: impl Into<String>) {
        *self = UploadState {
            show_details: self.show_details,
            error: Some(message.into()),
            ..Default::default()
        };
    }

    pub fn request_cancel(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    /// Drains pending events. Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let Some(receiver) = &self.event_receiver else {
            return false;
        };
        let events: Vec<BatchEvent> = receiver.try_iter().collect();
        let changed = !events.is_empty();
        for event in events {
            self.apply(event);
        }
        changed
    }

    pub fn apply(&mut self, event: BatchEvent) {
        match event {
            BatchEvent::Started { .. } => {
                self.statuses.clear();
                self.upload_count = 0;
            }
            BatchEvent::FileSettled(status) => {
                self.statuses.insert(status.name, status.outcome);
            }
            BatchEvent::GroupSettled { upload_count } => {
                self.upload_count = upload_count;
            }
            BatchEvent::Finished(report) => {
                if report.cancelled {
                    self.error = Some(format!(
                        "Upload cancelled after {} of {} files",
                        report.settled(),
                        report.total
                    ));
                } else {
                    self.upload_count = report.total;
                    let not_ok = report.failed + report.timed_out;
                    if not_ok > 0 {
                        self.error = Some(format!(
                            "{} of {} files were not accepted",
                            not_ok, report.total
                        ));
                    }
                }
                self.report = Some(report);
                self.finish();
            }
            BatchEvent::Aborted(reason) => {
                self.error = Some(reason);
                self.finish();
            }
        }
    }

    fn finish(&mut self) {
        self.is_uploading = false;
        self.event_receiver = None;
        self.cancel = None;
    }

    pub fn status(&self, name: &str) -> Option<&UploadOutcome> {
        self.statuses.get(name)
    }

    pub fn progress_fraction(&self) -> f32 {
        if self.files.is_empty() {
            0.0
        } else {
            self.upload_count as f32 / self.files.len() as f32
        }
    }

    pub fn progress_text(&self) -> String {
        format!("{} / {}", self.upload_count, self.files.len())
    }
}
