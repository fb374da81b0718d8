//! Batched upload of a file selection.
//!
//! The selection is split into consecutive groups of `group_size` files. All
//! uploads of a group are polled concurrently on the caller's task; the next
//! group starts only after every upload of the current one has settled. Each
//! upload runs under a timeout, so a hung request settles as
//! [`UploadOutcome::Timeout`] instead of stalling the batch.

use super::cancel::CancelToken;
use super::selection::{FileSelection, SelectedFile};
use super::transport::UploadTransport;
use super::types::{BatchEvent, BatchReport, FailureReason, FileStatus, UploadOutcome};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_GROUP_SIZE: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Lower bound for the per-request timeout.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    group_size: usize,
    request_timeout: Duration,
}

impl BatchSettings {
    pub fn new(group_size: usize, request_timeout: Duration) -> Self {
        Self {
            group_size: group_size.max(1),
            request_timeout: request_timeout.max(MIN_REQUEST_TIMEOUT),
        }
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_SIZE, DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Owns the status mapping, the progress counter and the error state of the
/// current submission. Nothing outside the controller mutates them.
#[derive(Default)]
pub struct BatchController {
    settings: BatchSettings,
    statuses: HashMap<String, UploadOutcome>,
    upload_count: usize,
    error: Option<String>,
    events: Option<Sender<BatchEvent>>,
}

impl BatchController {
    pub fn new(settings: BatchSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Forward progress to `sender` while batches run.
    pub fn with_events(mut self, sender: Sender<BatchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Outcome per file name. A name missing from the map has not settled.
    #[cfg(test)]
    pub fn statuses(&self) -> &HashMap<String, UploadOutcome> {
        &self.statuses
    }

    pub fn status(&self, name: &str) -> Option<&UploadOutcome> {
        self.statuses.get(name)
    }

    /// Number of files processed by the groups that have settled so far.
    pub fn upload_count(&self) -> usize {
        self.upload_count
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn reset(&mut self) {
        self.statuses.clear();
        self.upload_count = 0;
        self.error = None;
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(sender) = &self.events {
            // The receiver going away (window closed) must not stop the batch.
            sender.send(event).unwrap_or_default();
        }
    }

    /// Uploads every file of `selection` exactly once and returns a summary.
    /// Per-file failures are recorded in the status mapping, never returned.
    pub async fn run<T>(
        &mut self,
        transport: &T,
        selection: &FileSelection,
        cancel: &CancelToken,
    ) -> BatchReport
    where
        T: UploadTransport + ?Sized,
    {
        self.reset();

        let started = Instant::now();
        let total = selection.len();
        let group_size = self.settings.group_size();
        let timeout = self.settings.request_timeout();
        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        info!(
            "starting batch of {} files (group size {}, timeout {:?})",
            total, group_size, timeout
        );
        self.emit(BatchEvent::Started { total });

        'groups: for (index, group) in selection.files().chunks(group_size).enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let mut in_flight: FuturesUnordered<_> = group
                .iter()
                .map(|file| upload_one(transport, file, timeout))
                .collect();

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        report.cancelled = true;
                        break 'groups;
                    }
                    settled = in_flight.next() => match settled {
                        Some(status) => self.record(status, &mut report),
                        None => break,
                    },
                }
            }

            self.upload_count = index * group_size + group.len();
            debug!("group {} settled, {}/{} files", index + 1, self.upload_count, total);
            self.emit(BatchEvent::GroupSettled {
                upload_count: self.upload_count,
            });
        }

        if report.cancelled {
            let message = format!(
                "upload cancelled after {} of {} files",
                report.settled(),
                total
            );
            warn!("{}", message);
            self.error = Some(message);
        } else {
            self.upload_count = total;
        }

        report.unsettled = total - report.settled();
        report.elapsed = started.elapsed();
        info!(
            "batch finished in {:?}: {} succeeded, {} failed, {} timed out, {} unsettled",
            report.elapsed, report.succeeded, report.failed, report.timed_out, report.unsettled
        );
        self.emit(BatchEvent::Finished(report.clone()));
        report
    }

    fn record(&mut self, status: FileStatus, report: &mut BatchReport) {
        match &status.outcome {
            UploadOutcome::Success => report.succeeded += 1,
            UploadOutcome::Failure(_) => report.failed += 1,
            UploadOutcome::Timeout => report.timed_out += 1,
        }
        // Duplicate names: whichever settles last wins.
        self.statuses
            .insert(status.name.clone(), status.outcome.clone());
        self.emit(BatchEvent::FileSettled(status));
    }
}

/// Uploads one file and always resolves to an outcome.
async fn upload_one<T>(transport: &T, file: &SelectedFile, timeout: Duration) -> FileStatus
where
    T: UploadTransport + ?Sized,
{
    let outcome = match tokio::time::timeout(timeout, transport.post_activity(file)).await {
        Ok(Ok(response)) => {
            if let Some(location) = &response.location {
                debug!("{} stored at {}", file.name, location);
            }
            response.outcome()
        }
        Ok(Err(e)) => UploadOutcome::Failure(FailureReason::Transport(e.to_string())),
        Err(_) => UploadOutcome::Timeout,
    };

    match &outcome {
        UploadOutcome::Success => debug!("uploaded {}", file.name),
        UploadOutcome::Failure(reason) => warn!("upload of {} failed: {}", file.name, reason),
        UploadOutcome::Timeout => warn!("upload of {} timed out after {:?}", file.name, timeout),
    }

    FileStatus {
        name: file.name.clone(),
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::error::TransportError;
    use crate::upload::types::UploadResponse;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Sent(String),
        Answered(String),
    }

    /// Scripted server: answers 201 unless the file is listed in `reject`,
    /// never answers for `hang`, and errors out for `broken`.
    #[derive(Default)]
    struct ScriptedTransport {
        reject: HashSet<String>,
        hang: HashSet<String>,
        broken: HashSet<String>,
        cancel_on: Option<(String, CancelToken)>,
        calls: Mutex<Vec<Call>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedTransport {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn sent(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Sent(_)))
                .count()
        }
    }

    #[async_trait]
    impl UploadTransport for ScriptedTransport {
        async fn post_activity(
            &self,
            file: &SelectedFile,
        ) -> Result<UploadResponse, TransportError> {
            self.calls.lock().unwrap().push(Call::Sent(file.name.clone()));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some((name, token)) = &self.cancel_on {
                if name == &file.name {
                    token.cancel();
                }
            }
            if self.hang.contains(&file.name) {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap()
                .push(Call::Answered(file.name.clone()));

            if self.broken.contains(&file.name) {
                return Err(TransportError::Read {
                    path: file.path.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                });
            }
            let status = if self.reject.contains(&file.name) { 500 } else { 201 };
            Ok(UploadResponse {
                status,
                location: None,
            })
        }
    }

    fn name(i: usize) -> String {
        format!("ride-{:03}.gpx", i)
    }

    fn selection(n: usize) -> FileSelection {
        FileSelection::new(
            (0..n)
                .map(|i| SelectedFile::new(name(i), format!("/rides/{}", name(i)), 1))
                .collect(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn all_successes_reach_total() {
        let transport = ScriptedTransport::default();
        let mut controller = BatchController::default();

        let report = controller
            .run(&transport, &selection(120), &CancelToken::new())
            .await;

        assert_eq!(controller.upload_count(), 120);
        assert_eq!(controller.statuses().len(), 120);
        assert!(controller.statuses().values().all(|o| *o == UploadOutcome::Success));
        assert_eq!(report.succeeded, 120);
        assert!(report.all_succeeded());
        assert!(controller.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_files_are_failures_and_progress_completes() {
        let failing = [3, 50, 150];
        let transport = ScriptedTransport {
            reject: failing.iter().map(|&i| name(i)).collect(),
            ..Default::default()
        };
        let mut controller = BatchController::default();

        let report = controller
            .run(&transport, &selection(200), &CancelToken::new())
            .await;

        assert_eq!(controller.upload_count(), 200);
        for i in 0..200 {
            let expected = if failing.contains(&i) {
                UploadOutcome::Failure(FailureReason::Status(500))
            } else {
                UploadOutcome::Success
            };
            assert_eq!(controller.status(&name(i)), Some(&expected), "file {}", i);
        }
        assert_eq!(report.failed, 3);
        assert_eq!(report.succeeded, 197);
    }

    #[tokio::test(start_paused = true)]
    async fn groups_are_sequential_and_bounded() {
        let transport = ScriptedTransport::default();
        let (tx, rx) = mpsc::channel();
        let mut controller = BatchController::default().with_events(tx);

        controller
            .run(&transport, &selection(250), &CancelToken::new())
            .await;

        let calls = transport.calls();
        let position = |call: &Call| calls.iter().position(|c| c == call).unwrap();
        let group_bounds = [(0, 100), (100, 200), (200, 250)];
        for pair in group_bounds.windows(2) {
            let (prev_start, prev_end) = pair[0];
            let (next_start, next_end) = pair[1];
            let last_answer = (prev_start..prev_end)
                .map(|i| position(&Call::Answered(name(i))))
                .max()
                .unwrap();
            let first_send = (next_start..next_end)
                .map(|i| position(&Call::Sent(name(i))))
                .min()
                .unwrap();
            assert!(last_answer < first_send);
        }
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 100);
        assert_eq!(transport.sent(), 250);

        let progress: Vec<usize> = rx
            .try_iter()
            .filter_map(|event| match event {
                BatchEvent::GroupSettled { upload_count } => Some(upload_count),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![100, 200, 250]);
        assert_eq!(controller.upload_count(), 250);
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_does_not_leak_statuses() {
        let transport = ScriptedTransport::default();
        let mut controller = BatchController::default();

        controller
            .run(&transport, &selection(5), &CancelToken::new())
            .await;
        assert_eq!(controller.statuses().len(), 5);

        let other = FileSelection::new(vec![
            SelectedFile::new("evening.fit", "/rides/evening.fit", 1),
            SelectedFile::new("commute.fit", "/rides/commute.fit", 1),
        ]);
        controller.run(&transport, &other, &CancelToken::new()).await;

        assert_eq!(controller.statuses().len(), 2);
        assert!(controller.status(&name(0)).is_none());
        assert_eq!(controller.status("evening.fit"), Some(&UploadOutcome::Success));
        assert_eq!(controller.upload_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_names_keep_the_last_settled_outcome() {
        let transport = ScriptedTransport {
            reject: ["a.gpx".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let files = FileSelection::new(vec![
            SelectedFile::new("a.gpx", "/first/a.gpx", 1),
            SelectedFile::new("a.gpx", "/second/a.gpx", 1),
        ]);
        let (tx, rx) = mpsc::channel();
        let mut controller = BatchController::default().with_events(tx);

        let report = controller.run(&transport, &files, &CancelToken::new()).await;

        let settled: Vec<FileStatus> = rx
            .try_iter()
            .filter_map(|event| match event {
                BatchEvent::FileSettled(status) => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(settled.len(), 2);
        assert_eq!(controller.statuses().len(), 1);
        assert_eq!(
            controller.status("a.gpx"),
            Some(&settled.last().unwrap().outcome)
        );
        assert_eq!(report.total, 2);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_name_outcome_follows_settle_order() {
        /// The first "a.gpx" is accepted but answers late; the second is
        /// rejected quickly. The late answer is processed last and wins.
        struct SlowFirst;

        #[async_trait]
        impl UploadTransport for SlowFirst {
            async fn post_activity(
                &self,
                file: &SelectedFile,
            ) -> Result<UploadResponse, TransportError> {
                let (delay, status) = if file.path.starts_with("/first") {
                    (Duration::from_millis(50), 201)
                } else {
                    (Duration::from_millis(10), 409)
                };
                tokio::time::sleep(delay).await;
                Ok(UploadResponse {
                    status,
                    location: None,
                })
            }
        }

        let files = FileSelection::new(vec![
            SelectedFile::new("a.gpx", "/first/a.gpx", 1),
            SelectedFile::new("a.gpx", "/second/a.gpx", 1),
        ]);
        let mut controller = BatchController::default();

        let report = controller.run(&SlowFirst, &files, &CancelToken::new()).await;

        assert_eq!(controller.status("a.gpx"), Some(&UploadOutcome::Success));
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_selection_sends_nothing() {
        let transport = ScriptedTransport::default();
        let (tx, rx) = mpsc::channel();
        let mut controller = BatchController::default().with_events(tx);

        let report = controller
            .run(&transport, &FileSelection::default(), &CancelToken::new())
            .await;

        assert_eq!(controller.upload_count(), 0);
        assert!(controller.statuses().is_empty());
        assert_eq!(transport.sent(), 0);
        assert_eq!(report, BatchReport { elapsed: report.elapsed, ..Default::default() });
        let events: Vec<BatchEvent> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(BatchEvent::Started { total: 0 })));
        assert!(matches!(events.last(), Some(BatchEvent::Finished(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_request_times_out_and_batch_continues() {
        let transport = ScriptedTransport {
            hang: [name(7)].into_iter().collect(),
            ..Default::default()
        };
        let mut controller =
            BatchController::new(BatchSettings::new(10, Duration::from_secs(5)));

        let report = controller
            .run(&transport, &selection(25), &CancelToken::new())
            .await;

        assert_eq!(controller.status(&name(7)), Some(&UploadOutcome::Timeout));
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.succeeded, 24);
        assert_eq!(controller.upload_count(), 25);
        assert_eq!(transport.sent(), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_resolve_to_failures() {
        let transport = ScriptedTransport {
            broken: [name(1)].into_iter().collect(),
            ..Default::default()
        };
        let mut controller = BatchController::default();

        controller
            .run(&transport, &selection(3), &CancelToken::new())
            .await;

        assert!(matches!(
            controller.status(&name(1)),
            Some(UploadOutcome::Failure(FailureReason::Transport(_)))
        ));
        assert_eq!(controller.status(&name(0)), Some(&UploadOutcome::Success));
        assert_eq!(controller.upload_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_start_sends_nothing() {
        let transport = ScriptedTransport::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut controller = BatchController::default();

        let report = controller.run(&transport, &selection(10), &cancel).await;

        assert!(report.cancelled);
        assert_eq!(report.unsettled, 10);
        assert_eq!(transport.sent(), 0);
        assert_eq!(controller.upload_count(), 0);
        assert!(controller.error().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_batch_stops_after_current_group() {
        let cancel = CancelToken::new();
        let transport = ScriptedTransport {
            cancel_on: Some((name(150), cancel.clone())),
            ..Default::default()
        };
        let mut controller = BatchController::default();

        let report = controller.run(&transport, &selection(250), &cancel).await;

        assert!(report.cancelled);
        assert_eq!(controller.upload_count(), 100);
        assert_eq!(report.settled(), 100);
        assert_eq!(report.unsettled, 150);
        // Group 2 was dropped while in flight; group 3 never started.
        assert!(controller.status(&name(150)).is_none());
        assert!(transport.sent() <= 200);
        assert!(controller
            .error()
            .unwrap()
            .contains("cancelled after 100 of 250"));
    }

    #[test]
    fn group_size_is_at_least_one() {
        assert_eq!(BatchSettings::new(0, Duration::from_secs(1)).group_size(), 1);
        assert_eq!(BatchSettings::default().group_size(), DEFAULT_GROUP_SIZE);
    }

    #[test]
    fn request_timeout_is_never_zero() {
        let settings = BatchSettings::new(10, Duration::ZERO);
        assert_eq!(settings.request_timeout(), MIN_REQUEST_TIMEOUT);
        assert_eq!(
            BatchSettings::new(10, Duration::from_secs(30)).request_timeout(),
            Duration::from_secs(30)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_still_lets_requests_answer() {
        let transport = ScriptedTransport::default();
        let mut controller = BatchController::new(BatchSettings::new(10, Duration::ZERO));

        let report = controller
            .run(&transport, &selection(3), &CancelToken::new())
            .await;

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.timed_out, 0);
    }
}
