//! Sequential batch processing over one browser session.
//!
//! [`BatchRunner::run`] walks the task list in input order and produces
//! exactly one record per task it reaches. Around that loop it handles:
//!
//! - Politeness delay (plus optional random jitter) between tasks
//! - Checkpoints of all records so far, every `checkpoint_every` tasks
//! - Session restarts when the browser keeps failing back to back
//! - Interruption: the current task finishes, the rest are skipped; a second
//!   interrupt aborts (see [`watch_interrupts`])
//!
//! The session is released on every exit path, including interruption and
//! an exhausted restart.
//!
//! # Session Restart
//!
//! After `max_consecutive_failures` session faults in a row the session is
//! treated as dead. Page-level errors (`net::ERR_*`, invalid URLs) and
//! timeouts do not count; like successes, they end the streak. A dead session
//! is released and a new one is launched with exponential backoff:
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), 30s) + random_jitter(0..250ms)
//! ```
//!
//! If every relaunch attempt fails, the remaining tasks are recorded as
//! failed without being fetched.

use crate::fetcher::{Fetch, FetchError, Launch};
use crate::models::{Record, Status, UrlTask};
use crate::outputs::dataset::ResultStore;
use crate::processor::{ArticleProcessor, Outcome, STATUS_DETAIL_CHARS};
use crate::utils::truncate_chars;
use rand::{Rng, rng};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const BACKOFF_JITTER_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Pause between consecutive tasks.
    pub delay: Duration,
    /// Upper bound of the random extra pause added to `delay`.
    pub jitter: Duration,
    /// Checkpoint period in tasks; `0` disables checkpoints.
    pub checkpoint_every: usize,
    /// Back-to-back session faults that trigger a session restart; `0` never
    /// restarts.
    pub max_consecutive_failures: usize,
    /// Launch attempts per restart.
    pub relaunch_attempts: usize,
    /// First backoff delay between launch attempts.
    pub relaunch_base_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            jitter: Duration::ZERO,
            checkpoint_every: 10,
            max_consecutive_failures: 3,
            relaunch_attempts: 5,
            relaunch_base_delay: Duration::from_secs(1),
        }
    }
}

/// Records accumulated so far in a run.
#[derive(Debug, Default)]
pub struct BatchState {
    records: Vec<Record>,
    consecutive_failures: usize,
}

impl BatchState {
    pub fn push(&mut self, outcome: Outcome) {
        if outcome.session_fault {
            self.consecutive_failures += 1;
        } else {
            self.consecutive_failures = 0;
        }
        self.records.push(outcome.record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.status.is_success()).count()
    }

    pub fn checkpoint_due(&self, every: usize) -> bool {
        every > 0 && !self.records.is_empty() && self.records.len() % every == 0
    }

    pub fn session_suspect(&self, max_failures: usize) -> bool {
        max_failures > 0 && self.consecutive_failures >= max_failures
    }

    fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Resolves once `shutdown` turns true. Never resolves if the sender is gone
/// without having signalled.
async fn interrupted(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|&stop| stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Turn interrupts from `next` into a graceful stop, then an abort.
///
/// The first interrupt sets `stop` so the batch finishes its current task.
/// Returns `true` on a second interrupt, or `false` if listening fails.
pub async fn watch_interrupts<F, Fut>(mut next: F, stop: watch::Sender<bool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let mut received = 0usize;
    loop {
        if let Err(e) = next().await {
            warn!(error = %e, "Cannot listen for interrupts");
            return false;
        }
        received += 1;
        if received > 1 {
            return true;
        }
        warn!("Interrupt received; finishing the current task (interrupt again to abort)");
        let _ = stop.send(true);
    }
}

fn backoff(base: Duration, attempt: usize) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }
    let shift = attempt.saturating_sub(1).min(16) as u32;
    let delay = base.saturating_mul(1 << shift).min(MAX_BACKOFF);
    let jitter_ms: u64 = rng().random_range(0..=BACKOFF_JITTER_MS);
    delay + Duration::from_millis(jitter_ms)
}

pub struct BatchRunner<'a> {
    processor: &'a ArticleProcessor,
    store: &'a ResultStore,
    settings: BatchSettings,
}

impl<'a> BatchRunner<'a> {
    pub fn new(processor: &'a ArticleProcessor, store: &'a ResultStore, settings: BatchSettings) -> Self {
        Self {
            processor,
            store,
            settings,
        }
    }

    /// Process `tasks` in order and return one record per processed task.
    ///
    /// Fails only if the first browser session cannot be launched.
    #[instrument(level = "info", skip_all, fields(tasks = tasks.len()))]
    pub async fn run<L: Launch>(
        &self,
        launcher: &L,
        tasks: &[UrlTask],
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<Record>, FetchError> {
        let t0 = Instant::now();
        let session = launcher.launch().await?;
        let (state, session) = self.drive(launcher, session, tasks, &mut shutdown).await;

        if let Some(session) = session {
            if let Err(e) = session.release().await {
                warn!(error = %e, "Releasing browser session failed");
            }
        }

        let succeeded = state.succeeded();
        info!(
            processed = state.len(),
            succeeded,
            failed = state.len() - succeeded,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Batch finished"
        );
        Ok(state.into_records())
    }

    async fn drive<L: Launch>(
        &self,
        launcher: &L,
        session: L::Session,
        tasks: &[UrlTask],
        shutdown: &mut watch::Receiver<bool>,
    ) -> (BatchState, Option<L::Session>) {
        let mut state = BatchState::default();
        let mut session = Some(session);
        let mut unavailable = String::new();
        let total = tasks.len();

        for (index, task) in tasks.iter().enumerate() {
            if *shutdown.borrow() {
                warn!(processed = index, total, "Interrupted; skipping remaining tasks");
                break;
            }

            let outcome = match session.as_mut() {
                Some(active) => {
                    if index > 0 && !self.pause(shutdown).await {
                        warn!(processed = index, total, "Interrupted; skipping remaining tasks");
                        break;
                    }
                    self.processor.process(active, task).await
                }
                None => Record::failed(task, Status::FetchError(unavailable.clone())).into(),
            };
            info!(
                task = index + 1,
                total,
                code = %task.id,
                status = %outcome.record.status,
                "Task done"
            );
            state.push(outcome);

            if state.checkpoint_due(self.settings.checkpoint_every) {
                if let Err(e) = self.store.checkpoint(state.records()).await {
                    error!(processed = state.len(), error = %e, "Checkpoint failed; continuing");
                }
            }

            let remaining = index + 1 < total;
            if remaining
                && session.is_some()
                && state.session_suspect(self.settings.max_consecutive_failures)
            {
                warn!(
                    failures = self.settings.max_consecutive_failures,
                    "Consecutive session faults; restarting browser session"
                );
                if let Some(dead) = session.take() {
                    if let Err(e) = dead.release().await {
                        debug!(error = %e, "Releasing failed session errored");
                    }
                }
                match self.relaunch(launcher).await {
                    Ok(fresh) => session = Some(fresh),
                    Err(e) => {
                        error!(error = %e, "Browser could not be restarted; remaining tasks will fail");
                        unavailable = truncate_chars(&e.to_string(), STATUS_DETAIL_CHARS);
                    }
                }
                state.reset_failures();
            }
        }

        (state, session)
    }

    /// Wait out the inter-task delay. Returns `false` if interrupted.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let jitter_ms = self.settings.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 {
            Duration::from_millis(rng().random_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        let wait = self.settings.delay + extra;
        if wait.is_zero() {
            return true;
        }
        tokio::select! {
            _ = sleep(wait) => true,
            _ = interrupted(shutdown) => false,
        }
    }

    async fn relaunch<L: Launch>(&self, launcher: &L) -> Result<L::Session, FetchError> {
        let attempts = self.settings.relaunch_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match launcher.launch().await {
                Ok(session) => {
                    info!(attempt, "Browser session relaunched");
                    return Ok(session);
                }
                Err(e) if attempt >= attempts => {
                    error!(attempt, max = attempts, error = %e, "Relaunch exhausted retries");
                    return Err(e);
                }
                Err(e) => {
                    let delay = backoff(self.settings.relaunch_base_delay, attempt);
                    warn!(attempt, max = attempts, ?delay, error = %e, "Relaunch failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::FieldExtractors;
    use crate::fetcher::FetchedPage;
    use crate::outputs::dataset::read_records;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default)]
    struct Counters {
        launches: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
        opens: Arc<AtomicUsize>,
    }

    /// URLs containing `timeout` time out and `refused` fail at the network
    /// level; anything else renders a short article. The first session dies after `first_dies_after`
    /// opens; launches numbered `fail_launch_from` and later fail.
    #[derive(Debug, Default)]
    struct MockLauncher {
        counters: Counters,
        first_dies_after: Option<usize>,
        fail_launch_from: Option<usize>,
    }

    struct MockSession {
        counters: Counters,
        dies_after: Option<usize>,
        opened: usize,
    }

    impl Launch for MockLauncher {
        type Session = MockSession;

        async fn launch(&self) -> Result<MockSession, FetchError> {
            let n = self.counters.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail_launch_from.is_some_and(|from| n >= from) {
                return Err(FetchError::Launch("chrome not found".to_string()));
            }
            Ok(MockSession {
                counters: self.counters.clone(),
                dies_after: if n == 0 { self.first_dies_after } else { None },
                opened: 0,
            })
        }
    }

    impl Fetch for MockSession {
        async fn open(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
            self.counters.opens.fetch_add(1, Ordering::SeqCst);
            self.opened += 1;
            if self.dies_after.is_some_and(|n| self.opened > n) {
                return Err(FetchError::Session("browser has disconnected".to_string()));
            }
            if url.contains("timeout") {
                return Err(FetchError::Timeout);
            }
            if url.contains("refused") {
                return Err(FetchError::Navigation("net::ERR_CONNECTION_REFUSED".to_string()));
            }
            Ok(FetchedPage {
                url: url.to_string(),
                heading: Some("Alerte sanitaire".to_string()),
                markup: "<html><body><p>La rage progresse en Tunisie.</p></body></html>".to_string(),
            })
        }

        async fn release(self) -> Result<(), FetchError> {
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn settings() -> BatchSettings {
        BatchSettings {
            delay: Duration::ZERO,
            jitter: Duration::ZERO,
            checkpoint_every: 10,
            max_consecutive_failures: 3,
            relaunch_attempts: 2,
            relaunch_base_delay: Duration::ZERO,
        }
    }

    fn tasks(n: usize) -> Vec<UrlTask> {
        (1..=n)
            .map(|i| UrlTask::new(i.to_string(), format!("https://example.org/{}", i)))
            .collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    async fn run_batch(
        launcher: &MockLauncher,
        tasks: &[UrlTask],
        settings: BatchSettings,
        dir: &std::path::Path,
    ) -> Result<Vec<Record>, FetchError> {
        let processor = ArticleProcessor::new(FieldExtractors::default());
        let store = ResultStore::new(dir, date());
        let runner = BatchRunner::new(&processor, &store, settings);
        let (_tx, rx) = watch::channel(false);
        runner.run(launcher, tasks, rx).await
    }

    #[tokio::test]
    async fn test_checkpoints_every_ten_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::default();
        let records = run_batch(&launcher, &tasks(23), settings(), tmp.path()).await.unwrap();

        assert_eq!(records.len(), 23);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        let expected: Vec<String> = (1..=23).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
        assert!(records.iter().all(|r| r.status.is_success()));

        let store = ResultStore::new(tmp.path(), date());
        assert_eq!(read_records(&store.checkpoint_path(10)).await.unwrap().len(), 10);
        assert_eq!(read_records(&store.checkpoint_path(20)).await.unwrap().len(), 20);
        assert!(!store.checkpoint_path(23).exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 2);

        assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_does_not_stop_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::default();
        let tasks = vec![
            UrlTask::new("1", "https://a.example/ok"),
            UrlTask::new("2", "https://b.example/timeout"),
            UrlTask::new("3", "https://c.example/ok"),
        ];
        let records = run_batch(&launcher, &tasks, settings(), tmp.path()).await.unwrap();
        let statuses: Vec<_> = records.iter().map(|r| r.status.clone()).collect();
        assert_eq!(statuses, vec![Status::Success, Status::Timeout, Status::Success]);
        assert_eq!(records[1].title, "");
        assert_eq!(records[2].title, "Alerte sanitaire");
    }

    #[tokio::test]
    async fn test_dead_session_is_relaunched() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher {
            first_dies_after: Some(2),
            ..MockLauncher::default()
        };
        let records = run_batch(&launcher, &tasks(8), settings(), tmp.path()).await.unwrap();

        assert_eq!(records.len(), 8);
        let failed: Vec<_> = records
            .iter()
            .filter(|r| matches!(r.status, Status::FetchError(_)))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(failed, vec!["3", "4", "5"]);
        assert!(records[5..].iter().all(|r| r.status.is_success()));
        assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 2);
        assert_eq!(launcher.counters.releases.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_relaunch_fails_remaining_tasks() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher {
            first_dies_after: Some(0),
            fail_launch_from: Some(1),
            ..MockLauncher::default()
        };
        let records = run_batch(&launcher, &tasks(6), settings(), tmp.path()).await.unwrap();

        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| !r.status.is_success()));
        assert_eq!(
            records[5].status,
            Status::FetchError("browser launch failed: chrome not found".to_string())
        );
        // three opens before the restart, none after
        assert_eq!(launcher.counters.opens.load(Ordering::SeqCst), 3);
        assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 3);
        assert_eq!(launcher.counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initial_launch_failure_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher {
            fail_launch_from: Some(0),
            ..MockLauncher::default()
        };
        let result = run_batch(&launcher, &tasks(3), settings(), tmp.path()).await;
        assert!(matches!(result, Err(FetchError::Launch(_))));
        assert_eq!(launcher.counters.releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_interrupt_releases_session() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::default();
        let processor = ArticleProcessor::new(FieldExtractors::default());
        let store = ResultStore::new(tmp.path(), date());
        let runner = BatchRunner::new(&processor, &store, settings());
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let records = runner.run(&launcher, &tasks(5), rx).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(launcher.counters.opens.load(Ordering::SeqCst), 0);
        assert_eq!(launcher.counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_isolated_failures_do_not_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::default();
        let tasks = vec![
            UrlTask::new("1", "https://a.example/refused"),
            UrlTask::new("2", "https://b.example/refused"),
            UrlTask::new("3", "https://c.example/ok"),
            UrlTask::new("4", "https://d.example/refused"),
        ];
        let records = run_batch(&launcher, &tasks, settings(), tmp.path()).await.unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records[0].status,
            Status::FetchError("net::ERR_CONNECTION_REFUSED".to_string())
        );
        assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_page_errors_never_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let launcher = MockLauncher::default();
        let tasks: Vec<_> = (1..=5)
            .map(|i| UrlTask::new(i.to_string(), format!("https://gone{}.example/refused", i)))
            .collect();
        let records = run_batch(&launcher, &tasks, settings(), tmp.path()).await.unwrap();

        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| matches!(r.status, Status::FetchError(_))));
        assert_eq!(launcher.counters.launches.load(Ordering::SeqCst), 1);
        assert_eq!(launcher.counters.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_checkpoint_failure_does_not_stop_batch() {
        let tmp = tempfile::tempdir().unwrap();
        // a regular file where the checkpoint directory should be
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let launcher = MockLauncher::default();
        let settings = BatchSettings {
            checkpoint_every: 2,
            ..settings()
        };

        let records = run_batch(&launcher, &tasks(5), settings, &blocker.join("ckpt")).await.unwrap();

        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.status.is_success()));
        assert_eq!(launcher.counters.opens.load(Ordering::SeqCst), 5);
        assert_eq!(launcher.counters.releases.load(Ordering::SeqCst), 1);
        assert!(blocker.is_file());
    }

    #[tokio::test]
    async fn test_second_interrupt_aborts() {
        let (tx, rx) = watch::channel(false);
        let aborted = watch_interrupts(|| async { Ok(()) }, tx).await;
        assert!(aborted);
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_interrupt_listener_failure() {
        let (tx, rx) = watch::channel(false);
        let calls = AtomicUsize::new(0);
        let aborted = watch_interrupts(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(std::io::Error::other("no signal handler")) }
            },
            tx,
        )
        .await;
        assert!(!aborted);
        assert!(!*rx.borrow());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    fn outcome(status: Status, session_fault: bool) -> Outcome {
        Outcome {
            record: Record::failed(&UrlTask::new("1", "u"), status),
            session_fault,
        }
    }

    #[test]
    fn test_state_checkpoint_due() {
        let mut state = BatchState::default();
        assert!(!state.checkpoint_due(10));
        for _ in 0..10 {
            state.push(outcome(Status::Success, false));
        }
        assert!(state.checkpoint_due(10));
        assert!(!state.checkpoint_due(0));
        assert!(!state.checkpoint_due(3));
    }

    #[test]
    fn test_state_counts_consecutive_session_faults() {
        let fault = || outcome(Status::FetchError("browser has disconnected".to_string()), true);
        let mut state = BatchState::default();
        state.push(fault());
        state.push(outcome(Status::Timeout, false));
        state.push(fault());
        state.push(fault());
        assert!(state.session_suspect(2));
        assert!(!state.session_suspect(3));
        assert!(!state.session_suspect(0));

        state.push(outcome(Status::FetchError("net::ERR_NAME_NOT_RESOLVED".to_string()), false));
        assert!(!state.session_suspect(1));
        assert_eq!(state.len(), 5);
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff(Duration::ZERO, 3), Duration::ZERO);
        let first = backoff(Duration::from_secs(1), 1);
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_millis(1250));
        let late = backoff(Duration::from_secs(1), 12);
        assert!(late >= MAX_BACKOFF && late <= MAX_BACKOFF + Duration::from_millis(250));
    }
}
