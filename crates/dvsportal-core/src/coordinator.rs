// ── Polling coordinator ──
//
// Owns the single refresh loop for one config entry. Each refresh runs
// the source's update-then-fetch sequence under a timeout, swaps the
// cached permit list on success and notifies subscribers through a
// `watch` channel. Failures flip `last_update_success` without notifying.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::CoordinatorConfig;
use crate::convert::permits_from_records;
use crate::error::CoreError;
use crate::model::Permit;
use crate::source::PermitSource;

// ── CoordinatorState ─────────────────────────────────────────────

/// What subscribers observe. Replaced wholesale, so a clone handed out
/// earlier stays internally consistent.
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    /// Permits from the last successful refresh, in portal order.
    pub permits: Arc<Vec<Arc<Permit>>>,
    /// Whether the most recent refresh succeeded.
    pub last_update_success: bool,
    /// When the cached permits were fetched.
    pub last_updated: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self {
            permits: Arc::new(Vec::new()),
            last_update_success: false,
            last_updated: None,
            last_error: None,
        }
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// Single-flight poller for one portal account.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. At most one refresh is in
/// flight; callers of [`request_refresh()`](Self::request_refresh) that
/// arrive while one is running wait for it instead of starting another.
pub struct Coordinator<S: PermitSource> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S: PermitSource> Clone for Coordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<S> {
    source: S,
    config: CoordinatorConfig,
    state: watch::Sender<CoordinatorState>,
    /// Held for the duration of one refresh.
    refresh_lock: Mutex<()>,
    /// Number of refreshes that have finished (either way).
    completed: AtomicU64,
    /// Suppresses repeated failure warnings until the next success.
    failing: AtomicBool,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: PermitSource> Coordinator<S> {
    /// Create a coordinator. Does NOT fetch or schedule anything; call
    /// [`refresh()`](Self::refresh) and [`start()`](Self::start).
    pub fn new(source: S, config: CoordinatorConfig) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Self {
            inner: Arc::new(CoordinatorInner {
                source,
                config,
                state,
                refresh_lock: Mutex::new(()),
                completed: AtomicU64::new(0),
                failing: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
            }),
        }
    }

    /// The underlying permit source.
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    // ── Observation ──────────────────────────────────────────────

    /// Current state snapshot (cheap `Arc` clones).
    pub fn state(&self) -> CoordinatorState {
        self.inner.state.borrow().clone()
    }

    /// Cached permits from the last successful refresh.
    pub fn permits(&self) -> Arc<Vec<Arc<Permit>>> {
        Arc::clone(&self.inner.state.borrow().permits)
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.state.borrow().last_update_success
    }

    /// Subscribe to successful refreshes.
    ///
    /// The receiver is marked changed only when a refresh succeeds; a
    /// failed refresh updates the state silently.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Stream of states published by successful refreshes from now on.
    pub fn updates(&self) -> WatchStream<CoordinatorState> {
        WatchStream::from_changes(self.subscribe())
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one refresh now, waiting behind any refresh already in flight.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Ask for fresh data on behalf of an entity.
    ///
    /// If a refresh is in flight, waits for it and takes its result
    /// instead of issuing a second call. Errors are logged, not returned;
    /// they show up as `last_update_success == false`.
    pub async fn request_refresh(&self) {
        let seen = self.inner.completed.load(Ordering::Acquire);
        let _guard = self.inner.refresh_lock.lock().await;
        if self.inner.completed.load(Ordering::Acquire) != seen {
            trace!(name = %self.inner.config.name, "requested refresh served by in-flight refresh");
            return;
        }
        if let Err(e) = self.refresh_locked().await {
            debug!(error = %e, "requested refresh failed");
        }
    }

    async fn refresh_locked(&self) -> Result<(), CoreError> {
        let name = &self.inner.config.name;
        let result = match self.fetch().await {
            Ok(permits) => {
                let permits: Vec<Arc<Permit>> = permits.into_iter().map(Arc::new).collect();
                let count = permits.len();
                self.inner.state.send_modify(|state| {
                    state.permits = Arc::new(permits);
                    state.last_update_success = true;
                    state.last_updated = Some(Utc::now());
                    state.last_error = None;
                });
                if self.inner.failing.swap(false, Ordering::AcqRel) {
                    info!("fetching {name} data recovered");
                }
                debug!(count, "finished fetching {name} data");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.inner.state.send_if_modified(|state| {
                    state.last_update_success = false;
                    state.last_error = Some(message);
                    false
                });
                if self.inner.failing.swap(true, Ordering::AcqRel) {
                    debug!(error = %e, "error fetching {name} data");
                } else {
                    warn!(error = %e, "error fetching {name} data");
                }
                Err(e)
            }
        };

        self.inner.completed.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// update-then-fetch under the configured timeout.
    async fn fetch(&self) -> Result<Vec<Permit>, CoreError> {
        let timeout = self.inner.config.request_timeout;
        let source = &self.inner.source;

        let records = tokio::time::timeout(timeout, async {
            source.update().await?;
            source.permits().await
        })
        .await
        .map_err(|_| CoreError::Timeout {
            timeout_secs: timeout.as_secs(),
        })??;

        permits_from_records(records)
    }

    // ── Scheduling ───────────────────────────────────────────────

    /// Spawn the periodic refresh task. No-op if the interval is zero or
    /// the task is already running.
    pub async fn start(&self) {
        let period = self.inner.config.update_interval;
        if period.is_zero() {
            return;
        }
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return;
        }
        let cancel = self.inner.cancel.child_token();
        *task = Some(tokio::spawn(refresh_task(self.clone(), period, cancel)));
        debug!(interval_secs = period.as_secs(), "scheduled {} refresh", self.inner.config.name);
    }

    /// Stop the periodic task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("{} coordinator stopped", self.inner.config.name);
    }

    /// Token cancelled by [`shutdown()`](Self::shutdown); listeners hang
    /// child tokens off it.
    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }
}

/// Periodically refresh; a failed tick is retried by the next one.
async fn refresh_task<S: PermitSource>(
    coordinator: Coordinator<S>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Outcome is already logged and recorded in the state.
                let _ = coordinator.refresh().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;

    use super::Coordinator;
    use crate::config::CoordinatorConfig;
    use crate::error::CoreError;
    use crate::testing::{FakeSource, Outcome, permit_without_reservation, two_permits};

    fn coordinator(source: FakeSource) -> Coordinator<FakeSource> {
        Coordinator::new(source, CoordinatorConfig::oneshot())
    }

    #[tokio::test]
    async fn successful_refresh_caches_permits() {
        let coordinator = coordinator(FakeSource::new(two_permits()));

        coordinator.refresh().await.unwrap();

        let state = coordinator.state();
        assert!(state.last_update_success);
        assert!(state.last_updated.is_some());
        let codes: Vec<_> = state.permits.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["PV-1", "PV-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_marks_failure_and_keeps_cache() {
        let coordinator = coordinator(FakeSource::new(two_permits()));
        coordinator.refresh().await.unwrap();
        let before = coordinator.permits();

        coordinator.source().set_update(Outcome::Hang);
        let err = coordinator.refresh().await.unwrap_err();

        assert!(matches!(err, CoreError::Timeout { timeout_secs: 10 }), "got: {err:?}");
        assert!(!coordinator.last_update_success());
        assert_eq!(*coordinator.permits(), *before);
        assert!(coordinator.state().last_error.is_some());
    }

    #[tokio::test]
    async fn failure_does_not_notify_subscribers() {
        let coordinator = coordinator(FakeSource::new(two_permits()));
        let mut rx = coordinator.subscribe();

        coordinator.source().set_update(Outcome::ConnectionError);
        assert!(coordinator.refresh().await.is_err());
        assert!(!rx.has_changed().unwrap());
        assert!(!rx.borrow().last_update_success);

        coordinator.source().set_update(Outcome::Ok);
        coordinator.refresh().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().permits.len(), 2);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn count(&self, level: &str, message: &str) -> usize {
            let text = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
            text.lines()
                .filter(|l| l.contains(level) && l.contains(message))
                .count()
        }
    }

    #[tokio::test]
    async fn failures_warn_once_and_recovery_is_logged() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let coordinator = coordinator(FakeSource::new(two_permits()));
        coordinator.source().set_update(Outcome::ConnectionError);
        assert!(coordinator.refresh().await.is_err());
        assert!(coordinator.refresh().await.is_err());
        assert_eq!(logs.count("WARN", "error fetching"), 1);

        coordinator.source().set_update(Outcome::Ok);
        coordinator.refresh().await.unwrap();
        coordinator.refresh().await.unwrap();
        assert_eq!(logs.count("INFO", "recovered"), 1);

        coordinator.source().set_update(Outcome::ConnectionError);
        assert!(coordinator.refresh().await.is_err());
        assert_eq!(logs.count("WARN", "error fetching"), 2);
    }

    #[tokio::test]
    async fn updates_stream_yields_successful_refreshes_only() {
        let coordinator = coordinator(FakeSource::new(two_permits()));
        let mut updates = coordinator.updates();

        coordinator.source().set_update(Outcome::Garbage);
        let _ = coordinator.refresh().await;
        coordinator.source().set_update(Outcome::Ok);
        coordinator.refresh().await.unwrap();

        let state = updates.next().await.unwrap();
        assert!(state.last_update_success);
        assert_eq!(state.permits.len(), 2);
    }

    #[tokio::test]
    async fn success_replaces_the_whole_list() {
        let coordinator = coordinator(FakeSource::new(two_permits()));
        coordinator.refresh().await.unwrap();
        let old = coordinator.permits();

        coordinator
            .source()
            .set_records(vec![permit_without_reservation("PV-3", "OOST")]);
        coordinator.refresh().await.unwrap();

        assert_eq!(old.len(), 2, "earlier snapshot must stay intact");
        assert_eq!(coordinator.permits().len(), 1);
        assert_eq!(coordinator.permits()[0].code, "PV-3");
    }

    #[tokio::test(start_paused = true)]
    async fn requested_refreshes_coalesce_with_in_flight_refresh() {
        let source = FakeSource::new(two_permits());
        source.set_update_delay(Duration::from_secs(2));
        let coordinator = coordinator(source);

        let scheduled = {
            let c = coordinator.clone();
            tokio::spawn(async move { c.refresh().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(coordinator.source().update_calls(), 1);

        tokio::join!(coordinator.request_refresh(), coordinator.request_refresh());
        scheduled.await.unwrap().unwrap();

        assert_eq!(coordinator.source().update_calls(), 1);
        assert!(coordinator.last_update_success());
    }

    #[tokio::test]
    async fn idle_requested_refresh_fetches() {
        let coordinator = coordinator(FakeSource::new(two_permits()));

        coordinator.request_refresh().await;

        assert_eq!(coordinator.source().update_calls(), 1);
        assert_eq!(coordinator.permits().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_task_polls_until_shutdown() {
        let config = CoordinatorConfig {
            update_interval: Duration::from_secs(300),
            ..CoordinatorConfig::default()
        };
        let coordinator = Coordinator::new(FakeSource::new(two_permits()), config);
        coordinator.start().await;

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(coordinator.source().update_calls(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(coordinator.source().update_calls(), 2);

        coordinator.shutdown().await;
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(coordinator.source().update_calls(), 2);
    }
}
