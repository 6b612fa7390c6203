//! Notification hub: listener registry, fan-out, and polling fallback.
//!
//! # Responsibility
//! - Keep the registry of interested listeners for this process.
//! - Deliver global and article-scoped change signals sequentially.
//! - Run at most one background poll worker that turns externally-made
//!   marker advances into global deliveries.
//!
//! # Invariants
//! - Every notify call advances the marker before any listener runs.
//! - A failing listener never stops delivery to the remaining listeners.
//! - At most one poll worker exists regardless of `start()` call count.

use crate::model::content::ArticleId;
use crate::notify::marker::UpdateMarker;
use crate::notify::{ListenerError, NotifyResult};
use log::{error, info, warn};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Interface implemented by whatever owns the live-push transport.
///
/// Both callbacks run on the hub caller's thread (or the poll worker's) and
/// must not block indefinitely.
pub trait UpdateListener: Send + Sync {
    /// Short name used for log attribution.
    fn name(&self) -> &str {
        "listener"
    }

    /// "Re-fetch everything relevant" signal.
    fn on_global_update(&self) -> Result<(), ListenerError>;

    /// Change confined to one article.
    fn on_partial_update(&self, article_id: ArticleId) -> Result<(), ListenerError>;
}

/// Outcome of one fan-out pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

enum Signal {
    Global,
    Partial(ArticleId),
}

struct HubShared {
    listeners: Mutex<Vec<Arc<dyn UpdateListener>>>,
    marker: Arc<dyn UpdateMarker>,
    /// Highest marker value this process has already accounted for.
    last_seen: AtomicI64,
}

impl HubShared {
    fn listeners_snapshot(&self) -> Vec<Arc<dyn UpdateListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sequential delivery with per-listener error isolation.
    fn deliver(&self, signal: &Signal) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for listener in self.listeners_snapshot() {
            let outcome = match signal {
                Signal::Global => listener.on_global_update(),
                Signal::Partial(article_id) => listener.on_partial_update(*article_id),
            };
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=notify_deliver module=notify status=error listener={} error={}",
                        listener.name(),
                        err
                    );
                }
            }
        }
        report
    }

    fn poll_tick(&self) {
        let current = match self.marker.current() {
            Ok(value) => value,
            Err(err) => {
                error!("event=notify_poll module=notify status=error error={err}");
                return;
            }
        };

        let last_seen = self.last_seen.load(Ordering::SeqCst);
        if current <= last_seen {
            return;
        }

        // An external process advanced the marker; granularity is unknown,
        // so the change is treated as global.
        let report = self.deliver(&Signal::Global);
        self.last_seen.store(current, Ordering::SeqCst);
        info!(
            "event=notify_poll module=notify status=ok marker={current} delivered={} failed={}",
            report.delivered, report.failed
        );
    }
}

struct PollWorker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Process-wide change-notification hub.
///
/// One instance is owned by whatever composes the service; configuration is
/// injected through the constructor and the poll worker has an explicit
/// `start()`/`stop()` lifecycle.
pub struct NotificationHub {
    shared: Arc<HubShared>,
    poll_interval: Duration,
    worker: Mutex<Option<PollWorker>>,
}

impl NotificationHub {
    pub fn new(marker: Arc<dyn UpdateMarker>, poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(HubShared {
                listeners: Mutex::new(Vec::new()),
                marker,
                last_seen: AtomicI64::new(0),
            }),
            poll_interval,
            worker: Mutex::new(None),
        }
    }

    /// Adds a listener; delivery order follows registration order.
    pub fn register_listener(&self, listener: Arc<dyn UpdateListener>) {
        let mut listeners = self
            .shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.push(listener);
        info!(
            "event=notify_register module=notify status=ok listeners={}",
            listeners.len()
        );
    }

    pub fn listener_count(&self) -> usize {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Empties the registry and stops the poll worker; used for teardown.
    pub fn clear_listeners(&self) {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.stop();
        info!("event=notify_clear module=notify status=ok");
    }

    /// Starts the background poll worker. Idempotent.
    ///
    /// Seeds the locally-observed marker value first so pre-existing state
    /// is not reported as a change.
    pub fn start(&self) -> NotifyResult<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Ok(());
        }

        let current = self.shared.marker.current()?;
        self.shared.last_seen.store(current, Ordering::SeqCst);

        let (stop_tx, stop_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let interval = self.poll_interval;
        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => shared.poll_tick(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        *worker = Some(PollWorker { stop_tx, handle });
        info!(
            "event=notify_start module=notify status=ok poll_interval_ms={}",
            interval.as_millis()
        );
        Ok(())
    }

    /// Stops the background poll worker, waiting for it to exit. Idempotent.
    pub fn stop(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.stop_tx.send(());
            let _ = worker.handle.join();
            info!("event=notify_stop module=notify status=ok");
        }
    }

    /// Whether the poll worker is currently running.
    pub fn is_polling(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Category-wide (or wider) change: every listener must refresh fully.
    pub fn notify_global(&self) -> NotifyResult<DeliveryReport> {
        let marker = self.shared.marker.advance()?;
        self.shared.last_seen.store(marker, Ordering::SeqCst);
        let report = self.shared.deliver(&Signal::Global);
        info!(
            "event=notify_global module=notify status=ok marker={marker} delivered={} failed={}",
            report.delivered, report.failed
        );
        Ok(report)
    }

    /// Change confined to one article.
    pub fn notify_partial(&self, article_id: ArticleId) -> NotifyResult<DeliveryReport> {
        let marker = self.shared.marker.advance()?;
        self.shared.last_seen.store(marker, Ordering::SeqCst);
        let report = self.shared.deliver(&Signal::Partial(article_id));
        info!(
            "event=notify_partial module=notify status=ok article_id={article_id} marker={marker} delivered={} failed={}",
            report.delivered, report.failed
        );
        Ok(report)
    }
}

impl Drop for NotificationHub {
    fn drop(&mut self) {
        self.stop();
    }
}
