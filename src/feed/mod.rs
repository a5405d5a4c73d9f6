//! # Feed Sources
//! Event production with graceful degradation: a live network-backed stream
//! that falls back to a local synthetic generator on auth/rate-limit
//! failure. The fallback is one-directional for the lifetime of a
//! `FeedSource` instance.

pub mod live;
pub mod synthetic;

pub use live::LiveSource;
pub use synthetic::SyntheticSource;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};

use crate::config::LiveCredentials;
use crate::model::RawEvent;

/// Grace period for the producer task to observe `stop()` before it is
/// aborted (a stalled live connection has no natural wakeup).
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Operating mode of the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Live,
    Synthetic,
}

/// Why a live producer gave up. The façade treats every variant as a
/// fallback trigger; the distinction is for logs and tests.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("rate limited by live endpoint (HTTP {status})")]
    RateLimited { status: u16 },
    #[error("live stream setup failed: {0}")]
    Setup(#[source] anyhow::Error),
    #[error("live stream read failed: {0}")]
    Stream(#[source] anyhow::Error),
}

/// One producer variant. Implementations emit `RawEvent`s into `tx` until
/// the stream ends, the running flag clears, or the receiver goes away.
#[async_trait::async_trait]
pub trait EventProducer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        keywords: &[String],
        tx: mpsc::Sender<RawEvent>,
        running: Arc<AtomicBool>,
    ) -> Result<(), FeedError>;
}

/// Façade over the two producer variants plus the live-to-synthetic state
/// machine. Intended to be shared as `Arc<FeedSource>`.
pub struct FeedSource {
    live: Option<LiveSource>,
    synthetic: SyntheticSource,
    running: Arc<AtomicBool>,
    degraded: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FeedSource {
    /// Missing or unusable credentials select Synthetic immediately,
    /// without attempting a connection; a normal, handled condition.
    pub fn new(creds: Option<LiveCredentials>) -> Self {
        let live = match creds {
            Some(c) if c.is_usable() => Some(LiveSource::new(&c)),
            Some(_) => {
                warn!("live credentials incomplete; using synthetic source");
                None
            }
            None => {
                info!("no live credentials; using synthetic source");
                None
            }
        };
        Self {
            live,
            synthetic: SyntheticSource::new(),
            running: Arc::new(AtomicBool::new(false)),
            degraded: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// Override the synthetic generation interval (tests, demos).
    pub fn with_generation_interval(mut self, interval: Duration) -> Self {
        self.synthetic = SyntheticSource::with_interval(interval);
        self
    }

    /// Point the live client at a different endpoint (tests against a
    /// local or erroring server). No-op when no live source is configured.
    pub fn with_live_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.live = self.live.take().map(|l| l.with_base_url(base_url));
        self
    }

    /// Current operating mode. Transitions run live to synthetic only,
    /// never back.
    pub fn mode(&self) -> SourceMode {
        if self.live.is_some() && !self.degraded.load(Ordering::Acquire) {
            SourceMode::Live
        } else {
            SourceMode::Synthetic
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Begin production into `tx`, filtering by an OR-combination of
    /// `keywords` when live. Any live failure degrades the session to the
    /// synthetic generator and keeps producing.
    pub fn start(self: &Arc<Self>, keywords: Vec<String>, tx: mpsc::Sender<RawEvent>) {
        self.running.store(true, Ordering::Release);
        let src = Arc::clone(self);
        let task = tokio::spawn(async move {
            if let Some(live) = src.live.as_ref().filter(|_| !src.degraded.load(Ordering::Acquire))
            {
                info!(source = live.name(), "starting live stream");
                match live
                    .run(&keywords, tx.clone(), Arc::clone(&src.running))
                    .await
                {
                    Ok(()) => return, // clean disconnect via stop()
                    Err(err) => {
                        warn!(error = %err, "live stream failed; degrading to synthetic source");
                        counter!("feed_fallbacks_total").increment(1);
                        src.degraded.store(true, Ordering::Release);
                    }
                }
            }
            if src.running.load(Ordering::Acquire) {
                info!(source = src.synthetic.name(), "starting synthetic generator");
                let _ = src
                    .synthetic
                    .run(&keywords, tx, Arc::clone(&src.running))
                    .await;
            }
        });
        *self.handle.lock().expect("feed handle mutex poisoned") = Some(task);
    }

    /// Signal the producer to stop and wait for it. The synthetic loop
    /// observes the flag within one generation interval; a wedged live
    /// connection is aborted after a short grace period.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let task = self.handle.lock().expect("feed handle mutex poisoned").take();
        if let Some(mut task) = task {
            if tokio::time::timeout(STOP_GRACE, &mut task).await.is_err() {
                task.abort();
                let _ = task.await;
            }
        }
    }
}
