//! # Trend Window
//! Sliding-window frequency counter over extracted trend tokens (24h
//! horizon by default).
//!
//! Entries are appended in observation order and evicted strictly from the
//! oldest end; the running count map is kept in lockstep, so for every
//! token `count == number of live entries containing it`. Eviction is lazy:
//! it runs at the head of every `record`/`top_k` call, no background timer.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Retention horizon for trend counting.
pub const TREND_HORIZON: Duration = Duration::from_secs(24 * 3600);

/// Thread-safe sliding time window over trend tokens.
#[derive(Debug)]
pub struct TrendWindow {
    inner: Mutex<Inner>,
    window: Duration,
}

#[derive(Debug)]
struct Inner {
    /// FIFO of window entries as `(unix_seconds, tokens)`. Hashtags and
    /// mentions arrive deduplicated; repeated 3-gram phrases keep their
    /// positional multiplicity, hence a Vec rather than a set.
    entries: VecDeque<(u64, Vec<String>)>,
    /// Running frequency map; a count reaching 0 removes the key.
    counts: HashMap<String, u64>,
}

impl TrendWindow {
    /// Create a window with the given horizon.
    pub fn with_window(window: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::new(),
                counts: HashMap::new(),
            }),
            window,
        }
    }

    /// Convenience constructor for the 24h horizon.
    pub fn new_24h() -> Self {
        Self::with_window(TREND_HORIZON)
    }

    /// Record one event's tokens. If `ts_unix` is `None`, current time is
    /// used. Evicts expired entries first. An empty token list is a no-op
    /// contribution, never an error.
    ///
    /// Entries are kept in `inserted_at` order: a backdated record is
    /// placed at its chronological position, not blindly appended, so
    /// front-only eviction stays correct (seeding backdates entries).
    pub fn record(&self, tokens: Vec<String>, ts_unix: Option<u64>) {
        let now = now_unix();
        let ts = ts_unix.unwrap_or(now);

        let mut inner = self.inner.lock().expect("trend window mutex poisoned");
        Self::evict_locked(&mut inner, now, self.window);

        for tok in &tokens {
            *inner.counts.entry(tok.clone()).or_insert(0) += 1;
        }
        // Common case: timestamps are monotonic and this is a push_back.
        let idx = inner
            .entries
            .iter()
            .rposition(|(t, _)| *t <= ts)
            .map_or(0, |i| i + 1);
        inner.entries.insert(idx, (ts, tokens));
    }

    /// Top `k` tokens by count descending. Ties break by lexical token
    /// order (ascending); a deliberate, stable contract.
    pub fn top_k(&self, k: usize) -> Vec<(String, u64)> {
        let now = now_unix();
        let mut inner = self.inner.lock().expect("trend window mutex poisoned");
        Self::evict_locked(&mut inner, now, self.window);

        let mut all: Vec<(String, u64)> = inner
            .counts
            .iter()
            .map(|(t, c)| (t.clone(), *c))
            .collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(k);
        all
    }

    /// Drop expired entries now. Idempotent: a second call with no
    /// intervening inserts leaves the count map unchanged.
    pub fn evict(&self) {
        let now = now_unix();
        let mut inner = self.inner.lock().expect("trend window mutex poisoned");
        Self::evict_locked(&mut inner, now, self.window);
    }

    /// Consistent copy of the running frequency map (after eviction).
    pub fn snapshot(&self) -> HashMap<String, u64> {
        let now = now_unix();
        let mut inner = self.inner.lock().expect("trend window mutex poisoned");
        Self::evict_locked(&mut inner, now, self.window);
        inner.counts.clone()
    }

    /// Horizon length in seconds (diagnostics).
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// Entries at or past the horizon stop contributing: the boundary is
    /// strict, an entry exactly `window` old is dropped.
    fn evict_locked(inner: &mut Inner, now: u64, window: Duration) {
        let cutoff = now.saturating_sub(window.as_secs());
        while let Some((ts, _)) = inner.entries.front() {
            if *ts > cutoff {
                break;
            }
            let (_, tokens) = inner
                .entries
                .pop_front()
                .expect("front checked non-empty");
            for tok in tokens {
                if let Some(c) = inner.counts.get_mut(&tok) {
                    *c = c.saturating_sub(1);
                    if *c == 0 {
                        inner.counts.remove(&tok);
                    }
                }
            }
        }
    }
}

impl Default for TrendWindow {
    fn default() -> Self {
        Self::new_24h()
    }
}

/// Current UNIX time in seconds.
pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
