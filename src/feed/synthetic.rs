//! Local placeholder generator: one sampled event per interval, with
//! randomized author handles and engagement counts. Self-healing: a
//! generation error logs and backs off instead of killing the loop.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use rand::{seq::IndexedRandom, Rng};
use tokio::sync::mpsc;
use tracing::warn;

use crate::feed::{EventProducer, FeedError};
use crate::model::{Engagement, RawEvent};

/// Reference cadence of the generator.
pub const GENERATION_INTERVAL: Duration = Duration::from_secs(2);

/// Longer pause after a generation error.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

const SAMPLE_TEXTS: [&str; 10] = [
    "Excited to learn about #AI and #MachineLearning today!",
    "Just finished a great #Python project on #DataScience",
    "The future of #Technology is in artificial intelligence",
    "Working on deep learning models with #TensorFlow",
    "Big data analytics is transforming business #Innovation",
    "Neural networks are amazing for #ComputerVision tasks",
    "Learning about natural language processing #NLP",
    "Cloud computing and #AI are the perfect combination",
    "Data visualization makes insights clearer #DataViz",
    "Building robust machine learning pipelines #MLOps",
];

#[derive(Debug, Clone)]
pub struct SyntheticSource {
    interval: Duration,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            interval: GENERATION_INTERVAL,
        }
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample one event from the fixed corpus.
fn sample_event() -> Result<RawEvent> {
    let mut rng = rand::rng();
    let text = SAMPLE_TEXTS
        .choose(&mut rng)
        .ok_or_else(|| anyhow!("empty sample corpus"))?;
    Ok(RawEvent {
        text: (*text).to_string(),
        observed_at: Utc::now(),
        author: format!("sample_user_{}", rng.random_range(1..=1000)),
        engagement: Engagement {
            retweets: rng.random_range(0..=100),
            favorites: rng.random_range(0..=200),
        },
    })
}

#[async_trait::async_trait]
impl EventProducer for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    /// Emits until `running` clears or the receiver is dropped. Keywords
    /// are ignored; the corpus is fixed.
    async fn run(
        &self,
        _keywords: &[String],
        tx: mpsc::Sender<RawEvent>,
        running: Arc<AtomicBool>,
    ) -> Result<(), FeedError> {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if !running.load(Ordering::Acquire) {
                break;
            }
            match sample_event() {
                Ok(ev) => {
                    if tx.send(ev).await.is_err() {
                        break; // receiver gone; pipeline is shutting down
                    }
                }
                Err(err) => {
                    warn!(error = %err, "synthetic generation error; backing off");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_events_are_well_formed() {
        let ev = sample_event().unwrap();
        assert!(SAMPLE_TEXTS.contains(&ev.text.as_str()));
        assert!(ev.author.starts_with("sample_user_"));
        assert!(ev.engagement.retweets <= 100);
        assert!(ev.engagement.favorites <= 200);
    }

    #[tokio::test]
    async fn generator_observes_stop_flag() {
        let src = SyntheticSource::with_interval(Duration::from_millis(10));
        let (tx, mut rx) = mpsc::channel(16);
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let task = tokio::spawn(async move { src.run(&[], tx, flag).await });

        // At least one event arrives, then stop is honored promptly.
        let first = tokio::time::timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("an event within the deadline");
        assert!(first.is_some());

        running.store(false, Ordering::Release);
        tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .expect("generator exits after stop")
            .unwrap()
            .unwrap();
    }
}
