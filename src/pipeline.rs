//! # Pipeline
//! Wires the feed source through the analyzer into the event store and
//! owns the run/stop
//! lifecycle. Each event is enriched fully (sentiment + trend snapshot)
//! before its append is issued; a failed append logs and the stream keeps
//! flowing.

use std::sync::{Arc, Mutex};

use metrics::counter;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::analyzer::Analyzer;
use crate::feed::FeedSource;
use crate::model::EnrichedRecord;
use crate::store::EventStore;

/// Backpressure bound between the producer and the enrichment consumer.
const CHANNEL_CAPACITY: usize = 256;

pub struct Pipeline {
    analyzer: Arc<Analyzer>,
    store: EventStore,
    feed: Arc<FeedSource>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    pub fn new(analyzer: Arc<Analyzer>, store: EventStore, feed: Arc<FeedSource>) -> Self {
        Self {
            analyzer,
            store,
            feed,
            consumer: Mutex::new(None),
        }
    }

    /// Read-only access for external consumers (dashboard/CLI).
    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    pub fn feed(&self) -> &Arc<FeedSource> {
        &self.feed
    }

    /// Start production and the enrichment consumer.
    pub fn start(&self, keywords: Vec<String>) {
        crate::metrics::ensure_metrics_described();

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.feed.start(keywords, tx);

        let analyzer = Arc::clone(&self.analyzer);
        let store = self.store.clone();
        let task = tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                counter!("pipeline_events_total").increment(1);
                let analysis = analyzer.process(&ev.text);
                let record = EnrichedRecord {
                    text: ev.text,
                    observed_at: ev.observed_at,
                    author: ev.author,
                    engagement: ev.engagement,
                    sentiment: analysis.sentiment,
                    top_trends: analysis.top_trends.into_iter().collect(),
                };
                if !store.append(&record).await {
                    warn!(author = %record.author, "record dropped by store; continuing");
                }
            }
            debug!("pipeline consumer drained");
        });
        *self.consumer.lock().expect("consumer handle mutex poisoned") = Some(task);
        info!("pipeline started");
    }

    /// Stop the feed, then wait for the consumer to drain the channel.
    pub async fn stop(&self) {
        self.feed.stop().await;
        let task = self
            .consumer
            .lock()
            .expect("consumer handle mutex poisoned")
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        info!("pipeline stopped");
    }
}
