// tests/store_queries.rs

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use social_stream_analyzer::model::{EnrichedRecord, Engagement, SentimentScore};
use social_stream_analyzer::{EventStore, SentimentLabel};

fn record(text: &str, author: &str, at: DateTime<Utc>, polarity: f32) -> EnrichedRecord {
    EnrichedRecord {
        text: text.to_string(),
        observed_at: at,
        author: author.to_string(),
        engagement: Engagement {
            retweets: 1,
            favorites: 2,
        },
        sentiment: SentimentScore::from_parts(polarity, 0.5),
        top_trends: BTreeMap::from([("#ai".to_string(), 2u64)]),
    }
}

#[tokio::test]
async fn append_then_recent_returns_that_record_first() {
    let store = EventStore::open_in_memory().await.unwrap();
    assert!(
        store
            .append(&record("first", "alice", Utc::now() - ChronoDuration::seconds(5), 0.2))
            .await
    );
    assert!(store.append(&record("second", "bob", Utc::now(), -0.3)).await);

    let recent = store.recent_records(1).await;
    assert_eq!(recent.len(), 1);
    let r = &recent[0];
    assert_eq!(r.text, "second");
    assert_eq!(r.author, "bob");
    assert_eq!(r.sentiment.label, SentimentLabel::Negative);
    assert_eq!(r.engagement.retweets, 1);
    assert_eq!(r.top_trends.get("#ai"), Some(&2));
}

#[tokio::test]
async fn histogram_counts_labels_within_window_only() {
    let store = EventStore::open_in_memory().await.unwrap();
    let now = Utc::now();
    store.append(&record("up one", "a", now, 0.5)).await;
    store.append(&record("up two", "b", now, 0.9)).await;
    store.append(&record("down", "c", now, -0.4)).await;
    store.append(&record("flat", "d", now, 0.0)).await;
    // Outside the 24h window; must not count.
    store
        .append(&record("stale", "e", now - ChronoDuration::hours(48), 0.8))
        .await;

    let hist = store
        .sentiment_histogram(Duration::from_secs(24 * 3600))
        .await;
    assert_eq!(hist.get(&SentimentLabel::Positive), Some(&2));
    assert_eq!(hist.get(&SentimentLabel::Negative), Some(&1));
    assert_eq!(hist.get(&SentimentLabel::Neutral), Some(&1));
}

#[tokio::test]
async fn same_minute_events_share_one_hourly_bucket() {
    let store = EventStore::open_in_memory().await.unwrap();
    let at = Utc::now();
    for i in 0..5 {
        assert!(store.append(&record(&format!("event {i}"), "a", at, 0.0)).await);
    }

    let buckets = store.volume_by_bucket(Duration::from_secs(3600), 10).await;
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].1, 5);
    // Bucket start is floored to the hour boundary.
    assert!(buckets[0].0 <= at);
}

#[tokio::test]
async fn buckets_come_back_ascending() {
    let store = EventStore::open_in_memory().await.unwrap();
    let now = Utc::now();
    store.append(&record("old", "a", now - ChronoDuration::hours(3), 0.0)).await;
    store.append(&record("new", "a", now, 0.0)).await;

    let buckets = store.volume_by_bucket(Duration::from_secs(3600), 10).await;
    assert_eq!(buckets.len(), 2);
    assert!(buckets[0].0 < buckets[1].0);
}

#[tokio::test]
async fn purge_with_zero_retention_empties_the_store() {
    let store = EventStore::open_in_memory().await.unwrap();
    let now = Utc::now();
    for i in 0..3 {
        store
            .append(&record(&format!("event {i}"), "a", now - ChronoDuration::seconds(i), 0.0))
            .await;
    }

    let removed = store.purge_older_than(Duration::ZERO).await.unwrap();
    assert_eq!(removed, 3);
    assert!(store.recent_records(10).await.is_empty());
}

#[tokio::test]
async fn purge_respects_a_nonzero_retention() {
    let store = EventStore::open_in_memory().await.unwrap();
    let now = Utc::now();
    store.append(&record("keep", "a", now, 0.0)).await;
    store
        .append(&record("drop", "a", now - ChronoDuration::days(8), 0.0))
        .await;

    let removed = store
        .purge_older_than(Duration::from_secs(7 * 24 * 3600))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    let recent = store.recent_records(10).await;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].text, "keep");
}

#[tokio::test]
async fn schema_init_is_idempotent_across_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.db");

    let store = EventStore::open(&path).await.unwrap();
    assert!(store.append(&record("persisted", "a", Utc::now(), 0.1)).await);
    store.close().await;

    let store = EventStore::open(&path).await.unwrap();
    let recent = store.recent_records(10).await;
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].text, "persisted");
    store.close().await;
}
