//! # Event Store
//! Append-only SQLite log of enriched records with derived read views.
//!
//! The write path never raises: `append` reports success as a boolean and
//! the pipeline keeps going on failure. Read paths return well-formed
//! (possibly empty) results rather than errors. Schema and indices are
//! created idempotently on open.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use metrics::counter;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::{error, info, warn};

use crate::model::{
    format_timestamp, EnrichedRecord, Engagement, SentimentLabel, SentimentScore, StoredRecord,
};

#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Open (creating if needed) the store at `path`. Parent directories
    /// are created; schema and indices are applied idempotently.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating store directory {}", dir.display()))?;
            }
        }
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&url)
            .await
            .with_context(|| format!("opening event store at {}", path.display()))?;
        Self::init_schema(&pool).await?;
        info!(path = %path.display(), "event store ready");
        Ok(Self { pool })
    }

    /// In-memory store for tests. Single connection: every SQLite
    /// `:memory:` connection is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("opening in-memory event store")?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                author TEXT,
                retweet_count INTEGER DEFAULT 0,
                favorite_count INTEGER DEFAULT 0,
                sentiment TEXT,
                trends TEXT
            )
            "#,
        )
        .execute(pool)
        .await
        .context("creating events table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)")
            .execute(pool)
            .await
            .context("creating timestamp index")?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_author ON events(author)")
            .execute(pool)
            .await
            .context("creating author index")?;
        Ok(())
    }

    /// Persist one enriched record. Returns `false` on storage fault (the
    /// fault is logged and counted); never panics or propagates.
    pub async fn append(&self, rec: &EnrichedRecord) -> bool {
        let sentiment = match serde_json::to_string(&rec.sentiment) {
            Ok(s) => s,
            Err(err) => {
                error!(error = %err, "failed to serialize sentiment");
                return false;
            }
        };
        let trends = match serde_json::to_string(&rec.top_trends) {
            Ok(s) => s,
            Err(err) => {
                error!(error = %err, "failed to serialize trend snapshot");
                return false;
            }
        };

        let res = sqlx::query(
            r#"
            INSERT INTO events (
                text, timestamp, author,
                retweet_count, favorite_count,
                sentiment, trends
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&rec.text)
        .bind(format_timestamp(rec.observed_at))
        .bind(&rec.author)
        .bind(rec.engagement.retweets as i64)
        .bind(rec.engagement.favorites as i64)
        .bind(sentiment)
        .bind(trends)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "failed to append event record");
                counter!("store_append_failures_total").increment(1);
                false
            }
        }
    }

    /// Most recent records first (timestamp, then id as a stable
    /// tie-break). Malformed rows are skipped with a warning.
    pub async fn recent_records(&self, limit: u32) -> Vec<StoredRecord> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, text, timestamp, author, retweet_count, favorite_count, sentiment, trends
            FROM events
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| {
                    let id = row.id;
                    let rec = row.into_record();
                    if rec.is_none() {
                        warn!(id, "skipping event row with malformed timestamp");
                    }
                    rec
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "failed to read recent records");
                Vec::new()
            }
        }
    }

    /// Count of records per sentiment label within the trailing window
    /// (strictly newer than `now - window`).
    pub async fn sentiment_histogram(&self, window: Duration) -> HashMap<SentimentLabel, u64> {
        let cutoff = format_timestamp(cutoff_time(window));
        let rows = sqlx::query(
            r#"
            SELECT json_extract(sentiment, '$.label') AS label, COUNT(*) AS cnt
            FROM events
            WHERE timestamp > ?
            GROUP BY label
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await;

        let mut out = HashMap::new();
        match rows {
            Ok(rows) => {
                for row in rows {
                    let label: Option<String> = row.try_get("label").unwrap_or(None);
                    let cnt: i64 = row.try_get("cnt").unwrap_or(0);
                    let label = match label.as_deref() {
                        Some("positive") => SentimentLabel::Positive,
                        Some("negative") => SentimentLabel::Negative,
                        Some("neutral") => SentimentLabel::Neutral,
                        _ => continue,
                    };
                    out.insert(label, cnt.max(0) as u64);
                }
            }
            Err(err) => warn!(error = %err, "failed to read sentiment histogram"),
        }
        out
    }

    /// Event volume grouped into fixed-width time buckets (unix-epoch
    /// floor). The most recent `limit` buckets, returned in ascending
    /// bucket-start order.
    pub async fn volume_by_bucket(
        &self,
        width: Duration,
        limit: u32,
    ) -> Vec<(DateTime<Utc>, u64)> {
        let w = width.as_secs().max(1) as i64;
        let rows = sqlx::query(
            r#"
            SELECT (CAST(strftime('%s', timestamp) AS INTEGER) / ?1) * ?1 AS bucket,
                   COUNT(*) AS cnt
            FROM events
            GROUP BY bucket
            ORDER BY bucket DESC
            LIMIT ?2
            "#,
        )
        .bind(w)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await;

        let mut out: Vec<(DateTime<Utc>, u64)> = match rows {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| {
                    let bucket: i64 = row.try_get("bucket").ok()?;
                    let cnt: i64 = row.try_get("cnt").ok()?;
                    let start = Utc.timestamp_opt(bucket, 0).single()?;
                    Some((start, cnt.max(0) as u64))
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "failed to read volume buckets");
                Vec::new()
            }
        };
        out.reverse();
        out
    }

    /// Delete records past the retention span; returns the number removed.
    /// `retention` of zero removes everything already stored. A negative
    /// span is unrepresentable in `std::time::Duration`.
    pub async fn purge_older_than(&self, retention: Duration) -> Result<u64> {
        let cutoff = format_timestamp(cutoff_time(retention));
        let res = sqlx::query("DELETE FROM events WHERE timestamp <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("purging expired event records")?;
        let removed = res.rows_affected();
        info!(removed, "purged expired event records");
        Ok(removed)
    }

    /// Release the connection pool. Call on every shutdown path.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn cutoff_time(span: Duration) -> DateTime<Utc> {
    let secs = span.as_secs().min(i64::MAX as u64) as i64;
    Utc::now() - chrono::Duration::seconds(secs)
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    text: String,
    timestamp: String,
    author: Option<String>,
    retweet_count: i64,
    favorite_count: i64,
    sentiment: Option<String>,
    trends: Option<String>,
}

impl EventRow {
    /// `None` only for an unparseable timestamp; missing/corrupt JSON
    /// columns degrade to neutral/empty defaults like the read contract
    /// demands.
    fn into_record(self) -> Option<StoredRecord> {
        let observed_at = DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()?
            .with_timezone(&Utc);
        let sentiment: SentimentScore = self
            .sentiment
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_else(SentimentScore::neutral);
        let top_trends: BTreeMap<String, u64> = self
            .trends
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        Some(StoredRecord {
            id: self.id,
            text: self.text,
            observed_at,
            author: self.author.unwrap_or_else(|| "unknown".to_string()),
            engagement: Engagement {
                retweets: self.retweet_count.clamp(0, u32::MAX as i64) as u32,
                favorites: self.favorite_count.clamp(0, u32::MAX as i64) as u32,
            },
            sentiment,
            top_trends,
        })
    }
}
