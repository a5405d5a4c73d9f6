// src/lib.rs
// Public library surface for the embedding process and integration tests.

pub mod analyzer;
pub mod config;
pub mod feed;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod sentiment;
pub mod store;
pub mod trends;

// ---- Re-exports for stable public API ----
pub use crate::analyzer::{Analysis, Analyzer};
pub use crate::config::{Config, LiveCredentials};
pub use crate::feed::{FeedSource, SourceMode};
pub use crate::model::{
    EnrichedRecord, Engagement, RawEvent, SentimentLabel, SentimentScore, StoredRecord,
};
pub use crate::pipeline::Pipeline;
pub use crate::store::EventStore;
pub use crate::trends::TrendWindow;
