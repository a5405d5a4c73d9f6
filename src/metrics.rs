//! One-time registration of the pipeline's metric series. The crate only
//! talks to the `metrics` facade; installing a recorder/exporter is the
//! embedding application's choice.

use metrics::describe_counter;
use once_cell::sync::OnceCell;

/// Idempotent; call from any startup path.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_events_total",
            "Raw events received from the feed source."
        );
        describe_counter!(
            "store_append_failures_total",
            "Enriched records dropped by a storage fault."
        );
        describe_counter!(
            "feed_fallbacks_total",
            "Live-to-synthetic degradations for this process."
        );
    });
}
