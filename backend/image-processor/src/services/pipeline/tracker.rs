//! Completion tracking
//!
//! Once every rendition of an image is stored, the processed count of its
//! photo array goes up by one. Failure here is logged and never rolls back
//! the uploads.

use crate::metrics;
use crate::services::counter::{CounterError, CounterKey, ProcessedCounter};
use tracing::{info, warn};

/// Result of the completion step for one image
#[derive(Debug)]
pub enum CounterOutcome {
    /// Counter advanced; holds the new count
    Incremented(u64),
    /// The record store rejected the increment
    Failed(CounterError),
    /// Renditions failed and strict mode kept the counter untouched
    Withheld { failed_renditions: Vec<&'static str> },
}

impl CounterOutcome {
    pub fn is_incremented(&self) -> bool {
        matches!(self, CounterOutcome::Incremented(_))
    }
}

pub async fn record_completion(
    counter: &dyn ProcessedCounter,
    table: &str,
    key: &CounterKey,
) -> CounterOutcome {
    match counter.increment(table, key).await {
        Ok(count) => {
            info!(table, key = %key, processed_count = count, "Updated processed count");
            metrics::COUNTER_INCREMENTS_TOTAL
                .with_label_values(&[metrics::status_label(true)])
                .inc();
            CounterOutcome::Incremented(count)
        }
        Err(e) => {
            warn!(
                table,
                key = %key,
                error = %e,
                "Failed to update processed count, renditions remain stored"
            );
            metrics::COUNTER_INCREMENTS_TOTAL
                .with_label_values(&[metrics::status_label(false)])
                .inc();
            CounterOutcome::Failed(e)
        }
    }
}
