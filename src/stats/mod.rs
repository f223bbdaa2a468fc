use chrono::{DateTime, Utc};
use log::info;
use parking_lot::RwLock;
use serde::Serialize;

use crate::extract::PriceOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub tasks: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
}

/// Per-batch tallies, safe to update from concurrent workers.
#[derive(Debug)]
pub struct BatchStats {
    inner: RwLock<BatchSummary>,
}

impl BatchStats {
    pub fn new(tasks: usize) -> Self {
        Self {
            inner: RwLock::new(BatchSummary {
                start_time: Utc::now(),
                end_time: None,
                tasks,
                found: 0,
                not_found: 0,
                failed: 0,
            }),
        }
    }

    pub fn record(&self, outcome: &PriceOutcome) {
        let mut stats = self.inner.write();
        match outcome {
            PriceOutcome::Found(_) => stats.found += 1,
            PriceOutcome::NotFound => stats.not_found += 1,
            PriceOutcome::Failed(_) => stats.failed += 1,
        }
    }

    pub fn finish(&self) {
        self.inner.write().end_time = Some(Utc::now());
    }

    pub fn summary(&self) -> BatchSummary {
        self.inner.read().clone()
    }

    pub fn log_summary(&self) {
        let stats = self.summary();
        let elapsed = stats
            .end_time
            .map(|end| end.signed_duration_since(stats.start_time))
            .map(|d| d.num_milliseconds())
            .unwrap_or_default();
        info!(
            "Batch completed: {} tasks, {} priced, {} without price, {} failed, {}ms",
            stats.tasks, stats.found, stats.not_found, stats.failed, elapsed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_each_outcome_kind() {
        let stats = BatchStats::new(3);
        stats.record(&PriceOutcome::Found("$10".into()));
        stats.record(&PriceOutcome::NotFound);
        stats.record(&PriceOutcome::Failed("nav".into()));
        stats.finish();

        let summary = stats.summary();
        assert_eq!(summary.tasks, 3);
        assert_eq!(summary.found, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.end_time.is_some());
    }
}
