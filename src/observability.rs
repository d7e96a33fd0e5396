use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Counters for workflow operations
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub status_transitions: AtomicU64,
    pub promotions: AtomicU64,
    pub submissions_moved: AtomicU64,
    pub deletions: AtomicU64,
    pub document_failures: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_transition(&self) {
        self.status_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_moved(&self) {
        self.submissions_moved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deletion(&self) {
        self.deletions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document_failure(&self) {
        self.document_failures.fetch_add(1, Ordering::Relaxed);
        warn!("Registration document generation failed");
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            status_transitions: self.status_transitions.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            submissions_moved: self.submissions_moved.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
            document_failures: self.document_failures.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: transitions={}, promotions={}, submissions_moved={}, deletions={}, document_failures={}",
            stats.status_transitions,
            stats.promotions,
            stats.submissions_moved,
            stats.deletions,
            stats.document_failures
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStats {
    pub status_transitions: u64,
    pub promotions: u64,
    pub submissions_moved: u64,
    pub deletions: u64,
    pub document_failures: u64,
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
