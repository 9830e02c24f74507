//! Running counters for one parse stream.

use std::{
    cell::Cell,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters shared by a [`crate::result::ParseResult`] and its iterator.
///
/// Rows dropped by the header or mandatory-column filters never reach the counters.
#[derive(Debug)]
pub struct Stats {
    processed: Cell<usize>,
    valid: Cell<usize>,
    errors: Cell<usize>,
    started: Instant,
    started_at: DateTime<Utc>,
    finished: Cell<Option<Instant>>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            processed: Cell::new(0),
            valid: Cell::new(0),
            errors: Cell::new(0),
            started: Instant::now(),
            started_at: Utc::now(),
            finished: Cell::new(None),
        }
    }

    pub(crate) fn record_valid(&self) {
        self.processed.set(self.processed.get() + 1);
        self.valid.set(self.valid.get() + 1);
    }

    pub(crate) fn record_error(&self) {
        self.processed.set(self.processed.get() + 1);
        self.errors.set(self.errors.get() + 1);
    }

    /// Stops the clock. Only the first call has an effect.
    pub(crate) fn finish(&self) {
        if self.finished.get().is_none() {
            self.finished.set(Some(Instant::now()));
        }
    }

    pub fn processed_rows(&self) -> usize {
        self.processed.get()
    }

    pub fn valid_rows(&self) -> usize {
        self.valid.get()
    }

    pub fn error_rows(&self) -> usize {
        self.errors.get()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get().is_some()
    }

    /// Percentage of processed rows that produced a record; `0.0` before any row.
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed_rows();
        if processed == 0 {
            return 0.0;
        }
        self.valid_rows() as f64 / processed as f64 * 100.0
    }

    /// Elapsed time, available once the stream is exhausted.
    pub fn processing_time(&self) -> Option<Duration> {
        self.finished
            .get()
            .map(|finished| finished.duration_since(self.started))
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed_rows: self.processed_rows(),
            valid_rows: self.valid_rows(),
            error_rows: self.error_rows(),
            success_rate: self.success_rate(),
            processing_time: self.processing_time().map(|d| d.as_secs_f64()),
        }
    }
}

/// Serializable copy of [`Stats`]; `processing_time` is in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub processed_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
    pub success_rate: f64,
    pub processing_time: Option<f64>,
}
