//! The lazy, consume-once record stream returned by [`crate::parser::Parser::parse`].

use std::{cell::RefCell, fmt, ops::ControlFlow, rc::Rc};

use log::{info, warn};

use crate::{
    error::{Error, Result, RowError},
    pipeline::{RowOutcome, Rows},
    record::FromRow,
    stats::Stats,
};

/// Called for every failed row with the running stats. `Break` stops the stream.
pub type ErrorCallback<'a> = Box<dyn FnMut(&RowError, &Stats) -> ControlFlow<String> + 'a>;

/// Owns one lazy record sequence and the stats it accumulates.
///
/// The sequence can be consumed exactly once, either through [`ParseResult::iter`] or
/// [`ParseResult::to_vec`]; any further attempt returns [`Error::StreamState`]. Stats stay
/// readable throughout.
pub struct ParseResult<'a, R> {
    source: RefCell<Option<ParseIter<'a, R>>>,
    stats: Rc<Stats>,
}

impl<R> fmt::Debug for ParseResult<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseResult")
            .field("consumed", &self.source.borrow().is_none())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<'a, R: FromRow> ParseResult<'a, R> {
    pub(crate) fn new(rows: Rows<'a, R>, callback: Option<ErrorCallback<'a>>) -> Self {
        let stats = Rc::new(Stats::new());
        let stop_on_first_failure = rows.stop_on_first_failure();
        let iter = ParseIter {
            rows,
            stats: Rc::clone(&stats),
            callback,
            stop_on_first_failure,
            done: false,
        };
        Self {
            source: RefCell::new(Some(iter)),
            stats,
        }
    }

    /// Takes the record iterator. Fails if the sequence was already taken.
    pub fn iter(&self) -> Result<ParseIter<'a, R>> {
        self.source
            .borrow_mut()
            .take()
            .ok_or(Error::StreamState("ParseResult can only be consumed once"))
    }

    /// Collects every record. Stops at the first stream error.
    pub fn to_vec(&self) -> Result<Vec<R>> {
        self.iter()?.collect()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// True once the underlying rows were exhausted.
    pub fn is_finished(&self) -> bool {
        self.stats.is_finished()
    }
}

/// Pull-based iterator over parsed records.
///
/// Failed rows are counted and handed to the error callback, then skipped, unless the schema
/// stops on the first failure, in which case that failure is yielded as the last item.
pub struct ParseIter<'a, R> {
    rows: Rows<'a, R>,
    stats: Rc<Stats>,
    callback: Option<ErrorCallback<'a>>,
    stop_on_first_failure: bool,
    done: bool,
}

impl<R> ParseIter<'_, R> {
    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl<R: FromRow> Iterator for ParseIter<'_, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let Some((index, outcome)) = self.rows.next() else {
                self.done = true;
                self.stats.finish();
                info!(
                    "Parsed {} row(s): {} valid, {} failed ({:.2}% success)",
                    self.stats.processed_rows(),
                    self.stats.valid_rows(),
                    self.stats.error_rows(),
                    self.stats.success_rate()
                );
                return None;
            };

            match outcome {
                RowOutcome::Parsed(record) => {
                    self.stats.record_valid();
                    return Some(Ok(record));
                }
                RowOutcome::Failed(error) => {
                    self.stats.record_error();
                    if self.stop_on_first_failure {
                        warn!("Stopping at row {index}: {}", error.message);
                        self.done = true;
                        return Some(Err(Error::from(error)));
                    }
                    if let Some(callback) = self.callback.as_mut()
                        && let ControlFlow::Break(reason) = callback(&error, &self.stats)
                    {
                        warn!("Error callback aborted the stream at row {index}: {reason}");
                        self.done = true;
                        return Some(Err(Error::Aborted { row: index, reason }));
                    }
                }
            }
        }
    }
}
