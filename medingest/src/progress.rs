//! Progress aggregation for concurrent downloads.
//!
//! Every remote entry reports its own download progress independently. The
//! `ProgressMap` keeps the latest report per entry and folds them into a
//! single overall value for display.

use std::collections::HashMap;

use crate::queue::EntryId;

/// Download progress of a single source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Fraction of bytes received, in `[0, 1]`.
    Fraction(f64),
    /// The total size is unknown (no `Content-Length`).
    Indeterminate,
}

impl Progress {
    /// Build a progress value from byte counts.
    ///
    /// Without a known, non-zero total the result is always `Indeterminate`;
    /// a concrete fraction is never guessed.
    pub fn from_bytes(received: u64, total: Option<u64>) -> Self {
        match total {
            Some(total) if total > 0 => {
                Progress::Fraction((received as f64 / total as f64).clamp(0.0, 1.0))
            }
            _ => Progress::Indeterminate,
        }
    }

    /// The fraction, if known.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Progress::Fraction(f) => Some(*f),
            Progress::Indeterminate => None,
        }
    }
}

/// Aggregated progress across all sources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalProgress {
    /// Arithmetic mean of all per-source fractions.
    Determinate(f64),
    /// At least one source has unknown size.
    Indeterminate,
}

impl TotalProgress {
    /// The aggregate fraction, if every source is determinate.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            TotalProgress::Determinate(f) => Some(*f),
            TotalProgress::Indeterminate => None,
        }
    }
}

/// Latest progress report per entry.
#[derive(Debug, Clone, Default)]
pub struct ProgressMap {
    items: HashMap<EntryId, Progress>,
}

impl ProgressMap {
    /// Create an empty progress map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest progress for an entry, replacing any earlier report.
    pub fn set(&mut self, id: EntryId, progress: Progress) {
        self.items.insert(id, progress);
    }

    /// Get the latest progress for an entry.
    pub fn get(&self, id: EntryId) -> Option<Progress> {
        self.items.get(&id).copied()
    }

    /// Forget an entry.
    pub fn remove(&mut self, id: EntryId) {
        self.items.remove(&id);
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no source is tracked.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Aggregate all tracked sources.
    ///
    /// An empty map aggregates to `0`. Any indeterminate source makes the
    /// aggregate indeterminate.
    pub fn total(&self) -> TotalProgress {
        if self.items.is_empty() {
            return TotalProgress::Determinate(0.0);
        }

        let mut sum = 0.0;
        for progress in self.items.values() {
            match progress {
                Progress::Fraction(f) => sum += f,
                Progress::Indeterminate => return TotalProgress::Indeterminate,
            }
        }

        TotalProgress::Determinate(sum / self.items.len() as f64)
    }
}
