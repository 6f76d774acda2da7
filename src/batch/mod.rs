//! Batch ranking of several generated candidates against one target.
//!
//! Every candidate is an independent comparison, so they run in parallel on
//! a bounded Rayon pool and share nothing but the immutable engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use promptmatch::{BatchComparator, ImageSource, SimilarityEngine};
//!
//! let comparator = BatchComparator::new(SimilarityEngine::default()).max_parallel(4);
//! let candidates: Vec<ImageSource> = ["a.png", "b.png"].iter().map(|s| ImageSource::parse(s)).collect();
//!
//! let report = comparator.rank(&ImageSource::parse("target.png"), &candidates)?;
//! if let Some(best) = report.best() {
//!     println!("Best: {} at {:.2}%", best.source, best.result.percentage);
//! }
//! ```

mod discovery;

pub use discovery::{is_image_path, ImageDiscovery, IMAGE_EXTENSIONS};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::acquire::ImageSource;
use crate::error::{Result, SimilarityError};
use crate::pipeline::SimilarityEngine;
use crate::scoring::ComparisonResult;

/// Score of one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Position of the candidate in the input list.
    pub index: usize,
    /// Candidate description.
    pub source: String,
    /// Comparison outcome.
    pub result: ComparisonResult,
    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

/// Scores of all candidates, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Target description.
    pub target: String,
    /// One entry per candidate.
    pub entries: Vec<BatchEntry>,
    /// Wall-clock time for the whole batch in milliseconds.
    pub total_time_ms: u64,
}

impl BatchReport {
    /// Highest scoring candidate that did not fail.
    pub fn best(&self) -> Option<&BatchEntry> {
        self.entries
            .iter()
            .filter(|e| !e.result.is_error())
            .max_by(|a, b| a.result.percentage.total_cmp(&b.result.percentage))
    }

    /// Number of candidates reaching `threshold` percent.
    pub fn passed(&self, threshold: f64) -> usize {
        self.entries
            .iter()
            .filter(|e| e.result.passes(threshold))
            .count()
    }

    /// Number of candidates that failed.
    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_error()).count()
    }

    /// Entries sorted by descending score; failed entries last.
    pub fn ranked(&self) -> Vec<&BatchEntry> {
        let mut ranked: Vec<&BatchEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| {
            a.result
                .is_error()
                .cmp(&b.result.is_error())
                .then(b.result.percentage.total_cmp(&a.result.percentage))
                .then(a.index.cmp(&b.index))
        });
        ranked
    }
}

/// Ranks candidates against a target in parallel.
pub struct BatchComparator {
    /// Engine shared by all comparisons.
    engine: SimilarityEngine,

    /// Maximum parallel comparisons.
    max_parallel: usize,
}

impl BatchComparator {
    /// Create a comparator using one thread per CPU.
    pub fn new(engine: SimilarityEngine) -> Self {
        Self {
            engine,
            max_parallel: num_cpus::get(),
        }
    }

    /// Set maximum parallel comparisons.
    pub fn max_parallel(mut self, n: usize) -> Self {
        self.max_parallel = n.max(1);
        self
    }

    /// Score every candidate against `target`.
    pub fn rank(&self, target: &ImageSource, candidates: &[ImageSource]) -> Result<BatchReport> {
        self.rank_with_progress(target, candidates, |_, _| {})
    }

    /// Score every candidate, calling `progress(done, total)` after each one.
    pub fn rank_with_progress<F>(
        &self,
        target: &ImageSource,
        candidates: &[ImageSource],
        progress: F,
    ) -> Result<BatchReport>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let start = Instant::now();
        let total = candidates.len();
        let completed = AtomicUsize::new(0);

        log::info!(
            "Ranking {} candidates against {} with {} threads",
            total,
            target.label(),
            self.max_parallel
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_parallel)
            .build()
            .map_err(|e| SimilarityError::Critical(format!("Failed to create thread pool: {}", e)))?;

        let entries = pool.install(|| {
            candidates
                .par_iter()
                .enumerate()
                .map(|(index, candidate)| {
                    let started = Instant::now();
                    let result = self.engine.compare(target, candidate);
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(done, total);

                    BatchEntry {
                        index,
                        source: candidate.label(),
                        result,
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                })
                .collect::<Vec<_>>()
        });

        Ok(BatchReport {
            target: target.label(),
            entries,
            total_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
