//! Parallel processing utilities
//!
//! CPU-bound work is spread over a dedicated rayon pool. A failing task,
//! whether it returns an error or panics, is recorded in its [`TaskResult`]
//! instead of aborting the whole run.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use anyhow::Context;
use rayon::prelude::*;

use crate::error::Result;
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

/// Upper bound on the worker count chosen by [`get_optimal_workers`]
pub const MAX_WORKERS: usize = 16;

/// Default number of items per chunk for [`chunked_parallel_map`]
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Outcome of one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult<R> {
    /// Position of the input item
    pub index: usize,
    /// Value produced, or the error message
    pub result: std::result::Result<R, String>,
}

impl<R> TaskResult<R> {
    /// Whether the task succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Number of CPUs, capped at [`MAX_WORKERS`]
#[must_use]
pub fn get_optimal_workers() -> usize {
    num_cpus::get().clamp(1, MAX_WORKERS)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Apply `func` to every item on a pool of `max_workers` threads
///
/// Results are ordered by input index.
pub fn parallel_map<T, R, F>(
    func: F,
    items: &[T],
    max_workers: Option<usize>,
) -> Result<Vec<TaskResult<R>>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    let workers = max_workers.unwrap_or_else(get_optimal_workers).max(1);
    log::info!("Starting parallel processing with {workers} workers");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    let pb = create_main_progress_bar(items.len() as u64, Some("Processing tasks"));
    let results: Vec<TaskResult<R>> = pool.install(|| {
        items
            .par_iter()
            .enumerate()
            .map(|(index, item)| {
                let result = match panic::catch_unwind(AssertUnwindSafe(|| func(item))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(format!("{err:#}")),
                    Err(payload) => Err(panic_message(payload.as_ref())),
                };
                if let Err(message) = &result {
                    log::error!("Task {index} failed: {message}");
                }
                pb.inc(1);
                TaskResult { index, result }
            })
            .collect()
    });
    finish_progress_bar(&pb, None);

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        log::warn!("{failed} of {} tasks failed", results.len());
    }
    Ok(results)
}

/// Split `items` into chunks, process the chunks in parallel and flatten
///
/// Output of failed chunks is dropped.
pub fn chunked_parallel_map<T, R, F>(
    func: F,
    items: &[T],
    chunk_size: usize,
    max_workers: Option<usize>,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> Result<Vec<R>> + Sync,
{
    let chunks: Vec<&[T]> = items.chunks(chunk_size.max(1)).collect();
    let results = parallel_map(|chunk: &&[T]| func(chunk), &chunks, max_workers)?;

    Ok(results
        .into_iter()
        .filter_map(|task| task.result.ok())
        .flatten()
        .collect())
}

/// Counts completed and failed tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ProgressTracker {
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
        }
    }

    /// Record one finished task
    pub fn update(&mut self, success: bool) {
        self.completed += 1;
        if !success {
            self.failed += 1;
        }
    }

    /// Completion percentage; 0 when there is nothing to do
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

impl fmt::Display for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Progress: {}/{} ({:.1}%)",
            self.completed,
            self.total,
            self.progress()
        )
    }
}
