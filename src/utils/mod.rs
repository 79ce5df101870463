//! Shared utilities: Arrow helpers, file IO, logging, date parsing, memory
//! accounting and parallel execution.

pub mod arrow;
pub mod date_parser;
pub mod io;
pub mod logging;
pub mod memory;
pub mod parallel;

pub use date_parser::DateParser;
pub use memory::{MemoryProfiler, MemoryUsage, get_memory_usage, optimize_dtypes, read_chunked};
pub use parallel::{
    ProgressTracker, TaskResult, chunked_parallel_map, get_optimal_workers, parallel_map,
};
