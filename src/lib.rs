//! This crate implements an external merge sort for binary files of 32-bit unsigned
//! integers. The input is a contiguous little-endian packed sequence of `u32` values
//! with no header or padding, and the output is the same encoding with the values in
//! ascending order.
//!
//! The implementation can be used to sort files that exceed available memory by
//! arbitrary factors. The caller provides a memory budget that bounds the resident
//! working set; the budget drives the size of the in-memory sort chunks and the
//! fan-out of the k-way merge that combines the sorted runs on disk.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use binary_file_sort::sort::Sort;
//!
//! // parallel external sort
//! fn sort_records(input: PathBuf, output: PathBuf, scratch: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut binary_file_sort = Sort::new(input, output);
//!     // bound the resident working set. The budget determines how many records are
//!     // sorted in memory at once and how many runs a single merge batch consumes.
//!     binary_file_sort.with_memory_budget(64 * 1024 * 1024);
//!     // set the directory for intermediate run files. The default is the current
//!     // working directory, however, for large files it is recommended to provide a
//!     // dedicated directory, preferably on the same file system as the output result.
//!     binary_file_sort.with_scratch_dir(scratch);
//!     binary_file_sort.sort()
//! }
//! ```
//!

pub(crate) mod chunk_iterator;
pub(crate) mod config;
pub(crate) mod heap_entry;
pub(crate) mod memory_plan;
pub(crate) mod run_reader;
pub(crate) mod run_writer;
pub(crate) mod sort_command;

pub mod sort;
