use std::cell::RefCell;
use std::cmp::max;
use std::collections::BinaryHeap;
use std::fs;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use command_executor::shutdown_mode::ShutdownMode;
use command_executor::thread_pool_builder::ThreadPoolBuilder;
use rlimit::{getrlimit, setrlimit, Resource};

use crate::chunk_iterator::ChunkIterator;
use crate::config::Config;
use crate::heap_entry::HeapEntry;
use crate::memory_plan::MemoryPlan;
use crate::run_reader::RunReader;
use crate::run_writer::RunWriter;
use crate::sort_command::ChunkSortCommand;

thread_local! {
    pub(crate) static CONFIG: RefCell<Option<Config>> = RefCell::new(None);
    pub(crate) static CHUNK_BUFFER: RefCell<Vec<u32>> = RefCell::new(Vec::new());
}

pub(crate) fn get_tl_config() -> Config {
    CONFIG.with(
        |config| {
            config.borrow().as_ref().unwrap().clone()
        }
    )
}

/// Sort a binary file of little-endian 32-bit unsigned integers
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use binary_file_sort::sort::Sort;
///
/// // external sort with a bounded working set
/// fn sort_records(input: PathBuf, output: PathBuf, scratch: PathBuf) -> Result<(), anyhow::Error> {
///     let mut binary_file_sort = Sort::new(input, output);
///     // bound the resident working set in bytes. The default is 128 MiB.
///     binary_file_sort.with_memory_budget(64 * 1024 * 1024);
///     // set the directory for intermediate run files. The default is the current
///     // working directory, however, for large files it is recommended to provide a
///     // dedicated directory, preferably on the same file system as the output result.
///     binary_file_sort.with_scratch_dir(scratch);
///     binary_file_sort.sort()
/// }
/// ```
pub struct Sort {
    input: PathBuf,
    output: PathBuf,
    scratch: PathBuf,
    memory_budget: usize,
    buffer_size: usize,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * the default memory budget is 128 MiB
    /// * the default per stream I/O buffer size is 8 KiB - the common stdio default
    /// * intermediate run files are written to the current working directory
    ///
    /// The Sort implementation will increase the file descriptor rlimit to accommodate
    /// the merge fan-out derived from the budget
    pub fn new(input: PathBuf, output: PathBuf) -> Sort {
        Sort {
            input,
            output,
            scratch: PathBuf::from("."),
            memory_budget: 128 * 1024 * 1024,
            buffer_size: 8 * 1024,
        }
    }

    /// Set the memory budget in bytes. The budget bounds the total resident working
    /// set and drives the in-memory chunk size and the merge fan-out
    pub fn with_memory_budget(&mut self, memory_budget: usize) {
        self.memory_budget = memory_budget;
    }

    /// Set the per stream I/O buffer size in bytes. The buffer size is uniform across
    /// all open streams so that the memory budget arithmetic holds
    pub fn with_buffer_size(&mut self, buffer_size: usize) {
        self.buffer_size = buffer_size;
    }

    /// Set the directory for intermediate run files. The default is the current working
    /// directory. It is recommended for large files to create a dedicated directory on
    /// the same file system as the output target
    pub fn with_scratch_dir(&mut self, scratch: PathBuf) {
        self.scratch = scratch;
    }

    /// Sort the input file into the output file.
    ///
    /// Fails with a configuration error when the memory budget cannot admit at least
    /// one merge stream, and with an I/O or corruption error when the input cannot be
    /// read completely. All errors are fatal to the call; intermediate run files are
    /// not guaranteed to be cleaned up on failure.
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        let plan = MemoryPlan::new(self.memory_budget, self.buffer_size)?;
        log::info!(
            "Memory plan, usable: {}, max fan-out: {}, chunk records: {}, IO workers: {}",
            plan.usable_memory(),
            plan.max_fanout(),
            plan.chunk_records(),
            plan.io_workers(),
        );
        let config = Config::new(self.scratch.clone(), self.buffer_size, &plan);
        let (current_soft, current_hard) = getrlimit(Resource::NOFILE)
            .with_context(|| "getrlimit NOFILE")?;
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        // one descriptor per merge stream, with headroom for the input, the output and
        // whatever the process already holds
        let new_soft = max((config.max_fanout() + 256) as u64, current_soft);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        setrlimit(Resource::NOFILE, new_soft, current_hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard))?;
        Self::internal_sort(&self.input, &config, &self.output)?;
        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        setrlimit(Resource::NOFILE, current_soft, current_hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard))?;
        Ok(())
    }

    /// Verify that the input file is already sorted in ascending order.
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        MemoryPlan::new(self.memory_budget, self.buffer_size)?;
        Self::internal_check(&self.input, self.buffer_size)
    }

    pub(crate) fn internal_check(path: &Path, buffer_size: usize) -> Result<bool, anyhow::Error> {
        let mut reader = match RunReader::open(path, buffer_size)? {
            Some(reader) => reader,
            None => {
                return Err(anyhow!("path not found: {}", path.to_string_lossy()));
            }
        };

        let mut previous: Option<u32> = None;
        while let Some(record) = reader.next_record()? {
            match previous {
                None => {
                    previous = Some(record);
                }
                Some(previous_record) => {
                    if previous_record <= record {
                        previous = Some(record);
                    } else {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    fn internal_sort(input: &Path, config: &Config, output: &Path) -> Result<(), anyhow::Error> {
        log::info!("Start external sort");
        let runs = Self::sort_chunks(input, config)?;

        if runs == 0 {
            File::create(output)
                .with_context(|| format!("path: {}", output.to_string_lossy()))?;
            log::info!("Finish external sort, empty input");
            return Ok(());
        }

        if runs > 1 && config.max_fanout() < 2 {
            return Err(
                anyhow!(
                    "memory budget admits a single merge stream, cannot merge {} runs, increase the memory budget or decrease the buffer size",
                    runs,
                )
            );
        }

        let mut remaining = runs;
        while remaining > 1 {
            remaining = Self::merge_pass(config)?;
            log::info!("Merge pass produced {} runs", remaining);
        }

        Self::promote_result(&config.run_path(0), output)?;
        log::info!("Finish external sort");
        Ok(())
    }

    /// Chunk sorting stage. Cuts the input into disjoint windows, sorts each window in
    /// memory on a pool of I/O workers and writes one run file per window. Returns the
    /// number of runs produced.
    fn sort_chunks(input: &Path, config: &Config) -> Result<usize, anyhow::Error> {
        log::info!("Start parallel chunk sort");
        let mut thread_pool_builder = ThreadPoolBuilder::new();
        let mut sorting_pool = thread_pool_builder
            .with_name("chunk-sort".to_string())
            .with_tasks(config.io_workers())
            .with_queue_size(config.queue_size())
            .with_shutdown_mode(ShutdownMode::CompletePending)
            .build()
            .unwrap();

        sorting_pool.set_thread_local(&CONFIG, Some(config.clone()));

        let errors: Arc<Mutex<Vec<anyhow::Error>>> = Arc::new(Mutex::new(Vec::new()));
        let mut runs = 0;
        for chunk in ChunkIterator::new(input, config.chunk_records())? {
            let sort_command = Box::new(ChunkSortCommand::new(chunk, errors.clone()));
            sorting_pool.submit(sort_command);
            runs += 1;
        }

        log::info!("Shutting down chunk sorting pool");
        sorting_pool.shutdown();
        sorting_pool.join()?;

        let mut errors = errors.lock().unwrap();
        if !errors.is_empty() {
            // the first failure is returned, the rest would vanish with the vector
            let first = errors.remove(0);
            for error in errors.drain(..) {
                log::error!("Chunk sort failed: {:#}", error);
            }
            return Err(first);
        }
        log::info!("Finish parallel chunk sort, {} runs", runs);
        Ok(runs)
    }

    /// One merge pass. Consumes the current run set in consecutive batches of up to
    /// `max_fanout` runs and replaces it with one output run per batch, renamed back
    /// into the same sequential namespace. Returns the number of runs that remain.
    fn merge_pass(config: &Config) -> Result<usize, anyhow::Error> {
        let mut first = 0;
        let mut batches = 0;
        loop {
            let mut readers = Self::open_merge_batch(first, config)?;
            if readers.is_empty() {
                break;
            }
            let opened = readers.len();

            let tmp_path = config.tmp_run_path(batches);
            Self::merge_batch(&mut readers, &tmp_path, config)?;
            log::debug!("Merged runs {}..{} into batch {}", first, first + opened, batches);

            // inputs must be deleted before the rename - the batch number is smaller
            // than the input ids once a pass is wider than one batch, and the rename
            // would collide with a still live input
            drop(readers);
            for run in first..first + opened {
                let path = config.run_path(run);
                fs::remove_file(&path)
                    .with_context(|| format!("path: {}", path.to_string_lossy()))?;
            }
            let run_path = config.run_path(batches);
            fs::rename(&tmp_path, &run_path)
                .with_context(||
                    anyhow!(
                        "Rename {} to {}",
                        tmp_path.to_string_lossy(),
                        run_path.to_string_lossy(),
                    )
                )?;

            first += opened;
            batches += 1;
        }
        Ok(batches)
    }

    fn open_merge_batch(first: usize, config: &Config) -> Result<Vec<RunReader>, anyhow::Error> {
        let mut readers = Vec::new();
        while readers.len() < config.max_fanout() {
            match RunReader::open(&config.run_path(first + readers.len()), config.buffer_size())? {
                Some(reader) => readers.push(reader),
                None => break,
            }
        }
        Ok(readers)
    }

    fn merge_batch(readers: &mut [RunReader], output: &Path, config: &Config) -> Result<(), anyhow::Error> {
        let mut writer = RunWriter::create(output, config.buffer_size())?;

        let mut heads = Vec::with_capacity(readers.len());
        for (source, reader) in readers.iter_mut().enumerate() {
            if let Some(record) = reader.next_record()? {
                heads.push(HeapEntry::new(record, source));
            }
        }
        // heapify over the populated vector is O(k), k pushes would be O(k log k)
        let mut heap = BinaryHeap::from(heads);

        while let Some(entry) = heap.pop() {
            writer.write_record(entry.record())?;
            if let Some(record) = readers[entry.source()].next_record()? {
                heap.push(HeapEntry::new(record, entry.source()));
            }
        }
        writer.finish()?;
        Ok(())
    }

    fn promote_result(run: &Path, output: &Path) -> Result<(), anyhow::Error> {
        match fs::rename(run, output) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                // the scratch directory and the output may live on different file systems
                fs::copy(run, output)
                    .with_context(||
                        anyhow!(
                            "Copy {} to {}",
                            run.to_string_lossy(),
                            output.to_string_lossy(),
                        )
                    )?;
                fs::remove_file(run)
                    .with_context(|| format!("path: {}", run.to_string_lossy()))?;
                Ok(())
            }
            Err(e) => {
                Err(e).with_context(||
                    anyhow!(
                        "Rename {} to {}",
                        run.to_string_lossy(),
                        output.to_string_lossy(),
                    )
                )
            }
        }
    }
}
