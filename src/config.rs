use std::path::PathBuf;

use crate::memory_plan::MemoryPlan;

#[derive(Clone)]
pub(crate) struct Config {
    scratch: PathBuf,
    buffer_size: usize,
    queue_size: usize,
    chunk_records: usize,
    max_fanout: usize,
    io_workers: usize,
}

impl Config {
    pub(crate) fn new(scratch: PathBuf, buffer_size: usize, plan: &MemoryPlan) -> Config {
        let queue_size = 4096;
        Config {
            scratch,
            buffer_size,
            queue_size,
            chunk_records: plan.chunk_records(),
            max_fanout: plan.max_fanout(),
            io_workers: plan.io_workers(),
        }
    }

    pub(crate) fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub(crate) fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub(crate) fn chunk_records(&self) -> usize {
        self.chunk_records
    }

    pub(crate) fn max_fanout(&self) -> usize {
        self.max_fanout
    }

    pub(crate) fn io_workers(&self) -> usize {
        self.io_workers
    }

    /// Final name of a run in the scratch directory.
    pub(crate) fn run_path(&self, id: usize) -> PathBuf {
        self.scratch.join(id.to_string())
    }

    /// In-progress name of a merge batch output, renamed to a final name once the
    /// batch inputs are deleted.
    pub(crate) fn tmp_run_path(&self, id: usize) -> PathBuf {
        self.scratch.join(format!("_{}", id))
    }
}
