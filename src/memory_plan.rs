use std::cmp::min;

use anyhow::anyhow;

use crate::chunk_iterator::RECORD_SIZE;

/// Derived memory parameters, computed once from the configured budget and buffer size
/// and immutable afterwards.
///
/// A naive split of `memory_budget / buffer_size` ignores the per stream bookkeeping
/// that grows with the number of streams. The solver reserves a `64 / (buffer_size + 64)`
/// fraction of the budget plus an 8 KiB floor for containers and heap state, which keeps
/// the actual resident set within the budget across the relevant buffer size range.
#[derive(Clone)]
pub(crate) struct MemoryPlan {
    usable_memory: usize,
    max_fanout: usize,
    io_workers: usize,
}

impl MemoryPlan {
    pub(crate) fn new(memory_budget: usize, buffer_size: usize) -> Result<MemoryPlan, anyhow::Error> {
        if buffer_size == 0 {
            return Err(anyhow!("buffer size must be greater than zero"));
        }
        let internal_needs = memory_budget * 64 / (buffer_size + 64) + (8 << 10);
        let usable_memory = memory_budget.saturating_sub(internal_needs);
        let max_fanout = min(512, usable_memory / buffer_size);
        if usable_memory == 0 || max_fanout == 0 {
            return Err(
                anyhow!(
                    "memory budget {} is too small for buffer size {}, increase the memory budget or decrease the buffer size",
                    memory_budget,
                    buffer_size,
                )
            );
        }
        // IO operations do not benefit much from more than 4 threads
        let io_workers = num_cpus::get().clamp(2, 4);
        Ok(
            MemoryPlan {
                usable_memory,
                max_fanout,
                io_workers,
            }
        )
    }

    pub(crate) fn usable_memory(&self) -> usize {
        self.usable_memory
    }

    pub(crate) fn max_fanout(&self) -> usize {
        self.max_fanout
    }

    pub(crate) fn io_workers(&self) -> usize {
        self.io_workers
    }

    /// Records each chunk sort worker may hold in memory at once.
    pub(crate) fn chunk_records(&self) -> usize {
        (self.usable_memory / RECORD_SIZE as usize / self.io_workers).max(1)
    }
}
