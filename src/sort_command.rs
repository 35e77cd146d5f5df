use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use byteorder::{LittleEndian, ReadBytesExt};
use command_executor::command::Command;

use crate::chunk_iterator::Chunk;
use crate::config::Config;
use crate::run_writer::RunWriter;
use crate::sort::{get_tl_config, CHUNK_BUFFER};

/// Sorts one chunk of the input into a run file. Executed on a chunk sorting pool
/// thread; each pool thread reuses its own record buffer across commands so the
/// resident record memory stays at one chunk per worker.
pub(crate) struct ChunkSortCommand {
    chunk: Chunk,
    errors: Arc<Mutex<Vec<anyhow::Error>>>,
}

impl ChunkSortCommand {
    pub(crate) fn new(chunk: Chunk, errors: Arc<Mutex<Vec<anyhow::Error>>>) -> ChunkSortCommand {
        ChunkSortCommand {
            chunk,
            errors,
        }
    }

    fn sort_chunk(&self, config: &Config) -> Result<(), anyhow::Error> {
        CHUNK_BUFFER.with(
            |buffer| {
                let mut records = buffer.borrow_mut();
                records.clear();
                records.reserve(self.chunk.records());

                let file = File::open(self.chunk.path())
                    .with_context(|| format!("path: {}", self.chunk.path().to_string_lossy()))?;
                let mut reader = BufReader::with_capacity(config.buffer_size(), file);
                reader.seek(SeekFrom::Start(self.chunk.offset()))
                    .with_context(|| format!("path: {}", self.chunk.path().to_string_lossy()))?;
                for _ in 0..self.chunk.records() {
                    let record = reader.read_u32::<LittleEndian>()
                        .with_context(||
                            format!(
                                "chunk at offset {}, path: {}",
                                self.chunk.offset(),
                                self.chunk.path().to_string_lossy(),
                            )
                        )?;
                    records.push(record);
                }

                records.sort_unstable();

                let run_path = config.run_path(self.chunk.file_id());
                let mut writer = RunWriter::create(&run_path, config.buffer_size())?;
                writer.write_run(&records)?;
                writer.finish()?;
                log::debug!("Sorted chunk {} of {} records", self.chunk.file_id(), records.len());
                Ok(())
            }
        )
    }
}

impl Command for ChunkSortCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        let config = get_tl_config();
        match self.sort_chunk(&config) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.errors.lock().unwrap().push(e);
                Err(anyhow!("failed to sort chunk, file id: {}", self.chunk.file_id()))
            }
        }
    }
}
