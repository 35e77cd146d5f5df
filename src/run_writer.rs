use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use byteorder::{LittleEndian, WriteBytesExt};

/// Buffered writer producing a single run of little-endian `u32` records.
pub(crate) struct RunWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunWriter {
    pub(crate) fn create(path: &Path, buffer_size: usize) -> Result<RunWriter, anyhow::Error> {
        let file = File::create(path)
            .with_context(|| format!("path: {}", path.to_string_lossy()))?;
        Ok(
            RunWriter {
                path: path.to_path_buf(),
                writer: BufWriter::with_capacity(buffer_size, file),
            }
        )
    }

    pub(crate) fn write_record(&mut self, record: u32) -> Result<(), anyhow::Error> {
        self.writer.write_u32::<LittleEndian>(record)
            .with_context(|| format!("path: {}", self.path.to_string_lossy()))?;
        Ok(())
    }

    pub(crate) fn write_run(&mut self, records: &[u32]) -> Result<(), anyhow::Error> {
        for record in records {
            self.write_record(*record)?;
        }
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<(), anyhow::Error> {
        self.writer.flush()
            .with_context(|| format!("path: {}", self.path.to_string_lossy()))?;
        Ok(())
    }
}
