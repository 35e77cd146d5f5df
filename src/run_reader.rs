use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use anyhow::Context;
use byteorder::{LittleEndian, ReadBytesExt};

/// Streaming reader over a single run of little-endian `u32` records.
///
/// Holds a one record lookahead so that a k-way merge can seed its heap from the
/// current head of every stream. A clean EOF at a record boundary ends the run; a
/// partial record is a corruption error.
#[derive(Debug)]
pub(crate) struct RunReader {
    path: PathBuf,
    reader: BufReader<File>,
    head: Option<u32>,
}

impl RunReader {
    /// Open a run. Returns `Ok(None)` when the file does not exist, which a merge
    /// pass uses to detect the end of the current batch.
    pub(crate) fn open(path: &Path, buffer_size: usize) -> Result<Option<RunReader>, anyhow::Error> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("path: {}", path.to_string_lossy()));
            }
        };
        let mut reader = BufReader::with_capacity(buffer_size, file);
        let head = read_record(&mut reader, path)?;
        Ok(
            Some(
                RunReader {
                    path: path.to_path_buf(),
                    reader,
                    head,
                }
            )
        )
    }

    /// Return the current head of the run and advance to the next record. `None`
    /// signals end of run.
    pub(crate) fn next_record(&mut self) -> Result<Option<u32>, anyhow::Error> {
        let next = read_record(&mut self.reader, &self.path)?;
        Ok(std::mem::replace(&mut self.head, next))
    }
}

fn read_record(reader: &mut BufReader<File>, path: &Path) -> Result<Option<u32>, anyhow::Error> {
    let at_eof = reader.fill_buf()
        .with_context(|| format!("path: {}", path.to_string_lossy()))?
        .is_empty();
    if at_eof {
        return Ok(None);
    }
    let record = reader.read_u32::<LittleEndian>()
        .with_context(|| format!("partial record, path: {}", path.to_string_lossy()))?;
    Ok(Some(record))
}
