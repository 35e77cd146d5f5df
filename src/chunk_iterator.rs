use std::cmp::min;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

pub(crate) const RECORD_SIZE: u64 = 4;

#[derive(Debug)]
pub(crate) struct Chunk {
    offset: u64,
    records: usize,
    file_id: usize,
    path: PathBuf,
}

impl Chunk {
    pub(crate) fn new(offset: u64, records: usize, file_id: usize, path: PathBuf) -> Chunk {
        Chunk {
            offset,
            records,
            file_id,
            path,
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn records(&self) -> usize {
        self.records
    }

    pub(crate) fn file_id(&self) -> usize {
        self.file_id
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Slices the input into disjoint fixed stride windows, one per sort worker. Run file
/// ids are assigned up front and stay dense because every yielded chunk holds at least
/// one record.
pub(crate) struct ChunkIterator {
    path: PathBuf,
    length: u64,
    stride: u64,
    chunk_records: usize,
    pos: u64,
    next_file_id: usize,
}

impl ChunkIterator {
    pub(crate) fn new(path: &Path, chunk_records: usize) -> Result<ChunkIterator, anyhow::Error> {
        let metadata = path.metadata()
            .with_context(|| anyhow!("path: {}", path.display()))?;
        let length = metadata.len();
        if length % RECORD_SIZE != 0 {
            return Err(
                anyhow!(
                    "corrupt input, length {} is not a multiple of the {} byte record size, path: {}",
                    length,
                    RECORD_SIZE,
                    path.display(),
                )
            );
        }

        Ok(
            ChunkIterator {
                path: path.to_path_buf(),
                length,
                stride: chunk_records as u64 * RECORD_SIZE,
                chunk_records,
                pos: 0,
                next_file_id: 0,
            }
        )
    }
}

impl Iterator for ChunkIterator {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.length {
            None
        } else {
            let remaining = (self.length - self.pos) / RECORD_SIZE;
            let records = min(self.chunk_records as u64, remaining) as usize;
            let chunk = Chunk::new(self.pos, records, self.next_file_id, self.path.clone());
            self.pos += self.stride;
            self.next_file_id += 1;
            Some(chunk)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use crate::chunk_iterator::{ChunkIterator, RECORD_SIZE};

    fn write_records(dir: &tempfile::TempDir, name: &str, count: usize) -> PathBuf {
        let path = dir.path().join(name);
        let bytes = vec![0u8; count * RECORD_SIZE as usize];
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_empty_file() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_records(&dir, "empty", 0);
        let mut count = 0;
        for _chunk in ChunkIterator::new(&path, 1000)? {
            count += 1;
        }
        assert_eq!(count, 0);
        Ok(())
    }

    #[test]
    fn test_stride_greater_than_file() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_records(&dir, "small", 100);
        let chunks: Vec<_> = ChunkIterator::new(&path, 1000)?.collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].offset(), 0);
        assert_eq!(chunks[0].records(), 100);
        assert_eq!(chunks[0].file_id(), 0);
        assert_eq!(chunks[0].path(), &path);
        Ok(())
    }

    #[test]
    fn test_no_records_lost() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_records(&dir, "input", 2500);
        let chunks: Vec<_> = ChunkIterator::new(&path, 1000)?.collect();
        assert_eq!(chunks.len(), 3);
        let total: usize = chunks.iter().map(|chunk| chunk.records()).sum();
        assert_eq!(total, 2500);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.file_id(), i);
            assert_eq!(chunk.offset(), i as u64 * 1000 * RECORD_SIZE);
        }
        Ok(())
    }

    #[test]
    fn test_length_not_a_record_multiple() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("corrupt");
        fs::write(&path, [0u8; 7])?;
        let result = ChunkIterator::new(&path, 1000);
        assert!(result.is_err());
        assert!(result.err().unwrap().to_string().contains("multiple"));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = ChunkIterator::new(&PathBuf::from("./no-such-file"), 1000);
        assert!(result.is_err());
    }
}
