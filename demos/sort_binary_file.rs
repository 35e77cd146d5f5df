use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Error;
use byteorder::{LittleEndian, WriteBytesExt};

use binary_file_sort::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn generate_random(path: &Path, records: usize) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for _ in 0..records {
        writer.write_u32::<LittleEndian>(rand::random::<u32>())?;
    }
    Ok(())
}

fn sort_ascending(input: &Path, output: &Path, scratch: &Path) -> Result<(), Error> {
    let mut binary_file_sort = Sort::new(input.to_path_buf(), output.to_path_buf());
    // a deliberately small budget so the demo exercises the on-disk merge
    binary_file_sort.with_memory_budget(1024 * 1024);
    binary_file_sort.with_scratch_dir(scratch.to_path_buf());
    binary_file_sort.sort()?;
    Ok(())
}

fn check_ascending(path: &Path) -> Result<bool, Error> {
    let binary_file_sort = Sort::new(path.to_path_buf(), PathBuf::new());
    binary_file_sort.check()
}

// cargo run -r --example sort_binary_file
pub fn main() -> Result<(), Error> {
    let input_path = PathBuf::from("./target/random-1m.dat");
    let output_path = PathBuf::from("./target/ascending-1m.dat");
    let scratch_path = PathBuf::from("./target");

    generate_random(&input_path, 1 << 20)?;
    sort_ascending(&input_path, &output_path, &scratch_path)?;
    assert!(check_ascending(&output_path)?);

    Ok(())
}
