use std::path::PathBuf;

use anyhow::Error;
use simple_logger::SimpleLogger;

use binary_file_sort::sort::Sort;

// Sort data/input into data/output with the default budget of 128 MiB.
fn main() -> Result<(), Error> {
    SimpleLogger::new().init().unwrap();
    let binary_file_sort = Sort::new(PathBuf::from("data/input"), PathBuf::from("data/output"));
    binary_file_sort.sort()
}
