use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::PathBuf;
use std::str::FromStr;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use data_encoding::HEXLOWER;

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

#[allow(dead_code)]
pub fn temp_scratch_dir(dir: &str) -> PathBuf {
    let result = temp_file_name(dir);
    fs::create_dir_all(&result).unwrap_or_else(|_|
        panic!("Failed to create scratch directory: {:?}", result)
    );
    result
}

#[allow(dead_code)]
pub fn write_records(path: &PathBuf, records: &[u32]) -> Result<(), anyhow::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        writer.write_u32::<LittleEndian>(*record)?;
    }
    Ok(())
}

#[allow(dead_code)]
pub fn read_records(path: &PathBuf) -> Result<Vec<u32>, anyhow::Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    loop {
        match reader.read_u32::<LittleEndian>() {
            Ok(record) => records.push(record),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(records)
}

#[allow(dead_code)]
pub fn remaining_file_names(dir: &PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().to_string());
    }
    Ok(names)
}
