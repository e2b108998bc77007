//! Line-oriented record files shared by all stages: one JSON `[key, value]`
//! array per line.

use eyre::{Result, WrapErr};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

pub const SUCCESS_MARKER: &str = "_SUCCESS";

pub fn encode_record<K: Serialize, V: Serialize>(k: &K, v: &V) -> Result<String> {
    Ok(serde_json::to_string(&(k, v))?)
}

pub fn decode_records<K, V>(content: &str) -> Result<Vec<(K, V)>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).wrap_err_with(|| format!("malformed record on line {}", i + 1))
        })
        .collect()
}

/// Reads every record of `files`, in file order.
pub fn read_records<K, V>(files: &[PathBuf]) -> Result<Vec<(K, V)>>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    let mut records = Vec::new();
    for file in files {
        let content = fs::read_to_string(file)
            .wrap_err_with(|| format!("failed to read {}", file.display()))?;
        let decoded = decode_records(&content)
            .wrap_err_with(|| format!("failed to decode {}", file.display()))?;
        records.extend(decoded);
    }
    Ok(records)
}

/// Writes `lines` to `path`, one per line.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(path, content).wrap_err_with(|| format!("failed to write {}", path.display()))
}

pub fn part_file_name(index: u64) -> String {
    format!("part-r-{:05}", index)
}

/// Reduce partition of `key`. Stable for a given build.
pub fn partition<K: Hash>(key: &K, n_reduce: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish() % n_reduce
}
