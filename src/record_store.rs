use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize as _;

use crate::formats::Record;

pub const RECORDS_FILE_NAME: &str = "termine.json";
pub const LAST_SENT_FILE_NAME: &str = "last_sent.json";

/// Locations of the two record stores inside the data directory.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub records: PathBuf,
    pub last_sent: PathBuf,
}

impl StorePaths {
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self {
            records: data_dir.join(RECORDS_FILE_NAME),
            last_sent: data_dir.join(LAST_SENT_FILE_NAME),
        }
    }
}

/// Loads a record store.
///
/// A missing file, invalid JSON, or a top-level value that is not an array
/// all load as an empty store. Array entries that are not records are
/// skipped; the remaining entries load as usual.
pub fn load(path: &Path) -> anyhow::Result<Vec<Record>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("read record store: {}", path.display()));
        }
    };

    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                %err,
                "record store is not valid json; treating as empty"
            );
            return Ok(Vec::new());
        }
    };
    let serde_json::Value::Array(entries) = value else {
        tracing::warn!(
            path = %path.display(),
            "record store is not a json array; treating as empty"
        );
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Record>(entry) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(
                path = %path.display(),
                index,
                %err,
                "skipping malformed record store entry"
            ),
        }
    }
    Ok(records)
}

/// Writes the full store as an indented JSON array, replacing the file
/// atomically.
pub fn save(path: &Path, records: &[Record]) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create record store dir: {}", parent.display()))?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records
        .serialize(&mut serializer)
        .context("serialize record store")?;
    buf.push(b'\n');

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("create temp file in: {}", parent.display()))?;
    tmp.write_all(&buf)
        .with_context(|| format!("write temp record store: {}", tmp.path().display()))?;
    tmp.flush().context("flush temp record store")?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replace record store: {}", path.display()))?;

    Ok(())
}
