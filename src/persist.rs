// used for persistence of attribute indexes, one file per attribute:
//
// {"format":1,"name":"author","entries":2,"checksum":"<blake3 of the next line>"}
// [[1,{"Text":"alice"}],[2,{"Text":"bob"}]]
//
// The second line is the body. A body that does not match its header is
// refused as a whole.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::datatype::Value;
use crate::error::{BoutinfError, Result};
use crate::index::MessageId;

pub const FORMAT: u32 = 1;
pub const EXTENSION: &str = "idx";

#[derive(Serialize, Deserialize, Debug)]
struct Header {
    format: u32,
    name: String,
    entries: usize,
    checksum: String,
}

pub fn index_path(directory: &Path, name: &str) -> PathBuf {
    directory.join(format!("{}.{}", name, EXTENSION))
}

/// Writes the entries to a temporary sibling and renames it over the target,
/// so readers only ever see a complete previous or complete new file.
pub fn write_index(path: &Path, name: &str, mut entries: Vec<(MessageId, Value)>) -> Result<()> {
    entries.sort_unstable_by_key(|(id, _)| *id);
    let body = serde_json::to_vec(&entries)
        .map_err(|e| BoutinfError::Persistence(format!("cannot encode index '{}': {}", name, e)))?;
    let header = Header {
        format: FORMAT,
        name: name.to_string(),
        entries: entries.len(),
        checksum: blake3::hash(&body).to_hex().to_string(),
    };
    let header = serde_json::to_vec(&header)
        .map_err(|e| BoutinfError::Persistence(format!("cannot encode header of '{}': {}", name, e)))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension(format!("{}.tmp", EXTENSION));
    {
        let mut file = fs::File::create(&staging)?;
        file.write_all(&header)?;
        file.write_all(b"\n")?;
        file.write_all(&body)?;
        file.sync_all()?;
    }
    fs::rename(&staging, path)?;
    debug!(index = name, entries = entries.len(), "index written");
    Ok(())
}

/// Reads a previously written index. A missing file yields `None`; anything
/// unreadable as a whole yields `IndexCorruption`.
pub fn read_index(path: &Path, name: &str) -> Result<Option<Vec<(MessageId, Value)>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let split = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| BoutinfError::corruption(name, "missing header line"))?;
    let (header, body) = (&bytes[..split], &bytes[split + 1..]);
    let header: Header = serde_json::from_slice(header)
        .map_err(|e| BoutinfError::corruption(name, format!("unreadable header: {}", e)))?;
    if header.format != FORMAT {
        return Err(BoutinfError::corruption(
            name,
            format!("unsupported format {}", header.format),
        ));
    }
    if header.name != name {
        return Err(BoutinfError::corruption(
            name,
            format!("file belongs to index '{}'", header.name),
        ));
    }
    if blake3::hash(body).to_hex().as_str() != header.checksum {
        return Err(BoutinfError::corruption(name, "checksum mismatch"));
    }
    let entries: Vec<(MessageId, Value)> = serde_json::from_slice(body)
        .map_err(|e| BoutinfError::corruption(name, format!("unreadable entries: {}", e)))?;
    if entries.len() != header.entries {
        return Err(BoutinfError::corruption(
            name,
            format!("expected {} entries, found {}", header.entries, entries.len()),
        ));
    }
    Ok(Some(entries))
}
