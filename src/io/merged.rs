// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Merged record files
//!
//! One `<id>_bld.json` per OSM object; the `_bld` suffix keeps the record
//! apart from the plain geometry export living next to it. Filenames are
//! derived from the identifier, but the identifier on the record is what
//! links record and mesh - never the directory layout.

use crate::error::{Error, Result};
use crate::model::MergedRecord;
use std::io::Write;
use std::path::{Path, PathBuf};

const RECORD_SUFFIX: &str = "_bld.json";
const MESH_SUFFIX: &str = ".glb";

/// Make an OSM identifier filesystem-safe (`node/240184401` ->
/// `node_240184401`).
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' => '_',
            other => other,
        })
        .collect()
}

pub fn record_path(dir: &Path, osm_id: &str) -> PathBuf {
    dir.join(format!("{}{}", sanitize_id(osm_id), RECORD_SUFFIX))
}

pub fn mesh_path(dir: &Path, osm_id: &str) -> PathBuf {
    dir.join(format!("{}{}", sanitize_id(osm_id), MESH_SUFFIX))
}

/// Write a merged record, atomically. The temp file lives in the target
/// directory so the final rename cannot cross filesystems.
pub fn write_record(record: &MergedRecord, dir: &Path) -> Result<PathBuf> {
    let path = record_path(dir, &record.osm_id);
    let json = serde_json::to_vec_pretty(record).map_err(|e| Error::Parse {
        path: path.clone(),
        message: e.to_string(),
    })?;
    write_atomic(&path, &json)?;
    Ok(path)
}

pub fn read_record(path: &Path) -> Result<MergedRecord> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write bytes to a temp file next to the destination, then move it into
/// place. A failed write never leaves a partial file at the destination.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path)
        .map_err(|e| write_err(e.error))
        .map(|_| ())
}
