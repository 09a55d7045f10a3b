// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Error taxonomy
//!
//! Index misuse (`IndexEmpty`, `NotBuilt`) is fatal for a run; everything
//! else is recoverable per object and recorded by the batch driver.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Index construction was attempted with zero buildings.
    #[error("spatial index built from zero buildings")]
    IndexEmpty,

    /// The index was queried before `build()`.
    #[error("spatial index queried before build()")]
    NotBuilt,

    /// The coordinate systems of the two sources cannot be aligned.
    #[error("cannot align coordinate systems: {0}")]
    GeometryMismatch(String),

    /// Every surface of a record collapsed during triangulation.
    #[error("solid of {0} triangulated to zero faces")]
    DegenerateSolid(String),

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed input {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl Error {
    /// Short stable label for run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::IndexEmpty => "index-empty",
            Error::NotBuilt => "not-built",
            Error::GeometryMismatch(_) => "geometry-mismatch",
            Error::DegenerateSolid(_) => "degenerate-solid",
            Error::Write { .. } => "write-error",
            Error::Read { .. } => "read-error",
            Error::Parse { .. } => "parse-error",
        }
    }
}
