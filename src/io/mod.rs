// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! I/O module - source loaders, record files, GLB export

pub mod cityjson;
mod export_glb;
pub mod merged;
pub mod osm;

pub use export_glb::export as export_glb;
