// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Cityfuse
//!
//! Fuses OSM point-of-interest features with CityJSON LOD2 building solids
//! into per-object merged records and binary 3D mesh files (GLB). The
//! pipeline is: spatial index over building footprints, per-object matching,
//! attribute/geometry fusion, triangulated mesh extraction, GLB export.

pub mod error;
pub mod geometry;
pub mod io;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use geometry::{GeometryIndex, MaterialClass, Mesh, Projection};
pub use model::{CityBuilding, MergedRecord, OsmObject, TagMap};
pub use pipeline::{
    build_mesh, match_object, merge, run, MatchResult, PipelineConfig, RunSummary,
};

use std::path::Path;

/// Run the full pipeline from files on disk: OSM features (GeoJSON or fetch
/// JSON), a directory of CityJSON tiles, an output directory.
pub fn run_files(
    osm_path: &Path,
    tiles_dir: &Path,
    out_dir: &Path,
    config: &PipelineConfig,
) -> Result<RunSummary> {
    let (objects, _skipped) = io::osm::read_features(osm_path)?;
    let buildings = io::cityjson::load_dir(tiles_dir)?;
    pipeline::run(&objects, buildings, out_dir, config, true, None)
}
