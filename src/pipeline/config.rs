// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Pipeline configuration
//!
//! Defaults are tuned for LOD2 cadastral data in a dense European city and
//! are meant to be adjusted against real data, not treated as constants.

use serde::{Deserialize, Serialize};

/// Matching parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Search radius around the representative point, meters. Candidates
    /// beyond it are excluded even if nothing closer exists.
    pub search_radius_m: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            search_radius_m: 25.0,
        }
    }
}

/// Merge/validation parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Maximum deviation of ring vertices from their best-fit plane before a
    /// surface is flagged non-planar, meters.
    pub planarity_tolerance_m: f64,
    /// Vertex quantum used when checking that shell edges pair up, meters.
    pub shell_tolerance_m: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            planarity_tolerance_m: 2e-2,
            shell_tolerance_m: 1e-3,
        }
    }
}

/// Meshing parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Vertices closer than this are welded into one, meters.
    pub weld_tolerance_m: f64,
    /// Triangles below this area are dropped as degenerate, square meters.
    pub min_triangle_area_m2: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            weld_tolerance_m: 1e-3,
            min_triangle_area_m2: 1e-6,
        }
    }
}

/// Aggregate configuration for a batch run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub matching: MatchConfig,
    pub merging: MergeConfig,
    pub meshing: MeshConfig,
}
