// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Pipeline module - match, merge, mesh, batch driver

mod config;
mod matcher;
mod merger;
mod mesh_builder;
mod runner;

pub use config::{MatchConfig, MergeConfig, MeshConfig, PipelineConfig};
pub use matcher::{match_object, Candidate, MatchResult};
pub use merger::merge;
pub use mesh_builder::build_mesh;
pub use runner::{run, ObjectReport, ObjectStatus, RunSummary, Stage};
