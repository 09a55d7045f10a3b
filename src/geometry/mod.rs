// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Geometry module - footprints, spatial index, meshes, projection

mod footprint;
mod index;
mod mesh;
mod proj;
mod triangulate;

pub use footprint::Footprint;
pub use index::{GeometryIndex, QueryHit};
pub use mesh::{MaterialClass, MaterialRange, Mesh, MeshWriter, Triangle, Vertex};
pub use proj::{parse_reference_system, Projection};
pub use triangulate::{newell_normal, triangulate_ring};
