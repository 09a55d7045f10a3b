// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! CityJSON building model

use crate::geometry::Footprint;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic role of a building surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Roof,
    Wall,
    Ground,
    /// Surface without usable semantics; kept, rendered like a wall.
    Unknown,
}

impl SurfaceKind {
    /// Map a CityJSON semantic surface type string.
    pub fn from_cityjson(name: &str) -> Self {
        match name {
            "RoofSurface" => SurfaceKind::Roof,
            "WallSurface" => SurfaceKind::Wall,
            "GroundSurface" | "FloorSurface" => SurfaceKind::Ground,
            _ => SurfaceKind::Unknown,
        }
    }
}

/// One planar surface of a solid: a closed outer ring (first point == last)
/// in projected coordinates, tagged with its semantic role.
///
/// LOD2 cadastral exports carry no interior rings; holes are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub ring: Vec<Point3<f64>>,
}

impl Surface {
    pub fn new(kind: SurfaceKind, mut ring: Vec<Point3<f64>>) -> Self {
        close_ring(&mut ring);
        Self { kind, ring }
    }

    /// True when the ring repeats its first point at the end.
    pub fn is_closed(&self) -> bool {
        match (self.ring.first(), self.ring.last()) {
            (Some(a), Some(b)) => self.ring.len() >= 4 && a == b,
            _ => false,
        }
    }

    /// Ring vertices without the closing duplicate.
    pub fn open_ring(&self) -> &[Point3<f64>] {
        if self.is_closed() {
            &self.ring[..self.ring.len() - 1]
        } else {
            &self.ring
        }
    }
}

/// Close a ring in place unless the source already repeated the first point.
pub fn close_ring(ring: &mut Vec<Point3<f64>>) {
    if ring.len() >= 3 && ring.first() != ring.last() {
        let first = ring[0];
        ring.push(first);
    }
}

/// A closed volume described by its bounding planar surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solid {
    pub surfaces: Vec<Surface>,
}

impl Solid {
    pub fn new(surfaces: Vec<Surface>) -> Self {
        Self { surfaces }
    }

    /// Total ring vertex count across all surfaces (closing points included).
    pub fn vertex_count(&self) -> usize {
        self.surfaces.iter().map(|s| s.ring.len()).sum()
    }
}

/// One CityJSON building, immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityBuilding {
    pub id: String,
    /// EPSG code of the tile this building came from, when the tile names one.
    pub epsg: Option<u32>,
    /// CityJSON attributes (measuredHeight, roofType, yearOfConstruction, ...).
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub solids: Vec<Solid>,
}

impl CityBuilding {
    /// 2D footprint from the ground surfaces; falls back to all surfaces
    /// projected to the ground plane when no ground semantics exist.
    pub fn footprint(&self) -> Footprint {
        let mut rings: Vec<Vec<[f64; 2]>> = Vec::new();
        for solid in &self.solids {
            for surface in &solid.surfaces {
                if surface.kind == SurfaceKind::Ground {
                    rings.push(surface.open_ring().iter().map(|p| [p.x, p.y]).collect());
                }
            }
        }
        if rings.is_empty() {
            // No ground semantics: project the lowest surface of each solid.
            for solid in &self.solids {
                if let Some(surface) = solid.surfaces.iter().min_by(|a, b| {
                    let za = a.ring.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
                    let zb = b.ring.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
                    za.partial_cmp(&zb).unwrap_or(std::cmp::Ordering::Equal)
                }) {
                    rings.push(surface.open_ring().iter().map(|p| [p.x, p.y]).collect());
                }
            }
        }
        Footprint::new(rings)
    }

    /// Completeness rank used when the same building id appears in several
    /// tiles: more surfaces win, then more ring vertices.
    pub fn completeness(&self) -> (usize, usize) {
        let surfaces = self.solids.iter().map(|s| s.surfaces.len()).sum();
        let vertices = self.solids.iter().map(Solid::vertex_count).sum();
        (surfaces, vertices)
    }
}
