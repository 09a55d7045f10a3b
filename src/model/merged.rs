// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Merged record - one fused OSM object + matched building geometry

use crate::model::Solid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which source contributed a merged field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Osm,
    CityJson,
    Derived,
}

/// A merged attribute value with its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub value: serde_json::Value,
    pub origin: Provenance,
}

impl Attribute {
    pub fn osm(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
            origin: Provenance::Osm,
        }
    }

    pub fn cityjson(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
            origin: Provenance::CityJson,
        }
    }

    pub fn derived(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
            origin: Provenance::Derived,
        }
    }
}

/// Invariant violation found while fusing geometry. Violations are carried on
/// the record so downstream consumers see them; the geometry itself is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    /// Ring does not repeat its first point.
    RingNotClosed,
    /// Ring vertices deviate from their best-fit plane beyond tolerance.
    NonPlanar,
    /// Solid has boundary edges not shared by exactly two surfaces.
    OpenShell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryFlag {
    pub building: String,
    pub solid: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<usize>,
    pub kind: FlagKind,
}

/// The fused record for one OSM object.
///
/// Owns its geometry: solids are copies, independent of the source
/// `CityBuilding` instances. Serialization is deterministic (sorted maps, no
/// timestamps), so merging the same inputs twice yields identical bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedRecord {
    /// OSM object identifier; output filenames derive from it, but the id on
    /// the record is authoritative, not the filename.
    pub osm_id: String,
    /// EPSG code of the projected CRS all geometry in this record uses.
    pub epsg: u32,
    /// Representative point in the projected CRS (derived).
    pub point: [f64; 2],
    /// Unified attributes; every entry knows its origin.
    pub attributes: BTreeMap<String, Attribute>,
    /// Matched building ids in rank order (derived).
    pub buildings: Vec<String>,
    /// Distance from the representative point to the best candidate, meters.
    pub distance_m: f64,
    /// Union of the matched buildings' solids, rings closed.
    pub solids: Vec<Solid>,
    /// Geometry invariant violations, empty for clean geometry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<GeometryFlag>,
}

impl MergedRecord {
    pub fn surface_count(&self) -> usize {
        self.solids.iter().map(|s| s.surfaces.len()).sum()
    }

    pub fn has_geometry(&self) -> bool {
        self.solids.iter().any(|s| !s.surfaces.is_empty())
    }
}
