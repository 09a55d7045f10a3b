// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Tiled CityJSON loading
//!
//! Reads cadastral CityJSON tiles into `CityBuilding` records: applies the
//! optional quantization transform, walks the boundary arrays of
//! MultiSurface / CompositeSurface / Solid / MultiSolid geometry together
//! with their semantic surface values, and keeps LOD2 geometry when a tile
//! mixes levels of detail.

use crate::error::{Error, Result};
use crate::geometry::parse_reference_system;
use crate::model::{CityBuilding, Solid, Surface, SurfaceKind};
use nalgebra::Point3;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct Doc {
    #[serde(rename = "type")]
    doc_type: String,
    #[serde(default)]
    metadata: Option<Metadata>,
    #[serde(default)]
    transform: Option<Transform>,
    #[serde(default)]
    vertices: Vec<[f64; 3]>,
    #[serde(rename = "CityObjects", default)]
    city_objects: BTreeMap<String, CityObject>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(rename = "referenceSystem", default)]
    reference_system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Transform {
    scale: [f64; 3],
    translate: [f64; 3],
}

#[derive(Debug, Deserialize)]
struct CityObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    #[serde(default)]
    geometry: Vec<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    lod: Option<Value>,
    #[serde(default)]
    boundaries: Value,
    #[serde(default)]
    semantics: Option<Semantics>,
}

#[derive(Debug, Deserialize)]
struct Semantics {
    #[serde(default)]
    surfaces: Vec<SemanticSurface>,
    #[serde(default)]
    values: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SemanticSurface {
    #[serde(rename = "type")]
    kind: String,
}

/// Load every CityJSON tile found under `dir` (recursively).
pub fn load_dir(dir: &Path) -> Result<Vec<CityBuilding>> {
    let mut buildings = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match load_file(path) {
            Ok(mut tile) => buildings.append(&mut tile),
            // Non-CityJSON json files in the directory are not an error.
            Err(Error::Parse { .. }) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(buildings)
}

/// Load one CityJSON tile.
pub fn load_file(path: &Path) -> Result<Vec<CityBuilding>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Doc = serde_json::from_str(&text).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if doc.doc_type != "CityJSON" {
        return Err(Error::Parse {
            path: path.to_path_buf(),
            message: format!("not a CityJSON document (type = {})", doc.doc_type),
        });
    }

    let epsg = doc
        .metadata
        .as_ref()
        .and_then(|m| m.reference_system.as_deref())
        .and_then(parse_reference_system);

    // Resolve quantized vertices to real coordinates once.
    let vertices: Vec<Point3<f64>> = match &doc.transform {
        Some(t) => doc
            .vertices
            .iter()
            .map(|v| {
                Point3::new(
                    v[0] * t.scale[0] + t.translate[0],
                    v[1] * t.scale[1] + t.translate[1],
                    v[2] * t.scale[2] + t.translate[2],
                )
            })
            .collect(),
        None => doc.vertices.iter().map(|v| Point3::new(v[0], v[1], v[2])).collect(),
    };

    let mut buildings = Vec::new();
    for (id, object) in &doc.city_objects {
        if object.kind != "Building" {
            continue;
        }
        let solids = object_solids(object, &vertices);
        if solids.is_empty() {
            continue;
        }
        buildings.push(CityBuilding {
            id: id.clone(),
            epsg,
            attributes: object.attributes.clone(),
            solids,
        });
    }
    Ok(buildings)
}

/// All solids of one city object, preferring LOD2 geometry when present.
fn object_solids(object: &CityObject, vertices: &[Point3<f64>]) -> Vec<Solid> {
    let lod2: Vec<&Geometry> = object
        .geometry
        .iter()
        .filter(|g| is_lod2(g.lod.as_ref()))
        .collect();
    let chosen: Vec<&Geometry> = if lod2.is_empty() {
        object.geometry.iter().collect()
    } else {
        lod2
    };

    let mut solids = Vec::new();
    for geometry in chosen {
        solids.extend(geometry_solids(geometry, vertices));
    }
    solids
}

fn is_lod2(lod: Option<&Value>) -> bool {
    match lod {
        Some(Value::String(s)) => s.starts_with('2'),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| (2.0..3.0).contains(&v)),
        _ => false,
    }
}

/// Decode one geometry into solids, pairing each surface with its semantic
/// type. The semantics `values` array mirrors the nesting of `boundaries`
/// with the ring level stripped.
fn geometry_solids(geometry: &Geometry, vertices: &[Point3<f64>]) -> Vec<Solid> {
    let surface_kinds: Vec<SurfaceKind> = geometry
        .semantics
        .as_ref()
        .map(|s| {
            s.surfaces
                .iter()
                .map(|surf| SurfaceKind::from_cityjson(&surf.kind))
                .collect()
        })
        .unwrap_or_default();
    let values = geometry
        .semantics
        .as_ref()
        .and_then(|s| s.values.as_ref());

    let kind_at = |path: &[usize]| -> SurfaceKind {
        let Some(mut value) = values else {
            return SurfaceKind::Unknown;
        };
        for &idx in path {
            match value {
                Value::Array(items) => match items.get(idx) {
                    Some(inner) => value = inner,
                    None => return SurfaceKind::Unknown,
                },
                _ => break,
            }
        }
        value
            .as_u64()
            .and_then(|i| surface_kinds.get(i as usize).copied())
            .unwrap_or(SurfaceKind::Unknown)
    };

    match geometry.kind.as_str() {
        "MultiSurface" | "CompositeSurface" => {
            let surfaces = decode_shell(&geometry.boundaries, vertices, &[], &kind_at);
            if surfaces.is_empty() {
                vec![]
            } else {
                vec![Solid::new(surfaces)]
            }
        }
        "Solid" => {
            let Value::Array(shells) = &geometry.boundaries else {
                return vec![];
            };
            let mut surfaces = Vec::new();
            for (shell_idx, shell) in shells.iter().enumerate() {
                surfaces.extend(decode_shell(shell, vertices, &[shell_idx], &kind_at));
            }
            if surfaces.is_empty() {
                vec![]
            } else {
                vec![Solid::new(surfaces)]
            }
        }
        "MultiSolid" | "CompositeSolid" => {
            let Value::Array(solids) = &geometry.boundaries else {
                return vec![];
            };
            let mut out = Vec::new();
            for (solid_idx, solid) in solids.iter().enumerate() {
                let Value::Array(shells) = solid else { continue };
                let mut surfaces = Vec::new();
                for (shell_idx, shell) in shells.iter().enumerate() {
                    surfaces.extend(decode_shell(
                        shell,
                        vertices,
                        &[solid_idx, shell_idx],
                        &kind_at,
                    ));
                }
                if !surfaces.is_empty() {
                    out.push(Solid::new(surfaces));
                }
            }
            out
        }
        _ => vec![],
    }
}

/// Decode a list of surfaces (`[[outer_ring, hole...], ...]`). Only the outer
/// ring is used; LOD2 cadastral surfaces carry no holes.
fn decode_shell(
    shell: &Value,
    vertices: &[Point3<f64>],
    path_prefix: &[usize],
    kind_at: &dyn Fn(&[usize]) -> SurfaceKind,
) -> Vec<Surface> {
    let Value::Array(surfaces) = shell else {
        return vec![];
    };
    let mut out = Vec::new();
    for (surf_idx, surface) in surfaces.iter().enumerate() {
        let Some(outer) = surface.as_array().and_then(|rings| rings.first()) else {
            continue;
        };
        let Some(indices) = outer.as_array() else { continue };
        let ring: Vec<Point3<f64>> = indices
            .iter()
            .filter_map(Value::as_u64)
            .filter_map(|i| vertices.get(i as usize).copied())
            .collect();
        if ring.len() < 3 {
            continue;
        }
        let mut path: Vec<usize> = path_prefix.to_vec();
        path.push(surf_idx);
        out.push(Surface::new(kind_at(&path), ring));
    }
    out
}
