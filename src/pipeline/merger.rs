// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Record fusion
//!
//! Joins one OSM object with its matched buildings: unified attributes with
//! per-field provenance, union of the matched solids, and geometry
//! validation. Invalid geometry is flagged on the record, never dropped.

use crate::error::{Error, Result};
use crate::geometry::{newell_normal, GeometryIndex};
use crate::model::{
    Attribute, CityBuilding, FlagKind, GeometryFlag, MergedRecord, OsmObject, Solid,
};
use crate::pipeline::{MatchResult, MergeConfig};
use serde_json::json;

/// Attribute-name prefix for CityJSON values displaced by an OSM tag of the
/// same name.
const CITYJSON_PREFIX: &str = "cityjson:";

/// Fuse one OSM object with its matched buildings.
///
/// `Ok(None)` is the no-match case: reportable, but not an error. Fails with
/// `GeometryMismatch` when the matched buildings do not share one supported
/// projected CRS - fatal for this object only.
pub fn merge(
    obj: &OsmObject,
    result: &MatchResult,
    index: &GeometryIndex,
    config: &MergeConfig,
) -> Result<Option<MergedRecord>> {
    if result.candidates.is_empty() {
        return Ok(None);
    }

    let matched: Vec<&CityBuilding> = result
        .candidates
        .iter()
        .filter_map(|c| index.get(&c.building_id))
        .collect();

    let epsg = common_epsg(&matched)?;
    if epsg != result.epsg {
        return Err(Error::GeometryMismatch(format!(
            "point projected into EPSG:{} but buildings use EPSG:{}",
            result.epsg, epsg
        )));
    }

    // OSM tags first; they win collisions.
    let mut attributes = std::collections::BTreeMap::new();
    for (key, value) in obj.tags.iter() {
        attributes.insert(key.to_string(), Attribute::osm(value));
    }

    // CityJSON attributes in candidate rank order; first occurrence wins
    // within the CityJSON side, colliding names keep the prefixed copy.
    for building in &matched {
        for (key, value) in &building.attributes {
            if let Some(existing) = attributes.get(key) {
                if existing.origin == crate::model::Provenance::Osm {
                    let prefixed = format!("{}{}", CITYJSON_PREFIX, key);
                    attributes
                        .entry(prefixed)
                        .or_insert_with(|| Attribute::cityjson(value.clone()));
                }
            } else {
                attributes.insert(key.clone(), Attribute::cityjson(value.clone()));
            }
        }
    }

    attributes.insert(
        "matched_buildings".to_string(),
        Attribute::derived(json!(matched.len())),
    );

    // Geometry: union of the matched solids, verbatim copies.
    let mut solids: Vec<Solid> = Vec::new();
    let mut flags: Vec<GeometryFlag> = Vec::new();
    for building in &matched {
        for (solid_idx, solid) in building.solids.iter().enumerate() {
            validate_solid(&building.id, solid_idx, solid, config, &mut flags);
            solids.push(solid.clone());
        }
    }

    let best = &result.candidates[0];

    Ok(Some(MergedRecord {
        osm_id: obj.id.clone(),
        epsg,
        point: result.point,
        attributes,
        buildings: result
            .candidates
            .iter()
            .map(|c| c.building_id.clone())
            .collect(),
        distance_m: best.distance_m,
        solids,
        flags,
    }))
}

/// All matched buildings must agree on one EPSG code, and the code must be
/// present; otherwise the two sources cannot be aligned.
fn common_epsg(buildings: &[&CityBuilding]) -> Result<u32> {
    let mut epsg: Option<u32> = None;
    for building in buildings {
        match (building.epsg, epsg) {
            (None, _) => {
                return Err(Error::GeometryMismatch(format!(
                    "building {} has no CRS metadata",
                    building.id
                )))
            }
            (Some(code), None) => epsg = Some(code),
            (Some(code), Some(seen)) if code != seen => {
                return Err(Error::GeometryMismatch(format!(
                    "matched buildings use EPSG:{} and EPSG:{}",
                    seen, code
                )))
            }
            _ => {}
        }
    }
    epsg.ok_or_else(|| Error::GeometryMismatch("no buildings to merge".into()))
}

/// Check the record invariants for one solid: closed rings, planar rings,
/// watertight shell. Violations become flags.
fn validate_solid(
    building_id: &str,
    solid_idx: usize,
    solid: &Solid,
    config: &MergeConfig,
    flags: &mut Vec<GeometryFlag>,
) {
    let inv_q = 1.0 / config.shell_tolerance_m.max(1e-12);
    let mut edges: ahash::AHashMap<([i64; 3], [i64; 3]), i64> = ahash::AHashMap::new();

    for (surface_idx, surface) in solid.surfaces.iter().enumerate() {
        if !surface.is_closed() {
            flags.push(GeometryFlag {
                building: building_id.to_string(),
                solid: solid_idx,
                surface: Some(surface_idx),
                kind: FlagKind::RingNotClosed,
            });
        }

        let ring = surface.open_ring();
        if ring.len() >= 4 && !is_planar(ring, config.planarity_tolerance_m) {
            flags.push(GeometryFlag {
                building: building_id.to_string(),
                solid: solid_idx,
                surface: Some(surface_idx),
                kind: FlagKind::NonPlanar,
            });
        }

        // Count undirected edges; in a watertight shell every edge is shared
        // by exactly two surfaces.
        for i in 0..ring.len() {
            let a = quantize(&ring[i], inv_q);
            let b = quantize(&ring[(i + 1) % ring.len()], inv_q);
            if a == b {
                continue;
            }
            let key = if a <= b { (a, b) } else { (b, a) };
            *edges.entry(key).or_insert(0) += 1;
        }
    }

    if !solid.surfaces.is_empty() && edges.values().any(|&count| count != 2) {
        flags.push(GeometryFlag {
            building: building_id.to_string(),
            solid: solid_idx,
            surface: None,
            kind: FlagKind::OpenShell,
        });
    }
}

fn quantize(p: &nalgebra::Point3<f64>, inv_q: f64) -> [i64; 3] {
    [
        (p.x * inv_q).round() as i64,
        (p.y * inv_q).round() as i64,
        (p.z * inv_q).round() as i64,
    ]
}

fn is_planar(ring: &[nalgebra::Point3<f64>], tolerance: f64) -> bool {
    let normal = newell_normal(ring);
    let norm = normal.norm();
    if norm < 1e-12 {
        // Zero-area ring; planarity is meaningless, degenerate triangles are
        // filtered later.
        return true;
    }
    let unit = normal / norm;
    let origin = &ring[0];
    ring.iter()
        .all(|p| (p - origin).dot(&unit).abs() <= tolerance)
}
