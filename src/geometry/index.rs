// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Spatial index over building footprints
//!
//! An R-tree of footprint bounding boxes narrows candidates; exact
//! containment/distance against the polygon decides. Read-only after
//! `build()`, safe to share across workers.

use crate::error::{Error, Result};
use crate::geometry::Footprint;
use crate::model::CityBuilding;
use ahash::AHashMap;
use rstar::{RTree, RTreeObject, AABB};

/// R-tree entry: footprint bounds plus the slot of its building.
#[derive(Debug, Clone)]
struct FootprintEntry {
    slot: usize,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for FootprintEntry {
    type Envelope = AABB<[f64; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

/// One query answer, ordered by ascending distance.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub building_id: String,
    /// Distance from the query point to the footprint boundary, meters;
    /// 0.0 when the point is inside.
    pub distance_m: f64,
    /// True when the query point lies inside the footprint.
    pub contains: bool,
    /// Footprint area, square meters.
    pub area_m2: f64,
}

/// Spatial index over CityJSON building footprints.
///
/// `default()` is the unbuilt state; `build` is the only way to obtain a
/// queryable index.
#[derive(Debug, Default)]
pub struct GeometryIndex {
    tree: Option<RTree<FootprintEntry>>,
    buildings: Vec<CityBuilding>,
    footprints: Vec<Footprint>,
    by_id: AHashMap<String, usize>,
}

impl GeometryIndex {
    /// Build the index from a building collection.
    ///
    /// Buildings spanning several source tiles appear once per tile; they are
    /// deduplicated by id, keeping the most complete instance.
    pub fn build(buildings: Vec<CityBuilding>) -> Result<Self> {
        if buildings.is_empty() {
            return Err(Error::IndexEmpty);
        }

        let mut kept: Vec<CityBuilding> = Vec::with_capacity(buildings.len());
        let mut by_id: AHashMap<String, usize> = AHashMap::with_capacity(buildings.len());
        for building in buildings {
            match by_id.get(&building.id) {
                Some(&slot) if kept[slot].completeness() >= building.completeness() => {}
                Some(&slot) => kept[slot] = building,
                None => {
                    by_id.insert(building.id.clone(), kept.len());
                    kept.push(building);
                }
            }
        }

        let footprints: Vec<Footprint> = kept.iter().map(CityBuilding::footprint).collect();
        let entries: Vec<FootprintEntry> = footprints
            .iter()
            .enumerate()
            .filter_map(|(slot, fp)| {
                fp.bbox().map(|(min, max)| FootprintEntry {
                    slot,
                    env: AABB::from_corners(min, max),
                })
            })
            .collect();

        Ok(Self {
            tree: Some(RTree::bulk_load(entries)),
            buildings: kept,
            footprints,
            by_id,
        })
    }

    /// Buildings whose footprint lies within `radius_m` of `point`, ascending
    /// by distance. Fails with `NotBuilt` on an index that was never built.
    pub fn query(&self, point: [f64; 2], radius_m: f64) -> Result<Vec<QueryHit>> {
        let tree = self.tree.as_ref().ok_or(Error::NotBuilt)?;

        let search = AABB::from_corners(
            [point[0] - radius_m, point[1] - radius_m],
            [point[0] + radius_m, point[1] + radius_m],
        );

        let mut hits: Vec<QueryHit> = tree
            .locate_in_envelope_intersecting(&search)
            .filter_map(|entry| {
                let footprint = &self.footprints[entry.slot];
                let distance_m = footprint.distance(point);
                if distance_m > radius_m {
                    return None;
                }
                Some(QueryHit {
                    building_id: self.buildings[entry.slot].id.clone(),
                    distance_m,
                    contains: distance_m == 0.0 && footprint.contains(point),
                    area_m2: footprint.area(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance_m
                .partial_cmp(&b.distance_m)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.building_id.cmp(&b.building_id))
        });
        Ok(hits)
    }

    pub fn get(&self, id: &str) -> Option<&CityBuilding> {
        self.by_id.get(id).map(|&slot| &self.buildings[slot])
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn buildings(&self) -> &[CityBuilding] {
        &self.buildings
    }
}
