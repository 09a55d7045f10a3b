// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! OSM feature model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// OSM tag set.
///
/// Backed by a `BTreeMap` so serialized output is deterministic regardless of
/// insertion order; OSM itself attaches no meaning to tag order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One OSM point-of-interest feature, immutable once loaded.
///
/// `point` is the feature's geographic coordinate (lon, lat, WGS84). Features
/// mapped as areas additionally carry their outline in `footprint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsmObject {
    pub id: String,
    /// Longitude, latitude in degrees.
    pub point: [f64; 2],
    pub tags: TagMap,
    /// Optional outline ring (lon/lat), not closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Vec<[f64; 2]>>,
}

impl OsmObject {
    pub fn new(id: impl Into<String>, lon: f64, lat: f64, tags: TagMap) -> Self {
        Self {
            id: id.into(),
            point: [lon, lat],
            tags,
            footprint: None,
        }
    }

    /// The point that stands in for this object during matching: the
    /// footprint centroid when an outline is present, the node coordinate
    /// otherwise.
    pub fn representative_point(&self) -> [f64; 2] {
        match &self.footprint {
            Some(ring) if ring.len() >= 3 => ring_centroid(ring),
            _ => self.point,
        }
    }
}

/// Area centroid of a simple ring; falls back to the vertex mean for
/// degenerate (zero-area) rings.
fn ring_centroid(ring: &[[f64; 2]]) -> [f64; 2] {
    let n = ring.len();
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let [x0, y0] = ring[i];
        let [x1, y1] = ring[(i + 1) % n];
        let cross = x0 * y1 - x1 * y0;
        area2 += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    if area2.abs() < 1e-12 {
        let inv = 1.0 / n as f64;
        let mut mx = 0.0;
        let mut my = 0.0;
        for [x, y] in ring {
            mx += x * inv;
            my += y * inv;
        }
        return [mx, my];
    }
    [cx / (3.0 * area2), cy / (3.0 * area2)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn representative_point_prefers_footprint_centroid() {
        let mut obj = OsmObject::new("node/1", 8.0, 49.0, TagMap::new());
        assert_eq!(obj.representative_point(), [8.0, 49.0]);

        obj.footprint = Some(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        let [cx, cy] = obj.representative_point();
        assert_relative_eq!(cx, 1.0, epsilon = 1e-12);
        assert_relative_eq!(cy, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn tag_map_serializes_sorted() {
        let mut tags = TagMap::new();
        tags.insert("name", "Rathaus");
        tags.insert("amenity", "townhall");
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"{"amenity":"townhall","name":"Rathaus"}"#);
    }
}
