// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! OSM-to-building matching
//!
//! Candidates come from the spatial index within the search radius.
//! Containment beats any edge distance; among equals, the smaller footprint
//! wins (the more specific building). Several OSM objects may match the same
//! building; that is expected for compound amenities.

use crate::error::Result;
use crate::geometry::{GeometryIndex, Projection};
use crate::model::OsmObject;
use crate::pipeline::MatchConfig;
use serde::{Deserialize, Serialize};

/// One ranked candidate building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub building_id: String,
    /// Distance from the representative point to the footprint, meters.
    pub distance_m: f64,
    /// True when the representative point lies inside the footprint.
    pub contained: bool,
    pub footprint_area_m2: f64,
    /// 1.0 for containment, decaying towards 0.0 at the search radius.
    pub confidence: f64,
}

/// Match outcome for one OSM object. Zero candidates is a valid, reportable
/// result, and candidate order is the ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub osm_id: String,
    /// Representative point in the projected CRS.
    pub point: [f64; 2],
    /// EPSG code of the CRS the point was projected into.
    pub epsg: u32,
    pub candidates: Vec<Candidate>,
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

/// Match one OSM object against the index.
pub fn match_object(
    obj: &OsmObject,
    index: &GeometryIndex,
    projection: &Projection,
    config: &MatchConfig,
) -> Result<MatchResult> {
    let point = projection.project(obj.representative_point());
    let radius = config.search_radius_m;
    let hits = index.query(point, radius)?;

    let mut candidates: Vec<Candidate> = hits
        .into_iter()
        .map(|hit| Candidate {
            confidence: if hit.contains {
                1.0
            } else {
                (1.0 - hit.distance_m / radius).clamp(0.0, 1.0)
            },
            building_id: hit.building_id,
            distance_m: hit.distance_m,
            contained: hit.contains,
            footprint_area_m2: hit.area_m2,
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.contained
            .cmp(&a.contained)
            .then_with(|| {
                a.distance_m
                    .partial_cmp(&b.distance_m)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                a.footprint_area_m2
                    .partial_cmp(&b.footprint_area_m2)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.building_id.cmp(&b.building_id))
    });

    Ok(MatchResult {
        osm_id: obj.id.clone(),
        point,
        epsg: projection.epsg(),
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CityBuilding, Solid, Surface, SurfaceKind, TagMap};
    use nalgebra::Point3;
    use std::collections::BTreeMap;

    // Buildings in EPSG:25832 around the test POI; the projection of
    // (8.4, 49.0) lands near easting 456135, northing 5427925.
    const POI: [f64; 2] = [8.4, 49.0];

    fn square(id: &str, cx: f64, cy: f64, half: f64) -> CityBuilding {
        CityBuilding {
            id: id.into(),
            epsg: Some(25832),
            attributes: BTreeMap::new(),
            solids: vec![Solid::new(vec![Surface::new(
                SurfaceKind::Ground,
                vec![
                    Point3::new(cx - half, cy - half, 0.0),
                    Point3::new(cx + half, cy - half, 0.0),
                    Point3::new(cx + half, cy + half, 0.0),
                    Point3::new(cx - half, cy + half, 0.0),
                ],
            )])],
        }
    }

    fn setup(buildings: Vec<CityBuilding>) -> (GeometryIndex, Projection, [f64; 2]) {
        let projection = Projection::from_epsg(25832).unwrap();
        let point = projection.project(POI);
        (GeometryIndex::build(buildings).unwrap(), projection, point)
    }

    #[test]
    fn containing_building_is_sole_top_candidate() {
        let projection = Projection::from_epsg(25832).unwrap();
        let [x, y] = projection.project(POI);
        let (index, projection, _) = setup(vec![
            square("inside", x, y, 10.0),
            square("nextdoor", x + 22.0, y, 8.0),
        ]);

        let obj = OsmObject::new("node/1", POI[0], POI[1], TagMap::new());
        let result =
            match_object(&obj, &index, &projection, &MatchConfig::default()).unwrap();

        let best = result.best().unwrap();
        assert_eq!(best.building_id, "inside");
        assert!(best.contained);
        assert_eq!(best.confidence, 1.0);
        // The neighbor is still a candidate, ranked below.
        assert_eq!(result.candidates.len(), 2);
        assert!(!result.candidates[1].contained);
    }

    #[test]
    fn beyond_radius_yields_no_candidates() {
        let projection = Projection::from_epsg(25832).unwrap();
        let [x, y] = projection.project(POI);
        let (index, projection, _) = setup(vec![square("far", x + 500.0, y, 10.0)]);

        let obj = OsmObject::new("node/2", POI[0], POI[1], TagMap::new());
        let result =
            match_object(&obj, &index, &projection, &MatchConfig::default()).unwrap();
        assert!(!result.is_matched());
    }

    #[test]
    fn smaller_footprint_breaks_ties() {
        let projection = Projection::from_epsg(25832).unwrap();
        let [x, y] = projection.project(POI);
        // Both contain the point; the small one is the more specific match.
        let (index, projection, _) = setup(vec![
            square("hall", x, y, 40.0),
            square("kiosk", x, y, 5.0),
        ]);

        let obj = OsmObject::new("node/3", POI[0], POI[1], TagMap::new());
        let result =
            match_object(&obj, &index, &projection, &MatchConfig::default()).unwrap();
        assert_eq!(result.best().unwrap().building_id, "kiosk");
    }
}
