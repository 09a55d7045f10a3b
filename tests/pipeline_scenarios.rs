// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! End-to-end pipeline scenarios
//!
//! Karlsruhe-flavored fixtures: a POI at (8.404, 49.014) and gable-roof LOD2
//! buildings in EPSG:25832, driven through match -> merge -> mesh -> export.

use cityfuse::geometry::Projection;
use cityfuse::model::{Provenance, Solid, Surface, SurfaceKind};
use cityfuse::pipeline::{self, ObjectStatus, PipelineConfig};
use cityfuse::{io, CityBuilding, GeometryIndex, OsmObject, TagMap};
use nalgebra::Point3;
use std::collections::BTreeMap;

const POI: [f64; 2] = [8.404, 49.014];

/// Gable-roof solid centered at (cx, cy): 2 roof + 4 wall + 1 ground
/// surfaces, watertight.
fn gable_building(id: &str, cx: f64, cy: f64) -> CityBuilding {
    let (hw, hd, eave, ridge) = (5.0, 3.0, 3.0, 5.0);
    let (x0, y0, x1, y1) = (cx - hw, cy - hd, cx + hw, cy + hd);

    let base = [
        Point3::new(x0, y0, 0.0),
        Point3::new(x1, y0, 0.0),
        Point3::new(x1, y1, 0.0),
        Point3::new(x0, y1, 0.0),
    ];
    let top = [
        Point3::new(x0, y0, eave),
        Point3::new(x1, y0, eave),
        Point3::new(x1, y1, eave),
        Point3::new(x0, y1, eave),
    ];
    let r0 = Point3::new(x0, cy, ridge);
    let r1 = Point3::new(x1, cy, ridge);

    let surfaces = vec![
        Surface::new(
            SurfaceKind::Ground,
            vec![base[3], base[2], base[1], base[0]],
        ),
        Surface::new(SurfaceKind::Wall, vec![base[0], base[1], top[1], top[0]]),
        Surface::new(SurfaceKind::Wall, vec![base[2], base[3], top[3], top[2]]),
        Surface::new(
            SurfaceKind::Wall,
            vec![base[1], base[2], top[2], r1, top[1]],
        ),
        Surface::new(
            SurfaceKind::Wall,
            vec![base[3], base[0], top[0], r0, top[3]],
        ),
        Surface::new(SurfaceKind::Roof, vec![top[0], top[1], r1, r0]),
        Surface::new(SurfaceKind::Roof, vec![top[2], top[3], r0, r1]),
    ];

    let mut attributes = BTreeMap::new();
    attributes.insert("measuredHeight".to_string(), serde_json::json!(5.0));
    attributes.insert("roofType".to_string(), serde_json::json!("SATTELDACH"));

    CityBuilding {
        id: id.into(),
        epsg: Some(25832),
        attributes,
        solids: vec![Solid::new(surfaces)],
    }
}

fn poi_object() -> OsmObject {
    let mut tags = TagMap::new();
    tags.insert("amenity", "cafe");
    tags.insert("name", "Cafe am Schloss");
    tags.insert("wheelchair", "yes");
    OsmObject::new("node/240184401", POI[0], POI[1], tags)
}

#[test]
fn gable_roof_scenario_end_to_end() {
    let projection = Projection::from_epsg(25832).unwrap();
    let [x, y] = projection.project(POI);

    let buildings = vec![
        gable_building("DEBW_522000", x, y),
        gable_building("DEBW_522001", x + 40.0, y),
    ];

    let dir = tempfile::tempdir().unwrap();
    let summary = pipeline::run(
        &[poi_object()],
        buildings,
        dir.path(),
        &PipelineConfig::default(),
        true,
        None,
    )
    .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.meshed, 1);
    assert_eq!(summary.failed, 0);

    // Merged record: containment match, unified tags, provenance intact.
    let record_path = io::merged::record_path(dir.path(), "node/240184401");
    let record = io::merged::read_record(&record_path).unwrap();
    assert_eq!(record.buildings[0], "DEBW_522000");
    assert_eq!(record.distance_m, 0.0);
    assert_eq!(record.attributes["amenity"].origin, Provenance::Osm);
    assert_eq!(record.attributes["roofType"].origin, Provenance::CityJson);
    assert_eq!(record.surface_count(), 7);
    assert!(record.flags.is_empty());

    // Mesh file: non-empty GLB.
    let mesh_path = io::merged::mesh_path(dir.path(), "node/240184401");
    let bytes = std::fs::read(&mesh_path).unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(&bytes[0..4], b"glTF");
}

#[test]
fn matcher_prefers_containment_over_proximity() {
    let projection = Projection::from_epsg(25832).unwrap();
    let [x, y] = projection.project(POI);

    // The POI sits inside the first building; the second is close by.
    let index = GeometryIndex::build(vec![
        gable_building("containing", x, y),
        gable_building("adjacent", x + 12.0, y),
    ])
    .unwrap();

    let result = pipeline::match_object(
        &poi_object(),
        &index,
        &projection,
        &Default::default(),
    )
    .unwrap();

    let best = result.best().unwrap();
    assert_eq!(best.building_id, "containing");
    assert!(best.contained);
    assert_eq!(best.confidence, 1.0);
}

#[test]
fn unmatched_object_produces_no_files() {
    let projection = Projection::from_epsg(25832).unwrap();
    let [x, y] = projection.project(POI);

    // Nearest building is ~100 m away, well beyond the 25 m radius.
    let buildings = vec![gable_building("DEBW_1", x + 100.0, y)];

    let dir = tempfile::tempdir().unwrap();
    let summary = pipeline::run(
        &[poi_object()],
        buildings,
        dir.path(),
        &PipelineConfig::default(),
        true,
        None,
    )
    .unwrap();

    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.merged, 0);
    assert_eq!(summary.meshed, 0);
    assert!(matches!(
        summary.reports[0].status,
        ObjectStatus::Unmatched
    ));
    assert!(!io::merged::record_path(dir.path(), "node/240184401").exists());
    assert!(!io::merged::mesh_path(dir.path(), "node/240184401").exists());
}

#[test]
fn merge_twice_yields_identical_record_files() {
    let projection = Projection::from_epsg(25832).unwrap();
    let [x, y] = projection.project(POI);
    let building = gable_building("DEBW_1", x, y);

    let read_bytes = |dir: &std::path::Path| {
        std::fs::read(io::merged::record_path(dir, "node/240184401")).unwrap()
    };

    let dir_a = tempfile::tempdir().unwrap();
    pipeline::run(
        &[poi_object()],
        vec![building.clone()],
        dir_a.path(),
        &PipelineConfig::default(),
        false,
        None,
    )
    .unwrap();

    let dir_b = tempfile::tempdir().unwrap();
    pipeline::run(
        &[poi_object()],
        vec![building],
        dir_b.path(),
        &PipelineConfig::default(),
        false,
        None,
    )
    .unwrap();

    assert_eq!(read_bytes(dir_a.path()), read_bytes(dir_b.path()));
}

#[test]
fn two_pois_may_share_one_building() {
    let projection = Projection::from_epsg(25832).unwrap();
    let [x, y] = projection.project(POI);
    let buildings = vec![gable_building("DEBW_1", x, y)];

    let mut second = poi_object();
    second.id = "node/240184402".into();

    let dir = tempfile::tempdir().unwrap();
    let summary = pipeline::run(
        &[poi_object(), second],
        buildings,
        dir.path(),
        &PipelineConfig::default(),
        true,
        None,
    )
    .unwrap();

    assert_eq!(summary.meshed, 2);
    let a = io::merged::read_record(&io::merged::record_path(dir.path(), "node/240184401"))
        .unwrap();
    let b = io::merged::read_record(&io::merged::record_path(dir.path(), "node/240184402"))
        .unwrap();
    assert_eq!(a.buildings, b.buildings);
}

#[test]
fn mesh_has_no_degenerate_faces_and_distinct_vertices() {
    let projection = Projection::from_epsg(25832).unwrap();
    let [x, y] = projection.project(POI);
    let index = GeometryIndex::build(vec![gable_building("DEBW_1", x, y)]).unwrap();

    let obj = poi_object();
    let result =
        pipeline::match_object(&obj, &index, &projection, &Default::default()).unwrap();
    let record = pipeline::merge(&obj, &result, &index, &Default::default())
        .unwrap()
        .unwrap();
    let mesh = pipeline::build_mesh(&record, &Default::default()).unwrap();

    assert_eq!(mesh.triangle_count(), 16);
    for tri in &mesh.triangles {
        let [a, b, c] = tri.indices;
        assert!(a != b && b != c && a != c);
        let v0 = mesh.vertices[a].position;
        let v1 = mesh.vertices[b].position;
        let v2 = mesh.vertices[c].position;
        assert!((v1 - v0).cross(&(v2 - v0)).norm() * 0.5 > 1e-6);
    }
}
