// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Batch driver
//!
//! Runs match -> merge -> record file -> mesh -> GLB per OSM object. The
//! index is built once and shared read-only across rayon workers; per-object
//! failures are recorded and never stop the batch.

use crate::error::{Error, Result};
use crate::geometry::{GeometryIndex, Projection};
use crate::io;
use crate::model::{CityBuilding, OsmObject};
use crate::pipeline::{build_mesh, match_object, merge, PipelineConfig};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Pipeline stage a failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Match,
    Merge,
    Mesh,
    Export,
}

/// Outcome for one OSM object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObjectStatus {
    /// Mesh file written.
    Meshed,
    /// Merged record written, meshing skipped by request.
    Merged,
    /// No building within the search radius.
    Unmatched,
    Failed { stage: Stage, kind: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectReport {
    pub osm_id: String,
    pub status: ObjectStatus,
}

/// Aggregated counts for a run, the user-facing coverage report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub merged: usize,
    pub meshed: usize,
    pub failed: usize,
    pub reports: Vec<ObjectReport>,
}

impl RunSummary {
    fn collect(reports: Vec<ObjectReport>, matched: usize) -> Self {
        let mut summary = RunSummary {
            total: reports.len(),
            matched,
            ..Default::default()
        };
        for report in &reports {
            match &report.status {
                ObjectStatus::Meshed => {
                    summary.merged += 1;
                    summary.meshed += 1;
                }
                ObjectStatus::Merged => summary.merged += 1,
                ObjectStatus::Unmatched => summary.unmatched += 1,
                ObjectStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary.reports = reports;
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &ObjectReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, ObjectStatus::Failed { .. }))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects: {} matched, {} unmatched, {} merged, {} meshed, {} failed",
            self.total, self.matched, self.unmatched, self.merged, self.meshed, self.failed
        )
    }
}

/// Run the pipeline over a batch of OSM objects.
///
/// Index construction failures are fatal; everything after that is caught
/// per object. When `emit_meshes` is false the run stops after the merged
/// record files (the merge-only mode of the CLI).
pub fn run(
    objects: &[OsmObject],
    buildings: Vec<CityBuilding>,
    out_dir: &Path,
    config: &PipelineConfig,
    emit_meshes: bool,
    progress: Option<&ProgressBar>,
) -> Result<RunSummary> {
    // The tiles define the target CRS; disagreement or absence surfaces
    // per object as GeometryMismatch.
    let projection = buildings
        .iter()
        .find_map(|b| b.epsg)
        .ok_or_else(|| {
            Error::GeometryMismatch("no tile names a coordinate reference system".into())
        })
        .and_then(Projection::from_epsg);

    let index = GeometryIndex::build(buildings)?;

    std::fs::create_dir_all(out_dir).map_err(|source| Error::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let outcomes: Vec<(bool, ObjectReport)> = objects
        .par_iter()
        .map(|obj| {
            let outcome = process_object(obj, &index, &projection, out_dir, config, emit_meshes);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            outcome
        })
        .collect();

    let matched = outcomes.iter().filter(|(matched, _)| *matched).count();
    let reports = outcomes.into_iter().map(|(_, report)| report).collect();
    Ok(RunSummary::collect(reports, matched))
}

fn process_object(
    obj: &OsmObject,
    index: &GeometryIndex,
    projection: &std::result::Result<Projection, Error>,
    out_dir: &Path,
    config: &PipelineConfig,
    emit_meshes: bool,
) -> (bool, ObjectReport) {
    let fail = |stage: Stage, err: &Error| ObjectReport {
        osm_id: obj.id.clone(),
        status: ObjectStatus::Failed {
            stage,
            kind: err.kind().to_string(),
            message: err.to_string(),
        },
    };

    let projection = match projection {
        Ok(p) => p,
        Err(err) => return (false, fail(Stage::Match, err)),
    };

    let result = match match_object(obj, index, projection, &config.matching) {
        Ok(r) => r,
        Err(err) => return (false, fail(Stage::Match, &err)),
    };
    let matched = result.is_matched();

    let record = match merge(obj, &result, index, &config.merging) {
        Ok(Some(record)) => record,
        Ok(None) => {
            return (
                false,
                ObjectReport {
                    osm_id: obj.id.clone(),
                    status: ObjectStatus::Unmatched,
                },
            )
        }
        Err(err) => return (matched, fail(Stage::Merge, &err)),
    };

    if let Err(err) = io::merged::write_record(&record, out_dir) {
        return (matched, fail(Stage::Merge, &err));
    }

    if !emit_meshes {
        return (
            matched,
            ObjectReport {
                osm_id: obj.id.clone(),
                status: ObjectStatus::Merged,
            },
        );
    }

    let mesh = match build_mesh(&record, &config.meshing) {
        Ok(mesh) => mesh,
        Err(err) => return (matched, fail(Stage::Mesh, &err)),
    };

    let mesh_path = io::merged::mesh_path(out_dir, &record.osm_id);
    if let Err(err) = io::export_glb(&mesh, &mesh_path) {
        return (matched, fail(Stage::Export, &err));
    }

    (
        matched,
        ObjectReport {
            osm_id: obj.id.clone(),
            status: ObjectStatus::Meshed,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Solid, Surface, SurfaceKind, TagMap};
    use nalgebra::Point3;
    use std::collections::BTreeMap;

    fn boxy(id: &str, cx: f64, cy: f64, half: f64, height: f64) -> CityBuilding {
        let (x0, y0, x1, y1) = (cx - half, cy - half, cx + half, cy + half);
        let ground = Surface::new(
            SurfaceKind::Ground,
            vec![
                Point3::new(x0, y1, 0.0),
                Point3::new(x1, y1, 0.0),
                Point3::new(x1, y0, 0.0),
                Point3::new(x0, y0, 0.0),
            ],
        );
        let roof = Surface::new(
            SurfaceKind::Roof,
            vec![
                Point3::new(x0, y0, height),
                Point3::new(x1, y0, height),
                Point3::new(x1, y1, height),
                Point3::new(x0, y1, height),
            ],
        );
        let walls = [
            [(x0, y0), (x1, y0)],
            [(x1, y0), (x1, y1)],
            [(x1, y1), (x0, y1)],
            [(x0, y1), (x0, y0)],
        ]
        .map(|[(ax, ay), (bx, by)]| {
            Surface::new(
                SurfaceKind::Wall,
                vec![
                    Point3::new(ax, ay, 0.0),
                    Point3::new(bx, by, 0.0),
                    Point3::new(bx, by, height),
                    Point3::new(ax, ay, height),
                ],
            )
        });
        let mut surfaces = vec![ground, roof];
        surfaces.extend(walls);
        CityBuilding {
            id: id.into(),
            epsg: Some(25832),
            attributes: BTreeMap::new(),
            solids: vec![Solid::new(surfaces)],
        }
    }

    #[test]
    fn batch_continues_past_unmatched_objects() {
        let projection = Projection::from_epsg(25832).unwrap();
        let [x, y] = projection.project([8.4, 49.0]);
        let buildings = vec![boxy("b1", x, y, 10.0, 6.0)];

        let on_building = OsmObject::new("node/1", 8.4, 49.0, TagMap::new());
        // ~0.01 deg east is ~730 m away, far beyond the radius.
        let in_the_park = OsmObject::new("node/2", 8.41, 49.0, TagMap::new());

        let dir = tempfile::tempdir().unwrap();
        let summary = run(
            &[on_building.clone(), in_the_park],
            buildings,
            dir.path(),
            &PipelineConfig::default(),
            true,
            None,
        )
        .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.meshed, 1);
        assert_eq!(summary.failed, 0);

        assert!(io::merged::record_path(dir.path(), "node/1").exists());
        assert!(io::merged::mesh_path(dir.path(), "node/1").exists());
        assert!(!io::merged::record_path(dir.path(), "node/2").exists());
        assert!(!io::merged::mesh_path(dir.path(), "node/2").exists());
    }

    #[test]
    fn empty_building_set_is_fatal() {
        let obj = OsmObject::new("node/1", 8.4, 49.0, TagMap::new());
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            &[obj],
            vec![],
            dir.path(),
            &PipelineConfig::default(),
            true,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::GeometryMismatch(_) | Error::IndexEmpty));
    }

    #[test]
    fn merge_only_mode_writes_no_meshes() {
        let projection = Projection::from_epsg(25832).unwrap();
        let [x, y] = projection.project([8.4, 49.0]);
        let buildings = vec![boxy("b1", x, y, 10.0, 6.0)];
        let obj = OsmObject::new("node/1", 8.4, 49.0, TagMap::new());

        let dir = tempfile::tempdir().unwrap();
        let summary = run(
            &[obj],
            buildings,
            dir.path(),
            &PipelineConfig::default(),
            false,
            None,
        )
        .unwrap();

        assert_eq!(summary.merged, 1);
        assert_eq!(summary.meshed, 0);
        assert!(io::merged::record_path(dir.path(), "node/1").exists());
        assert!(!io::merged::mesh_path(dir.path(), "node/1").exists());
    }
}
