// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Merged record to mesh
//!
//! Triangulates every surface ring, welds seam vertices, drops degenerate
//! triangles, and normalizes winding so every face normal points away from
//! its solid's interior. Faces are emitted grouped by material class so the
//! exporter gets contiguous ranges.

use crate::error::{Error, Result};
use crate::geometry::{triangulate_ring, MaterialClass, Mesh, MeshWriter};
use crate::model::{MergedRecord, SurfaceKind};
use crate::pipeline::MeshConfig;
use nalgebra::{Point3, Vector3};

impl SurfaceKind {
    /// Render material for a semantic class; unknown surfaces read as walls.
    fn material(self) -> MaterialClass {
        match self {
            SurfaceKind::Roof => MaterialClass::Roof,
            SurfaceKind::Wall | SurfaceKind::Unknown => MaterialClass::Wall,
            SurfaceKind::Ground => MaterialClass::Ground,
        }
    }
}

/// Build a renderable mesh from a merged record.
///
/// Fails with `DegenerateSolid` when the record has geometry but every
/// triangle collapsed below the area tolerance.
pub fn build_mesh(record: &MergedRecord, config: &MeshConfig) -> Result<Mesh> {
    let mut writer = MeshWriter::new(config.weld_tolerance_m);

    // Interior reference point per solid for the outward test.
    let centroids: Vec<Point3<f64>> = record.solids.iter().map(solid_centroid).collect();

    for class in [MaterialClass::Roof, MaterialClass::Wall, MaterialClass::Ground] {
        let start = writer.triangle_count();

        for (solid, centroid) in record.solids.iter().zip(&centroids) {
            for surface in &solid.surfaces {
                if surface.kind.material() != class {
                    continue;
                }
                let ring = surface.open_ring();
                if ring.len() < 3 {
                    continue;
                }
                let Ok(triangles) = triangulate_ring(ring) else {
                    // Unclippable ring; the record carries a flag for it.
                    continue;
                };
                for [a, b, c] in triangles {
                    emit_triangle(
                        &mut writer,
                        [ring[a], ring[b], ring[c]],
                        centroid,
                        config.min_triangle_area_m2,
                    );
                }
            }
        }

        writer.close_range(class, start);
    }

    let mesh = writer.finish();
    if mesh.triangle_count() == 0 && record.has_geometry() {
        return Err(Error::DegenerateSolid(record.osm_id.clone()));
    }
    Ok(mesh)
}

/// Mean of all ring vertices of a solid. For the closed LOD2 shells this
/// lands strictly inside, which is all the outward test needs.
fn solid_centroid(solid: &crate::model::Solid) -> Point3<f64> {
    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for surface in &solid.surfaces {
        for p in surface.open_ring() {
            sum += p.coords;
            count += 1;
        }
    }
    if count == 0 {
        Point3::origin()
    } else {
        Point3::from(sum / count as f64)
    }
}

/// Weld, degenerate-filter, and orient one triangle, then emit it.
fn emit_triangle(
    writer: &mut MeshWriter,
    corners: [Point3<f64>; 3],
    interior: &Point3<f64>,
    min_area: f64,
) {
    let normal = (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
    let area = normal.norm() * 0.5;
    if area < min_area {
        return;
    }

    let i0 = writer.add_vertex(corners[0]);
    let i1 = writer.add_vertex(corners[1]);
    let i2 = writer.add_vertex(corners[2]);
    // Welding can collapse a sliver onto two vertices.
    if i0 == i1 || i1 == i2 || i0 == i2 {
        return;
    }

    let face_center = Point3::from((corners[0].coords + corners[1].coords + corners[2].coords) / 3.0);
    let outward = face_center - interior;
    if normal.dot(&outward) < 0.0 {
        writer.add_triangle([i0, i2, i1]);
    } else {
        writer.add_triangle([i0, i1, i2]);
    }
}
