// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Planar ring triangulation
//!
//! Wrapper around earcutr with fast paths for triangles and quads. Rings are
//! 3D but planar; they are projected onto their dominant plane before ear
//! clipping.

use crate::error::{Error, Result};
use nalgebra::{Point3, Vector3};

/// Newell's method: plane normal of a (possibly noisy) planar ring, following
/// the ring's winding. Not normalized; the magnitude is twice the ring area.
pub fn newell_normal(ring: &[Point3<f64>]) -> Vector3<f64> {
    let n = ring.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let p = &ring[i];
        let q = &ring[(i + 1) % n];
        normal.x += (p.y - q.y) * (p.z + q.z);
        normal.y += (p.z - q.z) * (p.x + q.x);
        normal.z += (p.x - q.x) * (p.y + q.y);
    }
    normal
}

/// Project a ring onto the 2D plane that drops the dominant normal axis.
fn project_ring(ring: &[Point3<f64>], normal: &Vector3<f64>) -> Vec<f64> {
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let mut flat = Vec::with_capacity(ring.len() * 2);
    for p in ring {
        let (u, v) = if ax >= ay && ax >= az {
            (p.y, p.z)
        } else if ay >= az {
            (p.x, p.z)
        } else {
            (p.x, p.y)
        };
        flat.push(u);
        flat.push(v);
    }
    flat
}

/// Triangulate one planar ring (no closing duplicate, no holes).
///
/// Returns index triples into the input slice. Winding of the result is not
/// normalized here; the mesh builder orients faces against the solid.
pub fn triangulate_ring(ring: &[Point3<f64>]) -> Result<Vec<[usize; 3]>> {
    let n = ring.len();

    if n < 3 {
        return Err(Error::GeometryMismatch(format!(
            "ring with {} points cannot be triangulated",
            n
        )));
    }

    // Fast path: already a triangle.
    if n == 3 {
        return Ok(vec![[0, 1, 2]]);
    }

    // Fast path: quad fan.
    if n == 4 {
        return Ok(vec![[0, 1, 2], [0, 2, 3]]);
    }

    let normal = newell_normal(ring);
    let flat = project_ring(ring, &normal);
    let raw = earcutr::earcut(&flat, &[], 2).map_err(|e| {
        Error::GeometryMismatch(format!("ear clipping failed on {}-gon: {:?}", n, e))
    })?;

    Ok(raw
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect())
}
