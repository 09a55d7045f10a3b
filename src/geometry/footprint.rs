// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! 2D footprint polygons and the point tests used for matching

use serde::{Deserialize, Serialize};

/// A building footprint: one or more simple rings in projected coordinates.
///
/// Tiled exports often split a footprint into several ground patches; the
/// rings are kept separate and queries take the best answer over all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Footprint {
    rings: Vec<Vec<[f64; 2]>>,
}

impl Footprint {
    /// Build from open rings (closing duplicates are tolerated and dropped).
    pub fn new(rings: Vec<Vec<[f64; 2]>>) -> Self {
        let rings = rings
            .into_iter()
            .map(|mut ring| {
                if ring.len() >= 2 && ring.first() == ring.last() {
                    ring.pop();
                }
                ring
            })
            .filter(|ring| ring.len() >= 3)
            .collect();
        Self { rings }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn rings(&self) -> &[Vec<[f64; 2]>] {
        &self.rings
    }

    /// Total area in square units (sum of ring areas).
    pub fn area(&self) -> f64 {
        self.rings.iter().map(|r| signed_area(r).abs()).sum()
    }

    /// Axis-aligned bounds; `None` for an empty footprint.
    pub fn bbox(&self) -> Option<([f64; 2], [f64; 2])> {
        let mut min = [f64::INFINITY, f64::INFINITY];
        let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        for ring in &self.rings {
            for &[x, y] in ring {
                min[0] = min[0].min(x);
                min[1] = min[1].min(y);
                max[0] = max[0].max(x);
                max[1] = max[1].max(y);
            }
        }
        if min[0].is_finite() {
            Some((min, max))
        } else {
            None
        }
    }

    /// Even-odd containment test against any ring.
    pub fn contains(&self, point: [f64; 2]) -> bool {
        self.rings.iter().any(|ring| ring_contains(ring, point))
    }

    /// Distance from a point to the nearest ring boundary; 0.0 when the point
    /// lies inside.
    pub fn distance(&self, point: [f64; 2]) -> f64 {
        if self.contains(point) {
            return 0.0;
        }
        self.rings
            .iter()
            .flat_map(|ring| {
                (0..ring.len()).map(move |i| {
                    point_segment_distance(point, ring[i], ring[(i + 1) % ring.len()])
                })
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// Signed area of a simple ring (positive for counter-clockwise).
pub fn signed_area(ring: &[[f64; 2]]) -> f64 {
    let n = ring.len();
    let mut sum = 0.0;
    for i in 0..n {
        let [x0, y0] = ring[i];
        let [x1, y1] = ring[(i + 1) % n];
        sum += x0 * y1 - x1 * y0;
    }
    sum * 0.5
}

/// Ray-casting point-in-ring test. Points on the boundary count as inside,
/// which is the preference the matcher wants for edge-sitting POIs.
fn ring_contains(ring: &[[f64; 2]], [px, py]: [f64; 2]) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if point_segment_distance([px, py], ring[i], ring[j]) < 1e-9 {
            return true;
        }
        if (yi > py) != (yj > py) {
            let x_cross = (xj - xi) * (py - yi) / (yj - yi) + xi;
            if px < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn point_segment_distance([px, py]: [f64; 2], [ax, ay]: [f64; 2], [bx, by]: [f64; 2]) -> f64 {
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Footprint {
        Footprint::new(vec![vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]])
    }

    #[test]
    fn contains_inside_and_outside() {
        let fp = unit_square();
        assert!(fp.contains([5.0, 5.0]));
        assert!(fp.contains([0.0, 5.0])); // boundary counts as inside
        assert!(!fp.contains([10.5, 5.0]));
    }

    #[test]
    fn distance_is_zero_inside_and_euclidean_outside() {
        let fp = unit_square();
        assert_eq!(fp.distance([5.0, 5.0]), 0.0);
        assert_relative_eq!(fp.distance([13.0, 14.0]), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn area_sums_rings() {
        let fp = Footprint::new(vec![
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
            vec![[20.0, 0.0], [24.0, 0.0], [24.0, 5.0], [20.0, 5.0]],
        ]);
        assert_relative_eq!(fp.area(), 120.0, epsilon = 1e-12);
    }

    #[test]
    fn closing_duplicate_is_dropped() {
        let fp = Footprint::new(vec![vec![
            [0.0, 0.0],
            [4.0, 0.0],
            [4.0, 4.0],
            [0.0, 4.0],
            [0.0, 0.0],
        ]]);
        assert_eq!(fp.rings()[0].len(), 4);
        assert_relative_eq!(fp.area(), 16.0, epsilon = 1e-12);
    }

    #[test]
    fn concave_ring_containment() {
        // L-shape; the notch is outside.
        let fp = Footprint::new(vec![vec![
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 4.0],
            [4.0, 4.0],
            [4.0, 10.0],
            [0.0, 10.0],
        ]]);
        assert!(fp.contains([2.0, 8.0]));
        assert!(!fp.contains([8.0, 8.0]));
    }
}
