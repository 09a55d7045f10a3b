// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! WGS84 to UTM projection
//!
//! The cadastral tiles name their CRS in `metadata.referenceSystem`; OSM
//! coordinates arrive as WGS84 lon/lat. Matching needs both in the same
//! planar frame, so the OSM side is projected forward once per object with
//! the standard transverse Mercator series (centimeter accuracy over a metro
//! area, far below the matching radius).

use crate::error::{Error, Result};

/// GRS80 semi-major axis; WGS84 differs only past the centimeter level.
const A: f64 = 6_378_137.0;
/// GRS80 inverse flattening.
const INV_F: f64 = 298.257_222_101;
/// UTM scale factor at the central meridian.
const K0: f64 = 0.9996;
/// UTM false easting.
const FALSE_EASTING: f64 = 500_000.0;

/// Forward projection into one projected CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    epsg: u32,
    central_meridian_deg: f64,
}

impl Projection {
    /// Projection for a supported EPSG code.
    ///
    /// Supported families: ETRS89 / UTM (EPSG 25828-25838) and WGS 84 / UTM
    /// north (EPSG 32601-32660). Anything else cannot be aligned with the
    /// OSM side and is a `GeometryMismatch`.
    pub fn from_epsg(epsg: u32) -> Result<Self> {
        let zone = match epsg {
            25828..=25838 => epsg - 25800,
            32601..=32660 => epsg - 32600,
            _ => {
                return Err(Error::GeometryMismatch(format!(
                    "unsupported projected CRS EPSG:{}",
                    epsg
                )))
            }
        };
        Ok(Self {
            epsg,
            central_meridian_deg: zone as f64 * 6.0 - 183.0,
        })
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Project WGS84 lon/lat (degrees) to easting/northing (meters).
    pub fn project(&self, lon_lat: [f64; 2]) -> [f64; 2] {
        let f = 1.0 / INV_F;
        let e2 = f * (2.0 - f);
        let ep2 = e2 / (1.0 - e2);

        let phi = lon_lat[1].to_radians();
        let dlam = (lon_lat[0] - self.central_meridian_deg).to_radians();

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a_ = cos_phi * dlam;

        let m = meridian_arc(phi, e2);

        let easting = FALSE_EASTING
            + K0 * n
                * (a_
                    + (1.0 - t + c) * a_.powi(3) / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a_.powi(5) / 120.0);

        let northing = K0
            * (m + n
                * tan_phi
                * (a_ * a_ / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a_.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a_.powi(6) / 720.0));

        [easting, northing]
    }
}

/// Meridian arc length from the equator.
fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Extract an EPSG code from a CityJSON `referenceSystem` string.
///
/// Accepts `EPSG:25832`, `urn:ogc:def:crs:EPSG::25832`, and
/// `http(s)://www.opengis.net/def/crs/EPSG/0/25832`.
pub fn parse_reference_system(value: &str) -> Option<u32> {
    let tail = value.rsplit(&[':', '/'][..]).next()?;
    let code: u32 = tail.trim().parse().ok()?;
    if value.to_ascii_uppercase().contains("EPSG") {
        Some(code)
    } else {
        None
    }
}
