// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Domain model - OSM features, CityJSON buildings, merged records

mod building;
mod merged;
mod osm;

pub use building::{CityBuilding, Solid, Surface, SurfaceKind};
pub use merged::{Attribute, FlagKind, GeometryFlag, MergedRecord, Provenance};
pub use osm::{OsmObject, TagMap};
