// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! OSM feature loading and inspection export
//!
//! Two input shapes: plain GeoJSON FeatureCollections, and the tidy JSON
//! array the fetch step produces (`osm_id`, `lat`, `lon`, `tags`,
//! `accessibility`). The writer emits the compact inspection GeoJSON used to
//! eyeball coverage in a GIS tool.

use crate::error::{Error, Result};
use crate::model::{OsmObject, TagMap};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Tag keys kept by the compact inspection export.
const KEPT_TAGS: &[&str] = &[
    "amenity",
    "healthcare",
    "shop",
    "public_transport",
    "highway",
    "railway",
    "name",
    "wheelchair",
];

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_err(path: &Path, message: impl Into<String>) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Read OSM features from either supported file shape, detected from the
/// top-level JSON value: a FeatureCollection object or a fetch-output array.
pub fn read_features(path: &Path) -> Result<(Vec<OsmObject>, usize)> {
    let doc = read_json(path)?;
    if doc.is_array() {
        parse_poi_json(&doc, path)
    } else {
        parse_geojson(&doc, path)
    }
}

/// Read a GeoJSON FeatureCollection of Point/Polygon features.
///
/// Features without usable geometry are skipped, mirroring the original
/// conversion step; the count of skipped features is returned alongside.
pub fn read_geojson(path: &Path) -> Result<(Vec<OsmObject>, usize)> {
    let doc = read_json(path)?;
    parse_geojson(&doc, path)
}

fn parse_geojson(doc: &Value, path: &Path) -> Result<(Vec<OsmObject>, usize)> {
    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| parse_err(path, "missing features array"))?;

    let mut objects = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for (idx, feature) in features.iter().enumerate() {
        match feature_to_object(feature, idx) {
            Some(obj) => objects.push(obj),
            None => skipped += 1,
        }
    }
    Ok((objects, skipped))
}

fn feature_to_object(feature: &Value, idx: usize) -> Option<OsmObject> {
    let geometry = feature.get("geometry")?;
    let props = feature
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let id = props
        .get("osm_id")
        .map(value_to_string)
        .or_else(|| feature.get("id").map(value_to_string))
        .or_else(|| props.get("@id").map(value_to_string))
        .unwrap_or_else(|| format!("feature/{}", idx));

    let tags: TagMap = props
        .iter()
        .filter(|(k, _)| *k != "osm_id" && *k != "@id")
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect();

    let kind = geometry.get("type").and_then(Value::as_str)?;
    match kind {
        "Point" => {
            let coords = geometry.get("coordinates")?.as_array()?;
            let lon = coords.first()?.as_f64()?;
            let lat = coords.get(1)?.as_f64()?;
            Some(OsmObject::new(id, lon, lat, tags))
        }
        "Polygon" => {
            let outer = geometry
                .get("coordinates")?
                .as_array()?
                .first()?
                .as_array()?;
            let ring: Vec<[f64; 2]> = outer
                .iter()
                .filter_map(|pair| {
                    let pair = pair.as_array()?;
                    Some([pair.first()?.as_f64()?, pair.get(1)?.as_f64()?])
                })
                .collect();
            if ring.len() < 3 {
                return None;
            }
            let mut obj = OsmObject::new(id, 0.0, 0.0, tags);
            obj.footprint = Some(ring);
            obj.point = obj.representative_point();
            Some(obj)
        }
        _ => None,
    }
}

/// Read the fetch step's tidy JSON: an array of objects with `osm_id`,
/// `osm_type`, `lat`, `lon`, `tags` and optional `accessibility`.
pub fn read_poi_json(path: &Path) -> Result<(Vec<OsmObject>, usize)> {
    let doc = read_json(path)?;
    parse_poi_json(&doc, path)
}

fn parse_poi_json(doc: &Value, path: &Path) -> Result<(Vec<OsmObject>, usize)> {
    let entries = doc
        .as_array()
        .ok_or_else(|| parse_err(path, "expected a JSON array"))?;

    let mut objects = Vec::with_capacity(entries.len());
    let mut skipped = 0usize;

    for entry in entries {
        let (Some(lat), Some(lon)) = (
            entry.get("lat").and_then(Value::as_f64),
            entry.get("lon").and_then(Value::as_f64),
        ) else {
            skipped += 1;
            continue;
        };

        let id = entry
            .get("osm_id")
            .map(value_to_string)
            .unwrap_or_else(|| format!("poi/{}", objects.len() + skipped));

        let mut tags = TagMap::new();
        if let Some(map) = entry.get("tags").and_then(Value::as_object) {
            for (k, v) in map {
                tags.insert(k.clone(), value_to_string(v));
            }
        }
        // Accessibility facts live in their own block in the fetch output;
        // fold them into the tag set.
        if let Some(map) = entry.get("accessibility").and_then(Value::as_object) {
            for (k, v) in map {
                if !tags.contains_key(k) {
                    tags.insert(k.clone(), value_to_string(v));
                }
            }
        }
        if let Some(osm_type) = entry.get("osm_type").and_then(Value::as_str) {
            tags.insert("osm_type", osm_type);
        }

        objects.push(OsmObject::new(id, lon, lat, tags));
    }
    Ok((objects, skipped))
}

/// Write the compact inspection GeoJSON: point features with the name/type/
/// accessibility tags only.
pub fn write_geojson(objects: &[OsmObject], path: &Path) -> Result<()> {
    let features: Vec<Value> = objects
        .iter()
        .map(|obj| {
            let mut props = Map::new();
            props.insert("osm_id".into(), json!(obj.id));
            props.insert("lon".into(), json!(obj.point[0]));
            props.insert("lat".into(), json!(obj.point[1]));
            for key in KEPT_TAGS {
                if let Some(value) = obj.tags.get(key) {
                    props.insert((*key).into(), json!(value));
                }
            }
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [obj.point[0], obj.point[1]],
                },
                "properties": props,
            })
        })
        .collect();

    let doc = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    let text = serde_json::to_string_pretty(&doc).map_err(|e| Error::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, text).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
