// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! GLB exporter
//!
//! Writes a self-contained binary glTF 2.0 file: one buffer with positions,
//! normals and per-material index ranges, one primitive per material class.
//! The file goes through a temp file and lands atomically - a failed export
//! never leaves a truncated GLB behind.

use crate::error::{Error, Result};
use crate::geometry::Mesh;
use crate::io::merged::write_atomic;
use serde_json::json;
use std::path::Path;

const GLB_MAGIC: u32 = 0x4654_6C67; // "glTF"
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"

/// Export a mesh as GLB.
pub fn export(mesh: &Mesh, path: &Path) -> Result<()> {
    let (gltf, buffer) = build_document(mesh);

    let mut json_bytes = serde_json::to_vec(&gltf).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    // Chunks are 4-byte aligned; JSON pads with spaces, BIN with zeros.
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    let mut bin_bytes = buffer;
    while bin_bytes.len() % 4 != 0 {
        bin_bytes.push(0);
    }

    let total = 12 + 8 + json_bytes.len() + 8 + bin_bytes.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);
    out.extend_from_slice(&(bin_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin_bytes);

    write_atomic(path, &out)
}

/// Build the glTF JSON document and its binary buffer.
fn build_document(mesh: &Mesh) -> (serde_json::Value, Vec<u8>) {
    let mut buffer: Vec<u8> = Vec::new();

    // Positions.
    let position_offset = buffer.len();
    let (mut min, mut max) = ([f32::MAX; 3], [f32::MIN; 3]);
    for vertex in &mesh.vertices {
        let p = [
            vertex.position.x as f32,
            vertex.position.y as f32,
            vertex.position.z as f32,
        ];
        for axis in 0..3 {
            min[axis] = min[axis].min(p[axis]);
            max[axis] = max[axis].max(p[axis]);
        }
        for value in p {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
    let position_length = buffer.len() - position_offset;
    if mesh.vertices.is_empty() {
        min = [0.0; 3];
        max = [0.0; 3];
    }

    // Normals.
    let normal_offset = buffer.len();
    for vertex in &mesh.vertices {
        for value in [
            vertex.normal.x as f32,
            vertex.normal.y as f32,
            vertex.normal.z as f32,
        ] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
    let normal_length = buffer.len() - normal_offset;

    let mut buffer_views = vec![
        json!({
            "buffer": 0,
            "byteOffset": position_offset,
            "byteLength": position_length,
            "target": 34962
        }),
        json!({
            "buffer": 0,
            "byteOffset": normal_offset,
            "byteLength": normal_length,
            "target": 34962
        }),
    ];
    let mut accessors = vec![
        json!({
            "bufferView": 0,
            "byteOffset": 0,
            "componentType": 5126,
            "count": mesh.vertices.len(),
            "type": "VEC3",
            "min": [min[0], min[1], min[2]],
            "max": [max[0], max[1], max[2]]
        }),
        json!({
            "bufferView": 1,
            "byteOffset": 0,
            "componentType": 5126,
            "count": mesh.vertices.len(),
            "type": "VEC3"
        }),
    ];

    // One index range and one primitive per material class.
    let mut materials = Vec::new();
    let mut primitives = Vec::new();
    for range in &mesh.ranges {
        let indices_offset = buffer.len();
        for triangle in &mesh.triangles[range.start..range.start + range.count] {
            for &index in &triangle.indices {
                buffer.extend_from_slice(&(index as u32).to_le_bytes());
            }
        }
        let indices_length = buffer.len() - indices_offset;

        let view_index = buffer_views.len();
        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": indices_offset,
            "byteLength": indices_length,
            "target": 34963
        }));
        let accessor_index = accessors.len();
        accessors.push(json!({
            "bufferView": view_index,
            "byteOffset": 0,
            "componentType": 5125,
            "count": range.count * 3,
            "type": "SCALAR"
        }));

        let color = range.class.base_color();
        let material_index = materials.len();
        materials.push(json!({
            "name": range.class.name(),
            "pbrMetallicRoughness": {
                "baseColorFactor": [color[0], color[1], color[2], color[3]],
                "metallicFactor": 0.0,
                "roughnessFactor": 0.9
            }
        }));

        primitives.push(json!({
            "attributes": {"POSITION": 0, "NORMAL": 1},
            "indices": accessor_index,
            "material": material_index,
            "mode": 4
        }));
    }

    let gltf = json!({
        "asset": {
            "generator": concat!("cityfuse ", env!("CARGO_PKG_VERSION")),
            "version": "2.0"
        },
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"mesh": 0}],
        "meshes": [{"primitives": primitives}],
        "materials": materials,
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [{"byteLength": buffer.len()}]
    });

    (gltf, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{MaterialClass, MeshWriter};
    use nalgebra::Point3;

    fn sample_mesh() -> Mesh {
        let mut writer = MeshWriter::new(1e-3);
        let a = writer.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = writer.add_vertex(Point3::new(4.0, 0.0, 0.0));
        let c = writer.add_vertex(Point3::new(4.0, 3.0, 0.0));
        let d = writer.add_vertex(Point3::new(0.0, 3.0, 0.0));
        writer.add_triangle([a, b, c]);
        writer.add_triangle([a, c, d]);
        writer.close_range(MaterialClass::Roof, 0);
        writer.finish()
    }

    #[test]
    fn glb_has_magic_and_aligned_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.glb");
        export(&sample_mesh(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 2);
        let total = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        assert_eq!(total, bytes.len());
        let json_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        assert_eq!(json_len % 4, 0);
    }

    #[test]
    fn document_counts_match_mesh() {
        let mesh = sample_mesh();
        let (gltf, buffer) = build_document(&mesh);

        assert_eq!(gltf["accessors"][0]["count"], 4);
        assert_eq!(gltf["accessors"][2]["count"], 6);
        assert_eq!(gltf["meshes"][0]["primitives"].as_array().unwrap().len(), 1);
        assert_eq!(gltf["materials"][0]["name"], "roof");
        // 4 vertices * 24 bytes (pos + normal) + 6 indices * 4 bytes.
        assert_eq!(buffer.len(), 4 * 24 + 6 * 4);
        assert_eq!(gltf["buffers"][0]["byteLength"], buffer.len());
    }
}
