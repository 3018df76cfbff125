// assets.rs — 资源解码：glTF 网格、贴图；统一错误类型

use crate::mesh::{CpuMesh, Vertex};
use glam::{Mat3, Mat4, Vec3};
use gltf::mesh::util::ReadIndices;
use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to import glTF {}: {source}", .path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("no geometry found in {}", .0.display())]
    EmptyMesh(PathBuf),
    #[error("invalid scene configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Decode any raster the `image` crate understands, without size limits.
pub fn decode_image(path: &Path) -> Result<image::DynamicImage, AssetError> {
    let file = File::open(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    ImageReader::new(reader)
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|mut r| {
            r.no_limits();
            r.decode()
        })
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_texture(path: &Path) -> Result<RgbaImage, AssetError> {
    let img = decode_image(path)?;
    let (w, h) = img.dimensions();
    log::debug!("texture {} {}x{}", path.display(), w, h);
    Ok(img.to_rgba8())
}

/// Load a glTF/GLB file and merge every primitive of the default scene into one mesh,
/// with node transforms baked in.
pub fn load_gltf_mesh(path: &Path) -> Result<CpuMesh, AssetError> {
    let (doc, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let mut mesh = CpuMesh {
        base_color: [1.0; 4],
        ..Default::default()
    };
    let mut color_found = false;

    let mut stack: Vec<(gltf::Node, Mat4)> = match doc.default_scene().or_else(|| doc.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| (n, Mat4::IDENTITY)).collect(),
        None => Vec::new(),
    };

    while let Some((node, parent)) = stack.pop() {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(m) = node.mesh() {
            for prim in m.primitives() {
                if !color_found {
                    mesh.base_color = prim.material().pbr_metallic_roughness().base_color_factor();
                    color_found = true;
                }
                append_primitive(&prim, &buffers, world, &mut mesh);
            }
        }
        for child in node.children() {
            stack.push((child, world));
        }
    }

    // 没有场景定义时直接取所有网格
    if mesh.is_empty() {
        for m in doc.meshes() {
            for prim in m.primitives() {
                append_primitive(&prim, &buffers, Mat4::IDENTITY, &mut mesh);
            }
        }
    }

    if mesh.is_empty() {
        return Err(AssetError::EmptyMesh(path.to_path_buf()));
    }
    log::debug!(
        "mesh {}: {} vertices, {} indices",
        path.display(),
        mesh.vertices.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

fn append_primitive(
    prim: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    world: Mat4,
    out: &mut CpuMesh,
) {
    let reader = prim.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
    let Some(positions) = reader.read_positions() else {
        return;
    };
    let positions: Vec<[f32; 3]> = positions.collect();
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(it) => it.collect(),
        None => vec![[0.0, 0.0, 1.0]; positions.len()],
    };
    let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
        Some(it) => it.into_f32().collect(),
        None => vec![[0.0, 0.0]; positions.len()],
    };

    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let base = out.vertices.len() as u32;
    for i in 0..positions.len() {
        let p = world.transform_point3(Vec3::from(positions[i]));
        let n = (normal_matrix * Vec3::from(normals[i])).normalize_or_zero();
        out.vertices.push(Vertex {
            position: p.to_array(),
            normal: n.to_array(),
            uv: uvs[i],
        });
    }

    match reader.read_indices() {
        Some(ReadIndices::U8(it)) => out.indices.extend(it.map(|v| base + v as u32)),
        Some(ReadIndices::U16(it)) => out.indices.extend(it.map(|v| base + v as u32)),
        Some(ReadIndices::U32(it)) => out.indices.extend(it.map(|v| base + v)),
        None => out.indices.extend(base..base + positions.len() as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_report_their_path() {
        let err = load_texture(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.png"));

        let err = load_gltf_mesh(Path::new("/definitely/not/here.glb")).unwrap_err();
        assert!(matches!(err, AssetError::Gltf { .. }));
    }

    #[test]
    fn decodes_a_png_written_to_disk() {
        let dir = std::env::temp_dir().join("lens_panorama_assets_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("checker.png");
        let img = RgbaImage::from_fn(4, 2, |x, _| {
            if x % 2 == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        img.save(&path).unwrap();

        let loaded = load_texture(&path).unwrap();
        assert_eq!(loaded.dimensions(), (4, 2));
        assert_eq!(loaded.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }
}
