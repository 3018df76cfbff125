// mesh.rs — CPU 端网格与全景球生成

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Mesh ready to be uploaded. All primitives of a source file are merged into one.
#[derive(Debug, Clone, Default)]
pub struct CpuMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Base colour of the first material found, linear RGBA.
    pub base_color: [f32; 4],
}

impl CpuMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }
}

/// Inward-facing UV sphere for the equirectangular environment.
pub fn build_sphere(radius: f32, lat: usize, lon: usize) -> CpuMesh {
    let mut vertices = Vec::with_capacity((lat + 1) * (lon + 1));
    let mut indices = Vec::with_capacity(lat * lon * 6);

    for i in 0..=lat {
        let theta = std::f32::consts::PI * (i as f32) / (lat as f32);
        let y = theta.cos();
        let sin_t = theta.sin();

        for j in 0..=lon {
            let phi = 2.0 * std::f32::consts::PI * (j as f32) / (lon as f32);

            let x = phi.cos() * sin_t;
            let z = phi.sin() * sin_t;

            // 从球内看，u 需要翻转才不会镜像
            let u = 1.0 - (j as f32) / (lon as f32);
            let v = (i as f32) / (lat as f32);

            vertices.push(Vertex {
                position: [x * radius, y * radius, z * radius],
                // 法线朝内
                normal: [-x, -y, -z],
                uv: [u, v],
            });
        }
    }

    for i in 0..lat {
        for j in 0..lon {
            let a = (i * (lon + 1) + j) as u32;
            let b = a + (lon + 1) as u32;

            // 从球内看为逆时针
            indices.extend_from_slice(&[
                a, b, a + 1,
                b, b + 1, a + 1,
            ]);
        }
    }

    CpuMesh {
        vertices,
        indices,
        base_color: [1.0, 1.0, 1.0, 1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn sphere_counts_and_radius() {
        let m = build_sphere(500.0, 8, 16);
        assert_eq!(m.vertices.len(), 9 * 17);
        assert_eq!(m.indices.len(), 8 * 16 * 6);
        for v in &m.vertices {
            let r = Vec3::from(v.position).length();
            assert!((r - 500.0).abs() < 1e-2);
        }
        assert!(m.indices.iter().all(|&i| (i as usize) < m.vertices.len()));
    }

    #[test]
    fn triangles_face_the_centre() {
        let m = build_sphere(10.0, 12, 24);
        // 取赤道附近的三角形，法线应指向原点
        let row = 6 * 24 * 6;
        let tri = &m.indices[row..row + 3];
        let p: Vec<Vec3> = tri
            .iter()
            .map(|&i| Vec3::from(m.vertices[i as usize].position))
            .collect();
        let n = (p[1] - p[0]).cross(p[2] - p[0]);
        let centroid = (p[0] + p[1] + p[2]) / 3.0;
        assert!(n.dot(-centroid) > 0.0);
    }
}
