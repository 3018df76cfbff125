// scene.rs — 场景组合：通用变换节点（父节点拥有子节点）+ 外部提供的场景配置

use crate::assets::AssetError;
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    Translucent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: [f32; 4],
    pub opacity: f32,
    pub texture: Option<TextureId>,
    pub blend: BlendMode,
    /// Shade with the fixed key light; unlit materials show their colour as is.
    pub lit: bool,
}

impl Material {
    pub fn opaque(color: [f32; 4]) -> Self {
        Self {
            color,
            opacity: 1.0,
            texture: None,
            blend: BlendMode::Opaque,
            lit: false,
        }
    }

    pub fn translucent(color: [f32; 4], opacity: f32) -> Self {
        Self {
            color,
            opacity,
            texture: None,
            blend: BlendMode::Translucent,
            lit: false,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn lit(mut self) -> Self {
        self.lit = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Something the renderer can draw: resolved mesh + material + world matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub mesh: MeshId,
    pub material: Material,
    pub world: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub mesh: Option<(MeshId, Material)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn group(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            visible: true,
            mesh: None,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshId, material: Material) -> Self {
        Self {
            mesh: Some((mesh, material)),
            ..Self::group(name, Transform::default())
        }
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search by name, including `self`.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Flatten visible meshes into `out`, parents first.
    pub fn collect(&self, parent: Mat4, out: &mut Vec<DrawItem>) {
        if !self.visible {
            return;
        }
        let world = parent * self.transform.matrix();
        if let Some((mesh, material)) = self.mesh {
            out.push(DrawItem {
                mesh,
                material,
                world,
            });
        }
        for child in &self.children {
            child.collect(world, out);
        }
    }
}

// ── 外部场景配置 ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ModelScale {
    Uniform(f32),
    PerAxis([f32; 3]),
}

impl ModelScale {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            ModelScale::Uniform(s) => Vec3::splat(s),
            ModelScale::PerAxis(v) => Vec3::from(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelPlacement {
    pub path: PathBuf,
    pub position: [f32; 3],
    /// Euler XYZ, radians.
    #[serde(default)]
    pub rotation: Option<[f32; 3]>,
    #[serde(default)]
    pub scale: Option<ModelScale>,
}

impl ModelPlacement {
    pub fn transform(&self) -> Transform {
        let rotation = self
            .rotation
            .map(|[x, y, z]| Quat::from_euler(EulerRot::XYZ, x, y, z))
            .unwrap_or(Quat::IDENTITY);
        Transform {
            translation: Vec3::from(self.position),
            rotation,
            scale: self.scale.map(ModelScale::to_vec3).unwrap_or(Vec3::ONE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SceneConfig {
    pub image: PathBuf,
    #[serde(default)]
    pub models: Vec<ModelPlacement>,
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a scene file; relative asset paths resolve against the file's directory.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// A `.json` file is a scene description; anything else is taken as a bare
    /// environment image with no models.
    pub fn open(path: &Path) -> Result<Self, AssetError> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::load(path)
        } else {
            Ok(Self {
                image: path.to_path_buf(),
                models: Vec::new(),
            })
        }
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        if self.image.is_relative() {
            self.image = base.join(&self.image);
        }
        for m in &mut self.models {
            if m.path.is_relative() {
                m.path = base.join(&m.path);
            }
        }
    }
}
