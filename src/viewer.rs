// viewer.rs — 每次场景挂载的显式状态记录；事件处理写入，调度器读取

use crate::camera::CameraRig;
use crate::lens::{LensControls, LensEngine, LensKit, LensLayout};
use crate::orientation::{OrientationState, SensorGate};
use crate::readiness::{AssetKind, SceneReadiness};
use crate::scene::{Material, MeshId, Node, TextureId, Transform};

/// Radius of the environment sphere; models are expected well inside it.
pub const ENVIRONMENT_RADIUS: f32 = 500.0;

const NODE_ENVIRONMENT: &str = "environment";
const NODE_MODELS: &str = "models";

/// Outbound notifications for the UI layer.
#[derive(Debug, Clone)]
pub enum ViewerEvent {
    /// Environment and every model have loaded.
    Ready,
    /// Lens swap controls are available.
    GlassesReady(LensControls),
}

/// GPU resources that belonged to a replaced world.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Released {
    pub meshes: Vec<MeshId>,
    pub textures: Vec<TextureId>,
}

pub struct ViewState {
    pub orientation: OrientationState,
    pub camera: CameraRig,
    pub lenses: LensEngine,
    pub readiness: SceneReadiness,
    /// Root of the world graph: environment sphere + placed models.
    pub world: Node,
}

impl ViewState {
    pub fn new(gate: SensorGate, layout: LensLayout, aspect: f32) -> Self {
        Self {
            orientation: OrientationState::new(gate),
            camera: CameraRig::new(aspect),
            lenses: LensEngine::new(layout),
            readiness: SceneReadiness::new(0),
            world: empty_world(),
        }
    }

    /// Replace the scene configuration: readiness, models and orientation start over.
    /// The lenses stay attached. Returns what the old world held on the GPU; the
    /// environment sphere mesh is shared and never part of it.
    pub fn mount_scene(&mut self, model_count: usize) -> Released {
        let released = self.world_resources();
        self.readiness.reset(model_count);
        self.world = empty_world();
        self.orientation = self.orientation.remount();
        self.camera.rotation = glam::Quat::IDENTITY;
        released
    }

    fn world_resources(&self) -> Released {
        let mut items = Vec::new();
        if let Some(models) = self.world.find(NODE_MODELS) {
            models.collect(glam::Mat4::IDENTITY, &mut items);
        }
        Released {
            meshes: items.iter().map(|i| i.mesh).collect(),
            textures: self.environment_texture().into_iter().collect(),
        }
    }

    pub fn set_environment(&mut self, sphere: MeshId, texture: TextureId) -> Option<ViewerEvent> {
        if let Some(env) = self.world.find_mut(NODE_ENVIRONMENT) {
            env.mesh = Some((sphere, Material::opaque([1.0; 4]).with_texture(texture)));
        }
        self.record(AssetKind::Environment)
    }

    pub fn environment_texture(&self) -> Option<TextureId> {
        self.world
            .find(NODE_ENVIRONMENT)
            .and_then(|n| n.mesh)
            .and_then(|(_, m)| m.texture)
    }

    pub fn place_model(
        &mut self,
        index: usize,
        mesh: MeshId,
        base_color: [f32; 4],
        transform: Transform,
    ) -> Option<ViewerEvent> {
        if let Some(models) = self.world.find_mut(NODE_MODELS) {
            let node = Node {
                transform,
                ..Node::mesh(format!("model_{index}"), mesh, Material::opaque(base_color).lit())
            };
            models.children.push(node);
        }
        self.record(AssetKind::Model)
    }

    fn record(&mut self, kind: AssetKind) -> Option<ViewerEvent> {
        if self.readiness.record_loaded(kind) {
            log::info!("scene ready ({} assets)", self.readiness.loaded_assets());
            Some(ViewerEvent::Ready)
        } else {
            None
        }
    }

    pub fn install_lenses(&mut self, kit: LensKit) -> ViewerEvent {
        ViewerEvent::GlassesReady(self.lenses.install(kit))
    }

    /// Tear down everything tied to the camera; returns textures to release.
    pub fn unmount(&mut self) -> Vec<TextureId> {
        let mut released = self.lenses.dispose();
        released.extend(self.environment_texture());
        self.world = empty_world();
        released
    }
}

fn empty_world() -> Node {
    Node::group("world", Transform::default())
        .with_child(Node::group(NODE_ENVIRONMENT, Transform::default()))
        .with_child(Node::group(NODE_MODELS, Transform::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::{OrientationMode, SensorReading};
    use glam::{Mat4, Vec3};

    fn state() -> ViewState {
        ViewState::new(SensorGate::NotRequired, LensLayout::default(), 1.5)
    }

    #[test]
    fn ready_event_fires_once_when_scene_completes() {
        let mut s = state();
        s.mount_scene(1);
        assert!(s
            .place_model(0, MeshId(1), [1.0; 4], Transform::default())
            .is_none());
        let ev = s.set_environment(MeshId(0), TextureId(5));
        assert!(matches!(ev, Some(ViewerEvent::Ready)));
        assert_eq!(s.environment_texture(), Some(TextureId(5)));

        let mut items = Vec::new();
        s.world.collect(Mat4::IDENTITY, &mut items);
        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| i.material.lit));
    }

    #[test]
    fn mount_resets_world_and_orientation() {
        let mut s = state();
        s.orientation.on_sensor_reading(SensorReading::new(30.0, 90.0, 0.0));
        assert_eq!(s.orientation.mode(), OrientationMode::Sensor);
        s.mount_scene(0);
        s.set_environment(MeshId(0), TextureId(1));
        assert!(s.readiness.is_ready());

        s.mount_scene(2);
        assert!(!s.readiness.is_ready());
        assert_eq!(s.environment_texture(), None);
        assert_eq!(s.orientation.mode(), OrientationMode::Drag);
    }

    #[test]
    fn placed_models_keep_their_transform() {
        let mut s = state();
        s.mount_scene(1);
        s.place_model(
            0,
            MeshId(3),
            [0.5; 4],
            Transform::from_translation(Vec3::new(0.0, 0.0, -4.0)),
        );
        let mut items = Vec::new();
        s.world.collect(Mat4::IDENTITY, &mut items);
        assert_eq!(items[0].world.transform_point3(Vec3::ZERO), Vec3::new(0.0, 0.0, -4.0));
    }

    #[test]
    fn remount_hands_back_old_models_and_environment() {
        let mut s = state();
        s.mount_scene(2);
        s.set_environment(MeshId(0), TextureId(7));
        s.place_model(0, MeshId(4), [1.0; 4], Transform::default());
        s.place_model(1, MeshId(5), [1.0; 4], Transform::default());

        let released = s.mount_scene(0);
        assert_eq!(released.meshes, vec![MeshId(4), MeshId(5)]);
        assert_eq!(released.textures, vec![TextureId(7)]);
        assert_eq!(s.mount_scene(0), Released::default());
    }
}
