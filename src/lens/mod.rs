//! Simulated pair of corrective lenses attached to the camera.
//!
//! Four groups (primary / alternate × left / right) sit in front of the eyes.
//! Every tick [`LensEngine::update`] receives the camera polar angle:
//! - the right lenses regenerate a horizontal gradient whose dark band slides
//!   with the angle, a moving clear/blur zone;
//! - the left lenses cross-fade between a "normal" and an "inverted" map around
//!   the horizon, a bifocal boundary.
//!
//! [`LensEngine::swap_left`] / [`LensEngine::swap_right`] slide the alternate
//! lens into the visible slot; [`LensEngine::animate_swap`] eases it there.

pub mod assembly;
pub mod gradient;

pub use assembly::{Eye, LensAssembly, LensPair, Variant, SWAP_DISTANCE};
pub use gradient::{GradientProfile, GRADIENT_SIZE};

use crate::scene::{DrawItem, Material, MeshId, Node, TextureId, Transform};
use glam::{Mat4, Vec3};
use serde::Deserialize;
use std::f32::consts::FRAC_PI_2;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Width of the left-lens cross-fade band, radians.
pub const CROSSFADE_BAND: f32 = std::f32::consts::PI / 180.0;

const LENS_TINT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const RIGHT_LENS_OPACITY: f32 = 0.55;
const FRAME_COLOR: [f32; 4] = [0.08, 0.08, 0.09, 1.0];
const MASK_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const MASK_OPACITY: f32 = 0.35;

const NODE_LENS_NORMAL: &str = "lens_normal";
const NODE_LENS_INVERTED: &str = "lens_inverted";

/// Where the lens groups sit in camera space.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LensLayout {
    /// Horizontal distance of each eye from the view axis.
    pub eye_offset_x: f32,
    /// Distance in front of the camera.
    pub distance: f32,
    pub scale: f32,
}

impl Default for LensLayout {
    fn default() -> Self {
        Self {
            eye_offset_x: 0.16,
            distance: 0.5,
            scale: 1.0,
        }
    }
}

/// GPU handles for the lens assets, available once they have all loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensKit {
    pub left: MeshId,
    pub left_alternate: MeshId,
    pub right: MeshId,
    pub right_alternate: MeshId,
    pub frame: MeshId,
    pub mask: MeshId,
    pub left_normal_map: TextureId,
    pub left_inverted_map: TextureId,
    /// One dynamic texture per right-eye variant, `GRADIENT_SIZE` × 1.
    pub right_gradients: [TextureId; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LensCommand {
    SwapLeft,
    SwapRight,
}

/// Handed to the UI layer once the glasses are ready.
#[derive(Debug, Clone)]
pub struct LensControls {
    tx: Sender<LensCommand>,
}

impl LensControls {
    pub fn swap_left(&self) {
        let _ = self.tx.send(LensCommand::SwapLeft);
    }

    pub fn swap_right(&self) {
        let _ = self.tx.send(LensCommand::SwapRight);
    }
}

#[derive(Debug, Clone)]
struct GradientSlot {
    profile: GradientProfile,
    texture: TextureId,
    offset: f32,
    pixels: Vec<u8>,
}

#[derive(Debug)]
struct Assemblies {
    kit: LensKit,
    left: LensPair,
    right: LensPair,
    gradients: [GradientSlot; 2],
    crossfade: f32,
}

#[derive(Debug)]
pub struct LensEngine {
    layout: LensLayout,
    attached: Option<Assemblies>,
    tx: Sender<LensCommand>,
    rx: Receiver<LensCommand>,
}

impl LensEngine {
    pub fn new(layout: LensLayout) -> Self {
        let (tx, rx) = channel();
        Self {
            layout,
            attached: None,
            tx,
            rx,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.attached.is_some()
    }

    /// Build the four groups from loaded assets and attach them to the camera.
    pub fn install(&mut self, kit: LensKit) -> LensControls {
        let left = LensPair::new(
            Eye::Left,
            self.left_group("left_primary", kit.left, &kit),
            self.left_group("left_alternate", kit.left_alternate, &kit),
        );
        let right = LensPair::new(
            Eye::Right,
            self.right_group("right_primary", kit.right, kit.right_gradients[0], &kit),
            self.right_group(
                "right_alternate",
                kit.right_alternate,
                kit.right_gradients[1],
                &kit,
            ),
        );
        let slot = |profile: GradientProfile, texture| GradientSlot {
            pixels: profile.render(0.0),
            profile,
            texture,
            offset: 0.0,
        };
        let gradients = [
            slot(GradientProfile::primary(GRADIENT_SIZE), kit.right_gradients[0]),
            slot(GradientProfile::alternate(GRADIENT_SIZE), kit.right_gradients[1]),
        ];
        self.attached = Some(Assemblies {
            kit,
            left,
            right,
            gradients,
            crossfade: 0.0,
        });
        log::info!("glasses attached to camera");
        self.controls()
    }

    pub fn controls(&self) -> LensControls {
        LensControls {
            tx: self.tx.clone(),
        }
    }

    fn eye_anchor(&self, eye: Eye) -> Transform {
        let sign = match eye {
            Eye::Left => -1.0,
            Eye::Right => 1.0,
        };
        Transform {
            translation: Vec3::new(
                sign * self.layout.eye_offset_x,
                0.0,
                -self.layout.distance,
            ),
            scale: Vec3::splat(self.layout.scale),
            ..Default::default()
        }
    }

    fn left_group(&self, name: &str, lens: MeshId, kit: &LensKit) -> Node {
        Node::group(name, self.eye_anchor(Eye::Left))
            .with_child(Node::mesh(
                NODE_LENS_NORMAL,
                lens,
                Material::translucent(LENS_TINT, 1.0).with_texture(kit.left_normal_map),
            ))
            .with_child(Node::mesh(
                NODE_LENS_INVERTED,
                lens,
                Material::translucent(LENS_TINT, 0.0).with_texture(kit.left_inverted_map),
            ))
            .with_child(Node::mesh("frame", kit.frame, Material::opaque(FRAME_COLOR)))
            .with_child(Node::mesh(
                "mask",
                kit.mask,
                Material::translucent(MASK_COLOR, MASK_OPACITY),
            ))
    }

    fn right_group(&self, name: &str, lens: MeshId, gradient: TextureId, kit: &LensKit) -> Node {
        Node::group(name, self.eye_anchor(Eye::Right))
            .with_child(Node::mesh(
                "lens",
                lens,
                Material::translucent(LENS_TINT, RIGHT_LENS_OPACITY).with_texture(gradient),
            ))
            .with_child(Node::mesh("frame", kit.frame, Material::opaque(FRAME_COLOR)))
            .with_child(Node::mesh(
                "mask",
                kit.mask,
                Material::translucent(MASK_COLOR, MASK_OPACITY),
            ))
    }

    /// Per-tick angle update. No-op until [`install`](Self::install).
    pub fn update(&mut self, polar: f32, min_polar: f32, max_polar: f32) {
        let Some(a) = self.attached.as_mut() else {
            return;
        };

        for slot in &mut a.gradients {
            slot.offset = slot.profile.offset_for(polar, min_polar, max_polar);
            slot.profile.render_into(slot.offset, &mut slot.pixels);
        }

        let e = crossfade_weight(polar);
        a.crossfade = e;
        for group in a.left.groups_mut() {
            set_opacity(&mut group.group, NODE_LENS_NORMAL, 1.0 - e);
            set_opacity(&mut group.group, NODE_LENS_INVERTED, e);
        }
    }

    pub fn swap_left(&mut self) {
        if let Some(a) = self.attached.as_mut() {
            a.left.toggle();
            log::debug!("swap left, swapped = {}", a.left.is_swapped());
        }
    }

    pub fn swap_right(&mut self) {
        if let Some(a) = self.attached.as_mut() {
            a.right.toggle();
            log::debug!("swap right, swapped = {}", a.right.is_swapped());
        }
    }

    /// Apply swap requests queued through [`LensControls`].
    pub fn apply_commands(&mut self) {
        while let Ok(cmd) = self.rx.try_recv() {
            match cmd {
                LensCommand::SwapLeft => self.swap_left(),
                LensCommand::SwapRight => self.swap_right(),
            }
        }
    }

    /// Advance in-flight swap animations. Returns `true` while any group moves.
    pub fn animate_swap(&mut self) -> bool {
        let Some(a) = self.attached.as_mut() else {
            return false;
        };
        let l = a.left.step();
        let r = a.right.step();
        l || r
    }

    /// Latest gradient rows as `(texture, width, rgba)`.
    pub fn gradient_uploads(&self) -> impl Iterator<Item = (TextureId, u32, &[u8])> + '_ {
        self.attached.iter().flat_map(|a| {
            a.gradients
                .iter()
                .map(|s| (s.texture, s.profile.size, s.pixels.as_slice()))
        })
    }

    pub fn gradient_offsets(&self) -> Option<[f32; 2]> {
        self.attached
            .as_ref()
            .map(|a| [a.gradients[0].offset, a.gradients[1].offset])
    }

    /// `(normal, inverted)` opacity of the left lenses.
    pub fn left_opacities(&self) -> Option<(f32, f32)> {
        self.attached.as_ref().map(|a| (1.0 - a.crossfade, a.crossfade))
    }

    pub fn pair(&self, eye: Eye) -> Option<&LensPair> {
        self.attached.as_ref().map(|a| match eye {
            Eye::Left => &a.left,
            Eye::Right => &a.right,
        })
    }

    /// Flatten all four groups under the camera transform.
    pub fn collect(&self, camera_world: Mat4, out: &mut Vec<DrawItem>) {
        let Some(a) = self.attached.as_ref() else {
            return;
        };
        for pair in [&a.left, &a.right] {
            for assembly in pair.groups() {
                assembly.group.collect(camera_world, out);
            }
        }
    }

    /// Detach every group and hand back the textures the caller should release.
    pub fn dispose(&mut self) -> Vec<TextureId> {
        let Some(a) = self.attached.take() else {
            return Vec::new();
        };
        log::info!("glasses detached");
        vec![
            a.kit.left_normal_map,
            a.kit.left_inverted_map,
            a.gradients[0].texture,
            a.gradients[1].texture,
        ]
    }
}

fn set_opacity(group: &mut Node, name: &str, opacity: f32) {
    if let Some((_, material)) = group.find_mut(name).and_then(|n| n.mesh.as_mut()) {
        material.opacity = opacity;
    }
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Left-lens cross-fade weight for a polar angle: 0 below the horizon band, 1 above it.
pub fn crossfade_weight(polar: f32) -> f32 {
    if polar.is_nan() {
        return 0.0;
    }
    let delta = FRAC_PI_2 - polar;
    let t = smoothstep(0.0, CROSSFADE_BAND, delta);
    1.0 - (1.0 - t).powi(3)
}
