// camera.rs — 固定在原点的相机（只有旋转会变化）

use glam::{Mat3, Mat4, Quat, Vec3};

pub const DEFAULT_FOV_DEG: f32 = 75.0;

/// Viewpoint fixed at the world origin. Only `rotation` changes per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub rotation: Quat,
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

impl CameraRig {
    pub fn new(aspect: f32) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            fov_deg: DEFAULT_FOV_DEG,
            aspect,
            near: 0.05,
            far: 1100.0,
        }
    }

    /// Look direction in world space (camera looks down its local -Z).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Angle between the look direction and world up: 0 = straight up, π = straight down.
    pub fn polar_angle(&self) -> f32 {
        self.forward().y.clamp(-1.0, 1.0).acos()
    }

    /// Orient the camera so it looks along `dir` from the origin with world +Y as up.
    pub fn look_along(&mut self, dir: Vec3) {
        let dir = dir.normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        // 接近竖直时 right 退化，用 +X 兜底
        let right = {
            let r = dir.cross(Vec3::Y);
            if r.length_squared() < 1e-8 {
                Vec3::X
            } else {
                r.normalize()
            }
        };
        let up = right.cross(dir);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -dir)).normalize();
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Camera-to-world transform; camera-attached nodes use this as their parent.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation.conjugate())
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn default_rig_looks_down_negative_z_and_is_horizontal() {
        let rig = CameraRig::default();
        assert!((rig.forward() - Vec3::NEG_Z).length() < 1e-6);
        assert!((rig.polar_angle() - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn look_along_points_forward_at_target() {
        let mut rig = CameraRig::default();
        let dir = Vec3::new(1.0, 0.5, -0.25).normalize();
        rig.look_along(dir);
        assert!((rig.forward() - dir).length() < 1e-5);
        // 不允许产生滚转：right 轴保持水平
        let right = rig.rotation * Vec3::X;
        assert!(right.y.abs() < 1e-5);
    }

    #[test]
    fn look_along_ignores_zero_vector() {
        let mut rig = CameraRig::default();
        rig.look_along(Vec3::X);
        let before = rig.rotation;
        rig.look_along(Vec3::ZERO);
        assert_eq!(rig.rotation, before);
    }

    #[test]
    fn polar_angle_straight_down_is_pi() {
        let mut rig = CameraRig::default();
        rig.look_along(Vec3::new(0.0001, -1.0, 0.0));
        assert!((rig.polar_angle() - std::f32::consts::PI).abs() < 1e-3);
    }

    #[test]
    fn resize_ignores_zero_dimensions() {
        let mut rig = CameraRig::new(2.0);
        rig.set_aspect(0, 100);
        assert_eq!(rig.aspect, 2.0);
        rig.set_aspect(800, 400);
        assert_eq!(rig.aspect, 2.0);
        rig.set_aspect(400, 400);
        assert_eq!(rig.aspect, 1.0);
    }
}
