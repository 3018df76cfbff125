// orientation.rs — 拖拽 / 设备方向传感器 两种视角来源的统一与仲裁

use crate::camera::CameraRig;
use glam::{EulerRot, Quat, Vec3};
use serde::Deserialize;
use std::f32::consts::FRAC_PI_2;

/// Degrees of view rotation per pixel of drag.
pub const DRAG_SENSITIVITY: f32 = 0.1;
/// Applied latitude never leaves `[-LATITUDE_LIMIT, LATITUDE_LIMIT]`.
pub const LATITUDE_LIMIT: f32 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationMode {
    Drag,
    Sensor,
}

/// Result of the one-shot capability probe done by the host at mount time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorGate {
    /// Readings may arrive at any time; the first valid one switches to sensor mode.
    NotRequired,
    /// The platform wants an explicit user gesture before it exposes readings.
    PermissionRequired,
    /// No orientation source on this host.
    Unsupported,
}

impl SensorGate {
    pub fn detect(has_source: bool, needs_gesture: bool) -> Self {
        match (has_source, needs_gesture) {
            (false, _) => SensorGate::Unsupported,
            (true, true) => SensorGate::PermissionRequired,
            (true, false) => SensorGate::NotRequired,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorActivation {
    AwaitingPermission,
    /// Waiting for the first valid reading.
    Probing,
    Active,
    Denied,
    Unavailable,
}

/// One device-orientation event, degrees. `None` mirrors a null field from the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SensorReading {
    pub alpha: Option<f32>,
    pub beta: Option<f32>,
    pub gamma: Option<f32>,
}

impl SensorReading {
    pub fn new(alpha: f32, beta: f32, gamma: f32) -> Self {
        Self {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }

    fn complete(&self) -> Option<(f32, f32, f32)> {
        Some((self.alpha?, self.beta?, self.gamma?))
    }
}

#[derive(Debug, Clone, Copy)]
struct DragOrigin {
    x: f32,
    y: f32,
    longitude: f32,
    latitude: f32,
}

/// Per-mount orientation record. Input handlers write into it between ticks;
/// [`OrientationState::apply`] is the only place that touches the camera.
#[derive(Debug, Clone)]
pub struct OrientationState {
    mode: OrientationMode,
    pub longitude: f32,
    pub latitude: f32,
    drag: Option<DragOrigin>,
    activation: SensorActivation,
    alpha_offset: Option<f32>,
    screen_angle: f32,
    // 已加上 alpha_offset 的最近一次有效读数
    last_reading: Option<(f32, f32, f32)>,
}

impl OrientationState {
    pub fn new(gate: SensorGate) -> Self {
        let activation = match gate {
            SensorGate::NotRequired => SensorActivation::Probing,
            SensorGate::PermissionRequired => SensorActivation::AwaitingPermission,
            SensorGate::Unsupported => SensorActivation::Unavailable,
        };
        Self {
            mode: OrientationMode::Drag,
            longitude: 0.0,
            latitude: 0.0,
            drag: None,
            activation,
            alpha_offset: None,
            screen_angle: 0.0,
            last_reading: None,
        }
    }

    /// State for the next scene mount. The permission outcome survives; the
    /// heading offset and drag angles do not.
    pub fn remount(&self) -> Self {
        let gate = match self.activation {
            SensorActivation::Probing | SensorActivation::Active => SensorGate::NotRequired,
            SensorActivation::AwaitingPermission => SensorGate::PermissionRequired,
            SensorActivation::Unavailable => SensorGate::Unsupported,
            SensorActivation::Denied => {
                let mut s = Self::new(SensorGate::Unsupported);
                s.activation = SensorActivation::Denied;
                return s;
            }
        };
        let mut s = Self::new(gate);
        s.screen_angle = self.screen_angle;
        s
    }

    pub fn mode(&self) -> OrientationMode {
        self.mode
    }

    pub fn activation(&self) -> SensorActivation {
        self.activation
    }

    pub fn alpha_offset(&self) -> Option<f32> {
        self.alpha_offset
    }

    /// Whether the host should offer an explicit "enable motion" action.
    pub fn needs_permission_prompt(&self) -> bool {
        self.activation == SensorActivation::AwaitingPermission
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // ── Drag ────────────────────────────────────────────────────────

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.drag = Some(DragOrigin {
            x,
            y,
            longitude: self.longitude,
            latitude: self.latitude,
        });
    }

    /// Recorded in both modes so a later mode change starts from the latest drag.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if let Some(origin) = self.drag {
            self.longitude = (origin.x - x) * DRAG_SENSITIVITY + origin.longitude;
            self.latitude = (y - origin.y) * DRAG_SENSITIVITY + origin.latitude;
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    // ── Sensor ──────────────────────────────────────────────────────

    pub fn set_screen_angle(&mut self, degrees: f32) {
        self.screen_angle = degrees;
    }

    /// Outcome of the user-gesture permission request. Only meaningful while awaiting it.
    pub fn grant_sensor_permission(&mut self, outcome: PermissionOutcome) -> SensorActivation {
        if self.activation == SensorActivation::AwaitingPermission {
            self.activation = match outcome {
                PermissionOutcome::Granted => SensorActivation::Probing,
                PermissionOutcome::Denied => {
                    log::info!("motion sensor permission denied, staying on drag");
                    SensorActivation::Denied
                }
            };
        }
        self.activation
    }

    /// Returns `true` when the reading was accepted.
    pub fn on_sensor_reading(&mut self, reading: SensorReading) -> bool {
        let Some((alpha, beta, gamma)) = reading.complete() else {
            return false;
        };
        match self.activation {
            SensorActivation::Probing => {
                // 首个有效读数：当前朝向即场景正前方
                self.alpha_offset = Some(-alpha);
                self.activation = SensorActivation::Active;
                self.mode = OrientationMode::Sensor;
                log::info!("motion sensor active, heading offset {:.1}°", -alpha);
            }
            SensorActivation::Active => {}
            _ => return false,
        }
        let offset = self.alpha_offset.unwrap_or(0.0);
        self.last_reading = Some((alpha + offset, beta, gamma));
        true
    }

    // ── Per tick ────────────────────────────────────────────────────

    /// Writes the authoritative rotation into the camera. Drag latitude is clamped here.
    pub fn apply(&mut self, rig: &mut CameraRig) {
        match self.mode {
            OrientationMode::Drag => {
                self.latitude = clamp_latitude(self.latitude);
                rig.look_along(drag_forward(self.longitude, self.latitude));
            }
            OrientationMode::Sensor => {
                if let Some((alpha, beta, gamma)) = self.last_reading {
                    rig.rotation = sensor_rotation(alpha, beta, gamma, self.screen_angle);
                }
            }
        }
    }
}

pub fn clamp_latitude(latitude: f32) -> f32 {
    if latitude.is_nan() {
        return 0.0;
    }
    latitude.clamp(-LATITUDE_LIMIT, LATITUDE_LIMIT)
}

/// Forward vector for a longitude/latitude pair in degrees.
pub fn drag_forward(longitude: f32, latitude: f32) -> Vec3 {
    let phi = (90.0 - latitude).to_radians();
    let theta = longitude.to_radians();
    Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
}

/// Device orientation (degrees) to camera rotation.
///
/// Euler YXZ from (alpha, beta, -gamma), then a -90° turn about X so the camera
/// looks out of the back of the device instead of its top edge, then undo the
/// screen rotation about the view axis.
pub fn sensor_rotation(alpha: f32, beta: f32, gamma: f32, screen_angle: f32) -> Quat {
    let device = Quat::from_euler(
        EulerRot::YXZ,
        alpha.to_radians(),
        beta.to_radians(),
        -gamma.to_radians(),
    );
    let back_face = Quat::from_rotation_x(-FRAC_PI_2);
    let screen = Quat::from_rotation_z(-screen_angle.to_radians());
    (device * back_face * screen).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quat_close(a: Quat, b: Quat) -> bool {
        // q 与 -q 表示同一旋转
        a.dot(b).abs() > 1.0 - 1e-6
    }

    #[test]
    fn latitude_clamp_stays_in_range() {
        for lat in [-1.0e9, -720.0, -85.0001, -12.0, 0.0, 84.9, 85.0, 300.0, f32::INFINITY] {
            let c = clamp_latitude(lat);
            assert!((-LATITUDE_LIMIT..=LATITUDE_LIMIT).contains(&c), "{lat} -> {c}");
        }
        assert_eq!(clamp_latitude(f32::NAN), 0.0);
    }

    #[test]
    fn drag_of_100px_moves_longitude_by_10_degrees() {
        let mut state = OrientationState::new(SensorGate::Unsupported);
        state.longitude = 30.0;
        state.pointer_down(200.0, 100.0);
        state.pointer_move(100.0, 100.0);
        assert!((state.longitude - 40.0).abs() < 1e-5);
        assert_eq!(state.latitude, 0.0);

        state.pointer_move(300.0, 100.0);
        assert!((state.longitude - 20.0).abs() < 1e-5);
    }

    #[test]
    fn moves_without_press_are_ignored() {
        let mut state = OrientationState::new(SensorGate::Unsupported);
        state.pointer_move(50.0, 50.0);
        assert_eq!((state.longitude, state.latitude), (0.0, 0.0));

        state.pointer_down(0.0, 0.0);
        state.pointer_up();
        state.pointer_move(500.0, 500.0);
        assert_eq!((state.longitude, state.latitude), (0.0, 0.0));
    }

    #[test]
    fn apply_clamps_latitude_and_looks_along_it() {
        let mut state = OrientationState::new(SensorGate::Unsupported);
        state.pointer_down(0.0, 0.0);
        state.pointer_move(0.0, 5000.0);
        let mut rig = CameraRig::default();
        state.apply(&mut rig);
        assert_eq!(state.latitude, LATITUDE_LIMIT);
        let expected = drag_forward(0.0, LATITUDE_LIMIT);
        assert!((rig.forward() - expected).length() < 1e-5);
    }

    #[test]
    fn drag_forward_matches_polar_convention() {
        let f = drag_forward(0.0, 0.0);
        assert!((f - Vec3::X).length() < 1e-6);
        let f = drag_forward(90.0, 0.0);
        assert!((f - Vec3::Z).length() < 1e-6);
        let up = drag_forward(0.0, 85.0);
        assert!(up.y > 0.99);
    }

    #[test]
    fn first_reading_heading_becomes_forward() {
        let mut state = OrientationState::new(SensorGate::NotRequired);
        assert!(state.on_sensor_reading(SensorReading::new(40.0, 70.0, 10.0)));
        assert_eq!(state.mode(), OrientationMode::Sensor);
        assert_eq!(state.alpha_offset(), Some(-40.0));

        let mut rig = CameraRig::default();
        state.apply(&mut rig);
        assert!(quat_close(rig.rotation, sensor_rotation(0.0, 70.0, 10.0, 0.0)));

        // 后续读数同样减去初始航向
        state.on_sensor_reading(SensorReading::new(100.0, 70.0, 10.0));
        state.apply(&mut rig);
        assert!(quat_close(rig.rotation, sensor_rotation(60.0, 70.0, 10.0, 0.0)));
    }

    #[test]
    fn readings_with_null_fields_are_dropped() {
        let mut state = OrientationState::new(SensorGate::NotRequired);
        let partial = SensorReading {
            alpha: Some(10.0),
            beta: None,
            gamma: Some(0.0),
        };
        assert!(!state.on_sensor_reading(partial));
        assert_eq!(state.mode(), OrientationMode::Drag);
        assert_eq!(state.activation(), SensorActivation::Probing);
        assert_eq!(state.alpha_offset(), None);

        state.on_sensor_reading(SensorReading::new(0.0, 90.0, 0.0));
        let mut rig = CameraRig::default();
        state.apply(&mut rig);
        let before = rig.rotation;
        state.on_sensor_reading(SensorReading {
            alpha: None,
            ..SensorReading::new(0.0, 10.0, 10.0)
        });
        state.apply(&mut rig);
        assert_eq!(rig.rotation, before);
    }

    #[test]
    fn permission_gate_blocks_until_granted() {
        let mut state = OrientationState::new(SensorGate::PermissionRequired);
        assert!(state.needs_permission_prompt());
        assert!(!state.on_sensor_reading(SensorReading::new(1.0, 2.0, 3.0)));
        assert_eq!(state.mode(), OrientationMode::Drag);

        assert_eq!(
            state.grant_sensor_permission(PermissionOutcome::Granted),
            SensorActivation::Probing
        );
        assert!(state.on_sensor_reading(SensorReading::new(1.0, 2.0, 3.0)));
        assert_eq!(state.mode(), OrientationMode::Sensor);
    }

    #[test]
    fn denied_permission_keeps_drag_forever() {
        let mut state = OrientationState::new(SensorGate::PermissionRequired);
        state.grant_sensor_permission(PermissionOutcome::Denied);
        // 拒绝后不会再次询问
        assert_eq!(
            state.grant_sensor_permission(PermissionOutcome::Granted),
            SensorActivation::Denied
        );
        assert!(!state.on_sensor_reading(SensorReading::new(1.0, 2.0, 3.0)));
        assert_eq!(state.mode(), OrientationMode::Drag);
    }

    #[test]
    fn sensor_mode_supersedes_drag_but_drag_is_still_recorded() {
        let mut state = OrientationState::new(SensorGate::NotRequired);
        state.on_sensor_reading(SensorReading::new(0.0, 90.0, 0.0));
        let mut rig = CameraRig::default();
        state.apply(&mut rig);
        let sensor_rot = rig.rotation;

        state.pointer_down(0.0, 0.0);
        state.pointer_move(-300.0, 0.0);
        state.pointer_up();
        assert!((state.longitude - 30.0).abs() < 1e-5);

        state.apply(&mut rig);
        assert_eq!(rig.rotation, sensor_rot);
        assert_eq!(state.mode(), OrientationMode::Sensor);
    }

    #[test]
    fn upright_device_looks_at_horizon() {
        // beta = 90：竖直拿着手机，背面朝前
        let q = sensor_rotation(0.0, 90.0, 0.0, 0.0);
        let fwd = q * Vec3::NEG_Z;
        assert!((fwd - Vec3::NEG_Z).length() < 1e-5);

        // 平放时看向地面
        let q = sensor_rotation(0.0, 0.0, 0.0, 0.0);
        let fwd = q * Vec3::NEG_Z;
        assert!((fwd - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn screen_rotation_only_rolls_the_view() {
        let a = sensor_rotation(20.0, 80.0, 5.0, 0.0);
        let b = sensor_rotation(20.0, 80.0, 5.0, 90.0);
        assert!(((a * Vec3::NEG_Z) - (b * Vec3::NEG_Z)).length() < 1e-5);
        assert!(!quat_close(a, b));
    }

    #[test]
    fn unsupported_gate_never_activates() {
        let mut state = OrientationState::new(SensorGate::Unsupported);
        assert!(!state.needs_permission_prompt());
        assert!(!state.on_sensor_reading(SensorReading::new(1.0, 2.0, 3.0)));
        assert_eq!(state.activation(), SensorActivation::Unavailable);
    }

    #[test]
    fn remount_keeps_permission_but_recaptures_heading() {
        let mut state = OrientationState::new(SensorGate::PermissionRequired);
        state.grant_sensor_permission(PermissionOutcome::Granted);
        state.on_sensor_reading(SensorReading::new(40.0, 90.0, 0.0));
        state.longitude = 12.0;

        let mut next = state.remount();
        assert_eq!(next.mode(), OrientationMode::Drag);
        assert_eq!(next.activation(), SensorActivation::Probing);
        assert_eq!(next.longitude, 0.0);
        next.on_sensor_reading(SensorReading::new(75.0, 90.0, 0.0));
        assert_eq!(next.alpha_offset(), Some(-75.0));

        let mut denied = OrientationState::new(SensorGate::PermissionRequired);
        denied.grant_sensor_permission(PermissionOutcome::Denied);
        assert_eq!(denied.remount().activation(), SensorActivation::Denied);
    }

    #[test]
    fn gate_detection() {
        assert_eq!(SensorGate::detect(false, true), SensorGate::Unsupported);
        assert_eq!(SensorGate::detect(true, true), SensorGate::PermissionRequired);
        assert_eq!(SensorGate::detect(true, false), SensorGate::NotRequired);
    }
}
