// scheduler.rs — 每帧唯一入口：朝向 → 相机 → 极角 → 镜片 → 渲染 → 预约下一帧

use crate::camera::CameraRig;
use crate::scene::{DrawItem, TextureId};
use crate::viewer::ViewState;
use glam::Mat4;
use std::f32::consts::PI;

/// Polar angle at which the right-lens gradient sits at its leftmost offset.
pub const MIN_POLAR: f32 = PI / 2.5;
/// Polar angle at which it reaches its rightmost offset.
pub const MAX_POLAR: f32 = PI / 1.6;

/// What one tick hands to the renderer.
pub struct FrameView<'a> {
    pub camera: CameraRig,
    /// Environment + models; empty until the scene is ready.
    pub world: &'a [DrawItem],
    /// Camera-attached lens groups, drawn on top.
    pub overlay: &'a [DrawItem],
}

/// The rendering side of a tick. The real implementation is the wgpu renderer;
/// tests record calls instead.
pub trait FrameTarget {
    type Error;

    fn write_texture(&mut self, texture: TextureId, width: u32, height: u32, rgba: &[u8]);

    fn render(&mut self, frame: &FrameView<'_>) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub polar_angle: f32,
    /// A lens swap animation is still in flight.
    pub animating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Pending,
    Cancelled,
}

pub struct FrameScheduler {
    phase: Phase,
    world: Vec<DrawItem>,
    overlay: Vec<DrawItem>,
    last: Option<TickReport>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            world: Vec::new(),
            overlay: Vec::new(),
            last: None,
        }
    }

    /// Queue the first tick.
    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Pending;
        }
    }

    /// Whether the host should request another refresh.
    pub fn is_pending(&self) -> bool {
        self.phase == Phase::Pending
    }

    /// Drop the pending reschedule for good.
    pub fn cancel(&mut self) {
        if self.phase != Phase::Cancelled {
            log::debug!("frame scheduler cancelled");
        }
        self.phase = Phase::Cancelled;
    }

    pub fn last_report(&self) -> Option<TickReport> {
        self.last
    }

    /// Run one tick to completion. Returns `Ok(None)` when nothing was pending.
    pub fn tick<T: FrameTarget>(
        &mut self,
        state: &mut ViewState,
        target: &mut T,
    ) -> Result<Option<TickReport>, T::Error> {
        if self.phase != Phase::Pending {
            return Ok(None);
        }
        self.phase = Phase::Idle;

        state.orientation.apply(&mut state.camera);
        let polar_angle = state.camera.polar_angle();

        state.lenses.apply_commands();
        state.lenses.update(polar_angle, MIN_POLAR, MAX_POLAR);
        for (texture, width, rgba) in state.lenses.gradient_uploads() {
            target.write_texture(texture, width, 1, rgba);
        }
        let animating = state.lenses.animate_swap();

        self.world.clear();
        if state.readiness.is_ready() {
            state.world.collect(Mat4::IDENTITY, &mut self.world);
        }
        self.overlay.clear();
        state
            .lenses
            .collect(state.camera.world_matrix(), &mut self.overlay);

        // 先预约下一帧：渲染失败由调用方决定是否 cancel
        self.phase = Phase::Pending;
        let report = TickReport {
            polar_angle,
            animating,
        };
        self.last = Some(report);

        target.render(&FrameView {
            camera: state.camera,
            world: &self.world,
            overlay: &self.overlay,
        })?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::LensLayout;
    use crate::orientation::SensorGate;

    #[derive(Default)]
    struct Recorder {
        renders: usize,
        uploads: usize,
        world_sizes: Vec<usize>,
    }

    impl FrameTarget for Recorder {
        type Error = ();

        fn write_texture(&mut self, _: TextureId, _: u32, _: u32, _: &[u8]) {
            self.uploads += 1;
        }

        fn render(&mut self, frame: &FrameView<'_>) -> Result<(), ()> {
            self.renders += 1;
            self.world_sizes.push(frame.world.len());
            Ok(())
        }
    }

    fn state() -> ViewState {
        ViewState::new(SensorGate::Unsupported, LensLayout::default(), 1.0)
    }

    #[test]
    fn tick_only_runs_when_pending() {
        let mut s = state();
        let mut sched = FrameScheduler::new();
        let mut rec = Recorder::default();
        assert_eq!(sched.tick(&mut s, &mut rec), Ok(None));
        sched.start();
        assert!(sched.tick(&mut s, &mut rec).unwrap().is_some());
        assert!(sched.is_pending());
        assert_eq!(rec.renders, 1);
        // 镜片未安装：没有渐变上传
        assert_eq!(rec.uploads, 0);
    }

    #[test]
    fn cancel_stops_rescheduling() {
        let mut s = state();
        let mut sched = FrameScheduler::new();
        let mut rec = Recorder::default();
        sched.start();
        sched.cancel();
        assert!(!sched.is_pending());
        assert_eq!(sched.tick(&mut s, &mut rec), Ok(None));
        sched.start();
        assert!(!sched.is_pending());
        assert_eq!(rec.renders, 0);
    }

    #[test]
    fn horizontal_drag_view_gives_right_angle_polar() {
        let mut s = state();
        let mut sched = FrameScheduler::new();
        sched.start();
        let report = sched.tick(&mut s, &mut Recorder::default()).unwrap().unwrap();
        assert!((report.polar_angle - PI / 2.0).abs() < 1e-5);
    }

    #[test]
    fn world_is_hidden_until_ready() {
        let mut s = state();
        s.mount_scene(0);
        let mut sched = FrameScheduler::new();
        let mut rec = Recorder::default();
        sched.start();
        sched.tick(&mut s, &mut rec).unwrap();
        s.set_environment(crate::scene::MeshId(0), TextureId(0));
        sched.tick(&mut s, &mut rec).unwrap();
        assert_eq!(rec.world_sizes, vec![0, 1]);
    }

    #[test]
    fn render_errors_propagate_but_keep_the_schedule() {
        struct Failing;
        impl FrameTarget for Failing {
            type Error = &'static str;
            fn write_texture(&mut self, _: TextureId, _: u32, _: u32, _: &[u8]) {}
            fn render(&mut self, _: &FrameView<'_>) -> Result<(), &'static str> {
                Err("surface lost")
            }
        }
        let mut s = state();
        let mut sched = FrameScheduler::new();
        sched.start();
        assert_eq!(sched.tick(&mut s, &mut Failing), Err("surface lost"));
        assert!(sched.is_pending());
    }
}
