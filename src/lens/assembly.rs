// assembly.rs — 单个镜片组（主 / 备用）及其上下切换动画

use crate::scene::Node;

/// Vertical slot distance between the visible and parked positions.
pub const SWAP_DISTANCE: f32 = 0.6;
/// Fraction of the remaining distance covered per tick.
pub const SWAP_EASING: f32 = 0.08;
/// Closer than this to the target snaps and stops the animation.
pub const SWAP_SNAP: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Primary,
    Alternate,
}

impl Variant {
    /// Resting height for a pair that is (or is not) swapped.
    pub fn rest_y(self, swapped: bool) -> f32 {
        match (self, swapped) {
            (Variant::Primary, false) => 0.0,
            (Variant::Primary, true) => SWAP_DISTANCE,
            (Variant::Alternate, false) => -SWAP_DISTANCE,
            (Variant::Alternate, true) => 0.0,
        }
    }
}

/// A camera-attached lens group whose height eases toward `target_y`.
#[derive(Debug, Clone)]
pub struct LensAssembly {
    pub variant: Variant,
    pub group: Node,
    target_y: f32,
    animating: bool,
}

impl LensAssembly {
    pub fn new(variant: Variant, mut group: Node) -> Self {
        let y = variant.rest_y(false);
        group.transform.translation.y = y;
        Self {
            variant,
            group,
            target_y: y,
            animating: false,
        }
    }

    pub fn position_y(&self) -> f32 {
        self.group.transform.translation.y
    }

    pub fn target_y(&self) -> f32 {
        self.target_y
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn set_target(&mut self, y: f32) {
        self.target_y = y;
        self.animating = true;
    }

    /// One easing step. Returns `true` while still moving.
    pub fn step(&mut self) -> bool {
        if !self.animating {
            return false;
        }
        let y = &mut self.group.transform.translation.y;
        let remaining = self.target_y - *y;
        if remaining.abs() < SWAP_SNAP {
            *y = self.target_y;
            self.animating = false;
        } else {
            *y += remaining * SWAP_EASING;
        }
        self.animating
    }
}

/// Primary + alternate for one eye.
#[derive(Debug, Clone)]
pub struct LensPair {
    pub eye: Eye,
    pub primary: LensAssembly,
    pub alternate: LensAssembly,
    swapped: bool,
}

impl LensPair {
    pub fn new(eye: Eye, primary: Node, alternate: Node) -> Self {
        Self {
            eye,
            primary: LensAssembly::new(Variant::Primary, primary),
            alternate: LensAssembly::new(Variant::Alternate, alternate),
            swapped: false,
        }
    }

    pub fn is_swapped(&self) -> bool {
        self.swapped
    }

    pub fn toggle(&mut self) {
        self.swapped = !self.swapped;
        self.primary.set_target(Variant::Primary.rest_y(self.swapped));
        self.alternate.set_target(Variant::Alternate.rest_y(self.swapped));
    }

    pub fn step(&mut self) -> bool {
        let a = self.primary.step();
        let b = self.alternate.step();
        a || b
    }

    pub fn groups(&self) -> [&LensAssembly; 2] {
        [&self.primary, &self.alternate]
    }

    pub fn groups_mut(&mut self) -> [&mut LensAssembly; 2] {
        [&mut self.primary, &mut self.alternate]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Transform;

    fn pair() -> LensPair {
        LensPair::new(
            Eye::Left,
            Node::group("p", Transform::default()),
            Node::group("a", Transform::default()),
        )
    }

    #[test]
    fn fresh_pair_rests_in_disjoint_slots() {
        let p = pair();
        assert_eq!(p.primary.position_y(), 0.0);
        assert_eq!(p.alternate.position_y(), -SWAP_DISTANCE);
        assert!(!p.primary.is_animating() && !p.alternate.is_animating());
    }

    #[test]
    fn single_toggle_sets_targets_and_flags() {
        let mut p = pair();
        p.toggle();
        assert_eq!(p.primary.target_y(), SWAP_DISTANCE);
        assert_eq!(p.alternate.target_y(), 0.0);
        assert!(p.primary.is_animating() && p.alternate.is_animating());
    }

    #[test]
    fn double_toggle_restores_targets() {
        let mut p = pair();
        p.toggle();
        p.toggle();
        assert!(!p.is_swapped());
        assert_eq!(p.primary.target_y(), 0.0);
        assert_eq!(p.alternate.target_y(), -SWAP_DISTANCE);
    }

    #[test]
    fn animation_converges_without_overshoot() {
        let mut p = pair();
        p.toggle();
        let mut ticks = 0;
        while p.step() {
            assert!(p.primary.position_y() <= SWAP_DISTANCE);
            assert!(p.alternate.position_y() <= 0.0);
            ticks += 1;
            assert!(ticks < 1000, "animation never settled");
        }
        assert_eq!(p.primary.position_y(), SWAP_DISTANCE);
        assert_eq!(p.alternate.position_y(), 0.0);
    }

    #[test]
    fn step_within_snap_distance_finishes_immediately() {
        let mut a = LensAssembly::new(Variant::Primary, Node::group("g", Transform::default()));
        a.set_target(0.0005);
        for _ in 0..5 {
            a.step();
            assert!(!a.is_animating());
            assert_eq!(a.position_y(), 0.0005);
        }
    }

    #[test]
    fn idle_step_is_noop() {
        let mut a = LensAssembly::new(Variant::Alternate, Node::group("g", Transform::default()));
        assert!(!a.step());
        assert_eq!(a.position_y(), -SWAP_DISTANCE);
    }
}
