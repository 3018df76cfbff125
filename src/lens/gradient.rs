// gradient.rs — 右镜片的水平渐变：视角 → 像素缓冲（无状态）

/// Horizontal resolution of the generated gradient texture.
pub const GRADIENT_SIZE: u32 = 256;

/// Offset range, as fractions of the gradient size, swept as the polar angle
/// goes from its minimum to its maximum.
pub const OFFSET_AT_MIN_POLAR: f32 = -0.3;
pub const OFFSET_AT_MAX_POLAR: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub at: f32,
    pub rgb: [u8; 3],
}

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];

#[derive(Debug, Clone, PartialEq)]
pub struct GradientProfile {
    pub size: u32,
    pub stops: Vec<ColorStop>,
}

impl GradientProfile {
    /// White → black → black → white with a wide dark band.
    pub fn primary(size: u32) -> Self {
        Self::banded(size, 0.35, 0.65)
    }

    /// Same ramp with a narrower dark band.
    pub fn alternate(size: u32) -> Self {
        Self::banded(size, 0.42, 0.58)
    }

    fn banded(size: u32, dark_from: f32, dark_to: f32) -> Self {
        Self {
            size: size.max(1),
            stops: vec![
                ColorStop { at: 0.0, rgb: WHITE },
                ColorStop { at: dark_from, rgb: BLACK },
                ColorStop { at: dark_to, rgb: BLACK },
                ColorStop { at: 1.0, rgb: WHITE },
            ],
        }
    }

    /// Horizontal pixel offset for a polar angle, linear over `[min_polar, max_polar]`.
    pub fn offset_for(&self, polar: f32, min_polar: f32, max_polar: f32) -> f32 {
        let size = self.size as f32;
        map_linear(
            polar,
            min_polar,
            max_polar,
            OFFSET_AT_MIN_POLAR * size,
            OFFSET_AT_MAX_POLAR * size,
        )
    }

    /// Colour at normalised position `u` along the ramp; ends clamp.
    pub fn sample(&self, u: f32) -> [u8; 3] {
        let Some(first) = self.stops.first() else {
            return WHITE;
        };
        if u.is_nan() || u <= first.at {
            return first.rgb;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if u <= b.at {
                let span = b.at - a.at;
                let t = if span > 0.0 { (u - a.at) / span } else { 1.0 };
                return lerp_rgb(a.rgb, b.rgb, t);
            }
        }
        self.stops[self.stops.len() - 1].rgb
    }

    /// Fill `out` with one RGBA row of `size` pixels, ramp shifted right by `offset` pixels.
    pub fn render_into(&self, offset: f32, out: &mut Vec<u8>) {
        let size = self.size as f32;
        out.clear();
        out.reserve(self.size as usize * 4);
        for x in 0..self.size {
            let u = (x as f32 + 0.5 - offset) / size;
            let [r, g, b] = self.sample(u);
            out.extend_from_slice(&[r, g, b, 255]);
        }
    }

    pub fn render(&self, offset: f32) -> Vec<u8> {
        let mut out = Vec::new();
        self.render_into(offset, &mut out);
        out
    }
}

pub fn map_linear(x: f32, a1: f32, a2: f32, b1: f32, b2: f32) -> f32 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

fn lerp_rgb(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const MIN: f32 = PI / 2.5;
    const MAX: f32 = PI / 1.6;

    #[test]
    fn offset_hits_both_ends_of_range() {
        let p = GradientProfile::primary(GRADIENT_SIZE);
        let size = GRADIENT_SIZE as f32;
        assert!((p.offset_for(MIN, MIN, MAX) - (-0.3 * size)).abs() < 1e-3);
        assert!((p.offset_for(MAX, MIN, MAX) - 0.02 * size).abs() < 1e-3);
    }

    #[test]
    fn offset_is_monotonic_in_polar() {
        let p = GradientProfile::primary(GRADIENT_SIZE);
        let mut prev = f32::NEG_INFINITY;
        for i in 0..=200 {
            let polar = MIN + (MAX - MIN) * i as f32 / 200.0;
            let o = p.offset_for(polar, MIN, MAX);
            assert!(o >= prev, "offset decreased at {polar}");
            prev = o;
        }
    }

    #[test]
    fn dark_band_follows_offset() {
        let p = GradientProfile::primary(200);
        let row = p.render(0.0);
        assert_eq!(row.len(), 200 * 4);
        // 两端白，中间黑
        assert!(row[0] > 250);
        assert_eq!(row[100 * 4], 0);
        assert!(row[199 * 4] > 240);

        let shifted = p.render(-60.0);
        // 暗带中心左移 60px
        assert_eq!(shifted[40 * 4], 0);
        assert!(shifted[170 * 4] > 240);
    }

    #[test]
    fn every_pixel_is_opaque_grey() {
        let p = GradientProfile::alternate(64);
        let row = p.render(13.7);
        for px in row.chunks_exact(4) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn render_is_pure_function_of_offset() {
        let p = GradientProfile::primary(GRADIENT_SIZE);
        let mut buf = vec![9; 3];
        p.render_into(-12.0, &mut buf);
        assert_eq!(buf, p.render(-12.0));
    }
}
