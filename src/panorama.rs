// panorama.rs — 环境贴图：编码识别、HDR 色调映射、尺寸适配

use crate::assets::{decode_image, AssetError};
use image::{Rgba, RgbaImage};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentEncoding {
    /// 8-bit sRGB raster (jpg/png/...).
    Ldr,
    /// Radiance RGBE `.hdr`.
    RadianceHdr,
    /// OpenEXR `.exr`.
    OpenExr,
}

impl EnvironmentEncoding {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("hdr") | Some("pic") => EnvironmentEncoding::RadianceHdr,
            Some("exr") => EnvironmentEncoding::OpenExr,
            _ => EnvironmentEncoding::Ldr,
        }
    }

    pub fn is_hdr(self) -> bool {
        !matches!(self, EnvironmentEncoding::Ldr)
    }
}

/// Decoded environment, already in display-ready sRGB 8-bit.
#[derive(Debug, Clone)]
pub struct PanoramaImage {
    pub rgba: RgbaImage,
    pub encoding: EnvironmentEncoding,
}

pub const DEFAULT_EXPOSURE: f32 = 1.0;

/// Decode, tone-map (HDR only) and fit the environment to the GPU texture limit.
pub fn load_panorama(path: &Path, max_dimension: u32) -> Result<PanoramaImage, AssetError> {
    let encoding = EnvironmentEncoding::from_path(path);
    let img = decode_image(path)?;
    let rgba = if encoding.is_hdr() {
        tone_map(&img.to_rgba32f(), DEFAULT_EXPOSURE)
    } else {
        img.to_rgba8()
    };
    let (w, h) = rgba.dimensions();
    log::info!("panorama {} loaded ({w}x{h}, {:?})", path.display(), encoding);
    Ok(PanoramaImage {
        rgba: pad_to_equirect(fit_to_limit(rgba, max_dimension)),
        encoding,
    })
}

/// Reinhard on linear radiance, then sRGB encode.
pub fn tone_map(hdr: &image::Rgba32FImage, exposure: f32) -> RgbaImage {
    RgbaImage::from_fn(hdr.width(), hdr.height(), |x, y| {
        let p = hdr.get_pixel(x, y).0;
        let ch = |c: f32| {
            let c = (c.max(0.0) * exposure) / (1.0 + c.max(0.0) * exposure);
            (linear_to_srgb(c) * 255.0).round() as u8
        };
        Rgba([ch(p[0]), ch(p[1]), ch(p[2]), 255])
    })
}

pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Downscale so neither side exceeds `max_dimension`.
pub fn fit_to_limit(img: RgbaImage, max_dimension: u32) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    if max_dimension == 0 || (src_w <= max_dimension && src_h <= max_dimension) {
        return img;
    }
    let scale = (max_dimension as f32 / src_w.max(src_h) as f32).min(1.0);
    let new_w = ((src_w as f32 * scale) as u32).clamp(1, max_dimension);
    let new_h = ((src_h as f32 * scale) as u32).clamp(1, max_dimension);
    log::warn!("panorama {src_w}x{src_h} exceeds GPU limit {max_dimension}, scaled to {new_w}x{new_h}");
    image::imageops::resize(&img, new_w, new_h, image::imageops::FilterType::Lanczos3)
}

/// Non-2:1 images are padded with black on top so the bottom stays aligned.
pub fn pad_to_equirect(img: RgbaImage) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    let target_h = src_w / 2;
    if target_h == 0 || src_h >= target_h {
        return img;
    }
    let mut canvas = RgbaImage::from_pixel(src_w, target_h, Rgba([0, 0, 0, 255]));
    image::imageops::replace(&mut canvas, &img, 0, (target_h - src_h) as i64);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_from_extension() {
        assert_eq!(EnvironmentEncoding::from_path(Path::new("a/b.HDR")), EnvironmentEncoding::RadianceHdr);
        assert_eq!(EnvironmentEncoding::from_path(Path::new("x.exr")), EnvironmentEncoding::OpenExr);
        assert_eq!(EnvironmentEncoding::from_path(Path::new("x.jpg")), EnvironmentEncoding::Ldr);
        assert_eq!(EnvironmentEncoding::from_path(Path::new("noext")), EnvironmentEncoding::Ldr);
    }

    #[test]
    fn tone_map_is_bounded_and_monotonic() {
        let hdr = image::Rgba32FImage::from_fn(4, 1, |x, _| {
            let v = [0.0, 0.5, 4.0, 1000.0][x as usize];
            image::Rgba([v, v, v, 1.0])
        });
        let ldr = tone_map(&hdr, 1.0);
        let row: Vec<u8> = (0..4).map(|x| ldr.get_pixel(x, 0).0[0]).collect();
        assert_eq!(row[0], 0);
        assert!(row.windows(2).all(|w| w[0] < w[1]));
        assert!(row[3] >= 254);
    }

    #[test]
    fn oversized_images_are_scaled_down() {
        let img = RgbaImage::new(400, 200);
        let out = fit_to_limit(img, 100);
        assert_eq!(out.dimensions(), (100, 50));
        let small = fit_to_limit(RgbaImage::new(40, 20), 100);
        assert_eq!(small.dimensions(), (40, 20));
    }

    #[test]
    fn short_images_are_padded_on_top() {
        let img = RgbaImage::from_pixel(8, 2, Rgba([9, 9, 9, 255]));
        let out = pad_to_equirect(img);
        assert_eq!(out.dimensions(), (8, 4));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 3).0, [9, 9, 9, 255]);
    }
}
