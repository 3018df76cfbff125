// config.rs — 命令行 / 环境变量配置

use crate::lens::LensLayout;
use std::path::{Path, PathBuf};

pub const ENV_SCENE: &str = "LENS_VIEWER_SCENE";
pub const ENV_LENS_DIR: &str = "LENS_VIEWER_LENS_DIR";
pub const ENV_SENSOR_PERMISSION: &str = "LENS_VIEWER_SENSOR_PERMISSION";

/// File names of the lens assets inside the lens directory.
#[derive(Debug, Clone, PartialEq)]
pub struct LensAssetPaths {
    pub left: PathBuf,
    pub left_alternate: PathBuf,
    pub right: PathBuf,
    pub right_alternate: PathBuf,
    pub frame: PathBuf,
    pub mask: PathBuf,
    pub left_normal_map: PathBuf,
    pub left_inverted_map: PathBuf,
}

impl LensAssetPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            left: dir.join("lens_left.glb"),
            left_alternate: dir.join("lens_left_alt.glb"),
            right: dir.join("lens_right.glb"),
            right_alternate: dir.join("lens_right_alt.glb"),
            frame: dir.join("frame.glb"),
            mask: dir.join("mask.glb"),
            left_normal_map: dir.join("left_normal.png"),
            left_inverted_map: dir.join("left_inverted.png"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// Replay a JSON-lines file at display rate.
    Replay(PathBuf),
    /// Stream JSON lines from stdin as they arrive.
    Stdin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub scene: Option<PathBuf>,
    pub lens_dir: PathBuf,
    pub sensor_feed: Option<FeedSource>,
    /// Emulate platforms that need a user gesture before exposing orientation.
    pub sensor_permission: bool,
    pub lens_layout: LensLayout,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scene: None,
            lens_dir: PathBuf::from("assets").join("lens"),
            sensor_feed: None,
            sensor_permission: false,
            lens_layout: LensLayout::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        Self::resolve(std::env::args().skip(1), |k| std::env::var(k).ok())
    }

    /// CLI flags win over environment variables.
    pub fn resolve<I, F>(args: I, env: F) -> Self
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let non_empty = |k: &str| env(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(ENV_SCENE) {
            cfg.scene = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty(ENV_LENS_DIR) {
            cfg.lens_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty(ENV_SENSOR_PERMISSION) {
            cfg.sensor_permission = matches!(v.trim(), "1" | "true" | "yes");
        }

        let mut it = args.into_iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "--scene" => cfg.scene = it.next().map(PathBuf::from),
                "--lens-dir" => {
                    if let Some(v) = it.next() {
                        cfg.lens_dir = PathBuf::from(v);
                    }
                }
                "--sensor-feed" => {
                    cfg.sensor_feed = it.next().map(|v| {
                        if v == "-" {
                            FeedSource::Stdin
                        } else {
                            FeedSource::Replay(PathBuf::from(v))
                        }
                    })
                }
                "--sensor-permission" => cfg.sensor_permission = true,
                "--eye-offset" => {
                    if let Some(v) = it.next().and_then(|v| v.parse().ok()) {
                        cfg.lens_layout.eye_offset_x = v;
                    }
                }
                // 裸参数当作场景文件
                other if !other.starts_with("--") && cfg.scene.is_none() => {
                    cfg.scene = Some(PathBuf::from(other));
                }
                other => log::warn!("ignoring unknown argument {other:?}"),
            }
        }
        cfg
    }

    pub fn lens_assets(&self) -> LensAssetPaths {
        LensAssetPaths::in_dir(&self.lens_dir)
    }
}
