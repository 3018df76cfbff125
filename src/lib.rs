//! 360° panorama viewer with a simulated pair of corrective lenses attached to
//! the camera.
//!
//! The view is driven either by pointer drag or by device-orientation readings.
//! An equirectangular environment plus optional glTF models make up the scene.
//! Every tick the camera polar angle feeds the lens effects, see [`lens`].

pub mod assets;
pub mod camera;
pub mod config;
pub mod lens;
pub mod loader;
pub mod mesh;
pub mod orientation;
pub mod panorama;
pub mod readiness;
pub mod renderer;
pub mod scene;
pub mod scheduler;
pub mod sensor_feed;
pub mod viewer;
