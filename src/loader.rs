// loader.rs — 后台线程解码资源，通过通道交回主线程

use crate::assets::{load_gltf_mesh, load_texture, AssetError};
use crate::config::LensAssetPaths;
use crate::mesh::CpuMesh;
use crate::panorama::{load_panorama, PanoramaImage};
use crate::scene::SceneConfig;
use image::RgbaImage;
use std::sync::mpsc::{channel, Receiver, Sender, TryIter};
use std::thread;

/// CPU-side lens assets, delivered all at once.
#[derive(Debug, Clone)]
pub struct LensAssets {
    pub left: CpuMesh,
    pub left_alternate: CpuMesh,
    pub right: CpuMesh,
    pub right_alternate: CpuMesh,
    pub frame: CpuMesh,
    pub mask: CpuMesh,
    pub left_normal_map: RgbaImage,
    pub left_inverted_map: RgbaImage,
}

impl LensAssets {
    pub fn load(paths: &LensAssetPaths) -> Result<Self, AssetError> {
        Ok(Self {
            left: load_gltf_mesh(&paths.left)?,
            left_alternate: load_gltf_mesh(&paths.left_alternate)?,
            right: load_gltf_mesh(&paths.right)?,
            right_alternate: load_gltf_mesh(&paths.right_alternate)?,
            frame: load_gltf_mesh(&paths.frame)?,
            mask: load_gltf_mesh(&paths.mask)?,
            left_normal_map: load_texture(&paths.left_normal_map)?,
            left_inverted_map: load_texture(&paths.left_inverted_map)?,
        })
    }
}

#[derive(Debug)]
pub enum LoadEvent {
    Environment {
        generation: u64,
        result: Result<PanoramaImage, AssetError>,
    },
    Model {
        generation: u64,
        index: usize,
        result: Result<CpuMesh, AssetError>,
    },
    Lenses(Result<LensAssets, AssetError>),
}

/// Spawns one thread per asset. Completions are tagged with the scene
/// generation so results for a replaced scene can be dropped.
pub struct AssetLoader {
    tx: Sender<LoadEvent>,
    rx: Receiver<LoadEvent>,
    generation: u64,
    max_texture_dimension: u32,
}

impl AssetLoader {
    pub fn new(max_texture_dimension: u32) -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            generation: 0,
            max_texture_dimension,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Start loading a scene; anything still in flight for the previous one becomes stale.
    pub fn load_scene(&mut self, scene: &SceneConfig) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        log::info!(
            "loading scene #{generation}: {} + {} model(s)",
            scene.image.display(),
            scene.models.len()
        );

        let tx = self.tx.clone();
        let image = scene.image.clone();
        let max = self.max_texture_dimension;
        thread::spawn(move || {
            let result = load_panorama(&image, max);
            let _ = tx.send(LoadEvent::Environment { generation, result });
        });

        for (index, placement) in scene.models.iter().enumerate() {
            let tx = self.tx.clone();
            let path = placement.path.clone();
            thread::spawn(move || {
                let result = load_gltf_mesh(&path);
                let _ = tx.send(LoadEvent::Model {
                    generation,
                    index,
                    result,
                });
            });
        }
        generation
    }

    pub fn load_lenses(&self, paths: LensAssetPaths) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let _ = tx.send(LoadEvent::Lenses(LensAssets::load(&paths)));
        });
    }

    pub fn poll(&self) -> TryIter<'_, LoadEvent> {
        self.rx.try_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ModelPlacement;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn wait_for(loader: &AssetLoader, n: usize) -> Vec<LoadEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut out = Vec::new();
        while out.len() < n && Instant::now() < deadline {
            out.extend(loader.poll());
            thread::sleep(Duration::from_millis(5));
        }
        out
    }

    #[test]
    fn failures_come_back_as_errors_tagged_with_generation() {
        let mut loader = AssetLoader::new(4096);
        let scene = SceneConfig {
            image: PathBuf::from("/missing/pano.jpg"),
            models: vec![ModelPlacement {
                path: PathBuf::from("/missing/model.glb"),
                position: [0.0; 3],
                rotation: None,
                scale: None,
            }],
        };
        let gen = loader.load_scene(&scene);
        assert!(loader.is_current(gen));

        let events = wait_for(&loader, 2);
        assert_eq!(events.len(), 2);
        for ev in events {
            match ev {
                LoadEvent::Environment { generation, result } => {
                    assert_eq!(generation, gen);
                    assert!(result.is_err());
                }
                LoadEvent::Model {
                    generation,
                    index,
                    result,
                } => {
                    assert_eq!((generation, index), (gen, 0));
                    assert!(result.is_err());
                }
                LoadEvent::Lenses(_) => panic!("unexpected lens event"),
            }
        }
    }

    #[test]
    fn new_scene_makes_old_generation_stale() {
        let mut loader = AssetLoader::new(4096);
        let scene = SceneConfig {
            image: PathBuf::from("/missing/a.jpg"),
            models: Vec::new(),
        };
        let first = loader.load_scene(&scene);
        let second = loader.load_scene(&scene);
        assert!(!loader.is_current(first));
        assert!(loader.is_current(second));
    }
}
