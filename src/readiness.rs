// readiness.rs — 背景纹理 + 所有模型加载完成 → 场景就绪（只触发一次）

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Environment,
    Model,
}

/// Aggregates one environment texture and `total_models` model loads into a
/// single readiness transition. Counters only grow until [`reset`](Self::reset).
#[derive(Debug, Clone, Default)]
pub struct SceneReadiness {
    total_models: usize,
    loaded_models: usize,
    texture_loaded: bool,
    ready: bool,
}

impl SceneReadiness {
    pub fn new(total_models: usize) -> Self {
        Self {
            total_models,
            ..Default::default()
        }
    }

    /// Start over for a new scene configuration.
    pub fn reset(&mut self, total_models: usize) {
        *self = Self::new(total_models);
    }

    /// Returns `true` exactly once: on the call that completes the scene.
    pub fn record_loaded(&mut self, kind: AssetKind) -> bool {
        match kind {
            AssetKind::Environment => self.texture_loaded = true,
            AssetKind::Model => {
                self.loaded_models = (self.loaded_models + 1).min(self.total_models);
            }
        }
        if !self.ready && self.texture_loaded && self.loaded_models == self.total_models {
            self.ready = true;
            return true;
        }
        false
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn expected_assets(&self) -> usize {
        1 + self.total_models
    }

    pub fn loaded_assets(&self) -> usize {
        usize::from(self.texture_loaded) + self.loaded_models
    }
}
