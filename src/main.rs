// main.rs — 桌面宿主：窗口与输入、后台加载、传感器输入、每帧调度与 UI

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

use lens_panorama::config::ViewerConfig;
use lens_panorama::lens::{LensControls, LensKit, GRADIENT_SIZE};
use lens_panorama::loader::{AssetLoader, LensAssets, LoadEvent};
use lens_panorama::mesh::build_sphere;
use lens_panorama::orientation::{
    OrientationMode, PermissionOutcome, SensorActivation, SensorGate,
};
use lens_panorama::renderer::Renderer;
use lens_panorama::scene::{MeshId, ModelPlacement, SceneConfig};
use lens_panorama::scheduler::FrameScheduler;
use lens_panorama::sensor_feed::SensorFeed;
use lens_panorama::viewer::{ViewState, ViewerEvent, ENVIRONMENT_RADIUS};

use std::path::Path;
use std::sync::Arc;
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

const APP_TITLE: &str = "Lens Panorama";
const SPHERE_SEGMENTS: (usize, usize) = (64, 128);
const SCENE_EXTENSIONS: &[&str] = &["json", "jpg", "jpeg", "png", "bmp", "hdr", "exr"];

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::from_env();
    log::debug!("{config:?}");

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(APP_TITLE)
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let renderer = pollster::block_on(Renderer::new(window.clone()))?;
    let mut app = App::new(window.clone(), renderer, &config);

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = app
                    .renderer
                    .egui_state
                    .on_event(&app.renderer.egui_ctx, &event);
                if response.consumed {
                    // 按钮上松开也要结束拖拽
                    if matches!(event, WindowEvent::MouseInput { state: ElementState::Released, .. }) {
                        app.state.orientation.pointer_up();
                    }
                    return;
                }
                app.on_window_event(event, control_flow);
            }

            Event::RedrawRequested(_) => app.redraw(control_flow),

            Event::MainEventsCleared => {
                app.drain_loads();
                app.drain_sensor();
                if app.scheduler.is_pending() {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    });
}

enum UiAction {
    OpenDialog,
    Permission(PermissionOutcome),
    ToggleFullscreen,
    Exit,
}

struct App {
    window: Arc<Window>,
    renderer: Renderer,
    state: ViewState,
    scheduler: FrameScheduler,
    loader: AssetLoader,
    feed: Option<SensorFeed>,
    scene: Option<SceneConfig>,
    sphere: MeshId,
    controls: Option<LensControls>,
    cursor: (f32, f32),
    touch: Option<u64>,
    fullscreen: bool,
    status: String,
}

impl App {
    fn new(window: Arc<Window>, mut renderer: Renderer, config: &ViewerConfig) -> Self {
        let feed = config.sensor_feed.clone().and_then(|source| {
            SensorFeed::spawn(source)
                .map_err(|e| log::warn!("sensor feed unavailable: {e}"))
                .ok()
        });
        let gate = SensorGate::detect(feed.is_some(), config.sensor_permission);
        log::info!("orientation sensor: {gate:?}");

        let size = renderer.size();
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let (lat, lon) = SPHERE_SEGMENTS;
        let sphere = renderer.upload_mesh(&build_sphere(ENVIRONMENT_RADIUS, lat, lon));
        let loader = AssetLoader::new(renderer.max_texture_dimension());
        loader.load_lenses(config.lens_assets());

        let mut app = Self {
            window,
            state: ViewState::new(gate, config.lens_layout, aspect),
            renderer,
            scheduler: FrameScheduler::new(),
            loader,
            feed,
            scene: None,
            sphere,
            controls: None,
            cursor: (0.0, 0.0),
            touch: None,
            fullscreen: false,
            status: "Press O or drop a scene file to start".to_owned(),
        };
        if let Some(path) = &config.scene {
            app.open_scene(path);
        }
        app.scheduler.start();
        app
    }

    fn open_scene(&mut self, path: &Path) {
        let scene = match SceneConfig::open(path) {
            Ok(scene) => scene,
            Err(e) => {
                log::error!("cannot open {}: {e}", path.display());
                self.status = format!("Error: {e}");
                return;
            }
        };

        let released = self.state.mount_scene(scene.models.len());
        for mesh in released.meshes {
            self.renderer.release_mesh(mesh);
        }
        for texture in released.textures {
            self.renderer.release_texture(texture);
        }
        self.loader.load_scene(&scene);
        self.status = format!("Loading {}", path.display());
        self.scene = Some(scene);
    }

    fn pick_scene(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Scene / panorama", SCENE_EXTENSIONS)
            .pick_file()
        {
            self.open_scene(&path);
        }
    }

    // ── 后台结果 ─────────────────────────────────────────────────────

    fn drain_loads(&mut self) {
        let events: Vec<LoadEvent> = self.loader.poll().collect();
        for event in events {
            match event {
                LoadEvent::Environment { generation, result } => {
                    if !self.loader.is_current(generation) {
                        log::debug!("dropping environment from stale scene #{generation}");
                        continue;
                    }
                    match result {
                        Ok(pano) => {
                            let texture = self.renderer.upload_environment(&pano.rgba);
                            if let Some(ev) = self.state.set_environment(self.sphere, texture) {
                                self.on_viewer_event(ev);
                            }
                        }
                        // 失败不计入就绪：场景保持加载中
                        Err(e) => {
                            log::error!("environment failed to load: {e}");
                            self.status = format!("Error: {e}");
                        }
                    }
                }
                LoadEvent::Model {
                    generation,
                    index,
                    result,
                } => {
                    if !self.loader.is_current(generation) {
                        log::debug!("dropping model {index} from stale scene #{generation}");
                        continue;
                    }
                    match result {
                        Ok(mesh) => {
                            let id = self.renderer.upload_mesh(&mesh);
                            let transform = self
                                .scene
                                .as_ref()
                                .and_then(|s| s.models.get(index))
                                .map(ModelPlacement::transform)
                                .unwrap_or_default();
                            if let Some(ev) =
                                self.state.place_model(index, id, mesh.base_color, transform)
                            {
                                self.on_viewer_event(ev);
                            }
                        }
                        Err(e) => {
                            log::error!("model {index} failed to load: {e}");
                            self.status = format!("Error: {e}");
                        }
                    }
                }
                LoadEvent::Lenses(Ok(assets)) => self.install_lenses(assets),
                LoadEvent::Lenses(Err(e)) => log::error!("lens assets failed to load: {e}"),
            }
        }
    }

    fn install_lenses(&mut self, assets: LensAssets) {
        let r = &mut self.renderer;
        let kit = LensKit {
            left: r.upload_mesh(&assets.left),
            left_alternate: r.upload_mesh(&assets.left_alternate),
            right: r.upload_mesh(&assets.right),
            right_alternate: r.upload_mesh(&assets.right_alternate),
            frame: r.upload_mesh(&assets.frame),
            mask: r.upload_mesh(&assets.mask),
            left_normal_map: r.upload_texture(&assets.left_normal_map),
            left_inverted_map: r.upload_texture(&assets.left_inverted_map),
            right_gradients: [
                r.create_dynamic_texture(GRADIENT_SIZE, 1),
                r.create_dynamic_texture(GRADIENT_SIZE, 1),
            ],
        };
        let event = self.state.install_lenses(kit);
        self.on_viewer_event(event);
    }

    fn on_viewer_event(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::Ready => self.status = "Ready".to_owned(),
            ViewerEvent::GlassesReady(controls) => self.controls = Some(controls),
        }
    }

    fn drain_sensor(&mut self) {
        let Some(feed) = &self.feed else {
            return;
        };
        for sample in feed.poll() {
            if let Some(angle) = sample.screen {
                self.state.orientation.set_screen_angle(angle);
            }
            self.state.orientation.on_sensor_reading(sample.reading);
        }
    }

    // ── 输入 ─────────────────────────────────────────────────────────

    fn on_window_event(&mut self, event: WindowEvent<'_>, control_flow: &mut ControlFlow) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                *control_flow = ControlFlow::Exit;
            }

            WindowEvent::Resized(new_size) => {
                self.renderer.resize(new_size);
                self.state.camera.set_aspect(new_size.width, new_size.height);
            }

            WindowEvent::KeyboardInput { input, .. } => {
                if input.state == ElementState::Pressed {
                    match input.virtual_keycode {
                        Some(VirtualKeyCode::O) => self.pick_scene(),
                        Some(VirtualKeyCode::F11) => self.toggle_fullscreen(),
                        _ => {}
                    }
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    match state {
                        ElementState::Pressed => {
                            let (x, y) = self.cursor;
                            self.state.orientation.pointer_down(x, y);
                        }
                        ElementState::Released => self.state.orientation.pointer_up(),
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                self.state.orientation.pointer_move(self.cursor.0, self.cursor.1);
            }

            // 只跟踪第一根手指
            WindowEvent::Touch(Touch {
                phase,
                location,
                id,
                ..
            }) => {
                let (x, y) = (location.x as f32, location.y as f32);
                match phase {
                    TouchPhase::Started if self.touch.is_none() => {
                        self.touch = Some(id);
                        self.state.orientation.pointer_down(x, y);
                    }
                    TouchPhase::Moved if self.touch == Some(id) => {
                        self.state.orientation.pointer_move(x, y);
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled if self.touch == Some(id) => {
                        self.touch = None;
                        self.state.orientation.pointer_up();
                    }
                    _ => {}
                }
            }

            WindowEvent::DroppedFile(path) => self.open_scene(&path),

            _ => {}
        }
    }

    fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        if self.fullscreen {
            self.window.set_fullscreen(Some(Fullscreen::Borderless(None)));
        } else {
            self.window.set_fullscreen(None);
        }
    }

    // ── 每帧 ─────────────────────────────────────────────────────────

    fn redraw(&mut self, control_flow: &mut ControlFlow) {
        let model = UiModel {
            ready: self.state.readiness.is_ready(),
            loaded: self.state.readiness.loaded_assets(),
            expected: self.state.readiness.expected_assets(),
            has_scene: self.scene.is_some(),
            mode: self.state.orientation.mode(),
            activation: self.state.orientation.activation(),
            polar: self.scheduler.last_report().map(|r| r.polar_angle),
            fullscreen: self.fullscreen,
            status: &self.status,
            controls: self.controls.as_ref(),
        };
        let mut actions = Vec::new();
        self.renderer
            .prepare_ui(&self.window, |ctx| actions = draw_ui(ctx, &model));

        match self.scheduler.tick(&mut self.state, &mut self.renderer) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost) => self.renderer.resize(self.renderer.size()),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory, exiting");
                self.shutdown();
                *control_flow = ControlFlow::Exit;
            }
            Err(e) => log::warn!("render error: {e:?}"),
        }

        for action in actions {
            match action {
                UiAction::OpenDialog => self.pick_scene(),
                UiAction::Permission(outcome) => {
                    self.state.orientation.grant_sensor_permission(outcome);
                }
                UiAction::ToggleFullscreen => self.toggle_fullscreen(),
                UiAction::Exit => {
                    self.shutdown();
                    *control_flow = ControlFlow::Exit;
                }
            }
        }
    }

    /// Stop ticking, stop the sensor feed and detach everything from the camera.
    fn shutdown(&mut self) {
        self.scheduler.cancel();
        if let Some(feed) = self.feed.take() {
            feed.stop();
        }
        self.controls = None;
        for texture in self.state.unmount() {
            self.renderer.release_texture(texture);
        }
    }
}

struct UiModel<'a> {
    ready: bool,
    loaded: usize,
    expected: usize,
    has_scene: bool,
    mode: OrientationMode,
    activation: SensorActivation,
    polar: Option<f32>,
    fullscreen: bool,
    status: &'a str,
    controls: Option<&'a LensControls>,
}

fn draw_ui(ctx: &egui::Context, model: &UiModel<'_>) -> Vec<UiAction> {
    let mut actions = Vec::new();

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open scene… (O)").clicked() {
                    ui.close_menu();
                    actions.push(UiAction::OpenDialog);
                }
                if ui.button("Exit").clicked() {
                    ui.close_menu();
                    actions.push(UiAction::Exit);
                }
            });

            ui.menu_button("View", |ui| {
                let label = if model.fullscreen {
                    "Exit fullscreen (F11)"
                } else {
                    "Fullscreen (F11)"
                };
                if ui.button(label).clicked() {
                    ui.close_menu();
                    actions.push(UiAction::ToggleFullscreen);
                }
            });

            if let Some(controls) = model.controls {
                ui.separator();
                if ui.button("Swap left lens").clicked() {
                    controls.swap_left();
                }
                if ui.button("Swap right lens").clicked() {
                    controls.swap_right();
                }
            }
        });
    });

    if model.activation == SensorActivation::AwaitingPermission {
        egui::Window::new("Motion control")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -48.0])
            .show(ctx, |ui| {
                ui.label("This device can steer the view with its orientation sensor.");
                ui.horizontal(|ui| {
                    if ui.button("Enable motion").clicked() {
                        actions.push(UiAction::Permission(PermissionOutcome::Granted));
                    }
                    if ui.button("Keep dragging").clicked() {
                        actions.push(UiAction::Permission(PermissionOutcome::Denied));
                    }
                });
            });
    }

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if model.has_scene && !model.ready {
                ui.spinner();
                ui.label(
                    egui::RichText::new(format!("Loading {}/{}", model.loaded, model.expected))
                        .color(egui::Color32::YELLOW),
                );
                ui.label("|");
            }
            ui.label(model.status);
            ui.label("|");
            ui.label(format!("Mode: {:?} ({:?})", model.mode, model.activation));
            if let Some(polar) = model.polar {
                ui.label("|");
                ui.label(format!("Polar: {:.1}°", polar.to_degrees()));
            }
        });
    });

    actions
}
