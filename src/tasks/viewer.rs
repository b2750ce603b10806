mod input;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowAttributes},
};

use crate::config::Configuration;
use crate::events::{CatalogEntry, InputEvent, TextureEvent};
use crate::gallery::grid::{GRID_DISTANCE, GridView, GridViewport, columns_for_width};
use crate::gallery::textures::{Progress, TextureCache};
use crate::gallery::{FrameSnapshot, GalleryState};
use crate::render::{Camera, GpuTexture, PlaneFit, PlaneRenderer};
use input::{KeyAction, TouchTracker, key_action, wheel_delta};

/// Longest simulated step; hitches beyond this are not replayed.
const MAX_FRAME_DT: Duration = Duration::from_millis(100);
/// Wake-up cadence while waiting on the loader.
const LOADING_POLL: Duration = Duration::from_millis(50);
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
}

/// How the viewer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerOutcome {
    Closed,
    /// No render surface could be created; the caller should show the flat list.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Gallery,
    /// Flat grid; the scroll simulation is paused until the gallery returns.
    Grid,
}

type TextureReceiver = mpsc::Receiver<TextureEvent>;

struct Gpu {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    renderer: PlaneRenderer,
    camera: Camera,
}

struct ViewerApp {
    cfg: Configuration,
    cancel: CancellationToken,
    from_loader: TextureReceiver,
    loader_done: bool,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    textures: TextureCache<GpuTexture>,
    gallery: GalleryState,
    grid: GridView,
    grid_frame: FrameSnapshot,
    catalog_len: usize,
    phase: Phase,
    pending_input: Vec<InputEvent>,
    touches: TouchTracker,
    last_frame: Option<Instant>,
    shown_progress: Option<Progress>,
    outcome: ViewerOutcome,
}

impl ViewerApp {
    fn new(
        cfg: Configuration,
        catalog: &[CatalogEntry],
        cancel: CancellationToken,
        from_loader: TextureReceiver,
    ) -> Self {
        let gallery = GalleryState::new(&cfg.gallery, catalog.len(), Instant::now());
        let grid = GridView::new(
            catalog.len(),
            columns_for_width(0),
            GridViewport::at_distance(cfg.gallery.field_of_view_deg, 1.0, GRID_DISTANCE),
        );
        Self {
            textures: TextureCache::new(catalog),
            gallery,
            grid,
            grid_frame: FrameSnapshot {
                global_opacity: 1.0,
                ..FrameSnapshot::default()
            },
            catalog_len: catalog.len(),
            cfg,
            cancel,
            from_loader,
            loader_done: false,
            window: None,
            gpu: None,
            phase: Phase::Loading,
            pending_input: Vec::new(),
            touches: TouchTracker::default(),
            last_frame: None,
            shown_progress: None,
            outcome: ViewerOutcome::Closed,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let mut attrs = WindowAttributes::default().with_title(self.cfg.window.title.clone());
        if self.cfg.window.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        ensure!(!caps.formats.is_empty(), "surface reports no usable formats");
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .unwrap_or(caps.formats[0]);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("gallery-device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            ..Default::default()
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let renderer = PlaneRenderer::new(&device, format, self.cfg.gallery.visible_count);
        let camera = Camera::new(self.cfg.gallery.field_of_view_deg, config.width, config.height);
        renderer.set_camera(&queue, &camera);

        self.gpu = Some(Gpu {
            surface,
            config,
            device,
            queue,
            renderer,
            camera,
        });
        self.relayout_grid();
        Ok(())
    }

    fn relayout_grid(&mut self) {
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        let viewport = GridViewport::at_distance(gpu.camera.fov_y_deg, gpu.camera.aspect, GRID_DISTANCE);
        self.grid.relayout(columns_for_width(gpu.config.width), viewport);
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.config.width = new_size.width.max(1);
        gpu.config.height = new_size.height.max(1);
        gpu.surface.configure(&gpu.device, &gpu.config);
        gpu.camera.resize(gpu.config.width, gpu.config.height);
        gpu.renderer.set_camera(&gpu.queue, &gpu.camera);
        debug!(
            width = gpu.config.width,
            height = gpu.config.height,
            "viewer surface resized",
        );
        self.relayout_grid();
        self.request_redraw();
    }

    /// Uploads whatever the loader has finished since the last call.
    fn drain_loader(&mut self) {
        while !self.loader_done {
            let event = match self.from_loader.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.loader_done = true;
                    break;
                }
            };
            match event {
                TextureEvent::Loaded(prepared) => {
                    let Some(gpu) = self.gpu.as_ref() else {
                        // no device yet; the texture cannot be kept
                        self.textures.fail(&prepared.uri);
                        continue;
                    };
                    match gpu.renderer.upload(&gpu.device, &gpu.queue, &prepared) {
                        Ok(texture) => {
                            debug!(uri = %prepared.uri, width = texture.width, height = texture.height, "texture uploaded");
                            self.textures.resolve(&prepared.uri, texture);
                        }
                        Err(err) => {
                            warn!(uri = %prepared.uri, error = %err, "texture upload failed");
                            self.textures.fail(&prepared.uri);
                        }
                    }
                }
                TextureEvent::Failed { uri, reason } => {
                    debug!(%uri, %reason, "texture marked failed");
                    self.textures.fail(&uri);
                }
            }
        }

        // Anything the loader never reported is treated as failed once it exits.
        if self.loader_done && !self.textures.is_settled() {
            let count = self.textures.fail_pending();
            warn!(count, "loader exited with textures outstanding");
        }
    }

    fn update_phase(&mut self) {
        let progress = self.textures.progress();
        if self.shown_progress != Some(progress) {
            self.shown_progress = Some(progress);
            if self.phase == Phase::Loading {
                info!(
                    settled = progress.settled,
                    loaded = progress.loaded,
                    total = progress.total,
                    "loading memories"
                );
                if let Some(window) = self.window.as_ref() {
                    window.set_title(&format!(
                        "{} · Loading memories… {} / {}",
                        self.cfg.window.title, progress.settled, self.catalog_len
                    ));
                }
            }
        }

        if self.phase == Phase::Loading && progress.is_complete() {
            let now = Instant::now();
            self.phase = Phase::Gallery;
            self.gallery.begin_intro(now);
            self.last_frame = Some(now);
            if let Some(window) = self.window.as_ref() {
                window.set_title(&self.cfg.window.title);
            }
            info!(
                loaded = progress.loaded,
                failed = progress.total - progress.loaded,
                intro = %humantime::format_duration(self.cfg.gallery.intro_fade),
                "gallery ready"
            );
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                if let Some(window) = self.window.clone() {
                    self.handle_resize(window.inner_size());
                }
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                if let Some(window) = self.window.clone() {
                    self.handle_resize(window.inner_size());
                }
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gallery-encoder"),
            });

        match self.phase {
            Phase::Loading => {
                gpu.renderer.render(
                    &mut encoder,
                    &view,
                    &gpu.queue,
                    &FrameSnapshot::default(),
                    &self.textures,
                    PlaneFit::ShortEdge(self.cfg.gallery.plane_size),
                    CLEAR_COLOR,
                );
            }
            Phase::Gallery => {
                let now = Instant::now();
                let dt = self
                    .last_frame
                    .map_or(Duration::ZERO, |last| now.saturating_duration_since(last))
                    .min(MAX_FRAME_DT);
                self.last_frame = Some(now);

                let snapshot = self.gallery.step(&self.pending_input, now, dt);
                self.pending_input.clear();
                gpu.renderer.render(
                    &mut encoder,
                    &view,
                    &gpu.queue,
                    snapshot,
                    &self.textures,
                    PlaneFit::ShortEdge(self.cfg.gallery.plane_size),
                    CLEAR_COLOR,
                );
            }
            Phase::Grid => {
                self.grid.fill(&mut self.grid_frame.slots);
                gpu.renderer.reserve_planes(&gpu.device, self.grid_frame.slots.len());
                gpu.renderer.render(
                    &mut encoder,
                    &view,
                    &gpu.queue,
                    &self.grid_frame,
                    &self.textures,
                    PlaneFit::Contain(self.grid.cell_extent()),
                    CLEAR_COLOR,
                );
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn push_input(&mut self, event: InputEvent) {
        match self.phase {
            Phase::Loading => {}
            Phase::Gallery => self.pending_input.push(event),
            Phase::Grid => {
                let height = self.gpu.as_ref().map_or(1, |gpu| gpu.config.height);
                let world_per_pixel = self.grid.world_per_pixel(height);
                self.grid.handle_input(event, world_per_pixel);
                self.request_redraw();
            }
        }
    }

    fn toggle_grid(&mut self) {
        self.pending_input.clear();
        match self.phase {
            Phase::Loading => {}
            Phase::Gallery => {
                self.phase = Phase::Grid;
                info!(columns = self.grid.columns(), "switched to grid view");
                self.request_redraw();
            }
            Phase::Grid => {
                // resume without replaying the time spent in the grid
                self.last_frame = Some(Instant::now());
                self.phase = Phase::Gallery;
                info!("switched to 3D view");
                self.request_redraw();
            }
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        self.cancel.cancel();
        event_loop.exit();
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            warn!("no window available; falling back to flat list");
            self.outcome = ViewerOutcome::Fallback;
            event_loop.exit();
            return;
        };

        if self.gpu.is_none() {
            if let Err(err) = self.init_gpu(window) {
                warn!(error = ?err, "GPU unavailable; falling back to flat list");
                self.outcome = ViewerOutcome::Fallback;
                event_loop.exit();
                return;
            }
        }

        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                self.close(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.push_input(InputEvent::Wheel {
                    delta_y: wheel_delta(delta),
                });
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match key_action(&event.logical_key) {
                    Some(KeyAction::Scroll(direction)) => {
                        self.push_input(InputEvent::Key(direction));
                    }
                    Some(KeyAction::ToggleGrid) => self.toggle_grid(),
                    Some(KeyAction::Close) => {
                        info!("viewer close requested from keyboard");
                        self.close(event_loop);
                    }
                    None => {}
                }
            }
            WindowEvent::Touch(touch) => {
                if let Some(event) = self.touches.on_touch(&touch) {
                    self.push_input(event);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.drain_loader();
        self.update_phase();

        match self.phase {
            Phase::Loading => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + LOADING_POLL));
            }
            Phase::Gallery => {
                event_loop.set_control_flow(ControlFlow::Wait);
                self.request_redraw();
            }
            Phase::Grid => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }
}

/// Runs the gallery window on the calling thread until it is closed or
/// `cancel` fires.
pub fn run_windowed(
    cfg: Configuration,
    catalog: &[CatalogEntry],
    from_loader: TextureReceiver,
    cancel: CancellationToken,
) -> Result<ViewerOutcome> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")?;
    let proxy = event_loop.create_proxy();

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(cfg, catalog, cancel, from_loader);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("viewer event loop failed")?;
    Ok(app.outcome)
}
