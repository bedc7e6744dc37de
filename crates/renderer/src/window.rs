use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use tracing::{debug, error, info};

use crate::assets::{load_scene_images, AssetError, AssetRoot, SceneImages};
use crate::gpu::GpuState;
use crate::layout::{SceneLayout, Viewport};
use crate::scene::SceneContext;
use crate::types::{RendererConfig, WindowMode};
use crate::StartupError;

/// Messages delivered to the event loop from other threads.
#[derive(Debug)]
pub enum SceneEvent {
    /// The asset loader finished, successfully or not.
    AssetsLoaded(Result<SceneImages, AssetError>),
    /// Close the window and leave the event loop.
    Teardown,
}

/// GPU state plus the scene context for the one window.
pub(crate) struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    context: SceneContext,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig, now: Instant) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, config.antialiasing, config.backend)
            .map_err(|err| StartupError::Surface(format!("{err:#}")))?;
        let viewport = Viewport::from_physical(gpu.size(), window.scale_factor());
        let context = SceneContext::new(viewport, config.tuning, now);
        Ok(Self {
            window,
            gpu,
            context,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.gpu.size()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        let viewport = Viewport::from_physical(self.gpu.size(), self.window.scale_factor());
        if let Some(layout) = self.context.resize(viewport) {
            log_layout(&viewport, &layout);
        }
    }

    pub(crate) fn handle_assets(&mut self, result: Result<SceneImages, AssetError>, now: Instant) {
        match result {
            Ok(images) => match self.gpu.install_scene(&images) {
                Ok(textures) => {
                    let layout = self.context.install_scene(textures, now);
                    info!("scene ready");
                    log_layout(self.context.viewport(), &layout);
                }
                Err(err) => self.handle_assets(Err(err), now),
            },
            Err(err) => {
                let failure = StartupError::from(err);
                error!(error = %format_chain(&failure), "scene failed to load");
                self.context.fail(failure.to_string());
            }
        }
    }

    pub(crate) fn render_frame(&mut self, now: Instant) -> Result<(), wgpu::SurfaceError> {
        let gpu = &self.gpu;
        let (frame, overlay) = self.context.begin_frame(now, || gpu.acquire_frame())?;
        tracing::trace!(
            phase = ?overlay.phase,
            veil = overlay.veil(),
            position = ?self.context.driver().position(),
            "frame"
        );
        self.gpu
            .render(frame, self.context.scene(), self.context.viewport(), &overlay);
        Ok(())
    }
}

fn log_layout(viewport: &Viewport, layout: &SceneLayout) {
    debug!(
        width = viewport.width,
        height = viewport.height,
        scale_factor = viewport.scale_factor,
        foreground_scale = layout.foreground.scale,
        foreground_position = ?layout.foreground.position,
        background_scale = layout.background.scale,
        "layout updated"
    );
}

fn format_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn spawn_asset_loader(root: AssetRoot, proxy: EventLoopProxy<SceneEvent>) -> Result<()> {
    thread::Builder::new()
        .name("scene-assets".into())
        .spawn(move || {
            info!(root = %root, "loading scene assets");
            let result = load_scene_images(&root);
            if proxy.send_event(SceneEvent::AssetsLoaded(result)).is_err() {
                debug!("event loop closed before assets arrived; discarding");
            }
        })
        .map_err(|err| anyhow!("failed to spawn asset loader thread: {err}"))?;
    Ok(())
}

fn build_window(event_loop: &EventLoop<SceneEvent>, mode: WindowMode) -> Result<Window> {
    let mut builder = WindowBuilder::new().with_title("Seascape");
    builder = match mode {
        WindowMode::Fullscreen => builder.with_fullscreen(Some(Fullscreen::Borderless(None))),
        WindowMode::Windowed { width, height } => {
            builder.with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
        }
    };
    builder
        .build(event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))
}

pub(crate) fn run_event_loop(
    event_loop: EventLoop<SceneEvent>,
    config: RendererConfig,
) -> Result<()> {
    let window = Arc::new(build_window(&event_loop, config.window_mode)?);
    let mut state = match WindowState::new(window, &config, Instant::now()) {
        Ok(state) => state,
        Err(err) => {
            error!(error = %format!("{err:#}"), "renderer startup failed");
            return Err(err);
        }
    };

    // Surface first, then assets.
    spawn_asset_loader(config.asset_root.clone(), event_loop.create_proxy())?;
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(SceneEvent::AssetsLoaded(result)) => {
            state.handle_assets(result, Instant::now());
        }
        Event::UserEvent(SceneEvent::Teardown) => {
            info!("teardown requested");
            elwt.exit();
        }
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed
                        && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                    {
                        elwt.exit();
                    }
                }
                WindowEvent::Resized(new_size) => {
                    state.resize(new_size);
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    // A Resized event with the new physical size follows.
                    let size = state.window().inner_size();
                    state.resize(size);
                }
                WindowEvent::RedrawRequested => match state.render_frame(Instant::now()) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.resize(state.size());
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; exiting");
                        elwt.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("surface timeout; retrying next frame");
                    }
                    Err(other) => {
                        tracing::warn!("surface error: {other:?}; retrying next frame");
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            state.window().request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
