//! Renderer crate for Seascape.
//!
//! Draws a background image and a foreground sprite, both warped by a
//! scrolling displacement map, behind a loading overlay that fades away once
//! the scene is ready. The overall flow is:
//!
//! ```text
//!   seascape CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ render_frame()
//!          │                 ▲                 │
//!          │                 │                 ├─▶ SceneContext::advance_frame()
//!          ▼                 │                 └─▶ GpuState::render() ─▶ surface
//!   asset loader thread ──SceneEvent::AssetsLoaded
//! ```
//!
//! `WindowState` owns the GPU resources and the `SceneContext` (viewport,
//! scene, displacement driver, overlay controller). Other threads talk to the
//! loop only through [`SceneEvent`]s; [`TeardownHandle`] is the public way to
//! ask the loop to stop.

mod animation;
mod assets;
mod gpu;
mod layout;
mod overlay;
mod scene;
mod timeline;
mod types;
mod window;

use anyhow::{anyhow, Result};
use winit::event_loop::{EventLoop, EventLoopBuilder, EventLoopProxy};

pub use animation::DisplacementDriver;
pub use assets::{load_scene_images, AssetError, AssetKind, AssetRoot, LoadedImage, SceneImages};
pub use layout::{
    background_transform, compute_layout, foreground_transform, LayoutRules, SceneLayout,
    SpriteTransform, TextureSize, Viewport,
};
pub use overlay::{OverlayController, OverlayFrame, OverlayPhase, SpinnerState};
pub use scene::{DisplacementFilter, Scene, SceneContext, SceneTextures, Sprite, SpriteRole};
pub use timeline::{FadeCurve, FadeEnvelope};
pub use types::{
    Antialiasing, BackendPreference, FilterTuning, OverlayTiming, RendererConfig, SceneTuning,
    WindowMode,
};
pub use window::SceneEvent;

/// Startup failures, as seen by the overlay and the caller.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to initialise rendering surface: {0}")]
    Surface(String),
    #[error("failed to load scene assets")]
    Assets(#[from] AssetError),
}

/// Asks a running [`Renderer`] to close its window and return from `run`.
///
/// Cheap to clone and usable from any thread. Requests sent after the loop
/// has exited are ignored.
#[derive(Clone)]
pub struct TeardownHandle {
    proxy: EventLoopProxy<SceneEvent>,
}

impl TeardownHandle {
    pub fn request(&self) {
        if self.proxy.send_event(SceneEvent::Teardown).is_err() {
            tracing::debug!("teardown requested after event loop exit");
        }
    }
}

/// Entry point that owns the event loop until [`Renderer::run`] is called.
pub struct Renderer {
    config: RendererConfig,
    event_loop: EventLoop<SceneEvent>,
}

impl Renderer {
    /// Creates the event loop. Must be called on the main thread.
    pub fn new(config: RendererConfig) -> Result<Self> {
        let event_loop = EventLoopBuilder::<SceneEvent>::with_user_event()
            .build()
            .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
        Ok(Self { config, event_loop })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle {
            proxy: self.event_loop.create_proxy(),
        }
    }

    /// Opens the window and blocks until it is closed or torn down.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            assets = %self.config.asset_root,
            mode = ?self.config.window_mode,
            backend = %self.config.backend,
            "starting renderer"
        );
        window::run_event_loop(self.event_loop, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::path::PathBuf;

    #[test]
    fn asset_failures_convert_into_startup_errors() {
        let failure = StartupError::from(AssetError::Read {
            kind: AssetKind::Background,
            path: PathBuf::from("public/meri2.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        });
        assert_eq!(failure.to_string(), "failed to load scene assets");
        let source = failure.source().expect("asset error source");
        assert!(source.to_string().contains("background"));
    }
}
