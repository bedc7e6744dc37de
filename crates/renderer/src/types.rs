use std::time::Duration;

use crate::assets::AssetRoot;
use crate::layout::LayoutRules;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl Default for Antialiasing {
    fn default() -> Self {
        Self::Auto
    }
}

/// Which graphics API family the surface bootstrap should try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Vulkan, Metal or DX12 first, then GL when none of them yields an adapter.
    #[default]
    Auto,
    /// Only the modern backends.
    Primary,
    /// Only the GL backend.
    Gl,
}

impl BackendPreference {
    /// Backend families to try, in order.
    pub fn candidates(self) -> &'static [wgpu::Backends] {
        const AUTO: [wgpu::Backends; 2] = [wgpu::Backends::PRIMARY, wgpu::Backends::GL];
        const PRIMARY: [wgpu::Backends; 1] = [wgpu::Backends::PRIMARY];
        const GL: [wgpu::Backends; 1] = [wgpu::Backends::GL];
        match self {
            BackendPreference::Auto => &AUTO,
            BackendPreference::Primary => &PRIMARY,
            BackendPreference::Gl => &GL,
        }
    }
}

impl std::fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendPreference::Auto => f.write_str("auto"),
            BackendPreference::Primary => f.write_str("primary"),
            BackendPreference::Gl => f.write_str("gl"),
        }
    }
}

/// How the window should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Borderless full-screen on the current monitor.
    Fullscreen,
    /// Regular decorated window with the given physical size.
    Windowed { width: u32, height: u32 },
}

impl Default for WindowMode {
    fn default() -> Self {
        Self::Fullscreen
    }
}

/// Strength of the two displacement filters and the size of their shared source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterTuning {
    pub displacement_sprite_scale: f32,
    pub background_scale: f32,
    pub foreground_scale: f32,
}

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            displacement_sprite_scale: 4.0,
            background_scale: 20.0,
            foreground_scale: 40.0,
        }
    }
}

/// Loading overlay sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTiming {
    /// Pause between the scene becoming ready and the start of the fade.
    pub grace: Duration,
    /// Length of the cross fade between overlay and scene.
    pub fade: Duration,
}

impl Default for OverlayTiming {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(100),
            fade: Duration::from_millis(1500),
        }
    }
}

/// Everything that shapes the scene once the assets are in memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneTuning {
    pub layout: LayoutRules,
    pub filters: FilterTuning,
    pub background_alpha: f32,
    pub velocity: f32,
    pub overlay: OverlayTiming,
}

impl Default for SceneTuning {
    fn default() -> Self {
        Self {
            layout: LayoutRules::default(),
            filters: FilterTuning::default(),
            background_alpha: 0.7,
            velocity: 2.0,
            overlay: OverlayTiming::default(),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors the merged CLI flags and config file: where the
/// scene images live, how the window is presented, and the scene tuning.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Directory or base URL holding the three scene images.
    pub asset_root: AssetRoot,
    /// Full-screen or windowed presentation.
    pub window_mode: WindowMode,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    /// Graphics backend family preference.
    pub backend: BackendPreference,
    /// Layout, filter, animation and overlay tuning.
    pub tuning: SceneTuning,
}

impl RendererConfig {
    pub fn new(asset_root: AssetRoot) -> Self {
        Self {
            asset_root,
            window_mode: WindowMode::default(),
            antialiasing: Antialiasing::default(),
            backend: BackendPreference::default(),
            tuning: SceneTuning::default(),
        }
    }
}
