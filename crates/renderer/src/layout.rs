//! Viewport-driven placement of the background and foreground sprites.
//!
//! Everything here is expressed in logical pixels (window units before the
//! device pixel ratio is applied). The functions are pure so they can be
//! re-run on every resize without accumulating drift.

use winit::dpi::PhysicalSize;

/// Current window size in logical pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            width,
            height,
            scale_factor,
        }
    }

    /// Converts a physical window size into logical layout units.
    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let scale_factor = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        let logical = size.to_logical::<f64>(scale_factor);
        Self::new(
            logical.width as f32,
            logical.height as f32,
            scale_factor as f32,
        )
    }

    pub fn center(&self) -> [f32; 2] {
        [self.width / 2.0, self.height / 2.0]
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height.max(f32::EPSILON)
    }
}

/// Native pixel dimensions of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

impl TextureSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / (self.height.max(1)) as f32
    }
}

/// Uniform scale plus the position of the sprite's anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteTransform {
    pub position: [f32; 2],
    pub scale: f32,
}

impl SpriteTransform {
    pub fn new(position: [f32; 2], scale: f32) -> Self {
        Self { position, scale }
    }
}

impl Default for SpriteTransform {
    fn default() -> Self {
        Self::new([0.0, 0.0], 1.0)
    }
}

/// Breakpoints and proportions used by [`compute_layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutRules {
    /// Viewports narrower than this are laid out as mobile.
    pub mobile_breakpoint: f32,
    /// Foreground width on desktop viewports.
    pub desktop_max_width: f32,
    /// Foreground width as a multiple of the viewport width on mobile.
    pub mobile_width_factor: f32,
    /// Foreground centre sits at `height / divisor`.
    pub foreground_vertical_divisor: f32,
}

impl Default for LayoutRules {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 768.0,
            desktop_max_width: 820.0,
            mobile_width_factor: 1.1,
            foreground_vertical_divisor: 1.3,
        }
    }
}

impl LayoutRules {
    pub fn is_mobile(&self, viewport: &Viewport) -> bool {
        viewport.width < self.mobile_breakpoint
    }

    /// Width the foreground should occupy for the given viewport.
    pub fn foreground_target_width(&self, viewport: &Viewport) -> f32 {
        if self.is_mobile(viewport) {
            viewport.width * self.mobile_width_factor
        } else {
            self.desktop_max_width
        }
    }
}

/// Resolved transforms for both visible sprites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLayout {
    pub foreground: SpriteTransform,
    pub background: SpriteTransform,
}

pub fn compute_layout(
    viewport: &Viewport,
    foreground: TextureSize,
    background: TextureSize,
    rules: &LayoutRules,
) -> SceneLayout {
    SceneLayout {
        foreground: foreground_transform(viewport, foreground, rules),
        background: background_transform(viewport, background),
    }
}

pub fn foreground_transform(
    viewport: &Viewport,
    texture: TextureSize,
    rules: &LayoutRules,
) -> SpriteTransform {
    let target_width = rules.foreground_target_width(viewport);
    let scale = target_width / texture.width.max(1) as f32;
    SpriteTransform::new(
        [
            viewport.width / 2.0,
            viewport.height / rules.foreground_vertical_divisor,
        ],
        scale,
    )
}

/// Cover-fit: the background fills the viewport on both axes and overflows on one.
pub fn background_transform(viewport: &Viewport, texture: TextureSize) -> SpriteTransform {
    let scale = if viewport.aspect_ratio() > texture.aspect_ratio() {
        viewport.width / texture.width.max(1) as f32
    } else {
        viewport.height / texture.height.max(1) as f32
    };
    SpriteTransform::new(viewport.center(), scale)
}
