use bytemuck::{Pod, Zeroable};

use crate::layout::Viewport;
use crate::overlay::{OverlayFrame, SpinnerState};
use crate::scene::Sprite;

/// Shared by every draw in a frame; lives in bind group 0.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FrameUniforms {
    /// Logical viewport size.
    pub viewport: [f32; 2],
    pub scale_factor: f32,
    pub _padding: f32,
}

unsafe impl Zeroable for FrameUniforms {}
unsafe impl Pod for FrameUniforms {}

impl FrameUniforms {
    pub fn new(viewport: &Viewport) -> Self {
        Self {
            viewport: [viewport.width.max(1.0), viewport.height.max(1.0)],
            scale_factor: viewport.scale_factor,
            _padding: 0.0,
        }
    }
}

/// Placement of one sprite and of the displacement map that warps it, in
/// logical pixels.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpriteUniforms {
    pub origin: [f32; 2],
    pub size: [f32; 2],
    pub displacement_origin: [f32; 2],
    pub displacement_size: [f32; 2],
    pub alpha: f32,
    /// Zero disables the displacement lookup.
    pub filter_scale: f32,
    pub _padding: [f32; 2],
}

unsafe impl Zeroable for SpriteUniforms {}
unsafe impl Pod for SpriteUniforms {}

impl SpriteUniforms {
    pub fn new(sprite: &Sprite, displacement: &Sprite) -> Self {
        Self {
            origin: sprite.origin(),
            size: sprite.size(),
            displacement_origin: displacement.origin(),
            displacement_size: displacement.size(),
            alpha: sprite.alpha,
            filter_scale: sprite.filter.map(|filter| filter.scale).unwrap_or(0.0),
            _padding: [0.0; 2],
        }
    }
}

/// Inputs of the loading overlay pass.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct OverlayUniforms {
    pub viewport: [f32; 2],
    pub scale_factor: f32,
    /// Alpha of the black layer covering the scene.
    pub veil: f32,
    pub spinner_angle: f32,
    pub spinner_alpha: f32,
    /// 1.0 when the ring should be drawn in the error colour.
    pub failed: f32,
    pub _padding: f32,
}

unsafe impl Zeroable for OverlayUniforms {}
unsafe impl Pod for OverlayUniforms {}

impl OverlayUniforms {
    pub fn new(frame: &OverlayFrame, viewport: &Viewport) -> Self {
        let (spinner_angle, spinner_alpha, failed) = match frame.spinner {
            SpinnerState::Hidden => (0.0, 0.0, 0.0),
            SpinnerState::Spinning { angle } => (angle, 1.0, 0.0),
            SpinnerState::Failed => (0.0, 1.0, 1.0),
        };
        Self {
            viewport: [viewport.width.max(1.0), viewport.height.max(1.0)],
            scale_factor: viewport.scale_factor,
            veil: frame.veil(),
            spinner_angle,
            spinner_alpha,
            failed,
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TextureSize;
    use crate::overlay::OverlayPhase;
    use crate::scene::{Scene, SceneTextures};
    use crate::types::SceneTuning;

    #[test]
    fn uniform_blocks_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 16);
        assert_eq!(std::mem::size_of::<SpriteUniforms>(), 48);
        assert_eq!(std::mem::size_of::<OverlayUniforms>(), 32);
    }

    #[test]
    fn sprite_uniforms_follow_scene_geometry() {
        let mut scene = Scene::build(
            SceneTextures {
                displacement: TextureSize::new(256, 256),
                foreground: TextureSize::new(400, 300),
                background: TextureSize::new(1000, 500),
            },
            SceneTuning::default(),
        );
        scene.apply_layout(&Viewport::new(1000.0, 500.0, 1.0));
        scene.set_displacement_position([10.0, 5.0]);

        let background = SpriteUniforms::new(scene.background(), scene.displacement());
        assert_eq!(background.origin, [0.0, 0.0]);
        assert_eq!(background.size, [1000.0, 500.0]);
        assert_eq!(background.displacement_origin, [10.0, 5.0]);
        assert_eq!(background.displacement_size, [1024.0, 1024.0]);
        assert_eq!(background.alpha, 0.7);
        assert_eq!(background.filter_scale, 20.0);

        let foreground = SpriteUniforms::new(scene.foreground(), scene.displacement());
        assert_eq!(foreground.filter_scale, 40.0);
        assert_eq!(foreground.alpha, 1.0);
    }

    #[test]
    fn overlay_uniforms_encode_spinner_state() {
        let viewport = Viewport::new(800.0, 600.0, 2.0);
        let failed = OverlayUniforms::new(
            &OverlayFrame {
                phase: OverlayPhase::Failed,
                scene_opacity: 0.0,
                overlay_opacity: 1.0,
                spinner: SpinnerState::Failed,
            },
            &viewport,
        );
        assert_eq!(failed.veil, 1.0);
        assert_eq!(failed.failed, 1.0);
        assert_eq!(failed.spinner_alpha, 1.0);
        assert_eq!(failed.scale_factor, 2.0);

        let revealing = OverlayUniforms::new(
            &OverlayFrame {
                phase: OverlayPhase::Revealing,
                scene_opacity: 0.5,
                overlay_opacity: 0.5,
                spinner: SpinnerState::Hidden,
            },
            &viewport,
        );
        assert_eq!(revealing.spinner_alpha, 0.0);
        assert!((revealing.veil - 0.75).abs() < 1e-6);
    }
}
