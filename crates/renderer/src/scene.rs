//! CPU-side description of the three sprites and the state that drives them.
//!
//! The displacement sprite comes first and is never drawn; it only supplies
//! the distortion source for the two filters. Background and foreground are
//! anchored at their centres so layout positions centre them.

use std::time::Instant;

use crate::animation::DisplacementDriver;
use crate::layout::{compute_layout, SceneLayout, SpriteTransform, TextureSize, Viewport};
use crate::overlay::{OverlayController, OverlayFrame};
use crate::types::SceneTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteRole {
    Displacement,
    Background,
    Foreground,
}

/// Displacement filter bound to the scene's shared displacement sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementFilter {
    /// Maximum pixel offset applied by the filter.
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub role: SpriteRole,
    pub texture: TextureSize,
    pub transform: SpriteTransform,
    /// Normalised reference point the position refers to.
    pub anchor: [f32; 2],
    pub alpha: f32,
    pub visible: bool,
    pub filter: Option<DisplacementFilter>,
}

impl Sprite {
    fn new(role: SpriteRole, texture: TextureSize) -> Self {
        Self {
            role,
            texture,
            transform: SpriteTransform::default(),
            anchor: [0.0, 0.0],
            alpha: 1.0,
            visible: true,
            filter: None,
        }
    }

    /// On-screen size in logical pixels.
    pub fn size(&self) -> [f32; 2] {
        [
            self.texture.width as f32 * self.transform.scale,
            self.texture.height as f32 * self.transform.scale,
        ]
    }

    /// Top-left corner in logical pixels.
    pub fn origin(&self) -> [f32; 2] {
        let size = self.size();
        [
            self.transform.position[0] - self.anchor[0] * size[0],
            self.transform.position[1] - self.anchor[1] * size[1],
        ]
    }
}

/// Native sizes of the three scene textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTextures {
    pub displacement: TextureSize,
    pub foreground: TextureSize,
    pub background: TextureSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Draw order: displacement, background, foreground.
    sprites: [Sprite; 3],
    tuning: SceneTuning,
}

impl Scene {
    pub fn build(textures: SceneTextures, tuning: SceneTuning) -> Self {
        let mut displacement = Sprite::new(SpriteRole::Displacement, textures.displacement);
        displacement.transform.scale = tuning.filters.displacement_sprite_scale;
        displacement.visible = false;

        let mut background = Sprite::new(SpriteRole::Background, textures.background);
        background.anchor = [0.5, 0.5];
        background.alpha = tuning.background_alpha;
        background.filter = Some(DisplacementFilter {
            scale: tuning.filters.background_scale,
        });

        let mut foreground = Sprite::new(SpriteRole::Foreground, textures.foreground);
        foreground.anchor = [0.5, 0.5];
        foreground.filter = Some(DisplacementFilter {
            scale: tuning.filters.foreground_scale,
        });

        Self {
            sprites: [displacement, background, foreground],
            tuning,
        }
    }

    pub fn sprites(&self) -> &[Sprite; 3] {
        &self.sprites
    }

    pub fn displacement(&self) -> &Sprite {
        &self.sprites[0]
    }

    pub fn background(&self) -> &Sprite {
        &self.sprites[1]
    }

    pub fn foreground(&self) -> &Sprite {
        &self.sprites[2]
    }

    /// Sprites that end up on screen, back to front.
    pub fn visible_sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.sprites.iter().filter(|sprite| sprite.visible)
    }

    pub fn apply_layout(&mut self, viewport: &Viewport) -> SceneLayout {
        let layout = compute_layout(
            viewport,
            self.sprites[2].texture,
            self.sprites[1].texture,
            &self.tuning.layout,
        );
        self.sprites[1].transform = layout.background;
        self.sprites[2].transform = layout.foreground;
        layout
    }

    /// Places the displacement sprite, wrapped by its own on-screen size.
    ///
    /// The map samples with repeat addressing, so shifting it by whole tiles
    /// leaves the picture unchanged while keeping the offset small enough
    /// for `f32` on the GPU.
    pub fn set_displacement_position(&mut self, position: [f64; 2]) {
        let size = self.sprites[0].size();
        self.sprites[0].transform.position = [
            wrap_offset(position[0], size[0]),
            wrap_offset(position[1], size[1]),
        ];
    }
}

fn wrap_offset(value: f64, period: f32) -> f32 {
    if period > 0.0 {
        value.rem_euclid(f64::from(period)) as f32
    } else {
        value as f32
    }
}

/// Per-window state shared by the resize, frame and loading handlers.
pub struct SceneContext {
    viewport: Viewport,
    tuning: SceneTuning,
    scene: Option<Scene>,
    driver: DisplacementDriver,
    overlay: OverlayController,
}

impl SceneContext {
    pub fn new(viewport: Viewport, tuning: SceneTuning, now: Instant) -> Self {
        Self {
            viewport,
            tuning,
            scene: None,
            driver: DisplacementDriver::new(tuning.velocity),
            overlay: OverlayController::new(tuning.overlay, now),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    pub fn driver(&self) -> &DisplacementDriver {
        &self.driver
    }

    /// Installs the freshly built scene, lays it out, and starts the reveal.
    pub fn install_scene(&mut self, textures: SceneTextures, now: Instant) -> SceneLayout {
        let mut scene = Scene::build(textures, self.tuning);
        scene.set_displacement_position(self.driver.position());
        let layout = scene.apply_layout(&self.viewport);
        self.scene = Some(scene);
        self.overlay.mark_ready(now);
        layout
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.overlay.mark_failed(reason);
    }

    /// Records the new viewport and re-runs layout when a scene exists.
    pub fn resize(&mut self, viewport: Viewport) -> Option<SceneLayout> {
        self.viewport = viewport;
        self.scene
            .as_mut()
            .map(|scene| scene.apply_layout(&viewport))
    }

    /// Starts a frame: acquires the target first and only advances the
    /// animation once that succeeds, so dropped frames do not move it.
    pub fn begin_frame<F, E>(
        &mut self,
        now: Instant,
        acquire: impl FnOnce() -> Result<F, E>,
    ) -> Result<(F, OverlayFrame), E> {
        let target = acquire()?;
        Ok((target, self.advance_frame(now)))
    }

    /// Advances one rendered frame and returns the overlay state for it.
    pub fn advance_frame(&mut self, now: Instant) -> OverlayFrame {
        if let Some(scene) = self.scene.as_mut() {
            let position = self.driver.tick();
            scene.set_displacement_position(position);
        }
        self.overlay.sample(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayPhase;

    fn textures() -> SceneTextures {
        SceneTextures {
            displacement: TextureSize::new(512, 512),
            foreground: TextureSize::new(400, 300),
            background: TextureSize::new(1920, 1080),
        }
    }

    #[test]
    fn builds_sprites_in_draw_order() {
        let scene = Scene::build(textures(), SceneTuning::default());
        let roles: Vec<_> = scene.sprites().iter().map(|sprite| sprite.role).collect();
        assert_eq!(
            roles,
            vec![
                SpriteRole::Displacement,
                SpriteRole::Background,
                SpriteRole::Foreground
            ]
        );
        let visible: Vec<_> = scene.visible_sprites().map(|sprite| sprite.role).collect();
        assert_eq!(visible, vec![SpriteRole::Background, SpriteRole::Foreground]);
    }

    #[test]
    fn filters_and_anchors_follow_tuning() {
        let scene = Scene::build(textures(), SceneTuning::default());
        assert_eq!(scene.displacement().transform.scale, 4.0);
        assert!(scene.displacement().filter.is_none());
        assert_eq!(scene.background().alpha, 0.7);
        assert_eq!(
            scene.background().filter,
            Some(DisplacementFilter { scale: 20.0 })
        );
        assert_eq!(
            scene.foreground().filter,
            Some(DisplacementFilter { scale: 40.0 })
        );
        assert_eq!(scene.background().anchor, [0.5, 0.5]);
        assert_eq!(scene.foreground().anchor, [0.5, 0.5]);
        assert_eq!(scene.foreground().alpha, 1.0);
    }

    #[test]
    fn centred_anchor_places_sprite_around_position() {
        let mut scene = Scene::build(textures(), SceneTuning::default());
        scene.apply_layout(&Viewport::new(1024.0, 768.0, 1.0));
        let foreground = scene.foreground();
        let size = foreground.size();
        assert!((size[0] - 820.0).abs() < 1e-3);
        let origin = foreground.origin();
        assert!((origin[0] - (512.0 - 410.0)).abs() < 1e-3);
    }

    #[test]
    fn resize_before_scene_only_records_viewport() {
        let now = Instant::now();
        let mut context =
            SceneContext::new(Viewport::new(800.0, 600.0, 1.0), SceneTuning::default(), now);
        assert!(context.resize(Viewport::new(320.0, 640.0, 2.0)).is_none());
        assert_eq!(context.viewport().width, 320.0);

        let layout = context.install_scene(textures(), now);
        assert!((layout.foreground.scale - 0.88).abs() < 1e-5);
        assert_eq!(context.overlay().phase(), OverlayPhase::Revealing);
    }

    #[test]
    fn frames_only_animate_once_scene_exists() {
        let now = Instant::now();
        let mut context =
            SceneContext::new(Viewport::new(800.0, 600.0, 1.0), SceneTuning::default(), now);
        context.advance_frame(now);
        assert_eq!(context.driver().frames(), 0);

        context.install_scene(textures(), now);
        for _ in 0..10 {
            context.advance_frame(now);
        }
        let scene = context.scene().expect("scene installed");
        assert_eq!(scene.displacement().transform.position, [20.0, 10.0]);
    }

    #[test]
    fn displacement_position_wraps_by_sprite_size() {
        let mut scene = Scene::build(textures(), SceneTuning::default());
        // 512px texture at scale 4.
        assert_eq!(scene.displacement().size(), [2048.0, 2048.0]);
        scene.set_displacement_position([2048.0 * 3.0 + 10.0, 2048.0 + 5.0]);
        assert_eq!(scene.displacement().transform.position, [10.0, 5.0]);

        scene.set_displacement_position([33_554_434.0, 16_777_217.0]);
        assert_eq!(scene.displacement().transform.position, [2.0, 1.0]);
    }

    #[test]
    fn dropped_frames_do_not_advance_animation() {
        let now = Instant::now();
        let mut context =
            SceneContext::new(Viewport::new(800.0, 600.0, 1.0), SceneTuning::default(), now);
        context.install_scene(textures(), now);

        let dropped = context.begin_frame(now, || Err::<(), _>("timeout"));
        assert_eq!(dropped.unwrap_err(), "timeout");
        assert_eq!(context.driver().frames(), 0);

        let (target, frame) = context
            .begin_frame(now, || Ok::<_, &str>(7))
            .expect("frame acquired");
        assert_eq!(target, 7);
        assert_eq!(frame.phase, OverlayPhase::Revealing);
        assert_eq!(context.driver().frames(), 1);
        assert_eq!(
            context.scene().expect("scene installed").displacement().transform.position,
            [2.0, 1.0]
        );
    }

    #[test]
    fn failure_is_reported_through_overlay() {
        let now = Instant::now();
        let mut context =
            SceneContext::new(Viewport::new(800.0, 600.0, 1.0), SceneTuning::default(), now);
        context.fail("asset fetch failed");
        let frame = context.advance_frame(now);
        assert_eq!(frame.phase, OverlayPhase::Failed);
        assert!(context.scene().is_none());
    }
}
