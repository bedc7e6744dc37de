//! Loading overlay controller.
//!
//! The overlay covers the window with opaque black and a spinner ring while
//! the scene loads. Once the scene is ready the spinner disappears, and after
//! a short grace period the scene fades in while the overlay fades out. At the
//! end of the fade the overlay is detached and never drawn again.
//!
//! ```text
//!   Loading ──ready──▶ Revealing ──fade done──▶ Detached
//!      │
//!      └──failed──▶ Failed (red ring, never detaches)
//! ```

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use crate::timeline::{FadeCurve, FadeEnvelope};
use crate::types::OverlayTiming;

/// One spinner revolution.
const SPINNER_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Loading,
    Revealing,
    Detached,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinnerState {
    Hidden,
    /// Rotation in radians, clockwise from the top.
    Spinning { angle: f32 },
    Failed,
}

/// What the overlay pass should draw for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayFrame {
    pub phase: OverlayPhase,
    /// Opacity of the rendered scene (the "canvas").
    pub scene_opacity: f32,
    /// Opacity of the black overlay layer.
    pub overlay_opacity: f32,
    pub spinner: SpinnerState,
}

impl OverlayFrame {
    pub fn overlay_attached(&self) -> bool {
        self.phase != OverlayPhase::Detached
    }

    /// Alpha of a single black layer equivalent to fading the scene against a
    /// black page and then covering it with the overlay.
    pub fn veil(&self) -> f32 {
        1.0 - self.scene_opacity * (1.0 - self.overlay_opacity)
    }
}

#[derive(Debug)]
enum State {
    Loading,
    Revealing {
        scene_fade: FadeEnvelope,
        overlay_fade: FadeEnvelope,
    },
    Detached,
    Failed,
}

#[derive(Debug)]
pub struct OverlayController {
    started: Instant,
    timing: OverlayTiming,
    state: State,
    failure: Option<String>,
}

impl OverlayController {
    pub fn new(timing: OverlayTiming, now: Instant) -> Self {
        Self {
            started: now,
            timing,
            state: State::Loading,
            failure: None,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        match self.state {
            State::Loading => OverlayPhase::Loading,
            State::Revealing { .. } => OverlayPhase::Revealing,
            State::Detached => OverlayPhase::Detached,
            State::Failed => OverlayPhase::Failed,
        }
    }

    /// Message of the startup failure, if any.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// The scene is built and laid out; schedule the reveal.
    pub fn mark_ready(&mut self, now: Instant) {
        if !matches!(self.state, State::Loading) {
            tracing::warn!(phase = ?self.phase(), "overlay ready signal ignored");
            return;
        }
        let fade_start = now + self.timing.grace;
        self.state = State::Revealing {
            scene_fade: FadeEnvelope::new(fade_start, self.timing.fade, FadeCurve::EaseIn),
            overlay_fade: FadeEnvelope::new(fade_start, self.timing.fade, FadeCurve::EaseOut),
        };
        tracing::debug!(
            load_ms = now.saturating_duration_since(self.started).as_millis(),
            "scene ready; overlay reveal scheduled"
        );
    }

    /// Startup failed; keep the overlay up and switch to the error ring.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        if !matches!(self.state, State::Loading) {
            tracing::warn!(phase = ?self.phase(), "overlay failure signal ignored");
            return;
        }
        self.failure = Some(reason.into());
        self.state = State::Failed;
    }

    /// Samples the overlay for the frame presented at `now`.
    pub fn sample(&mut self, now: Instant) -> OverlayFrame {
        match &self.state {
            State::Loading => {
                let elapsed = now.saturating_duration_since(self.started);
                let turns = elapsed.as_secs_f32() / SPINNER_PERIOD.as_secs_f32();
                OverlayFrame {
                    phase: OverlayPhase::Loading,
                    scene_opacity: 0.0,
                    overlay_opacity: 1.0,
                    spinner: SpinnerState::Spinning {
                        angle: turns.fract() * TAU,
                    },
                }
            }
            State::Revealing {
                scene_fade,
                overlay_fade,
            } => {
                let (scene, _) = scene_fade.progress(now);
                let (overlay, finished) = overlay_fade.progress(now);
                if finished {
                    self.state = State::Detached;
                    tracing::debug!("loading overlay detached");
                    return Self::detached_frame();
                }
                OverlayFrame {
                    phase: OverlayPhase::Revealing,
                    scene_opacity: scene,
                    overlay_opacity: 1.0 - overlay,
                    spinner: SpinnerState::Hidden,
                }
            }
            State::Detached => Self::detached_frame(),
            State::Failed => OverlayFrame {
                phase: OverlayPhase::Failed,
                scene_opacity: 0.0,
                overlay_opacity: 1.0,
                spinner: SpinnerState::Failed,
            },
        }
    }

    fn detached_frame() -> OverlayFrame {
        OverlayFrame {
            phase: OverlayPhase::Detached,
            scene_opacity: 1.0,
            overlay_opacity: 0.0,
            spinner: SpinnerState::Hidden,
        }
    }
}
