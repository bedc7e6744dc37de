use std::time::{Duration, Instant};

/// Timing functions for the overlay cross fade.
///
/// `EaseIn` and `EaseOut` follow the CSS keywords of the same name
/// (`cubic-bezier(0.42, 0, 1, 1)` and `cubic-bezier(0, 0, 0.58, 1)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeCurve {
    Linear,
    EaseIn,
    EaseOut,
}

impl FadeCurve {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => clamped,
            FadeCurve::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, clamped),
            FadeCurve::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, clamped),
        }
    }
}

fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, x: f32) -> f32 {
    fn axis(p1: f32, p2: f32, s: f32) -> f32 {
        let inv = 1.0 - s;
        3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
    }

    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // x(s) is monotonic for control points inside the unit square.
    let (mut low, mut high) = (0.0f32, 1.0f32);
    let mut s = x;
    for _ in 0..32 {
        let estimate = axis(x1, x2, s);
        if (estimate - x).abs() < 1e-6 {
            break;
        }
        if estimate < x {
            low = s;
        } else {
            high = s;
        }
        s = 0.5 * (low + high);
    }
    axis(y1, y2, s)
}

/// A single timed transition starting at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FadeEnvelope {
    start: Instant,
    duration: Duration,
    curve: FadeCurve,
}

impl FadeEnvelope {
    pub fn new(start: Instant, duration: Duration, curve: FadeCurve) -> Self {
        Self {
            start,
            duration,
            curve,
        }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.start + self.duration
    }

    /// Eased progress in `0..=1` and whether the transition has completed.
    pub fn progress(&self, now: Instant) -> (f32, bool) {
        if self.duration.is_zero() {
            let finished = now >= self.start;
            return (if finished { 1.0 } else { 0.0 }, finished);
        }
        let elapsed = now.saturating_duration_since(self.start);
        let linear = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        (self.curve.sample(linear), linear >= 1.0)
    }
}
