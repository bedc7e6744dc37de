/// Scrolls the displacement sprite by a fixed step every rendered frame.
///
/// The position accumulates in `f64`; the scene wraps it by the displacement
/// sprite's size before it reaches the GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementDriver {
    position: [f64; 2],
    velocity: f64,
    frames: u64,
}

impl DisplacementDriver {
    pub fn new(velocity: f32) -> Self {
        Self {
            position: [0.0, 0.0],
            velocity: f64::from(velocity),
            frames: 0,
        }
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Advances one frame: `x += velocity`, `y += velocity / 2`.
    pub fn tick(&mut self) -> [f64; 2] {
        self.position[0] += self.velocity;
        self.position[1] += self.velocity * 0.5;
        self.frames = self.frames.saturating_add(1);
        self.position
    }
}
