//! GPU side of the scene.
//!
//! - `context` owns wgpu instance/device/surface wiring, walks the backend
//!   fallback chain, and rebuilds swapchain state when the window resizes.
//! - `textures` uploads the decoded scene images with the sampler each role
//!   needs (repeat for the displacement map, clamp for the sprites).
//! - `pipeline` builds the sprite and overlay pipelines from WGSL.
//! - `uniforms` mirrors the WGSL uniform blocks.
//! - `state` glues everything together and exposes the `GpuState` API used by
//!   `window`.

mod context;
mod pipeline;
mod state;
mod textures;
mod uniforms;

pub(crate) use state::GpuState;
