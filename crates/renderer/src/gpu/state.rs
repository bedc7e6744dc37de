use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use winit::dpi::PhysicalSize;

use crate::assets::{AssetError, SceneImages};
use crate::layout::Viewport;
use crate::overlay::OverlayFrame;
use crate::scene::{Scene, SceneTextures, Sprite, SpriteRole};
use crate::types::{Antialiasing, BackendPreference};

use super::context::GpuContext;
use super::pipeline::{PipelineLayouts, RenderPipelines};
use super::textures::{upload_scene_textures, SceneTexture, SceneTextureSet};
use super::uniforms::{FrameUniforms, OverlayUniforms, SpriteUniforms};

pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    pipelines: RenderPipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    overlay_buffer: wgpu::Buffer,
    overlay_bind_group: wgpu::BindGroup,
    scene: Option<SceneResources>,
    multisample_target: Option<MultisampleTarget>,
    last_stats: Instant,
    frames_since_stats: u32,
}

/// Uniform buffer and bind group of one drawable sprite.
struct SpriteBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct SceneResources {
    _textures: SceneTextureSet,
    background: SpriteBinding,
    foreground: SpriteBinding,
}

impl SceneResources {
    fn binding(&self, role: SpriteRole) -> Option<&SpriteBinding> {
        match role {
            SpriteRole::Background => Some(&self.background),
            SpriteRole::Foreground => Some(&self.foreground),
            SpriteRole::Displacement => None,
        }
    }
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    fn for_context(context: &GpuContext) -> Option<Self> {
        (context.sample_count > 1).then(|| {
            Self::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        })
    }
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        backend: BackendPreference,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing, backend)?;
        let layouts = PipelineLayouts::new(&context.device);
        let pipelines = RenderPipelines::new(
            &context.device,
            &layouts,
            context.surface_format,
            context.sample_count,
        );

        let (frame_buffer, frame_bind_group) = create_uniform_binding::<FrameUniforms>(
            &context.device,
            &layouts.frame_layout,
            "frame uniforms",
        );
        let (overlay_buffer, overlay_bind_group) = create_uniform_binding::<OverlayUniforms>(
            &context.device,
            &layouts.overlay_layout,
            "overlay uniforms",
        );

        let multisample_target = MultisampleTarget::for_context(&context);
        tracing::info!(
            backend = ?context.backend,
            width = context.size.width,
            height = context.size.height,
            sample_count = context.sample_count,
            "GPU ready"
        );

        Ok(Self {
            context,
            layouts,
            pipelines,
            frame_buffer,
            frame_bind_group,
            overlay_buffer,
            overlay_bind_group,
            scene: None,
            multisample_target,
            last_stats: Instant::now(),
            frames_since_stats: 0,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.multisample_target = MultisampleTarget::for_context(&self.context);
    }

    /// Uploads the decoded images and prepares one binding per drawn sprite.
    pub(crate) fn install_scene(
        &mut self,
        images: &SceneImages,
    ) -> Result<SceneTextures, AssetError> {
        let device = &self.context.device;
        let textures = upload_scene_textures(
            device,
            &self.context.queue,
            &images.displacement,
            &images.foreground,
            &images.background,
        )?;
        let background = create_sprite_binding(
            device,
            &self.layouts.sprite_layout,
            "background",
            &textures.background,
            &textures.displacement,
        );
        let foreground = create_sprite_binding(
            device,
            &self.layouts.sprite_layout,
            "foreground",
            &textures.foreground,
            &textures.displacement,
        );
        let sizes = SceneTextures {
            displacement: textures.displacement.size,
            foreground: textures.foreground.size,
            background: textures.background.size,
        };
        self.scene = Some(SceneResources {
            _textures: textures,
            background,
            foreground,
        });
        Ok(sizes)
    }

    pub(crate) fn acquire_frame(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.context.surface.get_current_texture()
    }

    /// Draws into a frame obtained from [`GpuState::acquire_frame`] and presents it.
    pub(crate) fn render(
        &mut self,
        frame: wgpu::SurfaceTexture,
        scene: Option<&Scene>,
        viewport: &Viewport,
        overlay: &OverlayFrame,
    ) {
        self.record_stats();

        let queue = &self.context.queue;
        queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&FrameUniforms::new(viewport)),
        );
        queue.write_buffer(
            &self.overlay_buffer,
            0,
            bytemuck::bytes_of(&OverlayUniforms::new(overlay, viewport)),
        );

        let mut draws: Vec<&SpriteBinding> = Vec::with_capacity(2);
        if let (Some(scene), Some(resources)) = (scene, self.scene.as_ref()) {
            let displacement = scene.displacement();
            for sprite in scene.visible_sprites() {
                if let Some(binding) = resources.binding(sprite.role) {
                    write_sprite(queue, binding, sprite, displacement);
                    draws.push(binding);
                }
            }
        }

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        let (attachment_view, resolve_target) = if let Some(msaa) = self.multisample_target.as_ref()
        {
            (&msaa.view, Some(&view))
        } else {
            (&view, None)
        };

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if !draws.is_empty() {
                render_pass.set_pipeline(&self.pipelines.sprite);
                render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
                for binding in &draws {
                    render_pass.set_bind_group(1, &binding.bind_group, &[]);
                    render_pass.draw(0..6, 0..1);
                }
            }

            if overlay.overlay_attached() {
                render_pass.set_pipeline(&self.pipelines.overlay);
                render_pass.set_bind_group(0, &self.overlay_bind_group, &[]);
                render_pass.draw(0..3, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }

    fn record_stats(&mut self) {
        self.frames_since_stats += 1;
        let elapsed = self.last_stats.elapsed();
        if elapsed >= Duration::from_secs(5) {
            debug!(
                fps = (self.frames_since_stats as f32 / elapsed.as_secs_f32()).round(),
                "render stats"
            );
            self.frames_since_stats = 0;
            self.last_stats = Instant::now();
        }
    }
}

fn write_sprite(queue: &wgpu::Queue, binding: &SpriteBinding, sprite: &Sprite, displacement: &Sprite) {
    let uniforms = SpriteUniforms::new(sprite, displacement);
    queue.write_buffer(&binding.buffer, 0, bytemuck::bytes_of(&uniforms));
}

fn create_uniform_binding<U>(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<U>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (buffer, bind_group)
}

fn create_sprite_binding(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    sprite: &SceneTexture,
    displacement: &SceneTexture,
) -> SpriteBinding {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} sprite uniforms")),
        size: std::mem::size_of::<SpriteUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{label} sprite bind group")),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&sprite.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&sprite.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&displacement.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(&displacement.sampler),
            },
        ],
    });
    SpriteBinding { buffer, bind_group }
}
