use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::assets::{AssetError, AssetKind, LoadedImage};
use crate::layout::TextureSize;

/// GPU copy of one scene image plus the sampler its role needs.
pub(crate) struct SceneTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub size: TextureSize,
}

pub(crate) struct SceneTextureSet {
    pub displacement: SceneTexture,
    pub foreground: SceneTexture,
    pub background: SceneTexture,
}

/// Uploads all three images, refusing any the device cannot hold.
pub(crate) fn upload_scene_textures(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    displacement: &LoadedImage,
    foreground: &LoadedImage,
    background: &LoadedImage,
) -> Result<SceneTextureSet, AssetError> {
    let limit = device.limits().max_texture_dimension_2d;
    for image in [displacement, foreground, background] {
        check_texture_size(image.kind, image.size(), limit)?;
    }
    Ok(SceneTextureSet {
        displacement: upload_image(device, queue, displacement),
        foreground: upload_image(device, queue, foreground),
        background: upload_image(device, queue, background),
    })
}

fn check_texture_size(kind: AssetKind, size: TextureSize, limit: u32) -> Result<(), AssetError> {
    if size.width > limit || size.height > limit {
        return Err(AssetError::TooLarge {
            kind,
            width: size.width,
            height: size.height,
            limit,
        });
    }
    Ok(())
}

fn upload_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &LoadedImage) -> SceneTexture {
    let size = image.size();
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("{} texture", image.kind)),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        image.pixels.as_raw(),
    );
    tracing::debug!(
        kind = %image.kind,
        width = size.width,
        height = size.height,
        "uploaded scene texture"
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = create_sampler(device, image.kind);

    SceneTexture {
        _texture: texture,
        view,
        sampler,
        size,
    }
}

fn create_sampler(device: &wgpu::Device, kind: AssetKind) -> wgpu::Sampler {
    let address_mode = address_mode_for(kind);
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{kind} sampler")),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// The displacement map tiles endlessly as it scrolls; sprites clamp.
fn address_mode_for(kind: AssetKind) -> wgpu::AddressMode {
    match kind {
        AssetKind::Displacement => wgpu::AddressMode::Repeat,
        AssetKind::Foreground | AssetKind::Background => wgpu::AddressMode::ClampToEdge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_images_are_refused() {
        assert!(
            check_texture_size(AssetKind::Background, TextureSize::new(8192, 4096), 8192).is_ok()
        );
        let err = check_texture_size(AssetKind::Background, TextureSize::new(8193, 4096), 8192)
            .unwrap_err();
        assert!(matches!(
            err,
            AssetError::TooLarge {
                kind: AssetKind::Background,
                width: 8193,
                height: 4096,
                limit: 8192,
            }
        ));
        assert!(matches!(
            check_texture_size(AssetKind::Displacement, TextureSize::new(16, 20000), 16384),
            Err(AssetError::TooLarge { .. })
        ));
    }

    #[test]
    fn only_displacement_repeats() {
        assert_eq!(
            address_mode_for(AssetKind::Displacement),
            wgpu::AddressMode::Repeat
        );
        assert_eq!(
            address_mode_for(AssetKind::Foreground),
            wgpu::AddressMode::ClampToEdge
        );
        assert_eq!(
            address_mode_for(AssetKind::Background),
            wgpu::AddressMode::ClampToEdge
        );
    }
}
