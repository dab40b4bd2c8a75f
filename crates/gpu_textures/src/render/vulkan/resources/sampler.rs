//! Image views and samplers
//!
//! Every texture gets a color view over its single mip level and a sampler
//! built from a [`SamplerPolicy`]. The default policy is linear filtering,
//! repeat addressing and anisotropy at the device maximum.

use ash::vk;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::config::Config;
use crate::render::vulkan::{DeviceImage, ImageLayout, TextureDevice, VulkanError, VulkanResult};

/// Texture filtering modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Nearest neighbor filtering
    Nearest,
    /// Linear filtering
    Linear,
}

impl FilterMode {
    fn to_vk(self) -> vk::Filter {
        match self {
            Self::Nearest => vk::Filter::NEAREST,
            Self::Linear => vk::Filter::LINEAR,
        }
    }
}

/// Texture wrapping modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Repeat the texture
    Repeat,
    /// Mirror the texture
    MirroredRepeat,
    /// Clamp to edge
    ClampToEdge,
}

impl WrapMode {
    fn to_vk(self) -> vk::SamplerAddressMode {
        match self {
            Self::Repeat => vk::SamplerAddressMode::REPEAT,
            Self::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
            Self::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        }
    }
}

/// Sampling policy shared by every texture of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerPolicy {
    /// Magnification and minification filter
    pub filter_mode: FilterMode,
    /// Addressing on U, V and W
    pub wrap_mode: WrapMode,
    /// Use the device's maximum anisotropy (otherwise anisotropy is off)
    pub anisotropy: bool,
}

impl Default for SamplerPolicy {
    fn default() -> Self {
        Self {
            filter_mode: FilterMode::Linear,
            wrap_mode: WrapMode::Repeat,
            anisotropy: true,
        }
    }
}

impl Config for SamplerPolicy {}

impl SamplerPolicy {
    /// Policy for devices without anisotropic filtering
    pub fn without_anisotropy() -> Self {
        Self {
            anisotropy: false,
            ..Self::default()
        }
    }

    /// Build the sampler create info for a device reporting `max_anisotropy`
    ///
    /// Mipmapping is logically disabled: LOD is clamped to level 0.
    pub fn create_info(&self, max_anisotropy: f32) -> VulkanResult<vk::SamplerCreateInfo> {
        if self.anisotropy && (max_anisotropy.is_nan() || max_anisotropy < 1.0) {
            return Err(VulkanError::ResourceCreation {
                resource: "sampler",
                reason: format!("Device reports invalid max sampler anisotropy {}", max_anisotropy),
            });
        }

        let filter = self.filter_mode.to_vk();
        let address_mode = self.wrap_mode.to_vk();

        Ok(vk::SamplerCreateInfo::builder()
            .mag_filter(filter)
            .min_filter(filter)
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .anisotropy_enable(self.anisotropy)
            .max_anisotropy(if self.anisotropy { max_anisotropy } else { 1.0 })
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(0.0)
            .build())
    }
}

/// Shader-visible view over a texture image
pub struct ImageView<D: TextureDevice + ?Sized> {
    device: Arc<D>,
    view: vk::ImageView,
}

impl<D: TextureDevice + ?Sized> ImageView<D> {
    /// Create a 2D color view over `image`, which must be shader-readable
    pub fn for_texture(device: Arc<D>, image: &DeviceImage<D>) -> VulkanResult<Self> {
        if image.layout() != ImageLayout::ShaderReadOnly {
            return Err(VulkanError::InvalidOperation {
                reason: format!("View requested for image {:?} in layout {:?}", image.handle(), image.layout()),
            });
        }

        let image_view_create_info = vk::ImageViewCreateInfo::builder()
            .image(image.handle())
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = device.create_image_view(&image_view_create_info)?;
        Ok(Self { device, view })
    }

    /// Get the image view handle
    pub fn handle(&self) -> vk::ImageView {
        self.view
    }
}

impl<D: TextureDevice + ?Sized> Drop for ImageView<D> {
    fn drop(&mut self) {
        self.device.destroy_image_view(self.view);
    }
}

/// Texture sampler
pub struct Sampler<D: TextureDevice + ?Sized> {
    device: Arc<D>,
    sampler: vk::Sampler,
}

impl<D: TextureDevice + ?Sized> Sampler<D> {
    /// Create a sampler following `policy`
    pub fn new(device: Arc<D>, policy: &SamplerPolicy) -> VulkanResult<Self> {
        let sampler_create_info = policy.create_info(device.max_sampler_anisotropy())?;
        let sampler = device.create_sampler(&sampler_create_info)?;
        Ok(Self { device, sampler })
    }

    /// Get the sampler handle
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl<D: TextureDevice + ?Sized> Drop for Sampler<D> {
    fn drop(&mut self) {
        self.device.destroy_sampler(self.sampler);
    }
}
