//! Vulkan texture upload
//!
//! Moves decoded RGBA8 pixels through a staging buffer into a device-local
//! image and wraps the result with a view and sampler ready for binding.

use ash::vk;
use std::sync::Arc;
use crate::assets::ImageData;
use crate::render::vulkan::rendering::transfer::{record_buffer_to_image_copy, record_layout_transition};
use crate::render::vulkan::{
    CommandContext, DeviceImage, ImageLayout, ImageView, Sampler, SamplerPolicy, StagingBuffer,
    TextureDevice, VulkanError, VulkanResult, TEXTURE_FORMAT,
};

/// Uploaded texture with image, memory, image view and sampler
///
/// A `Texture` only exists fully built: its image is in the shader-read-only
/// layout and all four handles are live. Dropping it destroys the view, then
/// the image, then the image memory, then the sampler.
pub struct Texture<D: TextureDevice + ?Sized> {
    // Field order is destruction order
    view: ImageView<D>,
    image: DeviceImage<D>,
    sampler: Sampler<D>,
}

impl<D: TextureDevice + ?Sized> Texture<D> {
    /// Create a texture from loaded image data
    ///
    /// Blocks until the GPU has finished the transfer. On error every handle
    /// created so far, the staging buffer included, is destroyed before
    /// returning.
    pub fn from_image_data<C: CommandContext + ?Sized>(
        device: &Arc<D>,
        commands: &C,
        queue: vk::Queue,
        image_data: ImageData,
        policy: &SamplerPolicy,
    ) -> VulkanResult<Self> {
        let extent = vk::Extent2D {
            width: image_data.width,
            height: image_data.height,
        };

        // Nothing is allocated for pixels that cannot fill the image
        let expected = ImageData::byte_size(extent.width, extent.height);
        if expected == 0 || image_data.data.len() as u64 != expected {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "{}x{} texture needs {} bytes of RGBA8 data, got {}",
                    extent.width, extent.height, expected, image_data.data.len()
                ),
            });
        }

        let staging = StagingBuffer::with_data(device.clone(), &image_data.data)?;
        // Pixels live in the staging buffer now
        drop(image_data);

        let mut image = DeviceImage::allocate(device.clone(), extent, TEXTURE_FORMAT)?;

        commands.execute_single_use(queue, &mut |command_buffer| {
            record_layout_transition(&**device, command_buffer, &mut image, ImageLayout::TransferDestination)?;
            record_buffer_to_image_copy(&**device, command_buffer, &staging, &image)?;
            record_layout_transition(&**device, command_buffer, &mut image, ImageLayout::ShaderReadOnly)
        })?;

        // Transfer finished on the GPU
        drop(staging);

        let view = ImageView::for_texture(device.clone(), &image)?;
        let sampler = Sampler::new(device.clone(), policy)?;

        log::debug!(
            "Uploaded {}x{} texture: image {:?}, view {:?}, sampler {:?}",
            extent.width, extent.height, image.handle(), view.handle(), sampler.handle()
        );

        Ok(Self {
            view,
            image,
            sampler,
        })
    }

    /// Get the image handle
    pub fn image(&self) -> vk::Image {
        self.image.handle()
    }

    /// Get the memory backing the image
    pub fn memory(&self) -> vk::DeviceMemory {
        self.image.memory()
    }

    /// Get the image view for descriptor set binding
    pub fn image_view(&self) -> vk::ImageView {
        self.view.handle()
    }

    /// Get the sampler for descriptor set binding
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler.handle()
    }

    /// Get the texture extent
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }

    /// Get the texel format
    pub fn format(&self) -> vk::Format {
        self.image.format()
    }

    /// Current image layout (always shader-read-only)
    pub fn layout(&self) -> ImageLayout {
        self.image.layout()
    }

    /// Combined image sampler binding for descriptor writes
    pub fn descriptor_image_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler(),
            image_view: self.image_view(),
            image_layout: self.layout().to_vk(),
        }
    }
}
