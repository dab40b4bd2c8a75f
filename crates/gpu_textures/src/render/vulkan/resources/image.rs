//! Device-local images
//!
//! [`DeviceImage`] owns an image together with the memory bound to it and
//! tracks which layout the upload has left it in.

use ash::vk;
use std::sync::Arc;
use crate::render::vulkan::{ImageSpec, TextureDevice, VulkanError, VulkanResult};

/// Format of every uploaded texture: 8-bit RGBA, sRGB encoded
pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Image layouts reachable by the upload pipeline
///
/// Transitions only move forward:
/// `Undefined -> TransferDestination -> ShaderReadOnly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    /// Initial layout, contents meaningless
    Undefined,
    /// Writable by transfer operations, not readable by shaders
    TransferDestination,
    /// Terminal layout, readable by shader stages
    ShaderReadOnly,
}

impl ImageLayout {
    /// The matching Vulkan layout
    pub fn to_vk(self) -> vk::ImageLayout {
        match self {
            Self::Undefined => vk::ImageLayout::UNDEFINED,
            Self::TransferDestination => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            Self::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    /// The only layout this one may transition to, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Undefined => Some(Self::TransferDestination),
            Self::TransferDestination => Some(Self::ShaderReadOnly),
            Self::ShaderReadOnly => None,
        }
    }
}

/// Device-local image and its backing memory
pub struct DeviceImage<D: TextureDevice + ?Sized> {
    device: Arc<D>,
    image: vk::Image,
    memory: vk::DeviceMemory,
    extent: vk::Extent2D,
    format: vk::Format,
    layout: ImageLayout,
}

impl<D: TextureDevice + ?Sized> DeviceImage<D> {
    /// Allocate a sampled, transfer-destination texture image in device-local memory
    pub fn allocate(device: Arc<D>, extent: vk::Extent2D, format: vk::Format) -> VulkanResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Image extent must be non-zero, got {}x{}", extent.width, extent.height),
            });
        }

        let spec = ImageSpec {
            extent,
            format,
            tiling: vk::ImageTiling::OPTIMAL,
            usage: vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        };

        let (image, memory) = device.allocate_image(&spec, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;
        log::debug!("Allocated {}x{} image {:?} ({:?})", extent.width, extent.height, image, format);

        Ok(Self {
            device,
            image,
            memory,
            extent,
            format,
            layout: ImageLayout::Undefined,
        })
    }

    /// Get the image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Get the memory bound to the image
    pub fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    /// Get the image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get the texel format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Layout the image is in once recorded commands have executed
    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    /// Advance the tracked layout along the upload state machine
    pub(crate) fn set_layout(&mut self, target: ImageLayout) -> VulkanResult<()> {
        if self.layout.next() != Some(target) {
            return Err(VulkanError::InvalidLayoutTransition {
                from: self.layout,
                to: target,
            });
        }
        self.layout = target;
        Ok(())
    }
}

impl<D: TextureDevice + ?Sized> Drop for DeviceImage<D> {
    fn drop(&mut self) {
        log::debug!("Destroying image {:?}", self.image);
        self.device.destroy_image(self.image);
        self.device.free_memory(self.memory);
    }
}
