//! Transfer command recording
//!
//! Layout transitions and the staging-buffer-to-image copy. Barriers always
//! cover the whole image: color aspect, mip level 0, array layer 0.

use ash::vk;
use crate::render::vulkan::{
    DeviceImage, ImageLayout, StagingBuffer, TextureDevice, VulkanError, VulkanResult,
};

/// The two layout transitions of the upload pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTransition {
    /// `Undefined -> TransferDestination`, before the copy
    ToTransferDestination,
    /// `TransferDestination -> ShaderReadOnly`, after the copy
    ToShaderReadOnly,
}

impl LayoutTransition {
    /// Select the transition from `from` to `to`
    pub fn between(from: ImageLayout, to: ImageLayout) -> VulkanResult<Self> {
        match (from, to) {
            (ImageLayout::Undefined, ImageLayout::TransferDestination) => Ok(Self::ToTransferDestination),
            (ImageLayout::TransferDestination, ImageLayout::ShaderReadOnly) => Ok(Self::ToShaderReadOnly),
            _ => Err(VulkanError::InvalidLayoutTransition { from, to }),
        }
    }

    /// Layout before the barrier
    pub fn old_layout(self) -> ImageLayout {
        match self {
            Self::ToTransferDestination => ImageLayout::Undefined,
            Self::ToShaderReadOnly => ImageLayout::TransferDestination,
        }
    }

    /// Layout after the barrier
    pub fn new_layout(self) -> ImageLayout {
        match self {
            Self::ToTransferDestination => ImageLayout::TransferDestination,
            Self::ToShaderReadOnly => ImageLayout::ShaderReadOnly,
        }
    }

    /// Source and destination access masks
    pub fn access_masks(self) -> (vk::AccessFlags, vk::AccessFlags) {
        match self {
            Self::ToTransferDestination => (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
            Self::ToShaderReadOnly => (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
        }
    }

    /// Source and destination pipeline stages
    pub fn stages(self) -> (vk::PipelineStageFlags, vk::PipelineStageFlags) {
        match self {
            // Nothing to wait for; the transfer write waits on the barrier
            Self::ToTransferDestination => (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER),
            Self::ToShaderReadOnly => (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        }
    }

    /// Build the image memory barrier for `image`
    pub fn barrier(self, image: vk::Image) -> vk::ImageMemoryBarrier {
        let (src_access, dst_access) = self.access_masks();

        vk::ImageMemoryBarrier::builder()
            .old_layout(self.old_layout().to_vk())
            .new_layout(self.new_layout().to_vk())
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(whole_color_range())
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .build()
    }
}

fn whole_color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Record the barrier that moves `image` to `target` and track the new layout
pub fn record_layout_transition<D: TextureDevice + ?Sized>(
    device: &D,
    command_buffer: vk::CommandBuffer,
    image: &mut DeviceImage<D>,
    target: ImageLayout,
) -> VulkanResult<()> {
    let transition = LayoutTransition::between(image.layout(), target)?;
    let (src_stage, dst_stage) = transition.stages();

    device.cmd_pipeline_barrier(command_buffer, src_stage, dst_stage, &transition.barrier(image.handle()));
    image.set_layout(target)
}

/// Record a full-extent copy from `staging` into `image`
///
/// The image must already be in the transfer-destination layout and the
/// staging buffer must hold exactly one RGBA8 image of the same extent.
pub fn record_buffer_to_image_copy<D: TextureDevice + ?Sized>(
    device: &D,
    command_buffer: vk::CommandBuffer,
    staging: &StagingBuffer<D>,
    image: &DeviceImage<D>,
) -> VulkanResult<()> {
    if image.layout() != ImageLayout::TransferDestination {
        return Err(VulkanError::InvalidOperation {
            reason: format!("Copy into image {:?} in layout {:?}", image.handle(), image.layout()),
        });
    }

    let extent = image.extent();
    let required = crate::assets::ImageData::byte_size(extent.width, extent.height);
    if staging.size() != required {
        return Err(VulkanError::InvalidOperation {
            reason: format!(
                "Staging buffer holds {} bytes, {}x{} image needs {}",
                staging.size(), extent.width, extent.height, required
            ),
        });
    }

    let region = vk::BufferImageCopy::builder()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        })
        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
        .image_extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .build();

    device.cmd_copy_buffer_to_image(
        command_buffer,
        staging.handle(),
        image.handle(),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &region,
    );
    Ok(())
}
