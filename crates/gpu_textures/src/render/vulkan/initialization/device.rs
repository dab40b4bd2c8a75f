//! Device seams used by the texture upload pipeline
//!
//! The pipeline never talks to `ash` directly. It allocates, records and
//! destroys through [`TextureDevice`] and submits through [`CommandContext`],
//! so the same code drives a real device or the tracking device in tests.

use ash::vk;
use crate::render::vulkan::VulkanResult;

/// Description of a 2D device image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSpec {
    /// Image extent in pixels
    pub extent: vk::Extent2D,
    /// Texel format
    pub format: vk::Format,
    /// Memory tiling
    pub tiling: vk::ImageTiling,
    /// Usage flags
    pub usage: vk::ImageUsageFlags,
}

/// Resource allocation and command recording on a logical device
///
/// Allocation methods either return fully bound objects or fail without
/// leaving anything behind: an implementation that creates the buffer or
/// image but then fails to allocate or bind memory must destroy what it
/// created before returning the error.
///
/// Destroy methods must only be called with live, non-null handles that this
/// device returned.
pub trait TextureDevice {
    /// Create a buffer and bind freshly allocated memory with `properties`
    fn allocate_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<(vk::Buffer, vk::DeviceMemory)>;

    /// Copy `data` to the start of host-visible `memory` (map, copy, unmap)
    fn write_host_memory(&self, memory: vk::DeviceMemory, data: &[u8]) -> VulkanResult<()>;

    /// Destroy a buffer created by [`TextureDevice::allocate_buffer`]
    fn destroy_buffer(&self, buffer: vk::Buffer);

    /// Free a memory block returned by an allocation method
    fn free_memory(&self, memory: vk::DeviceMemory);

    /// Create an image (initial layout undefined) and bind memory with `properties`
    fn allocate_image(
        &self,
        spec: &ImageSpec,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<(vk::Image, vk::DeviceMemory)>;

    /// Destroy an image created by [`TextureDevice::allocate_image`]
    fn destroy_image(&self, image: vk::Image);

    /// Create an image view
    fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VulkanResult<vk::ImageView>;

    /// Destroy an image view
    fn destroy_image_view(&self, view: vk::ImageView);

    /// Create a sampler
    fn create_sampler(&self, info: &vk::SamplerCreateInfo) -> VulkanResult<vk::Sampler>;

    /// Destroy a sampler
    fn destroy_sampler(&self, sampler: vk::Sampler);

    /// Maximum sampler anisotropy reported by the physical device
    fn max_sampler_anisotropy(&self) -> f32;

    /// Record a pipeline barrier carrying a single image memory barrier
    fn cmd_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier,
    );

    /// Record a copy from `buffer` into `image`, which must be in `layout`
    fn cmd_copy_buffer_to_image(
        &self,
        command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        region: &vk::BufferImageCopy,
    );
}

/// Single-use command buffer execution
pub trait CommandContext {
    /// Record commands with `record`, submit them to `queue` and block until
    /// the GPU has finished executing them
    ///
    /// The command buffer is released whether recording, submission or the
    /// wait succeeds or fails.
    fn execute_single_use(
        &self,
        queue: vk::Queue,
        record: &mut dyn FnMut(vk::CommandBuffer) -> VulkanResult<()>,
    ) -> VulkanResult<()>;
}
