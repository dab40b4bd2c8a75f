//! Vulkan texture backend
//!
//! Organized into initialization (device seams and errors), rendering
//! (single-use command submission and transfer recording) and resources
//! (staging buffers, images, samplers, textures and the texture registry).

/// Vulkan initialization types (errors, device seams, ash context)
pub mod initialization;

/// Vulkan command recording and submission
pub mod rendering;

/// Vulkan resource management (staging buffers, images, samplers, textures)
pub mod resources;

/// Allocation-tracking fake device for unit tests
#[cfg(test)]
pub(crate) mod testing;

// Re-export core initialization types
pub use initialization::context::{VulkanContext, VulkanError, VulkanResult};
pub use initialization::device::{CommandContext, ImageSpec, TextureDevice};

// Re-export rendering types
pub use rendering::commands::CommandPool;
pub use rendering::transfer::LayoutTransition;

// Re-export resource types
pub use resources::buffer::StagingBuffer;
pub use resources::image::{DeviceImage, ImageLayout, TEXTURE_FORMAT};
pub use resources::sampler::{FilterMode, ImageView, Sampler, SamplerPolicy, WrapMode};
pub use resources::texture::Texture;
pub use resources::texture_registry::{
    TextureError, TextureManifest, TextureRegistry, TextureResult, TextureSlot, TextureSource,
};
