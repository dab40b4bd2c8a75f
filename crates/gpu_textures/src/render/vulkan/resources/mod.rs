//! Vulkan resource management
//!
//! Contains the GPU resources a texture is built from and the registry that
//! owns finished textures.

/// Host-visible staging buffers
pub mod buffer;

/// Device-local images and their layout state
pub mod image;

/// Image views, samplers and the sampling policy
pub mod sampler;

/// Texture upload pipeline
pub mod texture;

/// Texture registry (slot ownership, bulk setup and teardown)
pub mod texture_registry;

pub use buffer::StagingBuffer;
pub use image::{DeviceImage, ImageLayout};
pub use sampler::{ImageView, Sampler, SamplerPolicy};
pub use texture::Texture;
pub use texture_registry::TextureRegistry;
