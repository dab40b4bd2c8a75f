//! # GPU Textures
//!
//! Loads 2D image assets from disk and uploads them into device-local Vulkan
//! images that a renderer can bind for sampling.
//!
//! ## Features
//!
//! - **Texture Registry**: ordered slots, one aggregate per texture
//! - **Upload Pipeline**: staging buffer, layout transitions, buffer-to-image copy
//! - **RAII Ownership**: every GPU handle is destroyed exactly once
//! - **Configurable Sampling**: sampler policy loaded from TOML or RON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gpu_textures::prelude::*;
//! use std::sync::Arc;
//!
//! fn upload(
//!     instance: &ash::Instance,
//!     device: &ash::Device,
//!     physical_device: ash::vk::PhysicalDevice,
//!     queue: ash::vk::Queue,
//!     queue_family_index: u32,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let context = Arc::new(VulkanContext::new(instance, device, physical_device));
//!     let commands = CommandPool::new(device.clone(), queue_family_index)?;
//!
//!     let mut textures = TextureRegistry::new(context, SamplerPolicy::default());
//!     let slot = textures.register("textures/crate.png");
//!     textures.setup_all(queue, &commands)?;
//!
//!     let _binding = textures.descriptor_image_info(slot);
//!
//!     // Caller guarantees the device is idle before teardown
//!     textures.teardown_all();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod assets;
pub mod render;

/// Common imports for texture users
pub mod prelude {
    pub use crate::{
        assets::{AssetError, ImageData},
        config::{Config, ConfigError},
        render::vulkan::{
            CommandContext, CommandPool, FilterMode, SamplerPolicy, Texture, TextureDevice,
            TextureError, TextureManifest, TextureRegistry, TextureResult, TextureSource,
            VulkanContext, VulkanError, VulkanResult, WrapMode,
        },
    };
}
