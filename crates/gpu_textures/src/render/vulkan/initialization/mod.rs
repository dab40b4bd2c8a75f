// Vulkan initialization components

pub mod context;
pub mod device;

pub use context::*;
pub use device::*;
