//! Rendering backends
//!
//! Only the Vulkan texture upload path lives here; windowing, swapchain and
//! pipeline state belong to the host renderer.

pub mod vulkan;
