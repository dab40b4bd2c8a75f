//! Vulkan command recording
//!
//! Single-use command buffers and the transfer commands recorded into them.

/// Command pool and single-use submission
pub mod commands;

/// Layout transitions and buffer-to-image copies
pub mod transfer;
