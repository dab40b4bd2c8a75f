//! Staging buffer management
//!
//! A staging buffer lives for exactly one upload. It is filled once from the
//! host and destroyed when dropped, on the success and error paths alike.

use ash::vk;
use std::sync::Arc;
use crate::render::vulkan::{TextureDevice, VulkanError, VulkanResult};

/// Host-visible, host-coherent transfer source buffer
pub struct StagingBuffer<D: TextureDevice + ?Sized> {
    device: Arc<D>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl<D: TextureDevice + ?Sized> StagingBuffer<D> {
    /// Create a staging buffer sized for `data` and copy `data` into it
    pub fn with_data(device: Arc<D>, data: &[u8]) -> VulkanResult<Self> {
        if data.is_empty() {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot stage an empty upload".to_string(),
            });
        }

        let size = data.len() as vk::DeviceSize;
        let (buffer, memory) = device.allocate_buffer(
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        // Owned from here on, so a failed write still releases the buffer
        let staging = Self {
            device,
            buffer,
            memory,
            size,
        };

        staging.device.write_host_memory(staging.memory, data)?;
        log::debug!("Staged {} bytes in buffer {:?}", size, buffer);

        Ok(staging)
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl<D: TextureDevice + ?Sized> Drop for StagingBuffer<D> {
    fn drop(&mut self) {
        self.device.destroy_buffer(self.buffer);
        self.device.free_memory(self.memory);
    }
}
