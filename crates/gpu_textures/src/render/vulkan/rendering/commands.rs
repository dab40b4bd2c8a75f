//! Command buffer management
//!
//! RAII command pool plus the one-time-submit flow used for uploads:
//! allocate, record, submit, wait for the queue to drain, free.

use ash::{vk, Device};
use crate::render::vulkan::{CommandContext, VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a new command pool for short-lived transfer command buffers
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device.create_command_pool(&pool_create_info, None)
                .map_err(|e| VulkanError::from_creation("command pool", e))?
        };

        Ok(Self {
            device,
            command_pool,
        })
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Allocate one primary command buffer and begin one-time recording
    fn begin_single_time(&self) -> VulkanResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe {
            self.device.allocate_command_buffers(&alloc_info)
                .map_err(|e| VulkanError::from_creation("command buffer", e))?
        }
        .into_iter()
        .next()
        .ok_or_else(|| VulkanError::InvalidOperation {
            reason: "Driver returned no command buffer".to_string(),
        })?;

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        if let Err(e) = unsafe { self.device.begin_command_buffer(command_buffer, &begin_info) } {
            self.free(command_buffer);
            return Err(VulkanError::Api(e));
        }

        Ok(command_buffer)
    }

    /// End recording, submit and block until the queue is idle
    fn submit_and_wait(&self, queue: vk::Queue, command_buffer: vk::CommandBuffer) -> VulkanResult<()> {
        unsafe {
            self.device.end_command_buffer(command_buffer)
                .map_err(VulkanError::Api)?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::builder()
                .command_buffers(&command_buffers);

            self.device.queue_submit(queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Api)?;

            self.device.queue_wait_idle(queue)
                .map_err(VulkanError::Api)?;
        }
        Ok(())
    }

    fn free(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device.free_command_buffers(self.command_pool, &[command_buffer]);
        }
    }
}

impl CommandContext for CommandPool {
    fn execute_single_use(
        &self,
        queue: vk::Queue,
        record: &mut dyn FnMut(vk::CommandBuffer) -> VulkanResult<()>,
    ) -> VulkanResult<()> {
        let command_buffer = self.begin_single_time()?;

        let result = record(command_buffer)
            .and_then(|()| self.submit_and_wait(queue, command_buffer));

        // Never submitted, drained, or the wait failed because the device was lost
        self.free(command_buffer);
        result
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to be idle to ensure all command buffers are finished
            let _ = self.device.device_wait_idle();

            // Destroy command pool (automatically frees all command buffers)
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
