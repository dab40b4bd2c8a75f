//! Vulkan context management
//!
//! Wraps the externally created instance, logical device and physical device
//! and implements [`TextureDevice`] on top of them. The context never creates
//! or destroys the device it wraps.

use ash::{Device, Instance};
use ash::vk;
use thiserror::Error;
use crate::render::vulkan::{ImageLayout, ImageSpec, TextureDevice};

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Host memory exhausted while creating a resource
    #[error("Out of host memory while creating {resource}")]
    OutOfHostMemory {
        /// The resource being created
        resource: &'static str,
    },

    /// Device memory exhausted while creating a resource
    #[error("Out of device memory while creating {resource}")]
    OutOfDeviceMemory {
        /// The resource being created
        resource: &'static str,
    },

    /// The device rejected a resource creation
    #[error("Failed to create {resource}: {reason}")]
    ResourceCreation {
        /// The resource being created
        resource: &'static str,
        /// Why the device rejected it
        reason: String,
    },

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Layout transition outside the upload state machine
    #[error("Unsupported image layout transition: {from:?} -> {to:?}")]
    InvalidLayoutTransition {
        /// Current layout
        from: ImageLayout,
        /// Requested layout
        to: ImageLayout,
    },

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found for {properties:?}")]
    NoSuitableMemoryType {
        /// Requested memory properties
        properties: vk::MemoryPropertyFlags,
    },
}

impl VulkanError {
    /// Classify a failed `vkCreate*` / `vkAllocate*` result for `resource`
    pub fn from_creation(resource: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => Self::OutOfHostMemory { resource },
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Self::OutOfDeviceMemory { resource },
            other => Self::ResourceCreation {
                resource,
                reason: format!("{:?}", other),
            },
        }
    }

    /// Classify a failed bind or map result for `resource`
    ///
    /// Memory exhaustion maps to the out-of-memory variants, anything else
    /// stays an API error.
    pub fn from_memory_op(resource: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => Self::OutOfHostMemory { resource },
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => Self::OutOfDeviceMemory { resource },
            other => Self::Api(other),
        }
    }

    /// Whether this error reports host or device memory exhaustion
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfHostMemory { .. } | Self::OutOfDeviceMemory { .. })
    }
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Handles to an externally owned Vulkan device
pub struct VulkanContext {
    device: Device,
    physical_device: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    limits: vk::PhysicalDeviceLimits,
}

impl VulkanContext {
    /// Create a context over an existing instance and logical device
    ///
    /// The device must have been created with the `samplerAnisotropy`
    /// feature enabled if anisotropic sampling is requested.
    pub fn new(instance: &Instance, device: &Device, physical_device: vk::PhysicalDevice) -> Self {
        let (memory_properties, properties) = unsafe {
            (
                instance.get_physical_device_memory_properties(physical_device),
                instance.get_physical_device_properties(physical_device),
            )
        };

        Self {
            device: device.clone(),
            physical_device,
            memory_properties,
            limits: properties.limits,
        }
    }

    /// Get the logical device
    pub fn raw_device(&self) -> &Device {
        &self.device
    }

    /// Get the physical device handle
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Find memory type with required properties
    fn find_memory_type(
        &self,
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<u32> {
        let mem_properties = &self.memory_properties;

        for i in 0..mem_properties.memory_type_count {
            if (type_filter & (1 << i)) != 0
                && mem_properties.memory_types[i as usize].property_flags.contains(properties)
            {
                return Ok(i);
            }
        }

        Err(VulkanError::NoSuitableMemoryType { properties })
    }

    /// Allocate and bind memory for a freshly created object
    ///
    /// `bind` attaches the memory to the object. Memory is freed again if
    /// binding fails; the caller still owns (and must destroy) the object.
    fn allocate_bound_memory(
        &self,
        resource: &'static str,
        requirements: vk::MemoryRequirements,
        properties: vk::MemoryPropertyFlags,
        bind: impl FnOnce(vk::DeviceMemory) -> ash::prelude::VkResult<()>,
    ) -> VulkanResult<vk::DeviceMemory> {
        let memory_type_index = self.find_memory_type(requirements.memory_type_bits, properties)?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            self.device.allocate_memory(&alloc_info, None)
                .map_err(|e| VulkanError::from_creation(resource, e))?
        };

        if let Err(e) = bind(memory) {
            unsafe { self.device.free_memory(memory, None) };
            return Err(VulkanError::from_memory_op(resource, e));
        }

        Ok(memory)
    }
}

impl TextureDevice for VulkanContext {
    fn allocate_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<(vk::Buffer, vk::DeviceMemory)> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            self.device.create_buffer(&buffer_info, None)
                .map_err(|e| VulkanError::from_creation("buffer", e))?
        };

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let memory = self.allocate_bound_memory("buffer memory", requirements, properties, |memory| unsafe {
            self.device.bind_buffer_memory(buffer, memory, 0)
        });

        match memory {
            Ok(memory) => Ok((buffer, memory)),
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                Err(e)
            }
        }
    }

    fn write_host_memory(&self, memory: vk::DeviceMemory, data: &[u8]) -> VulkanResult<()> {
        unsafe {
            let data_ptr = self.device.map_memory(
                memory,
                0,
                data.len() as vk::DeviceSize,
                vk::MemoryMapFlags::empty(),
            ).map_err(|e| VulkanError::from_memory_op("staging memory", e))?
                .cast::<u8>();
            std::ptr::copy_nonoverlapping(data.as_ptr(), data_ptr, data.len());
            // Host-coherent memory: no flush needed before unmapping
            self.device.unmap_memory(memory);
        }
        Ok(())
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) };
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) };
    }

    fn allocate_image(
        &self,
        spec: &ImageSpec,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<(vk::Image, vk::DeviceMemory)> {
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: spec.extent.width,
                height: spec.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(spec.format)
            .tiling(spec.tiling)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(spec.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            self.device.create_image(&image_create_info, None)
                .map_err(|e| VulkanError::from_creation("image", e))?
        };

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let memory = self.allocate_bound_memory("image memory", requirements, properties, |memory| unsafe {
            self.device.bind_image_memory(image, memory, 0)
        });

        match memory {
            Ok(memory) => Ok((image, memory)),
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                Err(e)
            }
        }
    }

    fn destroy_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) };
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VulkanResult<vk::ImageView> {
        unsafe {
            self.device.create_image_view(info, None)
                .map_err(|e| VulkanError::from_creation("image view", e))
        }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }

    fn create_sampler(&self, info: &vk::SamplerCreateInfo) -> VulkanResult<vk::Sampler> {
        unsafe {
            self.device.create_sampler(info, None)
                .map_err(|e| VulkanError::from_creation("sampler", e))
        }
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) };
    }

    fn max_sampler_anisotropy(&self) -> f32 {
        self.limits.max_sampler_anisotropy
    }

    fn cmd_pipeline_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier,
    ) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(barrier),
            );
        }
    }

    fn cmd_copy_buffer_to_image(
        &self,
        command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        region: &vk::BufferImageCopy,
    ) {
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                image,
                layout,
                std::slice::from_ref(region),
            );
        }
    }
}
