//! Tracking device for unit tests
//!
//! [`TrackingDevice`] implements [`TextureDevice`] and [`CommandContext`]
//! without a GPU. Handles are plain counters, memory is a byte vector, and
//! recorded commands take effect immediately: a barrier moves the image's
//! layout, a copy moves bytes from the staging memory into the image.
//!
//! Misuse that a validation layer would report (double destroys, copies into
//! the wrong layout, barriers whose old layout does not match) is collected
//! in [`TrackingDevice::violations`] instead of panicking.

use ash::vk::{self, Handle};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use crate::render::vulkan::{CommandContext, ImageSpec, TextureDevice, VulkanError, VulkanResult};

/// Device calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// `allocate_buffer` fails (out of host memory unless overridden)
    StagingBuffer,
    /// `write_host_memory` fails to map
    HostWrite,
    /// `allocate_image` fails (out of device memory unless overridden)
    ImageAllocation,
    /// `create_image_view` fails
    ImageView,
    /// `create_sampler` fails
    Sampler,
    /// `execute_single_use` records, then the submission fails
    Submit,
}

impl FailPoint {
    /// Result code a driver typically returns at this point
    fn default_result(self) -> vk::Result {
        match self {
            Self::StagingBuffer => vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            Self::HostWrite => vk::Result::ERROR_MEMORY_MAP_FAILED,
            Self::ImageAllocation => vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
            Self::ImageView | Self::Sampler => vk::Result::ERROR_INITIALIZATION_FAILED,
            Self::Submit => vk::Result::ERROR_DEVICE_LOST,
        }
    }
}

/// A live buffer
#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub memory: vk::DeviceMemory,
    pub memory_properties: vk::MemoryPropertyFlags,
}

/// A live image
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub spec: ImageSpec,
    pub memory: vk::DeviceMemory,
    pub memory_properties: vk::MemoryPropertyFlags,
    pub layout: vk::ImageLayout,
    data: Vec<u8>,
}

/// A live sampler
#[derive(Debug, Clone, Copy)]
pub struct SamplerRecord {
    pub anisotropy_enable: bool,
    pub max_anisotropy: f32,
    pub mag_filter: vk::Filter,
    pub address_mode_u: vk::SamplerAddressMode,
}

/// A recorded image barrier
#[derive(Debug, Clone, Copy)]
pub struct BarrierRecord {
    pub image: vk::Image,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
}

struct MemoryRecord {
    properties: vk::MemoryPropertyFlags,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    next_handle: u64,
    total_created: usize,
    submissions: usize,
    buffers: HashMap<u64, BufferRecord>,
    memories: HashMap<u64, MemoryRecord>,
    images: HashMap<u64, ImageRecord>,
    views: HashSet<u64>,
    samplers: HashMap<u64, SamplerRecord>,
    barriers: Vec<BarrierRecord>,
    destroy_log: Vec<u64>,
    violations: Vec<String>,
    // Remaining successful calls before each armed fail point trips
    failures: HashMap<FailPoint, (usize, vk::Result)>,
}

impl State {
    fn new_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn created(&mut self) -> u64 {
        self.total_created += 1;
        self.new_handle()
    }

    fn should_fail(&mut self, point: FailPoint) -> Option<vk::Result> {
        match self.failures.get_mut(&point) {
            Some((0, result)) => {
                let result = *result;
                self.failures.remove(&point);
                Some(result)
            }
            Some((remaining, _)) => {
                *remaining -= 1;
                None
            }
            None => None,
        }
    }

    fn allocate_memory(&mut self, size: usize, properties: vk::MemoryPropertyFlags) -> vk::DeviceMemory {
        let raw = self.created();
        self.memories.insert(raw, MemoryRecord {
            properties,
            data: vec![0; size],
        });
        vk::DeviceMemory::from_raw(raw)
    }

    fn destroyed(&mut self, kind: &str, raw: u64, was_live: bool) {
        if raw == 0 {
            self.violations.push(format!("null {} destroyed", kind));
        } else if was_live {
            self.destroy_log.push(raw);
        } else {
            self.violations.push(format!("{} {:#x} destroyed twice or never created", kind, raw));
        }
    }
}

/// Fake device that tracks every handle it hands out
pub struct TrackingDevice {
    max_anisotropy: f32,
    state: Mutex<State>,
}

impl TrackingDevice {
    /// Device reporting a max sampler anisotropy of 16
    pub fn new() -> Self {
        Self::with_max_anisotropy(16.0)
    }

    pub fn with_max_anisotropy(max_anisotropy: f32) -> Self {
        Self {
            max_anisotropy,
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make the call at `point` fail after `after` successful calls (once)
    pub fn inject_failure(&self, point: FailPoint, after: usize) {
        self.inject_failure_with(point, after, point.default_result());
    }

    /// Like [`Self::inject_failure`], returning `result` from the failing call
    pub fn inject_failure_with(&self, point: FailPoint, after: usize, result: vk::Result) {
        self.state().failures.insert(point, (after, result));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Live buffers, memory blocks, images, views and samplers
    pub fn live_handle_count(&self) -> usize {
        let state = self.state();
        state.buffers.len() + state.memories.len() + state.images.len() + state.views.len() + state.samplers.len()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.state().buffers.len()
    }

    pub fn live_view_count(&self) -> usize {
        self.state().views.len()
    }

    /// Handles created over the device's lifetime
    pub fn total_created(&self) -> usize {
        self.state().total_created
    }

    /// Successful single-use submissions
    pub fn submissions(&self) -> usize {
        self.state().submissions
    }

    pub fn buffer_record(&self, buffer: vk::Buffer) -> Option<BufferRecord> {
        self.state().buffers.get(&buffer.as_raw()).cloned()
    }

    pub fn buffer_contents(&self, buffer: vk::Buffer) -> Option<Vec<u8>> {
        let state = self.state();
        let record = state.buffers.get(&buffer.as_raw())?;
        state.memories.get(&record.memory.as_raw()).map(|memory| memory.data.clone())
    }

    pub fn image_record(&self, image: vk::Image) -> Option<ImageRecord> {
        self.state().images.get(&image.as_raw()).cloned()
    }

    /// Texels of a live image, zeroed until something is copied in
    pub fn image_contents(&self, image: vk::Image) -> Option<Vec<u8>> {
        self.state().images.get(&image.as_raw()).map(|record| record.data.clone())
    }

    pub fn sampler_record(&self, sampler: vk::Sampler) -> Option<SamplerRecord> {
        self.state().samplers.get(&sampler.as_raw()).copied()
    }

    pub fn is_live_memory(&self, memory: vk::DeviceMemory) -> bool {
        self.state().memories.contains_key(&memory.as_raw())
    }

    pub fn is_live_view(&self, view: vk::ImageView) -> bool {
        self.state().views.contains(&view.as_raw())
    }

    pub fn is_live_sampler(&self, sampler: vk::Sampler) -> bool {
        self.state().samplers.contains_key(&sampler.as_raw())
    }

    pub fn barriers(&self) -> Vec<BarrierRecord> {
        self.state().barriers.clone()
    }

    /// Raw handles in the order they were destroyed or freed
    pub fn destroy_log(&self) -> Vec<u64> {
        self.state().destroy_log.clone()
    }

    pub fn clear_destroy_log(&self) {
        self.state().destroy_log.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        self.state().violations.clone()
    }
}

impl Default for TrackingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureDevice for TrackingDevice {
    fn allocate_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<(vk::Buffer, vk::DeviceMemory)> {
        let mut state = self.state();
        if let Some(result) = state.should_fail(FailPoint::StagingBuffer) {
            return Err(VulkanError::from_creation("buffer", result));
        }

        let raw = state.created();
        let memory = state.allocate_memory(size as usize, properties);
        state.buffers.insert(raw, BufferRecord {
            size,
            usage,
            memory,
            memory_properties: properties,
        });
        Ok((vk::Buffer::from_raw(raw), memory))
    }

    fn write_host_memory(&self, memory: vk::DeviceMemory, data: &[u8]) -> VulkanResult<()> {
        let mut state = self.state();
        if let Some(result) = state.should_fail(FailPoint::HostWrite) {
            return Err(VulkanError::from_memory_op("staging memory", result));
        }

        let violation = match state.memories.get_mut(&memory.as_raw()) {
            None => Some(format!("write to unknown memory {:?}", memory)),
            Some(record) if !record.properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) => {
                Some(format!("map of non-host-visible memory {:?}", memory))
            }
            Some(record) if record.data.len() < data.len() => {
                Some(format!("write of {} bytes into {} byte memory", data.len(), record.data.len()))
            }
            Some(record) => {
                record.data[..data.len()].copy_from_slice(data);
                None
            }
        };
        state.violations.extend(violation);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        let mut state = self.state();
        let was_live = state.buffers.remove(&buffer.as_raw()).is_some();
        state.destroyed("buffer", buffer.as_raw(), was_live);
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        let mut state = self.state();
        let still_bound = state.buffers.values().any(|buffer| buffer.memory == memory)
            || state.images.values().any(|image| image.memory == memory);
        if still_bound {
            state.violations.push(format!("memory {:?} freed while still bound", memory));
        }

        let was_live = state.memories.remove(&memory.as_raw()).is_some();
        state.destroyed("memory", memory.as_raw(), was_live);
    }

    fn allocate_image(
        &self,
        spec: &ImageSpec,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<(vk::Image, vk::DeviceMemory)> {
        let mut state = self.state();
        if let Some(result) = state.should_fail(FailPoint::ImageAllocation) {
            return Err(VulkanError::from_creation("image memory", result));
        }

        let size = spec.extent.width as usize * spec.extent.height as usize * 4;
        let raw = state.created();
        let memory = state.allocate_memory(size, properties);
        state.images.insert(raw, ImageRecord {
            spec: *spec,
            memory,
            memory_properties: properties,
            layout: vk::ImageLayout::UNDEFINED,
            data: vec![0; size],
        });
        Ok((vk::Image::from_raw(raw), memory))
    }

    fn destroy_image(&self, image: vk::Image) {
        let mut state = self.state();
        let was_live = state.images.remove(&image.as_raw()).is_some();
        state.destroyed("image", image.as_raw(), was_live);
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VulkanResult<vk::ImageView> {
        let mut state = self.state();
        if let Some(result) = state.should_fail(FailPoint::ImageView) {
            return Err(VulkanError::from_creation("image view", result));
        }
        if !state.images.contains_key(&info.image.as_raw()) {
            state.violations.push(format!("view created for unknown image {:?}", info.image));
        }

        let raw = state.created();
        state.views.insert(raw);
        Ok(vk::ImageView::from_raw(raw))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        let mut state = self.state();
        let was_live = state.views.remove(&view.as_raw());
        state.destroyed("image view", view.as_raw(), was_live);
    }

    fn create_sampler(&self, info: &vk::SamplerCreateInfo) -> VulkanResult<vk::Sampler> {
        let mut state = self.state();
        if let Some(result) = state.should_fail(FailPoint::Sampler) {
            return Err(VulkanError::from_creation("sampler", result));
        }

        let raw = state.created();
        state.samplers.insert(raw, SamplerRecord {
            anisotropy_enable: info.anisotropy_enable == vk::TRUE,
            max_anisotropy: info.max_anisotropy,
            mag_filter: info.mag_filter,
            address_mode_u: info.address_mode_u,
        });
        Ok(vk::Sampler::from_raw(raw))
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        let mut state = self.state();
        let was_live = state.samplers.remove(&sampler.as_raw()).is_some();
        state.destroyed("sampler", sampler.as_raw(), was_live);
    }

    fn max_sampler_anisotropy(&self) -> f32 {
        self.max_anisotropy
    }

    fn cmd_pipeline_barrier(
        &self,
        _command_buffer: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier,
    ) {
        let mut state = self.state();
        let violation = match state.images.get_mut(&barrier.image.as_raw()) {
            None => Some(format!("barrier on unknown image {:?}", barrier.image)),
            Some(record) => {
                let mismatch = barrier.old_layout != vk::ImageLayout::UNDEFINED && barrier.old_layout != record.layout;
                let message = format!(
                    "barrier on {:?} expects {:?} but image is in {:?}",
                    barrier.image, barrier.old_layout, record.layout
                );
                record.layout = barrier.new_layout;
                mismatch.then_some(message)
            }
        };
        state.violations.extend(violation);

        state.barriers.push(BarrierRecord {
            image: barrier.image,
            src_stage,
            dst_stage,
            src_access: barrier.src_access_mask,
            dst_access: barrier.dst_access_mask,
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
        });
    }

    fn cmd_copy_buffer_to_image(
        &self,
        _command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        region: &vk::BufferImageCopy,
    ) {
        let mut state = self.state();
        let bytes = match state.buffers.get(&buffer.as_raw()) {
            Some(record) => state.memories.get(&record.memory.as_raw()).map(|memory| memory.data.clone()),
            None => None,
        };

        let violation = match (bytes, state.images.get_mut(&image.as_raw())) {
            (None, _) => Some(format!("copy from unknown buffer {:?}", buffer)),
            (_, None) => Some(format!("copy into unknown image {:?}", image)),
            (Some(bytes), Some(record)) => {
                let needed = region.image_extent.width as usize * region.image_extent.height as usize * 4;
                if layout != vk::ImageLayout::TRANSFER_DST_OPTIMAL || record.layout != layout {
                    Some(format!("copy into {:?} in layout {:?}", image, record.layout))
                } else if bytes.len() < needed || record.data.len() < needed {
                    Some(format!("copy of {} bytes from {} byte buffer", needed, bytes.len()))
                } else {
                    record.data[..needed].copy_from_slice(&bytes[..needed]);
                    None
                }
            }
        };
        state.violations.extend(violation);
    }
}

impl CommandContext for TrackingDevice {
    fn execute_single_use(
        &self,
        _queue: vk::Queue,
        record: &mut dyn FnMut(vk::CommandBuffer) -> VulkanResult<()>,
    ) -> VulkanResult<()> {
        let command_buffer = vk::CommandBuffer::from_raw(self.state().new_handle());

        // Unlocked while recording: the closure calls back into the device
        record(command_buffer)?;

        let mut state = self.state();
        if let Some(result) = state.should_fail(FailPoint::Submit) {
            return Err(VulkanError::Api(result));
        }
        state.submissions += 1;
        Ok(())
    }
}
