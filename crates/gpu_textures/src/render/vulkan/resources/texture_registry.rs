//! Texture registry
//!
//! Owns an ordered list of texture slots. Sources are registered up front,
//! uploaded in registration order by [`TextureRegistry::setup_all`] and
//! destroyed by [`TextureRegistry::teardown_all`] (or when the registry is
//! dropped).
//!
//! Setup is fail-fast: the first failing slot aborts the batch. Slots that
//! were already uploaded stay valid and are still released by teardown; the
//! failing slot and every slot after it stay empty.

use ash::vk;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use crate::assets::{AssetError, ImageData};
use crate::config::Config;
use crate::render::vulkan::{CommandContext, SamplerPolicy, Texture, TextureDevice, VulkanError};

/// Texture setup errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// The source could not be opened or decoded
    #[error("Failed to load texture image {source_id}: {source}")]
    ImageLoad {
        /// The source that failed
        source_id: String,
        /// Underlying decode error
        source: AssetError,
    },

    /// GPU resource creation or upload failed
    #[error(transparent)]
    Vulkan(#[from] VulkanError),
}

/// Result type for texture setup
pub type TextureResult<T> = Result<T, TextureError>;

/// Where a slot's pixels come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// Image file decoded at setup time
    File(PathBuf),
    /// Pixels already in memory, identified by a label
    Pixels {
        /// Name used in logs and errors
        label: String,
        /// RGBA8 pixels
        image: ImageData,
    },
}

impl TextureSource {
    /// A 1x1 texture of a single color
    pub fn solid_color(label: impl Into<String>, color: [u8; 4]) -> Self {
        Self::Pixels {
            label: label.into(),
            image: ImageData::solid_color(1, 1, color),
        }
    }

    /// 1x1 opaque white, the neutral base color
    pub fn default_white() -> Self {
        Self::solid_color("default_white", [255, 255, 255, 255])
    }

    /// 1x1 flat tangent-space normal (pointing up)
    pub fn default_normal() -> Self {
        Self::solid_color("default_normal", [128, 128, 255, 255])
    }

    /// Decode (or copy) the source pixels
    pub fn load(&self) -> TextureResult<ImageData> {
        match self {
            Self::File(path) => ImageData::from_file(path).map_err(|source| TextureError::ImageLoad {
                source_id: self.to_string(),
                source,
            }),
            Self::Pixels { image, .. } => Ok(image.clone()),
        }
    }
}

impl fmt::Display for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Pixels { label, .. } => write!(f, "<{}>", label),
        }
    }
}

impl From<PathBuf> for TextureSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&str> for TextureSource {
    fn from(path: &str) -> Self {
        Self::File(PathBuf::from(path))
    }
}

impl From<String> for TextureSource {
    fn from(path: String) -> Self {
        Self::File(PathBuf::from(path))
    }
}

/// Ordered texture list plus the sampling policy, stored as TOML or RON
///
/// ```toml
/// textures = ["textures/crate.png", "textures/floor.png"]
///
/// [sampler]
/// filter_mode = "linear"
/// wrap_mode = "repeat"
/// anisotropy = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureManifest {
    /// Texture files in slot order
    pub textures: Vec<PathBuf>,
    /// Sampling policy for every texture
    pub sampler: SamplerPolicy,
}

impl Config for TextureManifest {}

/// One registry entry: a source and, once uploaded, its texture
pub struct TextureSlot<D: TextureDevice + ?Sized> {
    source: TextureSource,
    texture: Option<Texture<D>>,
}

impl<D: TextureDevice + ?Sized> TextureSlot<D> {
    /// The source this slot was registered with
    pub fn source(&self) -> &TextureSource {
        &self.source
    }

    /// The uploaded texture, if setup reached this slot
    pub fn texture(&self) -> Option<&Texture<D>> {
        self.texture.as_ref()
    }

    /// Whether the slot holds live GPU handles
    pub fn is_populated(&self) -> bool {
        self.texture.is_some()
    }
}

/// Owner of every texture slot
pub struct TextureRegistry<D: TextureDevice + ?Sized> {
    device: Arc<D>,
    policy: SamplerPolicy,
    slots: Vec<TextureSlot<D>>,
}

impl<D: TextureDevice + ?Sized> TextureRegistry<D> {
    /// Create an empty registry
    pub fn new(device: Arc<D>, policy: SamplerPolicy) -> Self {
        Self {
            device,
            policy,
            slots: Vec::new(),
        }
    }

    /// Create a registry with every texture of `manifest` registered in order
    pub fn from_manifest(device: Arc<D>, manifest: TextureManifest) -> Self {
        let mut registry = Self::new(device, manifest.sampler);
        for path in manifest.textures {
            registry.register(path);
        }
        registry
    }

    /// Append a source and return its slot index
    ///
    /// Pure bookkeeping: no GPU work happens until [`Self::setup_all`].
    pub fn register(&mut self, source: impl Into<TextureSource>) -> usize {
        let source = source.into();
        log::trace!("Registered texture slot {}: {}", self.slots.len(), source);
        self.slots.push(TextureSlot {
            source,
            texture: None,
        });
        self.slots.len() - 1
    }

    /// Upload every empty slot in registration order
    ///
    /// Each upload completes on the GPU before the next begins. Stops at the
    /// first failure and returns it; earlier slots keep their textures.
    /// Slots that are already populated are skipped.
    pub fn setup_all<C: CommandContext + ?Sized>(
        &mut self,
        queue: vk::Queue,
        commands: &C,
    ) -> TextureResult<()> {
        let mut uploaded = 0;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.texture.is_some() {
                continue;
            }

            let result = slot.source.load().and_then(|image_data| {
                Texture::from_image_data(&self.device, commands, queue, image_data, &self.policy)
                    .map_err(TextureError::from)
            });

            match result {
                Ok(texture) => {
                    log::debug!("Texture slot {} ready: {}", index, slot.source);
                    slot.texture = Some(texture);
                    uploaded += 1;
                }
                Err(e) => {
                    log::error!("Texture slot {} ({}) failed: {}", index, slot.source, e);
                    return Err(e);
                }
            }
        }

        log::info!("Uploaded {} texture(s), {} slot(s) registered", uploaded, self.slots.len());
        Ok(())
    }

    /// Destroy the GPU handles of every populated slot
    ///
    /// The caller must ensure no submitted GPU work still uses the textures
    /// (e.g. by waiting for the device to go idle). Empty slots are left
    /// untouched, so calling this twice, or after a failed setup, is safe.
    pub fn teardown_all(&mut self) {
        let mut destroyed = 0;
        for slot in &mut self.slots {
            if slot.texture.take().is_some() {
                destroyed += 1;
            }
        }

        if destroyed > 0 {
            log::info!("Destroyed {} texture(s)", destroyed);
        }
    }

    /// Number of registered slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding live GPU handles
    pub fn populated_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_populated()).count()
    }

    /// Get a slot by index
    pub fn slot(&self, index: usize) -> Option<&TextureSlot<D>> {
        self.slots.get(index)
    }

    /// Iterate over all slots in registration order
    pub fn slots(&self) -> impl Iterator<Item = &TextureSlot<D>> {
        self.slots.iter()
    }

    /// Get the uploaded texture of a slot
    pub fn texture(&self, index: usize) -> Option<&Texture<D>> {
        self.slots.get(index).and_then(TextureSlot::texture)
    }

    /// Combined image sampler binding for a populated slot
    pub fn descriptor_image_info(&self, index: usize) -> Option<vk::DescriptorImageInfo> {
        self.texture(index).map(Texture::descriptor_image_info)
    }

    /// The sampling policy used for new textures
    pub fn policy(&self) -> &SamplerPolicy {
        &self.policy
    }
}

impl<D: TextureDevice + ?Sized> Drop for TextureRegistry<D> {
    fn drop(&mut self) {
        self.teardown_all();
    }
}
