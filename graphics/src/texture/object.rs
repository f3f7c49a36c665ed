//! Texture objects.
//!
//! A [`TextureObject`] owns the GPU resource for one unique
//! [`TextureIdentifier`]. Loading happens in two phases driven by the
//! owning registry: [`load`](TextureObject::load) decodes CPU-side data
//! (called in parallel across objects) and
//! [`commit_gpu`](TextureObject::commit_gpu) uploads it (called serially).

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use oleander_core::math::{BoundingBox, Mat4};
use oleander_core::texture::{CpuTexture, TextureDimension, TextureFormat};
use parking_lot::{Mutex, RwLock};

use crate::device::GraphicsDevice;
use crate::resources::Texture;
use crate::types::{Extent3d, TextureDescriptor, TextureUsage};

use super::identifier::TextureIdentifier;
use super::source::{PtexSource, SourceField, SourceTexture, TextureSource, UdimTile, WrapHints};
use super::TextureType;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// CPU-side data produced by the load phase, consumed by the commit phase.
enum StagedLoad {
    None,
    Failed,
    Uv(SourceTexture),
    Field(SourceField),
    Udim(Vec<UdimTile>),
    Ptex(PtexSource),
}

/// Committed GPU state, one variant per texture family.
enum TexturePayload {
    Uv {
        /// Populated by the application instead of the load phase.
        external: bool,
        texture: Option<Arc<Texture>>,
        wrap_hints: WrapHints,
    },
    Field {
        texture: Option<Arc<Texture>>,
        bounding_box: BoundingBox,
        sampling_transform: Mat4,
    },
    Udim {
        texels: Option<Arc<Texture>>,
        layout: Option<Arc<Texture>>,
    },
    Ptex {
        texels: Option<Arc<Texture>>,
        layout: Option<Arc<Texture>>,
    },
}

impl TexturePayload {
    fn gpu_bytes(&self) -> i64 {
        let bytes = |t: &Option<Arc<Texture>>| t.as_ref().map_or(0, |t| t.byte_size());
        let total = match self {
            Self::Uv { texture, .. } | Self::Field { texture, .. } => bytes(texture),
            Self::Udim { texels, layout } | Self::Ptex { texels, layout } => {
                bytes(texels) + bytes(layout)
            }
        };
        total as i64
    }
}

/// The GPU resource behind one unique texture identifier.
///
/// Created by [`TextureObjectRegistry::allocate_texture_object`]; all
/// consumers asking for the same identifier share one object. Mutation
/// only happens during the registry's commit, never concurrently with
/// consumer reads of committed state.
///
/// [`TextureObjectRegistry::allocate_texture_object`]:
///     super::TextureObjectRegistry::allocate_texture_object
pub struct TextureObject {
    identifier: TextureIdentifier,
    texture_type: TextureType,
    object_id: u64,
    target_memory: AtomicU64,
    valid: AtomicBool,
    staged: Mutex<StagedLoad>,
    payload: RwLock<TexturePayload>,
    /// Bytes this object currently contributes to `total_memory`.
    gpu_memory: AtomicI64,
    /// Aggregate counter shared with the owning registry.
    total_memory: Arc<AtomicI64>,
}

impl TextureObject {
    pub(crate) fn new(
        identifier: TextureIdentifier,
        texture_type: TextureType,
        total_memory: Arc<AtomicI64>,
    ) -> Self {
        let payload = match texture_type {
            TextureType::Uv => TexturePayload::Uv {
                external: identifier.is_dynamic(),
                texture: None,
                wrap_hints: WrapHints::default(),
            },
            TextureType::Field => TexturePayload::Field {
                texture: None,
                bounding_box: BoundingBox::unit(),
                sampling_transform: Mat4::identity(),
            },
            TextureType::Udim => TexturePayload::Udim {
                texels: None,
                layout: None,
            },
            TextureType::Ptex => TexturePayload::Ptex {
                texels: None,
                layout: None,
            },
        };
        Self {
            identifier,
            texture_type,
            object_id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            target_memory: AtomicU64::new(0),
            valid: AtomicBool::new(false),
            staged: Mutex::new(StagedLoad::None),
            payload: RwLock::new(payload),
            gpu_memory: AtomicI64::new(0),
            total_memory,
        }
    }

    /// The identifier this object was created for.
    pub fn identifier(&self) -> &TextureIdentifier {
        &self.identifier
    }

    /// The texture family this object belongs to.
    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    /// Process-unique id, stable for the object's lifetime.
    pub fn object_id(&self) -> u64 {
        self.object_id
    }

    /// Current byte budget, 0 meaning unconstrained.
    pub fn target_memory(&self) -> u64 {
        self.target_memory.load(Ordering::Acquire)
    }

    pub(crate) fn store_target_memory(&self, target: u64) {
        self.target_memory.store(target, Ordering::Release);
    }

    /// Whether the last load and upload produced a usable GPU resource.
    ///
    /// `false` until the first commit, and after any failed reload.
    /// Callers must substitute a fallback value while this reports
    /// `false`.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Whether the GPU resource is populated by the application rather
    /// than loaded from the file path.
    pub fn is_external(&self) -> bool {
        self.texture_type == TextureType::Uv && self.identifier.is_dynamic()
    }

    /// Committed texel texture (the main texture for every family).
    pub fn texture(&self) -> Option<Arc<Texture>> {
        match &*self.payload.read() {
            TexturePayload::Uv { texture, .. } | TexturePayload::Field { texture, .. } => {
                texture.clone()
            }
            TexturePayload::Udim { texels, .. } | TexturePayload::Ptex { texels, .. } => {
                texels.clone()
            }
        }
    }

    /// Committed layout texture (UDIM and Ptex only).
    pub fn layout_texture(&self) -> Option<Arc<Texture>> {
        match &*self.payload.read() {
            TexturePayload::Udim { layout, .. } | TexturePayload::Ptex { layout, .. } => {
                layout.clone()
            }
            _ => None,
        }
    }

    /// Wrap modes the backing file recommended, if any (UV only).
    pub fn wrap_hints(&self) -> WrapHints {
        match &*self.payload.read() {
            TexturePayload::Uv { wrap_hints, .. } => *wrap_hints,
            _ => WrapHints::default(),
        }
    }

    /// World-space extent of the field (field textures only, meaningful
    /// after commit).
    pub fn field_bounding_box(&self) -> Option<BoundingBox> {
        match &*self.payload.read() {
            TexturePayload::Field { bounding_box, .. } => Some(*bounding_box),
            _ => None,
        }
    }

    /// Transform from world space into [0, 1]^3 sampling coordinates
    /// (field textures only, meaningful after commit).
    pub fn field_sampling_transform(&self) -> Option<Mat4> {
        match &*self.payload.read() {
            TexturePayload::Field {
                sampling_transform, ..
            } => Some(*sampling_transform),
            _ => None,
        }
    }

    /// Swap in an application-provided GPU texture.
    ///
    /// Only legal for dynamically populated UV textures; any other call
    /// is a contract violation and is logged and ignored. Mark the
    /// object dirty afterwards so consumers re-bind on the next commit.
    pub fn set_external_texture(&self, texture: Arc<Texture>) {
        {
            let mut payload = self.payload.write();
            match &mut *payload {
                TexturePayload::Uv {
                    external: true,
                    texture: slot,
                    ..
                } => {
                    *slot = Some(texture);
                }
                _ => {
                    log::error!(
                        "set_external_texture called on non-dynamic texture {}",
                        self.identifier.file_path()
                    );
                    return;
                }
            }
        }
        self.sync_memory_counter();
        self.valid.store(true, Ordering::Release);
    }

    /// CPU phase: decode source data at the current target memory.
    ///
    /// Safe to call in parallel across different objects. Externally
    /// populated textures skip this phase.
    pub(crate) fn load(&self, source: &dyn TextureSource) {
        if self.is_external() {
            return;
        }
        let target = self.target_memory();
        let staged = match self.texture_type {
            TextureType::Uv => match source.load_uv(&self.identifier, target) {
                Ok(data) => StagedLoad::Uv(data),
                Err(err) => self.load_failed(err),
            },
            TextureType::Field => match source.load_field(&self.identifier, target) {
                Ok(data) => StagedLoad::Field(data),
                Err(err) => self.load_failed(err),
            },
            TextureType::Udim => match source.load_udim_tiles(&self.identifier, target) {
                Ok(tiles) if !tiles.is_empty() => StagedLoad::Udim(tiles),
                Ok(_) => self.load_failed(super::TextureSourceError::NotFound(
                    self.identifier.file_path().to_string(),
                )),
                Err(err) => self.load_failed(err),
            },
            TextureType::Ptex => match source.load_ptex(&self.identifier, target) {
                Ok(data) => StagedLoad::Ptex(data),
                Err(err) => self.load_failed(err),
            },
        };
        *self.staged.lock() = staged;
    }

    fn load_failed(&self, err: super::TextureSourceError) -> StagedLoad {
        log::warn!(
            "failed to load texture {}: {}",
            self.identifier.file_path(),
            err
        );
        StagedLoad::Failed
    }

    /// GPU phase: upload staged data, replacing any previous resource.
    ///
    /// Must be called serially across objects. A failed load clears the
    /// committed resource and leaves the object invalid.
    pub(crate) fn commit_gpu(&self, device: &Arc<GraphicsDevice>) {
        let staged = std::mem::replace(&mut *self.staged.lock(), StagedLoad::None);
        let valid = match staged {
            // Nothing staged: externally populated, or a spurious dirty
            // mark. Leave committed state untouched.
            StagedLoad::None => return,
            StagedLoad::Failed => {
                self.clear_committed();
                false
            }
            StagedLoad::Uv(source) => {
                let texture = self.create_gpu_texture(device, &source.texture);
                let valid = texture.is_some();
                if let TexturePayload::Uv {
                    texture: slot,
                    wrap_hints,
                    ..
                } = &mut *self.payload.write()
                {
                    *slot = texture;
                    *wrap_hints = source.wrap_hints;
                }
                valid
            }
            StagedLoad::Field(source) => {
                let texture = self.create_gpu_texture(device, &source.texture);
                let valid = texture.is_some();
                if let TexturePayload::Field {
                    texture: slot,
                    bounding_box,
                    sampling_transform,
                } = &mut *self.payload.write()
                {
                    *slot = texture;
                    *bounding_box = source.bounding_box;
                    *sampling_transform = source.bounding_box.sampling_transform();
                }
                valid
            }
            StagedLoad::Udim(tiles) => match build_udim_array(&tiles) {
                Ok((array, layout)) => {
                    let texels = self.create_gpu_texture(device, &array);
                    let layout_cpu = CpuTexture::new_2d(
                        layout.len() as u32,
                        1,
                        TextureFormat::R32Float,
                        bytemuck::cast_slice(&layout).to_vec(),
                    );
                    let layout = self.create_gpu_texture(device, &layout_cpu);
                    let valid = texels.is_some() && layout.is_some();
                    if let TexturePayload::Udim {
                        texels: texel_slot,
                        layout: layout_slot,
                    } = &mut *self.payload.write()
                    {
                        *texel_slot = texels;
                        *layout_slot = layout;
                    }
                    valid
                }
                Err(reason) => {
                    log::warn!(
                        "failed to assemble UDIM texture {}: {}",
                        self.identifier.file_path(),
                        reason
                    );
                    self.clear_committed();
                    false
                }
            },
            StagedLoad::Ptex(source) => {
                if source.layout.is_empty() {
                    log::warn!(
                        "ptex texture {} has an empty layout",
                        self.identifier.file_path()
                    );
                    self.clear_committed();
                    false
                } else {
                    let texels = self.create_gpu_texture(device, &source.texels);
                    let layout_cpu = CpuTexture::new_2d(
                        source.layout.len() as u32,
                        1,
                        TextureFormat::R32Uint,
                        bytemuck::cast_slice(&source.layout).to_vec(),
                    );
                    let layout = self.create_gpu_texture(device, &layout_cpu);
                    let valid = texels.is_some() && layout.is_some();
                    if let TexturePayload::Ptex {
                        texels: texel_slot,
                        layout: layout_slot,
                    } = &mut *self.payload.write()
                    {
                        *texel_slot = texels;
                        *layout_slot = layout;
                    }
                    valid
                }
            }
        };
        self.sync_memory_counter();
        self.valid.store(valid, Ordering::Release);
    }

    fn clear_committed(&self) {
        match &mut *self.payload.write() {
            TexturePayload::Uv { texture, .. } | TexturePayload::Field { texture, .. } => {
                *texture = None;
            }
            TexturePayload::Udim { texels, layout } | TexturePayload::Ptex { texels, layout } => {
                *texels = None;
                *layout = None;
            }
        }
    }

    fn create_gpu_texture(
        &self,
        device: &Arc<GraphicsDevice>,
        cpu: &CpuTexture,
    ) -> Option<Arc<Texture>> {
        let descriptor = TextureDescriptor {
            label: Some(self.identifier.file_path().to_string()),
            size: Extent3d::new_3d(cpu.width, cpu.height, cpu.depth),
            dimension: cpu.dimension,
            mip_level_count: cpu.mip_level_count,
            format: cpu.format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        };
        match device.create_texture_with_data(&descriptor, &cpu.data) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::error!(
                    "failed to create GPU texture for {}: {}",
                    self.identifier.file_path(),
                    err
                );
                None
            }
        }
    }

    /// Bring the aggregate memory counter in line with the payload.
    fn sync_memory_counter(&self) {
        let current = self.payload.read().gpu_bytes();
        let previous = self.gpu_memory.swap(current, Ordering::AcqRel);
        let delta = current - previous;
        if delta != 0 {
            self.total_memory.fetch_add(delta, Ordering::AcqRel);
        }
    }
}

impl Drop for TextureObject {
    fn drop(&mut self) {
        let remaining = self.gpu_memory.load(Ordering::Acquire);
        if remaining != 0 {
            self.total_memory.fetch_sub(remaining, Ordering::AcqRel);
        }
    }
}

impl std::fmt::Debug for TextureObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureObject")
            .field("identifier", &self.identifier)
            .field("texture_type", &self.texture_type)
            .field("valid", &self.is_valid())
            .field("target_memory", &self.target_memory())
            .finish()
    }
}

// Ensure TextureObject is Send + Sync
static_assertions::assert_impl_all!(TextureObject: Send, Sync);

/// Pack UDIM tiles into array layers plus the 100-entry layout table.
///
/// Tiles are padded (not scaled) to the largest tile's dimensions. The
/// layout maps tile slot to layer index plus one, 0 marking a missing
/// tile.
fn build_udim_array(tiles: &[UdimTile]) -> Result<(CpuTexture, Vec<f32>), String> {
    let first = tiles.first().ok_or_else(|| "no tiles".to_string())?;
    let format = first.texture.format;

    let mut max_w = 0u32;
    let mut max_h = 0u32;
    for tile in tiles {
        if tile.texture.format != format {
            return Err("tiles disagree on pixel format".to_string());
        }
        if tile.texture.dimension != TextureDimension::D2 {
            return Err("tiles must be planar".to_string());
        }
        if !(1001..=1100).contains(&tile.tile) {
            return Err(format!("tile {} outside the 1001..=1100 range", tile.tile));
        }
        max_w = max_w.max(tile.texture.width);
        max_h = max_h.max(tile.texture.height);
    }

    let block = format.block_size() as usize;
    let layer_bytes = max_w as usize * max_h as usize * block;
    let mut data = vec![0u8; layer_bytes * tiles.len()];
    for (layer, tile) in tiles.iter().enumerate() {
        let src_row = tile.texture.width as usize * block;
        let dst_row = max_w as usize * block;
        let base = layer * layer_bytes;
        for y in 0..tile.texture.height as usize {
            let src = y * src_row;
            let dst = base + y * dst_row;
            data[dst..dst + src_row].copy_from_slice(&tile.texture.data[src..src + src_row]);
        }
    }

    let mut layout = vec![0.0f32; 100];
    for (layer, tile) in tiles.iter().enumerate() {
        layout[(tile.tile - 1001) as usize] = (layer + 1) as f32;
    }

    Ok((
        CpuTexture::new_2d_array(max_w, max_h, tiles.len() as u32, format, data),
        layout,
    ))
}
