//! Texture decoding seam.
//!
//! The cache never reads files itself; a [`TextureSource`] turns an
//! identifier into CPU-side pixel data during the parallel load phase.
//! [`MemoryTextureSource`] serves pre-registered data for tests and
//! dynamically generated content; [`FileTextureSource`] (behind the
//! `image-loading` feature) decodes image files from disk.

use std::path::PathBuf;

use oleander_core::math::BoundingBox;
use oleander_core::sampler::AddressMode;
use oleander_core::texture::{CpuTexture, TextureDimension};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::identifier::TextureIdentifier;

/// Wrap modes a texture file recommends for itself.
///
/// `None` on an axis means the file expressed no opinion and the
/// consumer's sampler parameters apply unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapHints {
    /// Recommended wrap mode for the U axis.
    pub u: Option<AddressMode>,
    /// Recommended wrap mode for the V axis.
    pub v: Option<AddressMode>,
}

/// Decoded planar texture plus file metadata.
#[derive(Debug, Clone)]
pub struct SourceTexture {
    /// Decoded texels.
    pub texture: CpuTexture,
    /// Wrap modes recommended by the file, if any.
    pub wrap_hints: WrapHints,
}

impl SourceTexture {
    /// Source texture with no wrap hints.
    pub fn new(texture: CpuTexture) -> Self {
        Self {
            texture,
            wrap_hints: WrapHints::default(),
        }
    }
}

/// Decoded volumetric field plus its spatial extent.
#[derive(Debug, Clone)]
pub struct SourceField {
    /// Decoded voxels.
    pub texture: CpuTexture,
    /// World-space extent of the field.
    pub bounding_box: BoundingBox,
}

/// One decoded UDIM tile.
#[derive(Debug, Clone)]
pub struct UdimTile {
    /// Tile number in the 1001..=1100 convention.
    pub tile: u32,
    /// Decoded texels for this tile.
    pub texture: CpuTexture,
}

/// Decoded Ptex data: texels plus the per-face layout table.
#[derive(Debug, Clone)]
pub struct PtexSource {
    /// Face texels, packed into array layers.
    pub texels: CpuTexture,
    /// Per-face layout entries, uploaded as an integer texture.
    pub layout: Vec<u32>,
}

/// Errors a texture source can report.
///
/// These never abort a commit; the owning texture object records them,
/// reports `is_valid() == false` and the caller substitutes a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureSourceError {
    /// No data exists for the requested identifier.
    #[error("texture not found: {0}")]
    NotFound(String),
    /// Data exists but could not be decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// The path that failed.
        path: String,
        /// Decoder diagnostic.
        reason: String,
    },
    /// The source cannot serve this kind of request.
    #[error("unsupported texture request: {0}")]
    Unsupported(String),
}

/// Decodes identifiers into CPU-side pixel data.
///
/// Called from the parallel load phase; implementations must tolerate
/// concurrent calls for different identifiers. `target_memory` is the
/// texture's current byte budget (0 means unconstrained) and sources are
/// expected to downsample oversized data, typically via
/// [`shrink_to_budget`].
pub trait TextureSource: Send + Sync {
    /// Decode a planar texture.
    fn load_uv(
        &self,
        identifier: &TextureIdentifier,
        target_memory: u64,
    ) -> Result<SourceTexture, TextureSourceError>;

    /// Decode a volumetric field.
    fn load_field(
        &self,
        identifier: &TextureIdentifier,
        target_memory: u64,
    ) -> Result<SourceField, TextureSourceError>;

    /// Decode every tile of a UDIM set.
    fn load_udim_tiles(
        &self,
        identifier: &TextureIdentifier,
        target_memory: u64,
    ) -> Result<Vec<UdimTile>, TextureSourceError>;

    /// Decode Ptex texels and layout.
    fn load_ptex(
        &self,
        identifier: &TextureIdentifier,
        target_memory: u64,
    ) -> Result<PtexSource, TextureSourceError>;
}

/// Downsample a single-mip texture until it fits `target_memory` bytes.
///
/// Nearest-neighbor sampling with a power-of-two stride; width and height
/// shrink (depth too for volumes, array layer counts are preserved) until
/// the data fits or every shrinkable axis reaches one texel. A budget of 0
/// means unconstrained. Textures that already fit, or that carry mip
/// chains, are returned unchanged.
pub fn shrink_to_budget(texture: &CpuTexture, target_memory: u64) -> CpuTexture {
    if target_memory == 0 || texture.byte_size() <= target_memory || texture.mip_level_count != 1 {
        return texture.clone();
    }

    let block = texture.format.block_size() as u64;
    let shrink_depth = texture.dimension == TextureDimension::D3;

    let mut stride: u32 = 1;
    loop {
        let w = (texture.width / stride).max(1) as u64;
        let h = (texture.height / stride).max(1) as u64;
        let d = if shrink_depth {
            (texture.depth / stride).max(1) as u64
        } else {
            texture.depth as u64
        };
        let exhausted = w == 1 && h == 1 && (!shrink_depth || d == 1);
        if w * h * d * block <= target_memory || exhausted {
            break;
        }
        stride *= 2;
    }
    if stride == 1 {
        return texture.clone();
    }

    let w = (texture.width / stride).max(1);
    let h = (texture.height / stride).max(1);
    let d = if shrink_depth {
        (texture.depth / stride).max(1)
    } else {
        texture.depth
    };

    let block = block as usize;
    let src_row = texture.width as usize * block;
    let src_slice = texture.height as usize * src_row;
    let mut data = Vec::with_capacity(w as usize * h as usize * d as usize * block);
    for z in 0..d {
        let sz = if shrink_depth {
            (z * stride).min(texture.depth - 1) as usize
        } else {
            z as usize
        };
        for y in 0..h {
            let sy = (y * stride).min(texture.height - 1) as usize;
            for x in 0..w {
                let sx = (x * stride).min(texture.width - 1) as usize;
                let offset = sz * src_slice + sy * src_row + sx * block;
                data.extend_from_slice(&texture.data[offset..offset + block]);
            }
        }
    }

    CpuTexture {
        dimension: texture.dimension,
        width: w,
        height: h,
        depth: d,
        format: texture.format,
        mip_level_count: 1,
        data,
    }
}

/// Expand a `<UDIM>` path pattern into the tiles that exist on disk.
///
/// Probes the 1001..=1100 tile range. Returns an empty list when the
/// pattern contains no `<UDIM>` token or no tile file exists.
pub fn resolve_udim_tiles(file_path: &str) -> Vec<(u32, PathBuf)> {
    if !file_path.contains("<UDIM>") {
        return Vec::new();
    }
    let mut tiles = Vec::new();
    for tile in 1001..=1100u32 {
        let candidate = PathBuf::from(file_path.replace("<UDIM>", &tile.to_string()));
        if candidate.is_file() {
            tiles.push((tile, candidate));
        }
    }
    tiles
}

/// In-memory texture source.
///
/// Serves data registered up front, keyed by file path. Registered data is
/// served as-is apart from budget downsampling; flip and premultiply flags
/// in the identifier are assumed to be already applied by whoever authored
/// the data.
#[derive(Default)]
pub struct MemoryTextureSource {
    uv: RwLock<FxHashMap<String, SourceTexture>>,
    fields: RwLock<FxHashMap<String, SourceField>>,
    udim: RwLock<FxHashMap<String, Vec<UdimTile>>>,
    ptex: RwLock<FxHashMap<String, PtexSource>>,
}

impl MemoryTextureSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a planar texture under `path`.
    pub fn add_uv(&self, path: impl Into<String>, texture: SourceTexture) {
        self.uv.write().insert(path.into(), texture);
    }

    /// Register a volumetric field under `path`.
    pub fn add_field(&self, path: impl Into<String>, field: SourceField) {
        self.fields.write().insert(path.into(), field);
    }

    /// Register a UDIM tile set under `path`.
    pub fn add_udim(&self, path: impl Into<String>, tiles: Vec<UdimTile>) {
        self.udim.write().insert(path.into(), tiles);
    }

    /// Register Ptex data under `path`.
    pub fn add_ptex(&self, path: impl Into<String>, ptex: PtexSource) {
        self.ptex.write().insert(path.into(), ptex);
    }

    /// Drop everything registered under `path`.
    pub fn remove(&self, path: &str) {
        self.uv.write().remove(path);
        self.fields.write().remove(path);
        self.udim.write().remove(path);
        self.ptex.write().remove(path);
    }
}

impl TextureSource for MemoryTextureSource {
    fn load_uv(
        &self,
        identifier: &TextureIdentifier,
        target_memory: u64,
    ) -> Result<SourceTexture, TextureSourceError> {
        let guard = self.uv.read();
        let source = guard
            .get(identifier.file_path())
            .ok_or_else(|| TextureSourceError::NotFound(identifier.file_path().to_string()))?;
        Ok(SourceTexture {
            texture: shrink_to_budget(&source.texture, target_memory),
            wrap_hints: source.wrap_hints,
        })
    }

    fn load_field(
        &self,
        identifier: &TextureIdentifier,
        target_memory: u64,
    ) -> Result<SourceField, TextureSourceError> {
        let guard = self.fields.read();
        let source = guard
            .get(identifier.file_path())
            .ok_or_else(|| TextureSourceError::NotFound(identifier.file_path().to_string()))?;
        Ok(SourceField {
            texture: shrink_to_budget(&source.texture, target_memory),
            bounding_box: source.bounding_box,
        })
    }

    fn load_udim_tiles(
        &self,
        identifier: &TextureIdentifier,
        target_memory: u64,
    ) -> Result<Vec<UdimTile>, TextureSourceError> {
        let guard = self.udim.read();
        let tiles = guard
            .get(identifier.file_path())
            .ok_or_else(|| TextureSourceError::NotFound(identifier.file_path().to_string()))?;
        if tiles.is_empty() {
            return Err(TextureSourceError::NotFound(
                identifier.file_path().to_string(),
            ));
        }
        // Split the budget across tiles.
        let per_tile = target_memory / tiles.len() as u64;
        Ok(tiles
            .iter()
            .map(|t| UdimTile {
                tile: t.tile,
                texture: shrink_to_budget(&t.texture, per_tile),
            })
            .collect())
    }

    fn load_ptex(
        &self,
        identifier: &TextureIdentifier,
        _target_memory: u64,
    ) -> Result<PtexSource, TextureSourceError> {
        let guard = self.ptex.read();
        guard
            .get(identifier.file_path())
            .cloned()
            .ok_or_else(|| TextureSourceError::NotFound(identifier.file_path().to_string()))
    }
}

#[cfg(feature = "image-loading")]
pub use file_source::FileTextureSource;

#[cfg(feature = "image-loading")]
mod file_source {
    use std::path::{Path, PathBuf};

    use oleander_core::texture::{CpuTexture, TextureFormat};

    use super::super::identifier::{ColorSpace, SubtextureIdentifier, TextureIdentifier};
    use super::{
        resolve_udim_tiles, shrink_to_budget, PtexSource, SourceField, SourceTexture,
        TextureSource, TextureSourceError, UdimTile, WrapHints,
    };

    /// Decodes image files (PNG, JPEG) from disk.
    ///
    /// Paths in identifiers are resolved relative to a root directory.
    /// Volumetric fields and Ptex need dedicated readers and are not
    /// served by this source.
    pub struct FileTextureSource {
        root: PathBuf,
    }

    impl FileTextureSource {
        /// Create a source resolving paths under `root`.
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        fn resolve(&self, file_path: &str) -> PathBuf {
            let path = Path::new(file_path);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.root.join(path)
            }
        }

        fn decode(
            path: &Path,
            flip_vertically: bool,
            premultiply_alpha: bool,
            color_space: ColorSpace,
        ) -> Result<CpuTexture, TextureSourceError> {
            let display = path.display().to_string();
            let image = image::open(path).map_err(|err| match err {
                image::ImageError::IoError(ref io)
                    if io.kind() == std::io::ErrorKind::NotFound =>
                {
                    TextureSourceError::NotFound(display.clone())
                }
                other => TextureSourceError::Decode {
                    path: display.clone(),
                    reason: other.to_string(),
                },
            })?;

            let image = if flip_vertically { image.flipv() } else { image };
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            let mut data = rgba.into_raw();
            if premultiply_alpha {
                for texel in data.chunks_exact_mut(4) {
                    let alpha = texel[3] as u16;
                    texel[0] = ((texel[0] as u16 * alpha) / 255) as u8;
                    texel[1] = ((texel[1] as u16 * alpha) / 255) as u8;
                    texel[2] = ((texel[2] as u16 * alpha) / 255) as u8;
                }
            }
            let format = match color_space {
                // 8-bit image files are sRGB encoded unless told otherwise.
                ColorSpace::Auto | ColorSpace::Srgb => TextureFormat::Rgba8UnormSrgb,
                ColorSpace::Raw => TextureFormat::Rgba8Unorm,
            };
            Ok(CpuTexture::new_2d(width, height, format, data))
        }
    }

    impl TextureSource for FileTextureSource {
        fn load_uv(
            &self,
            identifier: &TextureIdentifier,
            target_memory: u64,
        ) -> Result<SourceTexture, TextureSourceError> {
            let (flip, premultiply, color_space) = match identifier.subtexture() {
                Some(SubtextureIdentifier::AssetUv {
                    flip_vertically,
                    premultiply_alpha,
                    color_space,
                }) => (*flip_vertically, *premultiply_alpha, *color_space),
                _ => (false, false, ColorSpace::Auto),
            };
            let path = self.resolve(identifier.file_path());
            let texture = Self::decode(&path, flip, premultiply, color_space)?;
            Ok(SourceTexture {
                texture: shrink_to_budget(&texture, target_memory),
                wrap_hints: WrapHints::default(),
            })
        }

        fn load_field(
            &self,
            identifier: &TextureIdentifier,
            _target_memory: u64,
        ) -> Result<SourceField, TextureSourceError> {
            Err(TextureSourceError::Unsupported(format!(
                "volumetric field {} requires a volume reader",
                identifier.file_path()
            )))
        }

        fn load_udim_tiles(
            &self,
            identifier: &TextureIdentifier,
            target_memory: u64,
        ) -> Result<Vec<UdimTile>, TextureSourceError> {
            let (premultiply, color_space) = match identifier.subtexture() {
                Some(SubtextureIdentifier::Udim {
                    premultiply_alpha,
                    color_space,
                }) => (*premultiply_alpha, *color_space),
                _ => (false, ColorSpace::Auto),
            };
            let pattern = self.resolve(identifier.file_path());
            let pattern = pattern.to_string_lossy().into_owned();
            let found = resolve_udim_tiles(&pattern);
            if found.is_empty() {
                return Err(TextureSourceError::NotFound(pattern));
            }
            let per_tile = target_memory / found.len() as u64;
            let mut tiles = Vec::with_capacity(found.len());
            for (tile, path) in found {
                let texture = Self::decode(&path, false, premultiply, color_space)?;
                tiles.push(UdimTile {
                    tile,
                    texture: shrink_to_budget(&texture, per_tile),
                });
            }
            Ok(tiles)
        }

        fn load_ptex(
            &self,
            identifier: &TextureIdentifier,
            _target_memory: u64,
        ) -> Result<PtexSource, TextureSourceError> {
            Err(TextureSourceError::Unsupported(format!(
                "ptex texture {} requires a ptex reader",
                identifier.file_path()
            )))
        }
    }
}
