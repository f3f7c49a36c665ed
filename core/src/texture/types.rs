//! CPU-side texture data and format definitions.

/// Texture pixel format.
///
/// Only color formats used for sampled textures are listed; depth/stencil
/// and compressed formats are render-target concerns that never pass
/// through the CPU texture path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA channels, sRGB.
    Bgra8UnormSrgb,
    /// 16-bit red channel, float.
    R16Float,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit red channel, float.
    R32Float,
    /// 32-bit red channel, unsigned integer.
    R32Uint,
    /// 32-bit RGBA channels, float.
    Rgba32Float,
}

impl TextureFormat {
    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm | Self::R16Float => 2,
            Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::R32Float
            | Self::R32Uint => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }

    /// Returns true if this format decodes with an sRGB transfer function.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    /// Returns the sRGB-decoding twin of this format, if one exists.
    ///
    /// Formats without an sRGB variant are returned unchanged.
    pub fn to_srgb(&self) -> Self {
        match self {
            Self::Rgba8Unorm => Self::Rgba8UnormSrgb,
            Self::Bgra8Unorm => Self::Bgra8UnormSrgb,
            other => *other,
        }
    }
}

/// Dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    /// Planar texture.
    #[default]
    D2,
    /// Array of planar layers sharing one resource.
    D2Array,
    /// Volumetric texture.
    D3,
}

/// CPU-side texture data.
///
/// Holds raw pixel bytes together with the dimensions and format needed to
/// interpret them. For [`TextureDimension::D2Array`] the `depth` field is
/// the layer count; mip levels, when present, are stored contiguously after
/// the base level, each level packing all of its layers.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuTexture {
    /// Texture dimensionality.
    pub dimension: TextureDimension,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels, or layer count for arrays.
    pub depth: u32,
    /// Pixel format.
    pub format: TextureFormat,
    /// Number of mip levels stored in `data`.
    pub mip_level_count: u32,
    /// Raw pixel bytes.
    pub data: Vec<u8>,
}

impl CpuTexture {
    /// Create a single-mip 2D texture from raw pixel bytes.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        Self {
            dimension: TextureDimension::D2,
            width,
            height,
            depth: 1,
            format,
            mip_level_count: 1,
            data,
        }
    }

    /// Create a single-mip 3D texture from raw pixel bytes.
    pub fn new_3d(width: u32, height: u32, depth: u32, format: TextureFormat, data: Vec<u8>) -> Self {
        Self {
            dimension: TextureDimension::D3,
            width,
            height,
            depth,
            format,
            mip_level_count: 1,
            data,
        }
    }

    /// Create a single-mip 2D array texture from raw pixel bytes.
    pub fn new_2d_array(
        width: u32,
        height: u32,
        layers: u32,
        format: TextureFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            dimension: TextureDimension::D2Array,
            width,
            height,
            depth: layers,
            format,
            mip_level_count: 1,
            data,
        }
    }

    /// Size of the stored pixel data in bytes.
    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Number of texels in one mip level.
    pub fn texel_count(&self, mip_level: u32) -> u64 {
        let w = (self.width >> mip_level).max(1) as u64;
        let h = (self.height >> mip_level).max(1) as u64;
        let d = match self.dimension {
            // Array layers do not shrink with mip level.
            TextureDimension::D2Array => self.depth as u64,
            _ => (self.depth >> mip_level).max(1) as u64,
        };
        w * h * d
    }

    /// Byte size the stored dimensions and mip count imply.
    pub fn expected_byte_size(&self) -> u64 {
        let block = self.format.block_size() as u64;
        (0..self.mip_level_count)
            .map(|level| self.texel_count(level) * block)
            .sum()
    }

    /// Whether `data` holds exactly the bytes the dimensions imply.
    pub fn is_consistent(&self) -> bool {
        self.byte_size() == self.expected_byte_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes() {
        assert_eq!(TextureFormat::R8Unorm.block_size(), 1);
        assert_eq!(TextureFormat::Rgba8Unorm.block_size(), 4);
        assert_eq!(TextureFormat::Rgba16Float.block_size(), 8);
        assert_eq!(TextureFormat::Rgba32Float.block_size(), 16);
    }

    #[test]
    fn test_srgb_twin() {
        assert_eq!(
            TextureFormat::Rgba8Unorm.to_srgb(),
            TextureFormat::Rgba8UnormSrgb
        );
        assert!(TextureFormat::Rgba8UnormSrgb.is_srgb());
        // No sRGB variant: unchanged.
        assert_eq!(TextureFormat::R32Float.to_srgb(), TextureFormat::R32Float);
    }

    #[test]
    fn test_2d_consistency() {
        let tex = CpuTexture::new_2d(4, 2, TextureFormat::Rgba8Unorm, vec![0u8; 32]);
        assert!(tex.is_consistent());
        assert_eq!(tex.byte_size(), 32);
    }

    #[test]
    fn test_3d_consistency() {
        let tex = CpuTexture::new_3d(4, 4, 4, TextureFormat::R32Float, vec![0u8; 256]);
        assert!(tex.is_consistent());

        let bad = CpuTexture::new_3d(4, 4, 4, TextureFormat::R32Float, vec![0u8; 100]);
        assert!(!bad.is_consistent());
    }

    #[test]
    fn test_array_mip_texel_count() {
        let mut tex = CpuTexture::new_2d_array(8, 8, 3, TextureFormat::Rgba8Unorm, Vec::new());
        tex.mip_level_count = 2;
        // Mip 1 halves width and height but keeps all 3 layers.
        assert_eq!(tex.texel_count(1), 4 * 4 * 3);
        assert_eq!(tex.expected_byte_size(), (8 * 8 * 3 + 4 * 4 * 3) * 4);
    }

    #[test]
    fn test_mip_floor_at_one() {
        let tex = CpuTexture::new_2d(4, 1, TextureFormat::R8Unorm, vec![0u8; 4]);
        assert_eq!(tex.texel_count(2), 1);
    }
}
