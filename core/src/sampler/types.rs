//! CPU-side sampler parameters and filter/address mode definitions.

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest neighbor filtering.
    #[default]
    Nearest,
    /// Linear filtering.
    Linear,
}

/// Texture address mode (wrapping behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to edge.
    #[default]
    ClampToEdge,
    /// Repeat.
    Repeat,
    /// Mirrored repeat.
    MirrorRepeat,
    /// Clamp to border color.
    ClampToBorder,
}

/// Comparison function for depth/shadow sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    /// Never pass.
    Never,
    /// Pass if less than.
    Less,
    /// Pass if equal.
    Equal,
    /// Pass if less than or equal.
    LessEqual,
    /// Pass if greater than.
    Greater,
    /// Pass if not equal.
    NotEqual,
    /// Pass if greater than or equal.
    GreaterEqual,
    /// Always pass.
    Always,
}

/// CPU-side sampler parameters.
///
/// The value type a texture consumer hands over when requesting a binding:
/// filtering, address modes, LOD clamping, and optional comparison function.
/// Parameters are immutable for the lifetime of the binding that carries
/// them; requesting different parameters means requesting a new binding.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSampler {
    /// Address mode for U coordinate.
    pub address_mode_u: AddressMode,
    /// Address mode for V coordinate.
    pub address_mode_v: AddressMode,
    /// Address mode for W coordinate.
    pub address_mode_w: AddressMode,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mipmap filter.
    pub mipmap_filter: FilterMode,
    /// Minimum LOD clamp.
    pub lod_min_clamp: f32,
    /// Maximum LOD clamp.
    pub lod_max_clamp: f32,
    /// Comparison function for depth sampling.
    pub compare: Option<CompareFunction>,
    /// Maximum anisotropy level.
    pub anisotropy_clamp: u16,
}

impl CpuSampler {
    /// Create a linear filtering sampler.
    pub fn linear() -> Self {
        Self {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        }
    }

    /// Create a nearest neighbor filtering sampler.
    pub fn nearest() -> Self {
        Self::default()
    }

    /// Set address mode for all coordinates.
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode_u = mode;
        self.address_mode_v = mode;
        self.address_mode_w = mode;
        self
    }

    /// Set address modes per coordinate.
    pub fn with_address_modes(mut self, u: AddressMode, v: AddressMode, w: AddressMode) -> Self {
        self.address_mode_u = u;
        self.address_mode_v = v;
        self.address_mode_w = w;
        self
    }

    /// Set the LOD clamp range.
    pub fn with_lod_clamp(mut self, min: f32, max: f32) -> Self {
        self.lod_min_clamp = min;
        self.lod_max_clamp = max;
        self
    }

    /// Set comparison function for depth sampling.
    pub fn with_compare(mut self, compare: CompareFunction) -> Self {
        self.compare = Some(compare);
        self
    }

    /// Set anisotropic filtering level.
    pub fn with_anisotropy(mut self, level: u16) -> Self {
        self.anisotropy_clamp = level;
        self
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self {
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            anisotropy_clamp: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_sampler() {
        let sampler = CpuSampler::linear();
        assert_eq!(sampler.mag_filter, FilterMode::Linear);
        assert_eq!(sampler.min_filter, FilterMode::Linear);
        assert_eq!(sampler.mipmap_filter, FilterMode::Linear);
        assert_eq!(sampler.address_mode_u, AddressMode::ClampToEdge);
    }

    #[test]
    fn test_nearest_is_default() {
        assert_eq!(CpuSampler::nearest(), CpuSampler::default());
    }

    #[test]
    fn test_address_mode_builder() {
        let sampler = CpuSampler::linear().with_address_mode(AddressMode::Repeat);
        assert_eq!(sampler.address_mode_u, AddressMode::Repeat);
        assert_eq!(sampler.address_mode_v, AddressMode::Repeat);
        assert_eq!(sampler.address_mode_w, AddressMode::Repeat);
    }

    #[test]
    fn test_per_axis_address_modes() {
        let sampler = CpuSampler::default().with_address_modes(
            AddressMode::Repeat,
            AddressMode::MirrorRepeat,
            AddressMode::ClampToBorder,
        );
        assert_eq!(sampler.address_mode_u, AddressMode::Repeat);
        assert_eq!(sampler.address_mode_v, AddressMode::MirrorRepeat);
        assert_eq!(sampler.address_mode_w, AddressMode::ClampToBorder);
    }

    #[test]
    fn test_compare_and_anisotropy() {
        let sampler = CpuSampler::linear()
            .with_compare(CompareFunction::LessEqual)
            .with_anisotropy(16);
        assert_eq!(sampler.compare, Some(CompareFunction::LessEqual));
        assert_eq!(sampler.anisotropy_clamp, 16);
    }

    #[test]
    fn test_equality_is_field_wise() {
        let a = CpuSampler::linear().with_lod_clamp(0.0, 8.0);
        let b = CpuSampler::linear().with_lod_clamp(0.0, 8.0);
        let c = CpuSampler::linear().with_lod_clamp(0.0, 16.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
