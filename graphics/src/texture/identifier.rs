//! Texture identity.
//!
//! A [`TextureIdentifier`] is the value the whole cache deduplicates on:
//! a file path plus an optional [`SubtextureIdentifier`] carrying the
//! per-family parameters that distinguish two textures loaded from the
//! same file (flip, premultiply, color space, field name, ...).

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use xxhash_rust::xxh3::Xxh3;

/// Source color space interpretation for decoded texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpace {
    /// Pick based on the file contents and format.
    #[default]
    Auto,
    /// Treat texels as linear values.
    Raw,
    /// Treat texels as sRGB encoded.
    Srgb,
}

/// Per-family texture parameters, closed set.
///
/// Two identifiers naming the same file but carrying different sub
/// identifiers are different textures and never share a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubtextureIdentifier {
    /// Asset-backed planar texture.
    AssetUv {
        /// Flip the image vertically at load time.
        flip_vertically: bool,
        /// Premultiply color by alpha at load time.
        premultiply_alpha: bool,
        /// Source color space.
        color_space: ColorSpace,
    },
    /// Planar texture whose GPU resource is populated by the application
    /// instead of being loaded from the file path.
    DynamicUv,
    /// Multi-tile UDIM texture.
    Udim {
        /// Premultiply color by alpha at load time.
        premultiply_alpha: bool,
        /// Source color space.
        color_space: ColorSpace,
    },
    /// Per-face Ptex texture.
    Ptex {
        /// Premultiply color by alpha at load time.
        premultiply_alpha: bool,
    },
    /// Volumetric field inside a container file.
    Field {
        /// Name of the field grid.
        field_name: Arc<str>,
        /// Index of the field within the grid.
        field_index: u32,
    },
}

/// Identity of a texture: file path plus optional sub identifier.
///
/// Equality and hashing combine both parts; identifiers are immutable
/// after construction and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureIdentifier {
    file_path: Arc<str>,
    subtexture: Option<SubtextureIdentifier>,
}

impl TextureIdentifier {
    /// Identifier for a plain file path with no sub identifier.
    pub fn new(file_path: impl Into<Arc<str>>) -> Self {
        Self {
            file_path: file_path.into(),
            subtexture: None,
        }
    }

    /// Identifier for a file path with a sub identifier.
    pub fn with_subtexture(
        file_path: impl Into<Arc<str>>,
        subtexture: SubtextureIdentifier,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            subtexture: Some(subtexture),
        }
    }

    /// The file path part.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// The sub identifier part, if any.
    pub fn subtexture(&self) -> Option<&SubtextureIdentifier> {
        self.subtexture.as_ref()
    }

    /// Whether this identifier names a dynamically populated texture
    /// rather than an asset-backed one.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.subtexture, Some(SubtextureIdentifier::DynamicUv))
    }

    /// 64-bit identity hash over path and sub identifier.
    pub fn hash64(&self) -> u64 {
        let mut hasher = Xxh3::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_path() {
        let a = TextureIdentifier::new("a.png");
        let b = TextureIdentifier::new("a.png");
        let c = TextureIdentifier::new("c.png");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_equality_requires_matching_subtexture() {
        let plain = TextureIdentifier::new("a.png");
        let asset = TextureIdentifier::with_subtexture(
            "a.png",
            SubtextureIdentifier::AssetUv {
                flip_vertically: true,
                premultiply_alpha: false,
                color_space: ColorSpace::Auto,
            },
        );
        let asset_same = TextureIdentifier::with_subtexture(
            "a.png",
            SubtextureIdentifier::AssetUv {
                flip_vertically: true,
                premultiply_alpha: false,
                color_space: ColorSpace::Auto,
            },
        );
        let asset_other = TextureIdentifier::with_subtexture(
            "a.png",
            SubtextureIdentifier::AssetUv {
                flip_vertically: false,
                premultiply_alpha: false,
                color_space: ColorSpace::Auto,
            },
        );
        assert_ne!(plain, asset);
        assert_eq!(asset, asset_same);
        assert_ne!(asset, asset_other);
    }

    #[test]
    fn test_hash64_follows_equality() {
        let a = TextureIdentifier::with_subtexture(
            "vol.vdb",
            SubtextureIdentifier::Field {
                field_name: "density".into(),
                field_index: 0,
            },
        );
        let b = TextureIdentifier::with_subtexture(
            "vol.vdb",
            SubtextureIdentifier::Field {
                field_name: "density".into(),
                field_index: 0,
            },
        );
        let c = TextureIdentifier::with_subtexture(
            "vol.vdb",
            SubtextureIdentifier::Field {
                field_name: "temperature".into(),
                field_index: 0,
            },
        );
        assert_eq!(a.hash64(), b.hash64());
        assert_ne!(a.hash64(), c.hash64());
    }

    #[test]
    fn test_dynamic_detection() {
        let dynamic =
            TextureIdentifier::with_subtexture("rt:color", SubtextureIdentifier::DynamicUv);
        assert!(dynamic.is_dynamic());
        assert!(!TextureIdentifier::new("a.png").is_dynamic());
    }

    #[test]
    fn test_clone_is_deep_equal() {
        let a = TextureIdentifier::with_subtexture(
            "tiles.<UDIM>.png",
            SubtextureIdentifier::Udim {
                premultiply_alpha: true,
                color_space: ColorSpace::Srgb,
            },
        );
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.hash64(), b.hash64());
    }
}
