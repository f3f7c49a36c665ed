//! CPU-side texture data.
//!
//! Provides [`CpuTexture`], the raw pixel payload produced by texture
//! sources during the load phase, along with the [`TextureFormat`] and
//! [`TextureDimension`] enums describing it.

mod types;

pub use types::{CpuTexture, TextureDimension, TextureFormat};
