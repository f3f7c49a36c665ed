//! GPU texture and sampler cache.
//!
//! This module implements the resource cache that sits between "a consumer
//! wants texture X with sampler parameters Y" and the GPU resources that
//! satisfy the request, shared with every other consumer asking for the
//! same thing.
//!
//! # Layers
//!
//! - [`TextureIdentifier`] names a texture: a file path plus an optional
//!   [`SubtextureIdentifier`] for textures that need more than a path.
//! - [`TextureObject`] owns one physical GPU resource per unique identifier,
//!   loaded in two phases: CPU decode, then GPU upload.
//! - [`TextureObjectRegistry`] deduplicates texture objects by identifier
//!   hash and runs the two-phase commit with parallel CPU loads.
//! - [`SamplerObject`] and [`SamplerObjectRegistry`] allocate GPU sampler
//!   state per request, collected only at explicit sweep points.
//! - [`TextureHandle`] binds one consumer ([`ShaderCode`]) to a texture
//!   object, sampler parameters, and a memory request.
//! - [`TextureHandleRegistry`] is the orchestrator consumers talk to. Its
//!   [`commit`](TextureHandleRegistry::commit) sizes textures to the
//!   maximum request across their live handles, loads and uploads what
//!   changed, reallocates samplers, collects garbage, and reports which
//!   consumers must re-bind their resources.
//!
//! # Example
//!
//! ```ignore
//! let registry = TextureHandleRegistry::new(&device, source);
//! let handle = registry.allocate_texture_handle(
//!     &TextureIdentifier::new("textures/albedo.png"),
//!     TextureType::Uv,
//!     &CpuSampler::linear(),
//!     16 * 1024 * 1024,
//!     Arc::downgrade(&shader),
//! );
//! let affected = registry.commit();
//! for shader in affected {
//!     // re-query bindings
//! }
//! ```

mod consumer;
mod handle;
mod handle_registry;
mod identifier;
mod object;
mod object_registry;
mod sampler_object;
mod sampler_registry;
mod source;

pub use consumer::ShaderCode;
pub use handle::TextureHandle;
pub use handle_registry::TextureHandleRegistry;
pub use identifier::{ColorSpace, SubtextureIdentifier, TextureIdentifier};
pub use object::TextureObject;
pub use object_registry::TextureObjectRegistry;
pub use sampler_object::SamplerObject;
pub use sampler_registry::SamplerObjectRegistry;
#[cfg(feature = "image-loading")]
pub use source::FileTextureSource;
pub use source::{
    resolve_udim_tiles, shrink_to_budget, MemoryTextureSource, PtexSource, SourceField,
    SourceTexture, TextureSource, TextureSourceError, UdimTile, WrapHints,
};

/// The closed set of texture families the cache knows how to load and bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    /// Planar UV texture.
    Uv,
    /// Volumetric field texture.
    Field,
    /// Per-face Ptex texture (texel and layout sub-resources).
    Ptex,
    /// Multi-tile UDIM texture (texel and layout sub-resources).
    Udim,
}
