//! Consumer side of the texture cache.

/// A consumer of committed textures, typically a shader or material.
///
/// The cache never calls into consumers; it only needs a stable
/// identity so [`TextureHandleRegistry::commit`] can report which
/// consumers had a bound texture or sampler change underneath them.
/// Implementations carry whatever state they like.
///
/// [`TextureHandleRegistry::commit`]:
///     super::TextureHandleRegistry::commit
pub trait ShaderCode: Send + Sync + std::fmt::Debug {
    /// Name used in log output.
    fn debug_name(&self) -> &str {
        "<unnamed shader>"
    }
}
