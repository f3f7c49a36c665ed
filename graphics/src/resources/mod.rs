//! GPU resources.
//!
//! The resource types [`GraphicsDevice`] creates and the texture cache
//! hands out:
//! - [`Texture`] - GPU texture/image
//! - [`Sampler`] - Texture sampler
//!
//! Resources are reference-counted with [`Arc`]; the cache registries rely
//! on those counts to decide what is still in use. Each resource holds a
//! weak reference back to its parent device.
//!
//! [`GraphicsDevice`]: crate::GraphicsDevice
//! [`Arc`]: std::sync::Arc

mod sampler;
mod texture;

pub use sampler::Sampler;
pub use texture::Texture;
