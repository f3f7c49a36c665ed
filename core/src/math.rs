//! Math type aliases and helper types.
//!
//! Provides f32 rendering types on top of `nalgebra`, plus the axis-aligned
//! [`BoundingBox`] used to describe volumetric texture extents.

pub use nalgebra;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Build a 4x4 matrix from a non-uniform scale followed by a translation.
pub fn mat4_from_scale_translation(scale: Vec3, translation: Vec3) -> Mat4 {
    #[rustfmt::skip]
    let result = Mat4::new(
        scale.x, 0.0,     0.0,     translation.x,
        0.0,     scale.y, 0.0,     translation.y,
        0.0,     0.0,     scale.z, translation.z,
        0.0,     0.0,     0.0,     1.0,
    );
    result
}

/// Axis-aligned bounding box in world space.
///
/// Describes the spatial extent of a volumetric texture. The box is defined
/// by its minimum and maximum corners; a box whose maximum is not strictly
/// greater than its minimum on every axis is considered empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a bounding box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// A unit box spanning [0, 1] on every axis.
    pub fn unit() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0))
    }

    /// Size of the box along each axis.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Center point of the box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Whether the box has zero or negative extent on any axis.
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y || self.max.z <= self.min.z
    }

    /// Matrix mapping world-space positions inside the box to [0, 1]^3
    /// sampling coordinates.
    ///
    /// Returns the identity for an empty box.
    pub fn sampling_transform(&self) -> Mat4 {
        if self.is_empty() {
            return Mat4::identity();
        }
        let size = self.size();
        let scale = Vec3::new(1.0 / size.x, 1.0 / size.y, 1.0 / size.z);
        let translation = Vec3::new(
            -self.min.x * scale.x,
            -self.min.y * scale.y,
            -self.min.z * scale.z,
        );
        mat4_from_scale_translation(scale, translation)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::unit()
    }
}
