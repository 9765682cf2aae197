//! Math utilities and types
//!
//! Provides the math types used for instance placement.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from a transformation matrix
    ///
    /// Assumes the matrix carries no shear.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        let safe = |s: f32| if s.abs() > f32::EPSILON { s } else { 1.0 };
        let rotation_matrix = nalgebra::Matrix3::new(
            matrix.m11 / safe(scale_x), matrix.m12 / safe(scale_y), matrix.m13 / safe(scale_z),
            matrix.m21 / safe(scale_x), matrix.m22 / safe(scale_y), matrix.m23 / safe(scale_z),
            matrix.m31 / safe(scale_x), matrix.m32 / safe(scale_y), matrix.m33 / safe(scale_z),
        );
        let rotation = Quat::from_rotation_matrix(&nalgebra::Rotation3::from_matrix_unchecked(rotation_matrix));

        Self { position, rotation, scale }
    }

    /// Check that every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
            && self.scale.iter().all(|x| x.is_finite())
    }
}
