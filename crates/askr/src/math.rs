//! Math types, glam re-exports, and interpolation.
//!
//! The scene graph composes transforms as [`Mat4`] so 2D and 3D components
//! can share one pipeline. [`Lerp`] is the value-side half of tweening: any
//! type implementing it can be animated by a [`Tween`](crate::tween::Tween).

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// Linear interpolation between two values of the same type.
///
/// `t` is expected in \[0, 1\] but implementations must not clamp: easing
/// curves with overshoot rely on values slightly outside that range.
pub trait Lerp: Sized {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

impl Lerp for f64 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        from + (to - from) * t as f64
    }
}

/// Rounds to the nearest step.
impl Lerp for i32 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        (*from as f32 + (*to - *from) as f32 * t).round() as i32
    }
}

impl Lerp for Vec2 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        from.lerp(*to, t)
    }
}

impl Lerp for Vec3 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        from.lerp(*to, t)
    }
}

impl Lerp for Vec4 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        from.lerp(*to, t)
    }
}

impl Lerp for Quat {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        from.slerp(*to, t)
    }
}

impl Lerp for Transform {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        Self {
            translation: Lerp::lerp(&from.translation, &to.translation, t),
            rotation: Lerp::lerp(&from.rotation, &to.rotation, t),
            scale: Lerp::lerp(&from.scale, &to.scale, t),
        }
    }
}

/// A local transform: position, rotation, and scale.
///
/// 2D content ignores the Z axis. Components that take part in the
/// `TRANSFORM` pass typically hold one of these and multiply its
/// [`matrix`](Transform::matrix) onto the inherited transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    pub fn from_xy(x: f32, y: f32) -> Self {
        Self::from_xyz(x, y, 0.0)
    }

    /// Rotation about Z in radians, the only rotation 2D content uses.
    pub fn with_angle(mut self, radians: f32) -> Self {
        self.rotation = Quat::from_rotation_z(radians);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_lerp_hits_endpoints() {
        assert_eq!(<f32 as Lerp>::lerp(&2.0, &6.0, 0.0), 2.0);
        assert_eq!(<f32 as Lerp>::lerp(&2.0, &6.0, 1.0), 6.0);
        assert_eq!(<f32 as Lerp>::lerp(&2.0, &6.0, 0.5), 4.0);
        assert_eq!(<f64 as Lerp>::lerp(&-1.0, &1.0, 0.25), -0.5);
    }

    #[test]
    fn integer_lerp_rounds() {
        assert_eq!(<i32 as Lerp>::lerp(&0, &10, 0.34), 3);
        assert_eq!(<i32 as Lerp>::lerp(&0, &10, 0.36), 4);
        assert_eq!(<i32 as Lerp>::lerp(&10, &-10, 1.0), -10);
    }

    #[test]
    fn lerp_does_not_clamp() {
        let v = <f32 as Lerp>::lerp(&0.0, &10.0, 1.1);
        assert!((v - 11.0).abs() < 1e-4);
    }

    #[test]
    fn vector_lerp() {
        let v = <Vec2 as Lerp>::lerp(&Vec2::ZERO, &Vec2::new(4.0, -2.0), 0.5);
        assert_eq!(v, Vec2::new(2.0, -1.0));
    }

    #[test]
    fn transform_matrix_translates() {
        let m = Transform::from_xy(3.0, 4.0).matrix();
        let col3 = m.col(3);
        assert!((col3.x - 3.0).abs() < 1e-4);
        assert!((col3.y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn transform_round_trips_through_json() {
        let t = Transform::from_xy(1.0, 2.0).with_scale(3.0);
        let json = serde_json::to_value(t).unwrap();
        let back: Transform = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }
}
