//! Convenience re-exports: `use askr::prelude::*` for the common items.

// Core
pub use crate::component::{
    Component, ComponentBase, ComponentFlags, ContactHandle, FixtureHandle, JointHandle,
    component_from_json, component_to_json, downcast_mut, downcast_ref, duplicate_component,
};
pub use crate::error::SceneError;
pub use crate::math::{Lerp, Mat4, Quat, Transform, Vec2, Vec3, Vec4};
pub use crate::property::{Bound, Property, PropertyId, SceneProperty};
pub use crate::registry::{ComponentFactory, ComponentRegistry};
pub use crate::scene::{GameObject, NodeId, Scene, SceneSettings};
pub use crate::serialized::{ErasedSerialized, Reflection, Serialized};

// Tweening (feature-gated)
#[cfg(feature = "tween")]
pub use crate::tween::{
    AnyTween, CubicIn, CubicInOut, CubicOut, EaseFunction, Easing, Linear, QuadIn, QuadInOut,
    QuadOut, SineIn, SineInOut, SineOut, Tween, TweenState, TweenTarget, Tweener,
};
