//! # Askr — Runtime Scene Graph
//!
//! A tree of addressable game objects carrying pluggable components, with
//! deferred structural changes, reflection-driven JSON load/save and
//! duplication, path lookup, and property tweening.
//!
//! Start with `use askr::prelude::*`, register your components in a
//! [`ComponentRegistry`](registry::ComponentRegistry), and build a
//! [`Scene`](scene::Scene).

pub mod component;
pub mod error;
pub mod math;
pub mod prelude;
pub mod property;
pub mod registry;
pub mod scene;
pub mod serialized;

#[cfg(feature = "tween")]
pub mod tween;
