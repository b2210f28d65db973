//! # Component Factory — Rebuilding Components by Name
//!
//! Loading and duplicating need to construct concrete component types that
//! the scene itself knows nothing about. The scene asks a
//! [`ComponentFactory`] instead: resolve a `"type"` string to a [`TypeId`],
//! then build a fresh default instance of it.
//!
//! [`ComponentRegistry`] is the stock factory. Register each component type
//! you want to load:
//!
//! ```ignore
//! let mut registry = ComponentRegistry::new();
//! registry.register::<Spin>();
//! registry.register_as::<Sprite>("SpriteRenderer");
//! let scene = Scene::new(registry);
//! ```

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::{Component, type_id_of};

/// Source of component instances for the scene.
pub trait ComponentFactory {
    /// Map a JSON `"type"` string to a concrete type.
    fn resolve_type(&self, name: &str) -> Option<TypeId>;

    /// Build a default instance of a resolved type.
    fn build(&self, type_id: TypeId) -> Option<Box<dyn Component>>;

    fn build_by_name(&self, name: &str) -> Option<Box<dyn Component>> {
        self.resolve_type(name).and_then(|type_id| self.build(type_id))
    }
}

type BuildFn = fn() -> Box<dyn Component>;

struct ComponentEntry {
    name: String,
    build: BuildFn,
}

/// Maps component type names to constructors.
pub struct ComponentRegistry {
    by_type_id: HashMap<TypeId, ComponentEntry>,
    by_name: HashMap<String, TypeId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            by_type_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register `T` under its own [`Component::type_name`].
    pub fn register<T: Component + Default>(&mut self) -> &mut Self {
        let name = T::default().type_name();
        self.register_as::<T>(name)
    }

    /// Register `T` under an explicit name.
    ///
    /// The name must match what `T::type_name` writes, or saved scenes will
    /// not load back.
    pub fn register_as<T: Component + Default>(&mut self, name: &str) -> &mut Self {
        let type_id = TypeId::of::<T>();
        if let Some(previous) = self.by_name.get(name) {
            if *previous != type_id {
                log::warn!("Component type name '{name}' registered twice; the later type wins");
            }
        }
        if let Some(old) = self.by_type_id.get(&type_id) {
            self.by_name.remove(&old.name);
        }

        self.by_type_id.insert(
            type_id,
            ComponentEntry {
                name: name.to_string(),
                build: || -> Box<dyn Component> { Box::new(T::default()) },
            },
        );
        self.by_name.insert(name.to_string(), type_id);
        self
    }

    /// All registered names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn name_of(&self, type_id: TypeId) -> Option<&str> {
        self.by_type_id.get(&type_id).map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_type_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type_id.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentFactory for ComponentRegistry {
    fn resolve_type(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    fn build(&self, type_id: TypeId) -> Option<Box<dyn Component>> {
        let entry = self.by_type_id.get(&type_id)?;
        let component = (entry.build)();
        debug_assert_eq!(type_id_of(component.as_ref()), type_id);
        Some(component)
    }
}

/// Last path segment of a Rust type name, without generic arguments.
///
/// `"my_game::components::Spin"` → `"Spin"`,
/// `"my_game::Wrapper<my_game::Spin>"` → `"Wrapper"`.
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = match full.find('<') {
        Some(angle) => &full[..angle],
        None => full,
    };
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentBase, ComponentFlags, downcast_ref};
    use crate::serialized::{Reflection, Serialized};
    use std::sync::OnceLock;

    #[derive(Default)]
    struct Health {
        base: ComponentBase,
    }

    impl Serialized for Health {
        fn reflection() -> &'static Reflection<Self> {
            static REFLECTION: OnceLock<Reflection<Health>> = OnceLock::new();
            REFLECTION.get_or_init(Reflection::new)
        }
    }

    impl Component for Health {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }
    }

    struct Sprite {
        base: ComponentBase,
    }

    impl Default for Sprite {
        fn default() -> Self {
            Self {
                base: ComponentBase::new(ComponentFlags::RENDER),
            }
        }
    }

    impl Serialized for Sprite {
        fn reflection() -> &'static Reflection<Self> {
            static REFLECTION: OnceLock<Reflection<Sprite>> = OnceLock::new();
            REFLECTION.get_or_init(Reflection::new)
        }
    }

    impl Component for Sprite {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }

        fn type_name(&self) -> &'static str {
            "SpriteRenderer"
        }
    }

    #[test]
    fn short_names() {
        assert_eq!(short_type_name("a::b::Spin"), "Spin");
        assert_eq!(short_type_name("Spin"), "Spin");
        assert_eq!(short_type_name("a::Wrapper<a::b::Spin>"), "Wrapper");
    }

    #[test]
    fn register_and_build_by_name() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Health>().register::<Sprite>();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.type_names(), vec!["Health", "SpriteRenderer"]);
        assert_eq!(registry.resolve_type("Health"), Some(TypeId::of::<Health>()));

        let sprite = registry.build_by_name("SpriteRenderer").unwrap();
        assert!(downcast_ref::<Sprite>(sprite.as_ref()).is_some());
        assert_eq!(sprite.base().flags(), ComponentFlags::RENDER);
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        let registry = ComponentRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve_type("Ghost").is_none());
        assert!(registry.build_by_name("Ghost").is_none());
        assert!(registry.build(TypeId::of::<Health>()).is_none());
    }

    #[test]
    fn reregistering_renames() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Health>();
        registry.register_as::<Health>("Hp");
        assert!(!registry.contains("Health"));
        assert!(registry.contains("Hp"));
        assert_eq!(registry.name_of(TypeId::of::<Health>()), Some("Hp"));
        assert_eq!(registry.len(), 1);
    }
}
