//! # Components — Pluggable Behavior on Game Objects
//!
//! A component is a boxed trait object attached to exactly one
//! [`GameObject`](crate::scene::GameObject). The scene calls its hooks during
//! the per-frame passes, filtered by [`ComponentFlags`]:
//!
//! ```text
//! update pass    ── UPDATE    → on_update(dt)
//!                └─ TRANSFORM → on_transform(inherited) -> effective
//! render pass    ── RENDER    → on_render(target)
//! event pass     ── EVENTS    → on_event(event)
//! physics events ── PHYSICS   → on_collide / on_joint_goodbye / on_fixture_goodbye
//! ```
//!
//! Inactive components are skipped by every pass. The lifecycle hooks
//! (`on_create`, `on_destroy`) run regardless of flags.
//!
//! ## Identity
//!
//! A game object holds at most one component per concrete type. The
//! [`TypeId`] of the concrete type is the lookup key, and
//! [`Component::type_name`] is the `"type"` discriminator written to JSON so
//! a [`ComponentFactory`](crate::registry::ComponentFactory) can rebuild it.
//!
//! ## JSON shape
//!
//! ```json
//! { "type": "Spin", "properties": { "Active": true, "Speed": 2.0 } }
//! ```

use std::any::{Any, TypeId};

use bitflags::bitflags;
use serde_json::{Map, Value};

use crate::math::Mat4;
use crate::registry::short_type_name;
use crate::scene::{NodeId, Scene};
use crate::serialized::ErasedSerialized;

pub(crate) const TYPE_KEY: &str = "type";
pub(crate) const PROPERTIES_KEY: &str = "properties";
const ACTIVE_KEY: &str = "Active";

bitflags! {
    /// Which dispatch passes a component takes part in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ComponentFlags: u32 {
        const UPDATE = 1 << 0;
        const RENDER = 1 << 1;
        const PHYSICS = 1 << 2;
        const TRANSFORM = 1 << 3;
        const EVENTS = 1 << 4;
        const ALL = u32::MAX;
    }
}

impl ComponentFlags {
    pub const NONE: Self = Self::empty();
}

/// Opaque contact handle from the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactHandle(pub u64);

/// Opaque joint handle from the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub u64);

/// Opaque fixture handle from the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixtureHandle(pub u64);

/// State every component carries: flags, activity, and its owner.
#[derive(Debug, Clone)]
pub struct ComponentBase {
    flags: ComponentFlags,
    active: bool,
    owner: Option<NodeId>,
}

impl ComponentBase {
    pub fn new(flags: ComponentFlags) -> Self {
        Self {
            flags,
            active: true,
            owner: None,
        }
    }

    pub fn flags(&self) -> ComponentFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ComponentFlags) {
        self.flags = flags;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The game object this component is attached to.
    pub fn game_object(&self) -> Option<NodeId> {
        self.owner
    }

    /// Only the scene assigns owners, on attach and detach.
    pub(crate) fn set_game_object(&mut self, owner: Option<NodeId>) {
        self.owner = owner;
    }

    /// Active and taking part in any of `category`.
    pub fn wants(&self, category: ComponentFlags) -> bool {
        self.active && self.flags.intersects(category)
    }
}

impl Default for ComponentBase {
    fn default() -> Self {
        Self::new(ComponentFlags::NONE)
    }
}

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of behavior attached to a game object.
///
/// Every hook receives the [`Scene`] so it can look up other objects or
/// stage structural changes. While a hook runs, the component is lifted out
/// of its slot: the scene still reports it as attached, but it cannot fetch
/// itself through the scene.
pub trait Component: ErasedSerialized + AsAny {
    fn base(&self) -> &ComponentBase;
    fn base_mut(&mut self) -> &mut ComponentBase;

    /// The `"type"` discriminator used in JSON and by the factory.
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn on_create(&mut self, _scene: &mut Scene) {}
    fn on_destroy(&mut self, _scene: &mut Scene) {}

    /// Copy this component's state onto `dst`, which has the same concrete
    /// type. Base state is already copied when this runs.
    ///
    /// The default copies every reflected property.
    fn on_duplicate(&self, dst: &mut dyn Component) {
        dst.deserialize_properties(&Value::Object(self.serialize_properties()));
    }

    fn on_update(&mut self, _scene: &mut Scene, _dt: f32) {}

    /// Produce this object's effective transform from the inherited one.
    fn on_transform(&mut self, _scene: &mut Scene, inherited: Mat4) -> Mat4 {
        inherited
    }

    fn on_render(&mut self, _scene: &mut Scene, _target: &mut dyn Any) {}
    fn on_event(&mut self, _scene: &mut Scene, _event: &dyn Any) {}

    fn on_collide(
        &mut self,
        _scene: &mut Scene,
        _other: NodeId,
        _begin: bool,
        _contact: ContactHandle,
    ) {
    }

    fn on_joint_goodbye(&mut self, _scene: &mut Scene, _joint: JointHandle) {}
    fn on_fixture_goodbye(&mut self, _scene: &mut Scene, _fixture: FixtureHandle) {}
}

/// Concrete type of a component behind a trait object.
pub fn type_id_of(component: &dyn Component) -> TypeId {
    Any::type_id(component.as_any())
}

pub fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

pub fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}

/// Serialize a component, stamped with its `"type"`.
pub fn component_to_json(component: &dyn Component) -> Value {
    let mut properties = Map::new();
    properties.insert(ACTIVE_KEY.to_string(), Value::Bool(component.base().is_active()));
    properties.extend(component.serialize_properties());

    let mut root = Map::new();
    root.insert(TYPE_KEY.to_string(), Value::String(component.type_name().to_string()));
    root.insert(PROPERTIES_KEY.to_string(), Value::Object(properties));
    Value::Object(root)
}

/// Merge a component's JSON onto an existing instance.
pub fn component_from_json(component: &mut dyn Component, node: &Value) {
    let Some(properties) = node.get(PROPERTIES_KEY) else {
        return;
    };
    if let Some(active) = properties.get(ACTIVE_KEY).and_then(Value::as_bool) {
        component.base_mut().set_active(active);
    }
    component.deserialize_properties(properties);
}

/// Copy `src` onto `dst`: base state first, then the type's own
/// [`Component::on_duplicate`].
pub fn duplicate_component(src: &dyn Component, dst: &mut dyn Component) {
    let base = src.base();
    dst.base_mut().set_active(base.is_active());
    dst.base_mut().set_flags(base.flags());
    src.on_duplicate(dst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialized::{Reflection, Serialized};
    use serde_json::json;
    use std::sync::OnceLock;

    struct Spin {
        base: ComponentBase,
        speed: f32,
        label: String,
    }

    impl Default for Spin {
        fn default() -> Self {
            Self {
                base: ComponentBase::new(ComponentFlags::UPDATE | ComponentFlags::TRANSFORM),
                speed: 1.0,
                label: String::new(),
            }
        }
    }

    impl Serialized for Spin {
        fn reflection() -> &'static Reflection<Self> {
            static REFLECTION: OnceLock<Reflection<Spin>> = OnceLock::new();
            REFLECTION.get_or_init(|| {
                Reflection::new().property(
                    "Speed",
                    |s: &Spin| json!(s.speed),
                    |s, v| {
                        if let Some(speed) = v.as_f64() {
                            s.speed = speed as f32;
                        }
                    },
                )
            })
        }
    }

    impl Component for Spin {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }

        fn on_duplicate(&self, dst: &mut dyn Component) {
            dst.deserialize_properties(&Value::Object(self.serialize_properties()));
            if let Some(dst) = downcast_mut::<Spin>(dst) {
                dst.label = format!("{} copy", self.label);
            }
        }
    }

    #[test]
    fn flags_combine_and_filter() {
        let base = ComponentBase::new(ComponentFlags::UPDATE | ComponentFlags::RENDER);
        assert!(base.wants(ComponentFlags::UPDATE));
        assert!(base.wants(ComponentFlags::RENDER));
        assert!(!base.wants(ComponentFlags::PHYSICS));

        let mut all = ComponentBase::new(ComponentFlags::ALL);
        assert!(all.wants(ComponentFlags::TRANSFORM));
        assert!(all.wants(ComponentFlags::EVENTS));
        all.set_active(false);
        assert!(!all.wants(ComponentFlags::TRANSFORM));

        assert!(!ComponentBase::default().wants(ComponentFlags::ALL));
    }

    #[test]
    fn type_name_is_short() {
        assert_eq!(Spin::default().type_name(), "Spin");
    }

    #[test]
    fn to_json_stamps_type_and_active() {
        let mut spin = Spin::default();
        spin.speed = 3.0;
        spin.base_mut().set_active(false);
        assert_eq!(
            component_to_json(&spin),
            json!({"type": "Spin", "properties": {"Active": false, "Speed": 3.0}})
        );
    }

    #[test]
    fn from_json_merges_partially() {
        let mut spin = Spin::default();
        spin.speed = 5.0;
        component_from_json(&mut spin, &json!({"type": "Spin", "properties": {"Active": false}}));
        assert!(!spin.base().is_active());
        assert_eq!(spin.speed, 5.0);

        component_from_json(&mut spin, &json!({"properties": {"Speed": "fast"}}));
        assert_eq!(spin.speed, 5.0);

        component_from_json(&mut spin, &json!({"Speed": 9.0}));
        assert_eq!(spin.speed, 5.0);
    }

    #[test]
    fn duplicate_copies_base_then_extension() {
        let mut src = Spin::default();
        src.speed = 4.0;
        src.label = "wheel".into();
        src.base_mut().set_active(false);
        src.base_mut().set_flags(ComponentFlags::RENDER);

        let mut dst = Spin::default();
        duplicate_component(&src, &mut dst);
        assert!(!dst.base().is_active());
        assert_eq!(dst.base().flags(), ComponentFlags::RENDER);
        assert_eq!(dst.speed, 4.0);
        assert_eq!(dst.label, "wheel copy");
    }

    #[test]
    fn downcast_through_trait_object() {
        let boxed: Box<dyn Component> = Box::new(Spin::default());
        assert_eq!(type_id_of(boxed.as_ref()), TypeId::of::<Spin>());
        assert!(downcast_ref::<Spin>(boxed.as_ref()).is_some());
    }
}
