//! # Bound Properties — Getter/Setter Pairs as Values
//!
//! A [`Property`] names one field of an owner type `O` through an accessor
//! pair. It stores nothing itself: reading calls the getter, writing calls the
//! setter, so an owner can validate or react to every write.
//!
//! Binding a property to a shared owner (`Rc<RefCell<O>>`) yields a [`Bound`]
//! handle that can be passed around independently of `O`. This is what the
//! tween engine animates. The handle holds only a [`Weak`] reference, so it
//! can never keep its owner alive:
//!
//! ```text
//!   Rc<RefCell<Ship>> ──owns──► Ship { speed, .. }
//!          ▲
//!          └──weak── Bound<Ship, f32> { "speed", get, set }
//! ```
//!
//! Game objects and their components live in the scene arena instead, so
//! their properties are addressed by node: a [`SceneProperty`] stores the
//! [`NodeId`] (and the component type) and reaches the owner through the
//! [`Scene`] passed to each access.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::component::Component;
use crate::scene::{GameObject, NodeId, Scene};

/// Accessor pair over a field of type `T` on owner type `O`.
pub struct Property<O, T> {
    name: &'static str,
    getter: fn(&O) -> T,
    setter: fn(&mut O, T),
}

impl<O, T> Property<O, T> {
    pub const fn new(name: &'static str, getter: fn(&O) -> T, setter: fn(&mut O, T)) -> Self {
        Self {
            name,
            getter,
            setter,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read the property from an owner you already have access to.
    pub fn get(&self, owner: &O) -> T {
        (self.getter)(owner)
    }

    /// Write the property on an owner you already have access to.
    pub fn set(&self, owner: &mut O, value: T) {
        (self.setter)(owner, value)
    }

    /// Tie this property to a shared owner.
    pub fn bind(self, owner: &Rc<RefCell<O>>) -> Bound<O, T> {
        Bound {
            owner: Rc::downgrade(owner),
            property: self,
        }
    }
}

// Manual impls: derive would add `O: Clone` and `T: Clone` bounds.
impl<O, T> Clone for Property<O, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, T> Copy for Property<O, T> {}

impl<O, T> fmt::Debug for Property<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&self.name).finish()
    }
}

/// Identity of a (owner, property) pair.
///
/// Two [`Bound`] handles to the same property of the same owner allocation
/// always produce the same id, which is how the tweener collapses repeated
/// tweens of one property into a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u64);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A [`Property`] tied to one owner instance.
///
/// All access is fallible: `None`/`false` means the owner is gone or is
/// currently mutably borrowed elsewhere.
pub struct Bound<O, T> {
    owner: Weak<RefCell<O>>,
    property: Property<O, T>,
}

impl<O, T> Bound<O, T> {
    pub fn get(&self) -> Option<T> {
        let owner = self.owner.upgrade()?;
        let owner = owner.try_borrow().ok()?;
        Some(self.property.get(&owner))
    }

    pub fn set(&self, value: T) -> bool {
        let Some(owner) = self.owner.upgrade() else {
            return false;
        };
        let Ok(mut owner) = owner.try_borrow_mut() else {
            return false;
        };
        self.property.set(&mut owner, value);
        true
    }

    /// `false` once the owner has been dropped.
    pub fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    pub fn name(&self) -> &'static str {
        self.property.name
    }

    pub fn id(&self) -> PropertyId {
        // The weak pointer pins the allocation, so the address stays unique
        // for as long as this handle exists.
        let address = Weak::as_ptr(&self.owner) as *const () as usize;
        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        self.property.name.hash(&mut hasher);
        PropertyId(hasher.finish())
    }
}

impl<O, T> Clone for Bound<O, T> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            property: self.property,
        }
    }
}

impl<O, T> fmt::Debug for Bound<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("property", &self.property.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A [`Property`] of a game object, or of one of its components, addressed
/// through the scene arena.
pub struct SceneProperty<O, T> {
    node: NodeId,
    component: Option<TypeId>,
    property: Property<O, T>,
    owner: fn(&Scene, NodeId) -> Option<&O>,
    owner_mut: fn(&mut Scene, NodeId) -> Option<&mut O>,
}

impl<T> SceneProperty<GameObject, T> {
    /// A property of the game object itself, e.g. [`GameObject::ORDER`].
    pub fn object(node: NodeId, property: Property<GameObject, T>) -> Self {
        Self {
            node,
            component: None,
            property,
            owner: Scene::get,
            owner_mut: Scene::get_mut,
        }
    }
}

impl<C: Component, T> SceneProperty<C, T> {
    /// A property of the `C` component attached to `node`.
    pub fn component(node: NodeId, property: Property<C, T>) -> Self {
        Self {
            node,
            component: Some(TypeId::of::<C>()),
            property,
            owner: Scene::get_component::<C>,
            owner_mut: Scene::get_component_mut::<C>,
        }
    }
}

impl<O, T> SceneProperty<O, T> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &'static str {
        self.property.name
    }

    /// `None` if the owner is gone or is a component whose own hook is
    /// running.
    pub fn get(&self, scene: &Scene) -> Option<T> {
        (self.owner)(scene, self.node).map(|owner| self.property.get(owner))
    }

    pub fn set(&self, scene: &mut Scene, value: T) -> bool {
        match (self.owner_mut)(scene, self.node) {
            Some(owner) => {
                self.property.set(owner, value);
                true
            }
            None => false,
        }
    }

    /// The object is alive and, for a component property, still has the
    /// component attached.
    pub fn is_alive(&self, scene: &Scene) -> bool {
        match self.component {
            Some(type_id) => scene.has_component_of(self.node, type_id),
            None => scene.is_alive(self.node),
        }
    }

    pub fn id(&self) -> PropertyId {
        let mut hasher = DefaultHasher::new();
        self.node.hash(&mut hasher);
        self.component.hash(&mut hasher);
        self.property.name.hash(&mut hasher);
        PropertyId(hasher.finish())
    }
}

impl<O, T> Clone for SceneProperty<O, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O, T> Copy for SceneProperty<O, T> {}

impl<O, T> fmt::Debug for SceneProperty<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneProperty")
            .field("node", &self.node)
            .field("property", &self.property.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_support::{Mover, scene};

    struct Ship {
        speed: f32,
        hull: i32,
    }

    impl Ship {
        fn speed(&self) -> f32 {
            self.speed
        }

        fn set_speed(&mut self, speed: f32) {
            self.speed = speed.max(0.0);
        }

        fn hull(&self) -> i32 {
            self.hull
        }

        fn set_hull(&mut self, hull: i32) {
            self.hull = hull;
        }
    }

    const SPEED: Property<Ship, f32> = Property::new("speed", Ship::speed, Ship::set_speed);
    const HULL: Property<Ship, i32> = Property::new("hull", Ship::hull, Ship::set_hull);

    fn ship() -> Rc<RefCell<Ship>> {
        Rc::new(RefCell::new(Ship {
            speed: 2.0,
            hull: 100,
        }))
    }

    #[test]
    fn unbound_access_goes_through_accessors() {
        let mut s = Ship {
            speed: 1.0,
            hull: 5,
        };
        assert_eq!(SPEED.get(&s), 1.0);
        SPEED.set(&mut s, -3.0);
        // The setter clamps, proving the write went through it.
        assert_eq!(s.speed, 0.0);
    }

    #[test]
    fn bound_reads_and_writes_owner() {
        let owner = ship();
        let speed = SPEED.bind(&owner);
        assert_eq!(speed.get(), Some(2.0));
        assert!(speed.set(7.5));
        assert_eq!(owner.borrow().speed, 7.5);
    }

    #[test]
    fn bound_does_not_keep_owner_alive() {
        let owner = ship();
        let hull = HULL.bind(&owner);
        assert!(hull.is_alive());
        drop(owner);
        assert!(!hull.is_alive());
        assert_eq!(hull.get(), None);
        assert!(!hull.set(1));
    }

    #[test]
    fn bound_access_fails_while_owner_is_borrowed() {
        let owner = ship();
        let speed = SPEED.bind(&owner);
        let guard = owner.borrow_mut();
        assert_eq!(speed.get(), None);
        assert!(!speed.set(1.0));
        drop(guard);
        assert_eq!(speed.get(), Some(2.0));
    }

    #[test]
    fn id_is_stable_per_owner_and_property() {
        let a = ship();
        let b = ship();
        assert_eq!(SPEED.bind(&a).id(), SPEED.bind(&a).id());
        assert_ne!(SPEED.bind(&a).id(), SPEED.bind(&b).id());
        assert_ne!(SPEED.bind(&a).id(), HULL.bind(&a).id());
    }

    #[test]
    fn scene_property_reaches_objects_and_components() {
        let mut scene = scene();
        let node = scene.create_game_object("door");
        scene.add_component(node, Box::new(Mover::default()));

        let order = SceneProperty::object(node, GameObject::ORDER);
        let step = SceneProperty::component(node, Mover::STEP);
        assert!(order.set(&mut scene, 3));
        assert!(step.set(&mut scene, 0.5));
        assert_eq!(scene.get(node).map(GameObject::order), Some(3));
        assert_eq!(step.get(&scene), Some(0.5));
        assert_ne!(order.id(), step.id());
        assert_eq!(order.id(), SceneProperty::object(node, GameObject::ORDER).id());

        scene.remove_component::<Mover>(node);
        assert!(!step.is_alive(&scene));
        assert_eq!(step.get(&scene), None);
        assert!(!step.set(&mut scene, 1.0));
        assert!(order.is_alive(&scene));

        assert!(scene.destroy_detached(node));
        assert!(!order.is_alive(&scene));
        assert!(!order.set(&mut scene, 1));
    }
}
