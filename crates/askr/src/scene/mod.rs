//! # Scene — The Game Object Arena and Frame Driver
//!
//! The [`Scene`] owns every [`GameObject`] in one arena, the list of root
//! objects, the prefab templates, and the [`ComponentFactory`] used to rebuild
//! components from JSON. It is also the "manager" that absolute paths and
//! prefab instantiation resolve against.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Scene                                                    │
//! │                                                          │
//! │  nodes: NodeArena<GameObject>  (addressed by NodeId)     │
//! │                                                          │
//! │  roots ─┬─ confirmed root objects (updated each frame)   │
//! │         ├─ roots_to_create  (staged by add_root)         │
//! │         └─ roots_to_destroy (staged by remove_root)      │
//! │                                                          │
//! │  prefabs: name → template NodeId (never live)            │
//! │  factory: Box<dyn ComponentFactory>                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frame
//!
//! `update(dt)` applies the staged root changes, then walks each root:
//!
//! 1. skip the object (and its subtree) if inactive
//! 2. every active component: `on_update`, then `on_transform`
//! 3. apply the object's pending adds, then pending removes
//! 4. re-sort children by order if [`SceneSettings::sort_children`]
//! 5. recurse into a snapshot of the children
//!
//! Render, event and physics dispatch use the same shape without step 3.
//!
//! ## Hooks and borrowing
//!
//! Hooks take `&mut Scene`, so a component cannot stay borrowed from its slot
//! while one runs. Dispatch lifts each component out of its slot, calls the
//! hook, and puts it back. The slot keeps its type registered in the meantime.
//! A destroy notification that reaches a lifted component is held until its
//! hook returns, so a component that removes its own object still gets
//! `on_destroy` exactly once.

mod game_object;
mod hierarchy;
mod node;
mod persist;

pub use game_object::GameObject;
pub use node::NodeId;

pub(crate) use game_object::ComponentSlot;

use std::any::{Any, TypeId};
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::{
    Component, ComponentFlags, ContactHandle, FixtureHandle, JointHandle,
};
use crate::math::Mat4;
use crate::registry::ComponentFactory;
use node::NodeArena;

/// Runtime knobs for a [`Scene`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Stable-sort children by [`GameObject::order`] after each update.
    pub sort_children: bool,
}

/// Arena of game objects plus the root list that the frame driver walks.
pub struct Scene {
    nodes: NodeArena<GameObject>,
    roots: Vec<NodeId>,
    roots_to_create: Vec<NodeId>,
    roots_to_destroy: Vec<NodeId>,
    prefabs: BTreeMap<String, NodeId>,
    factory: Box<dyn ComponentFactory>,
    settings: SceneSettings,
    /// Components that missed `on_destroy` because their own hook was running.
    destroy_pending: Vec<(NodeId, TypeId)>,
}

impl Scene {
    pub fn new(factory: impl ComponentFactory + 'static) -> Self {
        Self {
            nodes: NodeArena::new(),
            roots: Vec::new(),
            roots_to_create: Vec::new(),
            roots_to_destroy: Vec::new(),
            prefabs: BTreeMap::new(),
            factory: Box::new(factory),
            settings: SceneSettings::default(),
            destroy_pending: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: SceneSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SceneSettings {
        &mut self.settings
    }

    pub fn factory(&self) -> &dyn ComponentFactory {
        self.factory.as_ref()
    }

    // ── Arena ────────────────────────────────────────────────────────

    /// Create a free-standing object. It takes part in nothing until it is
    /// added under a parent or as a root.
    pub fn create_game_object(&mut self, id: impl Into<String>) -> NodeId {
        self.nodes.insert(GameObject::new(id))
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub fn get(&self, node: NodeId) -> Option<&GameObject> {
        self.nodes.get(node)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut GameObject> {
        self.nodes.get_mut(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent
    }

    /// Live objects, including detached ones and prefab templates.
    pub fn object_count(&self) -> usize {
        self.nodes.len()
    }

    /// Free `node` and its whole subtree, pending lists included.
    ///
    /// Components are dropped without `on_destroy`; callers that need the
    /// notification stage a removal instead.
    pub(crate) fn release(&mut self, node: NodeId) {
        let Some(go) = self.nodes.remove(node) else {
            return;
        };
        for child in go.to_create.iter().chain(&go.children).chain(&go.to_destroy) {
            self.release(*child);
        }
    }

    /// Release a detached object that the caller no longer wants.
    ///
    /// Objects under a parent or in the root list are left alone; detach
    /// them through the removal queues instead.
    pub fn destroy_detached(&mut self, node: NodeId) -> bool {
        match self.get(node) {
            Some(go) if go.parent.is_none() && !go.rooted && !self.is_prefab_template(node) => {
                self.release(node);
                true
            }
            _ => false,
        }
    }

    // ── Roots ────────────────────────────────────────────────────────

    /// Confirmed roots, in update order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Stage `node` as a scene root. Applied at the start of the next update.
    pub fn add_root(&mut self, node: NodeId) -> bool {
        let valid = match self.get(node) {
            Some(go) => go.parent.is_none() && !go.rooted,
            None => false,
        };
        if !valid || self.is_prefab_template(node) {
            log::debug!("Rejected root {node}: stale, already attached, or a prefab template");
            return false;
        }
        if let Some(go) = self.get_mut(node) {
            go.rooted = true;
        }
        self.roots_to_create.push(node);
        true
    }

    /// Stage a confirmed root for removal and send it the destroy
    /// notification now.
    pub fn remove_root(&mut self, node: NodeId) -> bool {
        if !self.roots.contains(&node) || self.roots_to_destroy.contains(&node) {
            return false;
        }
        self.roots_to_destroy.push(node);
        self.notify_destroy(node);
        true
    }

    pub fn remove_all_roots(&mut self) {
        for root in self.roots.clone() {
            self.remove_root(root);
        }
    }

    pub fn is_root_waiting_to_add(&self, node: NodeId) -> bool {
        self.roots_to_create.contains(&node)
    }

    pub fn is_root_waiting_to_remove(&self, node: NodeId) -> bool {
        self.roots_to_destroy.contains(&node)
    }

    /// Apply staged root additions and removals.
    pub fn process_roots(&mut self) {
        let created = std::mem::take(&mut self.roots_to_create);
        for node in created {
            if !self.is_alive(node) {
                continue;
            }
            self.roots.push(node);
            log::trace!("Root {node} added");
            self.notify_create(node);
        }

        let destroyed = std::mem::take(&mut self.roots_to_destroy);
        for node in destroyed {
            self.roots.retain(|r| *r != node);
            if let Some(go) = self.get_mut(node) {
                go.rooted = false;
            }
            log::trace!("Root {node} removed");
            self.release(node);
        }
    }

    // ── Frame Dispatch ───────────────────────────────────────────────

    /// Advance the scene by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.process_roots();
        if self.settings.sort_children {
            let roots = std::mem::take(&mut self.roots);
            self.roots = self.sorted_by_order(roots);
        }
        for root in self.roots.clone() {
            self.update_game_object(root, dt, Mat4::IDENTITY);
        }
    }

    fn update_game_object(&mut self, node: NodeId, dt: f32, inherited: Mat4) {
        if !self.get(node).is_some_and(GameObject::is_active) {
            return;
        }

        let mut transform = inherited;
        self.dispatch(
            node,
            ComponentFlags::UPDATE | ComponentFlags::TRANSFORM,
            |component, scene| {
                let flags = component.base().flags();
                if flags.contains(ComponentFlags::UPDATE) {
                    component.on_update(scene, dt);
                }
                if flags.contains(ComponentFlags::TRANSFORM) {
                    transform = component.on_transform(scene, transform);
                }
            },
        );
        if let Some(go) = self.get_mut(node) {
            go.transform = transform;
        }

        self.process_adding(node);
        self.process_removing(node);

        if self.settings.sort_children {
            if let Some(children) = self.get_mut(node).map(|go| std::mem::take(&mut go.children)) {
                let sorted = self.sorted_by_order(children);
                if let Some(go) = self.get_mut(node) {
                    go.children = sorted;
                }
            }
        }

        for child in self.children_snapshot(node) {
            self.update_game_object(child, dt, transform);
        }
    }

    /// Hand `target` to every active `RENDER` component, depth first.
    pub fn render(&mut self, target: &mut dyn Any) {
        for root in self.roots.clone() {
            self.render_game_object(root, target);
        }
    }

    fn render_game_object(&mut self, node: NodeId, target: &mut dyn Any) {
        if !self.get(node).is_some_and(GameObject::is_active) {
            return;
        }
        self.dispatch(node, ComponentFlags::RENDER, |component, scene| {
            component.on_render(scene, &mut *target);
        });
        for child in self.children_snapshot(node) {
            self.render_game_object(child, target);
        }
    }

    /// Deliver an input or game event to every active `EVENTS` component.
    pub fn dispatch_event(&mut self, event: &dyn Any) {
        for root in self.roots.clone() {
            self.event_game_object(root, event);
        }
    }

    fn event_game_object(&mut self, node: NodeId, event: &dyn Any) {
        if !self.get(node).is_some_and(GameObject::is_active) {
            return;
        }
        self.dispatch(node, ComponentFlags::EVENTS, |component, scene| {
            component.on_event(scene, event);
        });
        for child in self.children_snapshot(node) {
            self.event_game_object(child, event);
        }
    }

    // ── Physics Events ───────────────────────────────────────────────
    //
    // The physics backend addresses one object directly; nothing recurses.

    pub fn collide(&mut self, node: NodeId, other: NodeId, begin: bool, contact: ContactHandle) {
        if !self.get(node).is_some_and(GameObject::is_active) {
            return;
        }
        self.dispatch(node, ComponentFlags::PHYSICS, |component, scene| {
            component.on_collide(scene, other, begin, contact);
        });
    }

    pub fn joint_goodbye(&mut self, node: NodeId, joint: JointHandle) {
        if !self.get(node).is_some_and(GameObject::is_active) {
            return;
        }
        self.dispatch(node, ComponentFlags::PHYSICS, |component, scene| {
            component.on_joint_goodbye(scene, joint);
        });
    }

    pub fn fixture_goodbye(&mut self, node: NodeId, fixture: FixtureHandle) {
        if !self.get(node).is_some_and(GameObject::is_active) {
            return;
        }
        self.dispatch(node, ComponentFlags::PHYSICS, |component, scene| {
            component.on_fixture_goodbye(scene, fixture);
        });
    }

    // ── Lifecycle Notifications ──────────────────────────────────────

    /// `on_create` on the object's components, then on its confirmed
    /// children.
    pub(crate) fn notify_create(&mut self, node: NodeId) {
        self.dispatch_all(node, |component, scene| component.on_create(scene));
        for child in self.children_snapshot(node) {
            self.notify_create(child);
        }
    }

    /// `on_destroy` on the confirmed children first, then on the object's
    /// components.
    pub(crate) fn notify_destroy(&mut self, node: NodeId) {
        for child in self.children_snapshot(node) {
            self.notify_destroy(child);
        }
        let lifted = self.dispatch_all(node, |component, scene| component.on_destroy(scene));
        for type_id in lifted {
            if !self.destroy_pending.contains(&(node, type_id)) {
                self.destroy_pending.push((node, type_id));
            }
        }
    }

    // ── Component Extraction ─────────────────────────────────────────

    /// Run `hook` on each component of `node` that wants `category`.
    fn dispatch(
        &mut self,
        node: NodeId,
        category: ComponentFlags,
        mut hook: impl FnMut(&mut dyn Component, &mut Scene),
    ) {
        self.dispatch_all(node, |component, scene| {
            if component.base().wants(category) {
                hook(component, scene);
            }
        });
    }

    /// Run `hook` on every component of `node` attached when the pass
    /// starts, in attachment order.
    ///
    /// Returns the types that were skipped because they are lifted out for
    /// a hook further up the call stack.
    fn dispatch_all(
        &mut self,
        node: NodeId,
        mut hook: impl FnMut(&mut dyn Component, &mut Scene),
    ) -> Vec<TypeId> {
        let Some(go) = self.get(node) else {
            return Vec::new();
        };
        let types: Vec<TypeId> = go.components.iter().map(|slot| slot.type_id).collect();
        let mut lifted = Vec::new();
        for type_id in types {
            match self.take_component(node, type_id) {
                Some(mut component) => {
                    hook(component.as_mut(), self);
                    self.restore_component(node, type_id, component);
                }
                None if self.has_component_of(node, type_id) => lifted.push(type_id),
                None => {}
            }
        }
        lifted
    }

    /// Lift a component out of its slot, leaving the slot in place.
    pub(crate) fn take_component(
        &mut self,
        node: NodeId,
        type_id: TypeId,
    ) -> Option<Box<dyn Component>> {
        self.get_mut(node)?
            .components
            .iter_mut()
            .find(|slot| slot.type_id == type_id)?
            .component
            .take()
    }

    /// Put a lifted component back, first delivering an `on_destroy` it
    /// missed while out. If its slot was removed meanwhile, the component is
    /// dropped.
    pub(crate) fn restore_component(
        &mut self,
        node: NodeId,
        type_id: TypeId,
        mut component: Box<dyn Component>,
    ) {
        if let Some(index) = self.destroy_pending.iter().position(|p| *p == (node, type_id)) {
            self.destroy_pending.swap_remove(index);
            component.on_destroy(self);
        }
        let slot = self.get_mut(node).and_then(|go| {
            go.components
                .iter_mut()
                .find(|slot| slot.type_id == type_id && slot.component.is_none())
        });
        match slot {
            Some(slot) => slot.component = Some(component),
            None => log::trace!(
                "Dropping {} detached from {node} during its own hook",
                component.type_name()
            ),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    pub(crate) fn children_snapshot(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|go| go.children.clone()).unwrap_or_default()
    }

    fn sorted_by_order(&self, mut nodes: Vec<NodeId>) -> Vec<NodeId> {
        nodes.sort_by_key(|n| self.get(*n).map_or(0, GameObject::order));
        nodes
    }

    pub(crate) fn is_prefab_template(&self, node: NodeId) -> bool {
        self.prefabs.values().any(|template| *template == node)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Components shared by the scene tests.

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::OnceLock;

    use serde_json::{Value, json};

    use crate::component::{Component, ComponentBase, ComponentFlags};
    use crate::math::{Mat4, Vec3};
    use crate::property::Property;
    use crate::registry::ComponentRegistry;
    use crate::scene::{NodeId, Scene};
    use crate::serialized::{Reflection, Serialized};

    /// Records lifecycle and dispatch calls into a shared journal.
    pub type Journal = Rc<RefCell<Vec<String>>>;

    thread_local! {
        static JOURNAL: RefCell<Option<Journal>> = const { RefCell::new(None) };
    }

    /// Install a fresh journal for components created on this thread.
    pub fn journal() -> Journal {
        let journal = Journal::default();
        JOURNAL.with(|j| *j.borrow_mut() = Some(journal.clone()));
        journal
    }

    pub fn record(entry: String) {
        JOURNAL.with(|j| {
            if let Some(journal) = j.borrow().as_ref() {
                journal.borrow_mut().push(entry);
            }
        });
    }

    /// Logs every hook, tagged with `tag`.
    pub struct Recorder {
        pub base: ComponentBase,
        pub tag: String,
        pub updates: u32,
    }

    impl Default for Recorder {
        fn default() -> Self {
            Self {
                base: ComponentBase::new(ComponentFlags::ALL),
                tag: String::new(),
                updates: 0,
            }
        }
    }

    impl Recorder {
        pub fn tagged(tag: &str) -> Box<dyn Component> {
            Box::new(Self {
                tag: tag.to_string(),
                ..Self::default()
            })
        }
    }

    impl Serialized for Recorder {
        fn reflection() -> &'static Reflection<Self> {
            static REFLECTION: OnceLock<Reflection<Recorder>> = OnceLock::new();
            REFLECTION.get_or_init(|| {
                Reflection::new().property(
                    "Tag",
                    |p: &Recorder| json!(p.tag),
                    |p, v| {
                        if let Some(tag) = v.as_str() {
                            p.tag = tag.to_string();
                        }
                    },
                )
            })
        }
    }

    impl Component for Recorder {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }

        fn on_create(&mut self, _scene: &mut Scene) {
            record(format!("create {}", self.tag));
        }

        fn on_destroy(&mut self, _scene: &mut Scene) {
            record(format!("destroy {}", self.tag));
        }

        fn on_update(&mut self, _scene: &mut Scene, _dt: f32) {
            self.updates += 1;
            record(format!("update {}", self.tag));
        }

        fn on_render(&mut self, _scene: &mut Scene, target: &mut dyn std::any::Any) {
            if let Some(frame) = target.downcast_mut::<Vec<String>>() {
                frame.push(self.tag.clone());
            }
        }

        fn on_event(&mut self, _scene: &mut Scene, event: &dyn std::any::Any) {
            if let Some(name) = event.downcast_ref::<&str>() {
                record(format!("event {} {name}", self.tag));
            }
        }

        fn on_collide(
            &mut self,
            _scene: &mut Scene,
            other: NodeId,
            begin: bool,
            _contact: crate::component::ContactHandle,
        ) {
            record(format!("collide {} {other} {begin}", self.tag));
        }
    }

    /// Moves its object along +x by `Step` per update.
    pub struct Mover {
        pub base: ComponentBase,
        pub step: f32,
        pub offset: f32,
    }

    impl Default for Mover {
        fn default() -> Self {
            Self {
                base: ComponentBase::new(ComponentFlags::UPDATE | ComponentFlags::TRANSFORM),
                step: 1.0,
                offset: 0.0,
            }
        }
    }

    impl Mover {
        pub const STEP: Property<Mover, f32> = Property::new("Step", Mover::step, Mover::set_step);

        fn step(&self) -> f32 {
            self.step
        }

        fn set_step(&mut self, step: f32) {
            self.step = step;
        }
    }

    impl Serialized for Mover {
        fn reflection() -> &'static Reflection<Self> {
            static REFLECTION: OnceLock<Reflection<Mover>> = OnceLock::new();
            REFLECTION.get_or_init(|| {
                Reflection::new()
                    .property(
                        "Step",
                        |m: &Mover| json!(m.step),
                        |m, v| {
                            if let Some(step) = v.as_f64() {
                                m.step = step as f32;
                            }
                        },
                    )
                    .property(
                        "Offset",
                        |m: &Mover| json!(m.offset),
                        |m, v: &Value| {
                            if let Some(offset) = v.as_f64() {
                                m.offset = offset as f32;
                            }
                        },
                    )
            })
        }
    }

    impl Component for Mover {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ComponentBase {
            &mut self.base
        }

        fn on_update(&mut self, _scene: &mut Scene, _dt: f32) {
            self.offset += self.step;
        }

        fn on_transform(&mut self, _scene: &mut Scene, inherited: Mat4) -> Mat4 {
            inherited * Mat4::from_translation(Vec3::new(self.offset, 0.0, 0.0))
        }
    }

    pub fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register::<Recorder>().register::<Mover>();
        registry
    }

    pub fn scene() -> Scene {
        Scene::new(registry())
    }

    /// `root → a → b`, all confirmed, root in the root list.
    pub fn chain(scene: &mut Scene) -> (NodeId, NodeId, NodeId) {
        let root = scene.create_game_object("root");
        let a = scene.create_game_object("a");
        let b = scene.create_game_object("b");
        scene.add_game_object(root, a);
        scene.add_game_object(a, b);
        scene.add_root(root);
        scene.update(0.0);
        (root, a, b)
    }
}
