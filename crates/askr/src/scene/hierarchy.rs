//! # Hierarchy — Parent/Child Structure, Components, Paths
//!
//! Children are never attached or detached immediately. `add_game_object`
//! and `remove_game_object` only stage the change on the parent:
//!
//! ```text
//! add_game_object(p, c)     → p.to_create += c   (c.parent = p)
//! remove_game_object(p, c)  → p.to_destroy += c  (on_destroy sent now)
//!
//! process_adding(p)   → to_create drained into children, on_create sent
//! process_removing(p) → to_destroy drained, each subtree released
//! ```
//!
//! The update pass applies both queues on each object after its own
//! components have run, so a hook can restructure the tree it is walking.
//!
//! Components, by contrast, attach and detach immediately.

use std::any::TypeId;

use super::{ComponentSlot, NodeId, Scene};
use crate::component::{Component, downcast_mut, downcast_ref, type_id_of};

impl Scene {
    // ── Staged Children ──────────────────────────────────────────────

    /// Stage `child` to be added under `parent` on the next
    /// [`process_adding`](Self::process_adding). Under a prefab template the
    /// child is confirmed at once, without `on_create`.
    ///
    /// Returns `false` without effect if either handle is stale, `child` is
    /// already attached somewhere, is a prefab template, or is an ancestor of
    /// `parent`.
    pub fn add_game_object(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child {
            log::debug!("Rejected adding {child} under itself");
            return false;
        }
        let (Some(p), Some(c)) = (self.get(parent), self.get(child)) else {
            log::debug!("Rejected adding {child} under {parent}: stale handle");
            return false;
        };
        if c.parent.is_some() || c.rooted {
            log::debug!("Rejected adding {child} under {parent}: already attached");
            return false;
        }
        if p.children.contains(&child) || p.to_create.contains(&child) {
            return false;
        }
        let prefab = p.prefab;
        if self.is_prefab_template(child) {
            log::debug!("Rejected adding prefab template {child} under {parent}");
            return false;
        }
        if self.is_ancestor(child, parent) {
            log::debug!("Rejected adding {child} under its own descendant {parent}");
            return false;
        }

        if let Some(p) = self.get_mut(parent) {
            p.to_create.push(child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
        self.set_prefab(child, prefab);
        if prefab {
            // Templates are never updated, so nothing else would confirm it.
            self.settle(parent);
        }
        true
    }

    /// Stage a confirmed child for removal and send its subtree the destroy
    /// notification now.
    pub fn remove_game_object(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.has_game_object(parent, child) || self.is_waiting_to_remove(parent, child) {
            return false;
        }
        if let Some(p) = self.get_mut(parent) {
            p.to_destroy.push(child);
        }
        self.notify_destroy(child);
        true
    }

    /// Stage the first confirmed child with this id that is not already
    /// leaving.
    pub fn remove_game_object_by_id(&mut self, parent: NodeId, id: &str) -> bool {
        let Some(p) = self.get(parent) else {
            return false;
        };
        let target = p.children.iter().copied().find(|child| {
            !p.to_destroy.contains(child) && self.get(*child).is_some_and(|c| c.id() == id)
        });
        match target {
            Some(child) => self.remove_game_object(parent, child),
            None => false,
        }
    }

    pub fn remove_all_game_objects(&mut self, parent: NodeId) {
        for child in self.children_snapshot(parent) {
            self.remove_game_object(parent, child);
        }
    }

    /// Confirm every staged child of `node`, sending each `on_create`.
    ///
    /// Children staged by those `on_create` hooks wait for the next call.
    pub fn process_adding(&mut self, node: NodeId) {
        let Some(pending) = self.get_mut(node).map(|go| std::mem::take(&mut go.to_create)) else {
            return;
        };
        for child in pending {
            if !self.is_alive(child) {
                continue;
            }
            if let Some(go) = self.get_mut(node) {
                go.children.push(child);
            }
            log::trace!("{child} added under {node}");
            self.notify_create(child);
        }
    }

    /// Detach and release every child staged for removal from `node`.
    pub fn process_removing(&mut self, node: NodeId) {
        let Some(pending) = self.get_mut(node).map(|go| std::mem::take(&mut go.to_destroy)) else {
            return;
        };
        for child in pending {
            if let Some(go) = self.get_mut(node) {
                go.children.retain(|c| *c != child);
            }
            if let Some(go) = self.get_mut(child) {
                go.parent = None;
                go.prefab = false;
            }
            log::trace!("{child} removed from {node}");
            self.release(child);
        }
    }

    pub fn is_waiting_to_add(&self, parent: NodeId, child: NodeId) -> bool {
        self.get(parent).is_some_and(|p| p.to_create.contains(&child))
    }

    pub fn is_waiting_to_remove(&self, parent: NodeId, child: NodeId) -> bool {
        self.get(parent).is_some_and(|p| p.to_destroy.contains(&child))
    }

    /// Move staged children into place without lifecycle notifications.
    /// Prefab templates never enter the live tree, so they settle this way.
    pub(crate) fn settle(&mut self, node: NodeId) {
        let Some(pending) = self.get_mut(node).map(|go| std::mem::take(&mut go.to_create)) else {
            return;
        };
        if let Some(go) = self.get_mut(node) {
            go.children.extend(pending);
        }
        for child in self.children_snapshot(node) {
            self.settle(child);
        }
    }

    /// Set the prefab flag on `node` and everything under it, staged
    /// children included.
    pub(crate) fn set_prefab(&mut self, node: NodeId, prefab: bool) {
        let Some(go) = self.get_mut(node) else {
            return;
        };
        go.prefab = prefab;
        let mut descendants = go.to_create.clone();
        descendants.extend(&go.children);
        descendants.extend(&go.to_destroy);
        for child in descendants {
            self.set_prefab(child, prefab);
        }
    }

    /// `ancestor` is `node` or one of its parents.
    pub(crate) fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// `node` or one of its ancestors is a scene root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            match self.get(current) {
                Some(go) if go.rooted => return true,
                Some(go) => match go.parent {
                    Some(parent) => current = parent,
                    None => return false,
                },
                None => return false,
            }
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// First confirmed child with this id.
    pub fn get_game_object(&self, parent: NodeId, id: &str) -> Option<NodeId> {
        self.get(parent)?
            .children
            .iter()
            .copied()
            .find(|child| self.get(*child).is_some_and(|c| c.id() == id))
    }

    pub fn has_game_object(&self, parent: NodeId, child: NodeId) -> bool {
        self.get(parent).is_some_and(|p| p.children.contains(&child))
    }

    pub fn has_game_object_id(&self, parent: NodeId, id: &str) -> bool {
        self.get_game_object(parent, id).is_some()
    }

    /// Resolve a `/`-separated path from `from`.
    ///
    /// `.` is the current object and `..` its parent; any other segment names
    /// a confirmed child by id. A leading `/` resolves from the scene roots,
    /// as does `..` on a root object. Empty segments never match.
    pub fn find_game_object(&self, from: NodeId, path: &str) -> Option<NodeId> {
        if !self.is_alive(from) {
            return None;
        }
        match path.strip_prefix('/') {
            Some(absolute) if self.is_connected(from) => self.find(absolute),
            Some(_) => None,
            None => self.resolve(from, path),
        }
    }

    /// Resolve a path whose first segment names a root object.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let (segment, rest) = split_segment(path);
        if segment.is_empty() {
            return None;
        }
        let root = self
            .roots
            .iter()
            .copied()
            .find(|root| self.get(*root).is_some_and(|go| go.id() == segment))?;
        match rest {
            Some(rest) => self.resolve(root, rest),
            None => Some(root),
        }
    }

    fn resolve(&self, node: NodeId, path: &str) -> Option<NodeId> {
        let (segment, rest) = split_segment(path);
        let next = match segment {
            "" => return None,
            "." => node,
            ".." => {
                let go = self.get(node)?;
                match (go.parent, rest) {
                    (Some(parent), _) => parent,
                    (None, Some(rest)) if go.rooted => return self.find(rest),
                    (None, _) => return None,
                }
            }
            id => self.get_game_object(node, id)?,
        };
        match rest {
            Some(rest) => self.resolve(next, rest),
            None => Some(next),
        }
    }

    // ── Components ───────────────────────────────────────────────────

    /// Attach a component. Rejected if the object already has one of the
    /// same concrete type; the rejected box is dropped.
    pub fn add_component(&mut self, node: NodeId, mut component: Box<dyn Component>) -> bool {
        let type_id = type_id_of(component.as_ref());
        let Some(go) = self.get_mut(node) else {
            log::debug!("Rejected {} for stale {node}", component.type_name());
            return false;
        };
        if go.components.iter().any(|slot| slot.type_id == type_id) {
            log::debug!("{node} already has a {}; ignoring the new one", component.type_name());
            return false;
        }
        component.base_mut().set_game_object(Some(node));
        go.components.push(ComponentSlot {
            type_id,
            component: Some(component),
        });
        true
    }

    /// Detach the component of type `T`, handing it back with its owner
    /// cleared.
    pub fn remove_component<T: Component>(&mut self, node: NodeId) -> Option<Box<dyn Component>> {
        self.remove_component_of(node, TypeId::of::<T>())
    }

    /// Detach by [`TypeId`]. A component detached while its own hook runs is
    /// not returned; it is dropped once the hook finishes.
    pub fn remove_component_of(
        &mut self,
        node: NodeId,
        type_id: TypeId,
    ) -> Option<Box<dyn Component>> {
        let go = self.get_mut(node)?;
        let index = go.components.iter().position(|slot| slot.type_id == type_id)?;
        let mut component = go.components.remove(index).component?;
        component.base_mut().set_game_object(None);
        Some(component)
    }

    pub fn remove_all_components(&mut self, node: NodeId) {
        let Some(go) = self.get_mut(node) else {
            return;
        };
        for slot in go.components.drain(..) {
            if let Some(mut component) = slot.component {
                component.base_mut().set_game_object(None);
            }
        }
    }

    pub fn get_component<T: Component>(&self, node: NodeId) -> Option<&T> {
        self.get_component_of(node, TypeId::of::<T>())
            .and_then(downcast_ref::<T>)
    }

    pub fn get_component_mut<T: Component>(&mut self, node: NodeId) -> Option<&mut T> {
        self.get_component_of_mut(node, TypeId::of::<T>())
            .and_then(downcast_mut::<T>)
    }

    /// `None` while the component's own hook is running.
    pub fn get_component_of(&self, node: NodeId, type_id: TypeId) -> Option<&dyn Component> {
        self.get(node)?
            .components
            .iter()
            .find(|slot| slot.type_id == type_id)?
            .component
            .as_deref()
    }

    pub fn get_component_of_mut(
        &mut self,
        node: NodeId,
        type_id: TypeId,
    ) -> Option<&mut dyn Component> {
        let slot = self
            .get_mut(node)?
            .components
            .iter_mut()
            .find(|slot| slot.type_id == type_id)?;
        match slot.component.as_mut() {
            Some(component) => Some(component.as_mut()),
            None => None,
        }
    }

    pub fn has_component<T: Component>(&self, node: NodeId) -> bool {
        self.has_component_of(node, TypeId::of::<T>())
    }

    pub fn has_component_of(&self, node: NodeId, type_id: TypeId) -> bool {
        self.get(node)
            .is_some_and(|go| go.components.iter().any(|slot| slot.type_id == type_id))
    }

    /// Attached component types, in attachment order.
    pub fn component_types(&self, node: NodeId) -> Vec<TypeId> {
        self.get(node)
            .map(|go| go.components.iter().map(|slot| slot.type_id).collect())
            .unwrap_or_default()
    }
}

fn split_segment(path: &str) -> (&str, Option<&str>) {
    match path.split_once('/') {
        Some((segment, rest)) => (segment, Some(rest)),
        None => (path, None),
    }
}
