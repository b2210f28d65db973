//! # Persistence — JSON, Duplication, Prefabs
//!
//! Object JSON, one entry per game object:
//!
//! ```json
//! {
//!   "properties": { "Id": "door", "Active": true, "Order": 0 },
//!   "components": [ { "type": "Spin", "properties": { "Active": true } } ],
//!   "gameObjects": [ { "prefab": "hinge", "properties": { "Order": 1 } } ]
//! }
//! ```
//!
//! Loading merges: properties missing from the JSON keep their current
//! values, components already attached are updated in place. A child entry
//! with a `"prefab"` key starts from a copy of that template.
//!
//! Scene documents wrap the roots and the prefab templates:
//!
//! ```json
//! { "prefabs": { "hinge": { ... } }, "gameObjects": [ { ... } ] }
//! ```

use std::path::Path;

use serde_json::{Map, Value};

use super::{GameObject, NodeId, Scene};
use crate::component::{
    PROPERTIES_KEY, TYPE_KEY, component_from_json, component_to_json, duplicate_component,
};
use crate::error::SceneError;
use crate::serialized::Serialized;

const COMPONENTS_KEY: &str = "components";
const GAME_OBJECTS_KEY: &str = "gameObjects";
const PREFAB_KEY: &str = "prefab";
const PREFABS_KEY: &str = "prefabs";

impl Scene {
    // ── Object JSON ──────────────────────────────────────────────────

    /// Serialize an object with its components and confirmed children.
    /// Stale handles serialize to `null`.
    pub fn to_json(&self, node: NodeId) -> Value {
        let Some(go) = self.get(node) else {
            return Value::Null;
        };
        let mut root = Map::new();
        root.insert(
            PROPERTIES_KEY.to_string(),
            Value::Object(GameObject::reflection().serialize(go)),
        );

        let components = go
            .components
            .iter()
            .filter_map(|slot| slot.component.as_deref())
            .map(component_to_json)
            .collect();
        root.insert(COMPONENTS_KEY.to_string(), Value::Array(components));

        if !go.children.is_empty() {
            let children = go
                .children
                .iter()
                .map(|child| self.to_json(*child))
                .filter(|json| !json.is_null())
                .collect();
            root.insert(GAME_OBJECTS_KEY.to_string(), Value::Array(children));
        }
        Value::Object(root)
    }

    /// Merge `value` onto `node`. Children are staged, not confirmed.
    pub fn from_json(&mut self, node: NodeId, value: &Value) {
        let Some(object) = value.as_object() else {
            return;
        };
        if !self.is_alive(node) {
            return;
        }

        if let Some(properties) = object.get(PROPERTIES_KEY) {
            if let Some(go) = self.get_mut(node) {
                GameObject::reflection().deserialize(go, properties);
            }
        }

        if let Some(components) = object.get(COMPONENTS_KEY).and_then(Value::as_array) {
            for entry in components {
                self.component_from_entry(node, entry);
            }
        }

        if let Some(children) = object.get(GAME_OBJECTS_KEY).and_then(Value::as_array) {
            for entry in children {
                let prefab = entry.get(PREFAB_KEY).filter(|p| !p.is_null());
                let child = match prefab {
                    Some(name) => match self.instantiate_named(name) {
                        Some(child) => child,
                        None => continue,
                    },
                    None => self.create_game_object(""),
                };
                if !self.add_game_object(node, child) {
                    self.release(child);
                    continue;
                }
                self.from_json(child, entry);
            }
        }
    }

    fn component_from_entry(&mut self, node: NodeId, entry: &Value) {
        let Some(type_name) = entry.get(TYPE_KEY).and_then(Value::as_str) else {
            return;
        };
        let Some(type_id) = self.factory.resolve_type(type_name) else {
            log::warn!("Component factory for type '{type_name}' not found");
            return;
        };

        if let Some(existing) = self.get_component_of_mut(node, type_id) {
            component_from_json(existing, entry);
            return;
        }
        let Some(mut component) = self.factory.build(type_id) else {
            log::warn!("Component factory could not build '{type_name}'");
            return;
        };
        component_from_json(component.as_mut(), entry);
        self.add_component(node, component);
    }

    fn instantiate_named(&mut self, name: &Value) -> Option<NodeId> {
        let Some(name) = name.as_str() else {
            log::warn!("Prefab name must be a string, got {name}");
            return None;
        };
        let instance = self.instantiate_prefab(name);
        if instance.is_none() {
            log::warn!("Prefab '{name}' not found");
        }
        instance
    }

    // ── Duplication ──────────────────────────────────────────────────

    /// Copy `src` onto `dst`: properties, components, then a fresh copy of
    /// every child (staged and confirmed) staged under `dst`.
    ///
    /// Ignored when `dst` is `src` or inside its subtree.
    pub fn duplicate(&mut self, src: NodeId, dst: NodeId) {
        let Some(source) = self.get(src) else {
            return;
        };
        if !self.is_alive(dst) || self.is_ancestor(src, dst) {
            log::debug!("Rejected duplicating {src} onto {dst}");
            return;
        }
        let (id, active, order, meta_data) = (
            source.id().to_string(),
            source.is_active(),
            source.order(),
            source.meta_data().clone(),
        );
        let mut sources: Vec<NodeId> = source.to_create.clone();
        sources.extend(&source.children);

        if let Some(target) = self.get_mut(dst) {
            target.set_id(id);
            target.set_active(active);
            target.set_order(order);
            target.set_meta_data(meta_data);
        }

        for type_id in self.component_types(src) {
            // Lifted out so source and destination can be borrowed together.
            let Some(component) = self.take_component(src, type_id) else {
                continue;
            };
            if let Some(existing) = self.get_component_of_mut(dst, type_id) {
                duplicate_component(component.as_ref(), existing);
            } else if let Some(mut fresh) = self.factory.build(type_id) {
                duplicate_component(component.as_ref(), fresh.as_mut());
                self.add_component(dst, fresh);
            } else {
                log::warn!(
                    "Cannot duplicate '{}': the component factory cannot build it",
                    component.type_name()
                );
            }
            self.restore_component(src, type_id, component);
        }

        for child in sources {
            let copy = self.create_game_object("");
            if self.add_game_object(dst, copy) {
                self.duplicate(child, copy);
            } else {
                self.release(copy);
            }
        }
    }

    // ── Prefabs ──────────────────────────────────────────────────────

    /// Store a free-standing object as the template `name`, replacing any
    /// previous template of that name.
    pub fn add_prefab(&mut self, name: impl Into<String>, node: NodeId) -> bool {
        let name = name.into();
        let attached = match self.get(node) {
            Some(go) => go.parent.is_some() || go.rooted,
            None => true,
        };
        if attached || self.is_prefab_template(node) {
            log::debug!("Rejected prefab '{name}': {node} is stale or attached");
            return false;
        }
        self.settle(node);
        self.set_prefab(node, true);
        if let Some(previous) = self.prefabs.insert(name.clone(), node) {
            self.release(previous);
        }
        log::debug!("Registered prefab '{name}'");
        true
    }

    /// Build a template from object JSON and store it as `name`.
    pub fn load_prefab(&mut self, name: impl Into<String>, value: &Value) -> NodeId {
        let node = self.create_game_object("");
        self.set_prefab(node, true);
        self.from_json(node, value);
        self.add_prefab(name, node);
        node
    }

    /// A fresh, detached copy of the template `name`.
    pub fn instantiate_prefab(&mut self, name: &str) -> Option<NodeId> {
        let template = *self.prefabs.get(name)?;
        let instance = self.create_game_object("");
        self.duplicate(template, instance);
        Some(instance)
    }

    pub fn remove_prefab(&mut self, name: &str) -> bool {
        match self.prefabs.remove(name) {
            Some(template) => {
                self.release(template);
                true
            }
            None => false,
        }
    }

    pub fn has_prefab(&self, name: &str) -> bool {
        self.prefabs.contains_key(name)
    }

    pub fn prefab(&self, name: &str) -> Option<NodeId> {
        self.prefabs.get(name).copied()
    }

    /// Template names, sorted.
    pub fn prefab_names(&self) -> Vec<&str> {
        self.prefabs.keys().map(String::as_str).collect()
    }

    // ── Scene Documents ──────────────────────────────────────────────

    /// Serialize every prefab template and confirmed root.
    pub fn scene_to_json(&self) -> Value {
        let prefabs: Map<String, Value> = self
            .prefabs
            .iter()
            .map(|(name, template)| (name.clone(), self.to_json(*template)))
            .collect();
        let roots: Vec<Value> = self.roots.iter().map(|root| self.to_json(*root)).collect();

        let mut document = Map::new();
        document.insert(PREFABS_KEY.to_string(), Value::Object(prefabs));
        document.insert(GAME_OBJECTS_KEY.to_string(), Value::Array(roots));
        Value::Object(document)
    }

    /// Load prefabs, then stage every root entry. Roots join the scene on the
    /// next update.
    pub fn load_json(&mut self, document: &Value) {
        if let Some(prefabs) = document.get(PREFABS_KEY).and_then(Value::as_object) {
            for (name, value) in prefabs {
                self.load_prefab(name.as_str(), value);
            }
        }

        let Some(roots) = document.get(GAME_OBJECTS_KEY).and_then(Value::as_array) else {
            return;
        };
        for entry in roots {
            let root = match entry.get(PREFAB_KEY).filter(|p| !p.is_null()) {
                Some(name) => match self.instantiate_named(name) {
                    Some(root) => root,
                    None => continue,
                },
                None => self.create_game_object(""),
            };
            self.from_json(root, entry);
            self.add_root(root);
        }
        log::debug!("Loaded scene document with {} roots", roots.len());
    }

    pub fn to_json_string(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(&self.scene_to_json())?)
    }

    pub fn load_json_str(&mut self, text: &str) -> Result<(), SceneError> {
        let document: Value = serde_json::from_str(text)?;
        if !document.is_object() {
            return Err(SceneError::NotAnObject);
        }
        self.load_json(&document);
        Ok(())
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let text = self.to_json_string()?;
        std::fs::write(path, text).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.load_json_str(&text)
    }

    // ── Inspection ───────────────────────────────────────────────────

    /// Answer an inspection request against one object.
    ///
    /// ```json
    /// { "get": { "properties": ["Id"], "components": ["Spin"] } }
    /// ```
    ///
    /// The answer is flat: `{"properties/Id": ..., "components/Spin": {...}}`.
    /// Unknown names are left out.
    pub fn query(&self, node: NodeId, request: &Value) -> Value {
        let mut answer = Map::new();
        let (Some(go), Some(wanted)) = (self.get(node), request.get("get")) else {
            return Value::Object(answer);
        };

        for name in requested(wanted, PROPERTIES_KEY) {
            if let Some(value) = GameObject::reflection().read(go, name) {
                answer.insert(format!("{PROPERTIES_KEY}/{name}"), value);
            }
        }
        for type_name in requested(wanted, COMPONENTS_KEY) {
            let component = go
                .components
                .iter()
                .filter_map(|slot| slot.component.as_deref())
                .find(|component| component.type_name() == type_name);
            if let Some(component) = component {
                answer.insert(format!("{COMPONENTS_KEY}/{type_name}"), component_to_json(component));
            }
        }
        Value::Object(answer)
    }
}

fn requested<'a>(wanted: &'a Value, key: &str) -> Vec<&'a str> {
    wanted
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
