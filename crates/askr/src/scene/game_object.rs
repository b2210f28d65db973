//! The data half of a game object.
//!
//! A [`GameObject`] is plain state stored in the scene arena. Structural
//! operations (attach, detach, lookup) need the arena, so they live on
//! [`Scene`](super::Scene) and take a [`NodeId`].

use std::any::TypeId;
use std::fmt;
use std::sync::OnceLock;

use serde_json::Value;

use super::NodeId;
use crate::component::Component;
use crate::math::Mat4;
use crate::property::Property;
use crate::serialized::{Reflection, Serialized};

/// One attached component. `component` is `None` while one of its hooks is
/// running; the slot itself keeps the type registered.
pub(crate) struct ComponentSlot {
    pub type_id: TypeId,
    pub component: Option<Box<dyn Component>>,
}

/// A node in the scene graph.
pub struct GameObject {
    id: String,
    active: bool,
    order: i32,
    meta_data: Value,
    pub(crate) prefab: bool,
    /// Attached directly to the scene's root list.
    pub(crate) rooted: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) components: Vec<ComponentSlot>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) to_create: Vec<NodeId>,
    pub(crate) to_destroy: Vec<NodeId>,
    pub(crate) transform: Mat4,
}

impl GameObject {
    pub const ID: Property<GameObject, String> =
        Property::new("Id", GameObject::id_owned, GameObject::set_id_owned);
    pub const ACTIVE: Property<GameObject, bool> =
        Property::new("Active", GameObject::is_active, GameObject::set_active);
    pub const ORDER: Property<GameObject, i32> =
        Property::new("Order", GameObject::order, GameObject::set_order);
    pub const META_DATA: Property<GameObject, Value> =
        Property::new("MetaData", GameObject::meta_data_owned, GameObject::set_meta_data);

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: true,
            order: 0,
            meta_data: Value::Null,
            prefab: false,
            rooted: false,
            parent: None,
            components: Vec::new(),
            children: Vec::new(),
            to_create: Vec::new(),
            to_destroy: Vec::new(),
            transform: Mat4::IDENTITY,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    fn id_owned(&self) -> String {
        self.id.clone()
    }

    fn set_id_owned(&mut self, id: String) {
        self.id = id;
    }

    /// Inactive objects skip every dispatch pass, children included.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Sort key among siblings when child sorting is enabled.
    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    pub fn meta_data(&self) -> &Value {
        &self.meta_data
    }

    fn meta_data_owned(&self) -> Value {
        self.meta_data.clone()
    }

    pub fn set_meta_data(&mut self, meta_data: Value) {
        self.meta_data = meta_data;
    }

    /// Part of a prefab template (set on the whole template subtree).
    pub fn is_prefab(&self) -> bool {
        self.prefab
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Confirmed children, in sibling order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Children staged by `add_game_object`, not yet confirmed.
    pub fn pending_children(&self) -> &[NodeId] {
        &self.to_create
    }

    /// Effective transform computed by the last update pass.
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl Default for GameObject {
    fn default() -> Self {
        Self::new("")
    }
}

impl Serialized for GameObject {
    fn reflection() -> &'static Reflection<Self> {
        static REFLECTION: OnceLock<Reflection<GameObject>> = OnceLock::new();
        REFLECTION.get_or_init(|| {
            Reflection::new()
                .field(GameObject::ID)
                .field(GameObject::ACTIVE)
                .field(GameObject::ORDER)
                .field(GameObject::META_DATA)
        })
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("active", &self.active)
            .field("order", &self.order)
            .field("prefab", &self.prefab)
            .field("parent", &self.parent)
            .field("components", &self.components.len())
            .field("children", &self.children)
            .field("to_create", &self.to_create)
            .field("to_destroy", &self.to_destroy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reflected_properties_in_declaration_order() {
        assert_eq!(
            GameObject::reflection().names(),
            vec!["Id", "Active", "Order", "MetaData"]
        );
    }

    #[test]
    fn null_meta_data_is_omitted() {
        let go = GameObject::new("player");
        let props = GameObject::reflection().serialize(&go);
        assert_eq!(
            Value::Object(props),
            json!({"Id": "player", "Active": true, "Order": 0})
        );
    }

    #[test]
    fn deserialize_validates_each_field() {
        let mut go = GameObject::new("player");
        GameObject::reflection().deserialize(
            &mut go,
            &json!({"Id": 7, "Active": false, "Order": 1.5, "MetaData": {"hp": 3}}),
        );
        assert_eq!(go.id(), "player");
        assert!(!go.is_active());
        assert_eq!(go.order(), 0);
        assert_eq!(go.meta_data(), &json!({"hp": 3}));
    }

    #[test]
    fn property_descriptors_read_and_write() {
        let mut go = GameObject::default();
        GameObject::ORDER.set(&mut go, 4);
        GameObject::ID.set(&mut go, "door".to_string());
        assert_eq!(GameObject::ORDER.get(&go), 4);
        assert_eq!(go.id(), "door");
    }
}
