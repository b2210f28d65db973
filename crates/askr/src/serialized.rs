//! # Reflection — Name-Addressed Properties
//!
//! Generic JSON export/import without each type hand-writing (de)serialization
//! glue. A type describes itself once, as an ordered list of named properties
//! with a read hook and a write hook each:
//!
//! ```ignore
//! impl Serialized for Sprite {
//!     fn reflection() -> &'static Reflection<Self> {
//!         static REFLECTION: OnceLock<Reflection<Sprite>> = OnceLock::new();
//!         REFLECTION.get_or_init(|| {
//!             Reflection::new()
//!                 .field(Sprite::COLOR)
//!                 .property("Layer", |s| json!(s.layer), |s, v| {
//!                     if let Some(layer) = v.as_i64() { s.layer = layer as i32; }
//!                 })
//!         })
//!     }
//! }
//! ```
//!
//! Serializing, partial deserializing and duplicating through a
//! `dyn Component` all work off that list. The [`ErasedSerialized`] blanket
//! impl exposes it to trait objects, where the concrete type is unknown.
//!
//! Validation lives in the write hooks: a hook that receives the wrong kind of
//! value ignores it, and the rest of the pass carries on.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::property::Property;

type ReadHook<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type WriteHook<T> = Box<dyn Fn(&mut T, &Value) + Send + Sync>;

struct Entry<T> {
    name: &'static str,
    read: ReadHook<T>,
    write: WriteHook<T>,
}

/// Ordered registry of reflected properties for type `T`.
pub struct Reflection<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Reflection<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a property with explicit hooks.
    ///
    /// Registering a name twice keeps the first registration.
    pub fn property(
        mut self,
        name: &'static str,
        read: impl Fn(&T) -> Value + Send + Sync + 'static,
        write: impl Fn(&mut T, &Value) + Send + Sync + 'static,
    ) -> Self {
        if self.contains(name) {
            return self;
        }
        self.entries.push(Entry {
            name,
            read: Box::new(read),
            write: Box::new(write),
        });
        self
    }

    /// Register a property that is exported but never imported.
    pub fn read_only(
        self,
        name: &'static str,
        read: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.property(name, read, |_, _| {})
    }

    /// Register a [`Property`] descriptor, converting through serde.
    ///
    /// Values that fail to deserialize into `V` are ignored.
    pub fn field<V>(self, property: Property<T, V>) -> Self
    where
        T: 'static,
        V: Serialize + DeserializeOwned + 'static,
    {
        self.property(
            property.name(),
            move |owner| serde_json::to_value(property.get(owner)).unwrap_or(Value::Null),
            move |owner, value| {
                if let Ok(v) = serde_json::from_value::<V>(value.clone()) {
                    property.set(owner, v);
                }
            },
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Registered names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read a single property. `None` if unregistered or the hook gave null.
    pub fn read(&self, owner: &T, name: &str) -> Option<Value> {
        let entry = self.entries.iter().find(|e| e.name == name)?;
        match (entry.read)(owner) {
            Value::Null => None,
            value => Some(value),
        }
    }

    /// Write a single property. Returns `false` if the name is unregistered.
    pub fn write(&self, owner: &mut T, name: &str, value: &Value) -> bool {
        match self.entries.iter().find(|e| e.name == name) {
            Some(entry) => {
                (entry.write)(owner, value);
                true
            }
            None => false,
        }
    }

    /// Append every non-null property to `out`, in declaration order.
    pub fn serialize_into(&self, owner: &T, out: &mut Map<String, Value>) {
        for entry in &self.entries {
            let value = (entry.read)(owner);
            if !value.is_null() {
                out.insert(entry.name.to_string(), value);
            }
        }
    }

    pub fn serialize(&self, owner: &T) -> Map<String, Value> {
        let mut out = Map::new();
        self.serialize_into(owner, &mut out);
        out
    }

    /// Apply every registered property present in `input`.
    ///
    /// Non-object input is ignored.
    pub fn deserialize(&self, owner: &mut T, input: &Value) {
        let Some(input) = input.as_object() else {
            return;
        };
        for entry in &self.entries {
            if let Some(value) = input.get(entry.name) {
                (entry.write)(owner, value);
            }
        }
    }
}

impl<T> Default for Reflection<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A type with a static reflection registry.
pub trait Serialized: Sized + 'static {
    fn reflection() -> &'static Reflection<Self>;
}

/// Object-safe view of [`Serialized`], implemented for every `Serialized`
/// type. This is what generic code sees through a `dyn Component`.
pub trait ErasedSerialized {
    fn serialize_properties(&self) -> Map<String, Value>;
    fn deserialize_properties(&mut self, input: &Value);
    fn property_names(&self) -> Vec<&'static str>;
}

impl<T: Serialized> ErasedSerialized for T {
    fn serialize_properties(&self) -> Map<String, Value> {
        T::reflection().serialize(self)
    }

    fn deserialize_properties(&mut self, input: &Value) {
        T::reflection().deserialize(self, input)
    }

    fn property_names(&self) -> Vec<&'static str> {
        T::reflection().names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::OnceLock;

    #[derive(Debug, Default, PartialEq)]
    struct Lamp {
        name: String,
        power: f32,
        note: Option<String>,
        hits: u32,
    }

    impl Lamp {
        fn power(&self) -> f32 {
            self.power
        }

        fn set_power(&mut self, power: f32) {
            self.power = power;
        }
    }

    const POWER: Property<Lamp, f32> = Property::new("Power", Lamp::power, Lamp::set_power);

    impl Serialized for Lamp {
        fn reflection() -> &'static Reflection<Self> {
            static REFLECTION: OnceLock<Reflection<Lamp>> = OnceLock::new();
            REFLECTION.get_or_init(|| {
                Reflection::new()
                    .property(
                        "Name",
                        |l: &Lamp| json!(l.name),
                        |l, v| {
                            if let Some(s) = v.as_str() {
                                l.name = s.to_string();
                            }
                        },
                    )
                    .field(POWER)
                    .property(
                        "Note",
                        |l: &Lamp| l.note.as_ref().map_or(Value::Null, |n| json!(n)),
                        |l, v| l.note = v.as_str().map(str::to_string),
                    )
                    .read_only("Hits", |l: &Lamp| json!(l.hits))
                    // Ignored: the name is already registered.
                    .property("Name", |_| json!("shadowed"), |_, _| {})
            })
        }
    }

    #[test]
    fn names_keep_declaration_order_and_dedupe() {
        assert_eq!(Lamp::reflection().names(), vec!["Name", "Power", "Note", "Hits"]);
        assert_eq!(Lamp::reflection().len(), 4);
    }

    #[test]
    fn serialize_omits_null_hooks() {
        let lamp = Lamp {
            name: "desk".into(),
            power: 0.5,
            note: None,
            hits: 3,
        };
        let out = Lamp::reflection().serialize(&lamp);
        assert_eq!(
            Value::Object(out.clone()),
            json!({"Name": "desk", "Power": 0.5, "Hits": 3})
        );
        let keys: Vec<_> = out.keys().cloned().collect();
        assert!(!keys.contains(&"Note".to_string()));
    }

    #[test]
    fn deserialize_is_partial() {
        let mut lamp = Lamp {
            name: "desk".into(),
            power: 0.5,
            ..Default::default()
        };
        Lamp::reflection().deserialize(&mut lamp, &json!({"Power": 2.0}));
        assert_eq!(lamp.name, "desk");
        assert_eq!(lamp.power, 2.0);
    }

    #[test]
    fn malformed_values_are_ignored_per_field() {
        let mut lamp = Lamp::default();
        Lamp::reflection().deserialize(
            &mut lamp,
            &json!({"Name": 42, "Power": "bright", "Note": "kept", "Hits": 9}),
        );
        assert_eq!(lamp.name, "");
        assert_eq!(lamp.power, 0.0);
        assert_eq!(lamp.note.as_deref(), Some("kept"));
        // Read-only: the write hook is a no-op.
        assert_eq!(lamp.hits, 0);
    }

    #[test]
    fn non_object_input_is_ignored() {
        let mut lamp = Lamp::default();
        Lamp::reflection().deserialize(&mut lamp, &json!([1, 2, 3]));
        assert_eq!(lamp, Lamp::default());
    }

    #[test]
    fn single_property_access() {
        let mut lamp = Lamp::default();
        assert!(Lamp::reflection().write(&mut lamp, "Power", &json!(4.0)));
        assert!(!Lamp::reflection().write(&mut lamp, "Missing", &json!(1)));
        assert_eq!(Lamp::reflection().read(&lamp, "Power"), Some(json!(4.0)));
        assert_eq!(Lamp::reflection().read(&lamp, "Note"), None);
    }

    #[test]
    fn erased_view_matches_static_registry() {
        let mut lamp = Lamp::default();
        let erased: &mut dyn ErasedSerialized = &mut lamp;
        erased.deserialize_properties(&json!({"Name": "porch"}));
        assert_eq!(erased.property_names().len(), 4);
        assert_eq!(erased.serialize_properties().get("Name"), Some(&json!("porch")));
    }
}
