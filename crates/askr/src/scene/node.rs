//! # Node Arena — Generational Storage for Game Objects
//!
//! Game objects live in one arena owned by the [`Scene`](super::Scene).
//! Everything else (parents, children, component owners, path lookups)
//! refers to them through a [`NodeId`], never through a pointer. Each entry
//! carries its own generation, bumped when the occupant is removed, so a
//! stale handle fails every lookup instead of aliasing the new occupant:
//!
//! ```text
//! entries[5] = { generation: 0, value: Some(door) }   NodeId(5v0) → door
//! remove(5v0)
//! entries[5] = { generation: 1, value: None }         5 queued as vacant
//! insert(lamp)
//! entries[5] = { generation: 1, value: Some(lamp) }   NodeId(5v1) → lamp
//!                                                     NodeId(5v0) → None
//! ```

use std::fmt;

/// Handle to a game object in a [`Scene`](super::Scene).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by [`NodeId`].
pub(crate) struct NodeArena<T> {
    entries: Vec<Entry<T>>,
    /// Indices of empty entries, reused last-in first-out.
    vacant: Vec<u32>,
    occupied: usize,
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            vacant: Vec::new(),
            occupied: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> NodeId {
        self.occupied += 1;
        if let Some(index) = self.vacant.pop() {
            if let Some(entry) = self.entries.get_mut(index as usize) {
                entry.value = Some(value);
                return NodeId {
                    index,
                    generation: entry.generation,
                };
            }
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Take the value out and retire the handle. `None` if it was stale.
    pub fn remove(&mut self, node: NodeId) -> Option<T> {
        let entry = self
            .entries
            .get_mut(node.index as usize)
            .filter(|entry| entry.generation == node.generation)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.vacant.push(node.index);
        self.occupied -= 1;
        Some(value)
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        let entry = self.entries.get(node.index as usize)?;
        if entry.generation != node.generation {
            return None;
        }
        entry.value.as_ref()
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        let entry = self.entries.get_mut(node.index as usize)?;
        if entry.generation != node.generation {
            return None;
        }
        entry.value.as_mut()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    pub fn len(&self) -> usize {
        self.occupied
    }
}
