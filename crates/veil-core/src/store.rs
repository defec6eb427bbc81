//! Value store for managed fields
//!
//! Storage frames map storage keys to slots and chain to a parent frame, the
//! same way declaration layers chain. A class owns a static frame and an
//! instance template frame; every instance owns one frame chained onto its
//! class's template.
//!
//! Writes through an instance frame land in that frame, so template values
//! are copied on first write and never shared between instances. Writes
//! through a static or template frame update the slot where it lives, so a
//! static slot is shared by every class that inherits it.

use crate::registry::StorageKey;
use crate::value::Value;
use rustc_hash::FxHashMap;

/// Handle of a storage frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(usize);

impl StoreId {
    /// Get the raw arena index
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Role of a storage frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Initial instance values of a class
    Template,
    /// Static values of a class
    Static,
    /// Values owned by one instance
    Instance,
}

/// One value slot
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Current value
    pub value: Value,
    /// Cleared for `const`/`final` fields
    pub writable: bool,
}

/// Reason a slot write was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRejected {
    /// No frame in the chain holds the key
    Missing,
    /// The slot is read-only
    ReadOnly,
}

#[derive(Debug)]
struct StoreFrame {
    kind: FrameKind,
    parent: Option<StoreId>,
    slots: FxHashMap<StorageKey, Slot>,
}

/// Arena of storage frames
#[derive(Debug, Default)]
pub struct ValueStore {
    frames: Vec<StoreFrame>,
}

impl ValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Create an empty frame chained onto `parent`
    pub fn create_frame(&mut self, kind: FrameKind, parent: Option<StoreId>) -> StoreId {
        let id = StoreId(self.frames.len());
        self.frames.push(StoreFrame {
            kind,
            parent,
            slots: FxHashMap::default(),
        });
        id
    }

    /// Initialize a slot directly on a frame
    pub fn define(&mut self, frame: StoreId, key: StorageKey, value: Value, writable: bool) {
        if let Some(frame) = self.frames.get_mut(frame.0) {
            frame.slots.insert(key, Slot { value, writable });
        }
    }

    /// Kind of a frame
    pub fn kind(&self, frame: StoreId) -> Option<FrameKind> {
        self.frames.get(frame.0).map(|f| f.kind)
    }

    /// Parent of a frame
    pub fn parent(&self, frame: StoreId) -> Option<StoreId> {
        self.frames.get(frame.0).and_then(|f| f.parent)
    }

    /// Find the frame and slot holding `key`, starting at `frame`
    pub fn find(&self, frame: StoreId, key: StorageKey) -> Option<(StoreId, &Slot)> {
        let mut current = Some(frame);
        while let Some(id) = current {
            let data = self.frames.get(id.0)?;
            if let Some(slot) = data.slots.get(&key) {
                return Some((id, slot));
            }
            current = data.parent;
        }
        None
    }

    /// Check if the chain starting at `frame` holds `key`
    pub fn contains(&self, frame: StoreId, key: StorageKey) -> bool {
        self.find(frame, key).is_some()
    }

    /// Read the nearest slot for `key`
    pub fn read(&self, frame: StoreId, key: StorageKey) -> Option<&Value> {
        self.find(frame, key).map(|(_, slot)| &slot.value)
    }

    /// Write the slot for `key`
    pub fn write(&mut self, frame: StoreId, key: StorageKey, value: Value) -> Result<(), WriteRejected> {
        let (holder, writable) = match self.find(frame, key) {
            Some((holder, slot)) => (holder, slot.writable),
            None => return Err(WriteRejected::Missing),
        };
        if !writable {
            return Err(WriteRejected::ReadOnly);
        }

        let target = match self.kind(frame) {
            Some(FrameKind::Instance) => frame,
            _ => holder,
        };
        if let Some(data) = self.frames.get_mut(target.0) {
            data.slots.insert(key, Slot { value, writable: true });
        }
        Ok(())
    }

    /// Check if `ancestor` is `frame` or appears in its parent chain
    pub fn is_chained_to(&self, frame: StoreId, ancestor: StoreId) -> bool {
        let mut current = Some(frame);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Get the number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if no frame was created
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_read_through() {
        let mut store = ValueStore::new();
        let template = store.create_frame(FrameKind::Template, None);
        let key = StorageKey::mint();
        store.define(template, key, Value::from("alpha"), true);

        let instance = store.create_frame(FrameKind::Instance, Some(template));
        assert_eq!(store.read(instance, key), Some(&Value::from("alpha")));
    }

    #[test]
    fn test_instance_write_is_copy_on_write() {
        let mut store = ValueStore::new();
        let template = store.create_frame(FrameKind::Template, None);
        let key = StorageKey::mint();
        store.define(template, key, Value::Int(42), true);

        let a = store.create_frame(FrameKind::Instance, Some(template));
        let b = store.create_frame(FrameKind::Instance, Some(template));
        store.write(a, key, Value::Int(21)).unwrap();

        assert_eq!(store.read(a, key), Some(&Value::Int(21)));
        assert_eq!(store.read(b, key), Some(&Value::Int(42)));
        assert_eq!(store.read(template, key), Some(&Value::Int(42)));
    }

    #[test]
    fn test_static_write_is_in_place() {
        let mut store = ValueStore::new();
        let base = store.create_frame(FrameKind::Static, None);
        let derived = store.create_frame(FrameKind::Static, Some(base));
        let key = StorageKey::mint();
        store.define(base, key, Value::Int(0), true);

        store.write(derived, key, Value::Int(5)).unwrap();
        assert_eq!(store.read(base, key), Some(&Value::Int(5)));
        assert_eq!(store.read(derived, key), Some(&Value::Int(5)));
    }

    #[test]
    fn test_read_only_slot() {
        let mut store = ValueStore::new();
        let template = store.create_frame(FrameKind::Template, None);
        let key = StorageKey::mint();
        store.define(template, key, Value::Int(1), false);
        let instance = store.create_frame(FrameKind::Instance, Some(template));

        assert_eq!(store.write(instance, key, Value::Int(2)), Err(WriteRejected::ReadOnly));
        assert_eq!(store.read(instance, key), Some(&Value::Int(1)));
    }

    #[test]
    fn test_missing_key() {
        let mut store = ValueStore::new();
        let frame = store.create_frame(FrameKind::Static, None);
        let key = StorageKey::mint();

        assert_eq!(store.read(frame, key), None);
        assert_eq!(store.write(frame, key, Value::Null), Err(WriteRejected::Missing));
    }

    #[test]
    fn test_chain_membership() {
        let mut store = ValueStore::new();
        let base = store.create_frame(FrameKind::Template, None);
        let derived = store.create_frame(FrameKind::Template, Some(base));
        let unrelated = store.create_frame(FrameKind::Template, None);
        let instance = store.create_frame(FrameKind::Instance, Some(derived));

        assert!(store.is_chained_to(instance, base));
        assert!(store.is_chained_to(instance, derived));
        assert!(!store.is_chained_to(instance, unrelated));
        assert_eq!(store.len(), 4);
    }
}
