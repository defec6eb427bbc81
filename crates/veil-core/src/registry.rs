//! Declaration registry
//!
//! Every managed class owns two declaration layers, one for its instance
//! side and one for its static side. A layer maps field names to opaque
//! storage keys and points at the corresponding layer of the parent class,
//! so each side forms a chain mirroring the class hierarchy. All chains end
//! at the sentinel [`LayerId::ROOT`], which declares nothing and is related
//! to nothing.
//!
//! The shared-field index of a layer holds the keys declared `protected`.
//! When resolving a name from a caller's layer, keys on the caller's own
//! layer are always visible; keys on ancestor layers are visible only when
//! shared.

use crate::error::{VeilError, VeilResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle of one value slot
///
/// Minted once per declared field per declaring class, never reused, and
/// unrelated to the field's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageKey(u64);

impl StorageKey {
    pub(crate) fn mint() -> Self {
        static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
        StorageKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle of a declaration layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(usize);

impl LayerId {
    /// Sentinel root shared by every chain
    pub const ROOT: LayerId = LayerId(0);

    /// Get the raw arena index
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Which side of a class a layer describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Per-instance members
    Instance,
    /// Members of the class itself
    Static,
}

/// One class's name-to-key mappings for one side
#[derive(Debug)]
pub struct DeclarationLayer {
    class_name: String,
    side: Side,
    parent: Option<LayerId>,
    names: FxHashMap<String, StorageKey>,
    shared: FxHashSet<StorageKey>,
    locked: bool,
}

impl DeclarationLayer {
    /// Name of the declaring class
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Side of the class this layer describes
    pub fn side(&self) -> Side {
        self.side
    }

    /// Parent layer (None only for the root sentinel)
    pub fn parent(&self) -> Option<LayerId> {
        self.parent
    }

    /// Number of fields declared directly on this layer
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no field is declared directly on this layer
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check if the layer accepts no further declarations
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Check if a key is in this layer's shared-field index
    pub fn is_shared(&self, key: StorageKey) -> bool {
        self.shared.contains(&key)
    }
}

/// Arena of declaration layers
#[derive(Debug)]
pub struct DeclarationRegistry {
    layers: Vec<DeclarationLayer>,
}

impl DeclarationRegistry {
    /// Create a registry holding only the root sentinel
    pub fn new() -> Self {
        Self {
            layers: vec![DeclarationLayer {
                class_name: "<root>".to_string(),
                side: Side::Instance,
                parent: None,
                names: FxHashMap::default(),
                shared: FxHashSet::default(),
                locked: true,
            }],
        }
    }

    /// Create an empty, unlocked layer chained onto `parent`
    pub fn create_layer(&mut self, class_name: &str, side: Side, parent: LayerId) -> LayerId {
        let id = LayerId(self.layers.len());
        self.layers.push(DeclarationLayer {
            class_name: class_name.to_string(),
            side,
            parent: Some(parent),
            names: FxHashMap::default(),
            shared: FxHashSet::default(),
            locked: false,
        });
        id
    }

    /// Get a layer by ID
    pub fn get(&self, id: LayerId) -> Option<&DeclarationLayer> {
        self.layers.get(id.0)
    }

    /// Declare a field on a layer and mint its storage key
    ///
    /// # Errors
    ///
    /// Returns `VeilError::LayerLocked` once the layer is locked, and
    /// `VeilError::InvalidFieldSpec` if the name is already declared on it.
    pub fn declare(&mut self, id: LayerId, name: &str, shared: bool) -> VeilResult<StorageKey> {
        let layer = self
            .layers
            .get_mut(id.0)
            .ok_or_else(|| VeilError::InvalidTarget(format!("unknown layer #{}", id.0)))?;

        if layer.locked {
            return Err(VeilError::LayerLocked {
                class: layer.class_name.clone(),
            });
        }
        if layer.names.contains_key(name) {
            return Err(VeilError::InvalidFieldSpec {
                spec: name.to_string(),
                reason: format!("declared twice on {}", layer.class_name),
            });
        }

        let key = StorageKey::mint();
        layer.names.insert(name.to_string(), key);
        if shared {
            layer.shared.insert(key);
        }
        Ok(key)
    }

    /// Lock a layer against further declarations
    pub fn lock(&mut self, id: LayerId) {
        if let Some(layer) = self.layers.get_mut(id.0) {
            layer.locked = true;
        }
    }

    /// Check if `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: LayerId, id: LayerId) -> bool {
        let mut current = self.get(id).and_then(|layer| layer.parent);
        while let Some(layer_id) = current {
            if layer_id == ancestor {
                return true;
            }
            current = self.get(layer_id).and_then(|layer| layer.parent);
        }
        false
    }

    /// Check if two layers share a lineage (equal, ancestor or descendant)
    ///
    /// The root sentinel is related to nothing.
    pub fn is_related(&self, a: LayerId, b: LayerId) -> bool {
        if a == LayerId::ROOT || b == LayerId::ROOT {
            return false;
        }
        a == b || self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    /// Resolve `name` as seen from `caller` on a target whose layer is `target`
    ///
    /// Walks from the caller's layer toward the root, considering only layers
    /// the target actually inherits (the target layer and its ancestors). The
    /// first visible declaration wins: any name on the caller's own layer,
    /// only shared names on ancestor layers.
    pub fn resolve(&self, caller: LayerId, target: LayerId, name: &str) -> Option<StorageKey> {
        let mut current = Some(caller);
        while let Some(id) = current {
            if id == LayerId::ROOT {
                break;
            }
            let layer = self.get(id)?;
            let inherited = id == target || self.is_ancestor(id, target);
            if inherited {
                if let Some(&key) = layer.names.get(name) {
                    if id == caller || layer.shared.contains(&key) {
                        return Some(key);
                    }
                }
            }
            current = layer.parent;
        }
        None
    }

    /// Get the number of layers, including the root sentinel
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always false: the root sentinel is present from creation
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Default for DeclarationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
