//! Object model and class system
//!
//! Objects, classes and functions are stored in a single [`Heap`] arena and
//! referenced by handle. Nothing is ever freed; handles stay valid for the
//! lifetime of the runtime.

use crate::class::{ConstructorFn, NativeFn};
use crate::error::{VeilError, VeilResult};
use crate::registry::LayerId;
use crate::stack::DeclaringContextSet;
use crate::store::StoreId;
use crate::value::{ClassId, FunctionId, ObjectId, Value};
use rustc_hash::FxHashMap;
use std::fmt;

/// Managed storage of a class
///
/// Present on registered classes and on raw classes once wrapped for
/// inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClassSlots {
    pub instance_layer: LayerId,
    pub static_layer: LayerId,
    pub instance_template: StoreId,
    pub static_store: StoreId,
}

/// Staging record of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Staging {
    /// The instance's own storage frame
    pub store: StoreId,
    /// Declaration layer of the most-derived class constructed
    pub layer: LayerId,
}

/// Ordinary (public) field
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PublicField {
    pub value: Value,
    pub writable: bool,
}

/// Getter/setter pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Accessor {
    pub get: Option<FunctionId>,
    pub set: Option<FunctionId>,
}

/// Object instance
#[derive(Debug)]
pub(crate) struct ObjectData {
    pub class: ClassId,
    pub fields: FxHashMap<String, Value>,
    pub staging: Option<Staging>,
}

/// Class metadata
#[derive(Debug)]
pub(crate) struct ClassData {
    pub name: String,
    pub parent: Option<ClassId>,
    pub constructor: Option<FunctionId>,
    pub methods: FxHashMap<String, FunctionId>,
    pub static_methods: FxHashMap<String, FunctionId>,
    pub accessors: FxHashMap<String, Accessor>,
    pub proto_fields: FxHashMap<String, PublicField>,
    pub static_fields: FxHashMap<String, PublicField>,
    pub slots: Option<ClassSlots>,
}

impl ClassData {
    pub fn new(name: &str, parent: Option<ClassId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            constructor: None,
            methods: FxHashMap::default(),
            static_methods: FxHashMap::default(),
            accessors: FxHashMap::default(),
            proto_fields: FxHashMap::default(),
            static_fields: FxHashMap::default(),
            slots: None,
        }
    }

    /// Registered, or wrapped for inheritance
    pub fn is_managed(&self) -> bool {
        self.slots.is_some()
    }
}

/// Callable body of a managed function
#[derive(Clone)]
pub(crate) enum FunctionBody {
    Method(NativeFn),
    Constructor(ConstructorFn),
}

/// Managed function
#[derive(Clone)]
pub(crate) struct FunctionData {
    pub name: String,
    pub owner: Option<ClassId>,
    pub contexts: DeclaringContextSet,
    pub body: FunctionBody,
}

impl fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            FunctionBody::Method(_) => "method",
            FunctionBody::Constructor(_) => "constructor",
        };
        f.debug_struct("FunctionData")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("contexts", &self.contexts)
            .field("kind", &kind)
            .finish()
    }
}

/// Arena of objects, classes and functions
#[derive(Debug, Default)]
pub(crate) struct Heap {
    objects: Vec<ObjectData>,
    classes: Vec<ClassData>,
    functions: Vec<FunctionData>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_object(&mut self, class: ClassId) -> ObjectId {
        let id = ObjectId(self.objects.len());
        self.objects.push(ObjectData {
            class,
            fields: FxHashMap::default(),
            staging: None,
        });
        id
    }

    pub fn object(&self, id: ObjectId) -> VeilResult<&ObjectData> {
        self.objects.get(id.0).ok_or(VeilError::UnknownObject(id.0))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> VeilResult<&mut ObjectData> {
        self.objects.get_mut(id.0).ok_or(VeilError::UnknownObject(id.0))
    }

    pub fn push_class(&mut self, class: ClassData) -> ClassId {
        let id = ClassId(self.classes.len());
        self.classes.push(class);
        id
    }

    pub fn class(&self, id: ClassId) -> VeilResult<&ClassData> {
        self.classes.get(id.0).ok_or(VeilError::UnknownClass(id.0))
    }

    pub fn class_mut(&mut self, id: ClassId) -> VeilResult<&mut ClassData> {
        self.classes.get_mut(id.0).ok_or(VeilError::UnknownClass(id.0))
    }

    pub fn push_function(&mut self, function: FunctionData) -> FunctionId {
        let id = FunctionId(self.functions.len());
        self.functions.push(function);
        id
    }

    pub fn function(&self, id: FunctionId) -> VeilResult<&FunctionData> {
        self.functions.get(id.0).ok_or(VeilError::UnknownFunction(id.0))
    }

    /// Class name for diagnostics, tolerant of dangling handles
    pub fn class_name(&self, id: ClassId) -> String {
        self.classes
            .get(id.0)
            .map(|class| class.name.clone())
            .unwrap_or_else(|| format!("<class #{}>", id.0))
    }

    /// Walk a class and its ancestors, most-derived first
    pub fn lineage(&self, start: ClassId) -> Lineage<'_> {
        Lineage {
            heap: self,
            next: Some(start),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

/// Iterator over a class chain
pub(crate) struct Lineage<'h> {
    heap: &'h Heap,
    next: Option<ClassId>,
}

impl<'h> Iterator for Lineage<'h> {
    type Item = (ClassId, &'h ClassData);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let class = self.heap.classes.get(id.0)?;
        self.next = class.parent;
        Some((id, class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_creation() {
        let mut heap = Heap::new();
        let class = heap.push_class(ClassData::new("Point", None));
        let obj = heap.alloc_object(class);

        let data = heap.object(obj).unwrap();
        assert_eq!(data.class, class);
        assert!(data.fields.is_empty());
        assert!(data.staging.is_none());
        assert_eq!(heap.object_count(), 1);
    }

    #[test]
    fn test_dangling_handles() {
        let heap = Heap::new();
        assert!(matches!(heap.object(ObjectId(4)), Err(VeilError::UnknownObject(4))));
        assert!(matches!(heap.class(ClassId(2)), Err(VeilError::UnknownClass(2))));
        assert!(matches!(heap.function(FunctionId(9)), Err(VeilError::UnknownFunction(9))));
        assert_eq!(heap.class_name(ClassId(2)), "<class #2>");
    }

    #[test]
    fn test_lineage() {
        let mut heap = Heap::new();
        let base = heap.push_class(ClassData::new("Base", None));
        let derived = heap.push_class(ClassData::new("Derived", Some(base)));
        let leaf = heap.push_class(ClassData::new("Leaf", Some(derived)));

        let names: Vec<&str> = heap.lineage(leaf).map(|(_, c)| c.name.as_str()).collect();
        assert_eq!(names, ["Leaf", "Derived", "Base"]);
        assert_eq!(heap.class_count(), 3);
    }

    #[test]
    fn test_unmanaged_until_slots_assigned() {
        let class = ClassData::new("Raw", None);
        assert!(!class.is_managed());
    }
}
