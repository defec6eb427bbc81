//! Member access mediation
//!
//! Every read, write and delete of a member, every method invocation and
//! every construction goes through the runtime. Reading the private sigil
//! (`#` by default) of an object or class opens a [`PrivateView`] if the
//! caller's declaring contexts are related to the target's declaration
//! layers. Reads and writes through a view resolve the field name against
//! the caller's contexts and touch the target's storage frame; every other
//! member follows the ordinary own-field / class-chain lookup.
//!
//! Layers considered for a target:
//!
//! - instance: the layer recorded when the instance was staged
//! - class: its static layer, then its instance layer
//!
//! Both decide whether a view may be opened. Names resolve only through
//! layers whose keys live in the target's store: the staged layer for an
//! instance, the static layer for a class. For each such layer, each related
//! caller context is tried in order; the first name that resolves wins.

use crate::error::{VeilError, VeilResult};
use crate::object::{Accessor, FunctionBody, PublicField};
use crate::registry::{LayerId, Side, StorageKey};
use crate::runtime::Runtime;
use crate::scope::Scope;
use crate::stack::{Caller, DeclaringContextSet};
use crate::store::{StoreId, WriteRejected};
use crate::value::{ClassId, FunctionId, ObjectId, PrivateView, Value, ViewTarget};
use tracing::{debug, trace};

/// Result of an ordinary lookup along a class chain
enum Member {
    Accessor(Accessor),
    Method(FunctionId),
    Field(PublicField),
    Absent,
}

impl Runtime {
    // ===== Reads, writes, deletes =====

    pub(crate) fn read(&mut self, caller: &Caller, target: &Value, key: &str) -> VeilResult<Value> {
        if key == self.config.private_sigil {
            return self.open_view(caller, target);
        }

        match target {
            Value::View(view) => self.read_private(caller, *view, key),
            Value::Object(id) => self.read_instance(*id, key),
            Value::Class(id) => self.read_static(*id, key),
            other => Err(VeilError::InvalidTarget(format!(
                "cannot read '{}' of {}",
                key,
                other.type_name()
            ))),
        }
    }

    pub(crate) fn write(
        &mut self,
        caller: &Caller,
        target: &Value,
        key: &str,
        value: Value,
    ) -> VeilResult<()> {
        if key == self.config.private_sigil {
            return Err(VeilError::InvalidTarget(format!(
                "'{}' is reserved for private views",
                key
            )));
        }

        match target {
            Value::View(view) => self.write_private(caller, *view, key, value),
            Value::Object(id) => self.write_instance(*id, key, value),
            Value::Class(id) => self.write_static(*id, key, value),
            other => Err(VeilError::InvalidTarget(format!(
                "cannot write '{}' of {}",
                key,
                other.type_name()
            ))),
        }
    }

    /// Delete a member; `false` means the delete was refused
    ///
    /// Ordinary deletes remove the own field if present and succeed either
    /// way. Deletes through a private view are always refused.
    pub(crate) fn delete_member(&mut self, target: &Value, key: &str) -> VeilResult<bool> {
        match target {
            Value::View(view) => {
                debug!(
                    class = %self.view_class_name(view.target()),
                    field = key,
                    "delete of managed field refused"
                );
                Ok(false)
            }
            Value::Object(id) => {
                self.heap.object_mut(*id)?.fields.remove(key);
                Ok(true)
            }
            Value::Class(id) => {
                self.heap.class_mut(*id)?.static_fields.remove(key);
                Ok(true)
            }
            other => Err(VeilError::InvalidTarget(format!(
                "cannot delete '{}' of {}",
                key,
                other.type_name()
            ))),
        }
    }

    // ===== Private views =====

    /// Open a private view of `target` for `caller`
    pub(crate) fn open_view(&self, caller: &Caller, target: &Value) -> VeilResult<Value> {
        self.authorize_view(caller, target).map(Value::View)
    }

    pub(crate) fn authorize_view(&self, caller: &Caller, target: &Value) -> VeilResult<PrivateView> {
        let view_target = match target {
            Value::Object(id) => ViewTarget::Instance(*id),
            Value::Class(id) => ViewTarget::Static(*id),
            Value::View(view) => view.target(),
            other => {
                return Err(VeilError::InvalidTarget(format!(
                    "{} has no private view",
                    other.type_name()
                )))
            }
        };

        let contexts = self.stack.resolve(caller)?;
        let layers = self.target_layers(view_target)?;
        if !self.can_access(&contexts, &layers) {
            let class = self.view_class_name(view_target);
            debug!(class = %class, contexts = contexts.layers().len(), "private view denied");
            return Err(VeilError::AccessDenied { class });
        }

        Ok(PrivateView::new(view_target))
    }

    /// Check if any caller context is related to any target layer
    pub(crate) fn can_access(&self, contexts: &DeclaringContextSet, layers: &[LayerId]) -> bool {
        contexts.layers().iter().any(|&context| {
            layers
                .iter()
                .any(|&layer| self.declarations.is_related(context, layer))
        })
    }

    /// Resolve a field name to a storage key for the given contexts
    pub(crate) fn resolve_key(
        &self,
        contexts: &DeclaringContextSet,
        layers: &[LayerId],
        name: &str,
    ) -> Option<StorageKey> {
        layers.iter().find_map(|&layer| {
            contexts
                .layers()
                .iter()
                .filter(|&&context| self.declarations.is_related(context, layer))
                .find_map(|&context| self.declarations.resolve(context, layer, name))
        })
    }

    fn target_layers(&self, target: ViewTarget) -> VeilResult<Vec<LayerId>> {
        let layers = match target {
            ViewTarget::Instance(id) => self
                .heap
                .object(id)?
                .staging
                .map(|staging| vec![staging.layer]),
            ViewTarget::Static(id) => self
                .heap
                .class(id)?
                .slots
                .map(|slots| vec![slots.static_layer, slots.instance_layer]),
        };
        Ok(layers.unwrap_or_default())
    }

    /// Layers whose names resolve to slots in the target's store
    fn key_layers(&self, target: ViewTarget) -> VeilResult<Vec<LayerId>> {
        match target {
            ViewTarget::Instance(_) => self.target_layers(target),
            ViewTarget::Static(id) => Ok(self
                .heap
                .class(id)?
                .slots
                .map(|slots| vec![slots.static_layer])
                .unwrap_or_default()),
        }
    }

    fn target_store(&self, target: ViewTarget) -> VeilResult<StoreId> {
        let store = match target {
            ViewTarget::Instance(id) => self.heap.object(id)?.staging.map(|staging| staging.store),
            ViewTarget::Static(id) => self.heap.class(id)?.slots.map(|slots| slots.static_store),
        };
        store.ok_or_else(|| VeilError::UnregisteredConstructor {
            class: self.view_class_name(target),
        })
    }

    fn view_class_name(&self, target: ViewTarget) -> String {
        match target {
            ViewTarget::Instance(id) => match self.heap.object(id) {
                Ok(object) => self.heap.class_name(object.class),
                Err(_) => format!("<object #{}>", id.as_usize()),
            },
            ViewTarget::Static(id) => self.heap.class_name(id),
        }
    }

    fn locate_private(
        &self,
        caller: &Caller,
        view: PrivateView,
        name: &str,
    ) -> VeilResult<(StoreId, StorageKey)> {
        let contexts = self.stack.resolve(caller)?;
        let target = view.target();
        let layers = self.key_layers(target)?;

        let Some(key) = self.resolve_key(&contexts, &layers, name) else {
            let class = self.view_class_name(target);
            debug!(class = %class, field = name, "private member not visible to caller");
            return Err(VeilError::NoAccess {
                class,
                field: name.to_string(),
            });
        };

        Ok((self.target_store(target)?, key))
    }

    fn read_private(&self, caller: &Caller, view: PrivateView, name: &str) -> VeilResult<Value> {
        let (store, key) = self.locate_private(caller, view, name)?;
        trace!(field = name, store = store.as_usize(), "private read");
        self.stores
            .read(store, key)
            .cloned()
            .ok_or_else(|| VeilError::MissingSlot {
                class: self.view_class_name(view.target()),
                field: name.to_string(),
            })
    }

    fn write_private(
        &mut self,
        caller: &Caller,
        view: PrivateView,
        name: &str,
        value: Value,
    ) -> VeilResult<()> {
        let (store, key) = self.locate_private(caller, view, name)?;
        trace!(field = name, store = store.as_usize(), "private write");
        self.stores.write(store, key, value).map_err(|rejected| {
            let class = self.view_class_name(view.target());
            let field = name.to_string();
            match rejected {
                WriteRejected::Missing => VeilError::MissingSlot { class, field },
                WriteRejected::ReadOnly => VeilError::ImmutableField { class, field },
            }
        })
    }

    // ===== Ordinary members =====

    fn lookup_member(&self, class: ClassId, key: &str, side: Side) -> Member {
        for (_, data) in self.heap.lineage(class) {
            match side {
                Side::Instance => {
                    if let Some(accessor) = data.accessors.get(key) {
                        return Member::Accessor(*accessor);
                    }
                    if let Some(&method) = data.methods.get(key) {
                        return Member::Method(method);
                    }
                    if let Some(field) = data.proto_fields.get(key) {
                        return Member::Field(field.clone());
                    }
                }
                Side::Static => {
                    if let Some(field) = data.static_fields.get(key) {
                        return Member::Field(field.clone());
                    }
                    if let Some(&method) = data.static_methods.get(key) {
                        return Member::Method(method);
                    }
                }
            }
        }
        Member::Absent
    }

    fn read_instance(&mut self, id: ObjectId, key: &str) -> VeilResult<Value> {
        let object = self.heap.object(id)?;
        if let Some(value) = object.fields.get(key) {
            return Ok(value.clone());
        }

        match self.lookup_member(object.class, key, Side::Instance) {
            Member::Accessor(Accessor { get: Some(getter), .. }) => {
                self.invoke(getter, Value::Object(id), &[])
            }
            Member::Method(method) => Ok(Value::Function(method)),
            // declared instance fields are copied onto the instance at construction
            Member::Field(_) | Member::Accessor(_) | Member::Absent => Ok(Value::Undefined),
        }
    }

    fn read_static(&mut self, id: ClassId, key: &str) -> VeilResult<Value> {
        self.heap.class(id)?;
        match self.lookup_member(id, key, Side::Static) {
            Member::Field(field) => Ok(field.value),
            Member::Method(method) => Ok(Value::Function(method)),
            Member::Accessor(_) | Member::Absent => Ok(Value::Undefined),
        }
    }

    fn write_instance(&mut self, id: ObjectId, key: &str, value: Value) -> VeilResult<()> {
        let object = self.heap.object(id)?;
        let class = object.class;
        let own = object.fields.contains_key(key);
        match self.lookup_member(class, key, Side::Instance) {
            Member::Accessor(Accessor { set: Some(setter), .. }) if !own => {
                return self.invoke(setter, Value::Object(id), &[value]).map(|_| ());
            }
            Member::Accessor(_) if !own => {
                return Err(VeilError::ImmutableField {
                    class: self.heap.class_name(class),
                    field: key.to_string(),
                });
            }
            Member::Field(field) if !field.writable => {
                return Err(VeilError::ImmutableField {
                    class: self.heap.class_name(class),
                    field: key.to_string(),
                });
            }
            _ => {}
        }

        self.heap.object_mut(id)?.fields.insert(key.to_string(), value);
        Ok(())
    }

    fn write_static(&mut self, id: ClassId, key: &str, value: Value) -> VeilResult<()> {
        if let Member::Field(field) = self.lookup_member(id, key, Side::Static) {
            if !field.writable {
                return Err(VeilError::ImmutableField {
                    class: self.heap.class_name(id),
                    field: key.to_string(),
                });
            }
        }

        self.heap
            .class_mut(id)?
            .static_fields
            .insert(key.to_string(), PublicField { value, writable: true });
        Ok(())
    }

    /// Method `name` of the parent of `owner`, on the side `this` lives on
    pub(crate) fn super_method(&self, owner: ClassId, this: &Value, name: &str) -> VeilResult<FunctionId> {
        let parent = self
            .heap
            .class(owner)?
            .parent
            .ok_or_else(|| VeilError::NoSuperclass {
                class: self.heap.class_name(owner),
            })?;
        let side = match this {
            Value::Class(_) => Side::Static,
            _ => Side::Instance,
        };

        match self.lookup_member(parent, name, side) {
            Member::Method(method) => Ok(method),
            _ => Err(VeilError::NotCallable(format!(
                "super.{} of {} is not a method",
                name,
                self.heap.class_name(owner)
            ))),
        }
    }

    // ===== Calls =====

    pub(crate) fn call_value(&mut self, function: &Value, this: Value, args: &[Value]) -> VeilResult<Value> {
        match function {
            Value::Function(id) => self.invoke(*id, this, args),
            other => Err(VeilError::NotCallable(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn call_member(
        &mut self,
        caller: &Caller,
        target: &Value,
        name: &str,
        args: &[Value],
    ) -> VeilResult<Value> {
        match self.read(caller, target, name)? {
            Value::Function(id) => self.invoke(id, target.clone(), args),
            other => Err(VeilError::NotCallable(format!(
                "'{}' is {}, not a function",
                name,
                other.type_name()
            ))),
        }
    }

    /// Run a managed function in its own frame
    ///
    /// A view passed as `this` is replaced by the object it is bound to.
    pub(crate) fn invoke(&mut self, function: FunctionId, this: Value, args: &[Value]) -> VeilResult<Value> {
        let data = self.heap.function(function)?;
        let body = match &data.body {
            FunctionBody::Method(body) => body.clone(),
            FunctionBody::Constructor(_) => {
                return Err(VeilError::NotCallable(format!(
                    "class constructor {} cannot be invoked without construct",
                    data.name
                )))
            }
        };
        let owner = data.owner;
        let contexts = data.contexts.clone();
        let this = match this {
            Value::View(view) => view.bound_value(),
            other => other,
        };

        trace!(function = %data.name, depth = self.stack.depth(), "invoke");
        let caller = self.stack.push(function, contexts)?;
        let mut scope = Scope::new(self, this, caller, owner, None);
        let result = body(&mut scope, args);
        let caller = scope.into_caller();
        self.stack.pop(caller)?;
        result
    }

    // ===== Construction =====

    pub(crate) fn construct_value(&mut self, class: &Value, args: &[Value]) -> VeilResult<Value> {
        let Value::Class(class) = class else {
            return Err(VeilError::NotCallable(format!(
                "{} is not a constructor",
                class.type_name()
            )));
        };
        let class = *class;
        if !self.heap.class(class)?.is_managed() {
            return Err(VeilError::UnregisteredConstructor {
                class: self.heap.class_name(class),
            });
        }

        let object = self.heap.alloc_object(class);
        let declared = self.declared_instance_fields(class);
        self.heap.object_mut(object)?.fields.extend(declared);
        trace!(class = %self.heap.class_name(class), object = object.as_usize(), "construct");
        self.stage_instance(object, class)?;
        self.run_constructor(class, object, class, args)?;
        Ok(Value::Object(object))
    }

    /// Public instance fields declared along the class chain, base first so
    /// subclasses override
    fn declared_instance_fields(&self, class: ClassId) -> Vec<(String, Value)> {
        let lineage: Vec<_> = self.heap.lineage(class).collect();
        lineage
            .into_iter()
            .rev()
            .flat_map(|(_, data)| {
                data.proto_fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.value.clone()))
            })
            .collect()
    }

    /// Run the constructor of `class` against an already allocated instance
    ///
    /// Classes without a constructor body defer to their parent. Raw
    /// ancestors of a wrapped class run without staging checks.
    pub(crate) fn run_constructor(
        &mut self,
        class: ClassId,
        object: ObjectId,
        new_target: ClassId,
        args: &[Value],
    ) -> VeilResult<()> {
        let (constructor, parent, managed) = {
            let data = self.heap.class(class)?;
            (data.constructor, data.parent, data.is_managed())
        };
        if managed {
            self.stage_instance(object, class)?;
        }
        let Some(function) = constructor else {
            return match parent {
                Some(parent) => self.run_constructor(parent, object, new_target, args),
                None => Ok(()),
            };
        };

        let data = self.heap.function(function)?;
        let FunctionBody::Constructor(body) = &data.body else {
            return Err(VeilError::NotCallable(format!("{} is not a constructor", data.name)));
        };
        let body = body.clone();
        let contexts = data.contexts.clone();

        let caller = self.stack.push(function, contexts)?;
        let mut scope = Scope::new(self, Value::Object(object), caller, Some(class), Some(new_target));
        let result = body(&mut scope, args);
        let caller = scope.into_caller();
        self.stack.pop(caller)?;
        result
    }
}
