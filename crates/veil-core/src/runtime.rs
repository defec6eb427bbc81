//! Runtime: arenas, call stack and the public entry points
//!
//! A [`Runtime`] owns every class, object and function it creates, the
//! declaration registry, the value stores and the call stack used to resolve
//! callers. It is single-threaded; each thread that needs mediated objects
//! creates its own runtime.
//!
//! The methods here act as code outside any managed class: they can do
//! everything ordinary callers can (construct, read and write public members,
//! call methods) but are refused every private view. Managed code reaches
//! private members through the [`Scope`](crate::Scope) it receives.

use crate::config::RuntimeConfig;
use crate::error::{VeilError, VeilResult};
use crate::object::Heap;
use crate::registry::DeclarationRegistry;
use crate::stack::{CallStack, Caller};
use crate::store::ValueStore;
use crate::value::Value;

/// Mediating runtime for managed classes
#[derive(Debug)]
pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) heap: Heap,
    pub(crate) declarations: DeclarationRegistry,
    pub(crate) stores: ValueStore,
    pub(crate) stack: CallStack,
}

impl Runtime {
    /// Create a runtime with default configuration
    pub fn new() -> Self {
        Self::from_valid_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `VeilError::Config` if the configuration is invalid.
    pub fn with_config(config: RuntimeConfig) -> VeilResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RuntimeConfig) -> Self {
        let stack = CallStack::new(config.max_call_depth);
        Self {
            config,
            heap: Heap::new(),
            declarations: DeclarationRegistry::new(),
            stores: ValueStore::new(),
            stack,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Construct an instance of a managed class
    pub fn construct(&mut self, class: &Value, args: &[Value]) -> VeilResult<Value> {
        self.construct_value(class, args)
    }

    /// Read a member
    pub fn get(&mut self, target: &Value, key: &str) -> VeilResult<Value> {
        self.read(&Caller::outside(), target, key)
    }

    /// Write a member
    pub fn set(&mut self, target: &Value, key: &str, value: Value) -> VeilResult<()> {
        self.write(&Caller::outside(), target, key, value)
    }

    /// Delete a member; returns `false` only when the delete is refused
    pub fn delete(&mut self, target: &Value, key: &str) -> VeilResult<bool> {
        self.delete_member(target, key)
    }

    /// Call a function value with an explicit `this`
    pub fn call(&mut self, function: &Value, this: &Value, args: &[Value]) -> VeilResult<Value> {
        self.call_value(function, this.clone(), args)
    }

    /// Call a method by name
    pub fn call_method(&mut self, target: &Value, name: &str, args: &[Value]) -> VeilResult<Value> {
        self.call_member(&Caller::outside(), target, name, args)
    }

    /// Wrap a raw class so managed classes can extend it
    ///
    /// Called from outside any managed class, an accessor context can never
    /// be authorized; use [`Scope::wrap`](crate::Scope::wrap) for that.
    pub fn wrap(&mut self, base: &Value, accessor: Option<&Value>) -> VeilResult<Value> {
        self.wrap_base(&Caller::outside(), base, accessor)
    }

    /// Class of an object (or of the object a view is bound to)
    pub fn class_of(&self, value: &Value) -> VeilResult<Value> {
        match value {
            Value::Object(id) => Ok(Value::Class(self.heap.object(*id)?.class)),
            Value::View(view) => self.class_of(&view.bound_value()),
            other => Err(VeilError::InvalidTarget(format!(
                "{} has no class",
                other.type_name()
            ))),
        }
    }

    /// Name of a class value
    pub fn class_name(&self, class: &Value) -> Option<&str> {
        let id = class.as_class()?;
        self.heap.class(id).ok().map(|c| c.name.as_str())
    }

    /// Parent class of a class value
    pub fn superclass(&self, class: &Value) -> Option<Value> {
        let id = class.as_class()?;
        self.heap.class(id).ok()?.parent.map(Value::Class)
    }

    /// Check if a class value is registered or wrapped
    pub fn is_managed(&self, class: &Value) -> bool {
        class
            .as_class()
            .and_then(|id| self.heap.class(id).ok())
            .map(|c| c.is_managed())
            .unwrap_or(false)
    }

    /// Check if `value` is an instance of `class` or of one of its descendants
    pub fn is_instance_of(&self, value: &Value, class: &Value) -> bool {
        let (Some(object), Some(class)) = (value.as_object(), class.as_class()) else {
            return false;
        };
        match self.heap.object(object) {
            Ok(data) => self.heap.lineage(data.class).any(|(id, _)| id == class),
            Err(_) => false,
        }
    }

    /// Declaration registry, for introspection
    pub fn declarations(&self) -> &DeclarationRegistry {
        &self.declarations
    }

    /// Number of active managed frames
    pub fn call_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Number of objects created
    pub fn object_count(&self) -> usize {
        self.heap.object_count()
    }

    /// Number of classes defined or registered
    pub fn class_count(&self) -> usize {
        self.heap.class_count()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
