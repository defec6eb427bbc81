//! Execution scope of managed code
//!
//! A [`Scope`] is what a constructor, method, getter or setter body receives.
//! It carries `this`, the caller token of the running frame and the declaring
//! class, and routes every operation through the runtime with that caller.

use crate::error::{VeilError, VeilResult};
use crate::runtime::Runtime;
use crate::stack::Caller;
use crate::value::{ClassId, Value};

/// Handle on the runtime for the duration of one managed call
pub struct Scope<'rt> {
    rt: &'rt mut Runtime,
    this: Value,
    caller: Caller,
    owner: Option<ClassId>,
    new_target: Option<ClassId>,
}

impl<'rt> Scope<'rt> {
    pub(crate) fn new(
        rt: &'rt mut Runtime,
        this: Value,
        caller: Caller,
        owner: Option<ClassId>,
        new_target: Option<ClassId>,
    ) -> Self {
        Self {
            rt,
            this,
            caller,
            owner,
            new_target,
        }
    }

    pub(crate) fn into_caller(self) -> Caller {
        self.caller
    }

    /// The receiver: an object for instance members, a class for static ones
    pub fn this(&self) -> Value {
        self.this.clone()
    }

    /// Class whose body declared the running function
    pub fn owner(&self) -> Option<Value> {
        self.owner.map(Value::Class)
    }

    /// Class named in the `construct` call, inside a constructor
    pub fn new_target(&self) -> Option<Value> {
        self.new_target.map(Value::Class)
    }

    /// Open the private view of `target`
    ///
    /// # Errors
    ///
    /// Returns `VeilError::AccessDenied` if the running function's class is
    /// unrelated to the target's class.
    pub fn private(&mut self, target: &Value) -> VeilResult<Value> {
        self.rt.open_view(&self.caller, target)
    }

    /// Open the private view of `this`
    pub fn private_this(&mut self) -> VeilResult<Value> {
        let this = self.this.clone();
        self.private(&this)
    }

    /// Read a member; `key` may be the private sigil
    pub fn get(&mut self, target: &Value, key: &str) -> VeilResult<Value> {
        self.rt.read(&self.caller, target, key)
    }

    /// Write a member
    pub fn set(&mut self, target: &Value, key: &str, value: Value) -> VeilResult<()> {
        self.rt.write(&self.caller, target, key, value)
    }

    /// Delete a member; deletes through a private view are refused
    pub fn delete(&mut self, target: &Value, key: &str) -> VeilResult<bool> {
        self.rt.delete_member(target, key)
    }

    /// Call a function value with an explicit `this`
    pub fn call(&mut self, function: &Value, this: &Value, args: &[Value]) -> VeilResult<Value> {
        self.rt.call_value(function, this.clone(), args)
    }

    /// Call a method by name
    ///
    /// On a private view this calls a function-valued managed field, with
    /// `this` bound to the view's object or class.
    pub fn call_method(&mut self, target: &Value, name: &str, args: &[Value]) -> VeilResult<Value> {
        self.rt.call_member(&self.caller, target, name, args)
    }

    /// Call the parent class's version of a method on `this`
    pub fn call_super(&mut self, name: &str, args: &[Value]) -> VeilResult<Value> {
        let owner = self.owner.ok_or_else(|| {
            VeilError::NotCallable(format!("super.{} outside a class body", name))
        })?;
        let function = self.rt.super_method(owner, &self.this, name)?;
        self.rt.invoke(function, self.this.clone(), args)
    }

    /// Check if the declaring class has a parent
    pub fn has_superclass(&self) -> VeilResult<bool> {
        match self.owner {
            Some(owner) => Ok(self.rt.heap.class(owner)?.parent.is_some()),
            None => Ok(false),
        }
    }

    /// Run the parent constructor against `this`
    ///
    /// # Errors
    ///
    /// Returns `VeilError::NoSuperclass` if the declaring class has no parent.
    pub fn super_construct(&mut self, args: &[Value]) -> VeilResult<()> {
        let (Some(owner), Some(new_target), Some(object)) =
            (self.owner, self.new_target, self.this.as_object())
        else {
            return Err(VeilError::NotCallable(
                "super constructor called outside a constructor".to_string(),
            ));
        };

        let parent = self
            .rt
            .heap
            .class(owner)?
            .parent
            .ok_or_else(|| VeilError::NoSuperclass {
                class: self.rt.heap.class_name(owner),
            })?;
        self.rt.run_constructor(parent, object, new_target, args)
    }

    /// Construct an instance of a managed class
    pub fn construct(&mut self, class: &Value, args: &[Value]) -> VeilResult<Value> {
        self.rt.construct_value(class, args)
    }

    /// Class of an object
    pub fn class_of(&self, value: &Value) -> VeilResult<Value> {
        self.rt.class_of(value)
    }

    /// Wrap a raw class for inheritance, optionally sharing the declarations
    /// of an accessor context this scope may open
    pub fn wrap(&mut self, base: &Value, accessor: Option<&Value>) -> VeilResult<Value> {
        self.rt.wrap_base(&self.caller, base, accessor)
    }

    /// Read-only access to the runtime
    pub fn runtime(&self) -> &Runtime {
        &*self.rt
    }
}
