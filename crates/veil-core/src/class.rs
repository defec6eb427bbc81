//! Class definitions
//!
//! A [`ClassDefinition`] is the class body handed to
//! [`Runtime::register`](crate::Runtime::register): its name, base class,
//! constructor, methods, accessors and a field-definition supplier. The
//! supplier returns a [`FieldSet`] whose keys carry modifiers
//! (`"protected static count"`); it runs exactly once, during registration,
//! and is dropped afterwards.

use crate::error::VeilResult;
use crate::scope::Scope;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Body of a managed method, getter, setter or function-valued field
pub type NativeFn = Rc<dyn Fn(&mut Scope<'_>, &[Value]) -> VeilResult<Value>>;

/// Body of a managed constructor
pub type ConstructorFn = Rc<dyn Fn(&mut Scope<'_>, &[Value]) -> VeilResult<()>>;

/// Field-definition supplier
pub type FieldSupplier = Box<dyn FnOnce() -> FieldSet>;

/// Initial value of a declared field
#[derive(Clone)]
pub enum FieldValue {
    /// Plain value
    Value(Value),
    /// Function, wrapped as a managed function of the declaring class
    Function(NativeFn),
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            FieldValue::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Ordered field declarations returned by a supplier
#[derive(Debug, Default)]
pub struct FieldSet {
    entries: Vec<(String, FieldValue)>,
}

impl FieldSet {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field holding a plain value
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.push((key.to_string(), FieldValue::Value(value.into())));
        self
    }

    /// Declare a field holding a function
    pub fn function<F>(mut self, key: &str, f: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> VeilResult<Value> + 'static,
    {
        self.entries.push((key.to_string(), FieldValue::Function(Rc::new(f))));
        self
    }

    /// Get the number of declarations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, FieldValue)> {
        self.entries
    }
}

/// Class body handed to registration
pub struct ClassDefinition {
    pub(crate) name: String,
    pub(crate) extends: Option<Value>,
    pub(crate) supplier: Option<FieldSupplier>,
    pub(crate) constructor: Option<ConstructorFn>,
    pub(crate) methods: Vec<(String, NativeFn)>,
    pub(crate) static_methods: Vec<(String, NativeFn)>,
    pub(crate) getters: Vec<(String, NativeFn)>,
    pub(crate) setters: Vec<(String, NativeFn)>,
}

impl ClassDefinition {
    /// Start a class body
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extends: None,
            supplier: None,
            constructor: None,
            methods: Vec::new(),
            static_methods: Vec::new(),
            getters: Vec::new(),
            setters: Vec::new(),
        }
    }

    /// Set the base class
    pub fn extends(mut self, base: Value) -> Self {
        self.extends = Some(base);
        self
    }

    /// Set the field-definition supplier
    pub fn fields<F>(mut self, supplier: F) -> Self
    where
        F: FnOnce() -> FieldSet + 'static,
    {
        self.supplier = Some(Box::new(supplier));
        self
    }

    /// Set the constructor body
    ///
    /// Without one, the class forwards its arguments to the parent
    /// constructor.
    pub fn constructor<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> VeilResult<()> + 'static,
    {
        self.constructor = Some(Rc::new(body));
        self
    }

    /// Add an instance method
    pub fn method<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> VeilResult<Value> + 'static,
    {
        self.methods.push((name.to_string(), Rc::new(body)));
        self
    }

    /// Add a static method
    pub fn static_method<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> VeilResult<Value> + 'static,
    {
        self.static_methods.push((name.to_string(), Rc::new(body)));
        self
    }

    /// Add a public getter
    pub fn getter<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> VeilResult<Value> + 'static,
    {
        self.getters.push((name.to_string(), Rc::new(body)));
        self
    }

    /// Add a public setter; it receives the assigned value as its only argument
    pub fn setter<F>(mut self, name: &str, body: F) -> Self
    where
        F: Fn(&mut Scope<'_>, &[Value]) -> VeilResult<Value> + 'static,
    {
        self.setters.push((name.to_string(), Rc::new(body)));
        self
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("extends", &self.extends)
            .field("has_fields", &self.supplier.is_some())
            .field("has_constructor", &self.constructor.is_some())
            .field("methods", &self.methods.len())
            .field("static_methods", &self.static_methods.len())
            .finish()
    }
}
