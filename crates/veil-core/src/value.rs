//! Value representation for the mediated object model
//!
//! Objects, classes and functions live in the runtime's arenas; a [`Value`]
//! only carries their handles. Handle equality is identity.

use std::fmt;
use std::rc::Rc;

/// Handle of an object instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    /// Get the raw arena index
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Handle of a class (both its instance and static side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    /// Get the raw arena index
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Handle of a managed function (method, accessor, constructor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub(crate) usize);

impl FunctionId {
    /// Get the raw arena index
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// What a private view is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewTarget {
    /// Private/protected instance members of an object
    Instance(ObjectId),
    /// Private/protected static members of a class
    Static(ClassId),
}

/// Scoped accessor for managed members of one target
///
/// Only the mediation layer creates views, and only for an authorized
/// caller. Holding a view grants nothing by itself: every read or write made
/// through it re-checks the caller performing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrivateView {
    target: ViewTarget,
}

impl PrivateView {
    pub(crate) fn new(target: ViewTarget) -> Self {
        Self { target }
    }

    /// The object or class this view is bound to
    pub fn target(&self) -> ViewTarget {
        self.target
    }

    /// The bound target as an ordinary value
    pub fn bound_value(&self) -> Value {
        match self.target {
            ViewTarget::Instance(id) => Value::Object(id),
            ViewTarget::Static(id) => Value::Class(id),
        }
    }
}

/// Dynamically typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Object instance
    Object(ObjectId),
    /// Class (constructor and static side)
    Class(ClassId),
    /// Managed function
    Function(FunctionId),
    /// Private view
    View(PrivateView),
}

impl Value {
    /// Create a string value
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Check if this value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Extract boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract integer value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Extract string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Extract object handle
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Extract class handle
    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            Value::Class(id) => Some(*id),
            _ => None,
        }
    }

    /// Extract function handle
    pub fn as_function(&self) -> Option<FunctionId> {
        match self {
            Value::Function(id) => Some(*id),
            _ => None,
        }
    }

    /// Extract private view
    pub fn as_view(&self) -> Option<PrivateView> {
        match self {
            Value::View(view) => Some(*view),
            _ => None,
        }
    }

    /// Name of the value's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Class(_) => "class",
            Value::Function(_) => "function",
            Value::View(_) => "private view",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(id) => write!(f, "<object #{}>", id.0),
            Value::Class(id) => write!(f, "<class #{}>", id.0),
            Value::Function(id) => write!(f, "<function #{}>", id.0),
            Value::View(_) => write!(f, "<private view>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}
