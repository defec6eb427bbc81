//! Veil: run-time private and protected members
//!
//! This crate provides a small dynamic class model whose member access is
//! mediated at run time:
//! - Field keys with visibility modifiers (`private`, `protected`, `static`, `const`)
//! - Per-class declaration layers resolving field names to storage keys
//! - Copy-on-write instance storage chained to class templates
//! - Caller capability tokens naming the active call frame
//! - Private views, opened with the `#` sigil from related classes only

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod class;
pub mod config;
pub mod error;
pub mod modifiers;
pub mod registry;
pub mod runtime;
pub mod scope;
pub mod stack;
pub mod store;
pub mod value;

mod mediation;
mod object;
mod register;
mod staging;

pub use class::{ClassDefinition, ConstructorFn, FieldSet, FieldValue, NativeFn};
pub use config::{ConfigError, RuntimeConfig};
pub use error::{VeilError, VeilResult};
pub use modifiers::{FieldSpec, Visibility};
pub use registry::{DeclarationLayer, DeclarationRegistry, LayerId, Side, StorageKey};
pub use runtime::Runtime;
pub use scope::Scope;
pub use stack::{CallFrame, CallStack, Caller, DeclaringContextSet};
pub use store::{FrameKind, Slot, StoreId, ValueStore, WriteRejected};
pub use value::{ClassId, FunctionId, ObjectId, PrivateView, Value, ViewTarget};
