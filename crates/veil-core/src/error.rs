//! Runtime error types.

use crate::config::ConfigError;

/// Errors raised while registering classes or mediating member access.
///
/// None of these are recovered internally: each one is either a violation of
/// the encapsulation contract or a registration-order bug, and is returned to
/// the immediate caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum VeilError {
    /// A value that is not a class was used where a class was required
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// A value that cannot be called or wrapped was used as one
    #[error("Not callable: {0}")]
    NotCallable(String),

    /// A raw class was constructed or extended without being registered or wrapped
    #[error("Constructor {class} must be registered or wrapped before use")]
    UnregisteredConstructor {
        /// Class name
        class: String,
    },

    /// The caller may not open a private view of the target
    #[error("Cannot access private data of {class} from this scope")]
    AccessDenied {
        /// Class name of the target
        class: String,
    },

    /// No declaration visible to the caller matches the field name
    #[error("Current method does not have access to private member {field} of {class}")]
    NoAccess {
        /// Class name of the target
        class: String,
        /// Field name
        field: String,
    },

    /// The field resolved to a storage key that the target does not hold
    #[error("Cannot access non-existent private key {field} on {class}")]
    MissingSlot {
        /// Class name of the target
        class: String,
        /// Field name
        field: String,
    },

    /// Write to a `const`/`final` field or to a getter without a setter
    #[error("Cannot assign to read-only field {field} of {class}")]
    ImmutableField {
        /// Class name of the target
        class: String,
        /// Field name
        field: String,
    },

    /// A field key in a class body could not be parsed
    #[error("Invalid field declaration '{spec}': {reason}")]
    InvalidFieldSpec {
        /// The raw key as written in the class body
        spec: String,
        /// What was wrong with it
        reason: String,
    },

    /// Attempt to declare a field on a layer after registration finished
    #[error("Declarations of {class} are locked")]
    LayerLocked {
        /// Class name owning the layer
        class: String,
    },

    /// A caller token that does not belong to the active call frame
    #[error("Caller token does not match the active call frame")]
    StaleCaller,

    /// Construct/invoke nesting exceeded the configured limit
    #[error("Maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),

    /// An instance's storage is not chained to the class constructing it
    #[error("Instance storage is not derived from {class}")]
    StagingMismatch {
        /// Class name whose constructor ran
        class: String,
    },

    /// `super` used from a class without a parent
    #[error("{class} has no superclass")]
    NoSuperclass {
        /// Class name
        class: String,
    },

    /// Dangling object handle
    #[error("Unknown object #{0}")]
    UnknownObject(usize),

    /// Dangling class handle
    #[error("Unknown class #{0}")]
    UnknownClass(usize),

    /// Dangling function handle
    #[error("Unknown function #{0}")]
    UnknownFunction(usize),

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias used throughout the crate
pub type VeilResult<T> = Result<T, VeilError>;
