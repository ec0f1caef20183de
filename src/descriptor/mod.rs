//! Binding descriptors consumed from the descriptor model
//!
//! The gateway does not parse service definitions itself; it consumes the
//! resolved representation — message shapes, field paths, per-method HTTP
//! bindings and streaming cardinality — as read-only data.

pub mod field;
pub mod method;

pub use field::{EnumDescriptor, FieldDescriptor, FieldKind, FieldPath, MessageDescriptor};
pub use method::{BodyBinding, MethodBinding, ServiceBinding, Streaming, Verb};

use thiserror::Error;

/// Errors raised while constructing or resolving binding descriptors
///
/// These occur at registration time, never during request handling.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// A field path names a field the message does not have
    #[error("message {message} has no field at path {path}")]
    UnknownField {
        /// Message the resolution started from
        message: String,
        /// The offending path
        path: FieldPath,
    },

    /// A field path selects through a scalar or repeated field
    #[error("path {path} traverses a non-message field of {message}")]
    NotAMessage {
        /// Message the resolution started from
        message: String,
        /// The offending path
        path: FieldPath,
    },

    /// A field path was empty or had empty components
    #[error("invalid field path: {0:?}")]
    EmptyPath(String),

    /// The same field path is bound from more than one parameter source
    #[error("field path {0} bound from more than one source")]
    OverlappingBinding(FieldPath),

    /// A path parameter must be a singular scalar field
    #[error("path parameter {0} is not a singular scalar field")]
    InvalidPathParam(FieldPath),

    /// A query parameter must be a scalar (possibly repeated) field
    #[error("query parameter {0} is not a scalar field")]
    InvalidQueryParam(FieldPath),

    /// The HTTP verb is outside the supported set
    #[error("unsupported HTTP verb: {0}")]
    UnsupportedVerb(String),
}
