//! Resolved field and message descriptors
//!
//! This is the read-only data the gateway consumes from the descriptor model:
//! enough type structure to locate a (possibly nested) request field by path
//! and to know how to convert raw parameter text into it. Descriptors are
//! built once, at registration time, and shared across requests.

use std::fmt;
use std::sync::Arc;

use super::DescriptorError;

/// Type of a message field, driving parameter conversion
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit unsigned integer
    Uint64,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Boolean
    Bool,
    /// UTF-8 string
    String,
    /// Byte blob, base64 on the JSON wire
    Bytes,
    /// Enumeration, convertible by symbolic name or number
    Enum(Arc<EnumDescriptor>),
    /// Nested message
    Message(Arc<MessageDescriptor>),
}

impl FieldKind {
    /// Whether values of this kind can be produced from a single text parameter
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldKind::Message(_))
    }
}

/// A resolved enumeration type
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    /// Fully qualified enum name
    pub name: String,

    /// Symbolic name to wire number, in declaration order
    pub values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    /// Create an enum descriptor from (name, number) pairs
    pub fn new(name: impl Into<String>, values: Vec<(&str, i32)>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|(n, v)| (n.to_string(), v))
                .collect(),
        })
    }

    /// Look up a value by symbolic name
    pub fn by_name(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Check whether a wire number belongs to this enum
    pub fn has_number(&self, number: i32) -> bool {
        self.values.iter().any(|(_, v)| *v == number)
    }
}

/// A single field of a message type
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name as it appears on the JSON wire
    pub name: String,

    /// Field type
    pub kind: FieldKind,

    /// Whether the field holds a list of values
    pub repeated: bool,
}

impl FieldDescriptor {
    /// Create a singular field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            repeated: false,
        }
    }

    /// Create a repeated field
    pub fn repeated(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            repeated: true,
        }
    }
}

/// A resolved message type: the request or response shape of a method
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    /// Fully qualified message name
    pub name: String,

    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// Create a message descriptor
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fields,
        })
    }

    /// Look up a direct field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolve a field path to its leaf descriptor
    ///
    /// Intermediate components must name singular message fields; the leaf
    /// may be any kind. Fails on unknown names and on selecting through a
    /// non-message or repeated intermediate.
    pub fn resolve(&self, path: &FieldPath) -> Result<&FieldDescriptor, DescriptorError> {
        let mut message = self;
        let (leaf, parents) = path
            .components()
            .split_last()
            .expect("field path is never empty");

        for component in parents {
            let field = message
                .field(component)
                .ok_or_else(|| DescriptorError::UnknownField {
                    message: message.name.clone(),
                    path: path.clone(),
                })?;
            match (&field.kind, field.repeated) {
                (FieldKind::Message(inner), false) => message = inner,
                _ => {
                    return Err(DescriptorError::NotAMessage {
                        message: message.name.clone(),
                        path: path.clone(),
                    })
                }
            }
        }

        message
            .field(leaf)
            .ok_or_else(|| DescriptorError::UnknownField {
                message: message.name.clone(),
                path: path.clone(),
            })
    }
}

/// Ordered sequence of field selectors locating a (possibly nested) field
///
/// Parsed from and displayed as the dotted form, e.g. `shelf.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dotted field path
    ///
    /// Fails on an empty string or empty components (`a..b`).
    pub fn parse(raw: &str) -> Result<Self, DescriptorError> {
        if raw.is_empty() || raw.split('.').any(str::is_empty) {
            return Err(DescriptorError::EmptyPath(raw.to_string()));
        }
        Ok(Self(raw.split('.').map(str::to_string).collect()))
    }

    /// The individual field names, outermost first
    pub fn components(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
