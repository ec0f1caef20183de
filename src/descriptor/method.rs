//! Per-method binding descriptors
//!
//! A [`MethodBinding`] records how one RPC method is exposed over HTTP: the
//! verb, which request fields come from the matched path, which from query
//! values, which (if any) from the payload, and the method's streaming
//! cardinality. Bindings are validated once at construction and never change
//! during request handling.

use std::collections::HashSet;
use std::sync::Arc;

use super::{DescriptorError, FieldPath, MessageDescriptor};

/// HTTP verbs a method can bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP PATCH
    Patch,
    /// HTTP DELETE
    Delete,
}

impl Verb {
    /// The wire form of the verb
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// Parse a verb, rejecting anything outside the supported set
    pub fn parse(raw: &str) -> Result<Self, DescriptorError> {
        match raw {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            other => Err(DescriptorError::UnsupportedVerb(other.to_string())),
        }
    }
}

/// Streaming cardinality of a method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Streaming {
    /// One request, one response
    Unary,
    /// A sequence of requests, one terminal response
    ClientStream,
    /// One request, a sequence of responses
    ServerStream,
    /// Sequences on both sides
    BidiStream,
}

impl Streaming {
    /// Whether the client side sends a sequence of request units
    pub fn client_streaming(&self) -> bool {
        matches!(self, Streaming::ClientStream | Streaming::BidiStream)
    }

    /// Whether the server side produces a sequence of response units
    pub fn server_streaming(&self) -> bool {
        matches!(self, Streaming::ServerStream | Streaming::BidiStream)
    }
}

/// How the request payload binds into the request message
#[derive(Debug, Clone)]
pub enum BodyBinding {
    /// No payload is read; GET-like methods
    None,
    /// The decoded payload is assigned to one designated field
    Field(FieldPath),
    /// The decoded payload replaces the whole request message
    Whole,
}

/// Resolved binding of one RPC method onto an HTTP route
#[derive(Debug, Clone)]
pub struct MethodBinding {
    /// Method name within its service
    pub name: String,

    /// Full RPC route, e.g. `/library.LibraryService/GetBook`
    pub rpc_path: String,

    /// Bound HTTP verb
    pub verb: Verb,

    /// Field paths filled from matched path segments, in pattern order
    pub path_params: Vec<FieldPath>,

    /// Field paths filled from URL query values
    pub query_params: Vec<FieldPath>,

    /// Payload binding
    pub body: BodyBinding,

    /// Streaming cardinality
    pub streaming: Streaming,

    /// Request message shape
    pub request: Arc<MessageDescriptor>,

    /// Response message shape
    pub response: Arc<MessageDescriptor>,
}

impl MethodBinding {
    /// Create and validate a method binding
    ///
    /// Validation enforces the invariants the request path relies on:
    /// every bound field path resolves against the request descriptor, path
    /// parameters are singular scalars, and a field path appears in at most
    /// one of path/query/body.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        service: &str,
        name: impl Into<String>,
        verb: Verb,
        path_params: Vec<FieldPath>,
        query_params: Vec<FieldPath>,
        body: BodyBinding,
        streaming: Streaming,
        request: Arc<MessageDescriptor>,
        response: Arc<MessageDescriptor>,
    ) -> Result<Self, DescriptorError> {
        let name = name.into();
        let binding = Self {
            rpc_path: format!("/{}/{}", service, name),
            name,
            verb,
            path_params,
            query_params,
            body,
            streaming,
            request,
            response,
        };
        binding.validate()?;
        Ok(binding)
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        let mut seen: HashSet<&FieldPath> = HashSet::new();
        let body_path = match &self.body {
            BodyBinding::Field(path) => Some(path),
            _ => None,
        };

        for path in self
            .path_params
            .iter()
            .chain(self.query_params.iter())
            .chain(body_path)
        {
            if !seen.insert(path) {
                return Err(DescriptorError::OverlappingBinding(path.clone()));
            }
        }

        for path in &self.path_params {
            let field = self.request.resolve(path)?;
            if !field.kind.is_scalar() || field.repeated {
                return Err(DescriptorError::InvalidPathParam(path.clone()));
            }
        }
        for path in &self.query_params {
            let field = self.request.resolve(path)?;
            if !field.kind.is_scalar() {
                return Err(DescriptorError::InvalidQueryParam(path.clone()));
            }
        }
        if let Some(path) = body_path {
            self.request.resolve(path)?;
        }
        Ok(())
    }
}

/// All method bindings of one service, registered as a unit
///
/// Registration dials one connection per service; a dial failure mounts
/// none of its routes.
#[derive(Debug, Clone)]
pub struct ServiceBinding {
    /// Fully qualified service name, e.g. `library.LibraryService`
    pub name: String,

    /// The service's bound methods
    pub methods: Vec<MethodBinding>,
}

impl ServiceBinding {
    /// Group validated method bindings under a service name
    pub fn new(name: impl Into<String>, methods: Vec<MethodBinding>) -> Self {
        Self {
            name: name.into(),
            methods,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldDescriptor, FieldKind};

    fn request() -> Arc<MessageDescriptor> {
        MessageDescriptor::new(
            "library.GetBookRequest",
            vec![
                FieldDescriptor::new("id", FieldKind::Int64),
                FieldDescriptor::new("format", FieldKind::String),
                FieldDescriptor::repeated("tags", FieldKind::String),
            ],
        )
    }

    fn response() -> Arc<MessageDescriptor> {
        MessageDescriptor::new(
            "library.Book",
            vec![FieldDescriptor::new("title", FieldKind::String)],
        )
    }

    fn binding(
        path_params: Vec<FieldPath>,
        query_params: Vec<FieldPath>,
        body: BodyBinding,
    ) -> Result<MethodBinding, DescriptorError> {
        MethodBinding::new(
            "library.LibraryService",
            "GetBook",
            Verb::Get,
            path_params,
            query_params,
            body,
            Streaming::Unary,
            request(),
            response(),
        )
    }

    #[test]
    fn test_valid_binding() {
        let binding = binding(
            vec![FieldPath::parse("id").unwrap()],
            vec![FieldPath::parse("format").unwrap()],
            BodyBinding::None,
        )
        .unwrap();
        assert_eq!(binding.rpc_path, "/library.LibraryService/GetBook");
        assert_eq!(binding.verb.as_str(), "GET");
    }

    #[test]
    fn test_overlapping_paths_rejected() {
        let result = binding(
            vec![FieldPath::parse("id").unwrap()],
            vec![FieldPath::parse("id").unwrap()],
            BodyBinding::None,
        );
        assert!(matches!(result, Err(DescriptorError::OverlappingBinding(_))));
    }

    #[test]
    fn test_body_field_overlap_rejected() {
        let result = binding(
            vec![FieldPath::parse("id").unwrap()],
            vec![],
            BodyBinding::Field(FieldPath::parse("id").unwrap()),
        );
        assert!(matches!(result, Err(DescriptorError::OverlappingBinding(_))));
    }

    #[test]
    fn test_repeated_path_param_rejected() {
        let result = binding(vec![FieldPath::parse("tags").unwrap()], vec![], BodyBinding::None);
        assert!(matches!(result, Err(DescriptorError::InvalidPathParam(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = binding(vec![FieldPath::parse("nope").unwrap()], vec![], BodyBinding::None);
        assert!(matches!(result, Err(DescriptorError::UnknownField { .. })));
    }

    #[test]
    fn test_verb_parse() {
        assert_eq!(Verb::parse("PATCH").unwrap(), Verb::Patch);
        assert!(matches!(
            Verb::parse("TRACE"),
            Err(DescriptorError::UnsupportedVerb(_))
        ));
    }

    #[test]
    fn test_streaming_helpers() {
        assert!(Streaming::BidiStream.client_streaming());
        assert!(Streaming::BidiStream.server_streaming());
        assert!(Streaming::ClientStream.client_streaming());
        assert!(!Streaming::ClientStream.server_streaming());
        assert!(!Streaming::Unary.client_streaming());
    }
}
