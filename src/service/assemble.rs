//! Request assembly
//!
//! Builds populated request messages from the three parameter sources a
//! binding can draw on: matched path segments, URL query values, and the
//! request payload. Assembly is pure per call; the only state is the
//! read-only binding.
//!
//! For client-streaming and bidi methods assembly produces a lazy sequence
//! instead: one message per payload unit, with the path/query bindings
//! applied identically to every unit.

use std::fmt::Display;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::codec::json::{JsonCodec, JsonUnitStream};
use crate::codec::{convert, convert_repeated};
use crate::descriptor::{BodyBinding, FieldPath, MethodBinding};
use crate::error::{GatewayError, GatewayResult};
use crate::mux::PathParams;

/// Converted path/query assignments, applied to every assembled message
///
/// Conversion happens once per request, before any dispatch; a malformed
/// parameter therefore fails the request without a call ever being made.
#[derive(Debug, Clone)]
pub struct Overlay(Vec<(FieldPath, Value)>);

impl Overlay {
    /// Convert the request's path and query parameters per the binding
    pub fn build(
        binding: &MethodBinding,
        path_params: &PathParams,
        query: Option<&str>,
    ) -> GatewayResult<Self> {
        let mut assignments = Vec::new();

        // query first; matched path segments are authoritative and win
        let pairs: Vec<(String, String)> = query
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        for path in &binding.query_params {
            let key = path.to_string();
            let values: Vec<&str> = pairs
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .collect();
            // absent keys keep the field at its zero value
            if values.is_empty() {
                continue;
            }
            // the binding was validated at construction; a failure here means
            // it and the request descriptor have drifted apart
            let field = binding
                .request
                .resolve(path)
                .map_err(|err| GatewayError::Binding(err.to_string()))?;
            let value = if field.repeated {
                convert_repeated(&field.kind, &key, values)?
            } else {
                convert(&field.kind, &key, values[0])?
            };
            assignments.push((path.clone(), value));
        }

        for path in &binding.path_params {
            let name = path.to_string();
            let raw = path_params
                .get(&name)
                .ok_or_else(|| GatewayError::Binding(format!("missing parameter {}", name)))?;
            let field = binding
                .request
                .resolve(path)
                .map_err(|err| GatewayError::Binding(err.to_string()))?;
            assignments.push((path.clone(), convert(&field.kind, &name, raw)?));
        }

        Ok(Self(assignments))
    }

    /// Apply the assignments onto a message
    pub fn apply(&self, message: &mut Value) {
        for (path, value) in &self.0 {
            set_field(message, path, value.clone());
        }
    }
}

/// Assemble the single request message of a unary or server-streaming call
pub fn assemble_unary(
    binding: &MethodBinding,
    codec: &JsonCodec,
    path_params: &PathParams,
    query: Option<&str>,
    body: &Bytes,
) -> GatewayResult<Value> {
    let overlay = Overlay::build(binding, path_params, query)?;

    let mut message = match &binding.body {
        BodyBinding::None => Value::Object(Map::new()),
        BodyBinding::Whole => {
            let decoded = codec.decode_message(body)?;
            if !decoded.is_object() {
                return Err(GatewayError::Decode(
                    "request payload must be a JSON object".to_string(),
                ));
            }
            decoded
        }
        BodyBinding::Field(path) => {
            let decoded = codec.decode_message(body)?;
            let mut message = Value::Object(Map::new());
            set_field(&mut message, path, decoded);
            message
        }
    };

    overlay.apply(&mut message);
    Ok(message)
}

/// Assemble the lazy request sequence of a client-streaming or bidi call
///
/// Each payload unit is one whole request message; the overlay is applied to
/// every unit. A malformed unit aborts the sequence with a decode error and
/// the failed unit is never produced.
pub fn assemble_stream<S, E>(
    binding: &MethodBinding,
    path_params: &PathParams,
    query: Option<&str>,
    body: S,
) -> GatewayResult<impl Stream<Item = GatewayResult<Value>> + Send + 'static>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display,
{
    let overlay = Overlay::build(binding, path_params, query)?;

    Ok(JsonUnitStream::new(body).map(move |unit| {
        let mut message = unit?;
        if !message.is_object() {
            return Err(GatewayError::Decode(
                "request unit must be a JSON object".to_string(),
            ));
        }
        overlay.apply(&mut message);
        Ok(message)
    }))
}

/// Assign a value at a (possibly nested) field path, lazily creating
/// intermediate objects along the way
fn set_field(message: &mut Value, path: &FieldPath, value: Value) {
    let mut cursor = message;
    let components = path.components();
    let (leaf, parents) = components.split_last().expect("field path is never empty");

    for component in parents {
        // a non-object intermediate is replaced; the binding guarantees the
        // path traverses message fields
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        cursor = cursor
            .as_object_mut()
            .expect("cursor was just made an object")
            .entry(component.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    cursor
        .as_object_mut()
        .expect("cursor was just made an object")
        .insert(leaf.clone(), value);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::descriptor::{
        FieldDescriptor, FieldKind, MessageDescriptor, MethodBinding, Streaming, Verb,
    };

    fn request_descriptor() -> Arc<MessageDescriptor> {
        let shelf = MessageDescriptor::new(
            "library.Shelf",
            vec![
                FieldDescriptor::new("id", FieldKind::Int64),
                FieldDescriptor::new("theme", FieldKind::String),
            ],
        );
        MessageDescriptor::new(
            "library.ListBooksRequest",
            vec![
                FieldDescriptor::new("shelf", FieldKind::Message(shelf)),
                FieldDescriptor::new("id", FieldKind::Int64),
                FieldDescriptor::new("page_size", FieldKind::Int32),
                FieldDescriptor::repeated("tags", FieldKind::String),
                FieldDescriptor::new("book", FieldKind::Message(MessageDescriptor::new(
                    "library.Book",
                    vec![FieldDescriptor::new("title", FieldKind::String)],
                ))),
            ],
        )
    }

    fn binding(
        path_params: Vec<&str>,
        query_params: Vec<&str>,
        body: BodyBinding,
    ) -> MethodBinding {
        MethodBinding::new(
            "library.LibraryService",
            "ListBooks",
            Verb::Get,
            path_params.iter().map(|p| FieldPath::parse(p).unwrap()).collect(),
            query_params.iter().map(|p| FieldPath::parse(p).unwrap()).collect(),
            body,
            Streaming::Unary,
            request_descriptor(),
            MessageDescriptor::new("library.Book", vec![]),
        )
        .unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        PathParams::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_path_param_assignment() {
        let binding = binding(vec!["id"], vec![], BodyBinding::None);
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[("id", "42")]),
            None,
            &Bytes::new(),
        )
        .unwrap();
        assert_eq!(message, json!({"id": 42}));
    }

    #[test]
    fn test_nested_path_param_creates_intermediates() {
        let binding = binding(vec!["shelf.id"], vec![], BodyBinding::None);
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[("shelf.id", "7")]),
            None,
            &Bytes::new(),
        )
        .unwrap();
        assert_eq!(message, json!({"shelf": {"id": 7}}));
    }

    #[test]
    fn test_malformed_path_param_is_convert_error() {
        let binding = binding(vec!["id"], vec![], BodyBinding::None);
        let err = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[("id", "abc")]),
            None,
            &Bytes::new(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Convert { .. }));
    }

    #[test]
    fn test_missing_path_param_is_binding_error() {
        let binding = binding(vec!["id"], vec![], BodyBinding::None);
        let err =
            assemble_unary(&binding, &JsonCodec, &params(&[]), None, &Bytes::new()).unwrap_err();
        assert!(matches!(err, GatewayError::Binding(_)));
        assert_eq!(err.to_string(), "missing parameter id");
    }

    #[test]
    fn test_query_params_absent_keys_skipped() {
        let binding = binding(vec![], vec!["page_size", "shelf.theme"], BodyBinding::None);
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[]),
            Some("page_size=10"),
            &Bytes::new(),
        )
        .unwrap();
        // shelf.theme was not supplied: the field keeps its zero value and
        // no intermediate object is conjured up for it
        assert_eq!(message, json!({"page_size": 10}));
    }

    #[test]
    fn test_repeated_query_param_preserves_order() {
        let binding = binding(vec![], vec!["tags"], BodyBinding::None);
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[]),
            Some("tags=b&tags=a&tags=c"),
            &Bytes::new(),
        )
        .unwrap();
        assert_eq!(message, json!({"tags": ["b", "a", "c"]}));
    }

    #[test]
    fn test_singular_query_param_takes_first_value() {
        let binding = binding(vec![], vec!["page_size"], BodyBinding::None);
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[]),
            Some("page_size=3&page_size=9"),
            &Bytes::new(),
        )
        .unwrap();
        assert_eq!(message, json!({"page_size": 3}));
    }

    #[test]
    fn test_present_but_empty_query_value_still_converts() {
        // an empty string is a conversion error for numeric kinds but a
        // valid value for string kinds; neither is special-cased
        let page_size_binding = binding(vec![], vec!["page_size"], BodyBinding::None);
        let err = assemble_unary(
            &page_size_binding,
            &JsonCodec,
            &params(&[]),
            Some("page_size="),
            &Bytes::new(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Convert { .. }));

        let binding = binding(vec![], vec!["shelf.theme"], BodyBinding::None);
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[]),
            Some("shelf.theme="),
            &Bytes::new(),
        )
        .unwrap();
        assert_eq!(message, json!({"shelf": {"theme": ""}}));
    }

    #[test]
    fn test_body_field_assignment() {
        let binding = binding(vec!["id"], vec![], BodyBinding::Field(FieldPath::parse("book").unwrap()));
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[("id", "5")]),
            None,
            &Bytes::from_static(br#"{"title": "Dune"}"#),
        )
        .unwrap();
        assert_eq!(message, json!({"id": 5, "book": {"title": "Dune"}}));
    }

    #[test]
    fn test_whole_body_with_path_override() {
        let binding = binding(vec!["id"], vec![], BodyBinding::Whole);
        let message = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[("id", "5")]),
            None,
            &Bytes::from_static(br#"{"id": 999, "page_size": 2}"#),
        )
        .unwrap();
        // the matched URL is authoritative over the payload
        assert_eq!(message, json!({"id": 5, "page_size": 2}));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let binding = binding(vec![], vec![], BodyBinding::Whole);
        let err = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[]),
            None,
            &Bytes::from_static(b"{nope"),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));

        let err = assemble_unary(
            &binding,
            &JsonCodec,
            &params(&[]),
            None,
            &Bytes::from_static(b"[1, 2]"),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn test_stream_assembly_applies_overlay_to_every_unit() {
        let binding = binding(vec!["id"], vec![], BodyBinding::None);
        let body = futures::stream::iter(vec![Ok::<_, String>(Bytes::from_static(
            b"{\"page_size\": 1}\n{\"page_size\": 2}\n",
        ))]);
        let units: Vec<_> = assemble_stream(&binding, &params(&[("id", "4")]), None, body)
            .unwrap()
            .collect()
            .await;
        assert_eq!(units.len(), 2);
        assert_eq!(
            units[0].as_ref().unwrap(),
            &json!({"id": 4, "page_size": 1})
        );
        assert_eq!(
            units[1].as_ref().unwrap(),
            &json!({"id": 4, "page_size": 2})
        );
    }

    #[tokio::test]
    async fn test_stream_assembly_fails_before_dispatch_on_bad_param() {
        let binding = binding(vec!["id"], vec![], BodyBinding::None);
        let body = futures::stream::iter(vec![Ok::<_, String>(Bytes::new())]);
        let result = assemble_stream(&binding, &params(&[("id", "abc")]), None, body);
        assert!(result.err().is_some());
    }

    #[tokio::test]
    async fn test_stream_assembly_aborts_on_malformed_unit() {
        let binding = binding(vec![], vec![], BodyBinding::None);
        let body = futures::stream::iter(vec![Ok::<_, String>(Bytes::from_static(
            b"{\"page_size\": 1}\n{bad\n{\"page_size\": 3}\n",
        ))]);
        let units: Vec<_> = assemble_stream(&binding, &params(&[]), None, body)
            .unwrap()
            .collect()
            .await;
        assert_eq!(units.len(), 2);
        assert!(units[0].is_ok());
        assert!(units[1].is_err());
    }
}
