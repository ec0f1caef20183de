//! Response forwarding
//!
//! Writes call outcomes to the HTTP response. A single message becomes the
//! JSON body; a produced sequence becomes a streamed body with one
//! line-framed unit per message, flushed as each unit arrives. Once a unit
//! has been flushed it cannot be retracted, so a mid-stream failure simply
//! terminates the connection after the units already written.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::GatewayError;
use crate::service::dispatch::ResponseUnits;

fn content_type_json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// Forward a single response message
pub fn message_response(codec: &JsonCodec, message: &Value) -> Response<Body> {
    match codec.encode_message(message) {
        Ok(bytes) => json_response(StatusCode::OK, bytes),
        Err(err) => error_response(&err),
    }
}

/// Forward an error as the HTTP error representation
pub fn error_response(err: &GatewayError) -> Response<Body> {
    let bytes = serde_json::to_vec(&err.body())
        .map(Bytes::from)
        .unwrap_or_else(|_| Bytes::from_static(b"{}"));
    json_response(err.http_status(), bytes)
}

/// Forward a produced response sequence as a streamed body
///
/// The first unit decides the response: an error before anything has been
/// flushed still becomes a proper HTTP error response. From then on each
/// unit is written as a `{"result": …}` line; an error mid-stream ends the
/// body abnormally, terminating the connection.
pub async fn stream_response(mut units: ResponseUnits) -> Response<Body> {
    match units.next().await {
        None => json_response(StatusCode::OK, Bytes::new()),
        Some(Err(err)) => {
            tracing::error!(error = %err, "stream failed before any unit was sent");
            error_response(&err)
        }
        Some(Ok(first)) => {
            let frames = stream::once(futures::future::ready(Ok(first)))
                .chain(units)
                .map(|unit| match unit {
                    Ok(message) => frame(&message),
                    Err(err) => {
                        tracing::error!(error = %err, "stream failed mid-flight, terminating");
                        Err(err)
                    }
                });
            let mut response = Response::new(Body::from_stream(frames));
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type_json());
            response
        }
    }
}

/// One line-framed stream unit
fn frame(message: &Value) -> Result<Bytes, GatewayError> {
    let mut bytes = serde_json::to_vec(&serde_json::json!({ "result": message }))
        .map_err(|err| GatewayError::Decode(err.to_string()))?;
    bytes.push(b'\n');
    Ok(Bytes::from(bytes))
}

fn json_response(status: StatusCode, bytes: Bytes) -> Response<Body> {
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type_json());
    response
}
