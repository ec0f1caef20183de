//! JSON payload codec
//!
//! Handles the HTTP side of the wire contract: decoding request payloads
//! (single messages and streamed sequences of units) and encoding response
//! messages. Streamed request bodies carry concatenated JSON values —
//! whitespace or newline separated — and are decoded one unit at a time,
//! never buffering past the unit in flight.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

/// JSON codec for the HTTP+JSON binding
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Decode a complete request payload into a single message value
    pub fn decode_message(&self, body: &[u8]) -> GatewayResult<Value> {
        serde_json::from_slice(body).map_err(|err| GatewayError::Decode(err.to_string()))
    }

    /// Encode a response message for the HTTP body
    pub fn encode_message(&self, message: &Value) -> GatewayResult<Bytes> {
        let bytes =
            serde_json::to_vec(message).map_err(|err| GatewayError::Decode(err.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    /// The MIME type of this binding
    pub fn content_type(&self) -> &'static str {
        "application/json"
    }
}

/// Lazy decoder for a streamed request body
///
/// Yields one message per JSON unit in the body, in input order, ending
/// cleanly at end-of-input. A malformed unit yields one [`GatewayError::Decode`]
/// and fuses the stream; the failed unit is never produced.
pub struct JsonUnitStream {
    body: BoxStream<'static, GatewayResult<Bytes>>,
    buf: Vec<u8>,
    exhausted: bool,
    fused: bool,
}

impl JsonUnitStream {
    /// Wrap a byte stream (typically an HTTP request body)
    pub fn new<S, E>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display,
    {
        let body = body
            .map(|chunk| chunk.map_err(|err| GatewayError::Decode(err.to_string())))
            .boxed();
        Self {
            body,
            buf: Vec::new(),
            exhausted: false,
            fused: false,
        }
    }

    /// Try to pull one complete JSON value off the front of the buffer
    fn extract(&mut self) -> Extract {
        let mut iter = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
        match iter.next() {
            Some(Ok(value)) => {
                let consumed = iter.byte_offset();
                self.buf.drain(..consumed);
                Extract::Unit(value)
            }
            Some(Err(err)) if err.is_eof() && !self.exhausted => Extract::NeedMore,
            Some(Err(err)) => Extract::Malformed(err.to_string()),
            // nothing but trailing whitespace left
            None => {
                if self.exhausted {
                    Extract::End
                } else {
                    Extract::NeedMore
                }
            }
        }
    }
}

enum Extract {
    Unit(Value),
    NeedMore,
    End,
    Malformed(String),
}

impl Stream for JsonUnitStream {
    type Item = GatewayResult<Value>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.fused {
            return Poll::Ready(None);
        }
        loop {
            match this.extract() {
                Extract::Unit(value) => return Poll::Ready(Some(Ok(value))),
                Extract::End => {
                    this.fused = true;
                    return Poll::Ready(None);
                }
                Extract::Malformed(reason) => {
                    this.fused = true;
                    return Poll::Ready(Some(Err(GatewayError::Decode(reason))));
                }
                Extract::NeedMore => match this.body.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(chunk))) => this.buf.extend_from_slice(&chunk),
                    Poll::Ready(Some(Err(err))) => {
                        this.fused = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(None) => this.exhausted = true,
                    Poll::Pending => return Poll::Pending,
                },
            }
        }
    }
}
