//! Call dispatch
//!
//! Drives the RPC call for each streaming cardinality. Request sequences are
//! sent in assembly order and the send side closes on input exhaustion; an
//! assembly failure inside a request sequence is captured and takes
//! precedence over the call's own outcome, so a late error is never dropped
//! behind an apparently successful terminal response.

use std::sync::{Arc, Mutex};

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use crate::channel::Channel;
use crate::descriptor::{MethodBinding, Streaming};
use crate::error::{GatewayError, GatewayResult};

/// Responses flowing back to the forwarder, in receive order
pub type ResponseUnits = futures::stream::BoxStream<'static, GatewayResult<Value>>;

/// What a dispatched call produced
pub enum Outcome {
    /// Single terminal response (unary and client-streaming methods)
    Message(Value),
    /// Produced sequence of responses (server-streaming and bidi methods)
    Stream(ResponseUnits),
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Message(value) => f.debug_tuple("Message").field(value).finish(),
            Outcome::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

/// Dispatch a call whose input is a single assembled request
pub async fn dispatch_unary(
    channel: &Arc<dyn Channel>,
    binding: &MethodBinding,
    request: Value,
) -> GatewayResult<Outcome> {
    match binding.streaming {
        Streaming::Unary => {
            let response = channel.unary(&binding.rpc_path, request).await?;
            Ok(Outcome::Message(response))
        }
        Streaming::ServerStream => {
            let responses = channel.server_streaming(&binding.rpc_path, request).await?;
            Ok(Outcome::Stream(
                responses.map(|unit| unit.map_err(GatewayError::Call)).boxed(),
            ))
        }
        _ => Err(GatewayError::Binding(format!(
            "method {} requires a request stream",
            binding.name
        ))),
    }
}

/// Dispatch a call whose input is an assembled request sequence
pub async fn dispatch_streaming<S>(
    channel: &Arc<dyn Channel>,
    binding: &MethodBinding,
    requests: S,
) -> GatewayResult<Outcome>
where
    S: Stream<Item = GatewayResult<Value>> + Send + 'static,
{
    let (requests, slot) = until_error(requests);
    match binding.streaming {
        Streaming::ClientStream => {
            let result = channel.client_streaming(&binding.rpc_path, requests).await;
            // an aborted assembly is the root cause; report it over whatever
            // the truncated call came back with
            if let Some(err) = take(&slot) {
                return Err(err);
            }
            Ok(Outcome::Message(result?))
        }
        Streaming::BidiStream => {
            let responses = channel.bidi_streaming(&binding.rpc_path, requests).await;
            if let Some(err) = take(&slot) {
                return Err(err);
            }
            let responses = responses?
                .map(|unit| unit.map_err(GatewayError::Call))
                .chain(trailing_error(slot));
            Ok(Outcome::Stream(responses.boxed()))
        }
        _ => Err(GatewayError::Binding(format!(
            "method {} takes a single request",
            binding.name
        ))),
    }
}

type ErrorSlot = Arc<Mutex<Option<GatewayError>>>;

/// Pass request units through until the first assembly error, which ends the
/// sequence (closing the send side) and parks the error in the slot
fn until_error<S>(requests: S) -> (crate::channel::RequestStream, ErrorSlot)
where
    S: Stream<Item = GatewayResult<Value>> + Send + 'static,
{
    let slot: ErrorSlot = Arc::new(Mutex::new(None));
    let captured = slot.clone();
    let requests = requests
        .scan((), move |_, unit| {
            futures::future::ready(match unit {
                Ok(value) => Some(value),
                Err(err) => {
                    *captured.lock().unwrap_or_else(|p| p.into_inner()) = Some(err);
                    None
                }
            })
        })
        .boxed();
    (requests, slot)
}

fn take(slot: &ErrorSlot) -> Option<GatewayError> {
    slot.lock().unwrap_or_else(|p| p.into_inner()).take()
}

/// Zero-or-one element tail surfacing an assembly error captured while the
/// response side was still being consumed
fn trailing_error(slot: ErrorSlot) -> impl Stream<Item = GatewayResult<Value>> + Send {
    stream::unfold(Some(slot), |state| async move {
        let slot = state?;
        take(&slot).map(|err| (Err(err), None))
    })
}
