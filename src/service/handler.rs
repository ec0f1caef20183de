//! Per-method request handling
//!
//! A [`MethodHandler`] is the synthesized behavior behind one mounted route:
//! assemble the request message(s) from the matched HTTP request, dispatch
//! the call over the shared channel, forward whatever comes back. Every
//! failure becomes a complete HTTP error response; nothing escapes the
//! request boundary.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::channel::Channel;
use crate::codec::JsonCodec;
use crate::descriptor::MethodBinding;
use crate::error::{GatewayError, GatewayResult};
use crate::mux::PathParams;
use crate::service::dispatch::{self, Outcome};
use crate::service::{assemble, forward};

/// Handler bound to one (verb, pattern) route
#[derive(Clone)]
pub struct MethodHandler {
    binding: Arc<MethodBinding>,
    channel: Arc<dyn Channel>,
    codec: JsonCodec,
}

impl MethodHandler {
    /// Bind a method to the channel its service was registered with
    pub fn new(binding: Arc<MethodBinding>, channel: Arc<dyn Channel>) -> Self {
        Self {
            binding,
            channel,
            codec: JsonCodec,
        }
    }

    /// Handle one matched request, producing the full HTTP response
    pub async fn handle(&self, request: Request<Body>, path_params: PathParams) -> Response<Body> {
        match self.call(request, path_params).await {
            Ok(Outcome::Message(message)) => forward::message_response(&self.codec, &message),
            Ok(Outcome::Stream(units)) => forward::stream_response(units).await,
            Err(err) => {
                if matches!(err, GatewayError::Binding(_)) {
                    tracing::error!(
                        method = %self.binding.rpc_path,
                        error = %err,
                        "route and pattern disagree",
                    );
                }
                forward::error_response(&err)
            }
        }
    }

    async fn call(
        &self,
        request: Request<Body>,
        path_params: PathParams,
    ) -> GatewayResult<Outcome> {
        let (parts, body) = request.into_parts();
        let query = parts.uri.query().map(str::to_owned);

        if self.binding.streaming.client_streaming() {
            let units = assemble::assemble_stream(
                &self.binding,
                &path_params,
                query.as_deref(),
                body.into_data_stream(),
            )?;
            dispatch::dispatch_streaming(&self.channel, &self.binding, units).await
        } else {
            let bytes = axum::body::to_bytes(body, usize::MAX)
                .await
                .map_err(|err| GatewayError::Decode(err.to_string()))?;
            let message =
                assemble::assemble_unary(&self.binding, &self.codec, &path_params, query.as_deref(), &bytes)?;
            dispatch::dispatch_unary(&self.channel, &self.binding, message).await
        }
    }
}
