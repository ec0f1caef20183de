//! gRPC channel implementation using tonic
//!
//! Message units are dynamic `serde_json::Value`s, carried over the gRPC
//! framing by a custom [`tonic::codec::Codec`]. The connection is dialed
//! eagerly so registration can fail fast, and closing the channel fails any
//! call made after it.

use std::sync::{Arc, RwLock};

use bytes::{Buf, BufMut};
use serde_json::Value;
use tonic::client::Grpc;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel as TonicChannel, Endpoint};
use tonic::{Request, Status};

use async_trait::async_trait;
use futures::StreamExt;

use crate::channel::{Channel, RequestStream, ResponseStream};
use crate::config::GatewayConfig;
use crate::error::GatewayResult;

/// tonic codec carrying JSON message units
#[derive(Debug, Clone, Default)]
pub struct DynamicJsonCodec;

impl Codec for DynamicJsonCodec {
    type Encode = Value;
    type Decode = Value;
    type Encoder = DynamicJsonEncoder;
    type Decoder = DynamicJsonDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicJsonEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicJsonDecoder
    }
}

/// Encoder half of [`DynamicJsonCodec`]
#[derive(Debug)]
pub struct DynamicJsonEncoder;

impl Encoder for DynamicJsonEncoder {
    type Item = Value;
    type Error = Status;

    fn encode(&mut self, item: Value, buf: &mut EncodeBuf<'_>) -> Result<(), Status> {
        serde_json::to_writer(buf.writer(), &item).map_err(|err| Status::internal(err.to_string()))
    }
}

/// Decoder half of [`DynamicJsonCodec`]
#[derive(Debug)]
pub struct DynamicJsonDecoder;

impl Decoder for DynamicJsonDecoder {
    type Item = Value;
    type Error = Status;

    fn decode(&mut self, buf: &mut DecodeBuf<'_>) -> Result<Option<Value>, Status> {
        if !buf.has_remaining() {
            return Ok(None);
        }
        let item = serde_json::from_reader(buf.reader())
            .map_err(|err| Status::internal(err.to_string()))?;
        Ok(Some(item))
    }
}

/// A tonic-backed connection to one RPC service
///
/// Cheap to clone; clones share the underlying HTTP/2 connection, which
/// multiplexes concurrent in-flight calls.
#[derive(Clone)]
pub struct GrpcChannel {
    inner: Arc<RwLock<Option<Grpc<TonicChannel>>>>,
}

impl GrpcChannel {
    /// Dial the configured endpoint eagerly
    ///
    /// Fails with [`GatewayError::Dial`](crate::error::GatewayError::Dial)
    /// when the endpoint is unreachable, before any route is mounted.
    pub async fn dial(config: &GatewayConfig) -> GatewayResult<Self> {
        let mut endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|err| crate::error::GatewayError::Dial(err.to_string()))?;
        if let Some(timeout) = config.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }
        let channel = endpoint.connect().await?;
        Ok(Self::new(channel))
    }

    /// Wrap an already-established tonic channel
    pub fn new(channel: TonicChannel) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(Grpc::new(channel)))),
        }
    }

    /// Clone the client out of the handle, failing if the channel was closed
    fn client(&self) -> Result<Grpc<TonicChannel>, Status> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| Status::unavailable("connection closed"))
    }

    fn route(rpc_path: &str) -> Result<PathAndQuery, Status> {
        rpc_path
            .parse::<PathAndQuery>()
            .map_err(|err| Status::internal(format!("invalid rpc path {}: {}", rpc_path, err)))
    }
}

#[async_trait]
impl Channel for GrpcChannel {
    async fn unary(&self, rpc_path: &str, request: Value) -> Result<Value, Status> {
        let mut grpc = self.client()?;
        grpc.ready()
            .await
            .map_err(|err| Status::unavailable(format!("service not ready: {}", err)))?;
        let response = grpc
            .unary(Request::new(request), Self::route(rpc_path)?, DynamicJsonCodec)
            .await?;
        Ok(response.into_inner())
    }

    async fn client_streaming(
        &self,
        rpc_path: &str,
        requests: RequestStream,
    ) -> Result<Value, Status> {
        let mut grpc = self.client()?;
        grpc.ready()
            .await
            .map_err(|err| Status::unavailable(format!("service not ready: {}", err)))?;
        let response = grpc
            .client_streaming(Request::new(requests), Self::route(rpc_path)?, DynamicJsonCodec)
            .await?;
        Ok(response.into_inner())
    }

    async fn server_streaming(
        &self,
        rpc_path: &str,
        request: Value,
    ) -> Result<ResponseStream, Status> {
        let mut grpc = self.client()?;
        grpc.ready()
            .await
            .map_err(|err| Status::unavailable(format!("service not ready: {}", err)))?;
        let streaming = grpc
            .server_streaming(Request::new(request), Self::route(rpc_path)?, DynamicJsonCodec)
            .await?
            .into_inner();
        Ok(streaming.boxed())
    }

    async fn bidi_streaming(
        &self,
        rpc_path: &str,
        requests: RequestStream,
    ) -> Result<ResponseStream, Status> {
        let mut grpc = self.client()?;
        grpc.ready()
            .await
            .map_err(|err| Status::unavailable(format!("service not ready: {}", err)))?;
        let streaming = grpc
            .streaming(Request::new(requests), Self::route(rpc_path)?, DynamicJsonCodec)
            .await?
            .into_inner();
        Ok(streaming.boxed())
    }

    async fn close(&self) -> Result<(), Status> {
        let dropped = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match dropped {
            Some(_) => Ok(()),
            None => Err(Status::failed_precondition("connection already closed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_route_validation() {
        assert!(GrpcChannel::route("/library.LibraryService/GetBook").is_ok());
        assert!(GrpcChannel::route("not a path").is_err());
    }

    #[tokio::test]
    async fn test_calls_after_close_fail() {
        // a lazily-connecting channel never dials until the first call
        let endpoint = Endpoint::from_static("http://127.0.0.1:1");
        let channel = GrpcChannel::new(endpoint.connect_lazy());

        assert_ok!(channel.close().await);
        let err = channel
            .unary("/svc/Method", serde_json::json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unavailable);

        // second close is an error; the registrar never issues one
        assert_err!(channel.close().await);
    }
}
