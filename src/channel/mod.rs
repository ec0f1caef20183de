//! RPC channel abstraction
//!
//! The dispatcher talks to the remote service through the [`Channel`] trait:
//! one method per streaming cardinality, all carrying dynamic JSON message
//! units. [`grpc::GrpcChannel`] backs it with a real tonic connection;
//! [`mock::MockChannel`] scripts responses for tests.

pub mod grpc;
pub mod mock;

pub use grpc::GrpcChannel;
pub use mock::MockChannel;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use tonic::Status;

/// Sequence of request units sent to the remote, in assembly order
pub type RequestStream = BoxStream<'static, Value>;

/// Sequence of response units produced by the remote, in receive order
pub type ResponseStream = BoxStream<'static, Result<Value, Status>>;

/// A connection to an RPC service, safe for concurrent use by many calls
///
/// Implementations own the underlying connection; `close` tears it down and
/// fails subsequent calls. The route registrar guarantees `close` is invoked
/// at most once per registered service.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// One request, one response
    async fn unary(&self, rpc_path: &str, request: Value) -> Result<Value, Status>;

    /// Send every request unit in order, close the send side, read one
    /// terminal response
    async fn client_streaming(
        &self,
        rpc_path: &str,
        requests: RequestStream,
    ) -> Result<Value, Status>;

    /// One request, a produced sequence of responses
    async fn server_streaming(
        &self,
        rpc_path: &str,
        request: Value,
    ) -> Result<ResponseStream, Status>;

    /// Duplex: the send side drains `requests` (closing on exhaustion) while
    /// the receive side yields responses
    async fn bidi_streaming(
        &self,
        rpc_path: &str,
        requests: RequestStream,
    ) -> Result<ResponseStream, Status>;

    /// Tear down the connection
    async fn close(&self) -> Result<(), Status>;
}
