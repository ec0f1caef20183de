//! Mock channel for testing
//!
//! Scripts RPC behavior without a live server: closures decide each call's
//! outcome while the mock records the rpc paths invoked, every request unit
//! actually sent, and how often the connection was closed. Unlike the
//! lazily-pulled real transport, the mock drains request streams eagerly,
//! which is exactly what the send-order assertions need.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tonic::Status;

use crate::channel::{Channel, RequestStream, ResponseStream};

type UnaryFn = dyn Fn(Value) -> Result<Value, Status> + Send + Sync;
type TerminalFn = dyn Fn(Vec<Value>) -> Result<Value, Status> + Send + Sync;
type StreamFn = dyn Fn(Value) -> Result<Vec<Result<Value, Status>>, Status> + Send + Sync;
type DuplexFn = dyn Fn(Vec<Value>) -> Result<Vec<Result<Value, Status>>, Status> + Send + Sync;

/// Scriptable in-memory channel
#[derive(Clone)]
pub struct MockChannel {
    unary: Arc<UnaryFn>,
    terminal: Arc<TerminalFn>,
    stream: Arc<StreamFn>,
    duplex: Arc<DuplexFn>,
    calls: Arc<Mutex<Vec<String>>>,
    sent: Arc<Mutex<Vec<Value>>>,
    close_count: Arc<AtomicUsize>,
}

impl MockChannel {
    /// A channel that echoes: unary and server-streaming return the request,
    /// client-streaming and bidi echo the collected/individual units
    pub fn echo() -> Self {
        Self {
            unary: Arc::new(|request| Ok(request)),
            terminal: Arc::new(|units| Ok(Value::Array(units))),
            stream: Arc::new(|request| Ok(vec![Ok(request)])),
            duplex: Arc::new(|units| Ok(units.into_iter().map(Ok).collect())),
            calls: Arc::new(Mutex::new(Vec::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            close_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the unary outcome
    pub fn on_unary<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Status> + Send + Sync + 'static,
    {
        self.unary = Arc::new(f);
        self
    }

    /// Script the client-streaming terminal response from the sent units
    pub fn on_client_streaming<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, Status> + Send + Sync + 'static,
    {
        self.terminal = Arc::new(f);
        self
    }

    /// Script the server-streaming response sequence
    pub fn on_server_streaming<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Vec<Result<Value, Status>>, Status> + Send + Sync + 'static,
    {
        self.stream = Arc::new(f);
        self
    }

    /// Script the bidi response sequence from the sent units
    pub fn on_bidi<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Vec<Result<Value, Status>>, Status> + Send + Sync + 'static,
    {
        self.duplex = Arc::new(f);
        self
    }

    /// The rpc paths invoked so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Every request unit sent over any streaming call, in send order
    pub fn sent_units(&self) -> Vec<Value> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// How many times `close` was invoked
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    fn closed(&self) -> bool {
        self.close_count() > 0
    }

    fn record_call(&self, rpc_path: &str) -> Result<(), Status> {
        if self.closed() {
            return Err(Status::unavailable("connection closed"));
        }
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(rpc_path.to_string());
        Ok(())
    }

    async fn drain(&self, mut requests: RequestStream) -> Vec<Value> {
        let mut units = Vec::new();
        while let Some(unit) = requests.next().await {
            self.sent
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(unit.clone());
            units.push(unit);
        }
        units
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn unary(&self, rpc_path: &str, request: Value) -> Result<Value, Status> {
        self.record_call(rpc_path)?;
        (self.unary)(request)
    }

    async fn client_streaming(
        &self,
        rpc_path: &str,
        requests: RequestStream,
    ) -> Result<Value, Status> {
        self.record_call(rpc_path)?;
        let units = self.drain(requests).await;
        (self.terminal)(units)
    }

    async fn server_streaming(
        &self,
        rpc_path: &str,
        request: Value,
    ) -> Result<ResponseStream, Status> {
        self.record_call(rpc_path)?;
        let replies = (self.stream)(request)?;
        Ok(futures::stream::iter(replies).boxed())
    }

    async fn bidi_streaming(
        &self,
        rpc_path: &str,
        requests: RequestStream,
    ) -> Result<ResponseStream, Status> {
        self.record_call(rpc_path)?;
        let units = self.drain(requests).await;
        let replies = (self.duplex)(units)?;
        Ok(futures::stream::iter(replies).boxed())
    }

    async fn close(&self) -> Result<(), Status> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockChannel")
            .field("calls", &self.calls())
            .field("close_count", &self.close_count())
            .finish()
    }
}
