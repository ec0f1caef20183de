//! # Tower Gateway
//!
//! A Tower-based HTTP/JSON gateway for gRPC services.
//!
//! This library exposes RESTful HTTP/JSON endpoints mechanically derived
//! from RPC method bindings: each route assembles a request message from the
//! matched path, the query string, and the payload, forwards it to the
//! corresponding gRPC call, and writes the call's response — including
//! streamed responses — back as the HTTP body.
//!
//! ## Features
//!
//! - **Four streaming shapes**: unary, client-streaming, server-streaming,
//!   and bidi methods all route through one uniform dispatch model
//! - **Binding-driven**: per-method descriptors decide which request fields
//!   come from path segments, query values, or the payload
//! - **Tower Service**: the mux mounts under `axum::serve` or any other
//!   tower-compatible server
//! - **Async**: built on tokio, with lazy request/response streams and
//!   per-unit flushing
//!
//! ## Example
//!
//! ```rust,no_run
//! use tower_gateway::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = MessageDescriptor::new(
//!         "inventory.GetItemRequest",
//!         vec![FieldDescriptor::new("id", FieldKind::Int64)],
//!     );
//!     let response = MessageDescriptor::new("inventory.Item", vec![]);
//!     let service = ServiceBinding::new(
//!         "inventory.ItemService",
//!         vec![MethodBinding::new(
//!             "inventory.ItemService",
//!             "GetItem",
//!             Verb::Get,
//!             vec![FieldPath::parse("id")?],
//!             vec![],
//!             BodyBinding::None,
//!             Streaming::Unary,
//!             request,
//!             response,
//!         )?],
//!     );
//!
//!     let mut mux = GatewayMux::new();
//!     let config = GatewayConfig::new("http://127.0.0.1:50051");
//!     register_service_from_endpoint(
//!         &mut mux,
//!         service,
//!         vec![Arc::new(TemplatePattern::new("/v1/items/{id}"))],
//!         &config,
//!         std::future::pending(),
//!     )
//!     .await?;
//!
//!     let app = axum::Router::new().fallback_service(mux);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod mux;
pub mod service;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        channel::{Channel, GrpcChannel},
        config::GatewayConfig,
        descriptor::{
            BodyBinding, EnumDescriptor, FieldDescriptor, FieldKind, FieldPath, MessageDescriptor,
            MethodBinding, ServiceBinding, Streaming, Verb,
        },
        error::{GatewayError, GatewayResult},
        mux::{
            register_service, register_service_from_endpoint, GatewayMux, PathParams, Pattern,
            TemplatePattern,
        },
    };
}
