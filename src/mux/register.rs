//! Route registration and connection lifecycle
//!
//! Mounts one route per method of a service, all sharing one RPC connection.
//! The connection is dialed eagerly: a dial failure aborts the whole
//! service's registration and mounts nothing. On success, a single watcher
//! task awaits the shutdown signal and closes the connection exactly once;
//! if registration fails after a successful dial, the connection is closed
//! synchronously instead of deferring to the signal.

use std::future::Future;
use std::sync::Arc;

use crate::channel::{Channel, GrpcChannel};
use crate::config::GatewayConfig;
use crate::descriptor::ServiceBinding;
use crate::error::{GatewayError, GatewayResult};
use crate::mux::pattern::Pattern;
use crate::mux::router::GatewayMux;
use crate::service::MethodHandler;

/// Mount a service's routes over an already-connected channel
///
/// `patterns` pairs with `service.methods` by position: the compiled pattern
/// of each method, in the same order. The caller keeps ownership of the
/// connection's lifecycle.
pub fn register_service(
    mux: &mut GatewayMux,
    service: ServiceBinding,
    patterns: Vec<Arc<dyn Pattern>>,
    channel: Arc<dyn Channel>,
) -> GatewayResult<()> {
    if patterns.len() != service.methods.len() {
        return Err(GatewayError::Binding(format!(
            "service {}: {} methods but {} patterns",
            service.name,
            service.methods.len(),
            patterns.len()
        )));
    }

    for (binding, pattern) in service.methods.into_iter().zip(patterns) {
        tracing::debug!(
            verb = binding.verb.as_str(),
            template = pattern.template(),
            rpc = %binding.rpc_path,
            "mounting route",
        );
        let handler = MethodHandler::new(Arc::new(binding.clone()), channel.clone());
        mux.handle(binding.verb, pattern, move |request, params| {
            let handler = handler.clone();
            async move { handler.handle(request, params).await }
        });
    }
    Ok(())
}

/// Mount a service's routes and tie the connection to a shutdown signal
///
/// When `shutdown` resolves, the connection is closed, exactly once. If
/// registration itself fails, the connection is closed synchronously and no
/// watcher is spawned.
pub async fn register_service_with_shutdown(
    mux: &mut GatewayMux,
    service: ServiceBinding,
    patterns: Vec<Arc<dyn Pattern>>,
    channel: Arc<dyn Channel>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> GatewayResult<()> {
    let service_name = service.name.clone();

    if let Err(err) = register_service(mux, service, patterns, channel.clone()) {
        if let Err(close_err) = channel.close().await {
            tracing::error!(service = %service_name, error = %close_err, "failed to close connection");
        }
        return Err(err);
    }

    tokio::spawn(async move {
        shutdown.await;
        if let Err(err) = channel.close().await {
            tracing::error!(service = %service_name, error = %err, "failed to close connection");
        }
    });
    Ok(())
}

/// Dial an endpoint and mount a service's routes over the new connection
///
/// Dial failure mounts nothing and surfaces [`GatewayError::Dial`]; on
/// success the connection closes when `shutdown` resolves.
pub async fn register_service_from_endpoint(
    mux: &mut GatewayMux,
    service: ServiceBinding,
    patterns: Vec<Arc<dyn Pattern>>,
    config: &GatewayConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> GatewayResult<()> {
    config.endpoint_url()?;
    let channel: Arc<dyn Channel> = Arc::new(GrpcChannel::dial(config).await?);
    register_service_with_shutdown(mux, service, patterns, channel, shutdown).await
}
