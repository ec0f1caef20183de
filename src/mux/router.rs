//! Gateway mux
//!
//! Holds the registered (verb, pattern, handler) routes and dispatches each
//! inbound request to the first route whose pattern matches. The mux is a
//! `tower_service::Service`, so it mounts directly under `axum::serve` or
//! any other tower-compatible server.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use futures::future::BoxFuture;
use tower_service::Service;

use crate::descriptor::Verb;
use crate::mux::pattern::{PathParams, Pattern};

type HandlerFn =
    Arc<dyn Fn(Request<Body>, PathParams) -> BoxFuture<'static, Response<Body>> + Send + Sync>;

#[derive(Clone)]
struct Route {
    verb: Verb,
    pattern: Arc<dyn Pattern>,
    handler: HandlerFn,
}

/// Router for gateway handlers
#[derive(Clone, Default)]
pub struct GatewayMux {
    routes: Vec<Route>,
}

impl GatewayMux {
    /// Create an empty mux
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a handler at (verb, pattern)
    ///
    /// Routes are tried in registration order; the first pattern match under
    /// the request's verb wins.
    pub fn handle<F, Fut>(&mut self, verb: Verb, pattern: Arc<dyn Pattern>, handler: F)
    where
        F: Fn(Request<Body>, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response<Body>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |request, params| Box::pin(handler(request, params)));
        self.routes.push(Route {
            verb,
            pattern,
            handler,
        });
    }

    /// Number of mounted routes
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    fn dispatch(&self, request: Request<Body>) -> BoxFuture<'static, Response<Body>> {
        let path = request.uri().path().to_owned();
        let method = request.method().as_str().to_owned();

        let mut path_matched = false;
        for route in &self.routes {
            if let Some(params) = route.pattern.match_path(&path) {
                if route.verb.as_str() == method {
                    return (route.handler)(request, params);
                }
                path_matched = true;
            }
        }

        let (status, text) = if path_matched {
            (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        } else {
            (StatusCode::NOT_FOUND, "Not Found")
        };
        Box::pin(async move {
            let mut response = Response::new(Body::from(text));
            *response.status_mut() = status;
            response
        })
    }
}

impl Service<Request<Body>> for GatewayMux {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let response = self.dispatch(request);
        Box::pin(async move { Ok(response.await) })
    }
}
