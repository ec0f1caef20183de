//! Route registration, pattern matching, and the gateway mux

pub mod pattern;
pub mod register;
pub mod router;

pub use pattern::{PathParams, Pattern, TemplatePattern};
pub use register::{register_service, register_service_from_endpoint, register_service_with_shutdown};
pub use router::GatewayMux;
