//! Request assembly, call dispatch, and response forwarding

pub mod assemble;
pub mod dispatch;
pub mod forward;
pub mod handler;

pub use dispatch::Outcome;
pub use handler::MethodHandler;
