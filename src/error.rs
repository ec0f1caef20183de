//! Error types for gateway request handling

use axum::http::StatusCode;
use serde_json::json;
use thiserror::Error;
use tonic::{Code, Status};

/// Main error type for gateway operations
///
/// Every per-request failure is recovered at the boundary of that request and
/// rendered as an HTTP error response; only [`GatewayError::Dial`] occurs
/// outside request handling, during service registration.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A path or query value could not be converted to the target field type
    #[error("invalid value for parameter {param}: {reason}")]
    Convert {
        /// Dotted field path of the offending parameter
        param: String,
        /// Why the raw text did not parse
        reason: String,
    },

    /// The route and its binding disagree, e.g. the router matched a pattern
    /// but did not supply a declared path parameter
    ///
    /// An internal invariant violation rather than a client mistake.
    #[error("{0}")]
    Binding(String),

    /// Malformed request payload
    #[error("decoding request body: {0}")]
    Decode(String),

    /// The RPC call failed, at any point including mid-stream
    #[error("call failed: {0}")]
    Call(#[from] Status),

    /// One-time connection setup to the RPC endpoint failed
    #[error("dialing endpoint: {0}")]
    Dial(String),
}

impl GatewayError {
    /// The gRPC status code this error surfaces as
    pub fn code(&self) -> Code {
        match self {
            GatewayError::Convert { .. } | GatewayError::Decode(_) => Code::InvalidArgument,
            GatewayError::Binding(_) => Code::Internal,
            GatewayError::Call(status) => status.code(),
            GatewayError::Dial(_) => Code::Unavailable,
        }
    }

    /// The HTTP status this error maps to
    pub fn http_status(&self) -> StatusCode {
        http_status_from_code(self.code())
    }

    /// JSON error payload written to the client
    ///
    /// Shape: `{"code": <rpc code number>, "message": <text>}`.
    pub fn body(&self) -> serde_json::Value {
        let message = match self {
            // Status carries its own message; the variant wrapper adds noise
            GatewayError::Call(status) => status.message().to_string(),
            other => other.to_string(),
        };
        json!({
            "code": self.code() as i32,
            "message": message,
        })
    }
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Map a gRPC status code to its HTTP equivalent
pub fn http_status_from_code(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::REQUEST_TIMEOUT,
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
    }
}

impl From<tonic::transport::Error> for GatewayError {
    fn from(err: tonic::transport::Error) -> Self {
        GatewayError::Dial(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_error_is_client_error() {
        let err = GatewayError::Convert {
            param: "id".to_string(),
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body()["code"], Code::InvalidArgument as i32);
    }

    #[test]
    fn test_binding_error_is_server_error() {
        let err = GatewayError::Binding("missing parameter id".to_string());
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body()["message"], "missing parameter id");
    }

    #[test]
    fn test_call_error_keeps_status_message() {
        let err = GatewayError::Call(Status::not_found("no such item"));
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body()["message"], "no such item");
        assert_eq!(err.body()["code"], Code::NotFound as i32);
    }

    #[test]
    fn test_status_table() {
        assert_eq!(
            http_status_from_code(Code::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            http_status_from_code(Code::ResourceExhausted),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            http_status_from_code(Code::Unavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
