//! Request handlers and the JSON envelopes they return.

pub mod api;
pub mod health;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::aggregate::AggregateError;
use crate::logging::{self, DataSource};

/// Failure envelope: `{"success": false, "error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// A failed API request. The client sees only `message`; the underlying
/// cause goes to the log.
#[derive(Debug)]
pub struct ApiError {
    pub message: &'static str,
    pub cause: AggregateError,
}

impl ApiError {
    pub fn new(message: &'static str) -> impl FnOnce(AggregateError) -> ApiError {
        move |cause| ApiError { message, cause }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        logging::error(
            DataSource::Api,
            None,
            &format!("{}: {}", self.message, self.cause),
        );
        let body = ErrorResponse {
            success: false,
            error: self.message.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Reads a `limit` query value the lenient way: leading ASCII digits are
/// used (`"15abc"` is 15); absent, non-numeric or zero falls back to
/// `default`.
pub fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    let Some(raw) = raw else {
        return default;
    };
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None, 12), 12);
        assert_eq!(parse_limit(Some("24"), 12), 24);
        assert_eq!(parse_limit(Some(" 15abc"), 12), 15);
        assert_eq!(parse_limit(Some("abc"), 12), 12);
        assert_eq!(parse_limit(Some(""), 12), 12);
        assert_eq!(parse_limit(Some("0"), 12), 12);
        assert_eq!(parse_limit(Some("-5"), 12), 12);
        assert_eq!(parse_limit(Some("99999999999999999999999"), 12), 12);
    }
}
