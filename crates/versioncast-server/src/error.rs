//! Error types for the HTTP layer.
//!
//! [`ApiError`] converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server is shutting down and accepts no new feed clients.
    #[error("shutting down")]
    ShuttingDown,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use serde_json::Value;

    use super::*;

    async fn body_to_json(body: Body) -> Value {
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn shutting_down_maps_to_503() {
        let response = ApiError::ShuttingDown.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = body_to_json(response.into_body()).await;
        assert_eq!(json, serde_json::json!({"error": "shutting down", "status": 503}));
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response = ApiError::NotFound("no route for /x".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "not found: no route for /x");
    }
}
