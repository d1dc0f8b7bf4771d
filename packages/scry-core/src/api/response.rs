//! JSON response helpers shared by the HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// 200 OK with a JSON body.
pub fn api_success<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// Presents a discovery outcome: 200 with the JSON encoding when devices
/// were found, 204 with no body when the scan came back empty.
pub fn devices_response<T: Serialize>(devices: Option<T>) -> Response {
    match devices {
        Some(body) => api_success(body),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_outcome_is_204() {
        let response = devices_response::<Vec<String>>(None);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn non_empty_outcome_is_200_json() {
        let response = devices_response(Some(vec!["a".to_string()]));
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("application/json"));
    }
}
