//! The JSON envelope every route answers with, and the mapping from
//! engine errors to HTTP status codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_engine::{EngineError, FieldFailure};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// `{status, message?, data?}`. Record writes add `mediaFailures` when an
/// inline image could not be moved to the blob store.
#[derive(Debug, Serialize)]
pub struct ResponseMessage {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(rename = "mediaFailures", skip_serializing_if = "Vec::is_empty")]
    pub media_failures: Vec<FieldFailure>,
}

impl ResponseMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: Some(message.into()),
            data: None,
            media_failures: Vec::new(),
        }
    }

    /// A success carrying only a payload.
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            status: Status::Ok,
            message: None,
            data: Some(data),
            media_failures: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_media_failures(mut self, failures: Vec<FieldFailure>) -> Self {
        self.media_failures = failures;
        self
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: None,
            media_failures: Vec::new(),
        }
    }
}

impl IntoResponse for ResponseMessage {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Request not found for {0:?}")]
    RouteNotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::Validation { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::Conflict { .. }) => StatusCode::CONFLICT,
            ApiError::Engine(EngineError::NotFound(_)) | ApiError::RouteNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Engine(EngineError::Storage(_) | EngineError::Config(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let mut body = ResponseMessage::error(self.to_string());
        if let ApiError::Engine(e) = &self {
            body.data = e
                .fields()
                .filter(|fields| !fields.is_empty())
                .and_then(|fields| serde_json::to_value(fields).ok());
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_engine::FieldErrors;
    use serde_json::json;

    #[test]
    fn envelope_omits_empty_parts() {
        let json = serde_json::to_value(ResponseMessage::ok("done")).unwrap();
        assert_eq!(json, json!({ "status": "ok", "message": "done" }));

        let json = serde_json::to_value(ResponseMessage::data(json!([1, 2]))).unwrap();
        assert_eq!(json, json!({ "status": "ok", "data": [1, 2] }));
    }

    #[test]
    fn media_failures_are_reported_when_present() {
        let body = ResponseMessage::ok("saved").with_media_failures(vec![FieldFailure {
            field: "cover".to_string(),
            error: "bad base64".to_string(),
        }]);
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json["mediaFailures"],
            json!([{ "field": "cover", "error": "bad base64" }])
        );
    }

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (ApiError::from(EngineError::invalid("name", "x")), StatusCode::BAD_REQUEST),
            (ApiError::from(EngineError::conflict("name", "must be unique")), StatusCode::CONFLICT),
            (ApiError::from(EngineError::collection_not_found()), StatusCode::NOT_FOUND),
            (ApiError::from(EngineError::Storage("timeout".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Unauthorized("Bad password"), StatusCode::UNAUTHORIZED),
            (ApiError::RouteNotFound("/nope".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }

    #[test]
    fn route_not_found_quotes_the_path() {
        assert_eq!(
            ApiError::RouteNotFound("/v1/api/a/b/c".into()).to_string(),
            r#"Request not found for "/v1/api/a/b/c""#
        );
    }

    #[test]
    fn validation_fields_become_data() {
        let err = ApiError::from(EngineError::validation(FieldErrors::from([(
            "name".to_string(),
            "Is required".to_string(),
        )])));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
