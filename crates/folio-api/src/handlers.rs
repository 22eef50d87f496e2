//! REST API handlers.
//!
//! Bodies are read as raw bytes and parsed here so that empty and
//! malformed JSON get the same envelope as every other validation error.

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_core::Document;
use folio_engine::{EngineError, FieldErrors, GENERAL_OTHER, validate_keys};
use serde_json::Value as Json;

use crate::ApiState;
use crate::auth::BAD_PASSWORD;
use crate::response::{ApiError, ResponseMessage};

type ApiResult = Result<Response, ApiError>;

fn bad_body(message: impl Into<String>, fields: FieldErrors) -> EngineError {
    EngineError::Validation {
        message: message.into(),
        fields,
    }
}

/// Parse a request body into a document.
pub fn parse_body(body: &[u8]) -> Result<Document, EngineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(bad_body("No body was provided", FieldErrors::new()));
    }
    let json: Json = serde_json::from_slice(body)
        .map_err(|e| bad_body(format!("Invalid Syntax: {e}"), FieldErrors::new()))?;
    Document::from_json(json).map_err(|e| {
        bad_body(
            "Invalid Syntax",
            FieldErrors::from([(GENERAL_OTHER.to_string(), e.to_string())]),
        )
    })
}

fn documents(docs: impl IntoIterator<Item = Document>) -> Json {
    Json::Array(docs.into_iter().map(|doc| doc.to_json()).collect())
}

// ── Auth ───────────────────────────────────────────────────────

/// POST /login
pub async fn login(State(state): State<ApiState>, body: Bytes) -> ApiResult {
    let body = parse_body(&body)?;
    validate_keys(&body, ["pass"]).map_err(EngineError::validation)?;
    let Some(password) = body.get_str("pass") else {
        return Err(bad_body(
            "Password must be a string",
            FieldErrors::from([("pass".to_string(), "Must be a string".to_string())]),
        )
        .into());
    };
    if !state.auth.check(password.to_string()).await {
        return Err(ApiError::Unauthorized(BAD_PASSWORD));
    }
    Ok(ResponseMessage::ok("Logged in successfully").into_response())
}

// ── Collections ────────────────────────────────────────────────

/// GET /collections
pub async fn list_collections(State(state): State<ApiState>) -> ApiResult {
    let defs = state.engine.registry().list().await?;
    let views = defs.iter().map(|def| def.view());
    Ok(ResponseMessage::data(documents(views)).into_response())
}

/// GET /collections/{path}
pub async fn get_collection(State(state): State<ApiState>, Path(path): Path<String>) -> ApiResult {
    let def = state.engine.registry().get(&path).await?;
    Ok(ResponseMessage::data(def.view().to_json()).into_response())
}

/// POST /collections
pub async fn create_collection(State(state): State<ApiState>, body: Bytes) -> ApiResult {
    let body = parse_body(&body)?;
    let def = state.engine.registry().define(&body).await?;
    let response = ResponseMessage::ok("Created collection successfully")
        .with_data(def.view().to_json());
    Ok((StatusCode::CREATED, response).into_response())
}

/// PUT /collections/{path}
pub async fn update_collection(
    State(state): State<ApiState>,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let def = state.engine.registry().update(&path, &body).await?;
    Ok(ResponseMessage::ok(format!("Updated collection with path ({path})"))
        .with_data(def.view().to_json())
        .into_response())
}

/// DELETE /collections/{path}
pub async fn delete_collection(
    State(state): State<ApiState>,
    Path(path): Path<String>,
) -> ApiResult {
    state.engine.registry().remove(&path).await?;
    Ok(ResponseMessage::ok(format!("Deleted collection {path:?} successfully")).into_response())
}

// ── Records ────────────────────────────────────────────────────

/// GET /{path}
pub async fn list_records(State(state): State<ApiState>, Path(path): Path<String>) -> ApiResult {
    let records = state.engine.records().list(&path).await?;
    Ok(ResponseMessage::data(documents(records)).into_response())
}

/// GET /{path}/{id}
pub async fn get_record(
    State(state): State<ApiState>,
    Path((path, id)): Path<(String, String)>,
) -> ApiResult {
    let record = state.engine.records().get(&path, &id).await?;
    Ok(ResponseMessage::data(record.to_json()).into_response())
}

/// POST /{path}
pub async fn create_record(
    State(state): State<ApiState>,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let written = state.engine.records().create(&path, body).await?;
    let response = ResponseMessage::ok("Created document successfully")
        .with_data(written.record.to_json())
        .with_media_failures(written.media_failures);
    Ok((StatusCode::CREATED, response).into_response())
}

/// PUT /{path}/{id}
pub async fn update_record(
    State(state): State<ApiState>,
    Path((path, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult {
    let body = parse_body(&body)?;
    let written = state.engine.records().update(&path, &id, body).await?;
    Ok(
        ResponseMessage::ok(format!("Updated document with id ({id}) in collection ({path})"))
            .with_data(written.record.to_json())
            .with_media_failures(written.media_failures)
            .into_response(),
    )
}

/// DELETE /{path}/{id}
pub async fn delete_record(
    State(state): State<ApiState>,
    Path((path, id)): Path<(String, String)>,
) -> ApiResult {
    state.engine.records().delete(&path, &id).await?;
    Ok(
        ResponseMessage::ok(format!("Deleted document with id ({id}) in collection ({path})"))
            .into_response(),
    )
}

/// Any route that did not match.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}
