//! folio-api: REST API for Folio.
//!
//! Provides axum route handlers for collection definitions and their
//! records. Every route is mounted under a configurable prefix
//! (`/v1/api` by default).
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/login` | Check the admin password |
//! | GET | `/collections` | List collection definitions |
//! | POST | `/collections` | Define a collection |
//! | GET | `/collections/{path}` | Get a definition |
//! | PUT | `/collections/{path}` | Rename or re-declare a collection |
//! | DELETE | `/collections/{path}` | Remove a collection and its records |
//! | GET | `/{path}` | List records |
//! | POST | `/{path}` | Create a record |
//! | GET | `/{path}/{id}` | Get a record |
//! | PUT | `/{path}/{id}` | Update a record |
//! | DELETE | `/{path}/{id}` | Delete a record |
//!
//! Every non-GET route except `/login` requires the admin password in the
//! `Authorization` header.

pub mod auth;
pub mod handlers;
pub mod response;

use axum::Router;
use axum::http::Method;
use axum::middleware;
use axum::routing::{get, post};
use folio_engine::Engine;
use tower_http::cors::{self, CorsLayer};

pub use auth::{AuthError, Authenticator, hash_password};
pub use response::{ApiError, ResponseMessage, Status};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Engine,
    pub auth: Authenticator,
}

/// Build the complete API router, mounted under `prefix`.
pub fn build_router(state: ApiState, prefix: &str) -> Router {
    let guarded = Router::new()
        .route(
            "/collections",
            get(handlers::list_collections).post(handlers::create_collection),
        )
        .route(
            "/collections/{path}",
            get(handlers::get_collection)
                .put(handlers::update_collection)
                .delete(handlers::delete_collection),
        )
        .route(
            "/{path}",
            get(handlers::list_records).post(handlers::create_record),
        )
        .route(
            "/{path}/{id}",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api_routes = Router::new()
        .route("/login", post(handlers::login))
        .merge(guarded)
        .with_state(state);

    let prefix = prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        Router::new().merge(api_routes)
    } else {
        Router::new().nest(prefix, api_routes)
    };

    router.fallback(handlers::not_found).layer(cors_layer())
}

/// Any origin may call the API. Preflights are answered before routing.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(cors::Any)
}
