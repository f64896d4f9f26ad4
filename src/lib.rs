//! Football Lineup Designer Backend
//!
//! A REST backend with SQLite persistence for designing football team
//! compositions: named formations with players placed at normalized field
//! coordinates, owned per user, exportable as a printable PDF.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod draft;
pub mod errors;
pub mod export;
pub mod geometry;
pub mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::TokenService;
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub tokens: TokenService,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone the token service for the auth layer
    let tokens = state.tokens.clone();

    // Routes requiring a valid bearer token
    let protected_routes = Router::new()
        // Compositions
        .route("/compositions", get(api::list_compositions))
        .route("/compositions", post(api::create_composition))
        .route("/compositions/{id}", get(api::get_composition))
        .route("/compositions/{id}", put(api::update_composition))
        .route("/compositions/{id}", delete(api::delete_composition))
        .route("/compositions/{id}/export", get(api::export_composition))
        // Profile
        .route("/profile", get(api::get_profile))
        .route("/profile", put(api::update_profile))
        // Apply bearer auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::bearer_auth_layer(tokens.clone(), req, next)
        }));

    // Credential endpoints (no auth required)
    let auth_routes = Router::new()
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/auth/refresh", post(api::refresh));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", auth_routes.merge(protected_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
