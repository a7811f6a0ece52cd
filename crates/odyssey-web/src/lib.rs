//! OdysseyMaker web server: JSON API, HTML UI, and startup wiring.

pub mod config;
pub mod error;
pub mod form;
pub mod render;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full router: health, the HTML UI at the root, and the JSON API
/// under `/api/v1`.
pub fn app(state: AppState) -> Router {
    // TODO: read allowed origins from ServerConfig instead of allowing any.
    Router::new()
        .merge(routes::health::router())
        .merge(routes::ui::router())
        .nest(
            "/api/v1",
            routes::outline::router().merge(routes::sessions::router()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
