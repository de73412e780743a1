use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{handlers, state::AppState};

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // Portfolio endpoints
        .route(
            "/portfolios",
            get(handlers::list_portfolios).post(handlers::create_portfolio),
        )
        .route("/portfolios/:uuid", get(handlers::get_portfolio))
        // Strategy endpoints
        .route("/execute-strategy", post(handlers::execute_strategy))
        .route("/executions/:id", get(handlers::get_execution))
        .route("/state", get(handlers::get_state))
        // Funds
        .route("/transfer-funds", post(handlers::transfer))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
