use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod state;

pub use state::AppState;

use middleware::{admin_auth_middleware, caller_auth_middleware, rate_limit_middleware};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let caller_routes = Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/passenger", get(orders::list_passenger_orders))
        .route("/orders/flight/{flight_id}/seats", get(orders::seat_map))
        .route("/orders/{order_id}", get(orders::get_order))
        .route("/orders/{order_id}/pay", patch(orders::pay_order))
        .route("/orders/{order_id}/cancel", patch(orders::cancel_order))
        .route_layer(from_fn_with_state(state.clone(), caller_auth_middleware));

    let admin_routes = Router::new()
        .route("/orders/admin/all", get(admin::list_all_orders))
        .route("/admin/bookings", post(admin::book_for_passenger))
        .route_layer(from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(caller_routes)
        .merge(admin_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
