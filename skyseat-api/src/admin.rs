use axum::{extract::State, http::StatusCode, Extension, Json};
use skyseat_core::{Caller, OrderView};
use skyseat_order::{AdminBookingOutcome, AdminBookingRequest};

use crate::error::AppError;
use crate::state::AppState;

/// GET /orders/admin/all
pub async fn list_all_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    Ok(Json(state.orders.list_all(&caller).await?))
}

/// POST /admin/bookings
/// Book on behalf of a passenger identified by identity card number,
/// registering them first when unknown.
pub async fn book_for_passenger(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<AdminBookingRequest>,
) -> Result<(StatusCode, Json<AdminBookingOutcome>), AppError> {
    let outcome = state.admin_booking.book_for_passenger(&caller, &req).await?;
    tracing::info!(
        "Admin {} booked order {} for passenger {}",
        caller.user_id,
        outcome.order_id,
        outcome.passenger_id
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}
