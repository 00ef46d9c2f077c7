use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use skyseat_core::{Caller, CoreError, OrderView};
use skyseat_order::SeatMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub flight_id: String,
    #[serde(default)]
    pub seat: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OrderUpdateResponse {
    pub message: String,
    pub order: OrderView,
}

fn parse_order_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| CoreError::Validation(format!("Invalid order id: {raw}")).into())
}

/// POST /orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let order_id = state
        .coordinator
        .book_flight(&req.flight_id, &caller.user_id, req.seat)
        .await?;

    Ok((StatusCode::CREATED, Json(CreateOrderResponse { order_id })))
}

/// GET /orders/passenger
pub async fn list_passenger_orders(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    Ok(Json(state.orders.list_for_passenger(&caller).await?))
}

/// GET /orders/flight/{flightId}/seats
pub async fn seat_map(
    State(state): State<AppState>,
    Path(flight_id): Path<String>,
) -> Result<Json<SeatMap>, AppError> {
    Ok(Json(state.coordinator.seat_map(&flight_id).await?))
}

/// GET /orders/{orderId}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderView>, AppError> {
    let id = parse_order_id(&order_id)?;
    Ok(Json(state.orders.get_order(id, &caller).await?))
}

/// PATCH /orders/{orderId}/pay
pub async fn pay_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderUpdateResponse>, AppError> {
    let id = parse_order_id(&order_id)?;
    let order = state.orders.pay(id, &caller).await?;
    let order = state.orders.render(&order).await?;
    Ok(Json(OrderUpdateResponse { message: "Payment successful".into(), order }))
}

/// PATCH /orders/{orderId}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderUpdateResponse>, AppError> {
    let id = parse_order_id(&order_id)?;
    let order = state.orders.cancel(id, &caller).await?;
    let order = state.orders.render(&order).await?;
    Ok(Json(OrderUpdateResponse { message: "Order cancelled".into(), order }))
}
