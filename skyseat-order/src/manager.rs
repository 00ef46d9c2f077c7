use chrono::Utc;
use futures_util::future::try_join_all;
use skyseat_core::{
    Caller, CoreError, CoreResult, FlightCatalog, FlightSnapshot, Order, OrderRepository, OrderView,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::BoundedCatalog;

/// Manages order lifecycle and state transitions.
///
/// Status is derived on every read from the stored flags and freshly fetched
/// schedule data; nothing derived is ever written back.
pub struct OrderManager {
    catalog: BoundedCatalog,
    orders: Arc<dyn OrderRepository>,
}

impl OrderManager {
    pub fn new(
        catalog: Arc<dyn FlightCatalog>,
        orders: Arc<dyn OrderRepository>,
        catalog_timeout: Duration,
    ) -> Self {
        Self {
            catalog: BoundedCatalog::new(catalog, catalog_timeout),
            orders,
        }
    }

    pub async fn get_order(&self, id: Uuid, caller: &Caller) -> CoreResult<OrderView> {
        let order = self.load(id).await?;
        if !caller.can_view(&order) {
            return Err(CoreError::Forbidden(format!("order {id}")));
        }
        self.render(&order).await
    }

    pub async fn list_for_passenger(&self, caller: &Caller) -> CoreResult<Vec<OrderView>> {
        let orders = self.orders.list_orders_for_passenger(&caller.user_id).await?;
        try_join_all(orders.iter().map(|o| self.render(o))).await
    }

    pub async fn list_all(&self, caller: &Caller) -> CoreResult<Vec<OrderView>> {
        if !caller.is_admin() {
            return Err(CoreError::Forbidden("Admin only".to_string()));
        }
        let orders = self.orders.list_all_orders().await?;
        try_join_all(orders.iter().map(|o| self.render(o))).await
    }

    /// Transition: UNPAID -> PAID, price frozen at the live catalog price.
    pub async fn pay(&self, id: Uuid, caller: &Caller) -> CoreResult<Order> {
        let mut order = self.load(id).await?;
        if !caller.owns(&order) {
            return Err(CoreError::Forbidden(format!("order {id}")));
        }
        // Paid or cancelled orders are rejected without touching the catalog.
        order.ensure_payable(None, Utc::now())?;

        // Payment needs confirmed schedule and price, never a cached one.
        let flight = self.live_flight(&order).await?;
        order.ensure_payable(Some(&flight), Utc::now())?;

        if !self.orders.mark_paid(id, &flight.price).await? {
            let latest = self.load(id).await?;
            return Err(CoreError::InvalidStateTransition {
                from: latest.status(Some(&flight), Utc::now()).to_string(),
                action: "pay".to_string(),
            });
        }

        order.mark_paid(flight.price.clone());
        info!(order_id = %id, price = %flight.price, "order paid");
        Ok(order)
    }

    /// Transition: PAID -> CANCELLED.
    pub async fn cancel(&self, id: Uuid, caller: &Caller) -> CoreResult<Order> {
        let mut order = self.load(id).await?;
        if !caller.owns(&order) {
            return Err(CoreError::Forbidden(format!("order {id}")));
        }
        // PAID outranks EXPIRED, so schedule data cannot change the answer.
        order.ensure_cancellable(None, Utc::now())?;

        if !self.orders.mark_cancelled(id).await? {
            let latest = self.load(id).await?;
            return Err(CoreError::InvalidStateTransition {
                from: latest.status(None, Utc::now()).to_string(),
                action: "cancel".to_string(),
            });
        }

        order.mark_cancelled();
        info!(order_id = %id, seat = order.seat, "order cancelled");
        Ok(order)
    }

    async fn load(&self, id: Uuid) -> CoreResult<Order> {
        self.orders
            .get_order(id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))
    }

    async fn live_flight(&self, order: &Order) -> CoreResult<FlightSnapshot> {
        let public_id = self
            .orders
            .public_flight_id(&order.flight_key)
            .await?
            .ok_or_else(|| CoreError::FlightDataUnavailable(format!("flight key {}", order.flight_key)))?;
        self.catalog
            .get_flight(&public_id)
            .await?
            .ok_or(CoreError::FlightDataUnavailable(public_id))
    }

    /// Catalog failures degrade to "no flight data": the order is shown as
    /// UNPAID rather than EXPIRED and its price may be null.
    pub async fn render(&self, order: &Order) -> CoreResult<OrderView> {
        let public_id = self.orders.public_flight_id(&order.flight_key).await?;

        let flight = match &public_id {
            Some(id) => self.catalog.get_flight(id).await.unwrap_or_else(|e| {
                warn!(order_id = %order.id, flight = %id, error = %e, "rendering order without flight data");
                None
            }),
            None => None,
        };

        let last_known = match (&flight, &public_id) {
            (None, Some(id)) => self.catalog.last_known_price(id).await.unwrap_or_else(|e| {
                warn!(flight = %id, error = %e, "last known price unavailable");
                None
            }),
            _ => None,
        };

        Ok(OrderView::render(order, flight.as_ref(), last_known.as_ref(), Utc::now()))
    }
}
