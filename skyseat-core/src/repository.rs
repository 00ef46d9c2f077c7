use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::flight::{FlightKey, FlightSnapshot};
use crate::order::Order;

/// Read access to the externally owned flight catalog.
#[async_trait]
pub trait FlightCatalog: Send + Sync {
    /// `Ok(None)` when the catalog has no (non-deleted) flight under this id.
    async fn get_flight(&self, public_id: &str) -> CoreResult<Option<FlightSnapshot>>;

    /// Resolve the storage key orders for this flight are scoped by.
    async fn resolve_storage_key(&self, public_id: &str) -> CoreResult<Option<FlightKey>>;

    /// Last price observed for the flight, if the implementation keeps one.
    async fn last_known_price(&self, _public_id: &str) -> CoreResult<Option<BigDecimal>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerIdentity {
    pub id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub identity_card_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub passenger: PassengerIdentity,
    pub generated_password: Option<String>,
}

/// External user service, used by admin-assisted booking only.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn find_by_identity(&self, identity_card_number: &str) -> CoreResult<Option<PassengerIdentity>>;

    async fn register(&self, identity_card_number: &str, display_name: &str) -> CoreResult<Registration>;
}

/// Persistent order store. The only shared mutable resource of the system.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fails with `CoreError::SeatTaken` when another non-cancelled order holds
    /// the same `(flight_key, seat)`.
    async fn insert_order(&self, order: &Order) -> CoreResult<()>;

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>>;

    async fn count_active_orders(&self, flight_key: &FlightKey) -> CoreResult<u32>;

    async fn taken_seats(&self, flight_key: &FlightKey) -> CoreResult<Vec<u32>>;

    /// Newest first.
    async fn list_orders_for_passenger(&self, passenger_id: &str) -> CoreResult<Vec<Order>>;

    /// Newest first.
    async fn list_all_orders(&self) -> CoreResult<Vec<Order>>;

    /// Set price and `is_paid` only if the order is still unpaid and not
    /// cancelled. Returns whether the row changed.
    async fn mark_paid(&self, id: Uuid, price: &BigDecimal) -> CoreResult<bool>;

    /// Set `is_cancelled` only if the order is paid and not yet cancelled.
    /// Returns whether the row changed.
    async fn mark_cancelled(&self, id: Uuid) -> CoreResult<bool>;

    async fn record_flight_key(&self, flight_key: &FlightKey, public_id: &str) -> CoreResult<()>;

    async fn public_flight_id(&self, flight_key: &FlightKey) -> CoreResult<Option<String>>;
}
