use chrono::Utc;
use skyseat_core::{CoreError, CoreResult, FlightCatalog, FlightKey, FlightSnapshot, Order, OrderRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::BoundedCatalog;
use crate::ledger::{SeatLedger, SeatMap};

/// Turns a booking request into a persisted order.
///
/// Sequence: catalog lookup, bookability, storage key resolution, capacity
/// count, seat allocation, key directory upsert, insert. Nothing is retried here; after a conflict
/// the caller should re-query seats.
pub struct BookingCoordinator {
    catalog: BoundedCatalog,
    orders: Arc<dyn OrderRepository>,
    ledger: SeatLedger,
}

impl BookingCoordinator {
    pub fn new(
        catalog: Arc<dyn FlightCatalog>,
        orders: Arc<dyn OrderRepository>,
        catalog_timeout: Duration,
    ) -> Self {
        Self {
            catalog: BoundedCatalog::new(catalog, catalog_timeout),
            ledger: SeatLedger::new(orders.clone()),
            orders,
        }
    }

    pub async fn book_flight(
        &self,
        flight_public_id: &str,
        passenger_id: &str,
        requested_seat: Option<i64>,
    ) -> CoreResult<Uuid> {
        if flight_public_id.trim().is_empty() {
            return Err(CoreError::Validation("Flight ID is required".to_string()));
        }
        if passenger_id.trim().is_empty() {
            return Err(CoreError::Validation("Passenger is required".to_string()));
        }

        // 1. Catalog lookup
        let flight = self.load_flight(flight_public_id).await?;

        // 2. Bookability
        if !flight.is_bookable(Utc::now()) {
            return Err(CoreError::FlightNotBookable(flight.id));
        }

        // 3. Bridge public id -> storage key
        let flight_key = self.resolve_key(flight_public_id).await?;

        // 4. Capacity
        let active = self.orders.count_active_orders(&flight_key).await?;
        if active >= flight.capacity {
            debug!(flight = %flight.id, active, capacity = flight.capacity, "flight full");
            return Err(CoreError::FlightFull(flight.id));
        }

        // 5. Seat
        let seat = self
            .ledger
            .allocate_seat(&flight_key, flight.capacity, requested_seat)
            .await
            .map_err(|e| match e {
                CoreError::NoSeatsAvailable(_) => CoreError::NoSeatsAvailable(flight.id.clone()),
                other => other,
            })?;

        // 6. Key directory before the insert, so every stored order maps back
        // to a public flight id. Idempotent upsert.
        self.orders.record_flight_key(&flight_key, &flight.id).await?;

        // 7. Persist; the store's uniqueness constraint is the final arbiter
        let order = Order::new(flight_key.clone(), passenger_id.to_string(), seat);
        if let Err(e) = self.orders.insert_order(&order).await {
            if matches!(e, CoreError::SeatTaken(_)) {
                info!(flight = %flight.id, seat, "seat lost to a concurrent booking");
            }
            return Err(e);
        }
        info!(order_id = %order.id, flight = %flight.id, seat, passenger = passenger_id, "order created");

        self.recheck_capacity(&flight.id, &flight_key).await;

        Ok(order.id)
    }

    pub async fn seat_map(&self, flight_public_id: &str) -> CoreResult<SeatMap> {
        let flight = self.load_flight(flight_public_id).await?;
        let flight_key = self.resolve_key(flight_public_id).await?;
        self.ledger.seat_map(&flight_key, flight.capacity).await
    }

    async fn load_flight(&self, flight_public_id: &str) -> CoreResult<FlightSnapshot> {
        match self.catalog.get_flight(flight_public_id).await {
            Ok(Some(flight)) if !flight.is_deleted => Ok(flight),
            Ok(_) => Err(CoreError::FlightNotFound(flight_public_id.to_string())),
            Err(e) => {
                warn!(flight = flight_public_id, error = %e, "catalog lookup failed");
                Err(e)
            }
        }
    }

    async fn resolve_key(&self, flight_public_id: &str) -> CoreResult<FlightKey> {
        self.catalog
            .resolve_storage_key(flight_public_id)
            .await
            .inspect_err(|e| warn!(flight = flight_public_id, error = %e, "storage key lookup failed"))?
            .ok_or_else(|| CoreError::FlightKeyUnresolved(flight_public_id.to_string()))
    }

    /// Compares the active count against the catalog's current capacity,
    /// which may have shrunk since step 1. Reports, does not compensate.
    /// Returns whether the flight is oversold.
    async fn recheck_capacity(&self, flight_public_id: &str, flight_key: &FlightKey) -> bool {
        let capacity = match self.catalog.get_flight(flight_public_id).await {
            Ok(Some(live)) => live.capacity,
            Ok(None) => return false,
            Err(e) => {
                warn!(flight = flight_public_id, error = %e, "post-booking capacity check skipped");
                return false;
            }
        };
        match self.orders.count_active_orders(flight_key).await {
            Ok(active) if active > capacity => {
                warn!(flight = flight_public_id, active, capacity, "flight oversold");
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(flight = flight_public_id, error = %e, "post-booking capacity check failed");
                false
            }
        }
    }
}
