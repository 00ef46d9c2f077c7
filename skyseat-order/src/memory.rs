use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use skyseat_core::{CoreError, CoreResult, FlightCatalog, FlightKey, FlightSnapshot, Order, OrderRepository};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct OrderTable {
    orders: HashMap<Uuid, Order>,
    flight_keys: HashMap<FlightKey, String>,
}

/// Process-local order store. Enforces the same active-seat uniqueness rule
/// as the Postgres partial index, under a single write lock.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    table: RwLock<OrderTable>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert_order(&self, order: &Order) -> CoreResult<()> {
        let mut table = self.table.write().await;
        let clash = table.orders.values().any(|o| {
            !o.is_cancelled && o.flight_key == order.flight_key && o.seat == order.seat
        });
        if clash {
            return Err(CoreError::SeatTaken(order.seat));
        }
        if table.orders.contains_key(&order.id) {
            return Err(CoreError::Storage(format!("duplicate order id {}", order.id)));
        }
        table.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<Order>> {
        Ok(self.table.read().await.orders.get(&id).cloned())
    }

    async fn count_active_orders(&self, flight_key: &FlightKey) -> CoreResult<u32> {
        let table = self.table.read().await;
        let count = table
            .orders
            .values()
            .filter(|o| !o.is_cancelled && &o.flight_key == flight_key)
            .count();
        Ok(count as u32)
    }

    async fn taken_seats(&self, flight_key: &FlightKey) -> CoreResult<Vec<u32>> {
        let table = self.table.read().await;
        Ok(table
            .orders
            .values()
            .filter(|o| !o.is_cancelled && &o.flight_key == flight_key)
            .map(|o| o.seat)
            .collect())
    }

    async fn list_orders_for_passenger(&self, passenger_id: &str) -> CoreResult<Vec<Order>> {
        let table = self.table.read().await;
        let orders = table
            .orders
            .values()
            .filter(|o| o.passenger_id == passenger_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(orders))
    }

    async fn list_all_orders(&self) -> CoreResult<Vec<Order>> {
        let table = self.table.read().await;
        Ok(Self::newest_first(table.orders.values().cloned().collect()))
    }

    async fn mark_paid(&self, id: Uuid, price: &BigDecimal) -> CoreResult<bool> {
        let mut table = self.table.write().await;
        match table.orders.get_mut(&id) {
            Some(order) if !order.is_paid && !order.is_cancelled => {
                order.mark_paid(price.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_cancelled(&self, id: Uuid) -> CoreResult<bool> {
        let mut table = self.table.write().await;
        match table.orders.get_mut(&id) {
            Some(order) if order.is_paid && !order.is_cancelled => {
                order.mark_cancelled();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_flight_key(&self, flight_key: &FlightKey, public_id: &str) -> CoreResult<()> {
        let mut table = self.table.write().await;
        table.flight_keys.insert(flight_key.clone(), public_id.to_string());
        Ok(())
    }

    async fn public_flight_id(&self, flight_key: &FlightKey) -> CoreResult<Option<String>> {
        Ok(self.table.read().await.flight_keys.get(flight_key).cloned())
    }
}

struct CatalogEntry {
    key: FlightKey,
    flight: FlightSnapshot,
}

/// Mutable stand-in for the flight catalog service.
#[derive(Default)]
pub struct InMemoryFlightCatalog {
    flights: RwLock<HashMap<String, CatalogEntry>>,
    last_prices: RwLock<HashMap<String, BigDecimal>>,
    delay: RwLock<Option<Duration>>,
    offline: AtomicBool,
}

impl InMemoryFlightCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_flight(&self, key: FlightKey, flight: FlightSnapshot) {
        self.flights
            .write()
            .await
            .insert(flight.id.clone(), CatalogEntry { key, flight });
    }

    pub async fn set_price(&self, public_id: &str, price: BigDecimal) {
        if let Some(entry) = self.flights.write().await.get_mut(public_id) {
            entry.flight.price = price;
        }
    }

    pub async fn set_departure(&self, public_id: &str, departure_time: DateTime<Utc>) {
        if let Some(entry) = self.flights.write().await.get_mut(public_id) {
            entry.flight.departure_time = departure_time;
        }
    }

    pub async fn set_capacity(&self, public_id: &str, capacity: u32) {
        if let Some(entry) = self.flights.write().await.get_mut(public_id) {
            entry.flight.capacity = capacity;
        }
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    async fn reachable(&self) -> CoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::CatalogUnavailable("catalog offline".to_string()));
        }
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl FlightCatalog for InMemoryFlightCatalog {
    async fn get_flight(&self, public_id: &str) -> CoreResult<Option<FlightSnapshot>> {
        self.reachable().await?;
        let flight = self
            .flights
            .read()
            .await
            .get(public_id)
            .filter(|e| !e.flight.is_deleted)
            .map(|e| e.flight.clone());
        if let Some(f) = &flight {
            self.last_prices
                .write()
                .await
                .insert(f.id.clone(), f.price.clone());
        }
        Ok(flight)
    }

    async fn resolve_storage_key(&self, public_id: &str) -> CoreResult<Option<FlightKey>> {
        self.reachable().await?;
        Ok(self.flights.read().await.get(public_id).map(|e| e.key.clone()))
    }

    async fn last_known_price(&self, public_id: &str) -> CoreResult<Option<BigDecimal>> {
        Ok(self.last_prices.read().await.get(public_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_active_seat_is_unique() {
        let repo = InMemoryOrderRepository::new();
        let key = FlightKey::new("k1");
        repo.insert_order(&Order::new(key.clone(), "p1".into(), 3)).await.unwrap();

        let err = repo
            .insert_order(&Order::new(key.clone(), "p2".into(), 3))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SeatTaken(3)));

        // Same seat on another flight is fine.
        repo.insert_order(&Order::new(FlightKey::new("k2"), "p2".into(), 3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_seat_can_be_resold() {
        let repo = InMemoryOrderRepository::new();
        let key = FlightKey::new("k1");
        let first = Order::new(key.clone(), "p1".into(), 1);
        repo.insert_order(&first).await.unwrap();
        assert!(repo.mark_paid(first.id, &BigDecimal::from(10)).await.unwrap());
        assert!(repo.mark_cancelled(first.id).await.unwrap());

        repo.insert_order(&Order::new(key.clone(), "p2".into(), 1)).await.unwrap();
        assert_eq!(repo.count_active_orders(&key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_flag_updates_are_conditional() {
        let repo = InMemoryOrderRepository::new();
        let order = Order::new(FlightKey::new("k1"), "p1".into(), 1);
        repo.insert_order(&order).await.unwrap();

        assert!(!repo.mark_cancelled(order.id).await.unwrap());
        assert!(repo.mark_paid(order.id, &BigDecimal::from(100)).await.unwrap());
        assert!(!repo.mark_paid(order.id, &BigDecimal::from(999)).await.unwrap());

        let stored = repo.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.price, Some(BigDecimal::from(100)));
    }
}
