use async_trait::async_trait;
use bigdecimal::BigDecimal;
use skyseat_core::{CoreError, CoreResult, FlightCatalog, FlightKey, FlightSnapshot};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Puts a hard deadline on every catalog call. Booking never proceeds on
/// unconfirmed flight data, so an expired deadline is `CatalogUnavailable`.
#[derive(Clone)]
pub struct BoundedCatalog {
    inner: Arc<dyn FlightCatalog>,
    timeout: Duration,
}

impl BoundedCatalog {
    pub fn new(inner: Arc<dyn FlightCatalog>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, call: impl Future<Output = CoreResult<T>>) -> CoreResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::CatalogUnavailable(format!(
                "no response within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl FlightCatalog for BoundedCatalog {
    async fn get_flight(&self, public_id: &str) -> CoreResult<Option<FlightSnapshot>> {
        self.bounded(self.inner.get_flight(public_id)).await
    }

    async fn resolve_storage_key(&self, public_id: &str) -> CoreResult<Option<FlightKey>> {
        self.bounded(self.inner.resolve_storage_key(public_id)).await
    }

    async fn last_known_price(&self, public_id: &str) -> CoreResult<Option<BigDecimal>> {
        self.bounded(self.inner.last_known_price(public_id)).await
    }
}
