use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use skyseat_core::{CoreError, CoreResult, FlightCatalog, FlightKey, FlightSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::redis_repo::RedisClient;
use crate::resiliency::CircuitBreaker;

/// Flight Catalog over HTTP (`GET {base}/flights/{id}`).
///
/// Every request is bounded by the client timeout and guarded by a circuit
/// breaker. Prices seen on successful reads are cached in Redis, when
/// configured, for display during catalog outages.
pub struct HttpFlightCatalog {
    http: reqwest::Client,
    base_url: Url,
    breaker: CircuitBreaker,
    redis: Option<Arc<RedisClient>>,
}

impl HttpFlightCatalog {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        breaker: CircuitBreaker,
        redis: Option<Arc<RedisClient>>,
    ) -> CoreResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CoreError::Validation(format!("invalid catalog url {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::CatalogUnavailable(e.to_string()))?;

        Ok(Self { http, base_url, breaker, redis })
    }

    fn flight_url(&self, public_id: &str) -> CoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CoreError::CatalogUnavailable(format!("catalog url {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push("flights")
            .push(public_id);
        Ok(url)
    }

    async fn fetch(&self, public_id: &str) -> CoreResult<Option<Value>> {
        if !self.breaker.check().await {
            return Err(CoreError::CatalogUnavailable(format!("circuit {} is open", self.breaker.name)));
        }

        let url = self.flight_url(public_id)?;
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                self.breaker.record_failure().await;
                let reason = if e.is_timeout() { "request timed out".to_string() } else { e.to_string() };
                return Err(CoreError::CatalogUnavailable(reason));
            }
        };

        let status = response.status();
        if status.is_server_error() {
            self.breaker.record_failure().await;
            return Err(CoreError::CatalogUnavailable(format!("catalog responded {status}")));
        }
        self.breaker.record_success().await;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CoreError::CatalogUnavailable(format!("catalog responded {status}")));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| CoreError::CatalogUnavailable(format!("malformed flight payload: {e}")))?;
        Ok(Some(body))
    }

    async fn remember_price(&self, flight: &FlightSnapshot) {
        if let Some(redis) = &self.redis {
            if let Err(e) = redis.set_last_price(&flight.id, &flight.price).await {
                debug!("Could not cache price for flight {}: {}", flight.id, e);
            }
        }
    }
}

fn parse_flight(body: Value) -> CoreResult<FlightSnapshot> {
    serde_json::from_value(body)
        .map_err(|e| CoreError::CatalogUnavailable(format!("malformed flight payload: {e}")))
}

/// The catalog exposes its internal id as `_id`, either as a bare string or
/// in extended JSON form (`{"$oid": "..."}`).
fn storage_key(body: &Value) -> Option<FlightKey> {
    match body.get("_id")? {
        Value::String(s) if !s.is_empty() => Some(FlightKey::new(s.clone())),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(FlightKey::new),
        _ => None,
    }
}

#[async_trait]
impl FlightCatalog for HttpFlightCatalog {
    async fn get_flight(&self, public_id: &str) -> CoreResult<Option<FlightSnapshot>> {
        let Some(body) = self.fetch(public_id).await? else {
            return Ok(None);
        };
        let flight = parse_flight(body)?;
        if flight.is_deleted {
            return Ok(None);
        }
        self.remember_price(&flight).await;
        Ok(Some(flight))
    }

    async fn resolve_storage_key(&self, public_id: &str) -> CoreResult<Option<FlightKey>> {
        Ok(self.fetch(public_id).await?.as_ref().and_then(storage_key))
    }

    async fn last_known_price(&self, public_id: &str) -> CoreResult<Option<BigDecimal>> {
        let Some(redis) = &self.redis else {
            return Ok(None);
        };
        match redis.get_last_price(public_id).await {
            Ok(price) => Ok(price),
            Err(e) => {
                warn!("Last known price lookup failed for {}: {}", public_id, e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(base: &str) -> HttpFlightCatalog {
        HttpFlightCatalog::new(
            base,
            Duration::from_secs(1),
            CircuitBreaker::new("catalog", 3, Duration::from_secs(30)),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_flight_url_escapes_id() {
        let c = catalog("http://flights.internal:3002/api/");
        let url = c.flight_url("VN 123/x").unwrap();
        assert_eq!(url.as_str(), "http://flights.internal:3002/api/flights/VN%20123%2Fx");
    }

    #[test]
    fn test_storage_key_forms() {
        assert_eq!(storage_key(&json!({"_id": "65f0"})), Some(FlightKey::new("65f0")));
        assert_eq!(storage_key(&json!({"_id": {"$oid": "65f1"}})), Some(FlightKey::new("65f1")));
        assert_eq!(storage_key(&json!({"id": "FL-1"})), None);
    }

    #[test]
    fn test_parse_catalog_payload() {
        let body = json!({
            "id": "FL-1",
            "_id": "65f0",
            "flightNumber": "VN123",
            "price": 129.5,
            "origin": "HAN",
            "destination": "SGN",
            "departureTime": "2030-01-01T08:00:00Z",
            "arrivalTime": "2030-01-01T10:05:00Z",
            "capacity": 180,
            "remainingSeats": 175,
            "isPublished": true
        });
        let flight = parse_flight(body).unwrap();
        assert_eq!(flight.id, "FL-1");
        assert_eq!(flight.capacity, 180);
        assert!(flight.is_published);
        assert!(!flight.is_deleted);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_trips_breaker() {
        // Nothing listens on the discard port
        let c = catalog("http://127.0.0.1:9");
        for _ in 0..3 {
            let err = c.get_flight("FL-1").await.unwrap_err();
            assert!(matches!(err, CoreError::CatalogUnavailable(_)));
        }
        let err = c.get_flight("FL-1").await.unwrap_err();
        assert!(err.to_string().contains("open"));
    }
}
