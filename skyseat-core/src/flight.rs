use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage key the order store uses to scope orders to a flight.
///
/// Distinct from the public flight id: the catalog and the order store are
/// keyed independently and only share the public id as a join point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightKey(pub String);

impl FlightKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only view of a flight as served by the flight catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSnapshot {
    pub id: String,
    #[serde(default)]
    pub flight_number: String,
    pub price: BigDecimal,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    pub capacity: u32,
    pub departure_time: DateTime<Utc>,
    #[serde(default)]
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl FlightSnapshot {
    pub fn has_departed(&self, now: DateTime<Utc>) -> bool {
        self.departure_time <= now
    }

    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.is_published && !self.is_deleted && !self.has_departed(now)
    }

    pub fn summary(&self) -> FlightSummary {
        FlightSummary {
            id: self.id.clone(),
            flight_number: self.flight_number.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            price: self.price.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSummary {
    pub id: String,
    pub flight_number: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub price: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_catalog_payload_deserializes() {
        let json = serde_json::json!({
            "id": "fl-100",
            "_id": "65f0c0ffee",
            "flightNumber": "SK100",
            "price": 129.5,
            "origin": "TPE",
            "destination": "NRT",
            "departureTime": "2030-01-01T08:00:00Z",
            "arrivalTime": "2030-01-01T12:00:00Z",
            "capacity": 180,
            "remainingSeats": 180,
            "isPublished": true
        });

        let flight: FlightSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(flight.id, "fl-100");
        assert_eq!(flight.capacity, 180);
        assert!(flight.is_published);
        assert!(!flight.is_deleted);
    }

    #[test]
    fn test_bookability_window() {
        let now = Utc::now();
        let mut flight = FlightSnapshot {
            id: "fl-1".into(),
            flight_number: "SK1".into(),
            price: BigDecimal::from(100),
            origin: None,
            destination: None,
            capacity: 2,
            departure_time: now + Duration::hours(3),
            arrival_time: None,
            is_published: true,
            is_deleted: false,
        };
        assert!(flight.is_bookable(now));

        flight.is_published = false;
        assert!(!flight.is_bookable(now));

        flight.is_published = true;
        flight.departure_time = now;
        assert!(!flight.is_bookable(now));
        assert!(flight.has_departed(now));
    }
}
