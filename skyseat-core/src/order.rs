use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::flight::{FlightKey, FlightSnapshot, FlightSummary};

/// Derived order status. Never stored, always computed from the two flags
/// plus live schedule data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Cancelled,
    Expired,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Unpaid => "UNPAID",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// A passenger's claim on one seat of one flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub flight_key: FlightKey,
    pub passenger_id: String,
    pub seat: u32,
    pub created_at: DateTime<Utc>,
    pub is_paid: bool,
    pub is_cancelled: bool,
    pub price: Option<BigDecimal>,
}

impl Order {
    pub fn new(flight_key: FlightKey, passenger_id: String, seat: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_key,
            passenger_id,
            seat,
            created_at: Utc::now(),
            is_paid: false,
            is_cancelled: false,
            price: None,
        }
    }

    /// CANCELLED > PAID > EXPIRED > UNPAID.
    ///
    /// Without flight data the order is never reported EXPIRED.
    pub fn status(&self, flight: Option<&FlightSnapshot>, now: DateTime<Utc>) -> OrderStatus {
        if self.is_cancelled {
            return OrderStatus::Cancelled;
        }
        if self.is_paid {
            return OrderStatus::Paid;
        }
        match flight {
            Some(f) if f.has_departed(now) => OrderStatus::Expired,
            _ => OrderStatus::Unpaid,
        }
    }

    /// Price frozen at payment, otherwise the live catalog price, otherwise the
    /// last price seen for the flight.
    pub fn current_price(
        &self,
        flight: Option<&FlightSnapshot>,
        last_known: Option<&BigDecimal>,
    ) -> CoreResult<BigDecimal> {
        if self.is_paid {
            if let Some(price) = &self.price {
                return Ok(price.clone());
            }
        }
        flight
            .map(|f| f.price.clone())
            .or_else(|| last_known.cloned())
            .ok_or_else(|| CoreError::FlightDataUnavailable(format!("no price for order {}", self.id)))
    }

    pub fn ensure_payable(&self, flight: Option<&FlightSnapshot>, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status(flight, now) {
            OrderStatus::Unpaid => Ok(()),
            other => Err(CoreError::InvalidStateTransition {
                from: other.to_string(),
                action: "pay".to_string(),
            }),
        }
    }

    pub fn ensure_cancellable(&self, flight: Option<&FlightSnapshot>, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status(flight, now) {
            OrderStatus::Paid => Ok(()),
            other => Err(CoreError::InvalidStateTransition {
                from: other.to_string(),
                action: "cancel".to_string(),
            }),
        }
    }

    /// Flags only move false -> true.
    pub fn mark_paid(&mut self, price: BigDecimal) {
        self.price = Some(price);
        self.is_paid = true;
    }

    pub fn mark_cancelled(&mut self) {
        self.is_cancelled = true;
    }
}

/// Order as presented to callers: stored fields plus derived status and price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub flight: Option<FlightSummary>,
    pub passenger: String,
    pub seat: u32,
    pub created_time: DateTime<Utc>,
    pub status: OrderStatus,
    pub price: Option<BigDecimal>,
    pub is_paid: bool,
    pub is_cancelled: bool,
}

impl OrderView {
    pub fn render(
        order: &Order,
        flight: Option<&FlightSnapshot>,
        last_known_price: Option<&BigDecimal>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: order.id,
            flight: flight.map(FlightSnapshot::summary),
            passenger: order.passenger_id.clone(),
            seat: order.seat,
            created_time: order.created_at,
            status: order.status(flight, now),
            price: order.current_price(flight, last_known_price).ok(),
            is_paid: order.is_paid,
            is_cancelled: order.is_cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn flight(price: i64, departs_in: Duration) -> FlightSnapshot {
        FlightSnapshot {
            id: "fl-1".into(),
            flight_number: "SK1".into(),
            price: BigDecimal::from(price),
            origin: Some("TPE".into()),
            destination: Some("HND".into()),
            capacity: 2,
            departure_time: Utc::now() + departs_in,
            arrival_time: None,
            is_published: true,
            is_deleted: false,
        }
    }

    fn order() -> Order {
        Order::new(FlightKey::new("key-1"), "passenger-1".into(), 1)
    }

    #[test]
    fn test_cancelled_dominates_everything() {
        let mut o = order();
        o.mark_paid(BigDecimal::from(100));
        o.mark_cancelled();
        let departed = flight(100, Duration::hours(-1));
        assert_eq!(o.status(Some(&departed), Utc::now()), OrderStatus::Cancelled);
    }

    #[test]
    fn test_paid_survives_departure() {
        let mut o = order();
        o.mark_paid(BigDecimal::from(100));
        let departed = flight(100, Duration::hours(-1));
        assert_eq!(o.status(Some(&departed), Utc::now()), OrderStatus::Paid);
        assert!(o.ensure_cancellable(Some(&departed), Utc::now()).is_ok());
    }

    #[test]
    fn test_unpaid_after_departure_is_expired() {
        let o = order();
        let departed = flight(100, Duration::hours(-1));
        assert_eq!(o.status(Some(&departed), Utc::now()), OrderStatus::Expired);
        let err = o.ensure_payable(Some(&departed), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_missing_flight_data_never_expires() {
        let o = order();
        assert_eq!(o.status(None, Utc::now()), OrderStatus::Unpaid);
    }

    #[test]
    fn test_cancel_requires_paid() {
        let o = order();
        let upcoming = flight(100, Duration::hours(5));
        let err = o.ensure_cancellable(Some(&upcoming), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel an order in status UNPAID");
    }

    #[test]
    fn test_price_frozen_after_payment() {
        let mut o = order();
        o.mark_paid(BigDecimal::from(100));
        let repriced = flight(150, Duration::hours(5));
        assert_eq!(o.current_price(Some(&repriced), None).unwrap(), BigDecimal::from(100));
    }

    #[test]
    fn test_unpaid_price_follows_catalog_then_last_known() {
        let o = order();
        let upcoming = flight(150, Duration::hours(5));
        assert_eq!(o.current_price(Some(&upcoming), None).unwrap(), BigDecimal::from(150));
        assert_eq!(
            o.current_price(None, Some(&BigDecimal::from(140))).unwrap(),
            BigDecimal::from(140)
        );
        assert!(matches!(
            o.current_price(None, None),
            Err(CoreError::FlightDataUnavailable(_))
        ));
    }

    #[test]
    fn test_view_serializes_status_in_caps() {
        let o = order();
        let view = OrderView::render(&o, None, None, Utc::now());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "UNPAID");
        assert!(json["price"].is_null());
        assert!(json["flight"].is_null());
    }
}
