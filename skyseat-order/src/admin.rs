use serde::{Deserialize, Serialize};
use skyseat_core::{Caller, CoreError, CoreResult, IdentityService, PassengerIdentity};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::coordinator::BookingCoordinator;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookingRequest {
    #[serde(default)]
    pub flight_id: String,
    #[serde(default)]
    pub seat: Option<i64>,
    #[serde(default)]
    pub identity_card_number: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookingOutcome {
    pub order_id: Uuid,
    pub passenger_id: String,
    pub newly_registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

/// Admin-assisted booking: find or register the passenger, then book as them.
///
/// The booking runs under the passenger's identity with no separate consent
/// step. The admin role check here is the only gate.
pub struct AdminBooking {
    identity: Arc<dyn IdentityService>,
    coordinator: Arc<BookingCoordinator>,
}

struct ResolvedPassenger {
    passenger: PassengerIdentity,
    newly_registered: bool,
    generated_password: Option<String>,
}

impl AdminBooking {
    pub fn new(identity: Arc<dyn IdentityService>, coordinator: Arc<BookingCoordinator>) -> Self {
        Self { identity, coordinator }
    }

    pub async fn book_for_passenger(
        &self,
        admin: &Caller,
        req: &AdminBookingRequest,
    ) -> CoreResult<AdminBookingOutcome> {
        if !admin.is_admin() {
            return Err(CoreError::Forbidden("Admin only".to_string()));
        }
        if req.flight_id.trim().is_empty()
            || req.identity_card_number.trim().is_empty()
            || req.display_name.trim().is_empty()
        {
            return Err(CoreError::Validation(
                "Flight ID, identity card number, and display name are required".to_string(),
            ));
        }

        let resolved = self
            .resolve_passenger(req.identity_card_number.trim(), req.display_name.trim())
            .await?;

        let order_id = self
            .coordinator
            .book_flight(&req.flight_id, &resolved.passenger.id, req.seat)
            .await?;

        info!(
            admin = %admin.user_id,
            passenger = %resolved.passenger.id,
            order_id = %order_id,
            "admin booked flight for passenger"
        );

        Ok(AdminBookingOutcome {
            order_id,
            passenger_id: resolved.passenger.id,
            newly_registered: resolved.newly_registered,
            generated_password: resolved.generated_password,
        })
    }

    async fn resolve_passenger(&self, card: &str, display_name: &str) -> CoreResult<ResolvedPassenger> {
        if let Some(passenger) = self.identity.find_by_identity(card).await? {
            return Ok(ResolvedPassenger { passenger, newly_registered: false, generated_password: None });
        }

        match self.identity.register(card, display_name).await {
            Ok(registration) => Ok(ResolvedPassenger {
                passenger: registration.passenger,
                newly_registered: true,
                generated_password: registration.generated_password,
            }),
            // Registered concurrently between our lookup and our register.
            Err(CoreError::DuplicateIdentity(_)) => {
                warn!("identity registered concurrently, looking it up again");
                let passenger = self
                    .identity
                    .find_by_identity(card)
                    .await?
                    .ok_or_else(|| CoreError::IdentityRegistrationFailed("identity vanished after duplicate".to_string()))?;
                Ok(ResolvedPassenger { passenger, newly_registered: false, generated_password: None })
            }
            Err(e @ CoreError::IdentityUnavailable(_)) => Err(e),
            Err(e) => Err(CoreError::IdentityRegistrationFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryFlightCatalog, InMemoryOrderRepository};
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use chrono::{Duration as ChronoDuration, Utc};
    use skyseat_core::{FlightKey, FlightSnapshot, OrderRepository, Registration};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FakeIdentity {
        users: Mutex<HashMap<String, PassengerIdentity>>,
        fail_register: bool,
    }

    #[async_trait]
    impl IdentityService for FakeIdentity {
        async fn find_by_identity(&self, card: &str) -> CoreResult<Option<PassengerIdentity>> {
            Ok(self.users.lock().await.get(card).cloned())
        }

        async fn register(&self, card: &str, display_name: &str) -> CoreResult<Registration> {
            if self.fail_register {
                return Err(CoreError::Validation("Display name is required".into()));
            }
            let passenger = PassengerIdentity {
                id: format!("user-{card}"),
                user_name: Some(format!("user_{card}")),
                display_name: Some(display_name.to_string()),
                identity_card_number: Some(card.to_string()),
            };
            self.users.lock().await.insert(card.to_string(), passenger.clone());
            Ok(Registration { passenger, generated_password: Some("345678".into()) })
        }
    }

    async fn setup(identity: FakeIdentity) -> (Arc<InMemoryOrderRepository>, AdminBooking) {
        let catalog = Arc::new(InMemoryFlightCatalog::new());
        catalog
            .upsert_flight(
                FlightKey::new("oid-F"),
                FlightSnapshot {
                    id: "F".into(),
                    flight_number: "SK7".into(),
                    price: BigDecimal::from(80),
                    origin: None,
                    destination: None,
                    capacity: 3,
                    departure_time: Utc::now() + ChronoDuration::days(1),
                    arrival_time: None,
                    is_published: true,
                    is_deleted: false,
                },
            )
            .await;
        let orders = Arc::new(InMemoryOrderRepository::new());
        let coordinator = Arc::new(BookingCoordinator::new(catalog, orders.clone(), Duration::from_secs(5)));
        (orders, AdminBooking::new(Arc::new(identity), coordinator))
    }

    fn request(card: &str) -> AdminBookingRequest {
        AdminBookingRequest {
            flight_id: "F".into(),
            seat: None,
            identity_card_number: card.into(),
            display_name: "Chen Wei".into(),
        }
    }

    #[tokio::test]
    async fn test_registers_unknown_passenger_and_books() {
        let (orders, admin_booking) = setup(FakeIdentity::default()).await;
        let admin = Caller::administrator("admin-1");

        let outcome = admin_booking.book_for_passenger(&admin, &request("A12345678")).await.unwrap();
        assert!(outcome.newly_registered);
        assert_eq!(outcome.passenger_id, "user-A12345678");
        assert_eq!(outcome.generated_password.as_deref(), Some("345678"));

        let order = orders.get_order(outcome.order_id).await.unwrap().unwrap();
        assert_eq!(order.passenger_id, "user-A12345678");
        assert_eq!(order.seat, 1);
    }

    #[tokio::test]
    async fn test_reuses_existing_passenger() {
        let (_, admin_booking) = setup(FakeIdentity::default()).await;
        let admin = Caller::administrator("admin-1");

        let first = admin_booking.book_for_passenger(&admin, &request("B1")).await.unwrap();
        let second = admin_booking.book_for_passenger(&admin, &request("B1")).await.unwrap();
        assert!(!second.newly_registered);
        assert_eq!(first.passenger_id, second.passenger_id);
        assert!(second.generated_password.is_none());
    }

    #[tokio::test]
    async fn test_registration_failure_is_classified() {
        let identity = FakeIdentity { fail_register: true, ..Default::default() };
        let (_, admin_booking) = setup(identity).await;

        let err = admin_booking
            .book_for_passenger(&Caller::administrator("admin-1"), &request("C1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::IdentityRegistrationFailed(_)));
    }

    #[tokio::test]
    async fn test_requires_admin_and_fields() {
        let (_, admin_booking) = setup(FakeIdentity::default()).await;

        let err = admin_booking
            .book_for_passenger(&Caller::passenger("p1"), &request("D1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let mut blank = request("D1");
        blank.display_name = "  ".into();
        let err = admin_booking
            .book_for_passenger(&Caller::administrator("admin-1"), &blank)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
