use serde::Serialize;
use skyseat_core::{CoreError, CoreResult, FlightKey, OrderRepository};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatMap {
    pub available_seats: Vec<u32>,
    pub taken_seats: Vec<u32>,
    pub total_seats: u32,
}

/// Derives taken and available seats for a flight from its non-cancelled
/// orders. Always reads through to the order store.
///
/// Allocation is advisory. The store's uniqueness constraint decides who
/// actually gets a seat.
#[derive(Clone)]
pub struct SeatLedger {
    orders: Arc<dyn OrderRepository>,
}

impl SeatLedger {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn taken_seats(&self, flight_key: &FlightKey) -> CoreResult<BTreeSet<u32>> {
        let seats = self.orders.taken_seats(flight_key).await?;
        Ok(seats.into_iter().collect())
    }

    /// Taken and available seats from a single read of the store.
    pub async fn seat_map(&self, flight_key: &FlightKey, capacity: u32) -> CoreResult<SeatMap> {
        let taken = self.taken_seats(flight_key).await?;
        Ok(SeatMap {
            available_seats: available_from(&taken, capacity),
            taken_seats: taken.into_iter().collect(),
            total_seats: capacity,
        })
    }

    pub async fn allocate_seat(
        &self,
        flight_key: &FlightKey,
        capacity: u32,
        requested: Option<i64>,
    ) -> CoreResult<u32> {
        let taken = self.taken_seats(flight_key).await?;
        choose_seat(&taken, capacity, requested)
            .map_err(|e| match e {
                CoreError::NoSeatsAvailable(_) => CoreError::NoSeatsAvailable(flight_key.to_string()),
                other => other,
            })
    }
}

/// Seats in `1..=capacity` not in `taken`, ascending.
pub fn available_from(taken: &BTreeSet<u32>, capacity: u32) -> Vec<u32> {
    (1..=capacity).filter(|seat| !taken.contains(seat)).collect()
}

/// Smallest free seat when nothing is requested, otherwise the requested seat
/// if it is in range and free.
pub fn choose_seat(taken: &BTreeSet<u32>, capacity: u32, requested: Option<i64>) -> CoreResult<u32> {
    match requested {
        None => (1..=capacity)
            .find(|seat| !taken.contains(seat))
            .ok_or_else(|| CoreError::NoSeatsAvailable(String::new())),
        Some(seat) => {
            let in_range = u32::try_from(seat)
                .ok()
                .filter(|s| (1..=capacity).contains(s))
                .ok_or(CoreError::InvalidSeatNumber { seat, capacity })?;
            if taken.contains(&in_range) {
                return Err(CoreError::SeatTaken(in_range));
            }
            Ok(in_range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryOrderRepository;
    use skyseat_core::Order;

    fn taken(seats: &[u32]) -> BTreeSet<u32> {
        seats.iter().copied().collect()
    }

    #[test]
    fn test_available_is_ascending_complement() {
        assert_eq!(available_from(&taken(&[2, 4]), 5), vec![1, 3, 5]);
        assert!(available_from(&taken(&[1, 2]), 2).is_empty());
        assert!(available_from(&taken(&[]), 0).is_empty());
    }

    #[test]
    fn test_auto_assign_picks_lowest_gap() {
        assert_eq!(choose_seat(&taken(&[1, 3]), 4, None).unwrap(), 2);
        assert_eq!(choose_seat(&taken(&[]), 4, None).unwrap(), 1);
    }

    #[test]
    fn test_auto_assign_on_full_flight() {
        let err = choose_seat(&taken(&[1, 2]), 2, None).unwrap_err();
        assert!(matches!(err, CoreError::NoSeatsAvailable(_)));
    }

    #[test]
    fn test_requested_seat_out_of_range() {
        for seat in [0, -1, 3, i64::from(u32::MAX) + 1] {
            let err = choose_seat(&taken(&[]), 2, Some(seat)).unwrap_err();
            assert!(matches!(err, CoreError::InvalidSeatNumber { .. }), "seat {seat}");
        }
    }

    #[test]
    fn test_requested_seat_taken() {
        let err = choose_seat(&taken(&[2]), 2, Some(2)).unwrap_err();
        assert!(matches!(err, CoreError::SeatTaken(2)));
        assert_eq!(choose_seat(&taken(&[2]), 2, Some(1)).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ledger_ignores_cancelled_orders() {
        let repo = Arc::new(InMemoryOrderRepository::new());
        let key = FlightKey::new("k1");
        let paid = Order::new(key.clone(), "p1".into(), 1);
        repo.insert_order(&paid).await.unwrap();
        repo.insert_order(&Order::new(key.clone(), "p2".into(), 2)).await.unwrap();
        repo.mark_paid(paid.id, &bigdecimal::BigDecimal::from(50)).await.unwrap();
        repo.mark_cancelled(paid.id).await.unwrap();

        let ledger = SeatLedger::new(repo);
        let map = ledger.seat_map(&key, 3).await.unwrap();
        assert_eq!(map.available_seats, vec![1, 3]);
        assert_eq!(map.taken_seats, vec![2]);
        assert_eq!(ledger.allocate_seat(&key, 3, None).await.unwrap(), 1);
    }
}
