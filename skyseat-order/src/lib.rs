pub mod admin;
pub mod catalog;
pub mod coordinator;
pub mod ledger;
pub mod manager;
pub mod memory;

pub use admin::{AdminBooking, AdminBookingOutcome, AdminBookingRequest};
pub use catalog::BoundedCatalog;
pub use coordinator::BookingCoordinator;
pub use ledger::{SeatLedger, SeatMap};
pub use manager::OrderManager;
pub use memory::{InMemoryFlightCatalog, InMemoryOrderRepository};
