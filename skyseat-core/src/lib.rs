pub mod caller;
pub mod error;
pub mod flight;
pub mod order;
pub mod repository;

pub use caller::{Caller, Role};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use flight::{FlightKey, FlightSnapshot, FlightSummary};
pub use order::{Order, OrderStatus, OrderView};
pub use repository::{FlightCatalog, IdentityService, OrderRepository, PassengerIdentity, Registration};
