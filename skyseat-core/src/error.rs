use serde::Serialize;

/// Outward classification of a failure. Callers decide between retrying,
/// correcting their input, or refreshing state based on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    State,
    DependencyUnavailable,
    Authorization,
    Internal,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::DependencyUnavailable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::State => "state",
            ErrorKind::DependencyUnavailable => "dependency_unavailable",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Flight not found: {0}")]
    FlightNotFound(String),
    #[error("Flight {0} is not available for booking")]
    FlightNotBookable(String),
    #[error("Flight {0} has no storage record")]
    FlightKeyUnresolved(String),
    #[error("Flight {0} is fully booked")]
    FlightFull(String),
    #[error("Seat {0} is not available")]
    SeatTaken(u32),
    #[error("Invalid seat number {seat}: must be between 1 and {capacity}")]
    InvalidSeatNumber { seat: i64, capacity: u32 },
    #[error("No available seats on flight {0}")]
    NoSeatsAvailable(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Cannot {action} an order in status {from}")]
    InvalidStateTransition { from: String, action: String },
    #[error("Flight data unavailable: {0}")]
    FlightDataUnavailable(String),
    #[error("Flight catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("Identity service unavailable: {0}")]
    IdentityUnavailable(String),
    #[error("Identity card {0} is already registered")]
    DuplicateIdentity(String),
    #[error("Passenger registration failed: {0}")]
    IdentityRegistrationFailed(String),
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_)
            | CoreError::InvalidSeatNumber { .. }
            | CoreError::FlightNotBookable(_)
            | CoreError::IdentityRegistrationFailed(_) => ErrorKind::Validation,
            CoreError::FlightNotFound(_)
            | CoreError::FlightKeyUnresolved(_)
            | CoreError::OrderNotFound(_) => ErrorKind::NotFound,
            CoreError::FlightFull(_)
            | CoreError::SeatTaken(_)
            | CoreError::NoSeatsAvailable(_)
            | CoreError::DuplicateIdentity(_) => ErrorKind::Conflict,
            CoreError::InvalidStateTransition { .. } => ErrorKind::State,
            CoreError::FlightDataUnavailable(_)
            | CoreError::CatalogUnavailable(_)
            | CoreError::IdentityUnavailable(_) => ErrorKind::DependencyUnavailable,
            CoreError::Forbidden(_) => ErrorKind::Authorization,
            CoreError::Storage(_) => ErrorKind::Internal,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
