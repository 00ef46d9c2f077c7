use serde::{Deserialize, Serialize};

use crate::order::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Passenger,
    Administrator,
}

/// Authenticated identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn passenger(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), role: Role::Passenger }
    }

    pub fn administrator(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), role: Role::Administrator }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    pub fn owns(&self, order: &Order) -> bool {
        order.passenger_id == self.user_id
    }

    /// Owners and administrators may read an order.
    pub fn can_view(&self, order: &Order) -> bool {
        self.owns(order) || self.is_admin()
    }
}
