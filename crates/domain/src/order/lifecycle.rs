//! Role-gated status transitions.

use common::{PharmacyId, UserId};

use crate::error::OrderError;

use super::OrderStatus;

/// The party requesting a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User(UserId),
    Pharmacy(PharmacyId),
}

impl Actor {
    /// Returns the role name used in errors, logs and metric labels.
    pub fn role(&self) -> &'static str {
        match self {
            Actor::User(_) => "user",
            Actor::Pharmacy(_) => "pharmacy",
        }
    }
}

/// Computes the status an order moves to when `actor` requests `requested`.
///
/// Users may cancel a `Placed` order and may mark any order `Delivered`.
/// Pharmacies may only dispatch a `Placed` order. Ownership of the order is
/// not checked here.
pub fn next_status(
    current: OrderStatus,
    actor: &Actor,
    requested: OrderStatus,
) -> Result<OrderStatus, OrderError> {
    match (actor, requested) {
        (Actor::User(_), OrderStatus::Cancelled) => {
            if current.can_cancel() {
                Ok(OrderStatus::Cancelled)
            } else {
                Err(OrderError::AlreadyOutForDelivery { current })
            }
        }
        (Actor::User(_), OrderStatus::Delivered) => Ok(OrderStatus::Delivered),
        (Actor::Pharmacy(_), OrderStatus::OutForDelivery) if current.can_dispatch() => {
            Ok(OrderStatus::OutForDelivery)
        }
        _ => Err(OrderError::UnauthorizedTransition {
            actor: actor.role(),
            current,
            requested,
        }),
    }
}
