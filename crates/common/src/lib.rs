//! Shared types used across the pharmacy order workspace.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{MedicineId, OrderId, OrderItemId, PharmacyId, UserId};
