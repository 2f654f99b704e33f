//! Upstream service traits with in-memory and HTTP implementations.

pub mod cart;
pub mod http;
pub mod medicine;

use thiserror::Error;

pub use cart::{CartClient, CartLine, InMemoryCartService};
pub use http::{HttpCartClient, HttpMedicineClient};
pub use medicine::{InMemoryMedicineService, MedicineClient, MedicineSnapshot, StockCall};

/// Failure reported by an upstream service client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// The request never produced a response (connect error, timeout).
    #[error("{service} service unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// The service answered with a non-success status.
    #[error("{service} service rejected the request ({status}): {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("{service} service returned an unreadable response: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },
}

impl UpstreamError {
    /// Returns true if the request may have been applied even though no
    /// usable answer came back.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            UpstreamError::Unavailable { .. } | UpstreamError::Decode { .. }
        )
    }
}
