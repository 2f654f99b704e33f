//! Order placement and lifecycle for the pharmacy order service.
//!
//! Placing an order turns a user's cart into a persisted order:
//! 1. Read the cart
//! 2. Create the order shell
//! 3. For each line, check stock, save the item and reduce stock
//! 4. Finalize the order as placed
//! 5. Clear the cart
//!
//! The cart, medicine and order storage services share no transaction. When
//! compensation is enabled, a failure unwinds completed steps in reverse.

pub mod coordinator;
pub mod error;
pub mod lifecycle;
pub mod queries;
pub mod saga;
pub mod services;
pub mod state;

pub use coordinator::{CompensationMode, OrderPlacementCoordinator};
pub use error::{OrderServiceError, PlacementError};
pub use lifecycle::OrderLifecycle;
pub use queries::OrderQueries;
pub use saga::{Compensation, CompletedStep, PlacementSaga};
pub use services::{
    CartClient, CartLine, HttpCartClient, HttpMedicineClient, InMemoryCartService,
    InMemoryMedicineService, MedicineClient, MedicineSnapshot, StockCall, UpstreamError,
};
pub use state::SagaState;
