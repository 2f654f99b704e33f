//! Order records, status, lifecycle and views.

mod lifecycle;
mod model;
mod status;
mod view;

pub use lifecycle::{Actor, next_status};
pub use model::{NewOrder, NewOrderItem, Order, OrderItem};
pub use status::OrderStatus;
pub use view::{OrderItemView, OrderView};
