//! Placement saga bookkeeping.
//!
//! The coordinator records every completed side effect here. On failure the
//! record is turned into a list of compensations to run in reverse order.

use common::{MedicineId, OrderId, OrderItemId, UserId};

use crate::state::SagaState;

pub const STEP_FETCH_CART: &str = "fetch_cart";
pub const STEP_CREATE_ORDER: &str = "create_order";
pub const STEP_RESERVE_LINE: &str = "reserve_line";
pub const STEP_FINALIZE_ORDER: &str = "finalize_order";
pub const STEP_CLEAR_CART: &str = "clear_cart";

/// A side effect the placement has already made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletedStep {
    /// The order shell was persisted.
    OrderCreated(OrderId),
    /// An order item was persisted.
    ItemSaved {
        order_id: OrderId,
        item_id: OrderItemId,
    },
    /// Stock was taken from the medicine service.
    StockReduced {
        medicine_id: MedicineId,
        quantity: u32,
    },
    /// A stock decrement was sent but no usable reply came back, so the
    /// medicine service may or may not have applied it.
    StockUnconfirmed {
        order_id: OrderId,
        medicine_id: MedicineId,
        quantity: u32,
    },
}

impl CompletedStep {
    pub fn name(&self) -> &'static str {
        match self {
            CompletedStep::OrderCreated(_) => "order_created",
            CompletedStep::ItemSaved { .. } => "item_saved",
            CompletedStep::StockReduced { .. } => "stock_reduced",
            CompletedStep::StockUnconfirmed { .. } => "stock_unconfirmed",
        }
    }
}

/// An action that undoes one or more completed steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    RestoreStock {
        medicine_id: MedicineId,
        quantity: u32,
    },
    /// Removes every item of the order in one call.
    DeleteItems(OrderId),
    DeleteOrder(OrderId),
    /// Reports a decrement that cannot be safely restored.
    Reconcile {
        order_id: OrderId,
        medicine_id: MedicineId,
        quantity: u32,
    },
}

impl Compensation {
    pub fn name(&self) -> &'static str {
        match self {
            Compensation::RestoreStock { .. } => "restore_stock",
            Compensation::DeleteItems(_) => "delete_items",
            Compensation::DeleteOrder(_) => "delete_order",
            Compensation::Reconcile { .. } => "reconcile",
        }
    }
}

/// In-flight record of one `place_order` call.
#[derive(Debug, Clone)]
pub struct PlacementSaga {
    user_id: UserId,
    state: SagaState,
    order_id: Option<OrderId>,
    completed: Vec<CompletedStep>,
    failure_reason: Option<String>,
    compensation_failures: usize,
}

impl PlacementSaga {
    /// Starts a saga for `user_id` in the `Running` state.
    pub fn start(user_id: UserId) -> Self {
        Self {
            user_id,
            state: SagaState::Running,
            order_id: None,
            completed: Vec::new(),
            failure_reason: None,
            compensation_failures: 0,
        }
    }

    pub fn record(&mut self, step: CompletedStep) {
        debug_assert_eq!(self.state, SagaState::Running);
        if let CompletedStep::OrderCreated(order_id) = &step {
            self.order_id = Some(*order_id);
        }
        tracing::debug!(step = step.name(), "saga step recorded");
        self.completed.push(step);
    }

    /// Moves to `Compensating` and returns the compensations to run, last
    /// completed step first.
    ///
    /// Item rows are deleted per order, so consecutive `ItemSaved` steps
    /// collapse into a single `DeleteItems`. If any decrement is unconfirmed
    /// the order and its items are kept as the record to reconcile against.
    pub fn begin_compensation(&mut self, reason: impl Into<String>) -> Vec<Compensation> {
        if self.failure_reason.is_none() {
            self.failure_reason = Some(reason.into());
        }
        if !self.state.can_compensate() {
            return Vec::new();
        }
        self.state = SagaState::Compensating;

        let keep_rows = self.has_unconfirmed_stock();
        let mut items_deleted = keep_rows;
        let mut plan = Vec::with_capacity(self.completed.len());
        for step in self.completed.iter().rev() {
            match step {
                CompletedStep::StockReduced {
                    medicine_id,
                    quantity,
                } => plan.push(Compensation::RestoreStock {
                    medicine_id: medicine_id.clone(),
                    quantity: *quantity,
                }),
                CompletedStep::ItemSaved { order_id, .. } => {
                    if !items_deleted {
                        items_deleted = true;
                        plan.push(Compensation::DeleteItems(*order_id));
                    }
                }
                CompletedStep::StockUnconfirmed {
                    order_id,
                    medicine_id,
                    quantity,
                } => plan.push(Compensation::Reconcile {
                    order_id: *order_id,
                    medicine_id: medicine_id.clone(),
                    quantity: *quantity,
                }),
                CompletedStep::OrderCreated(order_id) => {
                    if !keep_rows {
                        plan.push(Compensation::DeleteOrder(*order_id));
                    }
                }
            }
        }
        plan
    }

    /// Returns true if some stock decrement has an unknown outcome.
    pub fn has_unconfirmed_stock(&self) -> bool {
        self.completed
            .iter()
            .any(|step| matches!(step, CompletedStep::StockUnconfirmed { .. }))
    }

    pub fn record_compensation_failure(&mut self) {
        self.compensation_failures += 1;
    }

    /// Marks the saga failed. Valid while running or compensating.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.failure_reason.is_none() {
            self.failure_reason = Some(reason.into());
        }
        if self.state.can_fail() {
            self.state = SagaState::Failed;
        }
    }

    pub fn complete(&mut self) {
        if self.state == SagaState::Running {
            self.state = SagaState::Completed;
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    /// The order shell created by this saga, if it got that far.
    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn completed_steps(&self) -> &[CompletedStep] {
        &self.completed
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn compensation_failures(&self) -> usize {
        self.compensation_failures
    }
}
