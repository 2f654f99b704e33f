//! Placement saga state machine.

/// The state of a placement saga.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           ├──► Failed               (compensation disabled)
///           └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    /// Placement steps are being executed.
    Running,

    /// A step failed and completed steps are being unwound.
    Compensating,

    /// The order was placed and the cart cleared.
    Completed,

    Failed,
}

impl SagaState {
    /// Returns true if the saga can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    /// Returns true if the saga can still fail.
    pub fn can_fail(&self) -> bool {
        matches!(self, SagaState::Running | SagaState::Compensating)
    }
}
