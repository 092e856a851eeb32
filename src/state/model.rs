/// Lifecycle of one selection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Drawing,
    Finalized,
    AwaitingInstruction,
    Submitted,
    Cancelled,
}

impl SessionState {
    /// States holding user work that an activation or base-image change must cancel.
    pub const fn is_pending(self) -> bool {
        matches!(
            self,
            Self::Drawing | Self::Finalized | Self::AwaitingInstruction
        )
    }
}
