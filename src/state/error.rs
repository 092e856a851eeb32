use super::event::SelectionEvent;
use super::model::SessionState;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("invalid selection transition: from {from:?} using event {event:?}")]
    InvalidTransition {
        from: SessionState,
        event: SelectionEvent,
    },
}
