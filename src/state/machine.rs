use super::error::{StateError, StateResult};
use super::{SelectionEvent, SessionState, StateTransition};

#[derive(Debug, Clone)]
pub struct StateMachine {
    state: SessionState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn can_transition(&self, event: SelectionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SelectionEvent) -> Option<SessionState> {
        use SelectionEvent::*;
        match (self.state, event) {
            (SessionState::Idle, Activate) => Some(SessionState::Drawing),
            (SessionState::Drawing, Clear) => Some(SessionState::Drawing),
            (SessionState::Drawing, Finalize) => Some(SessionState::Finalized),
            (SessionState::Finalized, MaskReady) => Some(SessionState::AwaitingInstruction),
            (SessionState::AwaitingInstruction, ProvideInstruction) => {
                Some(SessionState::AwaitingInstruction)
            }
            (SessionState::AwaitingInstruction, Submit) => Some(SessionState::Submitted),
            (
                SessionState::Drawing
                | SessionState::Finalized
                | SessionState::AwaitingInstruction,
                Cancel,
            ) => Some(SessionState::Cancelled),
            _ => None,
        }
    }

    /// Fails without side effects when `event` is not legal from the current state.
    pub fn ensure(&self, event: SelectionEvent) -> StateResult<SessionState> {
        self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid selection transition requested");
            StateError::InvalidTransition { from, event }
        })
    }

    pub fn transition(&mut self, event: SelectionEvent) -> StateResult<SessionState> {
        tracing::debug!(from = ?self.state, event = ?event, "request selection transition");
        let next = self.ensure(event)?;

        let record = StateTransition::new(self.state, event, next);
        self.state = next;
        self.transition_history.push(record);

        Ok(self.state)
    }
}

#[cfg(test)]
impl StateMachine {
    pub(crate) fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionState::{:?}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_transition_tracks_valid_and_invalid_events() {
        let mut machine = StateMachine::new();
        assert!(machine.can_transition(SelectionEvent::Activate));
        assert!(!machine.can_transition(SelectionEvent::Finalize));
        assert!(!machine.can_transition(SelectionEvent::Cancel));

        let _ = machine
            .transition(SelectionEvent::Activate)
            .expect("idle -> drawing should transition");

        assert!(machine.can_transition(SelectionEvent::Finalize));
        assert!(machine.can_transition(SelectionEvent::Clear));
        assert!(machine.can_transition(SelectionEvent::Cancel));
        assert!(!machine.can_transition(SelectionEvent::Submit));
        assert!(!machine.can_transition(SelectionEvent::Activate));
    }

    #[test]
    fn transition_records_history_with_ordered_entries() {
        let mut machine = StateMachine::new();
        for event in [
            SelectionEvent::Activate,
            SelectionEvent::Finalize,
            SelectionEvent::MaskReady,
            SelectionEvent::ProvideInstruction,
            SelectionEvent::Submit,
        ] {
            let _ = machine
                .transition(event)
                .expect("happy path transition should work");
        }

        assert_eq!(machine.state(), SessionState::Submitted);
        assert_eq!(machine.history().len(), 5);
        assert_eq!(
            machine.history()[0],
            StateTransition::new(
                SessionState::Idle,
                SelectionEvent::Activate,
                SessionState::Drawing
            )
        );
        assert_eq!(
            machine.history()[2],
            StateTransition::new(
                SessionState::Finalized,
                SelectionEvent::MaskReady,
                SessionState::AwaitingInstruction
            )
        );
        assert_eq!(
            machine.history()[4],
            StateTransition::new(
                SessionState::AwaitingInstruction,
                SelectionEvent::Submit,
                SessionState::Submitted
            )
        );
    }

    #[test]
    fn cancel_is_reachable_only_from_pending_states() {
        for (events, cancellable) in [
            (vec![], false),
            (vec![SelectionEvent::Activate], true),
            (vec![SelectionEvent::Activate, SelectionEvent::Finalize], true),
            (
                vec![
                    SelectionEvent::Activate,
                    SelectionEvent::Finalize,
                    SelectionEvent::MaskReady,
                ],
                true,
            ),
            (
                vec![
                    SelectionEvent::Activate,
                    SelectionEvent::Finalize,
                    SelectionEvent::MaskReady,
                    SelectionEvent::Submit,
                ],
                false,
            ),
        ] {
            let mut machine = StateMachine::new();
            for event in events {
                machine.transition(event).expect("setup transition");
            }
            assert_eq!(
                machine.can_transition(SelectionEvent::Cancel),
                cancellable,
                "cancel from {machine}"
            );
        }
    }

    #[test]
    fn invalid_transition_returns_error_without_mutating_history() {
        let mut machine = StateMachine::new();

        let err = machine
            .transition(SelectionEvent::Submit)
            .expect_err("idle -> submit should fail");
        assert!(matches!(
            err,
            StateError::InvalidTransition {
                from: SessionState::Idle,
                event: SelectionEvent::Submit
            }
        ));
        assert_eq!(machine.state(), SessionState::Idle);
        assert!(machine.history().is_empty());
    }
}
