//! Owner of the base image, its auxiliary images, the live selection session and the
//! result history. Enforces one session per base image.

use image::RgbaImage;

use crate::compose::{
    AuxiliaryImage, ComposeError, EditRequest, EditRequestComposer, ImagePayload,
};
use crate::config::AppConfig;
use crate::engine::SynthesisEngine;
use crate::error::{AppError, AppResult};
use crate::geometry::{DisplaySize, ImageSize};
use crate::history::ResultHistory;
use crate::input::PointerEvent;
use crate::selection::{
    DrawCommand, FillRule, LayoutSnapshot, SelectionError, SelectionResult, SelectionSession,
};
use crate::state::SessionState;

#[derive(Debug)]
pub struct Workspace {
    primary: Option<RgbaImage>,
    auxiliaries: Vec<AuxiliaryImage>,
    session: SelectionSession,
    composer: EditRequestComposer,
    fill_rule: FillRule,
    history: ResultHistory,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl Workspace {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            primary: None,
            auxiliaries: Vec::new(),
            session: SelectionSession::new(config.fill_rule),
            composer: config.composer(),
            fill_rule: config.fill_rule,
            history: ResultHistory::with_capacity(config.history_capacity),
        }
    }

    pub fn primary(&self) -> Option<&RgbaImage> {
        self.primary.as_ref()
    }

    pub fn primary_size(&self) -> Option<ImageSize> {
        self.primary
            .as_ref()
            .map(|image| ImageSize::new(image.width(), image.height()))
    }

    /// Replaces the base image. A selection only makes sense on the image it was drawn
    /// on, so any session in progress is cancelled and a submitted one is dropped.
    pub fn set_primary(&mut self, image: RgbaImage) {
        self.invalidate_session("base image replaced");
        tracing::info!(
            width = image.width(),
            height = image.height(),
            "base image set"
        );
        self.primary = Some(image);
    }

    pub fn remove_primary(&mut self) -> Option<RgbaImage> {
        self.invalidate_session("base image removed");
        self.primary.take()
    }

    pub fn add_auxiliary(&mut self, image: AuxiliaryImage) {
        self.auxiliaries.push(image);
    }

    pub fn clear_auxiliaries(&mut self) {
        self.auxiliaries.clear();
    }

    pub fn auxiliaries(&self) -> &[AuxiliaryImage] {
        &self.auxiliaries
    }

    pub fn session(&self) -> &SelectionSession {
        &self.session
    }

    pub fn selection_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn history(&self) -> &ResultHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ResultHistory {
        &mut self.history
    }

    /// Starts a fresh session. A pending one is cancelled first and a finished one is
    /// disposed, so no stroke points carry over.
    pub fn activate_selection(&mut self) -> SelectionResult<SessionState> {
        self.cancel_pending("selection re-activated");
        if self.session.state() != SessionState::Idle {
            self.reset_session();
        }
        self.session.activate(self.primary.is_some())
    }

    pub fn deactivate_selection(&mut self) {
        self.cancel_pending("selection tool deactivated");
        self.reset_session();
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        self.session.handle_pointer(event)
    }

    pub fn selection_preview(&self) -> Vec<DrawCommand> {
        self.session.preview()
    }

    pub fn clear_selection(&mut self) -> SelectionResult<SessionState> {
        self.session.clear()
    }

    /// Finalizes against the display size measured by the caller right now.
    pub fn finalize_selection(&mut self, display: DisplaySize) -> SelectionResult<SessionState> {
        let native = self
            .primary_size()
            .ok_or(SelectionError::LayoutUnavailable)?;
        self.session
            .finalize(&LayoutSnapshot::new(native, display))
    }

    pub fn provide_instruction(
        &mut self,
        text: Option<String>,
        reference: Option<RgbaImage>,
    ) -> SelectionResult<SessionState> {
        self.session.provide_instruction(text, reference)
    }

    pub fn submit_selection(&mut self) -> SelectionResult<&EditRequest> {
        let Some(primary) = self.primary.as_ref() else {
            return Err(ComposeError::MalformedRequest {
                message: "no primary image".to_string(),
            }
            .into());
        };
        self.session
            .submit(primary, &self.auxiliaries, &self.composer)
    }

    /// Encodes the finalized mask on its own, using the configured mask encoding.
    pub fn encode_selection_mask(&self) -> SelectionResult<ImagePayload> {
        let mask = self
            .session
            .mask()
            .ok_or(SelectionError::InvalidSelection {
                reason: "selection has not been finalized",
            })?;
        Ok(self.composer.encode_mask(mask)?)
    }

    pub fn cancel_selection(&mut self) -> SelectionResult<SessionState> {
        self.session.cancel()
    }

    /// Sends the submitted request. On success the result enters the history and the
    /// session is reset; on failure the session stays `Submitted` so the same request
    /// can be dispatched again.
    pub fn dispatch(&mut self, engine: &dyn SynthesisEngine) -> AppResult<u64> {
        let request = self
            .session
            .submitted_request()
            .ok_or(AppError::NothingToDispatch)?;
        match engine.generate(request) {
            Ok(image) => {
                let id = self.history.push(request.instruction(), image);
                tracing::info!(id, "edit request completed");
                self.reset_session();
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(%err, "edit request failed; request kept for retry");
                Err(err.into())
            }
        }
    }

    fn cancel_pending(&mut self, reason: &'static str) {
        if self.session.state().is_pending() {
            tracing::info!(reason, from = ?self.session.state(), "cancelling selection");
            if let Err(err) = self.session.cancel() {
                tracing::warn!(%err, "failed to cancel pending selection");
            }
        }
    }

    fn invalidate_session(&mut self, reason: &'static str) {
        self.cancel_pending(reason);
        if self.session.state() == SessionState::Submitted {
            tracing::info!(reason, "dropping submitted request");
            self.reset_session();
        }
    }

    fn reset_session(&mut self) {
        self.session = SelectionSession::new(self.fill_rule);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::compose::PayloadRole;
    use crate::engine::{EngineError, EngineResult, GeneratedImage};

    struct ScriptedEngine {
        failures_left: Cell<u32>,
        seen: RefCell<Vec<Vec<PayloadRole>>>,
    }

    impl ScriptedEngine {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: Cell::new(times),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl SynthesisEngine for ScriptedEngine {
        fn generate(&self, request: &EditRequest) -> EngineResult<GeneratedImage> {
            self.seen.borrow_mut().push(request.roles());
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(EngineError::new("quota exceeded"));
            }
            Ok(GeneratedImage::new(vec![1, 2, 3], "image/png"))
        }
    }

    fn workspace_with_image() -> Workspace {
        let mut workspace = Workspace::default();
        workspace.set_primary(RgbaImage::new(800, 800));
        workspace
    }

    fn draw_square(workspace: &mut Workspace) {
        let points = [(100.0, 100.0), (300.0, 100.0), (300.0, 300.0), (100.0, 300.0)];
        workspace.handle_pointer(PointerEvent::down(7, points[0].0, points[0].1));
        for (x, y) in &points[1..] {
            workspace.handle_pointer(PointerEvent::moved(7, *x, *y));
        }
        workspace.handle_pointer(PointerEvent::up(7, 100.0, 300.0));
    }

    fn awaiting_workspace() -> Workspace {
        let mut workspace = workspace_with_image();
        workspace
            .activate_selection()
            .expect("activation should work");
        draw_square(&mut workspace);
        workspace
            .finalize_selection(DisplaySize::new(400.0, 400.0))
            .expect("square should finalize");
        workspace
    }

    #[test]
    fn activate_without_base_image_stays_idle() {
        let mut workspace = Workspace::default();
        let state = workspace
            .activate_selection()
            .expect("activation without image is a no-op");
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn square_scenario_produces_native_mask() {
        let workspace = awaiting_workspace();
        assert_eq!(workspace.selection_state(), SessionState::AwaitingInstruction);
        let mask = workspace.session().mask().expect("mask should exist");
        assert!(mask.is_opaque(400, 400));
        assert!(!mask.is_opaque(10, 10));
    }

    #[test]
    fn reactivation_after_cancel_starts_with_empty_stroke() {
        let mut workspace = awaiting_workspace();
        workspace
            .cancel_selection()
            .expect("cancel from awaiting should work");
        assert_eq!(workspace.selection_state(), SessionState::Cancelled);

        let state = workspace
            .activate_selection()
            .expect("re-activation should work");
        assert_eq!(state, SessionState::Drawing);
        assert_eq!(workspace.session().stroke_len(), 0);
        assert!(workspace.session().mask().is_none());
    }

    #[test]
    fn activating_while_pending_cancels_prior_session() {
        let mut workspace = workspace_with_image();
        workspace.activate_selection().expect("activation");
        draw_square(&mut workspace);
        assert_eq!(workspace.session().stroke_len(), 4);

        workspace.activate_selection().expect("re-activation");
        assert_eq!(workspace.selection_state(), SessionState::Drawing);
        assert_eq!(workspace.session().stroke_len(), 0);
    }

    #[test]
    fn base_image_change_while_drawing_cancels_session() {
        let mut workspace = workspace_with_image();
        workspace.activate_selection().expect("activation");
        draw_square(&mut workspace);

        workspace.set_primary(RgbaImage::new(640, 480));
        assert_eq!(workspace.selection_state(), SessionState::Cancelled);

        let err = workspace
            .finalize_selection(DisplaySize::new(320.0, 240.0))
            .expect_err("cancelled session cannot finalize");
        assert!(matches!(err, SelectionError::State(_)));
    }

    #[test]
    fn base_image_change_drops_submitted_request() {
        let mut workspace = awaiting_workspace();
        workspace
            .provide_instruction(Some("add a lighthouse".to_string()), None)
            .expect("instruction should be accepted");
        workspace.submit_selection().expect("submit should compose");

        workspace.set_primary(RgbaImage::new(32, 32));
        assert_eq!(workspace.selection_state(), SessionState::Idle);
        assert!(workspace.session().submitted_request().is_none());
    }

    #[test]
    fn deactivation_resets_to_idle_and_drops_stroke() {
        let mut workspace = workspace_with_image();
        workspace.activate_selection().expect("activation");
        draw_square(&mut workspace);
        assert_eq!(workspace.session().stroke_len(), 4);

        workspace.deactivate_selection();
        assert_eq!(workspace.selection_state(), SessionState::Idle);
        assert_eq!(workspace.session().stroke_len(), 0);
        assert!(workspace.session().mask().is_none());
        assert!(workspace.selection_preview().is_empty());

        let state = workspace.activate_selection().expect("re-activation");
        assert_eq!(state, SessionState::Drawing);
        assert_eq!(workspace.session().stroke_len(), 0);
    }

    #[test]
    fn deactivation_after_finalize_discards_mask() {
        let mut workspace = awaiting_workspace();
        workspace.deactivate_selection();
        assert_eq!(workspace.selection_state(), SessionState::Idle);
        assert!(workspace.session().mask().is_none());
        assert!(workspace.encode_selection_mask().is_err());
    }

    #[test]
    fn preview_and_clear_follow_the_stroke() {
        let mut workspace = workspace_with_image();
        workspace.activate_selection().expect("activation");
        draw_square(&mut workspace);

        let preview = workspace.selection_preview();
        assert_eq!(preview.len(), 5);
        assert_eq!(
            preview.first(),
            Some(&DrawCommand::MoveTo(crate::geometry::Point::new(100.0, 100.0)))
        );
        assert_eq!(preview.last(), Some(&DrawCommand::ClosePath));

        let state = workspace.clear_selection().expect("clear while drawing");
        assert_eq!(state, SessionState::Drawing);
        assert_eq!(workspace.session().stroke_len(), 0);
        assert!(workspace.selection_preview().is_empty());
    }

    #[test]
    fn clear_after_finalize_is_rejected() {
        let mut workspace = awaiting_workspace();
        let err = workspace
            .clear_selection()
            .expect_err("clear is only valid while drawing");
        assert!(matches!(err, SelectionError::State(_)));
        assert_eq!(workspace.selection_state(), SessionState::AwaitingInstruction);
    }

    #[test]
    fn selection_mask_uses_configured_encoding() {
        let config = AppConfig {
            mask_encoding: crate::compose::MaskEncoding::RgbaAlpha,
            ..AppConfig::default()
        };
        let mut workspace = Workspace::from_config(&config);
        workspace.set_primary(RgbaImage::new(800, 800));
        workspace.activate_selection().expect("activation");
        draw_square(&mut workspace);
        assert!(workspace.encode_selection_mask().is_err());

        workspace
            .finalize_selection(DisplaySize::new(400.0, 400.0))
            .expect("square should finalize");
        let payload = workspace
            .encode_selection_mask()
            .expect("finalized mask should encode");
        assert_eq!(payload.role, PayloadRole::Mask);
        assert_eq!(payload.format, crate::compose::PixelFormat::Rgba8);
        assert_eq!((payload.width, payload.height), (800, 800));
    }

    #[test]
    fn removing_base_image_blocks_reactivation() {
        let mut workspace = workspace_with_image();
        workspace.activate_selection().expect("activation");
        assert!(workspace.remove_primary().is_some());
        assert_eq!(workspace.selection_state(), SessionState::Cancelled);

        let state = workspace.activate_selection().expect("no-op activation");
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn submit_orders_reference_before_other_auxiliaries() {
        let mut workspace = awaiting_workspace();
        workspace.add_auxiliary(AuxiliaryImage::Other(RgbaImage::new(10, 10)));
        workspace
            .provide_instruction(Some("a red kite".to_string()), Some(RgbaImage::new(20, 20)))
            .expect("instruction should be accepted");

        let request = workspace.submit_selection().expect("submit should compose");
        assert_eq!(
            request.roles(),
            vec![
                PayloadRole::Primary,
                PayloadRole::Reference,
                PayloadRole::Auxiliary,
                PayloadRole::Mask,
            ]
        );
        assert!(request.instruction().starts_with("a red kite"));
        assert_eq!(workspace.selection_state(), SessionState::Submitted);
    }

    #[test]
    fn failed_dispatch_keeps_request_for_retry() {
        let mut workspace = awaiting_workspace();
        workspace
            .provide_instruction(Some("remove the bench".to_string()), None)
            .expect("instruction should be accepted");
        workspace.submit_selection().expect("submit should compose");

        let engine = ScriptedEngine::failing(1);
        let err = workspace
            .dispatch(&engine)
            .expect_err("first dispatch should fail");
        assert!(matches!(err, AppError::Engine(_)));
        assert_eq!(workspace.selection_state(), SessionState::Submitted);
        assert!(workspace.session().mask().is_some());

        let id = workspace.dispatch(&engine).expect("retry should succeed");
        assert_eq!(workspace.history().latest().map(|entry| entry.id), Some(id));
        assert_eq!(
            workspace.history().get(id).map(|entry| entry.instruction.as_str()),
            Some("remove the bench")
        );
        assert_eq!(workspace.selection_state(), SessionState::Idle);

        let seen = engine.seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
    }

    #[test]
    fn dispatch_without_submission_is_rejected() {
        let mut workspace = awaiting_workspace();
        let engine = ScriptedEngine::failing(0);
        let err = workspace
            .dispatch(&engine)
            .expect_err("nothing submitted yet");
        assert!(matches!(err, AppError::NothingToDispatch));
        assert!(engine.seen.borrow().is_empty());
    }
}
