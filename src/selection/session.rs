use image::RgbaImage;

use super::mapper::{map_to_native, ScaleFactor};
use super::raster::{rasterize, FillRule, Mask};
use super::render::{render, DrawCommand};
use super::stroke::{StrokePoints, StrokeRecorder, MIN_SELECTION_POINTS};
use super::{ImageLayout, SelectionError, SelectionResult};
use crate::compose::{AuxiliaryImage, EditRequest, EditRequestComposer};
use crate::input::{PointerEvent, PointerId, PointerPhase};
use crate::state::{SelectionEvent, SessionState, StateMachine};

/// What the user asked for once the region is fixed: text, a reference image, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    text: Option<String>,
    reference: Option<RgbaImage>,
}

impl Instruction {
    pub fn new(text: Option<String>, reference: Option<RgbaImage>) -> SelectionResult<Self> {
        let text = text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if text.is_none() && reference.is_none() {
            return Err(SelectionError::EmptyInstruction);
        }
        Ok(Self { text, reference })
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn reference(&self) -> Option<&RgbaImage> {
        self.reference.as_ref()
    }
}

/// One selection attempt on one base image.
///
/// The stroke lives in display space until [`SelectionSession::finalize`], which maps it
/// to native space using the layout measured at that moment and rasterizes the mask.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    machine: StateMachine,
    recorder: StrokeRecorder,
    active_pointer: Option<PointerId>,
    fill_rule: FillRule,
    scale: Option<ScaleFactor>,
    mask: Option<Mask>,
    instruction: Option<Instruction>,
    request: Option<EditRequest>,
}

impl Default for SelectionSession {
    fn default() -> Self {
        Self::new(FillRule::default())
    }
}

impl SelectionSession {
    pub fn new(fill_rule: FillRule) -> Self {
        Self {
            machine: StateMachine::new(),
            recorder: StrokeRecorder::new(),
            active_pointer: None,
            fill_rule,
            scale: None,
            mask: None,
            instruction: None,
            request: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub const fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    /// Enters drawing when a base image is present; otherwise the tool stays inactive.
    pub fn activate(&mut self, has_base_image: bool) -> SelectionResult<SessionState> {
        self.machine.ensure(SelectionEvent::Activate)?;
        if !has_base_image {
            tracing::info!("selection tool activation ignored: no base image");
            return Ok(self.state());
        }
        Ok(self.machine.transition(SelectionEvent::Activate)?)
    }

    /// Applies one pointer sample. Only the first pointer to go down is tracked; returns
    /// whether the event changed the stroke or gesture.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        if self.state() != SessionState::Drawing {
            return false;
        }
        match event.phase {
            PointerPhase::Down => {
                if self.active_pointer.is_some() {
                    return false;
                }
                self.active_pointer = Some(event.pointer_id);
                self.recorder.begin(event.position);
                true
            }
            PointerPhase::Move => {
                if self.active_pointer != Some(event.pointer_id) {
                    return false;
                }
                self.recorder.extend(event.position);
                true
            }
            PointerPhase::Up | PointerPhase::Cancel => {
                if self.active_pointer != Some(event.pointer_id) {
                    return false;
                }
                self.active_pointer = None;
                self.recorder.end();
                true
            }
        }
    }

    pub fn current_points(&self) -> StrokePoints<'_> {
        self.recorder.current_points()
    }

    pub fn stroke_len(&self) -> usize {
        self.recorder.len()
    }

    /// Overlay path in display space. The closing edge is previewed once the stroke can
    /// be finalized.
    pub fn preview(&self) -> Vec<DrawCommand> {
        let closed = self.recorder.is_finalizable() && !self.recorder.is_recording();
        render(self.recorder.current_points(), closed)
    }

    pub fn finalize(&mut self, layout: &impl ImageLayout) -> SelectionResult<SessionState> {
        self.machine.ensure(SelectionEvent::Finalize)?;
        if !self.recorder.is_finalizable() {
            tracing::warn!(points = self.recorder.len(), "finalize rejected: stroke too short");
            return Err(SelectionError::InsufficientSelection {
                actual: self.recorder.len(),
                required: MIN_SELECTION_POINTS,
            });
        }

        let native = layout.native_size();
        let display = layout.display_size();
        let scale =
            ScaleFactor::between(native, display).ok_or(SelectionError::LayoutUnavailable)?;
        let native_points = map_to_native(self.recorder.as_slice(), scale);
        let mask = rasterize(&native_points, native, self.fill_rule)?;

        tracing::info!(
            points = native_points.len(),
            width = native.width,
            height = native.height,
            scale_x = scale.x,
            scale_y = scale.y,
            coverage = mask.coverage(),
            "selection finalized"
        );

        self.machine.transition(SelectionEvent::Finalize)?;
        self.active_pointer = None;
        self.recorder.end();
        self.scale = Some(scale);
        self.mask = Some(mask);
        Ok(self.machine.transition(SelectionEvent::MaskReady)?)
    }

    /// Discards the stroke and keeps drawing.
    pub fn clear(&mut self) -> SelectionResult<SessionState> {
        self.machine.ensure(SelectionEvent::Clear)?;
        self.recorder.clear();
        self.active_pointer = None;
        Ok(self.machine.transition(SelectionEvent::Clear)?)
    }

    pub fn retry(&mut self) -> SelectionResult<SessionState> {
        self.clear()
    }

    pub fn provide_instruction(
        &mut self,
        text: Option<String>,
        reference: Option<RgbaImage>,
    ) -> SelectionResult<SessionState> {
        self.machine.ensure(SelectionEvent::ProvideInstruction)?;
        let instruction = Instruction::new(text, reference).inspect_err(|_| {
            tracing::warn!("instruction rejected: neither text nor reference image");
        })?;
        self.instruction = Some(instruction);
        Ok(self.machine.transition(SelectionEvent::ProvideInstruction)?)
    }

    /// Composes the edit request and moves to `Submitted`. The request is kept so a
    /// failed dispatch can be retried without redrawing.
    pub fn submit(
        &mut self,
        primary: &RgbaImage,
        auxiliaries: &[AuxiliaryImage],
        composer: &EditRequestComposer,
    ) -> SelectionResult<&EditRequest> {
        self.machine.ensure(SelectionEvent::Submit)?;
        let instruction = self
            .instruction
            .as_ref()
            .ok_or(SelectionError::EmptyInstruction)?;
        let mask = self.mask.as_ref().ok_or(SelectionError::InvalidSelection {
            reason: "no mask was rasterized before submission",
        })?;

        let mut ordered = Vec::with_capacity(auxiliaries.len() + 1);
        if let Some(reference) = instruction.reference() {
            ordered.push(AuxiliaryImage::Reference(reference.clone()));
        }
        ordered.extend(auxiliaries.iter().cloned());

        let request = composer.compose(primary, &ordered, mask, instruction.text())?;
        self.machine.transition(SelectionEvent::Submit)?;
        Ok(&*self.request.insert(request))
    }

    pub fn cancel(&mut self) -> SelectionResult<SessionState> {
        self.machine.ensure(SelectionEvent::Cancel)?;
        self.recorder.clear();
        self.active_pointer = None;
        self.scale = None;
        self.mask = None;
        self.instruction = None;
        Ok(self.machine.transition(SelectionEvent::Cancel)?)
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    pub fn scale(&self) -> Option<ScaleFactor> {
        self.scale
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        self.instruction.as_ref()
    }

    pub fn submitted_request(&self) -> Option<&EditRequest> {
        self.request.as_ref()
    }
}
