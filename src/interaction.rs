use crate::forces::FrameInput;

/// Hover triggers when the pointer is within this NDC distance of the
/// scene center, widened a little while the pointer is moving fast.
const HOVER_THRESHOLD: f32 = 0.5;
const HOVER_SPEED_SCALE: f32 = 0.2;
/// Pointer speed estimate gain over the per-frame NDC displacement.
const POINTER_SPEED_SCALE: f32 = 3.0;
/// Ticks between the dispersal trigger and shutdown, roughly one second
/// at the nominal tick rate.
pub const DISPERSE_DELAY_TICKS: u32 = 60;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Hovering,
  /// One-shot and terminal: the field blasts apart, then the instance
  /// shuts down after a short delay.
  Dispersing,
}

/// Pointer-driven interaction state. Event handlers write the small fields
/// here; the frame tick reads a snapshot through [`frame_input`] once per
/// frame, so a move landing mid-frame is simply picked up next frame.
///
/// [`frame_input`]: InteractionState::frame_input
#[derive(Clone, Debug)]
pub struct InteractionState {
  pointer: [f32; 2],
  prev_pointer: [f32; 2],
  focus: [f32; 3],
  phase: Phase,
  disperse_ticks_left: Option<u32>,
}

impl Default for InteractionState {
  fn default() -> Self {
    Self::new()
  }
}

impl InteractionState {
  #[must_use]
  pub fn new() -> Self {
    Self {
      pointer: [0.0, 0.0],
      prev_pointer: [0.0, 0.0],
      focus: [f32::MAX, f32::MAX, 0.0],
      phase: Phase::Idle,
      disperse_ticks_left: None,
    }
  }

  /// Record a pointer move: NDC position plus the world point where the
  /// cursor ray crosses the z = 0 plane. Hover is recomputed here, purely
  /// from the new position and current speed, so replaying identical moves
  /// reproduces identical hover flags.
  pub fn pointer_moved(&mut self, ndc: [f32; 2], focus: [f32; 3]) {
    self.pointer = ndc;
    self.focus = focus;
    if self.phase == Phase::Dispersing {
      return;
    }
    let center_distance = (ndc[0] * ndc[0] + ndc[1] * ndc[1]).sqrt();
    let threshold = HOVER_THRESHOLD + self.pointer_speed() * HOVER_SPEED_SCALE;
    self.phase = if center_distance < threshold {
      Phase::Hovering
    } else {
      Phase::Idle
    };
  }

  /// Pointer speed over the last frame, NDC units.
  #[must_use]
  pub fn pointer_speed(&self) -> f32 {
    let dx = self.pointer[0] - self.prev_pointer[0];
    let dy = self.pointer[1] - self.prev_pointer[1];
    (dx * dx + dy * dy).sqrt() * POINTER_SPEED_SCALE
  }

  /// Fire the one-shot dispersal. Returns whether the trigger took effect;
  /// re-triggering while already dispersing is ignored.
  pub fn trigger_disperse(&mut self) -> bool {
    if self.phase == Phase::Dispersing {
      return false;
    }
    self.phase = Phase::Dispersing;
    self.disperse_ticks_left = Some(DISPERSE_DELAY_TICKS);
    true
  }

  /// Roll per-frame pointer history and advance the dispersal countdown.
  /// Returns true exactly once, when the dispersal delay has elapsed and
  /// the owner should tear the simulation down.
  pub fn end_frame(&mut self) -> bool {
    self.prev_pointer = self.pointer;
    match self.disperse_ticks_left {
      Some(0) => false,
      Some(1) => {
        self.disperse_ticks_left = Some(0);
        true
      }
      Some(n) => {
        self.disperse_ticks_left = Some(n - 1);
        false
      }
      None => false,
    }
  }

  #[must_use]
  pub fn phase(&self) -> Phase {
    self.phase
  }

  #[must_use]
  pub fn hovering(&self) -> bool {
    self.phase == Phase::Hovering
  }

  #[must_use]
  pub fn dispersing(&self) -> bool {
    self.phase == Phase::Dispersing
  }

  #[must_use]
  pub fn pointer(&self) -> [f32; 2] {
    self.pointer
  }

  /// Snapshot consumed by the integrator this frame.
  #[must_use]
  pub fn frame_input(&self, time: f32) -> FrameInput {
    FrameInput {
      time,
      focus: self.focus,
      pointer_speed: self.pointer_speed(),
      hovering: self.hovering(),
      dispersing: self.dispersing(),
    }
  }
}
