//! Viewer lifecycle state machine.

/// The phases a viewer moves through between creation and teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewerPhase {
    /// Constructed, no document requested yet.
    #[default]
    Idle,
    /// Fetching and opening the document.
    Loading,
    /// Document open; page renders in flight.
    Rendering,
    /// Every requested page has painted.
    Ready,
    /// A non-recoverable (or retry-exhausted) failure surfaced.
    Error,
    /// Torn down. Terminal.
    Destroyed,
}

/// Validated phase tracker. Invalid transitions are rejected and leave the
/// current phase untouched, so a stray duplicate event cannot corrupt state.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    phase: ViewerPhase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ViewerPhase {
        self.phase
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == ViewerPhase::Destroyed
    }

    /// Attempt a transition. Returns whether it was applied.
    pub fn advance(&mut self, next: ViewerPhase) -> bool {
        if permitted(self.phase, next) {
            self.phase = next;
            true
        } else {
            false
        }
    }
}

fn permitted(from: ViewerPhase, to: ViewerPhase) -> bool {
    use ViewerPhase::*;
    match (from, to) {
        (Destroyed, _) => false,
        (_, Destroyed) => true,
        (Idle, Loading) => true,
        // A source change restarts the load from any active phase.
        (Loading | Rendering | Ready | Error, Loading) => true,
        (Loading, Rendering) | (Loading, Error) => true,
        (Rendering, Ready) | (Rendering, Error) => true,
        // New visible pages can pull a settled viewer back into rendering.
        (Ready, Rendering) | (Ready, Error) => true,
        _ => false,
    }
}
