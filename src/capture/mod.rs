//! Screen-region selection: drag out a rectangle, or click to pick the
//! window under the pointer.

mod backend;

pub use backend::{CaptureBackend, CaptureError, FrozenScreen, XcapBackend};

use egui::{Pos2, Rect};
use log::debug;

use crate::overlay::Overlay;

/// Two corners in global screen coordinates, in the order they were dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRegion {
    pub start: Pos2,
    pub end: Pos2,
}

impl CaptureRegion {
    pub fn at(p: Pos2) -> Self {
        Self { start: p, end: p }
    }

    /// Both corners coincide: the user clicked rather than dragged.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    pub fn normalized(&self) -> Rect {
        Rect::from_two_pos(self.start, self.end)
    }
}

/// How a finished selection is to be captured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureRequest {
    /// The window under this global point, at its full extent.
    Point(Pos2),
    /// Exactly this global rectangle.
    Region(Rect),
}

/// Window-system side effects of a selection.
pub trait ScreenHost {
    /// Exclusive pointer grab over the whole screen, crosshair cursor.
    fn grab_pointer(&mut self);
    fn release_pointer(&mut self);
    /// Keeps the document window from covering what is being captured.
    /// Called more than once per selection; must tolerate repeats.
    fn suppress_window(&mut self);
    fn restore_window(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectState {
    #[default]
    Inactive,
    /// Waiting for the first press.
    Armed,
    Selecting(CaptureRegion),
}

/// Drives one selection from activation to a [`CaptureRequest`].
///
/// The pointer grab taken on activation is released on every way out:
/// pointer release, [`RegionSelector::abort`], or the selector being dropped.
pub struct RegionSelector<H: ScreenHost> {
    host: H,
    state: SelectState,
    overlay: Overlay,
}

impl<H: ScreenHost> RegionSelector<H> {
    pub fn new(host: H, overlay: Overlay) -> Self {
        Self {
            host,
            state: SelectState::Inactive,
            overlay,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[cfg(test)]
    pub fn state(&self) -> SelectState {
        self.state
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn is_active(&self) -> bool {
        self.state != SelectState::Inactive
    }

    /// Returns false if a selection is already running.
    pub fn activate(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        debug!("region selection armed");
        self.state = SelectState::Armed;
        self.host.grab_pointer();
        self.host.suppress_window();
        true
    }

    pub fn pointer_down(&mut self, pos: Pos2) {
        if self.state != SelectState::Armed {
            return;
        }
        self.state = SelectState::Selecting(CaptureRegion::at(pos));
        self.host.suppress_window();
    }

    pub fn pointer_move(&mut self, pos: Pos2, primary_held: bool) -> bool {
        let SelectState::Selecting(region) = &mut self.state else {
            return false;
        };
        if !primary_held {
            return false;
        }
        if region.is_degenerate() {
            self.overlay.show();
        }
        region.end = pos;
        self.overlay.clear_rect(*region);
        true
    }

    /// Ends the selection. `pos` is where the pointer is now; a click
    /// resolves to the window found there.
    pub fn pointer_up(&mut self, pos: Pos2) -> Option<CaptureRequest> {
        let SelectState::Selecting(region) = self.state else {
            return None;
        };
        self.finish();
        let request = if region.is_degenerate() {
            CaptureRequest::Point(pos)
        } else {
            CaptureRequest::Region(region.normalized())
        };
        debug!("selection resolved to {request:?}");
        Some(request)
    }

    /// Leaves selection without capturing, e.g. when the window goes away.
    pub fn abort(&mut self) {
        if self.is_active() {
            debug!("region selection aborted");
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.overlay.hide();
        self.host.release_pointer();
        self.host.restore_window();
        self.state = SelectState::Inactive;
    }
}

impl<H: ScreenHost> Drop for RegionSelector<H> {
    fn drop(&mut self) {
        self.abort();
    }
}
