use std::time::{Duration, Instant};

use egui::{ViewportCommand, ViewportId, WindowLevel};
use log::trace;

use crate::capture::ScreenHost;

/// Where viewport commands go.
pub trait ViewportSink {
    fn send(&self, cmd: ViewportCommand);
}

/// Sends to one viewport of a live context.
#[derive(Clone)]
pub struct ContextSink {
    pub ctx: egui::Context,
    pub viewport: ViewportId,
}

impl ViewportSink for ContextSink {
    fn send(&self, cmd: ViewportCommand) {
        trace!("{:?} <- {cmd:?}", self.viewport);
        self.ctx.send_viewport_cmd_to(self.viewport, cmd);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePhase {
    /// The ordinary document window.
    Normal,
    /// Out of the way so the screen can be frozen without it.
    Hidden { since: Instant },
    /// Borderless, fullscreen and topmost, showing the frozen screen.
    Fullscreen,
}

/// A document window seen as the screen host of a region selection.
///
/// egui has no system-wide pointer grab. The grab is the fullscreen,
/// topmost selection surface, which takes every pointer event until the
/// selection ends.
pub struct ViewportHost<S: ViewportSink> {
    sink: S,
    phase: SurfacePhase,
    grabbed: bool,
}

impl<S: ViewportSink> ViewportHost<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            phase: SurfacePhase::Normal,
            grabbed: false,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> SurfacePhase {
        self.phase
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// How much longer the window has to stay hidden before freezing;
    /// `None` when it is not hidden at all.
    pub fn freeze_wait(&self, delay: Duration) -> Option<Duration> {
        match self.phase {
            SurfacePhase::Hidden { since } => Some(delay.saturating_sub(since.elapsed())),
            _ => None,
        }
    }

    pub fn show_surface(&mut self) {
        self.sink.send(ViewportCommand::Decorations(false));
        self.sink.send(ViewportCommand::Fullscreen(true));
        self.sink
            .send(ViewportCommand::WindowLevel(WindowLevel::AlwaysOnTop));
        self.sink.send(ViewportCommand::Visible(true));
        self.sink.send(ViewportCommand::Focus);
        self.phase = SurfacePhase::Fullscreen;
    }
}

impl<S: ViewportSink> ScreenHost for ViewportHost<S> {
    fn grab_pointer(&mut self) {
        self.grabbed = true;
    }

    fn release_pointer(&mut self) {
        self.grabbed = false;
    }

    fn suppress_window(&mut self) {
        match self.phase {
            SurfacePhase::Normal => {
                self.sink.send(ViewportCommand::Visible(false));
                self.phase = SurfacePhase::Hidden {
                    since: Instant::now(),
                };
            }
            SurfacePhase::Hidden { .. } => {}
            // Already the surface; just keep it in front.
            SurfacePhase::Fullscreen => {
                self.sink
                    .send(ViewportCommand::WindowLevel(WindowLevel::AlwaysOnTop));
                self.sink.send(ViewportCommand::Focus);
            }
        }
    }

    fn restore_window(&mut self) {
        if self.phase == SurfacePhase::Normal {
            return;
        }
        self.sink.send(ViewportCommand::Fullscreen(false));
        self.sink.send(ViewportCommand::Decorations(true));
        self.sink
            .send(ViewportCommand::WindowLevel(WindowLevel::Normal));
        self.sink.send(ViewportCommand::Visible(true));
        self.sink.send(ViewportCommand::Focus);
        self.phase = SurfacePhase::Normal;
    }
}
