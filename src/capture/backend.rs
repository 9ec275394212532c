use egui::{Pos2, Rect, Vec2, pos2, vec2};
use image::RgbaImage;
use log::{debug, warn};
use thiserror::Error;
use xcap::{Monitor, Window};

use crate::geometry::aligned;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no monitor to capture from")]
    NoMonitor,
    #[error("the screen was not frozen before capturing")]
    NotFrozen,
    #[error("region {0:?} lies outside the screen")]
    OutsideScreen(Rect),
    #[error(transparent)]
    Backend(#[from] xcap::XCapError),
}

/// Produces pixels for a finished selection. Coordinates are global.
pub trait CaptureBackend {
    /// The full window under `global`, or the whole screen when no window
    /// is there.
    fn capture_point(&mut self, global: Pos2) -> Result<RgbaImage, CaptureError>;
    /// Exactly `global` out of the composited screen.
    fn capture_region(&mut self, global: Rect) -> Result<RgbaImage, CaptureError>;
}

/// The screen as it looked when selection began.
pub struct FrozenScreen {
    pub origin: Pos2,
    pub image: RgbaImage,
}

impl FrozenScreen {
    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(
            self.origin,
            vec2(self.image.width() as f32, self.image.height() as f32),
        )
    }

    /// Cuts `global` out of the frame, grown to whole pixels and clipped to
    /// the screen.
    pub fn crop(&self, global: Rect) -> Result<RgbaImage, CaptureError> {
        let r = aligned(global);
        let r = Rect::from_min_size(r.min, r.size().max(Vec2::splat(1.0)));
        let local = r
            .translate(-self.origin.to_vec2())
            .intersect(Rect::from_min_size(Pos2::ZERO, self.bounds().size()));
        if !local.is_positive() {
            return Err(CaptureError::OutsideScreen(global));
        }
        Ok(image::imageops::crop_imm(
            &self.image,
            local.min.x as u32,
            local.min.y as u32,
            local.width() as u32,
            local.height() as u32,
        )
        .to_image())
    }
}

/// Captures through xcap, using the first monitor.
pub struct XcapBackend {
    frozen: Option<FrozenScreen>,
    own_title: &'static str,
}

impl XcapBackend {
    /// Windows whose title ends with `own_title` are never picked.
    pub fn new(own_title: &'static str) -> Self {
        Self {
            frozen: None,
            own_title,
        }
    }

    pub fn freeze(&mut self) -> Result<&FrozenScreen, CaptureError> {
        let monitors = Monitor::all()?;
        let monitor = monitors.first().ok_or(CaptureError::NoMonitor)?;
        let origin = pos2(monitor.x()? as f32, monitor.y()? as f32);
        let image = monitor.capture_image()?;
        debug!(
            "froze {}x{} screen at {origin:?}",
            image.width(),
            image.height()
        );
        Ok(self.frozen.insert(FrozenScreen { origin, image }))
    }

    pub fn frozen(&self) -> Option<&FrozenScreen> {
        self.frozen.as_ref()
    }

    pub fn thaw(&mut self) {
        self.frozen = None;
    }

    fn frozen_or_err(&self) -> Result<&FrozenScreen, CaptureError> {
        self.frozen.as_ref().ok_or(CaptureError::NotFrozen)
    }

    /// Every visible window on screen. A window system that cannot list
    /// them yields none, which makes point captures take the whole screen.
    fn windows(&self) -> Vec<Candidate<Window>> {
        let windows = match Window::all() {
            Ok(windows) => windows,
            Err(e) => {
                warn!("cannot list windows: {e}");
                return Vec::new();
            }
        };
        windows
            .into_iter()
            .filter_map(|w| {
                if w.is_minimized().unwrap_or(false) {
                    return None;
                }
                let rect = Rect::from_min_size(
                    pos2(w.x().ok()? as f32, w.y().ok()? as f32),
                    vec2(w.width().ok()? as f32, w.height().ok()? as f32),
                );
                Some(Candidate {
                    rect,
                    title: w.title().unwrap_or_default(),
                    app_name: w.app_name().unwrap_or_default(),
                    window: w,
                })
            })
            .collect()
    }

    fn capture_among<W: Grab>(
        &self,
        global: Pos2,
        candidates: Vec<Candidate<W>>,
    ) -> Result<RgbaImage, CaptureError> {
        let Some(picked) = pick_window(candidates, global, self.own_title) else {
            debug!("no window at {global:?}, capturing the whole screen");
            return Ok(self.frozen_or_err()?.image.clone());
        };
        debug!("capturing window '{}' at {:?}", picked.title, picked.rect);
        match picked.window.grab() {
            Ok(image) => Ok(image),
            Err(e) => {
                warn!("window capture failed ({e}), cropping the frozen screen instead");
                self.frozen_or_err()?.crop(picked.rect)
            }
        }
    }
}

/// Something on screen that can be captured on its own.
trait Grab {
    fn grab(&self) -> Result<RgbaImage, CaptureError>;
}

impl Grab for Window {
    fn grab(&self) -> Result<RgbaImage, CaptureError> {
        Ok(self.capture_image()?)
    }
}

struct Candidate<W> {
    rect: Rect,
    title: String,
    app_name: String,
    window: W,
}

/// Smallest foreign window containing `p`; the first listed wins a tie.
fn pick_window<W>(candidates: Vec<Candidate<W>>, p: Pos2, own_title: &str) -> Option<Candidate<W>> {
    candidates
        .into_iter()
        .filter(|c| !c.title.ends_with(own_title) && c.app_name != own_title)
        .filter(|c| c.rect.contains(p))
        .min_by(|a, b| a.rect.area().total_cmp(&b.rect.area()))
}

impl CaptureBackend for XcapBackend {
    fn capture_point(&mut self, global: Pos2) -> Result<RgbaImage, CaptureError> {
        let windows = self.windows();
        self.capture_among(global, windows)
    }

    fn capture_region(&mut self, global: Rect) -> Result<RgbaImage, CaptureError> {
        self.frozen_or_err()?.crop(global)
    }
}
