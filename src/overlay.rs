use egui::emath::RectTransform;
use egui::{Color32, Painter, Pos2, Rect, Stroke, StrokeKind};

use crate::capture::CaptureRegion;

/// Full-screen dimming layer shown while a region is being dragged out.
/// Everything is masked except the keep-clear rectangle.
#[derive(Debug, Clone)]
pub struct Overlay {
    visible: bool,
    keep_clear: Option<CaptureRegion>,
    alpha: u8,
}

impl Overlay {
    pub fn new(alpha: u8) -> Self {
        Self {
            visible: false,
            keep_clear: None,
            alpha,
        }
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.keep_clear = None;
    }

    #[cfg(test)]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn clear_rect(&mut self, region: CaptureRegion) {
        self.keep_clear = Some(region);
    }

    #[cfg(test)]
    pub fn keep_clear(&self) -> Option<CaptureRegion> {
        self.keep_clear
    }

    /// Paints the mask. `to_screen` maps global coordinates onto the surface.
    pub fn paint(&self, painter: &Painter, area: Rect, to_screen: &RectTransform) {
        if !self.visible {
            return;
        }
        let mask = Color32::from_black_alpha(self.alpha);
        let Some(region) = self.keep_clear else {
            painter.rect_filled(to_screen.transform_rect(area), 0.0, mask);
            return;
        };
        for band in mask_rects(area, region) {
            painter.rect_filled(to_screen.transform_rect(band), 0.0, mask);
        }
        let clear = region.normalized().intersect(area);
        if clear.is_positive() {
            painter.rect_stroke(
                to_screen.transform_rect(clear),
                0.0,
                Stroke::new(1.0, Color32::WHITE),
                StrokeKind::Outside,
            );
        }
    }
}

/// `area` minus the keep-clear rectangle, as up to four disjoint bands:
/// above, left of, right of and below the clear part. The region's corners
/// may come in any order.
pub fn mask_rects(area: Rect, region: CaptureRegion) -> Vec<Rect> {
    let clear = region.normalized().intersect(area);
    if !clear.is_positive() {
        return vec![area];
    }
    [
        Rect::from_min_max(area.min, Pos2::new(area.max.x, clear.min.y)),
        Rect::from_min_max(
            Pos2::new(area.min.x, clear.min.y),
            Pos2::new(clear.min.x, clear.max.y),
        ),
        Rect::from_min_max(
            Pos2::new(clear.max.x, clear.min.y),
            Pos2::new(area.max.x, clear.max.y),
        ),
        Rect::from_min_max(Pos2::new(area.min.x, clear.max.y), area.max),
    ]
    .into_iter()
    .filter(|band| band.is_positive())
    .collect()
}
