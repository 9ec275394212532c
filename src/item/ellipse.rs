use egui::emath::RectTransform;
use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2};

use crate::geometry::ellipse_points;

/// White pen painted beneath the coloured one so the ring stays visible on
/// any background.
pub const OUTER_PEN: f32 = 10.0;
pub const INNER_PEN: f32 = 8.0;

const SEGMENTS: usize = 72;

/// An ellipse spanned by a fixed origin corner and a corner that follows the
/// pointer. The corners are stored as dragged; width or height may be
/// negative and are only normalized for painting and hit-testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    pub origin: Pos2,
    pub corner: Pos2,
    pub color: Color32,
}

impl Ellipse {
    pub fn new(origin: Pos2, color: Color32) -> Self {
        Self {
            origin,
            corner: origin,
            color,
        }
    }

    pub fn resize_to(&mut self, p: Pos2) {
        self.corner = p;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.origin += delta;
        self.corner += delta;
    }

    /// Signed extents as dragged.
    #[cfg(test)]
    pub fn extent(&self) -> Vec2 {
        self.corner - self.origin
    }

    /// Each axis normalized on its own.
    pub fn rect(&self) -> Rect {
        Rect::from_two_pos(self.origin, self.corner)
    }

    pub fn bounds(&self) -> Rect {
        self.rect().expand(OUTER_PEN / 2.0)
    }

    pub fn hit(&self, p: Pos2) -> bool {
        let rect = self.rect();
        let radius = rect.size() / 2.0 + Vec2::splat(OUTER_PEN / 2.0);
        let d = p - rect.center();
        (d.x / radius.x).powi(2) + (d.y / radius.y).powi(2) <= 1.0
    }

    pub fn paint(&self, painter: &Painter, to_screen: &RectTransform) {
        let rect = to_screen.transform_rect(self.rect());
        let points = ellipse_points(rect.center(), rect.size() / 2.0, SEGMENTS);
        painter.add(Shape::closed_line(
            points.clone(),
            Stroke::new(OUTER_PEN, Color32::WHITE),
        ));
        painter.add(Shape::closed_line(
            points,
            Stroke::new(INNER_PEN, self.color),
        ));
    }
}
