use egui::emath::RectTransform;
use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2};

use crate::geometry::{distance_to_segment, point_in_polygon};

/// Width of the white outline drawn around the arrow body.
pub const OUTLINE_WIDTH: f32 = 2.0;

/// Barbs sit at this fraction of the arrow length, measured from the origin.
const BARB_FRACTION: f32 = 0.8;
const SHAFT_ANGLE: f32 = 3.0;
const HEAD_ANGLE: f32 = 8.0;

/// A filled chevron from `origin` to `tip`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub origin: Pos2,
    pub tip: Pos2,
    pub color: Color32,
}

impl Arrow {
    pub fn new(origin: Pos2, color: Color32) -> Self {
        Self {
            origin,
            tip: origin,
            color,
        }
    }

    pub fn resize_to(&mut self, p: Pos2) {
        self.tip = p;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.origin += delta;
        self.tip += delta;
    }

    pub fn length(&self) -> f32 {
        self.origin.distance(self.tip)
    }

    /// Direction of the shaft in degrees, counter-clockwise with the y axis
    /// pointing down the screen.
    fn angle(&self) -> f32 {
        let d = self.tip - self.origin;
        (-d.y).atan2(d.x).to_degrees()
    }

    fn vertex(&self, fraction: f32, offset_deg: f32) -> Pos2 {
        let reach = self.length() * fraction;
        let theta = (self.angle() + offset_deg).to_radians();
        pos2(
            self.origin.x + reach * theta.cos(),
            self.origin.y - reach * theta.sin(),
        )
    }

    /// The closed outline: origin, two barbs on one side, the tip, two barbs
    /// on the other side and back to the origin.
    pub fn outline(&self) -> [Pos2; 7] {
        [
            self.origin,
            self.vertex(BARB_FRACTION, SHAFT_ANGLE),
            self.vertex(BARB_FRACTION, HEAD_ANGLE),
            self.tip,
            self.vertex(BARB_FRACTION, -HEAD_ANGLE),
            self.vertex(BARB_FRACTION, -SHAFT_ANGLE),
            self.origin,
        ]
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_points(&self.outline()).expand(OUTLINE_WIDTH)
    }

    /// Filled body united with its stroked outline.
    pub fn hit(&self, p: Pos2) -> bool {
        let outline = self.outline();
        if point_in_polygon(p, &outline[..6]) {
            return true;
        }
        outline
            .windows(2)
            .any(|edge| distance_to_segment(p, edge[0], edge[1]) <= OUTLINE_WIDTH / 2.0)
    }

    pub fn paint(&self, painter: &Painter, to_screen: &RectTransform) {
        let [origin, shaft_a, head_a, tip, head_b, shaft_b, _] =
            self.outline().map(|p| to_screen.transform_pos(p));

        // The outline is concave; fill it as three convex pieces.
        for piece in [
            vec![origin, shaft_a, shaft_b],
            vec![shaft_a, head_a, head_b, shaft_b],
            vec![head_a, tip, head_b],
        ] {
            painter.add(Shape::convex_polygon(piece, self.color, Stroke::NONE));
        }
        painter.add(Shape::closed_line(
            vec![origin, shaft_a, head_a, tip, head_b, shaft_b],
            Stroke::new(OUTLINE_WIDTH, Color32::WHITE),
        ));
    }
}
