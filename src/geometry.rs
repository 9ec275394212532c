use egui::{Pos2, Rect, Vec2, pos2, vec2};

/// Shortest distance from `p` to the segment `a`..`b`.
pub fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let line_vec = b - a;
    let len_sq = line_vec.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(line_vec) / len_sq).clamp(0.0, 1.0);
    let projection = a + line_vec * t;
    p.distance(projection)
}

/// Even-odd containment test against a closed polygon given by its vertices.
pub fn point_in_polygon(p: Pos2, polygon: &[Pos2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Points on an axis-aligned ellipse, suitable for a closed polyline.
pub fn ellipse_points(center: Pos2, radius: Vec2, segments: usize) -> Vec<Pos2> {
    let segments = segments.max(8);
    (0..segments)
        .map(|i| {
            let t = i as f32 / segments as f32 * std::f32::consts::TAU;
            pos2(center.x + radius.x * t.cos(), center.y + radius.y * t.sin())
        })
        .collect()
}

/// Grows `rect` outwards to whole pixels.
pub fn aligned(rect: Rect) -> Rect {
    Rect::from_min_max(
        pos2(rect.min.x.floor(), rect.min.y.floor()),
        pos2(rect.max.x.ceil(), rect.max.y.ceil()),
    )
}

/// Window size needed to show `content` without clipping, given the current
/// window size and the part of it the drawing surface occupies. Never shrinks.
pub fn grown_window_size(window: Vec2, viewport: Vec2, content: Vec2) -> Vec2 {
    let needed = window - viewport + content;
    vec2(needed.x.max(window.x), needed.y.max(window.y))
}
