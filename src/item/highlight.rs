use egui::{Color32, Painter, Rect, Shape, Stroke};

/// Gap between an item's bounds and its selection frame.
pub const INSET: f32 = 4.0;

const DASH: f32 = 4.0;

/// Black or white, whichever is further from `fg` on most channels.
pub fn contrast_color(fg: Color32) -> Color32 {
    let bright = [fg.r(), fg.g(), fg.b()]
        .into_iter()
        .filter(|&c| c > 127)
        .count();
    if bright >= 2 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

/// Paints the selection frame: a solid contrast stroke with a dashed stroke
/// in the theme colour on top.
pub fn paint(painter: &Painter, bounds: Rect, theme_fg: Color32) {
    let r = bounds.shrink(INSET);
    let corners = [
        r.left_top(),
        r.right_top(),
        r.right_bottom(),
        r.left_bottom(),
        r.left_top(),
    ];
    painter.add(Shape::closed_line(
        corners[..4].to_vec(),
        Stroke::new(1.0, contrast_color(theme_fg)),
    ));
    painter.extend(Shape::dashed_line(
        &corners,
        Stroke::new(1.0, theme_fg),
        DASH,
        DASH,
    ));
}
