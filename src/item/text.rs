use egui::emath::RectTransform;
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2, vec2};

/// Advance of one glyph, relative to the font size.
pub const GLYPH_WIDTH: f32 = 0.6;
/// Distance between baselines, relative to the font size.
pub const LINE_HEIGHT: f32 = 1.2;

/// Offsets of the white copies drawn beneath the glyphs.
pub const OUTLINE_OFFSETS: [Vec2; 4] = [
    vec2(-1.0, 0.0),
    vec2(1.0, 0.0),
    vec2(0.0, -1.0),
    vec2(0.0, 1.0),
];

/// A block of text anchored at its top-left corner.
///
/// Dragging during creation sets the wrapping width. The item only accepts
/// typed input while it is in editing mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub origin: Pos2,
    pub content: String,
    pub color: Color32,
    pub size: f32,
    wrap_width: Option<f32>,
    editing: bool,
}

impl Text {
    pub fn new(origin: Pos2, color: Color32, size: f32) -> Self {
        Self {
            origin,
            content: String::new(),
            color,
            size,
            wrap_width: None,
            editing: false,
        }
    }

    /// A non-positive width switches wrapping off.
    pub fn resize_to(&mut self, p: Pos2) {
        let width = p.x - self.origin.x;
        self.wrap_width = (width > 0.0).then_some(width);
    }

    #[cfg(test)]
    pub fn wrap_width(&self) -> Option<f32> {
        self.wrap_width
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.origin += delta;
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn activate(&mut self) {
        self.editing = true;
    }

    pub fn lose_focus(&mut self) {
        self.editing = false;
    }

    pub fn insert(&mut self, s: &str) {
        self.content.push_str(s);
    }

    pub fn backspace(&mut self) -> bool {
        self.content.pop().is_some()
    }

    fn glyph_width(&self) -> f32 {
        self.size * GLYPH_WIDTH
    }

    pub fn line_height(&self) -> f32 {
        self.size * LINE_HEIGHT
    }

    /// Breaks the content into display lines: hard breaks first, then the
    /// wrapping width if one is set.
    pub fn lines(&self) -> Vec<String> {
        let per_line = self
            .wrap_width
            .map(|w| ((w / self.glyph_width()).floor() as usize).max(1));
        let mut lines = Vec::new();
        for paragraph in self.content.split('\n') {
            let chars: Vec<char> = paragraph.chars().collect();
            match per_line {
                Some(n) if chars.len() > n => {
                    lines.extend(chars.chunks(n).map(|c| c.iter().collect::<String>()));
                }
                _ => lines.push(paragraph.to_owned()),
            }
        }
        lines
    }

    pub fn bounds(&self) -> Rect {
        let lines = self.lines();
        let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = self
            .wrap_width
            .unwrap_or(longest as f32 * self.glyph_width())
            .max(self.glyph_width());
        Rect::from_min_size(
            self.origin,
            vec2(width, lines.len().max(1) as f32 * self.line_height()),
        )
    }

    pub fn hit(&self, p: Pos2) -> bool {
        self.bounds().contains(p)
    }

    pub fn paint(&self, painter: &Painter, to_screen: &RectTransform) {
        let scale = to_screen.scale().y;
        let font = FontId::monospace(self.size * scale);
        let origin = to_screen.transform_pos(self.origin);
        let line_height = self.line_height() * scale;
        let lines = self.lines();

        for (i, line) in lines.iter().enumerate() {
            let pos = origin + vec2(0.0, i as f32 * line_height);
            for offset in OUTLINE_OFFSETS {
                painter.text(pos + offset, Align2::LEFT_TOP, line, font.clone(), Color32::WHITE);
            }
            painter.text(pos, Align2::LEFT_TOP, line, font.clone(), self.color);
        }

        if self.editing {
            let row = lines.len().saturating_sub(1);
            let column = lines.last().map(|l| l.chars().count()).unwrap_or(0);
            let top = origin
                + vec2(
                    column as f32 * self.glyph_width() * scale,
                    row as f32 * line_height,
                );
            painter.line_segment(
                [top, top + vec2(0.0, self.size * scale)],
                Stroke::new(1.5, self.color),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn text(content: &str) -> Text {
        let mut t = Text::new(pos2(10.0, 20.0), Color32::RED, 10.0);
        t.insert(content);
        t
    }

    #[test]
    fn drag_sets_wrap_width() {
        let mut t = text("hello");
        t.resize_to(pos2(70.0, 500.0));
        assert_eq!(t.wrap_width(), Some(60.0));
        t.resize_to(pos2(5.0, 0.0));
        assert_eq!(t.wrap_width(), None);
    }

    #[test]
    fn wraps_by_glyph_count() {
        let mut t = text("abcdefghij\nxy");
        // 6px glyphs: 30px fits five.
        t.resize_to(pos2(40.0, 0.0));
        assert_eq!(t.lines(), vec!["abcde", "fghij", "xy"]);
        assert_eq!(
            t.bounds(),
            Rect::from_min_size(pos2(10.0, 20.0), vec2(30.0, 36.0))
        );
    }

    #[test]
    fn empty_text_keeps_a_clickable_box() {
        let t = text("");
        assert_eq!(t.lines(), vec![String::new()]);
        assert!(t.hit(pos2(12.0, 22.0)));
    }

    #[test]
    fn lose_focus_is_idempotent() {
        let mut t = text("x");
        t.activate();
        assert!(t.is_editing());
        t.lose_focus();
        let once = t.clone();
        t.lose_focus();
        assert_eq!(t, once);
        assert!(!t.is_editing());
    }

    #[test]
    fn editing_helpers() {
        let mut t = text("ab");
        assert!(t.backspace());
        assert_eq!(t.content, "a");
        assert!(t.backspace());
        assert!(!t.backspace());
    }
}
