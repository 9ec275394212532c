//! Annotation items: the drawable, drag-sized objects of a scene.

pub mod arrow;
mod background;
pub mod ellipse;
pub mod highlight;
pub mod text;

pub use arrow::Arrow;
pub use background::Background;
pub use ellipse::Ellipse;
pub use text::Text;

use egui::emath::RectTransform;
use egui::{Painter, Pos2, Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Arrow,
    Ellipse,
    Text,
    Background,
}

#[derive(Debug, Clone)]
pub enum Item {
    Arrow(Arrow),
    Ellipse(Ellipse),
    Text(Text),
    Background(Background),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Arrow(_) => ItemKind::Arrow,
            Item::Ellipse(_) => ItemKind::Ellipse,
            Item::Text(_) => ItemKind::Text,
            Item::Background(_) => ItemKind::Background,
        }
    }

    /// Follows the pointer while the item is being dragged out.
    pub fn resize_to(&mut self, p: Pos2) {
        match self {
            Item::Arrow(a) => a.resize_to(p),
            Item::Ellipse(e) => e.resize_to(p),
            Item::Text(t) => t.resize_to(p),
            Item::Background(_) => {}
        }
    }

    /// Ends any item-local interaction mode.
    pub fn lose_focus(&mut self) {
        if let Item::Text(t) = self {
            t.lose_focus();
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Item::Arrow(a) => a.bounds(),
            Item::Ellipse(e) => e.bounds(),
            Item::Text(t) => t.bounds(),
            Item::Background(b) => b.bounds(),
        }
    }

    /// Precise hit test against the item's painted shape.
    pub fn hit(&self, p: Pos2) -> bool {
        match self {
            Item::Arrow(a) => a.hit(p),
            Item::Ellipse(e) => e.hit(p),
            Item::Text(t) => t.hit(p),
            Item::Background(b) => b.hit(p),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Item::Arrow(a) => a.translate(delta),
            Item::Ellipse(e) => e.translate(delta),
            Item::Text(t) => t.translate(delta),
            Item::Background(b) => b.translate(delta),
        }
    }

    pub fn is_selectable(&self) -> bool {
        !matches!(self, Item::Background(b) if b.is_pinned())
    }

    pub fn is_movable(&self) -> bool {
        self.is_selectable()
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Item::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Item::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn paint(&self, painter: &Painter, to_screen: &RectTransform) {
        match self {
            Item::Arrow(a) => a.paint(painter, to_screen),
            Item::Ellipse(e) => e.paint(painter, to_screen),
            Item::Text(t) => t.paint(painter, to_screen),
            Item::Background(b) => b.paint(painter, to_screen),
        }
    }
}
