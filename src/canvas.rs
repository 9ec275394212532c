use egui::{Color32, Pos2, Rect};
use log::debug;

use crate::item::{Arrow, Ellipse, Item, ItemKind, Text};
use crate::scene::{ItemId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pointer,
    Arrow,
    Ellipse,
    Text,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Pointer, Tool::Arrow, Tool::Ellipse, Tool::Text];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Pointer => "🖱 Pointer",
            Tool::Arrow => "↗ Arrow",
            Tool::Ellipse => "⭕ Ellipse",
            Tool::Text => "T Text",
        }
    }
}

/// What the canvas needs from the window that owns it.
pub trait ToolHost {
    fn current_tool(&self) -> Tool;
    fn current_color(&self) -> Color32;
    fn set_tool(&mut self, tool: Tool);
    /// Called once per item, when the drag that created it ends.
    fn creation_complete(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasState {
    #[default]
    Idle,
    Creating(ItemId),
}

/// Pointer-tool gestures.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Gesture {
    #[default]
    None,
    Move {
        last: Pos2,
    },
    RubberBand {
        origin: Pos2,
        current: Pos2,
    },
}

/// Turns pointer and key input on the drawing surface into item creation,
/// live resizing, selection, moving and deletion. Positions are in scene
/// coordinates. Every method that can touch item geometry or content returns
/// whether the scene changed.
#[derive(Debug, Default)]
pub struct Canvas {
    state: CanvasState,
    gesture: Gesture,
    text_size: f32,
}

impl Canvas {
    pub fn new(text_size: f32) -> Self {
        Self {
            text_size,
            ..Default::default()
        }
    }

    pub fn text_size(&self) -> f32 {
        self.text_size
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn rubber_band(&self) -> Option<Rect> {
        match self.gesture {
            Gesture::RubberBand { origin, current } => Some(Rect::from_two_pos(origin, current)),
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        scene: &mut Scene,
        host: &impl ToolHost,
        pos: Pos2,
        additive: bool,
    ) -> bool {
        if self.state != CanvasState::Idle {
            return false;
        }
        let color = host.current_color();
        let item = match host.current_tool() {
            Tool::Pointer => {
                self.press_pointer(scene, pos, additive);
                return false;
            }
            Tool::Arrow => Item::Arrow(Arrow::new(pos, color)),
            Tool::Ellipse => Item::Ellipse(Ellipse::new(pos, color)),
            Tool::Text => Item::Text(Text::new(pos, color, self.text_size)),
        };
        debug!("creating {:?} at {pos:?}", item.kind());
        scene.lose_focus_all();
        scene.clear_selection();
        let id = scene.insert(item);
        scene.set_selected(id, true);
        self.state = CanvasState::Creating(id);
        true
    }

    fn press_pointer(&mut self, scene: &mut Scene, pos: Pos2, additive: bool) {
        let hit = scene.topmost_at(pos);
        if scene.editing_text().is_some() && scene.editing_text() != hit {
            scene.lose_focus_all();
        }
        self.gesture = match hit {
            Some(id) => {
                if additive {
                    scene.set_selected(id, !scene.is_selected(id));
                } else if !scene.is_selected(id) {
                    scene.select_only(id);
                }
                if scene.is_selected(id) {
                    Gesture::Move { last: pos }
                } else {
                    Gesture::None
                }
            }
            None => {
                if !additive {
                    scene.clear_selection();
                }
                Gesture::RubberBand {
                    origin: pos,
                    current: pos,
                }
            }
        };
    }

    pub fn pointer_move(&mut self, scene: &mut Scene, pos: Pos2, primary_held: bool) -> bool {
        if !primary_held {
            self.gesture = Gesture::None;
            return false;
        }
        if let CanvasState::Creating(id) = self.state {
            return match scene.get_mut(id) {
                Some(item) => {
                    item.resize_to(pos);
                    true
                }
                None => false,
            };
        }
        match &mut self.gesture {
            Gesture::Move { last } => {
                let delta = pos - *last;
                *last = pos;
                scene.translate_selected(delta)
            }
            Gesture::RubberBand { current, .. } => {
                *current = pos;
                false
            }
            Gesture::None => false,
        }
    }

    pub fn pointer_up(&mut self, scene: &mut Scene, host: &mut impl ToolHost) -> bool {
        if let CanvasState::Creating(id) = self.state {
            self.state = CanvasState::Idle;
            let kind = scene.get_mut(id).map(|item| {
                item.lose_focus();
                item.kind()
            });
            // A freshly placed text box takes typing straight away.
            if kind == Some(ItemKind::Text) {
                scene.focus_text(id);
            }
            debug!("finished creating {kind:?}");
            host.set_tool(Tool::Pointer);
            host.creation_complete();
            return true;
        }
        if let Gesture::RubberBand { origin, current } = std::mem::take(&mut self.gesture) {
            if origin != current {
                scene.select_intersecting(Rect::from_two_pos(origin, current));
            }
        }
        false
    }

    /// Double-click with the pointer tool puts a text item into editing mode.
    pub fn activate_at(&mut self, scene: &mut Scene, host: &impl ToolHost, pos: Pos2) -> bool {
        if host.current_tool() != Tool::Pointer || self.state != CanvasState::Idle {
            return false;
        }
        match scene.topmost_at(pos) {
            Some(id) if scene.get(id).is_some_and(|i| i.kind() == ItemKind::Text) => {
                scene.focus_text(id)
            }
            _ => false,
        }
    }

    /// The Delete key. A text in editing mode keeps the key for itself.
    pub fn delete_selected(&mut self, scene: &mut Scene) -> usize {
        if scene.editing_text().is_some() {
            return 0;
        }
        self.gesture = Gesture::None;
        let removed = scene.remove_selected();
        if removed > 0 {
            debug!("deleted {removed} item(s)");
        }
        removed
    }

    pub fn type_text(&mut self, scene: &mut Scene, s: &str) -> bool {
        let Some(id) = scene.editing_text() else {
            return false;
        };
        match scene.get_mut(id).and_then(Item::as_text_mut) {
            Some(text) => {
                text.insert(s);
                true
            }
            None => false,
        }
    }

    pub fn backspace(&mut self, scene: &mut Scene) -> bool {
        let Some(id) = scene.editing_text() else {
            return false;
        };
        scene
            .get_mut(id)
            .and_then(Item::as_text_mut)
            .is_some_and(|text| text.backspace())
    }
}
