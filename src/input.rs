use egui::emath::RectTransform;
use egui::{Event, InputState, Modifiers, PointerButton, Pos2, Rect};

/// Primary-button pointer input, already mapped into the coordinates the
/// receiver works in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { pos: Pos2, additive: bool },
    Move { pos: Pos2, primary_held: bool },
    Up(Pos2),
}

/// Ctrl or Shift toggles instead of replacing the selection.
fn is_additive(modifiers: Modifiers) -> bool {
    modifiers.ctrl || modifiers.shift || modifiers.command
}

/// Splits a frame's raw events into [`PointerEvent`]s. A press only counts
/// when it lands inside `area`, and the matching release is reported even
/// if the pointer has left it by then.
#[derive(Debug, Default)]
pub struct PointerTracker {
    held: bool,
}

impl PointerTracker {
    pub fn collect(
        &mut self,
        input: &InputState,
        area: Rect,
        to_local: &RectTransform,
    ) -> Vec<PointerEvent> {
        self.feed(&input.events, area, to_local)
    }

    fn feed(&mut self, events: &[Event], area: Rect, to_local: &RectTransform) -> Vec<PointerEvent> {
        let mut out = Vec::new();
        for event in events {
            match *event {
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: true,
                    modifiers,
                } => {
                    if area.contains(pos) && !self.held {
                        self.held = true;
                        out.push(PointerEvent::Down {
                            pos: to_local.transform_pos(pos),
                            additive: is_additive(modifiers),
                        });
                    }
                }
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: false,
                    ..
                } => {
                    if std::mem::take(&mut self.held) {
                        out.push(PointerEvent::Up(to_local.transform_pos(pos)));
                    }
                }
                Event::PointerMoved(pos) => {
                    if self.held || area.contains(pos) {
                        out.push(PointerEvent::Move {
                            pos: to_local.transform_pos(pos),
                            primary_held: self.held,
                        });
                    }
                }
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    fn press(x: f32, y: f32, pressed: bool) -> Event {
        Event::PointerButton {
            pos: pos2(x, y),
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::NONE,
        }
    }

    fn area() -> Rect {
        Rect::from_min_size(pos2(0.0, 40.0), vec2(200.0, 100.0))
    }

    /// Screen area shifted down by the toolbar, scene at the origin.
    fn to_scene() -> RectTransform {
        RectTransform::from_to(area(), Rect::from_min_size(Pos2::ZERO, vec2(200.0, 100.0)))
    }

    #[test]
    fn press_drag_release() {
        let mut t = PointerTracker::default();
        let events = t.feed(
            &[
                press(10.0, 50.0, true),
                Event::PointerMoved(pos2(20.0, 60.0)),
                press(20.0, 60.0, false),
            ],
            area(),
            &to_scene(),
        );
        assert_eq!(
            events,
            vec![
                PointerEvent::Down {
                    pos: pos2(10.0, 10.0),
                    additive: false
                },
                PointerEvent::Move {
                    pos: pos2(20.0, 20.0),
                    primary_held: true
                },
                PointerEvent::Up(pos2(20.0, 20.0)),
            ]
        );
        assert!(!t.held);
    }

    #[test]
    fn press_outside_area_is_ignored() {
        let mut t = PointerTracker::default();
        let events = t.feed(
            &[press(10.0, 10.0, true), press(10.0, 10.0, false)],
            area(),
            &to_scene(),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn release_outside_area_still_ends_the_drag() {
        let mut t = PointerTracker::default();
        let events = t.feed(
            &[
                press(10.0, 50.0, true),
                Event::PointerMoved(pos2(500.0, 5.0)),
                press(500.0, 5.0, false),
            ],
            area(),
            &to_scene(),
        );
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], PointerEvent::Up(pos2(500.0, -35.0)));
    }

    #[test]
    fn shift_click_is_additive() {
        let mut t = PointerTracker::default();
        let events = t.feed(
            &[Event::PointerButton {
                pos: pos2(10.0, 50.0),
                button: PointerButton::Primary,
                pressed: true,
                modifiers: Modifiers::SHIFT,
            }],
            area(),
            &to_scene(),
        );
        assert!(matches!(events[0], PointerEvent::Down { additive: true, .. }));
    }
}
