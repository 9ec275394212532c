use egui::{Pos2, Rect, Vec2};

use crate::item::Item;

/// Stable handle to an item in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

#[derive(Debug)]
struct Entry {
    id: ItemId,
    item: Item,
    selected: bool,
}

/// Ordered items of one document plus their selection state.
///
/// Insertion order is paint order. The working area is the region a fresh
/// document shows before anything has been placed.
#[derive(Debug)]
pub struct Scene {
    entries: Vec<Entry>,
    next_id: u64,
    area: Rect,
}

impl Scene {
    pub fn new(area: Rect) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            area,
        }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
    }

    pub fn insert(&mut self, item: Item) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            item,
            selected: false,
        });
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.item)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.item)
    }

    /// Items in paint order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.entries.iter().map(|e| (e.id, &e.item))
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.entries.iter_mut().map(|e| &mut e.item)
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<ItemId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.entries.iter().any(|e| e.id == id && e.selected)
    }

    /// Unselectable items stay unselected.
    pub fn set_selected(&mut self, id: ItemId, selected: bool) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.selected = selected && entry.item.is_selectable();
        }
    }

    pub fn select_only(&mut self, id: ItemId) {
        self.clear_selection();
        self.set_selected(id, true);
    }

    pub fn clear_selection(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
    }

    #[cfg(test)]
    pub fn selected(&self) -> Vec<ItemId> {
        self.entries
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.id)
            .collect()
    }

    /// Removes every selected item and returns how many went.
    pub fn remove_selected(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.selected);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Tight box around every item, `None` for an empty scene.
    pub fn items_bounding_rect(&self) -> Option<Rect> {
        self.entries
            .iter()
            .map(|e| e.item.bounds())
            .reduce(|a, b| a.union(b))
    }

    /// The region the canvas has to show: the working area grown to fit
    /// every item.
    pub fn scene_rect(&self) -> Rect {
        match self.items_bounding_rect() {
            Some(bounds) => self.area.union(bounds),
            None => self.area,
        }
    }

    /// Topmost selectable item whose shape contains `p`.
    pub fn topmost_at(&self, p: Pos2) -> Option<ItemId> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.item.is_selectable() && e.item.hit(p))
            .map(|e| e.id)
    }

    /// Selects every selectable item whose bounds meet `rect`.
    pub fn select_intersecting(&mut self, rect: Rect) -> usize {
        let mut count = 0;
        for entry in &mut self.entries {
            if entry.item.is_selectable() && entry.item.bounds().intersects(rect) {
                entry.selected = true;
                count += 1;
            }
        }
        count
    }

    /// Moves every selected movable item; returns whether anything moved.
    pub fn translate_selected(&mut self, delta: Vec2) -> bool {
        if delta == Vec2::ZERO {
            return false;
        }
        let mut moved = false;
        for entry in &mut self.entries {
            if entry.selected && entry.item.is_movable() {
                entry.item.translate(delta);
                moved = true;
            }
        }
        moved
    }

    /// The text item currently accepting typed input.
    pub fn editing_text(&self) -> Option<ItemId> {
        self.entries
            .iter()
            .find(|e| e.item.as_text().is_some_and(|t| t.is_editing()))
            .map(|e| e.id)
    }

    /// Gives keyboard focus to the text `id`; every other item loses focus.
    pub fn focus_text(&mut self, id: ItemId) -> bool {
        let mut focused = false;
        for entry in &mut self.entries {
            if entry.id == id {
                if let Some(text) = entry.item.as_text_mut() {
                    text.activate();
                    focused = true;
                }
            } else {
                entry.item.lose_focus();
            }
        }
        focused
    }

    pub fn lose_focus_all(&mut self) {
        for entry in &mut self.entries {
            entry.item.lose_focus();
        }
    }

    pub fn prepare_textures(&mut self, ctx: &egui::Context) {
        for item in self.items_mut() {
            if let Item::Background(bg) = item {
                bg.ensure_texture(ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Arrow, Background, Ellipse, Text};
    use egui::{Color32, pos2, vec2};
    use image::RgbaImage;

    fn ellipse(x: f32, y: f32) -> Item {
        let mut e = Ellipse::new(pos2(x, y), Color32::RED);
        e.resize_to(pos2(x + 20.0, y + 20.0));
        Item::Ellipse(e)
    }

    fn scene() -> Scene {
        Scene::new(Rect::from_min_size(Pos2::ZERO, vec2(820.0, 560.0)))
    }

    #[test]
    fn delete_without_selection_is_noop() {
        let mut scene = scene();
        let ids: Vec<_> = (0..3).map(|i| scene.insert(ellipse(i as f32 * 50.0, 0.0))).collect();
        assert_eq!(scene.remove_selected(), 0);
        assert_eq!(scene.ids(), ids);
    }

    #[test]
    fn delete_removes_exactly_the_selection() {
        let mut scene = scene();
        let ids: Vec<_> = (0..6).map(|i| scene.insert(ellipse(i as f32 * 50.0, 0.0))).collect();
        scene.set_selected(ids[1], true);
        scene.set_selected(ids[3], true);
        scene.set_selected(ids[4], true);

        assert_eq!(scene.remove_selected(), 3);
        assert_eq!(scene.ids(), vec![ids[0], ids[2], ids[5]]);
        assert!(scene.selected().is_empty());
    }

    #[test]
    fn pinned_items_refuse_selection() {
        let mut scene = scene();
        let bg = scene.insert(Item::Background(Background::new(RgbaImage::new(10, 10), true)));
        scene.set_selected(bg, true);
        assert!(!scene.is_selected(bg));
        assert_eq!(scene.topmost_at(pos2(5.0, 5.0)), None);
    }

    #[test]
    fn topmost_prefers_later_items() {
        let mut scene = scene();
        let first = scene.insert(ellipse(0.0, 0.0));
        let second = scene.insert(ellipse(5.0, 5.0));
        assert_eq!(scene.topmost_at(pos2(15.0, 15.0)), Some(second));
        assert_eq!(scene.topmost_at(pos2(0.0, 10.0)), Some(first));
        assert_eq!(scene.topmost_at(pos2(400.0, 400.0)), None);
    }

    #[test]
    fn bounds_and_scene_rect() {
        let mut scene = scene();
        assert_eq!(scene.items_bounding_rect(), None);
        assert_eq!(scene.scene_rect(), scene.area());

        let mut arrow = Arrow::new(pos2(800.0, 500.0), Color32::RED);
        arrow.resize_to(pos2(1000.0, 500.0));
        scene.insert(Item::Arrow(arrow));
        let bounds = scene.items_bounding_rect().unwrap();
        assert!(bounds.max.x > 1000.0);
        assert_eq!(scene.scene_rect().min, Pos2::ZERO);
        assert_eq!(scene.scene_rect().max.x, bounds.max.x);
    }

    #[test]
    fn translate_moves_only_selected() {
        let mut scene = scene();
        let a = scene.insert(ellipse(0.0, 0.0));
        let b = scene.insert(ellipse(100.0, 0.0));
        scene.select_only(a);
        assert!(scene.translate_selected(vec2(10.0, 0.0)));
        assert_eq!(scene.get(a).unwrap().bounds().min.x, 5.0);
        assert_eq!(scene.get(b).unwrap().bounds().min.x, 95.0);
        assert!(!scene.translate_selected(Vec2::ZERO));
    }

    #[test]
    fn rubber_band_selects_intersecting() {
        let mut scene = scene();
        let a = scene.insert(ellipse(0.0, 0.0));
        let b = scene.insert(ellipse(100.0, 0.0));
        let c = scene.insert(ellipse(300.0, 300.0));
        let n = scene.select_intersecting(Rect::from_min_max(pos2(10.0, 10.0), pos2(110.0, 12.0)));
        assert_eq!(n, 2);
        assert_eq!(scene.selected(), vec![a, b]);
        assert!(!scene.is_selected(c));
    }

    #[test]
    fn focus_moves_between_texts() {
        let mut scene = scene();
        let t1 = scene.insert(Item::Text(Text::new(pos2(0.0, 0.0), Color32::RED, 24.0)));
        let t2 = scene.insert(Item::Text(Text::new(pos2(0.0, 100.0), Color32::RED, 24.0)));
        let e = scene.insert(ellipse(0.0, 0.0));

        assert!(scene.focus_text(t1));
        assert_eq!(scene.editing_text(), Some(t1));
        assert!(scene.focus_text(t2));
        assert_eq!(scene.editing_text(), Some(t2));
        assert!(!scene.focus_text(e));
        assert_eq!(scene.editing_text(), None);
    }
}
