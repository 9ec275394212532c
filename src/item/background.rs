use std::fmt;
use std::sync::Arc;

use egui::emath::RectTransform;
use egui::{Color32, ColorImage, Painter, Pos2, Rect, TextureHandle, Vec2, pos2, vec2};
use image::RgbaImage;

/// Captured or opened pixels placed beneath the annotations.
///
/// A pinned background can be neither moved nor selected. Resizing never
/// applies to backgrounds.
#[derive(Clone)]
pub struct Background {
    pub pos: Pos2,
    image: Arc<RgbaImage>,
    pinned: bool,
    texture: Option<TextureHandle>,
}

impl Background {
    pub fn new(image: RgbaImage, pinned: bool) -> Self {
        Self {
            pos: Pos2::ZERO,
            image: Arc::new(image),
            pinned,
            texture: None,
        }
    }

    /// Places the pixels in the middle of `area`.
    pub fn centered_in(mut self, area: Rect) -> Self {
        self.pos = area.min + (area.size() - self.size()) / 2.0;
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn size(&self) -> Vec2 {
        vec2(self.image.width() as f32, self.image.height() as f32)
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn translate(&mut self, delta: Vec2) {
        if !self.pinned {
            self.pos += delta;
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(self.pos, self.size())
    }

    pub fn hit(&self, p: Pos2) -> bool {
        self.bounds().contains(p)
    }

    pub fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_none() {
            let color_image = ColorImage::from_rgba_unmultiplied(
                [self.image.width() as usize, self.image.height() as usize],
                self.image.as_flat_samples().as_slice(),
            );
            self.texture = Some(ctx.load_texture("background", color_image, Default::default()));
        }
    }

    pub fn paint(&self, painter: &Painter, to_screen: &RectTransform) {
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                to_screen.transform_rect(self.bounds()),
                Rect::from_min_max(Pos2::ZERO, pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }
}

impl fmt::Debug for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Background")
            .field("pos", &self.pos)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("pinned", &self.pinned)
            .finish()
    }
}
