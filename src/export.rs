//! Flattens a scene into a single raster for saving and copying.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, FontRef, FontVec, PxScale, ScaleFont, point};
use egui::{Color32, FontDefinitions, FontFamily, vec2};
use image::RgbaImage;
use log::{debug, warn};
use thiserror::Error;
use tiny_skia::{
    FillRule, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8,
    Stroke, Transform,
};

use crate::item::{Arrow, Background, Ellipse, Item, Text, arrow, ellipse, text};
use crate::scene::Scene;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    EmptyScene,
    #[error("cannot allocate a {0}x{1} canvas")]
    Canvas(u32, u32),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Clipboard(#[from] arboard::Error),
}

/// Composites every item, in paint order, over a transparent canvas the
/// size of the items' bounding box.
pub fn flatten(scene: &Scene) -> Result<RgbaImage, ExportError> {
    let bounds = scene
        .items_bounding_rect()
        .ok_or(ExportError::EmptyScene)?;
    let (w, h) = (
        bounds.width().ceil().max(1.0) as u32,
        bounds.height().ceil().max(1.0) as u32,
    );
    let mut pixmap = Pixmap::new(w, h).ok_or(ExportError::Canvas(w, h))?;
    let mut canvas = Flattener {
        offset: bounds.min.to_vec2(),
        font: None,
    };
    for (_, item) in scene.items() {
        match item {
            Item::Background(bg) => canvas.background(&mut pixmap, bg),
            Item::Arrow(a) => canvas.arrow(&mut pixmap, a),
            Item::Ellipse(e) => canvas.ellipse(&mut pixmap, e),
            Item::Text(t) => canvas.text(&mut pixmap, t),
        }
    }
    debug!("flattened {} item(s) into {w}x{h}", scene.items().count());
    Ok(demultiplied(&pixmap))
}

/// Writes the flattened scene as PNG. A missing `.png` extension is
/// appended; the path actually written is returned.
pub fn write_png(scene: &Scene, path: &Path) -> Result<PathBuf, ExportError> {
    let path = with_png_extension(path);
    flatten(scene)?.save_with_format(&path, image::ImageFormat::Png)?;
    Ok(path)
}

pub fn copy_to_clipboard(scene: &Scene) -> Result<(), ExportError> {
    let image = flatten(scene)?;
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_image(arboard::ImageData {
        width: image.width() as usize,
        height: image.height() as usize,
        bytes: Cow::Borrowed(image.as_raw()),
    })?;
    Ok(())
}

pub fn with_png_extension(path: &Path) -> PathBuf {
    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".png");
        PathBuf::from(name)
    }
}

struct Flattener {
    offset: egui::Vec2,
    font: Option<Option<FontArc>>,
}

impl Flattener {
    fn transform(&self) -> Transform {
        Transform::from_translate(-self.offset.x, -self.offset.y)
    }

    fn background(&self, pixmap: &mut Pixmap, bg: &Background) {
        let Some(source) = premultiplied(bg.image()) else {
            return;
        };
        let at = bg.pos - self.offset;
        pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &PixmapPaint::default(),
            Transform::from_translate(at.x, at.y),
            None,
        );
    }

    fn arrow(&self, pixmap: &mut Pixmap, a: &Arrow) {
        let outline = a.outline();
        let mut pb = PathBuilder::new();
        pb.move_to(outline[0].x, outline[0].y);
        for p in &outline[1..] {
            pb.line_to(p.x, p.y);
        }
        pb.close();
        let Some(path) = pb.finish() else {
            return;
        };
        pixmap.fill_path(
            &path,
            &paint(a.color),
            FillRule::Winding,
            self.transform(),
            None,
        );
        let stroke = Stroke {
            width: arrow::OUTLINE_WIDTH,
            line_join: LineJoin::Miter,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &paint(Color32::WHITE), &stroke, self.transform(), None);
    }

    fn ellipse(&self, pixmap: &mut Pixmap, e: &Ellipse) {
        let r = e.rect();
        let oval = tiny_skia::Rect::from_ltrb(r.min.x, r.min.y, r.max.x, r.max.y)
            .and_then(PathBuilder::from_oval);
        for (width, color) in [
            (ellipse::OUTER_PEN, Color32::WHITE),
            (ellipse::INNER_PEN, e.color),
        ] {
            match &oval {
                Some(path) => {
                    let stroke = Stroke {
                        width,
                        ..Default::default()
                    };
                    pixmap.stroke_path(path, &paint(color), &stroke, self.transform(), None);
                }
                None => self.collapsed_ellipse(pixmap, r, width, color),
            }
        }
    }

    /// An ellipse without area still shows its pen: a dot, or a line when
    /// only one axis collapsed.
    fn collapsed_ellipse(&self, pixmap: &mut Pixmap, r: egui::Rect, width: f32, color: Color32) {
        if r.width() <= 0.0 && r.height() <= 0.0 {
            let c = r.center();
            if let Some(dot) = PathBuilder::from_circle(c.x, c.y, width / 2.0) {
                pixmap.fill_path(&dot, &paint(color), FillRule::Winding, self.transform(), None);
            }
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(r.min.x, r.min.y);
        pb.line_to(r.max.x, r.max.y);
        let Some(line) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Default::default()
        };
        pixmap.stroke_path(&line, &paint(color), &stroke, self.transform(), None);
    }

    fn text(&mut self, pixmap: &mut Pixmap, t: &Text) {
        let Some(font) = self.font.get_or_insert_with(monospace_font).clone() else {
            return;
        };
        let scaled = font.as_scaled(PxScale::from(t.size));
        let advance = t.size * text::GLYPH_WIDTH;
        let origin = t.origin - self.offset;
        for (row, line) in t.lines().iter().enumerate() {
            let top = origin + vec2(0.0, row as f32 * t.line_height());
            for (offset, color) in text::OUTLINE_OFFSETS
                .iter()
                .map(|&o| (o, Color32::WHITE))
                .chain(std::iter::once((egui::Vec2::ZERO, t.color)))
            {
                for (col, ch) in line.chars().enumerate() {
                    let mut glyph = scaled.scaled_glyph(ch);
                    glyph.position = point(
                        top.x + offset.x + col as f32 * advance,
                        top.y + offset.y + scaled.ascent(),
                    );
                    let Some(outlined) = scaled.outline_glyph(glyph) else {
                        continue;
                    };
                    let px = outlined.px_bounds();
                    outlined.draw(|x, y, coverage| {
                        blend(
                            pixmap,
                            x as i32 + px.min.x as i32,
                            y as i32 + px.min.y as i32,
                            color,
                            coverage,
                        );
                    });
                }
            }
        }
    }
}

fn paint(color: Color32) -> Paint<'static> {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

/// egui's bundled monospace face, so exported text matches the screen.
fn monospace_font() -> Option<FontArc> {
    let definitions = FontDefinitions::default();
    let name = definitions.families.get(&FontFamily::Monospace)?.first()?;
    let data = definitions.font_data.get(name)?;
    let font = match &data.font {
        Cow::Borrowed(bytes) => FontRef::try_from_slice_and_index(*bytes, data.index)
            .map(FontArc::from)
            .ok(),
        Cow::Owned(bytes) => FontVec::try_from_vec_and_index(bytes.clone(), data.index)
            .map(FontArc::from)
            .ok(),
    };
    if font.is_none() {
        warn!("cannot load font {name}; text is left out of the export");
    }
    font
}

/// Source-over of one coverage sample; the pixmap holds premultiplied RGBA.
fn blend(pixmap: &mut Pixmap, x: i32, y: i32, color: Color32, coverage: f32) {
    if x < 0 || y < 0 || x >= pixmap.width() as i32 || y >= pixmap.height() as i32 {
        return;
    }
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let sa = (a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let idx = y as usize * pixmap.width() as usize + x as usize;
    let dst = pixmap.pixels()[idx];
    let over = |s: u8, d: u8| (s as f32 * sa + d as f32 * (1.0 - sa)).round() as u8;
    let alpha = (sa * 255.0 + dst.alpha() as f32 * (1.0 - sa)).round() as u8;
    let out = PremultipliedColorU8::from_rgba(
        over(r, dst.red()).min(alpha),
        over(g, dst.green()).min(alpha),
        over(b, dst.blue()).min(alpha),
        alpha,
    );
    if let Some(out) = out {
        pixmap.pixels_mut()[idx] = out;
    }
}

fn premultiplied(image: &RgbaImage) -> Option<Pixmap> {
    let mut data = image.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    Pixmap::from_vec(data, IntSize::from_wh(image.width(), image.height())?)
}

fn demultiplied(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Pos2, Rect, pos2};
    use image::Rgba;

    fn red_square_scene() -> Scene {
        let mut scene = Scene::new(Rect::from_min_size(Pos2::ZERO, vec2(10.0, 10.0)));
        let image = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        scene.insert(Item::Background(
            Background::new(image, true).centered_in(scene.area()),
        ));
        scene
    }

    #[test]
    fn empty_scene_is_an_error() {
        let scene = Scene::new(Rect::from_min_size(Pos2::ZERO, vec2(10.0, 10.0)));
        assert!(matches!(flatten(&scene), Err(ExportError::EmptyScene)));
    }

    #[test]
    fn canvas_covers_all_items() {
        let mut scene = red_square_scene();
        let mut e = Ellipse::new(pos2(30.0, 30.0), Color32::BLUE);
        e.resize_to(pos2(40.0, 40.0));
        scene.insert(Item::Ellipse(e));

        let image = flatten(&scene).unwrap();
        assert_eq!(image.dimensions(), (45, 45));
        assert_eq!(image.get_pixel(2, 2).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(20, 2).0[3], 0);
    }

    #[test]
    fn canvas_starts_at_the_items_not_the_area() {
        let mut scene = Scene::new(Rect::from_min_size(Pos2::ZERO, vec2(820.0, 560.0)));
        let image = RgbaImage::from_pixel(20, 10, Rgba([0, 255, 0, 255]));
        let mut bg = Background::new(image, false);
        bg.pos = pos2(100.5, 200.0);
        scene.insert(Item::Background(bg));

        let flat = flatten(&scene).unwrap();
        assert_eq!(flat.dimensions(), (20, 10));
        assert_eq!(flat.get_pixel(5, 5).0, [0, 255, 0, 255]);
    }

    #[test]
    fn arrow_is_painted_in_its_colour() {
        let mut scene = red_square_scene();
        let mut a = Arrow::new(pos2(0.0, 50.0), Color32::BLUE);
        a.resize_to(pos2(200.0, 50.0));
        scene.insert(Item::Arrow(a));

        let image = flatten(&scene).unwrap();
        let bounds = scene.items_bounding_rect().unwrap();
        // A point on the shaft, well inside the filled outline.
        let at = pos2(150.0, 50.0) - bounds.min;
        assert_eq!(image.get_pixel(at.x as u32, at.y as u32).0, [0, 0, 255, 255]);
    }

    #[test]
    fn clicked_ellipse_exports_as_a_dot() {
        let mut scene = Scene::new(Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0)));
        scene.insert(Item::Ellipse(Ellipse::new(pos2(20.0, 20.0), Color32::BLUE)));

        let image = flatten(&scene).unwrap();
        assert_eq!(image.dimensions(), (10, 10));
        assert_eq!(image.get_pixel(5, 5).0, [0, 0, 255, 255]);
        assert!(image.get_pixel(0, 5).0[3] > 0);
    }

    #[test]
    fn flat_ellipse_exports_as_a_line() {
        let mut scene = Scene::new(Rect::from_min_size(Pos2::ZERO, vec2(100.0, 100.0)));
        let mut e = Ellipse::new(pos2(0.0, 0.0), Color32::BLUE);
        e.resize_to(pos2(40.0, 0.0));
        scene.insert(Item::Ellipse(e));

        let image = flatten(&scene).unwrap();
        assert_eq!(image.dimensions(), (50, 10));
        assert_eq!(image.get_pixel(25, 5).0, [0, 0, 255, 255]);
    }

    #[test]
    fn text_leaves_ink() {
        let mut scene = Scene::new(Rect::from_min_size(Pos2::ZERO, vec2(10.0, 10.0)));
        let mut t = Text::new(pos2(0.0, 0.0), Color32::BLACK, 24.0);
        t.insert("WW");
        scene.insert(Item::Text(t));

        let image = flatten(&scene).unwrap();
        assert!(image.pixels().any(|p| p.0[3] > 0));
    }

    #[test]
    fn png_extension_is_appended() {
        assert_eq!(with_png_extension(Path::new("a/shot")), PathBuf::from("a/shot.png"));
        assert_eq!(with_png_extension(Path::new("a/shot.PNG")), PathBuf::from("a/shot.PNG"));
        assert_eq!(with_png_extension(Path::new("shot.jpg")), PathBuf::from("shot.jpg.png"));
    }

    #[test]
    fn write_png_round_trips_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_png(&red_square_scene(), &dir.path().join("out")).unwrap();
        assert_eq!(written, dir.path().join("out.png"));
        let back = image::open(&written).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (10, 10));
        assert_eq!(back.get_pixel(9, 9).0, [255, 0, 0, 255]);
    }
}
