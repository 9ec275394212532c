//! One document window's state: its scene, the tool/colour choice, the
//! unsaved-changes state machine and the file it belongs to.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use egui::{Color32, Pos2, Rect, Vec2, vec2};
use image::RgbaImage;
use log::{debug, info};

use crate::app::APP_NAME;
use crate::canvas::{Canvas, CanvasState, Tool, ToolHost};
use crate::capture::{CaptureBackend, CaptureError, CaptureRequest, RegionSelector, ScreenHost};
use crate::config::Settings;
use crate::export;
use crate::input::PointerEvent;
use crate::item::{Background, Item};
use crate::overlay::Overlay;
use crate::scene::{ItemId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocStatus {
    #[default]
    Clean,
    Dirty,
}

/// The parts of a document window the canvas reads and writes through
/// [`ToolHost`].
#[derive(Debug)]
pub struct ShellState {
    pub tool: Tool,
    pub color: Color32,
    status: DocStatus,
    /// Nothing has happened yet; the next capture becomes the pinned base.
    fresh: bool,
    /// Anything at all has happened; enables Save As.
    touched: bool,
}

impl ShellState {
    fn new(color: Color32) -> Self {
        Self {
            tool: Tool::Pointer,
            color,
            status: DocStatus::Clean,
            fresh: true,
            touched: false,
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> DocStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.status == DocStatus::Dirty
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    fn mark_dirty(&mut self) {
        if self.status != DocStatus::Dirty {
            debug!("document dirty");
        }
        self.transition(DocStatus::Dirty);
    }

    fn mark_clean(&mut self) {
        self.transition(DocStatus::Clean);
    }

    fn transition(&mut self, status: DocStatus) {
        self.status = status;
        self.fresh = false;
        self.touched = true;
    }
}

impl ToolHost for ShellState {
    fn current_tool(&self) -> Tool {
        self.tool
    }

    fn current_color(&self) -> Color32 {
        self.color
    }

    fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    fn creation_complete(&mut self) {
        self.mark_dirty();
    }
}

/// What became of an open request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The image now fills this document.
    Replaced,
    /// This document has unsaved changes; the file wants a window of its own.
    NewWindow(PathBuf),
}

pub struct Document<H: ScreenHost> {
    pub scene: Scene,
    pub canvas: Canvas,
    pub shell: ShellState,
    selector: RegionSelector<H>,
    filename: Option<PathBuf>,
    notice: Option<String>,
    /// Surface size the window should grow to show in full.
    pending_fit: Option<Vec2>,
}

impl<H: ScreenHost> Document<H> {
    pub fn new(settings: &Settings, host: H) -> Self {
        Self {
            scene: Scene::new(settings.scene_area()),
            canvas: Canvas::new(settings.text_size),
            shell: ShellState::new(settings.default_color()),
            selector: RegionSelector::new(host, Overlay::new(settings.overlay_alpha)),
            filename: None,
            notice: None,
            pending_fit: None,
        }
    }

    /// A document showing `path` as its pinned background.
    pub fn from_file(settings: &Settings, host: H, path: &Path) -> Result<Self> {
        let mut doc = Self::new(settings, host);
        let image = load_image(path)?;
        doc.replace_with(image, path);
        Ok(doc)
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// `*name - snapink`, the asterisk only while there are unsaved changes.
    pub fn title(&self) -> String {
        let base = match self.filename.as_deref().and_then(Path::file_name) {
            Some(name) => format!("{} - {APP_NAME}", name.to_string_lossy()),
            None => APP_NAME.to_owned(),
        };
        if self.shell.is_dirty() {
            format!("*{base}")
        } else {
            base
        }
    }

    pub fn can_save(&self) -> bool {
        self.shell.is_dirty()
    }

    pub fn can_save_as(&self) -> bool {
        self.shell.touched
    }

    pub fn needs_close_prompt(&self) -> bool {
        self.shell.is_dirty()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn take_pending_fit(&mut self) -> Option<Vec2> {
        self.pending_fit.take()
    }

    /// Replaces the contents with `path`, unless there is unsaved work to
    /// keep, in which case the caller gets the path back to open elsewhere.
    pub fn open(&mut self, path: &Path) -> Result<OpenOutcome> {
        if self.shell.is_dirty() {
            info!("unsaved changes, opening {} in a new window", path.display());
            return Ok(OpenOutcome::NewWindow(path.to_path_buf()));
        }
        let image = load_image(path)?;
        self.replace_with(image, path);
        Ok(OpenOutcome::Replaced)
    }

    fn replace_with(&mut self, image: RgbaImage, path: &Path) {
        let size = vec2(image.width() as f32, image.height() as f32);
        self.selector.abort();
        self.scene.clear();
        self.scene.set_area(Rect::from_min_size(Pos2::ZERO, size));
        self.scene
            .insert(Item::Background(Background::new(image, true)));
        self.canvas = Canvas::new(self.canvas.text_size());
        self.filename = Some(path.to_path_buf());
        self.shell.mark_clean();
        self.pending_fit = Some(size);
        self.notice = None;
        info!("opened {}", path.display());
    }

    pub fn selector(&self) -> &RegionSelector<H> {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut RegionSelector<H> {
        &mut self.selector
    }

    /// Arms region selection. Any text being edited loses focus first.
    pub fn begin_capture(&mut self) -> bool {
        if self.canvas.state() != CanvasState::Idle {
            return false;
        }
        self.scene.lose_focus_all();
        self.notice = None;
        self.selector.activate()
    }

    /// Captures what the finished selection asked for and inserts it as a
    /// background. On failure the scene is left as it was.
    pub fn finish_capture(
        &mut self,
        request: CaptureRequest,
        backend: &mut impl CaptureBackend,
    ) -> Result<ItemId, CaptureError> {
        let image = match request {
            CaptureRequest::Point(p) => backend.capture_point(p),
            CaptureRequest::Region(r) => backend.capture_region(r),
        }?;
        let pinned = self.shell.is_fresh();
        let size = vec2(image.width() as f32, image.height() as f32);
        let background = Background::new(image, pinned).centered_in(self.scene.area());
        let id = self.scene.insert(Item::Background(background));
        if pinned {
            self.pending_fit = Some(size);
        } else {
            self.scene.select_only(id);
        }
        self.shell.mark_dirty();
        info!("captured {}x{} ({request:?})", size.x, size.y);
        Ok(id)
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        let changed = match event {
            PointerEvent::Down { pos, additive } => {
                self.canvas
                    .pointer_down(&mut self.scene, &self.shell, pos, additive)
            }
            PointerEvent::Move { pos, primary_held } => {
                self.canvas.pointer_move(&mut self.scene, pos, primary_held)
            }
            PointerEvent::Up(_) => self.canvas.pointer_up(&mut self.scene, &mut self.shell),
        };
        if changed {
            self.shell.mark_dirty();
        }
    }

    pub fn double_click(&mut self, pos: Pos2) {
        self.canvas.activate_at(&mut self.scene, &self.shell, pos);
    }

    pub fn delete_selected(&mut self) -> usize {
        let removed = self.canvas.delete_selected(&mut self.scene);
        if removed > 0 {
            self.shell.mark_dirty();
        }
        removed
    }

    pub fn type_text(&mut self, s: &str) {
        if self.canvas.type_text(&mut self.scene, s) {
            self.shell.mark_dirty();
        }
    }

    pub fn backspace(&mut self) {
        if self.canvas.backspace(&mut self.scene) {
            self.shell.mark_dirty();
        }
    }

    pub fn is_editing_text(&self) -> bool {
        self.scene.editing_text().is_some()
    }

    /// Flattens the scene to `path` (`.png` appended when missing) and makes
    /// it this document's file.
    pub fn save_to(&mut self, path: &Path) -> Result<PathBuf> {
        self.scene.lose_focus_all();
        self.scene.clear_selection();
        let written = export::write_png(&self.scene, path)
            .wrap_err_with(|| format!("cannot save {}", path.display()))?;
        info!("saved {}", written.display());
        self.filename = Some(written.clone());
        self.shell.mark_clean();
        Ok(written)
    }

    pub fn copy_to_clipboard(&self) -> Result<()> {
        export::copy_to_clipboard(&self.scene).wrap_err("cannot copy to the clipboard")
    }
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)
        .wrap_err_with(|| format!("cannot open {}", path.display()))?
        .to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SelectState;
    use crate::item::ItemKind;
    use egui::pos2;
    use image::Rgba;

    #[derive(Default)]
    struct NullHost;

    impl ScreenHost for NullHost {
        fn grab_pointer(&mut self) {}
        fn release_pointer(&mut self) {}
        fn suppress_window(&mut self) {}
        fn restore_window(&mut self) {}
    }

    /// Hands out solid images, remembering what was asked for.
    #[derive(Default)]
    struct FakeBackend {
        requests: Vec<CaptureRequest>,
        fail: bool,
    }

    impl CaptureBackend for FakeBackend {
        fn capture_point(&mut self, global: Pos2) -> Result<RgbaImage, CaptureError> {
            self.requests.push(CaptureRequest::Point(global));
            if self.fail {
                return Err(CaptureError::NotFrozen);
            }
            Ok(RgbaImage::from_pixel(300, 200, Rgba([0, 0, 255, 255])))
        }

        fn capture_region(&mut self, global: Rect) -> Result<RgbaImage, CaptureError> {
            self.requests.push(CaptureRequest::Region(global));
            if self.fail {
                return Err(CaptureError::NotFrozen);
            }
            Ok(RgbaImage::from_pixel(
                global.width() as u32,
                global.height() as u32,
                Rgba([255, 0, 0, 255]),
            ))
        }
    }

    fn doc() -> Document<NullHost> {
        Document::new(&Settings::default(), NullHost)
    }

    fn capture(doc: &mut Document<NullHost>, backend: &mut FakeBackend, from: Pos2, to: Pos2) -> ItemId {
        assert!(doc.begin_capture());
        let sel = doc.selector_mut();
        sel.pointer_down(from);
        sel.pointer_move(to, true);
        let request = sel.pointer_up(to).unwrap();
        doc.finish_capture(request, backend).unwrap()
    }

    fn draw_arrow(doc: &mut Document<NullHost>) {
        doc.shell.tool = Tool::Arrow;
        doc.pointer(PointerEvent::Down {
            pos: pos2(10.0, 10.0),
            additive: false,
        });
        doc.pointer(PointerEvent::Move {
            pos: pos2(60.0, 10.0),
            primary_held: true,
        });
        doc.pointer(PointerEvent::Up(pos2(60.0, 10.0)));
    }

    fn png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(40, 30, Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn fresh_document() {
        let doc = doc();
        assert_eq!(doc.title(), "snapink");
        assert!(!doc.can_save());
        assert!(!doc.can_save_as());
        assert!(doc.shell.is_fresh());
    }

    #[test]
    fn first_capture_is_pinned_and_fits_the_window() {
        let mut doc = doc();
        let mut backend = FakeBackend::default();
        let id = capture(&mut doc, &mut backend, pos2(10.0, 10.0), pos2(210.0, 110.0));

        assert_eq!(
            backend.requests,
            vec![CaptureRequest::Region(Rect::from_min_max(
                pos2(10.0, 10.0),
                pos2(210.0, 110.0)
            ))]
        );
        match doc.scene.get(id) {
            Some(Item::Background(bg)) => {
                assert!(bg.is_pinned());
                assert_eq!(bg.pos, pos2(310.0, 230.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!doc.scene.is_selected(id));
        assert_eq!(doc.take_pending_fit(), Some(vec2(200.0, 100.0)));
        assert_eq!(doc.take_pending_fit(), None);
        assert_eq!(doc.shell.status(), DocStatus::Dirty);
        assert_eq!(doc.selector().state(), SelectState::Inactive);
    }

    #[test]
    fn later_capture_is_movable_and_selected() {
        let mut doc = doc();
        let mut backend = FakeBackend::default();
        let first = capture(&mut doc, &mut backend, pos2(0.0, 0.0), pos2(100.0, 100.0));
        doc.take_pending_fit();
        let second = capture(&mut doc, &mut backend, pos2(5.0, 5.0), pos2(5.0, 5.0));

        assert_eq!(backend.requests[1], CaptureRequest::Point(pos2(5.0, 5.0)));
        match doc.scene.get(second) {
            Some(Item::Background(bg)) => assert!(!bg.is_pinned()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(doc.scene.selected(), vec![second]);
        assert!(!doc.scene.is_selected(first));
        assert_eq!(doc.take_pending_fit(), None);
    }

    #[test]
    fn drawing_before_capturing_gives_up_pinning() {
        let mut doc = doc();
        draw_arrow(&mut doc);
        assert!(!doc.shell.is_fresh());
        let id = capture(&mut doc, &mut FakeBackend::default(), pos2(0.0, 0.0), pos2(10.0, 10.0));
        assert!(doc.scene.get(id).unwrap().is_selectable());
    }

    #[test]
    fn failed_capture_changes_nothing() {
        let mut doc = doc();
        let mut backend = FakeBackend {
            fail: true,
            ..Default::default()
        };
        assert!(doc.begin_capture());
        let sel = doc.selector_mut();
        sel.pointer_down(pos2(1.0, 1.0));
        let request = sel.pointer_up(pos2(1.0, 1.0)).unwrap();

        assert!(doc.finish_capture(request, &mut backend).is_err());
        assert!(doc.scene.is_empty());
        assert_eq!(doc.shell.status(), DocStatus::Clean);
        assert!(doc.shell.is_fresh());
    }

    #[test]
    fn creation_marks_dirty_and_title_shows_it() {
        let mut doc = doc();
        draw_arrow(&mut doc);
        assert_eq!(doc.shell.tool, Tool::Pointer);
        assert!(doc.can_save());
        assert!(doc.can_save_as());
        assert_eq!(doc.title(), "*snapink");
    }

    #[test]
    fn save_goes_clean_and_names_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = doc();
        draw_arrow(&mut doc);

        let written = doc.save_to(&dir.path().join("shot")).unwrap();
        assert_eq!(written, dir.path().join("shot.png"));
        assert!(written.exists());
        assert_eq!(doc.shell.status(), DocStatus::Clean);
        assert_eq!(doc.title(), "shot.png - snapink");
        assert!(doc.scene.selected().is_empty());
        assert!(!doc.can_save());
        assert!(doc.can_save_as());

        doc.delete_selected();
        assert_eq!(doc.shell.status(), DocStatus::Clean);
        doc.pointer(PointerEvent::Down {
            pos: pos2(30.0, 10.0),
            additive: false,
        });
        doc.delete_selected();
        assert_eq!(doc.title(), "*shot.png - snapink");
    }

    #[test]
    fn saving_an_empty_scene_fails_and_stays_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = doc();
        draw_arrow(&mut doc);
        doc.pointer(PointerEvent::Down {
            pos: pos2(30.0, 10.0),
            additive: false,
        });
        assert_eq!(doc.delete_selected(), 1);
        assert!(doc.save_to(&dir.path().join("x.png")).is_err());
        assert!(doc.shell.is_dirty());
    }

    #[test]
    fn open_replaces_a_clean_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(dir.path(), "in.png");
        let mut doc = doc();

        assert_eq!(doc.open(&path).unwrap(), OpenOutcome::Replaced);
        assert_eq!(doc.title(), "in.png - snapink");
        assert_eq!(doc.shell.status(), DocStatus::Clean);
        assert!(!doc.shell.is_fresh());
        assert_eq!(doc.scene.area().size(), vec2(40.0, 30.0));
        let (_, item) = doc.scene.items().next().unwrap();
        assert_eq!(item.kind(), ItemKind::Background);
        assert!(!item.is_selectable());
        assert_eq!(doc.take_pending_fit(), Some(vec2(40.0, 30.0)));
    }

    #[test]
    fn open_with_unsaved_edit_asks_for_a_new_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(dir.path(), "in.png");
        let mut doc = doc();
        draw_arrow(&mut doc);

        assert_eq!(doc.open(&path).unwrap(), OpenOutcome::NewWindow(path));
        assert_eq!(doc.scene.items().count(), 1);
        assert_eq!(doc.title(), "*snapink");
    }

    #[test]
    fn open_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = doc();
        assert!(doc.open(&dir.path().join("nope.png")).is_err());
        assert_eq!(doc.title(), "snapink");
    }

    #[test]
    fn typing_marks_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = png(dir.path(), "in.png");
        let mut doc = Document::from_file(&Settings::default(), NullHost, &path).unwrap();
        doc.shell.tool = Tool::Text;
        doc.pointer(PointerEvent::Down {
            pos: pos2(5.0, 5.0),
            additive: false,
        });
        doc.pointer(PointerEvent::Up(pos2(5.0, 5.0)));
        doc.save_to(&path).unwrap();
        assert!(!doc.is_editing_text());

        doc.double_click(pos2(6.0, 6.0));
        assert!(doc.is_editing_text());
        doc.type_text("a");
        assert!(doc.shell.is_dirty());
    }
}
