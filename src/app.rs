use std::path::{Path, PathBuf};

use egui::emath::RectTransform;
use egui::{
    Align2, Button, Color32, ColorImage, CursorIcon, Event, Key, Pos2, Rect, Sense, Stroke,
    StrokeKind, TextureHandle, Vec2, ViewportBuilder, ViewportCommand, ViewportId, pos2,
};
use log::{error, info, warn};

use crate::canvas::Tool;
use crate::capture::XcapBackend;
use crate::cli::LaunchPlan;
use crate::config::Settings;
use crate::document::{Document, OpenOutcome};
use crate::geometry::grown_window_size;
use crate::input::{PointerEvent, PointerTracker};
use crate::item::highlight;
use crate::viewport::{ContextSink, ViewportHost};

pub const APP_NAME: &str = "snapink";

pub const INITIAL_SIZE: [f32; 2] = [900.0, 640.0];

type Host = ViewportHost<ContextSink>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closing {
    Open,
    /// Unsaved changes; the Save / Discard / Cancel prompt is up.
    Asking,
    Allowed,
}

/// What a window asks of the application after a frame.
#[derive(Debug)]
enum WindowAction {
    New,
    Open(PathBuf),
    Closed,
}

struct DocumentWindow {
    viewport: ViewportId,
    doc: Document<Host>,
    backend: XcapBackend,
    frozen: Option<TextureHandle>,
    tracker: PointerTracker,
    title: String,
    closing: Closing,
    /// Size of the scrollable canvas in the last editor frame.
    canvas_size: Option<Vec2>,
}

impl DocumentWindow {
    fn create(
        ctx: &egui::Context,
        viewport: ViewportId,
        settings: &Settings,
        path: Option<&Path>,
    ) -> Self {
        let host = || {
            ViewportHost::new(ContextSink {
                ctx: ctx.clone(),
                viewport,
            })
        };
        let doc = match path {
            None => Document::new(settings, host()),
            Some(path) => Document::from_file(settings, host(), path).unwrap_or_else(|e| {
                error!("{e:?}");
                let mut doc = Document::new(settings, host());
                doc.set_notice(format!("{e:#}"));
                doc
            }),
        };
        let title = doc.title();
        Self {
            viewport,
            doc,
            backend: XcapBackend::new(APP_NAME),
            frozen: None,
            tracker: PointerTracker::default(),
            title,
            closing: Closing::Open,
            canvas_size: None,
        }
    }

    fn show(&mut self, ctx: &egui::Context, settings: &Settings) -> Vec<WindowAction> {
        let mut actions = Vec::new();
        if self.doc.selector().is_active() {
            self.selection_ui(ctx, settings);
        } else {
            self.editor_ui(ctx, &mut actions);
            self.apply_pending_fit(ctx);
        }
        self.close_prompt(ctx);
        self.handle_close_request(ctx, &mut actions);

        let title = self.doc.title();
        if title != self.title {
            ctx.send_viewport_cmd(ViewportCommand::Title(title.clone()));
            self.title = title;
        }
        actions
    }

    fn selection_ui(&mut self, ctx: &egui::Context, settings: &Settings) {
        if self.frozen.is_none() {
            match self.doc.selector().host().freeze_wait(settings.freeze_delay()) {
                Some(wait) if !wait.is_zero() => {
                    ctx.request_repaint_after(wait);
                    return;
                }
                Some(_) => self.freeze(ctx),
                None => {}
            }
        }
        let (Some(frozen), Some(texture)) = (self.backend.frozen(), &self.frozen) else {
            return;
        };
        let bounds = frozen.bounds();
        let texture = texture.id();

        let mut request = None;
        egui::Area::new(egui::Id::new("selection_surface"))
            .fixed_pos(Pos2::ZERO)
            .show(ctx, |ui| {
                let screen_rect = ctx.viewport_rect();
                let (response, painter) =
                    ui.allocate_painter(screen_rect.size(), Sense::click_and_drag());
                painter.image(
                    texture,
                    response.rect,
                    Rect::from_min_max(Pos2::ZERO, pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
                let to_global = RectTransform::from_to(response.rect, bounds);
                let selector = self.doc.selector_mut();
                selector
                    .overlay()
                    .paint(&painter, bounds, &to_global.inverse());
                if selector.host().is_grabbed() {
                    ctx.set_cursor_icon(CursorIcon::Crosshair);
                }

                let events = ui.input(|i| self.tracker.collect(i, response.rect, &to_global));
                for event in events {
                    match event {
                        PointerEvent::Down { pos, .. } => selector.pointer_down(pos),
                        PointerEvent::Move { pos, primary_held } => {
                            selector.pointer_move(pos, primary_held);
                        }
                        PointerEvent::Up(pos) => {
                            request = request.or(selector.pointer_up(pos));
                        }
                    }
                }
            });

        if let Some(request) = request {
            if let Err(e) = self.doc.finish_capture(request, &mut self.backend) {
                warn!("capture failed: {e}");
                self.doc.set_notice(format!("Capture failed: {e}"));
            }
            self.backend.thaw();
            self.frozen = None;
            ctx.request_repaint();
        }
    }

    fn freeze(&mut self, ctx: &egui::Context) {
        match self.backend.freeze() {
            Ok(frozen) => {
                let image = &frozen.image;
                let color_image = ColorImage::from_rgba_unmultiplied(
                    [image.width() as usize, image.height() as usize],
                    image.as_flat_samples().as_slice(),
                );
                self.frozen =
                    Some(ctx.load_texture("frozen_screen", color_image, Default::default()));
                self.doc.selector_mut().host_mut().show_surface();
            }
            Err(e) => {
                warn!("cannot freeze the screen: {e}");
                self.doc.selector_mut().abort();
                self.doc.set_notice(format!("Capture failed: {e}"));
            }
        }
    }

    fn editor_ui(&mut self, ctx: &egui::Context, actions: &mut Vec<WindowAction>) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tool in Tool::ALL {
                    ui.selectable_value(&mut self.doc.shell.tool, tool, tool.label());
                }
                ui.separator();
                ui.color_edit_button_srgba(&mut self.doc.shell.color);
                ui.separator();
                if ui.button("📸 Capture").clicked() {
                    self.doc.begin_capture();
                }
                ui.separator();
                if ui.button("🗋 New").clicked() {
                    actions.push(WindowAction::New);
                }
                if ui.button("📂 Open").clicked() {
                    self.open_dialog(actions);
                }
                if ui
                    .add_enabled(self.doc.can_save(), Button::new("💾 Save"))
                    .clicked()
                {
                    self.save(false);
                }
                if ui
                    .add_enabled(self.doc.can_save_as(), Button::new("Save As…"))
                    .clicked()
                {
                    self.save(true);
                }
                if ui
                    .add_enabled(!self.doc.scene.is_empty(), Button::new("📋 Copy"))
                    .clicked()
                {
                    if let Err(e) = self.doc.copy_to_clipboard() {
                        warn!("{e:?}");
                        self.doc.set_notice(format!("{e:#}"));
                    }
                }
                if let Some(notice) = self.doc.notice() {
                    ui.separator();
                    ui.colored_label(ui.visuals().warn_fg_color, notice);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas_size = Some(ui.available_size());
            egui::ScrollArea::both().show(ui, |ui| self.canvas_ui(ui));
        });

        self.keyboard(ctx);
    }

    fn canvas_ui(&mut self, ui: &mut egui::Ui) {
        let scene_rect = self.doc.scene.scene_rect();
        let (response, painter) = ui.allocate_painter(scene_rect.size(), Sense::click_and_drag());
        let to_screen = RectTransform::from_to(scene_rect, response.rect);
        let to_scene = to_screen.inverse();

        self.doc.scene.prepare_textures(ui.ctx());
        painter.rect_filled(
            to_screen.transform_rect(self.doc.scene.area()),
            0.0,
            ui.visuals().extreme_bg_color,
        );
        let theme_fg = ui.visuals().text_color();
        for (id, item) in self.doc.scene.items() {
            item.paint(&painter, &to_screen);
            if self.doc.scene.is_selected(id) {
                highlight::paint(&painter, to_screen.transform_rect(item.bounds()), theme_fg);
            }
        }
        if let Some(band) = self.doc.canvas.rubber_band() {
            painter.rect_stroke(
                to_screen.transform_rect(band),
                0.0,
                Stroke::new(1.0, theme_fg),
                StrokeKind::Inside,
            );
        }

        if response.hovered() && self.doc.shell.tool != Tool::Pointer {
            ui.ctx().set_cursor_icon(CursorIcon::Crosshair);
        }
        let visible = response.rect.intersect(ui.clip_rect());
        let events = ui.input(|i| self.tracker.collect(i, visible, &to_scene));
        for event in events {
            self.doc.pointer(event);
        }
        if response.double_clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.doc.double_click(to_scene.transform_pos(pos));
            }
        }
    }

    fn keyboard(&mut self, ctx: &egui::Context) {
        // Toolbar widgets keep their keys.
        if ctx.memory(|m| m.focused().is_some()) {
            return;
        }
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            match event {
                Event::Text(text) => self.doc.type_text(&text),
                Event::Key {
                    key, pressed: true, ..
                } => match key {
                    Key::Enter if self.doc.is_editing_text() => self.doc.type_text("\n"),
                    Key::Backspace => self.doc.backspace(),
                    Key::Delete => {
                        self.doc.delete_selected();
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }

    /// Grows the window so a freshly pinned background shows in full.
    fn apply_pending_fit(&mut self, ctx: &egui::Context) {
        let (fullscreen, inner) =
            ctx.input(|i| (i.viewport().fullscreen.unwrap_or(false), i.viewport().inner_rect));
        let (Some(canvas), Some(inner)) = (self.canvas_size, inner) else {
            return;
        };
        if fullscreen {
            return;
        }
        if let Some(content) = self.doc.take_pending_fit() {
            let size = grown_window_size(inner.size(), canvas, content);
            if size != inner.size() {
                info!("growing window to {size:?}");
                ctx.send_viewport_cmd(ViewportCommand::InnerSize(size));
            }
        }
    }

    fn open_dialog(&mut self, actions: &mut Vec<WindowAction>) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "gif", "webp"])
            .pick_file()
        else {
            return;
        };
        match self.doc.open(&path) {
            Ok(OpenOutcome::Replaced) => {}
            Ok(OpenOutcome::NewWindow(path)) => actions.push(WindowAction::Open(path)),
            Err(e) => {
                error!("{e:?}");
                self.doc.set_notice(format!("{e:#}"));
            }
        }
    }

    /// Returns whether the document ended up on disk.
    fn save(&mut self, save_as: bool) -> bool {
        let path = match self.doc.filename() {
            Some(path) if !save_as => path.to_path_buf(),
            current => {
                let name = current
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "screenshot.png".to_owned());
                match rfd::FileDialog::new()
                    .add_filter("PNG", &["png"])
                    .set_file_name(name)
                    .save_file()
                {
                    Some(path) => path,
                    None => return false,
                }
            }
        };
        match self.doc.save_to(&path) {
            Ok(_) => true,
            Err(e) => {
                error!("{e:?}");
                self.doc.set_notice(format!("{e:#}"));
                false
            }
        }
    }

    fn handle_close_request(&mut self, ctx: &egui::Context, actions: &mut Vec<WindowAction>) {
        if !ctx.input(|i| i.viewport().close_requested()) {
            return;
        }
        if self.closing != Closing::Allowed && self.doc.needs_close_prompt() {
            ctx.send_viewport_cmd(ViewportCommand::CancelClose);
            self.closing = Closing::Asking;
        } else {
            actions.push(WindowAction::Closed);
        }
    }

    fn close_prompt(&mut self, ctx: &egui::Context) {
        if self.closing != Closing::Asking {
            return;
        }
        egui::Window::new("Unsaved changes")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Save the changes to this document before closing?");
                ui.horizontal(|ui| {
                    if ui.button("💾 Save").clicked() && self.save(false) {
                        self.allow_close(ctx);
                    }
                    if ui.button("Discard").clicked() {
                        self.allow_close(ctx);
                    }
                    if ui.button("Cancel").clicked() {
                        self.closing = Closing::Open;
                    }
                });
            });
    }

    fn allow_close(&mut self, ctx: &egui::Context) {
        self.closing = Closing::Allowed;
        ctx.send_viewport_cmd(ViewportCommand::Close);
    }
}

/// Every open document window. The first one lives in the root viewport;
/// closing it ends the application.
pub struct SnapInkApp {
    settings: Settings,
    windows: Vec<DocumentWindow>,
    next_viewport: u64,
}

impl SnapInkApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings, plan: LaunchPlan) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let ctx = &cc.egui_ctx;

        let mut files = plan.files.into_iter();
        // A capture gets a fresh document of its own.
        let root_file = if plan.capture { None } else { files.next() };
        let mut root = DocumentWindow::create(ctx, ViewportId::ROOT, &settings, root_file.as_deref());
        if plan.capture {
            info!("starting in capture mode");
            root.doc.begin_capture();
        }

        let mut app = Self {
            settings,
            windows: vec![root],
            next_viewport: 0,
        };
        for path in files {
            app.spawn(ctx, Some(path));
        }
        app
    }

    fn spawn(&mut self, ctx: &egui::Context, path: Option<PathBuf>) {
        let viewport = ViewportId::from_hash_of(("document", self.next_viewport));
        self.next_viewport += 1;
        let window = DocumentWindow::create(ctx, viewport, &self.settings, path.as_deref());
        self.windows.push(window);
    }

    /// The root may only go once no other window holds unsaved work.
    fn close_root(&mut self, ctx: &egui::Context) -> bool {
        let mut blocked = false;
        for window in self.windows.iter_mut().skip(1) {
            if window.closing != Closing::Allowed && window.doc.needs_close_prompt() {
                window.closing = Closing::Asking;
                ctx.send_viewport_cmd_to(window.viewport, ViewportCommand::Focus);
                blocked = true;
            }
        }
        if blocked {
            ctx.send_viewport_cmd_to(ViewportId::ROOT, ViewportCommand::CancelClose);
            if let Some(root) = self.windows.first_mut() {
                root.closing = Closing::Open;
            }
        }
        !blocked
    }
}

impl eframe::App for SnapInkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let settings = &self.settings;
        let mut actions = Vec::new();
        for (index, window) in self.windows.iter_mut().enumerate() {
            let requested = if index == 0 {
                window.show(ctx, settings)
            } else {
                let builder = ViewportBuilder::default()
                    .with_title(window.title.clone())
                    .with_inner_size(INITIAL_SIZE);
                ctx.show_viewport_immediate(window.viewport, builder, |ctx, _class| {
                    window.show(ctx, settings)
                })
            };
            actions.extend(requested.into_iter().map(|a| (index, a)));
        }

        let mut closed = Vec::new();
        for (index, action) in actions {
            match action {
                WindowAction::New => self.spawn(ctx, None),
                WindowAction::Open(path) => self.spawn(ctx, Some(path)),
                WindowAction::Closed if index == 0 => {
                    if self.close_root(ctx) {
                        info!("closing");
                    }
                }
                WindowAction::Closed => closed.push(index),
            }
        }
        // Dropping a window aborts any selection it was running.
        for index in closed.into_iter().rev() {
            self.windows.remove(index);
        }
    }
}
