//! The interactive session driver.
//!
//! One native window for the whole run. Each image gets a fresh
//! [`Machine`]; egui pointer and keyboard input is translated into
//! machine events, the overlay is repainted every frame from the
//! machine's committed set and preview, and `Esc` commits the image's
//! record to the description sink before advancing to the next one.
//!
//! Controls: left-drag draws a square, right-drag moves one, `d` while
//! moving deletes it, `Esc` finishes the image. Middle-drag pans and the
//! scroll wheel zooms the viewport.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eframe::egui;

use crate::error::RunError;
use crate::geometry::{Point, Rect};
use crate::machine::{Event, Machine, Redraw};
use crate::output::DescriptionSink;

const COMMITTED_STROKE: egui::Color32 = egui::Color32::from_rgb(0, 255, 0);
const PREVIEW_STROKE: egui::Color32 = egui::Color32::from_rgb(255, 0, 0);
const STROKE_WIDTH: f32 = 2.0;

/// Shared slot the app parks a fatal error in before closing its window;
/// `main` turns it into the process exit status.
pub type FailureSlot = Arc<Mutex<Option<RunError>>>;

struct ImageSession {
    path: PathBuf,
    rgba: image::RgbaImage,
    size: (f32, f32),
    texture: Option<egui::TextureHandle>,
    machine: Machine,
    // Last redraw request the machine emitted; what the overlay shows.
    overlay: Redraw,
}

pub struct MarkApp {
    queue: std::vec::IntoIter<PathBuf>,
    sink: DescriptionSink,
    failure: FailureSlot,
    current: Option<ImageSession>,
    done: bool,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
}

impl MarkApp {
    pub fn new(images: Vec<PathBuf>, sink: DescriptionSink, failure: FailureSlot) -> Self {
        Self {
            queue: images.into_iter(),
            sink,
            failure,
            current: None,
            done: false,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
        }
    }

    fn fail(&mut self, ctx: &egui::Context, err: RunError) {
        tracing::error!(error = %err, "aborting run");
        let mut slot = self.failure.lock().unwrap();
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        self.done = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    /// Loads the next queued image, or closes the window when the queue
    /// is exhausted. A load failure is fatal for the whole run.
    fn advance(&mut self, ctx: &egui::Context) {
        let Some(path) = self.queue.next() else {
            self.done = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        };

        let rgba = match image::open(&path) {
            Ok(img) => img.to_rgba8(),
            Err(source) => {
                self.fail(ctx, RunError::Load { path, source });
                return;
            }
        };
        let (w, h) = (rgba.width(), rgba.height());
        tracing::info!(path = %path.display(), width = w, height = h, "annotating image");

        ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
            "gapmark — {}",
            path.display()
        )));
        self.pan = egui::Vec2::ZERO;
        self.zoom = 1.0;
        self.current = Some(ImageSession {
            path,
            rgba,
            size: (w as f32, h as f32),
            texture: None,
            machine: Machine::new(w as i32, h as i32),
            overlay: Redraw::default(),
        });
    }

    /// Writes the current image's record and queues up the next image.
    fn finish_image(&mut self, ctx: &egui::Context) {
        let Some(session) = self.current.take() else {
            return;
        };
        let rects = session.machine.finish();
        tracing::info!(path = %session.path.display(), rects = rects.len(), "image finished");
        if let Err(err) = self.sink.write_record(&session.path, &rects) {
            self.fail(ctx, err);
        }
    }

    fn dispatch(&mut self, ctx: &egui::Context, event: Event) {
        if self.done {
            return;
        }
        let result = match self.current.as_mut() {
            Some(session) => session.machine.apply(event),
            None => return,
        };
        match result {
            Ok(redraw) => {
                if let Some(session) = self.current.as_mut() {
                    session.overlay = redraw;
                }
            }
            Err(err) => self.fail(ctx, err.into()),
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        if session.texture.is_some() {
            return;
        }
        let size = [session.rgba.width() as usize, session.rgba.height() as usize];
        let pixels = session.rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        session.texture =
            Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
    }

    fn image_size(&self) -> (f32, f32) {
        self.current.as_ref().map(|s| s.size).unwrap_or((0.0, 0.0))
    }

    /// Convert image-space coords to screen-space.
    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        let (w, h) = self.image_size();
        let center = canvas_rect.center();
        center + self.pan + (img_pos.to_vec2() - egui::vec2(w, h) * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image-space.
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> egui::Pos2 {
        let (w, h) = self.image_size();
        let center = canvas_rect.center();
        let rel = screen_pos - center - self.pan;
        egui::pos2(rel.x / self.zoom + w * 0.5, rel.y / self.zoom + h * 0.5)
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let (w, h) = self.image_size();
        let top_left = self.image_to_screen(canvas_rect, egui::Pos2::ZERO);
        let bot_right = self.image_to_screen(canvas_rect, egui::pos2(w, h));
        egui::Rect::from_min_max(top_left, bot_right)
    }

    /// The machine works in integer image pixels; window coordinates are
    /// rounded and clamped into the image, mirroring how an image-sized
    /// window clamps its pointer by construction.
    fn to_image_point(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> Point {
        let (w, h) = self.image_size();
        let pos = self.screen_to_image(canvas_rect, screen_pos);
        Point::new(
            (pos.x.round() as i32).clamp(0, w as i32),
            (pos.y.round() as i32).clamp(0, h as i32),
        )
    }

    fn stroke_rect(
        &self,
        painter: &egui::Painter,
        canvas_rect: egui::Rect,
        rect: Rect,
        color: egui::Color32,
    ) {
        let a = self.image_to_screen(
            canvas_rect,
            egui::pos2(rect.start.x as f32, rect.start.y as f32),
        );
        let b = self.image_to_screen(canvas_rect, egui::pos2(rect.end.x as f32, rect.end.y as f32));
        painter.rect_stroke(
            egui::Rect::from_two_pos(a, b),
            0.0,
            egui::Stroke::new(STROKE_WIDTH, color),
            egui::StrokeKind::Middle,
        );
    }
}

impl eframe::App for MarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.done {
            return;
        }
        if self.current.is_none() {
            self.advance(ctx);
            if self.current.is_none() {
                return;
            }
        }
        self.ensure_texture(ctx);

        // Keyboard: Esc commits the image, `d` deletes the lifted rect.
        let (finish, delete) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::D),
            )
        });
        if delete {
            self.dispatch(ctx, Event::Delete);
        }
        if finish {
            self.finish_image(ctx);
            ctx.request_repaint();
            return;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

            if let Some(tex) = self.current.as_ref().and_then(|s| s.texture.as_ref()) {
                let img_rect = self.image_rect_on_screen(canvas_rect);
                painter.image(
                    tex.id(),
                    img_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            // Overlay: committed set in one style, preview in the other.
            if let Some(session) = self.current.as_ref() {
                for rect in &session.overlay.committed {
                    self.stroke_rect(&painter, canvas_rect, *rect, COMMITTED_STROKE);
                }
                if let Some(rect) = session.overlay.preview {
                    self.stroke_rect(&painter, canvas_rect, rect, PREVIEW_STROKE);
                }
            }

            // Pan (middle mouse button).
            let middle_down = ctx.input(|i| i.pointer.middle_down());
            if middle_down {
                let delta = ctx.input(|i| i.pointer.delta());
                self.pan += delta;
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Zoom (scroll wheel), anchored on the cursor.
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let center = canvas_rect.center();
                    let cursor_rel = cursor - center - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            // Gestures: left button draws, right button moves.
            if !self.panning {
                if response.drag_started_by(egui::PointerButton::Primary) {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let point = self.to_image_point(canvas_rect, pos);
                        self.dispatch(ctx, Event::BeginDraw(point));
                    }
                }
                if response.drag_started_by(egui::PointerButton::Secondary) {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let point = self.to_image_point(canvas_rect, pos);
                        self.dispatch(ctx, Event::BeginMove(point));
                    }
                }

                if response.dragged_by(egui::PointerButton::Primary)
                    || response.dragged_by(egui::PointerButton::Secondary)
                {
                    if let Some(pos) = response.interact_pointer_pos() {
                        let point = self.to_image_point(canvas_rect, pos);
                        self.dispatch(ctx, Event::PointerMoved(point));
                    }
                }

                if response.drag_stopped_by(egui::PointerButton::Primary) {
                    if let Some(pos) = response
                        .interact_pointer_pos()
                        .or(ctx.input(|i| i.pointer.latest_pos()))
                    {
                        let point = self.to_image_point(canvas_rect, pos);
                        self.dispatch(ctx, Event::EndDraw(point));
                    }
                }
                if response.drag_stopped_by(egui::PointerButton::Secondary) {
                    if let Some(pos) = response
                        .interact_pointer_pos()
                        .or(ctx.input(|i| i.pointer.latest_pos()))
                    {
                        let point = self.to_image_point(canvas_rect, pos);
                        self.dispatch(ctx, Event::EndMove(point));
                    }
                }
            }
        });

        // Keep ticking even with no input so housekeeping and late
        // redraws still happen.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
