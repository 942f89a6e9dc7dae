//! The painting controller.
//!
//! [`PaintEditor`] owns the document, tools, stamp cache, history and view,
//! routes [`InputEvent`]s into stroke sessions and advances their timers when
//! polled with [`PaintEditor::tick`]. Time is always passed in, so a tick
//! never interleaves with an event.

use std::collections::BTreeMap;
use std::sync::Arc;

use egui::{Color32, Pos2, Vec2};
use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::brush_texture::StampCache;
use crate::compositor;
use crate::config::EditorConfig;
use crate::document::Document;
use crate::error::{ExportError, LayerError, SurfaceError, ToolError};
use crate::event::{EditorEvent, EventHandler, LayerEvent, Subscribers};
use crate::fill::{FillOutcome, flood_fill};
use crate::history::{HistoryEntry, SnapshotHistory};
use crate::input::{InputEvent, pressure_or_default};
use crate::layer::{LayerId, LayerInfo};
use crate::raster::Surface;
use crate::renderer::{self, DEFAULT_PRESSURE, RenderTarget, StrokeRenderer};
use crate::session::StrokeSession;
use crate::shape::{ShapeKind, recognize};
use crate::tool::{Archetype, ToolCatalog, ToolDefinition, ToolId, ToolSetting};
use crate::viewport::ViewportTransform;

/// What a gesture on the canvas does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    /// Freehand drawing with the active tool
    #[default]
    Brush,
    /// Every gesture drags out this shape in the pencil style
    Shape(ShapeKind),
}

pub struct PaintEditor {
    config: EditorConfig,
    document: Document,
    history: SnapshotHistory,
    catalog: ToolCatalog,
    stamps: StampCache,
    viewport: ViewportTransform,
    color: Color32,
    mode: DrawMode,
    session: Option<StrokeSession>,
    touches: BTreeMap<u64, Pos2>,
    rng: StdRng,
    subscribers: Subscribers,
}

impl std::fmt::Debug for PaintEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaintEditor")
            .field("layers", &self.document.layers().len())
            .field("tool", &self.catalog.active().id)
            .field("mode", &self.mode)
            .field("drawing", &self.session.is_some())
            .field("history", &self.history.len())
            .finish()
    }
}

impl PaintEditor {
    /// Editor over a fresh canvas-sized document
    pub fn new(config: EditorConfig) -> Result<Self, SurfaceError> {
        Ok(Self::with_document(config, Document::new()?, StdRng::from_entropy()))
    }

    /// Editor whose brush randomness is reproducible
    pub fn with_seed(config: EditorConfig, seed: u64) -> Result<Self, SurfaceError> {
        Ok(Self::with_document(config, Document::new()?, StdRng::seed_from_u64(seed)))
    }

    /// Editor over an existing document, mostly for small test canvases
    pub fn with_document(config: EditorConfig, document: Document, mut rng: StdRng) -> Self {
        let catalog = ToolCatalog::builtin();
        let color = Color32::BLACK;
        let mut stamps = StampCache::new();
        stamps.regenerate(&catalog, color, &mut rng);
        let [w, h] = document.size();
        Self {
            history: SnapshotHistory::new(config.history_capacity),
            viewport: ViewportTransform::new(Vec2::new(w as f32, h as f32), config.viewport.clone()),
            config,
            document,
            catalog,
            stamps,
            color,
            mode: DrawMode::Brush,
            session: None,
            touches: BTreeMap::new(),
            rng,
            subscribers: Subscribers::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn stamps(&self) -> &StampCache {
        &self.stamps
    }

    pub fn stamps_mut(&mut self) -> &mut StampCache {
        &mut self.stamps
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn session(&self) -> Option<&StrokeSession> {
        self.session.as_ref()
    }

    pub fn is_drawing(&self) -> bool {
        self.session.is_some()
    }

    /// Subscribe a collaborator to editor events
    pub fn subscribe(&mut self, handler: Box<dyn EventHandler>) {
        self.subscribers.add(handler);
    }

    // ------------------------------------------------------------------
    // Input

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { pos, pressure, time } => self.pointer_down(pos, pressure_or_default(pressure), time),
            InputEvent::PointerMove { pos, pressure, time } => self.pointer_move(pos, pressure_or_default(pressure), time),
            InputEvent::PointerUp { pos, time } => self.pointer_up(pos, time),
            InputEvent::PointerLeave { .. } => self.pointer_leave(),
            InputEvent::TouchStart { id, pos, force, time } => self.touch_start(id, pos, force, time),
            InputEvent::TouchMove { id, pos, force, time } => self.touch_move(id, pos, force, time),
            InputEvent::TouchEnd { id, pos, time } => self.touch_end(id, pos, time),
            InputEvent::Wheel { delta, .. } => self.zoom_wheel(delta),
        }
    }

    /// Begin a gesture at viewport position `screen`
    pub fn pointer_down(&mut self, screen: Pos2, pressure: f32, now: f64) {
        if self.touches.len() > 1 {
            return;
        }
        if self.session.is_some() {
            debug!("new stroke while drawing, committing the previous one");
            self.commit();
        }
        let pos = self.viewport.screen_to_canvas(screen);
        let layer_id = self.document.active_id();

        let tool = match self.mode {
            DrawMode::Shape(_) => self.catalog.get(ToolId::PENCIL).cloned().unwrap_or_else(|| self.catalog.active().clone()),
            DrawMode::Brush => self.catalog.active().clone(),
        };

        if let (DrawMode::Brush, Archetype::Utility { .. }) = (self.mode, tool.archetype) {
            self.fill_at(layer_id, pos);
            return;
        }

        self.history.record(&self.document, layer_id);

        let mut session = match self.mode {
            DrawMode::Shape(kind) => StrokeSession::shape(tool.clone(), layer_id, pos, kind),
            DrawMode::Brush => StrokeSession::freehand(tool.clone(), layer_id, pos, pressure),
        };
        if session.commits_overlay() {
            self.document.overlay_mut().clear();
        }
        if self.mode == DrawMode::Brush && tool.auto_snap {
            session.arm_hold(now, self.config.shape.hold_delay_secs);
        }
        if session.is_ribbon() {
            session.start_ribbon(now, &self.config.ribbon, &mut self.rng);
        }
        debug!("stroke started with {} on {layer_id}", tool.id);
        self.session = Some(session);
        self.subscribers.notify(EditorEvent::StrokeStarted { layer_id, tool: tool.id });
    }

    pub fn pointer_move(&mut self, screen: Pos2, pressure: f32, now: f64) {
        if self.session.is_none() {
            return;
        }
        let pos = self.viewport.screen_to_canvas(screen);
        let Self {
            session,
            document,
            stamps,
            color,
            rng,
            config,
            ..
        } = self;
        let Some(session) = session.as_mut() else {
            return;
        };

        if let Some(kind) = session.shape_kind() {
            session.track(pos);
            Self::preview_shape(document, stamps, *color, session, kind, pos, rng);
            return;
        }
        if session.is_ribbon() {
            session.track(pos);
            return;
        }

        let tool = session.tool().clone();
        if tool.auto_snap && session.last().distance(pos) > config.shape.rearm_distance {
            session.arm_hold(now, config.shape.hold_delay_secs);
        }
        let (from, control, to) = session.advance(pos, pressure);
        let target = session.freehand_target();
        let renderer = StrokeRenderer::new(&tool, *color, target, stamps);
        let Some(surface) = Self::target_surface(document, target, session.layer_id()) else {
            warn!("active layer vanished mid-stroke");
            return;
        };
        renderer.segment(surface, from, control, to, pressure, rng);
    }

    /// End the gesture. The stroke ends where the last move left it, so the
    /// release position only matters for touches.
    pub fn pointer_up(&mut self, _screen: Pos2, _now: f64) {
        if self.session.is_none() {
            return;
        }
        self.finish_freehand();
        self.commit();
    }

    /// The pointer left the canvas: end the stroke where it last was
    pub fn pointer_leave(&mut self) {
        self.pointer_up(Pos2::ZERO, 0.0);
    }

    /// Draw the tap dot or the closing segment of a freehand stroke
    fn finish_freehand(&mut self) {
        let Self {
            session,
            document,
            stamps,
            color,
            rng,
            config,
            ..
        } = self;
        let Some(session) = session.as_ref() else {
            return;
        };
        if session.shape_kind().is_some() || session.is_ribbon() {
            return;
        }
        let tool = session.tool().clone();
        let target = session.freehand_target();
        let renderer = StrokeRenderer::new(&tool, *color, target, stamps);
        let Some(surface) = Self::target_surface(document, target, session.layer_id()) else {
            return;
        };
        let (last, mid) = (session.last(), session.last_mid());
        if last.distance(mid) < config.tap_threshold {
            renderer.dot(surface, last, rng);
        } else {
            renderer.line(surface, mid, last, DEFAULT_PRESSURE, rng);
        }
    }

    /// Finish the current stroke: stop its timers and, for overlay strokes,
    /// composite the overlay into the layer with the tool alpha and operator
    pub fn commit(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.cancel_timers();
        let tool = session.tool().clone();
        let layer_id = session.layer_id();
        if session.commits_overlay() {
            if let Err(err) = self.document.commit_overlay(tool.settings.alpha, tool.settings.composite) {
                error!("could not commit overlay into {layer_id}: {err}");
            }
        }
        debug!("stroke committed with {} on {layer_id}", tool.id);
        self.subscribers.notify(EditorEvent::StrokeCommitted { layer_id, tool: tool.id });
    }

    fn target_surface(
        document: &mut Document,
        target: RenderTarget,
        layer_id: LayerId,
    ) -> Option<&mut Surface> {
        match target {
            RenderTarget::Overlay => Some(document.overlay_mut()),
            RenderTarget::Direct => document.layer_mut(layer_id).map(|l| l.surface_mut()),
        }
    }

    fn preview_shape(
        document: &mut Document,
        stamps: &StampCache,
        color: Color32,
        session: &StrokeSession,
        kind: ShapeKind,
        pos: Pos2,
        rng: &mut StdRng,
    ) {
        if let Some(standing) = session.standing() {
            if let Some(layer) = document.layer_mut(session.layer_id()) {
                if let Err(err) = layer.restore(standing) {
                    error!("could not reset layer under shape preview: {err}");
                }
            }
        }
        let overlay = document.overlay_mut();
        overlay.clear();
        let renderer = StrokeRenderer::new(session.tool(), color, RenderTarget::Overlay, stamps);
        renderer.shape(overlay, kind, session.start(), pos, rng);
    }

    fn fill_at(&mut self, layer_id: LayerId, pos: Pos2) {
        let color = self.color;
        let Some(layer) = self.document.layer_mut(layer_id) else {
            return;
        };
        let snapshot = layer.surface().snapshot();
        match flood_fill(layer.surface_mut(), pos, color) {
            FillOutcome::Filled(pixels) if pixels > 0 => {
                self.history.push(HistoryEntry { layer_id, snapshot });
                info!("🪣 Filled {pixels} pixels on {layer_id}");
                self.subscribers.notify(EditorEvent::FillApplied { layer_id, pixels });
            }
            outcome => debug!("fill at {pos:?} left {layer_id} unchanged: {outcome:?}"),
        }
    }

    // ------------------------------------------------------------------
    // Touch and view

    pub fn touch_start(&mut self, id: u64, screen: Pos2, force: Option<f32>, now: f64) {
        self.touches.insert(id, screen);
        match self.touches.len() {
            1 => self.pointer_down(screen, pressure_or_default(force), now),
            2 => {
                if self.session.is_some() {
                    debug!("second touch, committing the stroke in progress");
                    self.commit();
                }
                if let Some((a, b)) = self.touch_pair() {
                    self.viewport.begin_pinch(a, b);
                }
            }
            _ => {}
        }
    }

    pub fn touch_move(&mut self, id: u64, screen: Pos2, force: Option<f32>, now: f64) {
        let Some(slot) = self.touches.get_mut(&id) else {
            return;
        };
        *slot = screen;
        if self.touches.len() >= 2 {
            if let Some((a, b)) = self.touch_pair() {
                self.viewport.update_pinch(a, b);
                self.emit_view_changed();
            }
        } else {
            self.pointer_move(screen, pressure_or_default(force), now);
        }
    }

    pub fn touch_end(&mut self, id: u64, screen: Pos2, now: f64) {
        if self.touches.remove(&id).is_none() {
            return;
        }
        if self.touches.len() < 2 && self.viewport.is_pinching() {
            self.viewport.end_pinch();
        }
        if self.touches.is_empty() && self.session.is_some() {
            self.pointer_up(screen, now);
        }
    }

    fn touch_pair(&self) -> Option<(Pos2, Pos2)> {
        let mut points = self.touches.values();
        Some((*points.next()?, *points.next()?))
    }

    pub fn zoom_wheel(&mut self, delta: f32) {
        self.viewport.zoom_wheel(delta);
        self.emit_view_changed();
    }

    /// Fit the canvas into a viewport of `size` now and again shortly after
    pub fn resize_viewport(&mut self, size: Vec2, now: f64) {
        let before = (self.viewport.scale(), self.viewport.translate());
        self.viewport.notify_resize(size, now);
        if (self.viewport.scale(), self.viewport.translate()) != before {
            self.emit_view_changed();
        }
    }

    fn emit_view_changed(&mut self) {
        self.subscribers.notify(EditorEvent::ViewChanged {
            scale: self.viewport.scale(),
            translation: self.viewport.translate(),
        });
    }

    // ------------------------------------------------------------------
    // Timers

    /// Run every timer that is due at `now`
    pub fn tick(&mut self, now: f64) {
        if self.viewport.poll(now) {
            self.emit_view_changed();
        }
        self.poll_hold(now);
        self.poll_ribbon(now);
    }

    /// When the editor next needs [`Self::tick`]
    pub fn next_wakeup(&self) -> Option<f64> {
        let session = self.session.as_ref().and_then(|s| s.next_wakeup());
        match (session, self.viewport.next_refit()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn poll_hold(&mut self, now: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.take_due_hold(now) {
            return;
        }
        let Some(kind) = recognize(session.points(), &self.config.shape) else {
            debug!("hold elapsed, {} points unclassified", session.points().len());
            return;
        };
        let standing = if session.tool().overlay {
            None
        } else {
            self.history
                .latest()
                .filter(|entry| entry.layer_id == session.layer_id())
                .map(|entry| entry.snapshot.clone())
        };
        session.snap(kind, standing);
        info!("✨ Snapped stroke to {}", kind.label());
        self.subscribers.notify(EditorEvent::ShapeSnapped { kind });

        let pos = session.last();
        let Self {
            session,
            document,
            stamps,
            color,
            rng,
            ..
        } = self;
        if let Some(session) = session.as_ref() {
            Self::preview_shape(document, stamps, *color, session, kind, pos, rng);
        }
    }

    fn poll_ribbon(&mut self, now: f64) {
        let Self {
            session,
            document,
            color,
            config,
            ..
        } = self;
        let Some(session) = session.as_mut() else {
            return;
        };
        let alpha = config.ribbon.trail_alpha;
        let width = session.tool().settings.size;
        let Some(run) = session.ribbon_mut() else {
            return;
        };
        let ticks = run.task.due_ticks(now);
        for _ in 0..ticks {
            for (from, to) in run.simulator.step() {
                renderer::trail(document.overlay_mut(), from, to, width, *color, alpha);
            }
        }
    }

    // ------------------------------------------------------------------
    // Commands

    /// Restore the most recent snapshot. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        self.commit();
        let layer_id = self.history.latest().map(|e| e.layer_id);
        match self.history.undo(&mut self.document) {
            Ok(true) => {
                if let Some(layer_id) = layer_id.filter(|id| self.document.layer(*id).is_some()) {
                    self.subscribers.notify(EditorEvent::Undone { layer_id });
                }
                true
            }
            Ok(false) => false,
            Err(err) => {
                error!("undo failed: {err}");
                false
            }
        }
    }

    /// Change the paint color and rebuild the brush stamps in it
    pub fn set_color(&mut self, color: Color32) {
        if color == self.color && self.stamps.color() == Some(color) {
            return;
        }
        self.color = color;
        self.stamps.regenerate(&self.catalog, color, &mut self.rng);
        self.subscribers.notify(EditorEvent::ColorChanged { color });
    }

    pub fn select_tool(&mut self, id: ToolId) -> Result<(), ToolError> {
        let old = self.catalog.active().id;
        self.catalog.select(id)?;
        self.mode = DrawMode::Brush;
        if old != id {
            self.subscribers.notify(EditorEvent::ToolChanged { old, new: id });
        }
        Ok(())
    }

    pub fn active_tool(&self) -> &Arc<ToolDefinition> {
        self.catalog.active()
    }

    /// Change one setting of the active tool; a stroke in progress keeps
    /// the settings it started with
    pub fn update_tool(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        self.catalog.update_active(setting)
    }

    pub fn set_mode(&mut self, mode: DrawMode) {
        self.mode = mode;
    }

    // ------------------------------------------------------------------
    // Layers

    pub fn add_layer(&mut self) -> Result<LayerId, LayerError> {
        self.commit();
        let id = self.document.add_layer()?;
        self.subscribers.notify(EditorEvent::LayerChanged(LayerEvent::Added { id }));
        Ok(id)
    }

    pub fn delete_layer(&mut self, id: LayerId) -> Result<(), LayerError> {
        self.commit();
        self.document.delete_layer(id)?;
        self.subscribers.notify(EditorEvent::LayerChanged(LayerEvent::Removed { id }));
        Ok(())
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> Result<(), LayerError> {
        self.commit();
        self.document.set_active(id)?;
        self.subscribers.notify(EditorEvent::LayerChanged(LayerEvent::Activated { id }));
        Ok(())
    }

    pub fn move_layer(&mut self, id: LayerId, index: usize) -> Result<(), LayerError> {
        self.document.move_layer(id, index)?;
        self.subscribers.notify(EditorEvent::LayerChanged(LayerEvent::PropertiesChanged { id }));
        Ok(())
    }

    /// Apply visibility, opacity, blend mode, name and shadow from `info`
    pub fn update_layer(&mut self, info: &LayerInfo) -> Result<(), LayerError> {
        let layer = self
            .document
            .layer_mut(info.id)
            .ok_or(LayerError::UnknownLayer(info.id))?;
        layer.apply_info(info);
        self.subscribers.notify(EditorEvent::LayerChanged(LayerEvent::PropertiesChanged { id: info.id }));
        Ok(())
    }

    pub fn layer_infos(&self) -> Vec<LayerInfo> {
        self.document.layers().iter().map(|l| l.info()).collect()
    }

    // ------------------------------------------------------------------
    // Output

    pub fn flatten(&self) -> Result<Surface, SurfaceError> {
        compositor::flatten(&self.document)
    }

    pub fn export_png(&self) -> Result<Vec<u8>, ExportError> {
        compositor::export_png(&self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventQueue;

    fn editor() -> PaintEditor {
        PaintEditor::with_document(
            EditorConfig::default(),
            Document::with_size(64, 64).unwrap(),
            StdRng::seed_from_u64(7),
        )
    }

    fn screen(ed: &PaintEditor, x: f32, y: f32) -> Pos2 {
        ed.viewport().canvas_to_screen(Pos2::new(x, y))
    }

    fn layer_pixels(ed: &PaintEditor) -> Vec<Color32> {
        ed.document().active_layer().unwrap().surface().pixels()
    }

    fn drag(ed: &mut PaintEditor, points: &[(f32, f32)], time: f64) {
        let (x, y) = points[0];
        let start = screen(ed, x, y);
        ed.pointer_down(start, 0.5, time);
        for &(x, y) in &points[1..] {
            let pos = screen(ed, x, y);
            ed.pointer_move(pos, 0.5, time);
        }
    }

    fn release(ed: &mut PaintEditor, time: f64) {
        let last = ed.session().map(|s| s.last()).unwrap_or(Pos2::ZERO);
        let pos = ed.viewport().canvas_to_screen(last);
        ed.pointer_up(pos, time);
    }

    const ACROSS: [(f32, f32); 5] = [(10.0, 32.0), (20.0, 32.0), (30.0, 32.0), (40.0, 32.0), (50.0, 32.0)];

    #[test]
    fn test_direct_tool_draws_into_the_layer_and_undoes() {
        let mut ed = editor();
        ed.select_tool(ToolId::CRAYON).unwrap();
        let before = layer_pixels(&ed);

        drag(&mut ed, &ACROSS, 0.0);
        assert_ne!(layer_pixels(&ed), before);
        assert!(ed.document().overlay().is_transparent());
        release(&mut ed, 0.1);

        assert_eq!(ed.history().len(), 1);
        assert!(ed.undo());
        assert_eq!(layer_pixels(&ed), before);
        assert!(!ed.undo());
    }

    #[test]
    fn test_overlay_tool_commits_on_release() {
        let mut ed = editor();
        ed.select_tool(ToolId::MARKER).unwrap();
        let before = layer_pixels(&ed);

        drag(&mut ed, &ACROSS, 0.0);
        assert_eq!(layer_pixels(&ed), before);
        assert!(!ed.document().overlay().is_transparent());

        release(&mut ed, 0.1);
        assert!(!ed.is_drawing());
        assert!(ed.document().overlay().is_transparent());
        assert_ne!(layer_pixels(&ed), before);
    }

    #[test]
    fn test_tap_draws_a_dot() {
        let mut ed = editor();
        let before = layer_pixels(&ed);
        let at = screen(&ed, 32.0, 32.0);
        ed.pointer_down(at, 0.5, 0.0);
        ed.pointer_up(at, 0.05);
        assert_ne!(layer_pixels(&ed), before);
    }

    #[test]
    fn test_fill_records_history_only_when_pixels_change() {
        let mut ed = editor();
        ed.select_tool(ToolId::FILL).unwrap();
        ed.set_color(Color32::RED);
        let at = screen(&ed, 5.0, 5.0);

        ed.pointer_down(at, 0.5, 0.0);
        assert!(!ed.is_drawing());
        assert_eq!(ed.history().len(), 1);
        assert_eq!(ed.document().active_layer().unwrap().surface().pixel(40, 40), Some(Color32::RED));

        ed.pointer_down(at, 0.5, 0.1);
        assert_eq!(ed.history().len(), 1);
    }

    #[test]
    fn test_second_touch_commits_and_pinches() {
        let mut ed = editor();
        let queue = EventQueue::new();
        ed.subscribe(queue.handler());

        let (a, b) = (screen(&ed, 10.0, 10.0), screen(&ed, 30.0, 10.0));
        ed.touch_start(1, a, None, 0.0);
        ed.touch_move(1, b, Some(0.7), 0.05);
        assert!(ed.is_drawing());

        ed.touch_start(2, screen(&ed, 50.0, 50.0), None, 0.1);
        assert!(!ed.is_drawing());
        assert!(ed.viewport().is_pinching());
        assert!(queue.drain().iter().any(|e| matches!(e, EditorEvent::StrokeCommitted { .. })));

        ed.touch_end(2, b, 0.2);
        assert!(!ed.viewport().is_pinching());
    }

    #[test]
    fn test_pointer_ignored_during_pinch() {
        let mut ed = editor();
        ed.touch_start(1, screen(&ed, 10.0, 10.0), None, 0.0);
        ed.touch_start(2, screen(&ed, 40.0, 40.0), None, 0.0);
        ed.pointer_down(screen(&ed, 20.0, 20.0), 0.5, 0.1);
        assert!(!ed.is_drawing());
    }

    #[test]
    fn test_hold_snaps_a_straight_stroke_to_a_line() {
        let mut ed = editor();
        let queue = EventQueue::new();
        ed.subscribe(queue.handler());

        let points: Vec<(f32, f32)> = (0..20).map(|i| (5.0 + i as f32 * 2.5, 30.0)).collect();
        drag(&mut ed, &points, 0.0);
        ed.tick(0.5);
        assert_eq!(ed.session().unwrap().shape_kind(), None);

        ed.tick(1.0);
        assert_eq!(ed.session().unwrap().shape_kind(), Some(ShapeKind::Line));
        assert!(queue.drain().contains(&EditorEvent::ShapeSnapped { kind: ShapeKind::Line }));

        release(&mut ed, 1.1);
        assert!(ed.document().overlay().is_transparent());
    }

    #[test]
    fn test_shape_mode_previews_on_the_overlay() {
        let mut ed = editor();
        ed.select_tool(ToolId::CRAYON).unwrap();
        ed.set_mode(DrawMode::Shape(ShapeKind::Rect));
        let queue = EventQueue::new();
        ed.subscribe(queue.handler());
        let before = layer_pixels(&ed);

        drag(&mut ed, &[(10.0, 10.0), (50.0, 40.0)], 0.0);
        assert_eq!(layer_pixels(&ed), before);
        assert!(!ed.document().overlay().is_transparent());
        assert!(matches!(
            queue.drain().first(),
            Some(EditorEvent::StrokeStarted { tool: ToolId::PENCIL, .. })
        ));

        release(&mut ed, 0.1);
        assert_ne!(layer_pixels(&ed), before);
        assert!(ed.document().overlay().is_transparent());
    }

    #[test]
    fn test_ribbon_ticks_until_commit() {
        let mut ed = editor();
        ed.select_tool(ToolId::RIBBON).unwrap();
        drag(&mut ed, &[(10.0, 10.0), (50.0, 50.0)], 0.0);
        assert!(ed.next_wakeup().is_some());

        ed.tick(0.1);
        assert!(!ed.document().overlay().is_transparent());

        release(&mut ed, 0.2);
        assert_eq!(ed.next_wakeup(), None);
    }

    #[test]
    fn test_ribbon_trails_ignore_the_tool_alpha() {
        let trails = |alpha: f32| {
            let mut ed = editor();
            ed.select_tool(ToolId::RIBBON).unwrap();
            ed.update_tool(ToolSetting::Alpha(alpha)).unwrap();
            drag(&mut ed, &[(10.0, 10.0), (50.0, 50.0)], 0.0);
            ed.tick(0.1);
            ed.document().overlay().pixels()
        };
        let opaque = trails(1.0);
        assert!(opaque.iter().any(|p| p.a() > 0));
        assert_eq!(trails(0.2), opaque);
    }

    #[test]
    fn test_select_tool_emits_change_and_resets_mode() {
        let mut ed = editor();
        let queue = EventQueue::new();
        ed.subscribe(queue.handler());
        ed.set_mode(DrawMode::Shape(ShapeKind::Ellipse));

        ed.select_tool(ToolId::INK).unwrap();
        assert_eq!(ed.mode(), DrawMode::Brush);
        assert_eq!(
            queue.drain(),
            vec![EditorEvent::ToolChanged {
                old: ToolId::PENCIL,
                new: ToolId::INK
            }]
        );
    }

    #[test]
    fn test_tool_update_does_not_affect_stroke_in_progress() {
        let mut ed = editor();
        drag(&mut ed, &ACROSS[..2], 0.0);
        ed.update_tool(ToolSetting::Size(40.0)).unwrap();
        assert_eq!(ed.session().unwrap().tool().settings.size, 3.0);
        assert_eq!(ed.active_tool().settings.size, 40.0);
    }

    #[test]
    fn test_last_layer_cannot_be_deleted() {
        let mut ed = editor();
        let background = ed.document().active_id();
        assert!(matches!(ed.delete_layer(background), Err(LayerError::LastLayer)));

        let added = ed.add_layer().unwrap();
        assert_eq!(ed.document().active_id(), added);
        ed.delete_layer(added).unwrap();
        assert_eq!(ed.document().active_id(), background);
    }
}
