use std::time::Duration;

use egui::{Color32, ColorImage, Pos2, Rect, Sense, Stroke};
use log::{error, info, warn};

use crate::compositor;
use crate::config::EditorConfig;
use crate::editor::{DrawMode, PaintEditor};
use crate::error::SurfaceError;
use crate::event::LoggingEventHandler;
use crate::input::InputHandler;
use crate::layer::LayerInfo;
use crate::raster::BlendMode;
use crate::shape::ShapeKind;
use crate::texture_manager::{TextureManager, TextureSlot};
use crate::tool::{ToolId, ToolSetting};

const EXPORT_FILE: &str = "layer_paint.png";

/// What survives a restart. Pixels are not persisted.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct Preferences {
    /// Straight sRGBA
    pub color: [u8; 4],
    pub tool: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            tool: ToolId::PENCIL.as_str().to_owned(),
        }
    }
}

pub struct PaintApp {
    editor: PaintEditor,
    input: InputHandler,
    textures: TextureManager,
}

impl PaintApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, config: EditorConfig) -> Result<Self, SurfaceError> {
        let mut app = Self::with_config(config)?;
        if let Some(storage) = cc.storage {
            if let Some(prefs) = eframe::get_value::<Preferences>(storage, eframe::APP_KEY) {
                app.apply_preferences(&prefs);
            }
        }
        Ok(app)
    }

    pub fn with_config(config: EditorConfig) -> Result<Self, SurfaceError> {
        let mut editor = PaintEditor::new(config)?;
        editor.subscribe(Box::new(LoggingEventHandler));
        Ok(Self {
            editor,
            input: InputHandler::new(),
            textures: TextureManager::new(),
        })
    }

    pub fn editor(&self) -> &PaintEditor {
        &self.editor
    }

    pub fn preferences(&self) -> Preferences {
        Preferences {
            color: self.editor.color().to_srgba_unmultiplied(),
            tool: self.editor.active_tool().id.as_str().to_owned(),
        }
    }

    pub fn apply_preferences(&mut self, prefs: &Preferences) {
        let [r, g, b, a] = prefs.color;
        self.editor.set_color(Color32::from_rgba_unmultiplied(r, g, b, a));
        match self.editor.catalog().find(&prefs.tool) {
            Ok(id) => {
                if let Err(err) = self.editor.select_tool(id) {
                    warn!("could not restore tool: {err}");
                }
            }
            Err(err) => warn!("ignoring stored tool: {err}"),
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            let active = self.editor.active_tool().id;
            let mut chosen = None;
            egui::ComboBox::from_id_salt("tool")
                .selected_text(self.editor.active_tool().label)
                .show_ui(ui, |ui| {
                    for tool in self.editor.catalog().iter() {
                        if ui.selectable_label(tool.id == active, tool.label).clicked() {
                            chosen = Some(tool.id);
                        }
                    }
                });
            if let Some(id) = chosen {
                if let Err(err) = self.editor.select_tool(id) {
                    error!("{err}");
                }
            }

            let mut color = self.editor.color();
            if ui.color_edit_button_srgba(&mut color).changed() {
                self.editor.set_color(color);
            }

            let settings = self.editor.active_tool().settings;
            let mut size = settings.size;
            if ui.add(egui::Slider::new(&mut size, 1.0..=100.0).text("Size")).changed() {
                self.update_tool(ToolSetting::Size(size));
            }
            let mut alpha = settings.alpha;
            if ui.add(egui::Slider::new(&mut alpha, 0.01..=1.0).text("Opacity")).changed() {
                self.update_tool(ToolSetting::Alpha(alpha));
            }

            ui.separator();
            let mode = self.editor.mode();
            if ui.selectable_label(mode == DrawMode::Brush, "Free").clicked() {
                self.editor.set_mode(DrawMode::Brush);
            }
            for kind in ShapeKind::ALL {
                if ui.selectable_label(mode == DrawMode::Shape(kind), kind.label()).clicked() {
                    self.editor.set_mode(DrawMode::Shape(kind));
                }
            }

            ui.separator();
            if ui
                .add_enabled(self.editor.history().can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                self.editor.undo();
            }
            if ui.button("Export PNG").clicked() {
                self.export();
            }
        });
    }

    fn update_tool(&mut self, setting: ToolSetting) {
        if let Err(err) = self.editor.update_tool(setting) {
            warn!("{err}");
        }
    }

    fn layers_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Layers");
        if ui.button("Add Layer").clicked() {
            if let Err(err) = self.editor.add_layer() {
                error!("{err}");
            }
        }
        ui.separator();

        let active = self.editor.document().active_id();
        for mut info in self.editor.layer_infos() {
            let before = info.clone();
            let mut select = false;
            let mut delete = false;
            ui.horizontal(|ui| {
                ui.checkbox(&mut info.visible, "");
                select = ui.selectable_label(info.id == active, info.name.as_str()).clicked();
                delete = ui.small_button("🗑").clicked();
            });
            ui.add(egui::Slider::new(&mut info.opacity, 0.0..=1.0).text("Opacity"));
            blend_combo(ui, &mut info);
            ui.checkbox(&mut info.shadow, "Drop shadow");
            ui.separator();

            if info != before {
                if let Err(err) = self.editor.update_layer(&info) {
                    error!("{err}");
                }
            }
            if select {
                if let Err(err) = self.editor.set_active_layer(info.id) {
                    error!("{err}");
                }
            }
            if delete {
                if let Err(err) = self.editor.delete_layer(info.id) {
                    warn!("{err}");
                }
            }
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui, now: f64) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::drag());
        let rect = response.rect;
        self.input.set_canvas_rect(rect);
        self.editor.resize_viewport(rect.size(), now);

        for event in self.input.process_input(ui.ctx()) {
            self.editor.handle_input(event);
        }
        self.editor.tick(now);

        let document = self.editor.document();
        let [w, h] = document.size();
        let viewport = self.editor.viewport();
        let min = viewport.canvas_to_screen(Pos2::ZERO);
        let max = viewport.canvas_to_screen(Pos2::new(w as f32, h as f32));
        let canvas_rect = Rect::from_min_max(min, max).translate(rect.min.to_vec2());
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

        painter.rect_filled(rect, 0.0, Color32::from_gray(40));

        let composite = self.textures.texture_for(
            TextureSlot::Composite,
            compositor::fingerprint(document),
            ui.ctx(),
            || match compositor::flatten(document) {
                Ok(flat) => flat.to_color_image(),
                Err(err) => {
                    error!("could not flatten for display: {err}");
                    ColorImage::new([w, h], Color32::WHITE)
                }
            },
        );
        painter.image(composite, canvas_rect, uv, Color32::WHITE);

        if self.editor.is_drawing() {
            let overlay = document.overlay();
            let tint = self
                .editor
                .session()
                .filter(|s| s.commits_overlay())
                .map_or(1.0, |s| s.tool().settings.alpha);
            let texture = self.textures.texture_for(TextureSlot::Overlay, overlay.generation(), ui.ctx(), || {
                overlay.to_color_image()
            });
            painter.image(texture, canvas_rect, uv, Color32::WHITE.gamma_multiply(tint));
        }
        painter.rect_stroke(canvas_rect, 0.0, Stroke::new(1.0, Color32::from_gray(90)));
    }

    fn export(&self) {
        match self.editor.export_png() {
            Ok(bytes) => match std::fs::write(EXPORT_FILE, bytes) {
                Ok(()) => info!("wrote {EXPORT_FILE}"),
                Err(err) => error!("could not write {EXPORT_FILE}: {err}"),
            },
            Err(err) => error!("export failed: {err}"),
        }
    }
}

fn blend_combo(ui: &mut egui::Ui, info: &mut LayerInfo) {
    egui::ComboBox::from_id_salt(info.id)
        .selected_text(info.blend_mode.label())
        .show_ui(ui, |ui| {
            for mode in BlendMode::ALL {
                ui.selectable_value(&mut info.blend_mode, mode, mode.label());
            }
        });
}

impl eframe::App for PaintApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.preferences());
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);
        if ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z)) {
            self.editor.undo();
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::SidePanel::right("layers")
            .min_width(180.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.layers_panel(ui));
            });
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.canvas(ui, now));

        if let Some(due) = self.editor.next_wakeup() {
            ctx.request_repaint_after(Duration::from_secs_f64((due - now).max(0.0)));
        }
        if self.editor.is_drawing() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_round_trip_through_the_editor() {
        let mut app = PaintApp::with_config(EditorConfig::default()).unwrap();
        let prefs = Preferences {
            color: [200, 30, 30, 255],
            tool: ToolId::WATERCOLOR.as_str().to_owned(),
        };
        app.apply_preferences(&prefs);
        assert_eq!(app.preferences(), prefs);
    }

    #[test]
    fn test_unknown_stored_tool_is_ignored() {
        let mut app = PaintApp::with_config(EditorConfig::default()).unwrap();
        app.apply_preferences(&Preferences {
            tool: "laser".into(),
            ..Preferences::default()
        });
        assert_eq!(app.editor().active_tool().id, ToolId::PENCIL);
    }

    #[test]
    fn test_old_preferences_fill_missing_fields() {
        let prefs: Preferences = serde_json::from_str(r#"{ "tool": "INK" }"#).unwrap();
        assert_eq!(prefs.color, [0, 0, 0, 255]);
    }
}
