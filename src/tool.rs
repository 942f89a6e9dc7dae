//! Tool definitions and the catalog the editor draws with.
//!
//! The catalog hands out `Arc<ToolDefinition>`s. A stroke session pins the
//! definition it started with, so settings edited mid-stroke only apply to
//! the next stroke.

use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::brush_texture::BrushTip;
use crate::error::ToolError;
use crate::raster::{BlendMode, LineCap};

/// Static key of a tool in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ToolId(&'static str);

impl ToolId {
    pub const PENCIL: ToolId = ToolId("PENCIL");
    pub const INK: ToolId = ToolId("INK");
    pub const BRUSH: ToolId = ToolId("BRUSH");
    pub const MARKER: ToolId = ToolId("MARKER");
    pub const ERASER: ToolId = ToolId("ERASER");
    pub const WATERCOLOR: ToolId = ToolId("WATERCOLOR");
    pub const AIRBRUSH: ToolId = ToolId("AIRBRUSH");
    pub const CRAYON: ToolId = ToolId("CRAYON");
    pub const CHARCOAL: ToolId = ToolId("CHARCOAL");
    pub const PASTEL: ToolId = ToolId("PASTEL");
    pub const SPRAY: ToolId = ToolId("SPRAY");
    pub const SKIN: ToolId = ToolId("SKIN");
    pub const OIL: ToolId = ToolId("OIL");
    pub const ACRYLIC: ToolId = ToolId("ACRYLIC");
    pub const CALLIGRAPHY: ToolId = ToolId("CALLIGRAPHY");
    pub const FUR: ToolId = ToolId("FUR");
    pub const HATCH: ToolId = ToolId("HATCH");
    pub const CROSSHATCH: ToolId = ToolId("CROSSHATCH");
    pub const RIBBON: ToolId = ToolId("RIBBON");
    pub const FILL: ToolId = ToolId("FILL");

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicsKind {
    Ribbon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityKind {
    Fill,
}

/// Rendering family of a tool, with the data only that family uses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Archetype {
    Vector {
        line_cap: LineCap,
    },
    Texture {
        tip: BrushTip,
        /// Stamp spacing as a share of the tool size
        density: f32,
        /// Maximum stamp displacement in pixels
        scatter: f32,
    },
    Physics {
        model: PhysicsKind,
    },
    Utility {
        action: UtilityKind,
    },
}

impl Archetype {
    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Vector { .. } => "vector",
            Archetype::Texture { .. } => "texture",
            Archetype::Physics { .. } => "physics",
            Archetype::Utility { .. } => "utility",
        }
    }
}

/// Settings shared by every archetype
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub size: f32,
    pub alpha: f32,
    pub composite: BlendMode,
    pub smoothing: f32,
    pub pressure: bool,
    pub shadow: bool,
    pub shadow_blur: f32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            size: 1.0,
            alpha: 1.0,
            composite: BlendMode::Normal,
            smoothing: 0.0,
            pressure: false,
            shadow: false,
            shadow_blur: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub id: ToolId,
    pub label: &'static str,
    pub archetype: Archetype,
    #[serde(flatten)]
    pub settings: ToolSettings,
    /// Renders into the overlay surface and commits on pointer-up
    pub overlay: bool,
    /// The hold timer may snap strokes of this tool into shapes
    pub auto_snap: bool,
}

impl ToolDefinition {
    fn new(id: ToolId, label: &'static str, archetype: Archetype, settings: ToolSettings) -> Self {
        Self {
            id,
            label,
            archetype,
            settings,
            overlay: false,
            auto_snap: true,
        }
    }

    fn with_overlay(mut self) -> Self {
        self.overlay = true;
        self
    }

    fn without_snap(mut self) -> Self {
        self.auto_snap = false;
        self
    }

    pub fn is_texture(&self) -> bool {
        matches!(self.archetype, Archetype::Texture { .. })
    }

    /// Line cap for vector strokes; round for every other archetype
    pub fn line_cap(&self) -> LineCap {
        match self.archetype {
            Archetype::Vector { line_cap } => line_cap,
            _ => LineCap::Round,
        }
    }

    /// Apply one setting after validating it
    fn apply(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        let tool = self.id.as_str();
        match setting {
            ToolSetting::Size(v) => self.settings.size = positive("size", v)?,
            ToolSetting::Alpha(v) => self.settings.alpha = unit("alpha", v)?,
            ToolSetting::Composite(mode) => self.settings.composite = mode,
            ToolSetting::Smoothing(v) => self.settings.smoothing = unit("smoothing", v)?,
            ToolSetting::Pressure(on) => self.settings.pressure = on,
            ToolSetting::Shadow(on) => self.settings.shadow = on,
            ToolSetting::ShadowBlur(v) => self.settings.shadow_blur = non_negative("shadow_blur", v)?,
            ToolSetting::LineCap(cap) => match &mut self.archetype {
                Archetype::Vector { line_cap } => *line_cap = cap,
                _ => return Err(ToolError::NotApplicable { setting: "line_cap", tool }),
            },
            ToolSetting::Density(v) => match &mut self.archetype {
                Archetype::Texture { density, .. } => {
                    let v = positive("density", v)?;
                    if v > 1.0 {
                        return Err(ToolError::InvalidValue { setting: "density", value: v });
                    }
                    *density = v;
                }
                _ => return Err(ToolError::NotApplicable { setting: "density", tool }),
            },
            ToolSetting::Scatter(v) => match &mut self.archetype {
                Archetype::Texture { scatter, .. } => *scatter = non_negative("scatter", v)?,
                _ => return Err(ToolError::NotApplicable { setting: "scatter", tool }),
            },
        }
        Ok(())
    }
}

fn positive(setting: &'static str, value: f32) -> Result<f32, ToolError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ToolError::InvalidValue { setting, value })
    }
}

fn non_negative(setting: &'static str, value: f32) -> Result<f32, ToolError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ToolError::InvalidValue { setting, value })
    }
}

fn unit(setting: &'static str, value: f32) -> Result<f32, ToolError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ToolError::InvalidValue { setting, value })
    }
}

/// One field of the active tool to replace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "setting", content = "value", rename_all = "snake_case")]
pub enum ToolSetting {
    Size(f32),
    Alpha(f32),
    Composite(BlendMode),
    Smoothing(f32),
    Pressure(bool),
    Shadow(bool),
    ShadowBlur(f32),
    LineCap(LineCap),
    Density(f32),
    Scatter(f32),
}

/// Ordered set of tools plus the active selection
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<Arc<ToolDefinition>>,
    active: usize,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolCatalog {
    /// The stock tool set, with the pencil active
    pub fn builtin() -> Self {
        let vector = |cap| Archetype::Vector { line_cap: cap };
        let texture = |tip, density, scatter| Archetype::Texture { tip, density, scatter };
        let settings = |size: f32, alpha: f32, composite, smoothing: f32, pressure| ToolSettings {
            size,
            alpha,
            composite,
            smoothing,
            pressure,
            shadow: false,
            shadow_blur: 0.0,
        };
        let normal = BlendMode::Normal;

        let tools = vec![
            ToolDefinition::new(ToolId::PENCIL, "Pencil", vector(LineCap::Round), settings(3.0, 1.0, normal, 0.0, true))
                .with_overlay(),
            ToolDefinition::new(ToolId::INK, "Ink Pen", vector(LineCap::Round), settings(4.0, 1.0, normal, 0.5, true))
                .with_overlay(),
            ToolDefinition::new(ToolId::BRUSH, "Brush", vector(LineCap::Round), settings(12.0, 1.0, normal, 0.2, true))
                .with_overlay(),
            ToolDefinition::new(
                ToolId::MARKER,
                "Marker",
                vector(LineCap::Square),
                settings(15.0, 0.5, BlendMode::Multiply, 0.1, false),
            )
            .with_overlay(),
            ToolDefinition::new(
                ToolId::ERASER,
                "Eraser",
                vector(LineCap::Round),
                settings(30.0, 1.0, BlendMode::DestinationOut, 0.0, false),
            )
            .without_snap(),
            ToolDefinition::new(
                ToolId::WATERCOLOR,
                "Watercolor",
                texture(BrushTip::Watercolor, 0.15, 0.0),
                ToolSettings {
                    shadow: true,
                    shadow_blur: 15.0,
                    ..settings(25.0, 0.4, BlendMode::Multiply, 0.1, true)
                },
            )
            .with_overlay(),
            ToolDefinition::new(
                ToolId::AIRBRUSH,
                "Airbrush",
                texture(BrushTip::Airbrush, 0.1, 0.0),
                settings(40.0, 0.6, normal, 0.1, true),
            )
            .with_overlay(),
            ToolDefinition::new(ToolId::CRAYON, "Crayon", texture(BrushTip::Crayon, 0.15, 2.0), settings(15.0, 1.0, normal, 0.0, false)),
            ToolDefinition::new(
                ToolId::CHARCOAL,
                "Charcoal",
                texture(BrushTip::Charcoal, 0.1, 3.0),
                settings(20.0, 0.8, normal, 0.0, true),
            ),
            ToolDefinition::new(ToolId::PASTEL, "Pastel", texture(BrushTip::Pastel, 0.15, 2.0), settings(18.0, 0.9, normal, 0.0, false)),
            ToolDefinition::new(ToolId::SPRAY, "Spray", texture(BrushTip::Spray, 0.3, 10.0), settings(50.0, 1.0, normal, 0.0, true)),
            ToolDefinition::new(ToolId::SKIN, "Skin", texture(BrushTip::Skin, 0.2, 4.0), settings(30.0, 0.7, normal, 0.0, false)),
            ToolDefinition::new(ToolId::OIL, "Oil", texture(BrushTip::Oil, 0.08, 1.0), settings(22.0, 1.0, normal, 0.0, false)),
            ToolDefinition::new(ToolId::ACRYLIC, "Acrylic", texture(BrushTip::Acrylic, 0.1, 1.0), settings(20.0, 1.0, normal, 0.0, false)),
            ToolDefinition::new(
                ToolId::CALLIGRAPHY,
                "Calligraphy",
                texture(BrushTip::Calligraphy, 0.05, 0.0),
                settings(16.0, 1.0, normal, 0.0, true),
            ),
            ToolDefinition::new(ToolId::FUR, "Fur", texture(BrushTip::Fur, 0.2, 4.0), settings(24.0, 1.0, normal, 0.0, false)),
            ToolDefinition::new(ToolId::HATCH, "Hatch", texture(BrushTip::Hatch, 0.5, 0.0), settings(20.0, 1.0, normal, 0.0, false)),
            ToolDefinition::new(
                ToolId::CROSSHATCH,
                "Crosshatch",
                texture(BrushTip::CrossHatch, 0.5, 0.0),
                settings(20.0, 1.0, normal, 0.0, false),
            ),
            ToolDefinition::new(
                ToolId::RIBBON,
                "Ribbon",
                Archetype::Physics { model: PhysicsKind::Ribbon },
                settings(1.0, 1.0, normal, 0.0, false),
            )
            .with_overlay()
            .without_snap(),
            ToolDefinition::new(
                ToolId::FILL,
                "Fill",
                Archetype::Utility { action: UtilityKind::Fill },
                settings(1.0, 1.0, normal, 0.0, false),
            )
            .without_snap(),
        ];

        Self {
            tools: tools.into_iter().map(Arc::new).collect(),
            active: 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolDefinition>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, id: ToolId) -> Option<&Arc<ToolDefinition>> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Resolve a tool key, e.g. one read back from storage
    pub fn find(&self, key: &str) -> Result<ToolId, ToolError> {
        self.tools
            .iter()
            .find(|t| t.id.as_str() == key)
            .map(|t| t.id)
            .ok_or_else(|| ToolError::UnknownTool(key.to_owned()))
    }

    pub fn active(&self) -> &Arc<ToolDefinition> {
        &self.tools[self.active]
    }

    pub fn select(&mut self, id: ToolId) -> Result<(), ToolError> {
        let index = self
            .tools
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ToolError::UnknownTool(id.to_string()))?;
        self.active = index;
        debug!("selected tool {id}");
        Ok(())
    }

    /// Replace one setting of the active tool. Definitions already handed out
    /// keep their old values.
    pub fn update_active(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        let tool = Arc::make_mut(&mut self.tools[self.active]);
        tool.apply(setting)?;
        info!("updated {} with {setting:?}", tool.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_matches_stock_tools() {
        let catalog = ToolCatalog::builtin();
        assert_eq!(catalog.len(), 20);
        assert_eq!(catalog.active().id, ToolId::PENCIL);

        let marker = catalog.get(ToolId::MARKER).unwrap();
        assert_eq!(marker.line_cap(), LineCap::Square);
        assert_eq!(marker.settings.composite, BlendMode::Multiply);
        assert!(marker.overlay);

        let eraser = catalog.get(ToolId::ERASER).unwrap();
        assert_eq!(eraser.settings.composite, BlendMode::DestinationOut);
        assert!(!eraser.overlay && !eraser.auto_snap);

        let watercolor = catalog.get(ToolId::WATERCOLOR).unwrap();
        assert!(watercolor.settings.shadow);
        assert_eq!(watercolor.settings.shadow_blur, 15.0);
    }

    #[test]
    fn update_rejects_invalid_values() {
        let mut catalog = ToolCatalog::builtin();
        assert!(matches!(
            catalog.update_active(ToolSetting::Alpha(1.5)),
            Err(ToolError::InvalidValue { setting: "alpha", .. })
        ));
        assert!(catalog.update_active(ToolSetting::Size(0.0)).is_err());
        assert!(catalog.update_active(ToolSetting::Size(f32::NAN)).is_err());
        assert_eq!(catalog.active().settings.size, 3.0);
    }

    #[test]
    fn archetype_specific_settings_are_checked() {
        let mut catalog = ToolCatalog::builtin();
        assert!(matches!(
            catalog.update_active(ToolSetting::Density(0.5)),
            Err(ToolError::NotApplicable { setting: "density", tool: "PENCIL" })
        ));
        catalog.select(ToolId::SPRAY).unwrap();
        catalog.update_active(ToolSetting::Density(0.5)).unwrap();
        assert!(catalog.update_active(ToolSetting::LineCap(LineCap::Butt)).is_err());
        assert!(catalog.update_active(ToolSetting::Density(1.5)).is_err());
    }

    #[test]
    fn unknown_keys_are_reported() {
        let catalog = ToolCatalog::builtin();
        assert_eq!(catalog.find("OIL").unwrap(), ToolId::OIL);
        assert!(matches!(catalog.find("LASSO"), Err(ToolError::UnknownTool(key)) if key == "LASSO"));
    }

    #[test]
    fn settings_serialize_with_kebab_blend_names() {
        let catalog = ToolCatalog::builtin();
        let json = serde_json::to_value(catalog.get(ToolId::ERASER).unwrap().as_ref()).unwrap();
        assert_eq!(json["composite"], "destination-out");
        assert_eq!(json["archetype"]["kind"], "vector");
        assert_eq!(json["archetype"]["line_cap"], "round");
    }
}
