use std::fmt;

use egui::{Color32, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SurfaceError;
use crate::raster::{BlendMode, PixelSnapshot, Surface};

/// A unique, stable identifier for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Creates a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blurred, offset copy of a layer's alpha drawn beneath it when flattening
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropShadow {
    pub color: Color32,
    pub blur: f32,
    pub offset: Vec2,
}

impl Default for DropShadow {
    fn default() -> Self {
        Self {
            color: Color32::from_black_alpha(128),
            blur: 10.0,
            offset: Vec2::new(5.0, 5.0),
        }
    }
}

/// Serializable description of a layer's properties, without its pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub shadow: bool,
    /// Straight sRGBA
    pub shadow_color: [u8; 4],
    pub shadow_blur: f32,
    pub shadow_offset_x: f32,
    pub shadow_offset_y: f32,
}

/// One sheet of the stack. Its pixels can be edited but its surface never
/// replaced, so every layer keeps the canvas size it was created with.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    id: LayerId,
    /// Display name of the layer
    pub name: String,
    /// Whether the layer takes part in flattening
    pub visible: bool,
    opacity: f32,
    pub blend_mode: BlendMode,
    pub shadow: Option<DropShadow>,
    surface: Surface,
}

impl Layer {
    /// Creates a visible, fully opaque, transparent layer
    pub fn new(name: &str, width: usize, height: usize) -> Result<Self, SurfaceError> {
        Ok(Self::with_surface(name, Surface::new(width, height)?))
    }

    /// Creates the opaque white layer every document starts with
    pub fn background(width: usize, height: usize) -> Result<Self, SurfaceError> {
        Ok(Self::with_surface("Background", Surface::filled(width, height, Color32::WHITE)?))
    }

    fn with_surface(name: &str, surface: Surface) -> Self {
        Self {
            id: LayerId::new(),
            name: name.to_string(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            shadow: None,
            surface,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        if opacity.is_finite() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Drawing access for the renderer and fill inside the crate
    pub(crate) fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn fill(&mut self, color: Color32) {
        self.surface.fill(color);
    }

    pub fn set_pixel(&mut self, x: i64, y: i64, color: Color32) -> Result<(), SurfaceError> {
        self.surface.set_pixel(x, y, color)
    }

    pub fn write_pixels(&mut self, pixels: &[Color32]) -> Result<(), SurfaceError> {
        self.surface.write_pixels(pixels)
    }

    /// Put back pixels taken from this layer; other sizes are rejected
    pub fn restore(&mut self, snapshot: &PixelSnapshot) -> Result<(), SurfaceError> {
        self.surface.restore(snapshot)
    }

    pub fn composite(&mut self, source: &Surface, alpha: f32, blend: BlendMode) -> Result<(), SurfaceError> {
        self.surface.composite(source, alpha, blend)
    }

    pub fn info(&self) -> LayerInfo {
        let shadow = self.shadow.unwrap_or_default();
        LayerInfo {
            id: self.id,
            name: self.name.clone(),
            visible: self.visible,
            opacity: self.opacity,
            blend_mode: self.blend_mode,
            shadow: self.shadow.is_some(),
            shadow_color: shadow.color.to_srgba_unmultiplied(),
            shadow_blur: shadow.blur,
            shadow_offset_x: shadow.offset.x,
            shadow_offset_y: shadow.offset.y,
        }
    }

    /// Copy every property of `info` except the id
    pub fn apply_info(&mut self, info: &LayerInfo) {
        self.name = info.name.clone();
        self.visible = info.visible;
        self.set_opacity(info.opacity);
        self.blend_mode = info.blend_mode;
        self.shadow = info.shadow.then(|| {
            let [r, g, b, a] = info.shadow_color;
            DropShadow {
                color: Color32::from_rgba_unmultiplied(r, g, b, a),
                blur: info.shadow_blur.max(0.0),
                offset: Vec2::new(info.shadow_offset_x, info.shadow_offset_y),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_layer_defaults() {
        let layer = Layer::new("Layer 2", 4, 4).unwrap();
        assert!(layer.visible);
        assert_eq!(layer.opacity(), 1.0);
        assert_eq!(layer.blend_mode, BlendMode::Normal);
        assert!(layer.shadow.is_none());
        assert!(layer.surface().is_transparent());
    }

    #[test]
    fn test_background_is_white() {
        let layer = Layer::background(2, 2).unwrap();
        assert_eq!(layer.name, "Background");
        assert!(layer.surface().pixels().iter().all(|p| *p == Color32::WHITE));
    }

    #[test]
    fn test_info_round_trips_properties() {
        let mut layer = Layer::new("Ink", 2, 2).unwrap();
        layer.set_opacity(0.4);
        layer.blend_mode = BlendMode::Screen;
        layer.shadow = Some(DropShadow {
            color: Color32::from_rgb(10, 20, 30),
            blur: 4.0,
            offset: Vec2::new(2.0, -3.0),
        });

        let json = serde_json::to_string(&layer.info()).unwrap();
        let info: LayerInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info.id, layer.id());
        assert_eq!(info.blend_mode, BlendMode::Screen);

        let mut other = Layer::new("Other", 2, 2).unwrap();
        other.apply_info(&info);
        assert_eq!(other.name, "Ink");
        assert_eq!(other.opacity(), 0.4);
        assert_eq!(other.shadow, layer.shadow);
        assert_ne!(other.id(), layer.id());
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut layer = Layer::new("L", 1, 1).unwrap();
        layer.set_opacity(3.0);
        assert_eq!(layer.opacity(), 1.0);
        layer.set_opacity(f32::NAN);
        assert_eq!(layer.opacity(), 1.0);
    }

    #[test]
    fn test_pixel_edits_keep_the_canvas_size() {
        let mut layer = Layer::new("L", 2, 2).unwrap();
        let foreign = Surface::new(4, 4).unwrap();

        assert!(layer.restore(&foreign.snapshot()).is_err());
        assert!(layer.composite(&foreign, 1.0, BlendMode::Normal).is_err());
        assert!(layer.write_pixels(&[Color32::RED; 16]).is_err());
        assert!(layer.set_pixel(2, 0, Color32::RED).is_err());
        assert_eq!(layer.surface().size(), [2, 2]);
        assert!(layer.surface().is_transparent());

        layer.write_pixels(&[Color32::RED; 4]).unwrap();
        assert_eq!(layer.surface().pixel(1, 1), Some(Color32::RED));
    }
}
