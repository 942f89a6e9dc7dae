//! Stroke rendering: turns pointer segments into pixels on a surface.
//!
//! Vector tools stroke a smoothed path once. Textured tools repeat their
//! cached stamp along the segment. Which surface receives the pixels, and therefore which paint is
//! used, is decided by the caller through [`RenderTarget`].

use std::f32::consts::TAU;

use egui::{Color32, Pos2, Vec2};
use log::debug;
use rand::Rng;

use crate::brush_texture::{STAMP_SIZE, StampCache};
use tiny_skia::{LineJoin, Path, Stroke};

use crate::geometry::{circle_path, points_along, polyline_path, quad_path};
use crate::raster::{BlendMode, Ink, LineCap, ShadowStyle, Surface};
use crate::shape::ShapeKind;
use crate::tool::{Archetype, ToolDefinition};

/// Pressure assumed when the input device reports none
pub const DEFAULT_PRESSURE: f32 = 0.5;

/// Where rendered pixels land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The transient overlay: full opacity, plain source-over, tool alpha and
    /// composite applied once at commit
    Overlay,
    /// The active layer itself, with the tool alpha and composite operator
    Direct,
}

/// Draws one tool in one color onto whichever surface it is handed
pub struct StrokeRenderer<'a> {
    tool: &'a ToolDefinition,
    color: Color32,
    target: RenderTarget,
    stamps: &'a StampCache,
}

impl<'a> StrokeRenderer<'a> {
    pub fn new(tool: &'a ToolDefinition, color: Color32, target: RenderTarget, stamps: &'a StampCache) -> Self {
        Self {
            tool,
            color,
            target,
            stamps,
        }
    }

    pub fn target(&self) -> RenderTarget {
        self.target
    }

    /// Ink for vector primitives on the current target
    pub fn ink(&self) -> Ink {
        let ink = Ink::solid(self.color).with_shadow(self.shadow());
        match self.target {
            RenderTarget::Overlay => ink,
            RenderTarget::Direct => ink
                .with_alpha(self.tool.settings.alpha)
                .with_blend(self.tool.settings.composite),
        }
    }

    fn stroke_with(&self, surface: &mut Surface, path: Option<Path>, width: f32, cap: LineCap) {
        let Some(path) = path else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: cap.to_skia(),
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        surface.stroke_path(&path, &stroke, &self.ink(), None);
    }

    fn shadow(&self) -> Option<ShadowStyle> {
        let settings = &self.tool.settings;
        (settings.shadow && settings.shadow_blur > 0.0).then_some(ShadowStyle {
            color: self.color,
            blur: settings.shadow_blur,
            offset: Vec2::ZERO,
        })
    }

    /// Vector line width at `pressure`
    pub fn width(&self, pressure: f32) -> f32 {
        let settings = &self.tool.settings;
        if settings.pressure {
            (settings.size * pressure * 2.0).max(1.0)
        } else {
            settings.size
        }
    }

    /// Opacity of each stamp at `pressure`
    pub fn stamp_alpha(&self, pressure: f32) -> f32 {
        match self.target {
            RenderTarget::Overlay => 1.0,
            RenderTarget::Direct if self.tool.settings.pressure => {
                (self.tool.settings.alpha * pressure * 1.5).min(1.0)
            }
            RenderTarget::Direct => self.tool.settings.alpha,
        }
    }

    fn stamp_blend(&self) -> BlendMode {
        match self.target {
            RenderTarget::Overlay => BlendMode::Normal,
            RenderTarget::Direct => self.tool.settings.composite,
        }
    }

    /// Smoothed freehand segment from the previous midpoint to the new one,
    /// bending through the previous raw point
    pub fn segment<R: Rng + ?Sized>(
        &self,
        surface: &mut Surface,
        from_mid: Pos2,
        control: Pos2,
        to_mid: Pos2,
        pressure: f32,
        rng: &mut R,
    ) {
        match self.tool.archetype {
            Archetype::Vector { line_cap } => {
                let path = quad_path(from_mid, control, to_mid);
                self.stroke_with(surface, path, self.width(pressure), line_cap);
            }
            Archetype::Texture { .. } => self.stamp_line(surface, from_mid, to_mid, pressure, rng),
            Archetype::Physics { .. } | Archetype::Utility { .. } => {}
        }
    }

    /// Straight segment, used to finish a stroke at the last raw point
    pub fn line<R: Rng + ?Sized>(&self, surface: &mut Surface, from: Pos2, to: Pos2, pressure: f32, rng: &mut R) {
        match self.tool.archetype {
            Archetype::Vector { line_cap } => {
                let path = polyline_path(&[from, to], false);
                self.stroke_with(surface, path, self.width(pressure), line_cap);
            }
            Archetype::Texture { .. } => self.stamp_line(surface, from, to, pressure, rng),
            Archetype::Physics { .. } | Archetype::Utility { .. } => {}
        }
    }

    /// Single dab for a tap without movement
    pub fn dot<R: Rng + ?Sized>(&self, surface: &mut Surface, at: Pos2, rng: &mut R) {
        match self.tool.archetype {
            Archetype::Vector { .. } => {
                if let Some(disc) = circle_path(at, self.tool.settings.size / 2.0) {
                    surface.fill_path(&disc, &self.ink(), None);
                }
            }
            Archetype::Texture { .. } => self.stamp_at(surface, at, DEFAULT_PRESSURE, rng),
            Archetype::Physics { .. } | Archetype::Utility { .. } => {}
        }
    }

    /// Outline of `kind` spanning `start`..`end` in this tool's style
    pub fn shape<R: Rng + ?Sized>(&self, surface: &mut Surface, kind: ShapeKind, start: Pos2, end: Pos2, rng: &mut R) {
        let outline = kind.outline(start, end);
        match self.tool.archetype {
            Archetype::Texture { .. } if kind == ShapeKind::Ellipse => {
                for p in &outline.points {
                    self.stamp_at(surface, *p, DEFAULT_PRESSURE, rng);
                }
            }
            Archetype::Texture { .. } => {
                for (a, b) in outline.edges() {
                    self.stamp_line(surface, a, b, DEFAULT_PRESSURE, rng);
                }
            }
            _ => {
                let cap = match kind {
                    ShapeKind::Line => self.tool.line_cap(),
                    _ => LineCap::Round,
                };
                let path = polyline_path(&outline.points, outline.closed);
                self.stroke_with(surface, path, self.tool.settings.size, cap);
            }
        }
    }

    fn stamp_line<R: Rng + ?Sized>(&self, surface: &mut Surface, from: Pos2, to: Pos2, pressure: f32, rng: &mut R) {
        let Archetype::Texture { density, .. } = self.tool.archetype else {
            return;
        };
        let step = (self.tool.settings.size * density).max(1.0);
        for p in points_along(from, to, step) {
            self.stamp_at(surface, p, pressure, rng);
        }
    }

    fn stamp_at<R: Rng + ?Sized>(&self, surface: &mut Surface, at: Pos2, pressure: f32, rng: &mut R) {
        let Archetype::Texture { tip, scatter, .. } = self.tool.archetype else {
            return;
        };
        let Some(stamp) = self.stamps.get(self.tool.id) else {
            debug!("no stamp cached for {}, skipping", self.tool.id);
            return;
        };
        let rotation = if tip.rotates() { rng.gen_range(0.0..TAU) } else { 0.0 };
        let jitter = if scatter > 0.0 {
            let half = scatter / 2.0;
            Vec2::new(rng.gen_range(-half..=half), rng.gen_range(-half..=half))
        } else {
            Vec2::ZERO
        };
        let center = at + jitter;
        let scale = self.tool.settings.size / STAMP_SIZE as f32;
        let alpha = self.stamp_alpha(pressure);

        if let Some(shadow) = self.shadow() {
            if let Some(footprint) = circle_path(center, self.tool.settings.size / 2.0) {
                surface.fill_shadow(&footprint, &shadow, alpha * 0.5, self.stamp_blend());
            }
        }
        surface.stamp(stamp.image(), center, rotation, scale, alpha, self.stamp_blend());
    }
}

/// One-pixel-class line used by particle trails
pub fn trail(surface: &mut Surface, from: Pos2, to: Pos2, width: f32, color: Color32, alpha: f32) {
    let Some(path) = polyline_path(&[from, to], false) else {
        return;
    };
    let stroke = Stroke {
        width: width.max(0.5),
        line_cap: tiny_skia::LineCap::Round,
        ..Stroke::default()
    };
    surface.stroke_path(&path, &stroke, &Ink::solid(color).with_alpha(alpha), None);
}
