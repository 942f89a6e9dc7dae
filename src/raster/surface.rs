use egui::{Color32, ColorImage, Pos2, Vec2};
use image::{RgbaImage, imageops};
use log::debug;
use tiny_skia::{
    FillRule, FilterQuality, GradientStop, Mask, Path, Pixmap, PixmapPaint, Point, RadialGradient, SpreadMode,
    Stroke, Transform,
};

use super::BlendMode;
use crate::error::SurfaceError;
use crate::geometry::circle_path;

/// Blurred copy of a primitive painted beneath it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowStyle {
    pub color: Color32,
    pub blur: f32,
    pub offset: Vec2,
}

/// Color, opacity and operator a path is painted with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ink {
    /// Premultiplied source color
    pub color: Color32,
    /// Extra opacity multiplied into every pixel (0..=1)
    pub alpha: f32,
    pub blend: BlendMode,
    pub shadow: Option<ShadowStyle>,
}

impl Ink {
    pub fn solid(color: Color32) -> Self {
        Self {
            color,
            alpha: 1.0,
            blend: BlendMode::Normal,
            shadow: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_shadow(mut self, shadow: Option<ShadowStyle>) -> Self {
        self.shadow = shadow;
        self
    }

    fn to_paint(self) -> tiny_skia::Paint<'static> {
        solid_paint(self.color, self.alpha, self.blend)
    }
}

fn skia_color(color: Color32, alpha: f32) -> tiny_skia::Color {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let mut color = tiny_skia::Color::from_rgba8(r, g, b, a);
    color.apply_opacity(alpha);
    color
}

fn solid_paint(color: Color32, alpha: f32, blend: BlendMode) -> tiny_skia::Paint<'static> {
    let mut paint = tiny_skia::Paint {
        blend_mode: blend.to_skia(),
        anti_alias: true,
        ..Default::default()
    };
    paint.set_color(skia_color(color, alpha));
    paint
}

/// Gaussian blur of premultiplied RGBA through `image`
fn blur_pixmap(pixmap: &mut Pixmap, sigma: f32) {
    if sigma < 0.5 {
        return;
    }
    let Some(image) = RgbaImage::from_raw(pixmap.width(), pixmap.height(), pixmap.data().to_vec()) else {
        return;
    };
    let blurred = imageops::blur(&image, sigma);
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(blurred.as_raw().chunks_exact(4)) {
        // rounding may push a channel past its alpha
        let a = src[3];
        dst.copy_from_slice(&[src[0].min(a), src[1].min(a), src[2].min(a), a]);
    }
    debug!("blurred {}x{} pixmap, sigma {sigma}", pixmap.width(), pixmap.height());
}

/// Full copy of a surface's pixels at one instant
#[derive(Clone, PartialEq, Eq)]
pub struct PixelSnapshot {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelSnapshot {
    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    /// Premultiplied RGBA bytes, row major
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for PixelSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelSnapshot")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Premultiplied RGBA pixmap whose dimensions never change after creation
#[derive(Clone, PartialEq)]
pub struct Surface {
    pixmap: Pixmap,
    /// Bumped on every mutation so displays can re-upload lazily
    generation: u64,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.pixmap.width())
            .field("height", &self.pixmap.height())
            .field("generation", &self.generation)
            .finish()
    }
}

impl Surface {
    /// Fully transparent surface
    pub fn new(width: usize, height: usize) -> Result<Self, SurfaceError> {
        let pixmap = u32::try_from(width)
            .ok()
            .zip(u32::try_from(height).ok())
            .and_then(|(w, h)| Pixmap::new(w, h))
            .ok_or(SurfaceError::Allocation { width, height })?;
        Ok(Self { pixmap, generation: 0 })
    }

    pub fn filled(width: usize, height: usize, color: Color32) -> Result<Self, SurfaceError> {
        let mut surface = Self::new(width, height)?;
        surface.fill(color);
        surface.generation = 0;
        Ok(surface)
    }

    pub fn width(&self) -> usize {
        self.pixmap.width() as usize
    }

    pub fn height(&self) -> usize {
        self.pixmap.height() as usize
    }

    pub fn size(&self) -> [usize; 2] {
        [self.width(), self.height()]
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn index(&self, x: i64, y: i64) -> Result<usize, SurfaceError> {
        let (width, height) = (self.width(), self.height());
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            return Err(SurfaceError::OutOfBounds { x, y, width, height });
        }
        Ok(y as usize * width + x as usize)
    }

    pub fn pixel(&self, x: i64, y: i64) -> Option<Color32> {
        let i = self.index(x, y).ok()?;
        let p = self.pixmap.pixels()[i];
        Some(Color32::from_rgba_premultiplied(p.red(), p.green(), p.blue(), p.alpha()))
    }

    pub fn set_pixel(&mut self, x: i64, y: i64, color: Color32) -> Result<(), SurfaceError> {
        let i = self.index(x, y)? * 4;
        self.pixmap.data_mut()[i..i + 4].copy_from_slice(&color.to_array());
        self.touch();
        Ok(())
    }

    /// Premultiplied RGBA bytes, row major
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Bulk copy of every pixel, row major
    pub fn pixels(&self) -> Vec<Color32> {
        self.pixmap
            .data()
            .chunks_exact(4)
            .map(|p| Color32::from_rgba_premultiplied(p[0], p[1], p[2], p[3]))
            .collect()
    }

    /// Bulk write of the whole buffer; the length must match exactly
    pub fn write_pixels(&mut self, pixels: &[Color32]) -> Result<(), SurfaceError> {
        let expected = self.width() * self.height();
        if pixels.len() != expected {
            return Err(SurfaceError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        for (dst, src) in self.pixmap.data_mut().chunks_exact_mut(4).zip(pixels) {
            dst.copy_from_slice(&src.to_array());
        }
        self.touch();
        Ok(())
    }

    pub fn snapshot(&self) -> PixelSnapshot {
        PixelSnapshot {
            width: self.width(),
            height: self.height(),
            data: self.pixmap.data().to_vec(),
        }
    }

    pub fn restore(&mut self, snapshot: &PixelSnapshot) -> Result<(), SurfaceError> {
        if snapshot.size() != self.size() {
            return Err(SurfaceError::SizeMismatch {
                expected: self.width() * self.height(),
                actual: snapshot.width * snapshot.height,
            });
        }
        self.pixmap.data_mut().copy_from_slice(&snapshot.data);
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        self.touch();
    }

    pub fn fill(&mut self, color: Color32) {
        let bytes = color.to_array();
        for p in self.pixmap.data_mut().chunks_exact_mut(4) {
            p.copy_from_slice(&bytes);
        }
        self.touch();
    }

    pub fn is_transparent(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    /// Fill `path` with `ink`, shadow first when one is set. Pixels outside
    /// the surface and outside `clip` are left alone.
    pub fn fill_path(&mut self, path: &Path, ink: &Ink, clip: Option<&Mask>) {
        if let Some(shadow) = ink.shadow {
            self.cast_shadow(path, None, &shadow, ink.alpha, ink.blend);
        }
        self.pixmap
            .fill_path(path, &ink.to_paint(), FillRule::Winding, Transform::identity(), clip);
        self.touch();
    }

    /// Stroke `path` with `ink`, shadow first when one is set
    pub fn stroke_path(&mut self, path: &Path, stroke: &Stroke, ink: &Ink, clip: Option<&Mask>) {
        if let Some(shadow) = ink.shadow {
            self.cast_shadow(path, Some(stroke), &shadow, ink.alpha, ink.blend);
        }
        self.pixmap
            .stroke_path(path, &ink.to_paint(), stroke, Transform::identity(), clip);
        self.touch();
    }

    /// Only the blurred shadow `path` would cast
    pub fn fill_shadow(&mut self, path: &Path, shadow: &ShadowStyle, alpha: f32, blend: BlendMode) {
        self.cast_shadow(path, None, shadow, alpha, blend);
        self.touch();
    }

    /// Render the shadow into a scratch pixmap no larger than the part of
    /// the surface it can reach, blur it there and composite it back
    fn cast_shadow(&mut self, path: &Path, stroke: Option<&Stroke>, shadow: &ShadowStyle, alpha: f32, blend: BlendMode) {
        if alpha <= 0.0 {
            return;
        }
        let sigma = shadow.blur / 2.0;
        let spread = sigma * 3.0 + stroke.map_or(0.0, |s| s.width / 2.0) + 1.0;
        let bounds = path.bounds();
        let left = (bounds.left() + shadow.offset.x - spread).floor().max(0.0);
        let top = (bounds.top() + shadow.offset.y - spread).floor().max(0.0);
        let right = (bounds.right() + shadow.offset.x + spread).ceil().min(self.pixmap.width() as f32);
        let bottom = (bounds.bottom() + shadow.offset.y + spread).ceil().min(self.pixmap.height() as f32);
        if !(right > left && bottom > top) {
            return;
        }
        let Some(mut cast) = Pixmap::new((right - left) as u32, (bottom - top) as u32) else {
            return;
        };
        let paint = solid_paint(shadow.color, 1.0, BlendMode::Normal);
        let transform = Transform::from_translate(shadow.offset.x - left, shadow.offset.y - top);
        match stroke {
            Some(stroke) => cast.stroke_path(path, &paint, stroke, transform, None),
            None => cast.fill_path(path, &paint, FillRule::Winding, transform, None),
        }
        blur_pixmap(&mut cast, sigma);
        let paint = PixmapPaint {
            opacity: alpha,
            blend_mode: blend.to_skia(),
            quality: FilterQuality::Nearest,
        };
        self.pixmap
            .draw_pixmap(left as i32, top as i32, cast.as_ref(), &paint, Transform::identity(), None);
    }

    /// Disc fading from `color` at `center` to transparent at `radius`
    pub fn fill_radial(&mut self, center: Pos2, radius: f32, color: Color32, alpha: f32) {
        let inner = skia_color(color, alpha);
        let mut outer = inner;
        outer.set_alpha(0.0);
        let origin = Point::from_xy(center.x, center.y);
        let Some(shader) = RadialGradient::new(
            origin,
            origin,
            radius,
            vec![GradientStop::new(0.0, inner), GradientStop::new(1.0, outer)],
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };
        let Some(disc) = circle_path(center, radius) else {
            return;
        };
        let paint = tiny_skia::Paint {
            shader,
            anti_alias: true,
            ..Default::default()
        };
        self.pixmap
            .fill_path(&disc, &paint, FillRule::Winding, Transform::identity(), None);
        self.touch();
    }

    /// Draw `image` centered on `center`, rotated by `rotation` radians and
    /// scaled by `scale`, sampling bilinearly.
    pub fn stamp(&mut self, image: &Surface, center: Pos2, rotation: f32, scale: f32, alpha: f32, blend: BlendMode) {
        if scale <= 0.0 || alpha <= 0.0 {
            return;
        }
        let half = Vec2::new(image.width() as f32, image.height() as f32) * 0.5;
        let transform = Transform::from_translate(center.x, center.y)
            .pre_concat(Transform::from_rotate(rotation.to_degrees()))
            .pre_scale(scale, scale)
            .pre_translate(-half.x, -half.y);
        let paint = PixmapPaint {
            opacity: alpha.min(1.0),
            blend_mode: blend.to_skia(),
            quality: FilterQuality::Bilinear,
        };
        self.pixmap
            .draw_pixmap(0, 0, image.pixmap.as_ref(), &paint, transform, None);
        self.touch();
    }

    /// Composite another surface of identical size over this one
    pub fn composite(&mut self, other: &Surface, alpha: f32, blend: BlendMode) -> Result<(), SurfaceError> {
        self.composite_at(other, alpha, blend, 0, 0)
    }

    /// Composite `other` shifted by a whole-pixel offset
    pub fn composite_at(
        &mut self,
        other: &Surface,
        alpha: f32,
        blend: BlendMode,
        dx: i32,
        dy: i32,
    ) -> Result<(), SurfaceError> {
        if other.size() != self.size() {
            return Err(SurfaceError::SizeMismatch {
                expected: self.width() * self.height(),
                actual: other.width() * other.height(),
            });
        }
        if alpha <= 0.0 {
            return Ok(());
        }
        let paint = PixmapPaint {
            opacity: alpha.min(1.0),
            blend_mode: blend.to_skia(),
            quality: FilterQuality::Nearest,
        };
        self.pixmap
            .draw_pixmap(dx, dy, other.pixmap.as_ref(), &paint, Transform::identity(), None);
        self.touch();
        Ok(())
    }

    /// This surface's alpha channel painted in `color`
    pub fn silhouette(&self, color: Color32) -> Result<Surface, SurfaceError> {
        let mut cast = Surface::filled(self.width(), self.height(), color)?;
        let paint = PixmapPaint {
            opacity: 1.0,
            blend_mode: tiny_skia::BlendMode::DestinationIn,
            quality: FilterQuality::Nearest,
        };
        cast.pixmap
            .draw_pixmap(0, 0, self.pixmap.as_ref(), &paint, Transform::identity(), None);
        Ok(cast)
    }

    /// Blur every premultiplied channel in place
    pub fn blur(&mut self, sigma: f32) {
        blur_pixmap(&mut self.pixmap, sigma);
        self.touch();
    }

    /// Copy for display as an egui texture
    pub fn to_color_image(&self) -> ColorImage {
        ColorImage {
            size: self.size(),
            pixels: self.pixels(),
        }
    }

    /// Straight-alpha RGBA bytes, row major
    pub fn to_rgba_unmultiplied(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }
}
