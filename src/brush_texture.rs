//! Procedural brush tips.
//!
//! Every textured tool draws by repeating a small pre-rendered "stamp" along
//! the stroke. Stamps have the paint color baked in, so the cache is rebuilt
//! whenever the active color changes.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_4, TAU};

use egui::{Color32, Pos2, Vec2};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, LineCap, Mask, PathBuilder, Stroke, Transform};

use crate::error::SurfaceError;
use crate::geometry::{circle_path, polyline_path, rect_path};
use crate::raster::{Ink, Surface};
use crate::tool::{Archetype, ToolCatalog, ToolId};

/// Edge length of every generated stamp, in pixels
pub const STAMP_SIZE: usize = 50;

/// Stamp algorithm of a textured tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushTip {
    Crayon,
    Charcoal,
    Pastel,
    Spray,
    Skin,
    Watercolor,
    Airbrush,
    Oil,
    Acrylic,
    Calligraphy,
    Fur,
    Hatch,
    #[serde(rename = "crosshatch")]
    CrossHatch,
}

impl BrushTip {
    /// Hatching must keep its line direction, so it is never rotated
    pub fn rotates(self) -> bool {
        !matches!(self, BrushTip::Hatch | BrushTip::CrossHatch)
    }
}

/// One pre-rendered dab
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    tip: BrushTip,
    image: Surface,
}

impl Stamp {
    pub fn tip(&self) -> BrushTip {
        self.tip
    }

    pub fn image(&self) -> &Surface {
        &self.image
    }
}

/// Render the stamp for `tip` in `color`
pub fn generate_stamp<R: Rng + ?Sized>(tip: BrushTip, color: Color32, rng: &mut R) -> Result<Stamp, SurfaceError> {
    let mut image = Surface::new(STAMP_SIZE, STAMP_SIZE)?;
    let center = Pos2::new(STAMP_SIZE as f32 / 2.0, STAMP_SIZE as f32 / 2.0);
    let radius = STAMP_SIZE as f32 / 2.0;

    match tip {
        BrushTip::Crayon => grains(&mut image, rng, color, center, radius, 90, Grain::Square(2.0), 0.4..1.0),
        BrushTip::Charcoal => grains(&mut image, rng, color, center, radius, 140, Grain::Dot(1.2), 0.2..0.9),
        BrushTip::Pastel => grains(&mut image, rng, color, center, radius, 110, Grain::Square(2.5), 0.3..0.8),
        BrushTip::Spray => grains(&mut image, rng, color, center, radius, 300, Grain::Square(1.0), 0.5..1.0),
        BrushTip::Skin => grains(&mut image, rng, color, center, radius, 400, Grain::Dot(0.6), 0.1..0.4),
        BrushTip::Watercolor => image.fill_radial(center, radius, color, 0.3),
        BrushTip::Airbrush => {
            image.fill_radial(center, radius * 0.8, color, 0.5);
            image.blur(3.0);
        }
        BrushTip::Oil => bristles(&mut image, rng, color, center, radius, 40),
        BrushTip::Acrylic => bristles(&mut image, rng, color, center, radius, 60),
        BrushTip::Calligraphy => {
            let along = Vec2::angled(FRAC_PI_4) * radius * 0.8;
            let across = Vec2::angled(FRAC_PI_4 + TAU / 4.0) * 3.0;
            let corners = [
                center - along - across,
                center + along - across,
                center + along + across,
                center - along + across,
            ];
            if let Some(nib) = polyline_path(&corners, true) {
                image.fill_path(&nib, &Ink::solid(color), None);
            }
        }
        BrushTip::Fur => {
            let stroke = Stroke {
                width: 1.0,
                line_cap: LineCap::Round,
                ..Stroke::default()
            };
            for _ in 0..60 {
                let angle = rng.gen_range(0.0..TAU);
                let length = rng.gen_range(radius * 0.3..radius);
                let end = center + Vec2::angled(angle) * length;
                let alpha = rng.gen_range(0.4..0.9);
                if let Some(hair) = polyline_path(&[center, end], false) {
                    image.stroke_path(&hair, &stroke, &Ink::solid(color).with_alpha(alpha), None);
                }
            }
        }
        BrushTip::Hatch => hatch(&mut image, color, center, radius, false),
        BrushTip::CrossHatch => hatch(&mut image, color, center, radius, true),
    }

    Ok(Stamp { tip, image })
}

#[derive(Clone, Copy)]
enum Grain {
    Dot(f32),
    Square(f32),
}

/// Random grains scattered uniformly over the tip disc
#[allow(clippy::too_many_arguments)]
fn grains<R: Rng + ?Sized>(
    image: &mut Surface,
    rng: &mut R,
    color: Color32,
    center: Pos2,
    radius: f32,
    count: usize,
    grain: Grain,
    alpha: std::ops::Range<f32>,
) {
    for _ in 0..count {
        let angle = rng.gen_range(0.0..TAU);
        let distance = radius * rng.gen_range(0.0f32..1.0).sqrt() * 0.9;
        let p = center + Vec2::angled(angle) * distance;
        let path = match grain {
            Grain::Dot(r) => circle_path(p, r),
            Grain::Square(side) => rect_path(p - Vec2::splat(side / 2.0), p + Vec2::splat(side / 2.0)),
        };
        let a = rng.gen_range(alpha.clone());
        if let Some(path) = path {
            image.fill_path(&path, &Ink::solid(color).with_alpha(a), None);
        }
    }
}

/// Coverage of the tip disc, used to keep marks inside the round stamp
fn disc_clip(center: Pos2, radius: f32) -> Option<Mask> {
    let mut mask = Mask::new(STAMP_SIZE as u32, STAMP_SIZE as u32)?;
    mask.fill_path(&circle_path(center, radius)?, FillRule::Winding, true, Transform::identity());
    Some(mask)
}

/// Thin vertical hair marks clipped to the tip disc
fn bristles<R: Rng + ?Sized>(image: &mut Surface, rng: &mut R, color: Color32, center: Pos2, radius: f32, count: usize) {
    let clip = disc_clip(center, radius);
    for _ in 0..count {
        let x = rng.gen_range(center.x - radius..center.x + radius);
        let width = rng.gen_range(1.0..3.0);
        let half_height = rng.gen_range(radius * 0.4..radius);
        let y = center.y + rng.gen_range(-radius * 0.2..radius * 0.2);
        let alpha = rng.gen_range(0.3..1.0);
        if let Some(bristle) = rect_path(Pos2::new(x, y - half_height), Pos2::new(x + width, y + half_height)) {
            image.fill_path(&bristle, &Ink::solid(color).with_alpha(alpha), clip.as_ref());
        }
    }
}

/// Diagonal lines every 6 px, plus the perpendicular set for crosshatching.
/// All lines go into one path so crossings are not painted twice.
fn hatch(image: &mut Surface, color: Color32, center: Pos2, radius: f32, cross: bool) {
    const SPACING: f32 = 6.0;
    let mut directions = vec![Vec2::angled(FRAC_PI_4)];
    if cross {
        directions.push(Vec2::angled(-FRAC_PI_4));
    }
    let mut pb = PathBuilder::new();
    for dir in directions {
        let normal = dir.rot90();
        let mut offset = -radius;
        while offset <= radius {
            let mid = center + normal * offset;
            let (a, b) = (mid - dir * radius * 1.5, mid + dir * radius * 1.5);
            pb.move_to(a.x, a.y);
            pb.line_to(b.x, b.y);
            offset += SPACING;
        }
    }
    let Some(lines) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width: 1.5,
        line_cap: LineCap::Butt,
        ..Stroke::default()
    };
    image.stroke_path(&lines, &stroke, &Ink::solid(color), disc_clip(center, radius).as_ref());
}

/// Stamps of every textured tool for the current color
#[derive(Debug, Default)]
pub struct StampCache {
    stamps: HashMap<ToolId, Stamp>,
    color: Option<Color32>,
}

impl StampCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every stamp in `color`
    pub fn regenerate<R: Rng + ?Sized>(&mut self, catalog: &ToolCatalog, color: Color32, rng: &mut R) {
        self.stamps.clear();
        for tool in catalog.iter() {
            if let Archetype::Texture { tip, .. } = tool.archetype {
                match generate_stamp(tip, color, rng) {
                    Ok(stamp) => {
                        self.stamps.insert(tool.id, stamp);
                    }
                    Err(err) => warn!("no stamp for {}: {err}", tool.id),
                }
            }
        }
        self.color = Some(color);
        debug!("regenerated {} brush stamps", self.stamps.len());
    }

    pub fn get(&self, id: ToolId) -> Option<&Stamp> {
        self.stamps.get(&id)
    }

    pub fn remove(&mut self, id: ToolId) -> Option<Stamp> {
        self.stamps.remove(&id)
    }

    /// Color the stamps were last generated in
    pub fn color(&self) -> Option<Color32> {
        self.color
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const ALL_TIPS: [BrushTip; 13] = [
        BrushTip::Crayon,
        BrushTip::Charcoal,
        BrushTip::Pastel,
        BrushTip::Spray,
        BrushTip::Skin,
        BrushTip::Watercolor,
        BrushTip::Airbrush,
        BrushTip::Oil,
        BrushTip::Acrylic,
        BrushTip::Calligraphy,
        BrushTip::Fur,
        BrushTip::Hatch,
        BrushTip::CrossHatch,
    ];

    #[test]
    fn every_tip_leaves_a_mark_inside_the_stamp() {
        let mut rng = StdRng::seed_from_u64(1);
        for tip in ALL_TIPS {
            let stamp = generate_stamp(tip, Color32::RED, &mut rng).unwrap();
            assert_eq!(stamp.image().size(), [STAMP_SIZE, STAMP_SIZE]);
            assert!(!stamp.image().is_transparent(), "{tip:?} stamp is empty");
        }
    }

    #[test]
    fn color_is_baked_into_the_stamp() {
        let mut rng = StdRng::seed_from_u64(2);
        let stamp = generate_stamp(BrushTip::Calligraphy, Color32::BLUE, &mut rng).unwrap();
        let center = stamp.image().pixel(25, 25).unwrap();
        assert_eq!(center, Color32::BLUE);
    }

    #[test]
    fn same_seed_gives_same_stamp() {
        let a = generate_stamp(BrushTip::Fur, Color32::BLACK, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = generate_stamp(BrushTip::Fur, Color32::BLACK, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bristles_stay_inside_the_tip_disc() {
        let mut rng = StdRng::seed_from_u64(6);
        let stamp = generate_stamp(BrushTip::Acrylic, Color32::BLACK, &mut rng).unwrap();
        for (x, y) in [(0, 0), (49, 0), (0, 49), (49, 49)] {
            assert_eq!(stamp.image().pixel(x, y), Some(Color32::TRANSPARENT));
        }
    }

    #[test]
    fn hatch_tips_never_rotate() {
        assert!(!BrushTip::Hatch.rotates());
        assert!(!BrushTip::CrossHatch.rotates());
        assert!(BrushTip::Oil.rotates());
    }

    #[test]
    fn cache_holds_one_stamp_per_textured_tool() {
        let catalog = ToolCatalog::builtin();
        let mut cache = StampCache::new();
        cache.regenerate(&catalog, Color32::GREEN, &mut StdRng::seed_from_u64(3));
        assert_eq!(cache.len(), 13);
        assert!(cache.get(ToolId::SPRAY).is_some());
        assert!(cache.get(ToolId::PENCIL).is_none());
        assert_eq!(cache.color(), Some(Color32::GREEN));
    }
}
