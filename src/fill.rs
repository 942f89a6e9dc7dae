//! Exact-match flood fill.
//!
//! Only pixels whose premultiplied RGBA equals the seed pixel exactly are
//! replaced; anti-aliased edges and translucent neighbours stop the fill.

use egui::{Color32, Pos2};
use log::{debug, error};

use crate::raster::Surface;

/// What a fill did to the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// This many pixels were recolored
    Filled(usize),
    /// The seed already had the fill color
    AlreadyFilled,
    /// The seed lies outside the surface
    OutOfBounds,
    /// The pixel buffer could not be written back
    Failed,
}

impl FillOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, FillOutcome::Filled(n) if *n > 0)
    }
}

/// 4-connected fill from `seed` with the opaque version of `color`
pub fn flood_fill(surface: &mut Surface, seed: Pos2, color: Color32) -> FillOutcome {
    let (w, h) = (surface.width(), surface.height());
    let (sx, sy) = (seed.x.floor(), seed.y.floor());
    if !sx.is_finite() || !sy.is_finite() || sx < 0.0 || sy < 0.0 || sx >= w as f32 || sy >= h as f32 {
        debug!("fill seed {seed:?} outside {w}x{h} surface");
        return FillOutcome::OutOfBounds;
    }
    let (sx, sy) = (sx as usize, sy as usize);

    let mut data = surface.pixels();

    let [r, g, b, _] = color.to_srgba_unmultiplied();
    let fill = Color32::from_rgb(r, g, b);
    let target = data[sy * w + sx];
    if target == fill {
        return FillOutcome::AlreadyFilled;
    }

    let mut filled = 0;
    let mut stack = vec![(sx, sy)];
    while let Some((x, y)) = stack.pop() {
        let idx = y * w + x;
        if data[idx] != target {
            continue;
        }
        data[idx] = fill;
        filled += 1;

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < w {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < h {
            stack.push((x, y + 1));
        }
    }

    if let Err(err) = surface.write_pixels(&data) {
        error!("flood fill aborted, cannot write pixels: {err}");
        return FillOutcome::Failed;
    }
    debug!("flood fill recolored {filled} pixels from ({sx}, {sy})");
    FillOutcome::Filled(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed_surface() -> Surface {
        // 10x10 white with a black 1px ring from (2,2) to (7,7)
        let mut s = Surface::filled(10, 10, Color32::WHITE).unwrap();
        for i in 2..=7 {
            for (x, y) in [(i, 2), (i, 7), (2, i), (7, i)] {
                s.set_pixel(x, y, Color32::BLACK).unwrap();
            }
        }
        s
    }

    #[test]
    fn fill_stays_inside_the_ring() {
        let mut s = boxed_surface();
        let outcome = flood_fill(&mut s, Pos2::new(4.5, 4.5), Color32::RED);
        assert_eq!(outcome, FillOutcome::Filled(16));
        assert_eq!(s.pixel(4, 4), Some(Color32::RED));
        assert_eq!(s.pixel(2, 2), Some(Color32::BLACK));
        assert_eq!(s.pixel(0, 0), Some(Color32::WHITE));
    }

    #[test]
    fn same_color_is_a_no_op() {
        let mut s = boxed_surface();
        let generation = s.generation();
        let outcome = flood_fill(&mut s, Pos2::new(0.0, 0.0), Color32::WHITE);
        assert_eq!(outcome, FillOutcome::AlreadyFilled);
        assert_eq!(s.generation(), generation);
    }

    #[test]
    fn fill_color_is_forced_opaque() {
        let mut s = Surface::new(3, 3).unwrap();
        flood_fill(&mut s, Pos2::new(1.0, 1.0), Color32::from_rgba_unmultiplied(255, 0, 0, 128));
        assert_eq!(s.pixel(0, 0), Some(Color32::from_rgb(255, 0, 0)));
    }

    #[test]
    fn translucent_neighbours_block_the_fill() {
        let mut s = Surface::filled(5, 1, Color32::WHITE).unwrap();
        s.set_pixel(2, 0, Color32::from_rgba_premultiplied(250, 250, 250, 254)).unwrap();
        flood_fill(&mut s, Pos2::new(0.0, 0.0), Color32::BLUE);
        assert_eq!(s.pixel(1, 0), Some(Color32::BLUE));
        assert_eq!(s.pixel(3, 0), Some(Color32::WHITE));
    }

    #[test]
    fn seed_outside_surface_is_ignored() {
        let mut s = Surface::new(3, 3).unwrap();
        assert_eq!(flood_fill(&mut s, Pos2::new(-1.0, 1.0), Color32::RED), FillOutcome::OutOfBounds);
        assert_eq!(flood_fill(&mut s, Pos2::new(3.0, 1.0), Color32::RED), FillOutcome::OutOfBounds);
    }
}
