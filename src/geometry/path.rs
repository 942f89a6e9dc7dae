use egui::{Pos2, Rect};
use tiny_skia::{Path, PathBuilder};

/// Bounding box of a set of points, `None` for an empty set
pub fn calculate_bounds(points: &[Pos2]) -> Option<Rect> {
    let first = *points.first()?;
    let mut min = first;
    let mut max = first;
    for point in points {
        min = min.min(*point);
        max = max.max(*point);
    }
    Some(Rect::from_min_max(min, max))
}

/// Sum of consecutive segment lengths
pub fn polyline_length(points: &[Pos2]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Closed ellipse outline sampled at roughly `spacing` pixel intervals
pub fn ellipse_outline(center: Pos2, rx: f32, ry: f32, spacing: f32) -> Vec<Pos2> {
    let circumference = std::f32::consts::TAU * ((rx * rx + ry * ry) / 2.0).sqrt();
    let steps = ((circumference / spacing.max(0.5)).ceil() as usize).clamp(8, 2048);
    (0..steps)
        .map(|i| {
            let theta = i as f32 / steps as f32 * std::f32::consts::TAU;
            Pos2::new(center.x + rx * theta.cos(), center.y + ry * theta.sin())
        })
        .collect()
}

/// Points every `step` pixels from `a` towards `b`, starting at `a` and
/// stopping before `b`
pub fn points_along(a: Pos2, b: Pos2, step: f32) -> Vec<Pos2> {
    let dist = a.distance(b);
    if dist <= 0.0 || step <= 0.0 {
        return Vec::new();
    }
    let dir = (b - a) / dist;
    let mut out = Vec::with_capacity((dist / step).ceil() as usize);
    let mut travelled = 0.0;
    while travelled < dist {
        out.push(a + dir * travelled);
        travelled += step;
    }
    out
}

/// Polyline through `points`, closed back to the first point when
/// `closed`. `None` for fewer than two points.
pub fn polyline_path(points: &[Pos2], closed: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

/// Quadratic curve from `start` to `end` bending towards `control`
pub fn quad_path(start: Pos2, control: Pos2, end: Pos2) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(start.x, start.y);
    pb.quad_to(control.x, control.y, end.x, end.y);
    pb.finish()
}

pub fn circle_path(center: Pos2, radius: f32) -> Option<Path> {
    PathBuilder::from_circle(center.x, center.y, radius)
}

pub fn rect_path(min: Pos2, max: Pos2) -> Option<Path> {
    tiny_skia::Rect::from_ltrb(min.x, min.y, max.x, max.y).map(PathBuilder::from_rect)
}
