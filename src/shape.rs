//! Recognition of hand-drawn lines, ellipses and rectangles, and the clean
//! outlines that replace them once a stroke snaps.

use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};

use crate::geometry::{calculate_bounds, ellipse_outline, polyline_length};

/// Geometric primitive a stroke can be redrawn as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShapeKind {
    Rect,
    Ellipse,
    Triangle,
    Line,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Rect,
        ShapeKind::Ellipse,
        ShapeKind::Triangle,
        ShapeKind::Line,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Rect => "Rectangle",
            ShapeKind::Ellipse => "Circle",
            ShapeKind::Triangle => "Triangle",
            ShapeKind::Line => "Line",
        }
    }

    /// Outline of this shape spanning the box between `start` and `end`
    pub fn outline(self, start: Pos2, end: Pos2) -> ShapeOutline {
        let rect = Rect::from_two_pos(start, end);
        match self {
            ShapeKind::Rect => ShapeOutline {
                points: vec![
                    rect.left_top(),
                    rect.right_top(),
                    rect.right_bottom(),
                    rect.left_bottom(),
                ],
                closed: true,
            },
            ShapeKind::Triangle => ShapeOutline {
                points: vec![rect.center_top(), rect.right_bottom(), rect.left_bottom()],
                closed: true,
            },
            ShapeKind::Line => ShapeOutline {
                points: vec![start, end],
                closed: false,
            },
            ShapeKind::Ellipse => ShapeOutline {
                points: ellipse_outline(rect.center(), rect.width() / 2.0, rect.height() / 2.0, 2.0),
                closed: true,
            },
        }
    }
}

/// Polyline describing a shape's perimeter
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeOutline {
    pub points: Vec<Pos2>,
    pub closed: bool,
}

impl ShapeOutline {
    /// Consecutive edges, including the closing edge of closed outlines
    pub fn edges(&self) -> Vec<(Pos2, Pos2)> {
        let mut edges: Vec<_> = self.points.windows(2).map(|w| (w[0], w[1])).collect();
        if self.closed && self.points.len() > 2 {
            if let (Some(last), Some(first)) = (self.points.last(), self.points.first()) {
                edges.push((*last, *first));
            }
        }
        edges
    }
}

/// Tunable thresholds of the recognizer and the hold timer that arms it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeRecognizerConfig {
    /// Fewer captured points than this never classify
    pub min_points: usize,
    /// A path is closed when its end gap is below this share of its length
    pub closed_gap_ratio: f32,
    /// An open path is a line when gap / length exceeds this
    pub line_ratio: f32,
    /// Maximum mean deviation from the inscribed ellipse
    pub ellipse_tolerance: f32,
    /// Corner visit radius as a share of the shorter box side
    pub corner_tolerance: f32,
    /// Corners that must be visited for a rectangle
    pub min_corners: usize,
    /// Pointer hold time before recognition runs
    pub hold_delay_secs: f64,
    /// Movement beyond this distance rearms the hold timer
    pub rearm_distance: f32,
}

impl Default for ShapeRecognizerConfig {
    fn default() -> Self {
        Self {
            min_points: 15,
            closed_gap_ratio: 0.25,
            line_ratio: 0.85,
            ellipse_tolerance: 0.25,
            corner_tolerance: 0.25,
            min_corners: 3,
            hold_delay_secs: 0.8,
            rearm_distance: 5.0,
        }
    }
}

/// Classify a captured freehand path. Pure: equal input, equal output.
pub fn recognize(points: &[Pos2], config: &ShapeRecognizerConfig) -> Option<ShapeKind> {
    if points.len() < config.min_points.max(2) {
        return None;
    }
    let (first, last) = (points[0], points[points.len() - 1]);
    let total_length = polyline_length(points);
    if !total_length.is_finite() || total_length <= f32::EPSILON {
        return None;
    }
    let gap = first.distance(last);

    let is_closed = gap < total_length * config.closed_gap_ratio;
    if !is_closed {
        return (gap / total_length > config.line_ratio).then_some(ShapeKind::Line);
    }

    let bounds = calculate_bounds(points)?;
    if ellipse_deviation(points, bounds).is_some_and(|d| d < config.ellipse_tolerance) {
        return Some(ShapeKind::Ellipse);
    }

    let threshold = bounds.width().min(bounds.height()) * config.corner_tolerance;
    let corners = [
        bounds.left_top(),
        bounds.right_top(),
        bounds.right_bottom(),
        bounds.left_bottom(),
    ];
    let visited = corners
        .iter()
        .filter(|corner| points.iter().any(|p| p.distance(**corner) < threshold))
        .count();
    (visited >= config.min_corners).then_some(ShapeKind::Rect)
}

/// Mean of `|1 - ((x-cx)²/rx² + (y-cy)²/ry²)|` against the ellipse inscribed
/// in `bounds`; `None` when the box is degenerate
fn ellipse_deviation(points: &[Pos2], bounds: Rect) -> Option<f32> {
    let rx = bounds.width() / 2.0;
    let ry = bounds.height() / 2.0;
    if rx <= f32::EPSILON || ry <= f32::EPSILON {
        return None;
    }
    let c = bounds.center();
    let sum: f32 = points
        .iter()
        .map(|p| {
            let v = (p.x - c.x).powi(2) / (rx * rx) + (p.y - c.y).powi(2) / (ry * ry);
            (1.0 - v).abs()
        })
        .sum();
    Some(sum / points.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ellipse(n: usize, rx: f32, ry: f32) -> Vec<Pos2> {
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32 * std::f32::consts::TAU;
                Pos2::new(300.0 + rx * t.cos(), 300.0 + ry * t.sin())
            })
            .collect()
    }

    #[test]
    fn too_few_points_never_classify() {
        let pts = ellipse(10, 100.0, 60.0);
        assert_eq!(recognize(&pts, &ShapeRecognizerConfig::default()), None);
    }

    #[test]
    fn stationary_pointer_is_unclassified() {
        let pts = vec![Pos2::new(5.0, 5.0); 30];
        assert_eq!(recognize(&pts, &ShapeRecognizerConfig::default()), None);
    }

    #[test]
    fn open_corner_path_is_unclassified() {
        let mut pts: Vec<Pos2> = (0..10).map(|i| Pos2::new(i as f32 * 10.0, 0.0)).collect();
        pts.extend((0..=10).map(|i| Pos2::new(100.0, i as f32 * 10.0)));
        assert_eq!(recognize(&pts, &ShapeRecognizerConfig::default()), None);
    }

    #[test]
    fn flat_closed_loop_skips_the_ellipse_test() {
        let mut pts: Vec<Pos2> = (0..20).map(|i| Pos2::new(i as f32, 10.0)).collect();
        pts.extend((0..20).rev().map(|i| Pos2::new(i as f32, 10.0)));
        assert_eq!(recognize(&pts, &ShapeRecognizerConfig::default()), None);
    }

    #[test]
    fn thresholds_are_configurable() {
        let pts = ellipse(60, 100.0, 60.0);
        let strict = ShapeRecognizerConfig {
            ellipse_tolerance: 0.0,
            ..Default::default()
        };
        assert_ne!(recognize(&pts, &strict), Some(ShapeKind::Ellipse));
    }

    #[test]
    fn outlines_span_the_drag_box() {
        let outline = ShapeKind::Triangle.outline(Pos2::new(10.0, 10.0), Pos2::new(30.0, 50.0));
        assert_eq!(outline.points[0], Pos2::new(20.0, 10.0));
        assert_eq!(outline.edges().len(), 3);

        let line = ShapeKind::Line.outline(Pos2::new(0.0, 0.0), Pos2::new(5.0, 5.0));
        assert!(!line.closed);
        assert_eq!(line.edges().len(), 1);
    }
}
