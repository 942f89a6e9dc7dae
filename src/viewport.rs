//! Mapping between screen space and canvas space: fit-to-screen, wheel
//! zoom and two-finger pinch.

use egui::{Pos2, Vec2};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::util::timer::Deadline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Share of the viewport the fitted canvas occupies
    pub fit_margin: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Wheel delta multiplier: `scale *= 1 - delta * wheel_factor`
    pub wheel_factor: f32,
    /// Delay of the follow-up fit after a resize, absorbing layout settling
    pub refit_delay_secs: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            fit_margin: 0.9,
            min_scale: 0.05,
            max_scale: 40.0,
            wheel_factor: 0.001,
            refit_delay_secs: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PinchStart {
    distance: f32,
    scale: f32,
    translate: Vec2,
    center: Pos2,
}

/// Affine canvas placement: `screen = canvas * scale + translate`
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportTransform {
    translate: Vec2,
    scale: f32,
    canvas_size: Vec2,
    viewport_size: Vec2,
    config: ViewportConfig,
    pinch: Option<PinchStart>,
    pending_refit: Option<Deadline>,
}

impl ViewportTransform {
    pub fn new(canvas_size: Vec2, config: ViewportConfig) -> Self {
        Self {
            translate: Vec2::new(100.0, 100.0),
            scale: 0.25,
            canvas_size,
            viewport_size: Vec2::ZERO,
            config,
            pinch: None,
            pending_refit: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Scale and center the canvas inside `viewport`; zero-sized viewports
    /// are skipped
    pub fn fit_to_screen(&mut self, viewport: Vec2) -> bool {
        if viewport.x <= 0.0 || viewport.y <= 0.0 || !viewport.is_finite() {
            debug!("skipping fit for degenerate viewport {viewport:?}");
            return false;
        }
        self.viewport_size = viewport;
        let scale = (viewport.x / self.canvas_size.x).min(viewport.y / self.canvas_size.y)
            * self.config.fit_margin;
        self.scale = scale.clamp(self.config.min_scale, self.config.max_scale);
        self.translate = (viewport - self.canvas_size * self.scale) / 2.0;
        true
    }

    /// React to a resize notification: fit now and once more after the
    /// configured delay
    pub fn notify_resize(&mut self, viewport: Vec2, now: f64) {
        if viewport == self.viewport_size && self.pending_refit.is_none() {
            return;
        }
        if self.fit_to_screen(viewport) {
            self.pending_refit = Some(Deadline::after(now, self.config.refit_delay_secs));
        }
    }

    /// Run the delayed refit if it is due. Returns true when it ran.
    pub fn poll(&mut self, now: f64) -> bool {
        match self.pending_refit {
            Some(deadline) if deadline.is_due(now) => {
                self.pending_refit = None;
                let viewport = self.viewport_size;
                self.fit_to_screen(viewport)
            }
            _ => false,
        }
    }

    pub fn has_pending_refit(&self) -> bool {
        self.pending_refit.is_some()
    }

    /// When the delayed refit is due, if one is scheduled
    pub fn next_refit(&self) -> Option<f64> {
        self.pending_refit.map(|d| d.due())
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        if !scale.is_finite() {
            return self.scale;
        }
        scale.clamp(self.config.min_scale, self.config.max_scale)
    }

    /// Wheel zoom around the canvas origin
    pub fn zoom_wheel(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.scale = self.clamp_scale(self.scale * (1.0 - delta * self.config.wheel_factor));
    }

    /// Start a two-finger gesture with contact points `a` and `b`
    pub fn begin_pinch(&mut self, a: Pos2, b: Pos2) {
        self.pinch = Some(PinchStart {
            distance: a.distance(b),
            scale: self.scale,
            translate: self.translate,
            center: midpoint(a, b),
        });
    }

    /// Rescale by the distance ratio and keep the content under the starting
    /// midpoint beneath the current midpoint
    pub fn update_pinch(&mut self, a: Pos2, b: Pos2) {
        let Some(start) = self.pinch else {
            return;
        };
        if start.distance <= f32::EPSILON || start.scale <= 0.0 {
            return;
        }
        let scale = self.clamp_scale(start.scale * (a.distance(b) / start.distance));
        let content = (start.center.to_vec2() - start.translate) / start.scale;
        let translate = midpoint(a, b).to_vec2() - content * scale;
        if translate.is_finite() {
            self.scale = scale;
            self.translate = translate;
        }
    }

    pub fn end_pinch(&mut self) {
        self.pinch = None;
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    pub fn screen_to_canvas(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.translate) / self.scale).to_pos2()
    }

    pub fn canvas_to_screen(&self, canvas: Pos2) -> Pos2 {
        (canvas.to_vec2() * self.scale + self.translate).to_pos2()
    }
}

fn midpoint(a: Pos2, b: Pos2) -> Pos2 {
    a + (b - a) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> ViewportTransform {
        ViewportTransform::new(Vec2::new(1135.0, 1200.0), ViewportConfig::default())
    }

    #[test]
    fn fit_centers_canvas_with_margin() {
        let mut vp = viewport();
        assert!(vp.fit_to_screen(Vec2::new(1000.0, 600.0)));
        assert!((vp.scale() - 0.45).abs() < 1e-5);
        let top_left = vp.canvas_to_screen(Pos2::ZERO);
        let bottom_right = vp.canvas_to_screen(Pos2::new(1135.0, 1200.0));
        assert!((top_left.x + bottom_right.x - 1000.0).abs() < 1e-3);
        assert!((top_left.y + bottom_right.y - 600.0).abs() < 1e-3);
    }

    #[test]
    fn zero_viewport_keeps_previous_transform() {
        let mut vp = viewport();
        let before = vp.clone();
        assert!(!vp.fit_to_screen(Vec2::new(0.0, 500.0)));
        assert_eq!(vp, before);
    }

    #[test]
    fn screen_to_canvas_inverts_canvas_to_screen() {
        let mut vp = viewport();
        vp.fit_to_screen(Vec2::new(800.0, 900.0));
        let p = Pos2::new(321.0, 654.0);
        let back = vp.screen_to_canvas(vp.canvas_to_screen(p));
        assert!(back.distance(p) < 1e-3);
    }

    #[test]
    fn resize_schedules_a_single_refit() {
        let mut vp = viewport();
        vp.notify_resize(Vec2::new(800.0, 900.0), 1.0);
        assert!(vp.has_pending_refit());
        assert!(!vp.poll(1.05));
        assert!(vp.poll(1.1));
        assert!(!vp.has_pending_refit());
    }

    #[test]
    fn pinch_keeps_anchor_content_fixed() {
        let mut vp = viewport();
        vp.fit_to_screen(Vec2::new(800.0, 900.0));
        let a = Pos2::new(300.0, 400.0);
        let b = Pos2::new(500.0, 400.0);
        let anchor = vp.screen_to_canvas(midpoint(a, b));
        let start_scale = vp.scale();
        vp.begin_pinch(a, b);
        vp.update_pinch(Pos2::new(200.0, 400.0), Pos2::new(600.0, 400.0));
        assert!((vp.scale() - start_scale * 2.0).abs() < 1e-5);
        let after = vp.screen_to_canvas(Pos2::new(400.0, 400.0));
        assert!(after.distance(anchor) < 1e-2);
    }

    #[test]
    fn coincident_pinch_points_are_ignored() {
        let mut vp = viewport();
        let before = (vp.scale(), vp.translate());
        vp.begin_pinch(Pos2::new(10.0, 10.0), Pos2::new(10.0, 10.0));
        vp.update_pinch(Pos2::new(0.0, 0.0), Pos2::new(50.0, 50.0));
        assert_eq!((vp.scale(), vp.translate()), before);
    }
}
