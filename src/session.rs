//! Per-gesture state of one stroke, from pointer-down to commit.

use std::sync::Arc;

use egui::Pos2;
use rand::Rng;

use crate::layer::LayerId;
use crate::raster::PixelSnapshot;
use crate::renderer::RenderTarget;
use crate::ribbon::{RibbonConfig, RibbonSimulator};
use crate::shape::ShapeKind;
use crate::tool::{Archetype, ToolDefinition};
use crate::util::timer::{Deadline, RepeatingTask};

/// Particle pool of a ribbon stroke and the tick that advances it
#[derive(Debug, Clone)]
pub struct RibbonRun {
    pub simulator: RibbonSimulator,
    pub task: RepeatingTask,
}

#[derive(Debug)]
pub struct StrokeSession {
    tool: Arc<ToolDefinition>,
    layer_id: LayerId,
    points: Vec<Pos2>,
    start: Pos2,
    last: Pos2,
    last_mid: Pos2,
    pressure: f32,
    shape: Option<ShapeKind>,
    /// Shape chosen up front rather than recognized mid-stroke
    explicit_shape: bool,
    hold: Option<Deadline>,
    ribbon: Option<RibbonRun>,
    /// Layer pixels that shape previews of direct-drawing tools reset to
    standing: Option<PixelSnapshot>,
}

impl StrokeSession {
    /// Open a freehand stroke at canvas point `start`
    pub fn freehand(tool: Arc<ToolDefinition>, layer_id: LayerId, start: Pos2, pressure: f32) -> Self {
        Self {
            tool,
            layer_id,
            points: vec![start],
            start,
            last: start,
            last_mid: start,
            pressure,
            shape: None,
            explicit_shape: false,
            hold: None,
            ribbon: None,
            standing: None,
        }
    }

    /// Open a stroke that previews `kind` from the first move on
    pub fn shape(tool: Arc<ToolDefinition>, layer_id: LayerId, start: Pos2, kind: ShapeKind) -> Self {
        let mut session = Self::freehand(tool, layer_id, start, crate::renderer::DEFAULT_PRESSURE);
        session.shape = Some(kind);
        session.explicit_shape = true;
        session
    }

    /// Spawn the particle pool and start its tick
    pub fn start_ribbon<R: Rng + ?Sized>(&mut self, now: f64, config: &RibbonConfig, rng: &mut R) {
        self.ribbon = Some(RibbonRun {
            simulator: RibbonSimulator::spawn(self.start, config, rng),
            task: RepeatingTask::start(now, config.tick_secs, config.max_catch_up),
        });
    }

    pub fn tool(&self) -> &Arc<ToolDefinition> {
        &self.tool
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn start(&self) -> Pos2 {
        self.start
    }

    pub fn last(&self) -> Pos2 {
        self.last
    }

    pub fn last_mid(&self) -> Pos2 {
        self.last_mid
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    pub fn shape_kind(&self) -> Option<ShapeKind> {
        self.shape
    }

    pub fn is_explicit_shape(&self) -> bool {
        self.explicit_shape
    }

    pub fn is_ribbon(&self) -> bool {
        matches!(self.tool.archetype, Archetype::Physics { .. })
    }

    /// Strokes that end up composited from the overlay on commit
    pub fn commits_overlay(&self) -> bool {
        self.tool.overlay || self.shape.is_some()
    }

    /// Surface freehand segments are drawn into
    pub fn freehand_target(&self) -> RenderTarget {
        if self.tool.overlay {
            RenderTarget::Overlay
        } else {
            RenderTarget::Direct
        }
    }

    /// Record a freehand sample; returns `(from_mid, control, to_mid)` of the
    /// smoothed segment to draw
    pub fn advance(&mut self, pos: Pos2, pressure: f32) -> (Pos2, Pos2, Pos2) {
        self.points.push(pos);
        self.pressure = pressure;
        let control = self.last;
        let from = self.last_mid;
        let mid = control + (pos - control) * 0.5;
        self.last_mid = mid;
        self.last = pos;
        (from, control, mid)
    }

    /// Track the live pointer without drawing, as shape previews and ribbons do
    pub fn track(&mut self, pos: Pos2) {
        self.last = pos;
        if let Some(run) = &mut self.ribbon {
            run.simulator.set_target(pos);
        }
    }

    pub fn arm_hold(&mut self, now: f64, delay_secs: f64) {
        self.hold = Some(Deadline::after(now, delay_secs));
    }

    pub fn hold(&self) -> Option<Deadline> {
        self.hold
    }

    /// Take the hold deadline if it has fired
    pub fn take_due_hold(&mut self, now: f64) -> bool {
        match self.hold {
            Some(deadline) if deadline.is_due(now) => {
                self.hold = None;
                true
            }
            _ => false,
        }
    }

    /// Switch the rest of the gesture to a shape preview
    pub fn snap(&mut self, kind: ShapeKind, standing: Option<PixelSnapshot>) {
        self.shape = Some(kind);
        self.standing = standing;
        self.hold = None;
    }

    pub fn standing(&self) -> Option<&PixelSnapshot> {
        self.standing.as_ref()
    }

    pub fn ribbon_mut(&mut self) -> Option<&mut RibbonRun> {
        self.ribbon.as_mut()
    }

    pub fn ribbon(&self) -> Option<&RibbonRun> {
        self.ribbon.as_ref()
    }

    /// Stop every timer owned by this session
    pub fn cancel_timers(&mut self) {
        self.hold = None;
        if let Some(run) = &mut self.ribbon {
            run.task.cancel();
        }
    }

    /// Earliest time a timer of this session needs a poll
    pub fn next_wakeup(&self) -> Option<f64> {
        let hold = self.hold.map(|d| d.due());
        let tick = self.ribbon.as_ref().and_then(|r| r.task.next_due());
        match (hold, tick) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ToolCatalog, ToolId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session(id: ToolId) -> StrokeSession {
        let tool = ToolCatalog::builtin().get(id).unwrap().clone();
        StrokeSession::freehand(tool, crate::layer::LayerId::new(), Pos2::new(0.0, 0.0), 0.5)
    }

    #[test]
    fn advance_yields_midpoint_segments() {
        let mut s = session(ToolId::PENCIL);
        let (from, control, to) = s.advance(Pos2::new(10.0, 0.0), 0.5);
        assert_eq!((from, control, to), (Pos2::ZERO, Pos2::ZERO, Pos2::new(5.0, 0.0)));
        let (from, control, to) = s.advance(Pos2::new(10.0, 10.0), 0.5);
        assert_eq!((from, control, to), (Pos2::new(5.0, 0.0), Pos2::new(10.0, 0.0), Pos2::new(10.0, 5.0)));
        assert_eq!(s.points().len(), 3);
    }

    #[test]
    fn hold_fires_once() {
        let mut s = session(ToolId::PENCIL);
        s.arm_hold(1.0, 0.8);
        assert!(!s.take_due_hold(1.5));
        assert!(s.take_due_hold(1.8));
        assert!(!s.take_due_hold(2.0));
    }

    #[test]
    fn cancel_stops_ribbon_tick() {
        let mut s = session(ToolId::RIBBON);
        s.start_ribbon(0.0, &RibbonConfig::default(), &mut StdRng::seed_from_u64(1));
        assert!(s.next_wakeup().is_some());
        s.cancel_timers();
        assert!(s.next_wakeup().is_none());
        assert_eq!(s.ribbon_mut().unwrap().task.due_ticks(10.0), 0);
    }

    #[test]
    fn overlay_routing_follows_tool_and_snap() {
        let mut eraser = session(ToolId::ERASER);
        assert_eq!(eraser.freehand_target(), RenderTarget::Direct);
        assert!(!eraser.commits_overlay());
        eraser.snap(ShapeKind::Line, None);
        assert!(eraser.commits_overlay());
        assert!(session(ToolId::MARKER).commits_overlay());
    }
}
