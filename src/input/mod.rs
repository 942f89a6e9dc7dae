//! Engine input events and their translation from egui's raw input.

use egui::{Context, Event, MouseWheelUnit, PointerButton, Pos2, Rect, TouchPhase};

use crate::renderer::DEFAULT_PRESSURE;

/// Pixels one wheel "line" scrolls, matching what browsers report
const WHEEL_LINE_PX: f32 = 50.0;

/// Input in viewport coordinates (relative to the canvas panel's top-left),
/// stamped with the time in seconds it was observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown {
        pos: Pos2,
        pressure: Option<f32>,
        time: f64,
    },
    PointerMove {
        pos: Pos2,
        pressure: Option<f32>,
        time: f64,
    },
    PointerUp {
        pos: Pos2,
        time: f64,
    },
    /// The pointer left the canvas mid-gesture
    PointerLeave {
        time: f64,
    },
    TouchStart {
        id: u64,
        pos: Pos2,
        force: Option<f32>,
        time: f64,
    },
    TouchMove {
        id: u64,
        pos: Pos2,
        force: Option<f32>,
        time: f64,
    },
    TouchEnd {
        id: u64,
        pos: Pos2,
        time: f64,
    },
    /// Zoom request; positive `delta` zooms out, in pixels of scroll
    Wheel {
        delta: f32,
        time: f64,
    },
}

impl InputEvent {
    pub fn time(&self) -> f64 {
        match *self {
            InputEvent::PointerDown { time, .. }
            | InputEvent::PointerMove { time, .. }
            | InputEvent::PointerUp { time, .. }
            | InputEvent::PointerLeave { time }
            | InputEvent::TouchStart { time, .. }
            | InputEvent::TouchMove { time, .. }
            | InputEvent::TouchEnd { time, .. }
            | InputEvent::Wheel { time, .. } => time,
        }
    }
}

/// Pressure to use when the device reported none
pub fn pressure_or_default(pressure: Option<f32>) -> f32 {
    match pressure {
        Some(p) if p.is_finite() && p > 0.0 => p.min(1.0),
        _ => DEFAULT_PRESSURE,
    }
}

/// Handles converting raw egui input into our domain-specific InputEvents
#[derive(Debug, Default)]
pub struct InputHandler {
    canvas_rect: Option<Rect>,
    pointer_down: bool,
    touches: usize,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the rectangle of the panel the canvas is shown in
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = Some(rect);
    }

    fn local(&self, pos: Pos2) -> Pos2 {
        match self.canvas_rect {
            Some(rect) => (pos - rect.min).to_pos2(),
            None => pos,
        }
    }

    fn inside(&self, pos: Pos2) -> bool {
        self.canvas_rect.is_none_or(|rect| rect.contains(pos))
    }

    /// Process raw egui input and generate our InputEvents
    pub fn process_input(&mut self, ctx: &Context) -> Vec<InputEvent> {
        let (events, time) = ctx.input(|input| (input.events.clone(), input.time));
        self.translate(&events, time)
    }

    /// Translate one frame of raw events
    pub fn translate(&mut self, raw: &[Event], time: f64) -> Vec<InputEvent> {
        let mut events = Vec::new();
        for event in raw {
            match event {
                Event::Touch { id, phase, pos, force, .. } => {
                    let local = self.local(*pos);
                    match phase {
                        TouchPhase::Start => {
                            if !self.inside(*pos) {
                                continue;
                            }
                            self.touches += 1;
                            events.push(InputEvent::TouchStart { id: id.0, pos: local, force: *force, time });
                        }
                        TouchPhase::Move => {
                            events.push(InputEvent::TouchMove { id: id.0, pos: local, force: *force, time });
                        }
                        TouchPhase::End | TouchPhase::Cancel => {
                            self.touches = self.touches.saturating_sub(1);
                            events.push(InputEvent::TouchEnd { id: id.0, pos: local, time });
                        }
                    }
                }
                // Touches also arrive as synthesized pointer events; those are skipped
                _ if self.touches > 0 => {}
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed,
                    ..
                } => {
                    if *pressed && self.inside(*pos) {
                        self.pointer_down = true;
                        events.push(InputEvent::PointerDown {
                            pos: self.local(*pos),
                            pressure: None,
                            time,
                        });
                    } else if !*pressed && self.pointer_down {
                        self.pointer_down = false;
                        events.push(InputEvent::PointerUp { pos: self.local(*pos), time });
                    }
                }
                Event::PointerMoved(pos) if self.pointer_down => {
                    if self.inside(*pos) {
                        events.push(InputEvent::PointerMove {
                            pos: self.local(*pos),
                            pressure: None,
                            time,
                        });
                    } else {
                        self.pointer_down = false;
                        events.push(InputEvent::PointerLeave { time });
                    }
                }
                Event::PointerGone if self.pointer_down => {
                    self.pointer_down = false;
                    events.push(InputEvent::PointerLeave { time });
                }
                Event::MouseWheel { unit, delta, modifiers } if modifiers.command || modifiers.ctrl => {
                    let scale = match unit {
                        MouseWheelUnit::Point => 1.0,
                        MouseWheelUnit::Line => WHEEL_LINE_PX,
                        MouseWheelUnit::Page => WHEEL_LINE_PX * 10.0,
                    };
                    events.push(InputEvent::Wheel { delta: -delta.y * scale, time });
                }
                _ => {}
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Modifiers, TouchDeviceId, TouchId, Vec2};

    fn handler() -> InputHandler {
        let mut h = InputHandler::new();
        h.set_canvas_rect(Rect::from_min_max(Pos2::new(100.0, 50.0), Pos2::new(600.0, 550.0)));
        h
    }

    fn button(pos: Pos2, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed,
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn test_pointer_events_are_panel_relative() {
        let mut h = handler();
        let out = h.translate(&[button(Pos2::new(150.0, 100.0), true)], 1.0);
        assert_eq!(
            out,
            vec![InputEvent::PointerDown {
                pos: Pos2::new(50.0, 50.0),
                pressure: None,
                time: 1.0
            }]
        );
    }

    #[test]
    fn test_presses_outside_the_canvas_are_ignored() {
        let mut h = handler();
        let out = h.translate(
            &[button(Pos2::new(10.0, 10.0), true), Event::PointerMoved(Pos2::new(20.0, 20.0))],
            0.0,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_leaving_the_canvas_mid_stroke_emits_leave() {
        let mut h = handler();
        let out = h.translate(
            &[button(Pos2::new(150.0, 100.0), true), Event::PointerMoved(Pos2::new(700.0, 100.0))],
            0.0,
        );
        assert!(matches!(out.last(), Some(InputEvent::PointerLeave { .. })));
    }

    #[test]
    fn test_touch_suppresses_synthesized_pointer() {
        let mut h = handler();
        let touch = Event::Touch {
            device_id: TouchDeviceId(0),
            id: TouchId(7),
            phase: TouchPhase::Start,
            pos: Pos2::new(200.0, 200.0),
            force: Some(0.8),
        };
        let out = h.translate(&[touch, button(Pos2::new(200.0, 200.0), true)], 0.0);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], InputEvent::TouchStart { id: 7, force: Some(_), .. }));
    }

    #[test]
    fn test_ctrl_wheel_zooms() {
        let mut h = handler();
        let wheel = Event::MouseWheel {
            unit: MouseWheelUnit::Point,
            delta: Vec2::new(0.0, 120.0),
            modifiers: Modifiers::CTRL,
        };
        assert_eq!(h.translate(&[wheel], 0.0), vec![InputEvent::Wheel { delta: -120.0, time: 0.0 }]);
    }

    #[test]
    fn test_missing_pressure_defaults_to_half() {
        assert_eq!(pressure_or_default(None), 0.5);
        assert_eq!(pressure_or_default(Some(0.0)), 0.5);
        assert_eq!(pressure_or_default(Some(0.9)), 0.9);
    }
}
