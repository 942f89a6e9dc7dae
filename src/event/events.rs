use egui::{Color32, Vec2};

use crate::layer::LayerId;
use crate::shape::ShapeKind;
use crate::tool::ToolId;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    StrokeStarted {
        layer_id: LayerId,
        tool: ToolId,
    },
    StrokeCommitted {
        layer_id: LayerId,
        tool: ToolId,
    },
    /// The hold timer recognized the stroke in progress
    ShapeSnapped {
        kind: ShapeKind,
    },
    FillApplied {
        layer_id: LayerId,
        pixels: usize,
    },
    Undone {
        layer_id: LayerId,
    },
    ToolChanged {
        old: ToolId,
        new: ToolId,
    },
    ColorChanged {
        color: Color32,
    },
    LayerChanged(LayerEvent),
    ViewChanged {
        scale: f32,
        translation: Vec2,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Added { id: LayerId },
    Removed { id: LayerId },
    Activated { id: LayerId },
    PropertiesChanged { id: LayerId },
}
