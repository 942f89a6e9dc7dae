#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod brush_texture;
pub mod compositor;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod event;
pub mod fill;
pub mod geometry;
pub mod history;
pub mod input;
pub mod layer;
pub mod raster;
pub mod renderer;
pub mod ribbon;
pub mod session;
pub mod shape;
pub mod texture_manager;
pub mod tool;
pub mod util;
pub mod viewport;

pub use app::PaintApp;
pub use brush_texture::{BrushTip, StampCache};
pub use config::EditorConfig;
pub use document::Document;
pub use editor::{DrawMode, PaintEditor};
pub use event::{EditorEvent, EventHandler};
pub use history::SnapshotHistory;
pub use input::{InputEvent, InputHandler};
pub use layer::{Layer, LayerId};
pub use raster::{BlendMode, Surface};
pub use shape::ShapeKind;
pub use tool::{ToolCatalog, ToolDefinition, ToolId, ToolSetting};
pub use viewport::ViewportTransform;
