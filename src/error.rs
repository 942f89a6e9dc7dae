use thiserror::Error;

use crate::layer::LayerId;

/// Errors raised by allocation and bulk pixel access on a [`crate::raster::Surface`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("pixel buffer holds {actual} pixels, surface expects {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("pixel ({x}, {y}) lies outside a {width}x{height} surface")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
    #[error("cannot allocate a {width}x{height} surface")]
    Allocation { width: usize, height: usize },
}

/// Errors raised by layer stack operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("no layer with id {0}")]
    UnknownLayer(LayerId),
    #[error("the last remaining layer cannot be deleted")]
    LastLayer,
    #[error("layer surface does not match the document canvas: {0}")]
    Surface(#[from] SurfaceError),
}

/// Errors raised when selecting or reconfiguring tools
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("unknown tool {0:?}")]
    UnknownTool(String),
    #[error("invalid value {value} for {setting}")]
    InvalidValue { setting: &'static str, value: f32 },
    #[error("{setting} does not apply to {tool}")]
    NotApplicable {
        setting: &'static str,
        tool: &'static str,
    },
}

/// Errors raised while loading an [`crate::config::EditorConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Errors raised while encoding the flattened image
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("flattened buffer does not fit its dimensions")]
    BufferSize,
    #[error("could not flatten the document: {0}")]
    Surface(#[from] SurfaceError),
}
