use log::info;

use crate::error::{LayerError, SurfaceError};
use crate::layer::{Layer, LayerId};
use crate::raster::{BlendMode, CANVAS_HEIGHT, CANVAS_WIDTH, Surface};

/// The layer stack plus the overlay surface strokes are previewed on.
///
/// Layers are kept topmost first, the order a layer list displays them in.
/// There is always at least one layer and the active id always exists.
#[derive(Debug, Clone)]
pub struct Document {
    width: usize,
    height: usize,
    layers: Vec<Layer>,
    active: LayerId,
    overlay: Surface,
    /// Counter used to name new layers
    created: usize,
}

impl Document {
    /// A canvas-sized document holding only the white background layer
    pub fn new() -> Result<Self, SurfaceError> {
        Self::with_size(CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    pub fn with_size(width: usize, height: usize) -> Result<Self, SurfaceError> {
        let background = Layer::background(width, height)?;
        Ok(Self {
            width,
            height,
            active: background.id(),
            layers: vec![background],
            overlay: Surface::new(width, height)?,
            created: 1,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    /// Layers, topmost first
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn active_id(&self) -> LayerId {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layer(self.active)
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        let id = self.active;
        self.layer_mut(id)
    }

    pub fn set_active(&mut self, id: LayerId) -> Result<(), LayerError> {
        if self.layer(id).is_none() {
            return Err(LayerError::UnknownLayer(id));
        }
        self.active = id;
        Ok(())
    }

    /// Insert a new transparent layer at the top and make it active
    pub fn add_layer(&mut self) -> Result<LayerId, LayerError> {
        let layer = Layer::new(&format!("Layer {}", self.created + 1), self.width, self.height)?;
        self.created += 1;
        let id = layer.id();
        info!("➕ Added {} ({id})", layer.name);
        self.layers.insert(0, layer);
        self.active = id;
        Ok(id)
    }

    /// Insert an existing layer at the top. Its surface must match the canvas.
    pub fn push_layer(&mut self, layer: Layer) -> Result<LayerId, LayerError> {
        if layer.surface().size() != self.size() {
            let [w, h] = layer.surface().size();
            return Err(LayerError::Surface(SurfaceError::SizeMismatch {
                expected: self.width * self.height,
                actual: w * h,
            }));
        }
        let id = layer.id();
        self.layers.insert(0, layer);
        Ok(id)
    }

    /// Remove a layer. The last remaining layer cannot be removed; removing
    /// the active layer activates the one that takes its place.
    pub fn delete_layer(&mut self, id: LayerId) -> Result<Layer, LayerError> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id() == id)
            .ok_or(LayerError::UnknownLayer(id))?;
        if self.layers.len() == 1 {
            return Err(LayerError::LastLayer);
        }
        let removed = self.layers.remove(index);
        if self.active == id {
            let next = index.min(self.layers.len() - 1);
            self.active = self.layers[next].id();
        }
        info!("🗑 Deleted layer {} ({id})", removed.name);
        Ok(removed)
    }

    /// Move a layer to `index` in the topmost-first order
    pub fn move_layer(&mut self, id: LayerId, index: usize) -> Result<(), LayerError> {
        let from = self
            .layers
            .iter()
            .position(|l| l.id() == id)
            .ok_or(LayerError::UnknownLayer(id))?;
        let layer = self.layers.remove(from);
        let to = index.min(self.layers.len());
        self.layers.insert(to, layer);
        Ok(())
    }

    pub fn overlay(&self) -> &Surface {
        &self.overlay
    }

    pub(crate) fn overlay_mut(&mut self) -> &mut Surface {
        &mut self.overlay
    }

    /// Composite the overlay into the active layer and clear it
    pub fn commit_overlay(&mut self, alpha: f32, blend: BlendMode) -> Result<(), LayerError> {
        let active = self.active;
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id() == active)
            .ok_or(LayerError::UnknownLayer(active))?;
        let result = layer.composite(&self.overlay, alpha, blend);
        self.overlay.clear();
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Color32;

    fn small() -> Document {
        Document::with_size(8, 8).unwrap()
    }

    #[test]
    fn test_starts_with_background() {
        let doc = small();
        assert_eq!(doc.layers().len(), 1);
        assert_eq!(doc.active_layer().unwrap().name, "Background");
        assert!(doc.overlay().is_transparent());
    }

    #[test]
    fn test_new_layers_go_on_top() {
        let mut doc = small();
        let id = doc.add_layer().unwrap();
        assert_eq!(doc.layers()[0].id(), id);
        assert_eq!(doc.layers()[0].name, "Layer 2");
        assert_eq!(doc.active_id(), id);
    }

    #[test]
    fn test_last_layer_cannot_be_deleted() {
        let mut doc = small();
        let id = doc.active_id();
        assert_eq!(doc.delete_layer(id).unwrap_err(), LayerError::LastLayer);
    }

    #[test]
    fn test_deleting_active_layer_activates_neighbour() {
        let mut doc = small();
        let bottom = doc.active_id();
        let middle = doc.add_layer().unwrap();
        let top = doc.add_layer().unwrap();
        doc.set_active(middle).unwrap();
        doc.delete_layer(middle).unwrap();
        assert_eq!(doc.active_id(), bottom);

        doc.set_active(bottom).unwrap();
        doc.delete_layer(bottom).unwrap();
        assert_eq!(doc.active_id(), top);
    }

    #[test]
    fn test_mismatched_layer_is_rejected() {
        let mut doc = small();
        let err = doc.push_layer(Layer::new("odd", 4, 4).unwrap()).unwrap_err();
        assert!(matches!(err, LayerError::Surface(_)));
    }

    #[test]
    fn test_unknown_layer_is_reported() {
        let mut doc = small();
        let stranger = LayerId::new();
        assert_eq!(doc.set_active(stranger), Err(LayerError::UnknownLayer(stranger)));
    }

    #[test]
    fn test_commit_overlay_clears_it() {
        let mut doc = small();
        doc.overlay_mut().fill(Color32::RED);
        doc.commit_overlay(1.0, BlendMode::Normal).unwrap();
        assert!(doc.overlay().is_transparent());
        assert_eq!(doc.active_layer().unwrap().surface().pixel(3, 3), Some(Color32::RED));
    }
}
