use std::collections::VecDeque;

use log::{debug, error, warn};

use crate::document::Document;
use crate::error::SurfaceError;
use crate::layer::LayerId;
use crate::raster::PixelSnapshot;

/// Number of strokes that can be undone by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Pixels of one layer as they were before a stroke
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub layer_id: LayerId,
    pub snapshot: PixelSnapshot,
}

/// Bounded ring of layer snapshots; the oldest entry is dropped when full
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    undo_stack: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SnapshotHistory {
    /// Creates an empty history holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    /// Returns true if there are entries that can be undone
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// The entry the next undo would restore
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.undo_stack.len() == self.capacity {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(entry);
    }

    /// Snapshot a layer of `document` before it gets modified
    pub fn record(&mut self, document: &Document, layer_id: LayerId) {
        let Some(layer) = document.layer(layer_id) else {
            warn!("not recording history for unknown layer {layer_id}");
            return;
        };
        let snapshot = layer.surface().snapshot();
        self.push(HistoryEntry { layer_id, snapshot });
        debug!("recorded snapshot of {layer_id}, {} in history", self.len());
    }

    /// Restore the most recent snapshot into the layer it was taken from,
    /// active or not. Returns whether anything was restored.
    pub fn undo(&mut self, document: &mut Document) -> Result<bool, SurfaceError> {
        while let Some(entry) = self.undo_stack.pop_back() {
            let Some(layer) = document.layer_mut(entry.layer_id) else {
                warn!("discarding history entry for deleted layer {}", entry.layer_id);
                continue;
            };
            if let Err(err) = layer.restore(&entry.snapshot) {
                error!("undo failed for layer {}: {err}", entry.layer_id);
                return Err(err);
            }
            debug!("restored layer {}, {} left in history", entry.layer_id, self.len());
            return Ok(true);
        }
        Ok(false)
    }

    /// Clear the history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Color32;

    #[test]
    fn test_undo_on_empty_history_is_a_no_op() {
        let mut doc = Document::with_size(2, 2).unwrap();
        let mut history = SnapshotHistory::default();
        assert_eq!(history.undo(&mut doc), Ok(false));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let doc = Document::with_size(2, 2).unwrap();
        let mut history = SnapshotHistory::new(3);
        for _ in 0..5 {
            history.record(&doc, doc.active_id());
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_undo_restores_inactive_layer() {
        let mut doc = Document::with_size(2, 2).unwrap();
        let background = doc.active_id();
        let mut history = SnapshotHistory::default();
        history.record(&doc, background);
        doc.layer_mut(background).unwrap().fill(Color32::RED);
        doc.add_layer().unwrap();

        assert_eq!(history.undo(&mut doc), Ok(true));
        assert_eq!(doc.layer(background).unwrap().surface().pixel(0, 0), Some(Color32::WHITE));
    }

    #[test]
    fn test_entries_for_deleted_layers_are_skipped() {
        let mut doc = Document::with_size(2, 2).unwrap();
        let background = doc.active_id();
        let mut history = SnapshotHistory::default();
        history.record(&doc, background);
        doc.layer_mut(background).unwrap().fill(Color32::RED);

        let extra = doc.add_layer().unwrap();
        history.record(&doc, extra);
        doc.delete_layer(extra).unwrap();

        assert_eq!(history.undo(&mut doc), Ok(true));
        assert!(history.is_empty());
        assert_eq!(doc.layer(background).unwrap().surface().pixel(1, 1), Some(Color32::WHITE));
    }
}
