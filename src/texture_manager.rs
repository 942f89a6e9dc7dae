use std::collections::HashMap;

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use log::debug;

/// Which picture a cached texture shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// All visible layers flattened
    Composite,
    /// The live stroke overlay
    Overlay,
}

/// Keeps one GPU texture per slot and re-uploads it only when the version
/// of the pixels behind it changes
#[derive(Default)]
pub struct TextureManager {
    textures: HashMap<TextureSlot, (u64, TextureHandle)>,
    uploads: u64,
}

impl TextureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the texture for `slot`, regenerating it when `version` differs
    /// from the cached one
    pub fn texture_for<F>(&mut self, slot: TextureSlot, version: u64, ctx: &Context, generator: F) -> TextureId
    where
        F: FnOnce() -> ColorImage,
    {
        if let Some((cached, handle)) = self.textures.get_mut(&slot) {
            if *cached != version {
                handle.set(generator(), TextureOptions::LINEAR);
                *cached = version;
                self.uploads += 1;
            }
            return handle.id();
        }

        let name = format!("{slot:?}").to_lowercase();
        let handle = ctx.load_texture(name, generator(), TextureOptions::LINEAR);
        let id = handle.id();
        self.textures.insert(slot, (version, handle));
        self.uploads += 1;
        debug!("created {slot:?} texture at version {version}");
        id
    }

    /// Forget the texture of `slot` so the next request uploads afresh
    pub fn invalidate(&mut self, slot: TextureSlot) {
        self.textures.remove(&slot);
    }

    pub fn clear_cache(&mut self) {
        self.textures.clear();
    }

    /// Returns the number of textures currently in the cache
    pub fn cache_size(&self) -> usize {
        self.textures.len()
    }

    /// Number of uploads so far
    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}
