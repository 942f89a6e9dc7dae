//! Flattening the layer stack into one image.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Cursor;

use egui::Color32;
use image::{ImageFormat, RgbaImage};
use log::{error, info};

use crate::document::Document;
use crate::error::{ExportError, SurfaceError};
use crate::layer::Layer;
use crate::raster::{BlendMode, Surface};

/// Composite every visible layer, bottom to top, over opaque white
pub fn flatten(document: &Document) -> Result<Surface, SurfaceError> {
    let [width, height] = document.size();
    let mut out = Surface::filled(width, height, Color32::WHITE)?;
    for layer in document.layers().iter().rev() {
        if !layer.visible {
            continue;
        }
        if let Err(err) = composite_layer(&mut out, layer) {
            error!("skipping layer {} while flattening: {err}", layer.id());
        }
    }
    Ok(out)
}

fn composite_layer(out: &mut Surface, layer: &Layer) -> Result<(), SurfaceError> {
    if let Some(shadow) = layer.shadow {
        let mut cast = layer.surface().silhouette(shadow.color)?;
        cast.blur(shadow.blur / 2.0);
        let (dx, dy) = (shadow.offset.x.round() as i32, shadow.offset.y.round() as i32);
        out.composite_at(&cast, layer.opacity(), BlendMode::Normal, dx, dy)?;
    }
    out.composite(layer.surface(), layer.opacity(), layer.blend_mode)
}

/// Changes whenever [`flatten`] would produce a different image
pub fn fingerprint(document: &Document) -> u64 {
    let mut hasher = DefaultHasher::new();
    for layer in document.layers().iter().filter(|l| l.visible) {
        layer.id().hash(&mut hasher);
        layer.surface().generation().hash(&mut hasher);
        layer.opacity().to_bits().hash(&mut hasher);
        layer.blend_mode.hash(&mut hasher);
        if let Some(shadow) = layer.shadow {
            shadow.color.hash(&mut hasher);
            shadow.blur.to_bits().hash(&mut hasher);
            shadow.offset.x.to_bits().hash(&mut hasher);
            shadow.offset.y.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Flatten and encode as PNG with straight alpha
pub fn export_png(document: &Document) -> Result<Vec<u8>, ExportError> {
    let flat = flatten(document)?;
    let image = RgbaImage::from_raw(flat.width() as u32, flat.height() as u32, flat.to_rgba_unmultiplied())
        .ok_or(ExportError::BufferSize)?;
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    info!("🖼 Exported {}x{} PNG ({} bytes)", flat.width(), flat.height(), bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::DropShadow;
    use egui::Vec2;

    #[test]
    fn test_empty_document_flattens_to_white() {
        let doc = Document::with_size(4, 4).unwrap();
        let flat = flatten(&doc).unwrap();
        assert!(flat.pixels().iter().all(|p| *p == Color32::WHITE));
    }

    #[test]
    fn test_fingerprint_tracks_visible_changes() {
        let mut doc = Document::with_size(4, 4).unwrap();
        let id = doc.add_layer().unwrap();
        let initial = fingerprint(&doc);
        assert_eq!(fingerprint(&doc), initial);

        doc.layer_mut(id).unwrap().fill(Color32::RED);
        let painted = fingerprint(&doc);
        assert_ne!(painted, initial);

        doc.layer_mut(id).unwrap().set_opacity(0.5);
        assert_ne!(fingerprint(&doc), painted);
    }

    #[test]
    fn test_hidden_layers_are_skipped() {
        let mut doc = Document::with_size(4, 4).unwrap();
        let id = doc.add_layer().unwrap();
        let layer = doc.layer_mut(id).unwrap();
        layer.fill(Color32::RED);
        layer.visible = false;
        assert_eq!(flatten(&doc).unwrap().pixel(0, 0), Some(Color32::WHITE));
    }

    #[test]
    fn test_opacity_and_blend_apply() {
        let mut doc = Document::with_size(4, 4).unwrap();
        let id = doc.add_layer().unwrap();
        let layer = doc.layer_mut(id).unwrap();
        layer.fill(Color32::BLACK);
        layer.set_opacity(0.5);
        let flat = flatten(&doc).unwrap();
        let p = flat.pixel(1, 1).unwrap();
        assert!((p.r() as i32 - 128).abs() <= 1);

        doc.layer_mut(id).unwrap().blend_mode = BlendMode::Screen;
        assert_eq!(flatten(&doc).unwrap().pixel(1, 1), Some(Color32::WHITE));
    }

    #[test]
    fn test_drop_shadow_darkens_beside_content() {
        let mut doc = Document::with_size(20, 20).unwrap();
        let id = doc.add_layer().unwrap();
        let layer = doc.layer_mut(id).unwrap();
        layer.set_pixel(5, 5, Color32::RED).unwrap();
        layer.shadow = Some(DropShadow {
            color: Color32::BLACK,
            blur: 0.0,
            offset: Vec2::new(3.0, 0.0),
        });
        let flat = flatten(&doc).unwrap();
        assert_eq!(flat.pixel(8, 5), Some(Color32::BLACK));
        assert_eq!(flat.pixel(5, 5), Some(Color32::RED));
    }

    #[test]
    fn test_png_export_has_signature() {
        let doc = Document::with_size(3, 2).unwrap();
        let bytes = export_png(&doc).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }
}
