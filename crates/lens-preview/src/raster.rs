//! Rasterization of resolved assets into square tiles.
//!
//! The compositor only depends on [`AssetRasterizer`]; [`DefaultRasterizer`]
//! renders SVG through resvg, bitmaps through `image`, and Xcursor files
//! through the in-crate decoder.

use crate::error::PreviewError;
use crate::types::ResampleQuality;
use crate::xcursor::{Xcursor, is_xcursor};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use lens_themes::ResolvedAsset;
use resvg::{tiny_skia, usvg};
use std::fs;
use std::path::Path;

/// Renders one asset so that it fits inside an `edge` x `edge` square.
pub trait AssetRasterizer: Send + Sync {
    fn rasterize(
        &self,
        asset: &ResolvedAsset,
        edge: u32,
        quality: ResampleQuality,
    ) -> Result<RgbaImage, PreviewError>;
}

impl<T: AssetRasterizer + ?Sized> AssetRasterizer for std::sync::Arc<T> {
    fn rasterize(
        &self,
        asset: &ResolvedAsset,
        edge: u32,
        quality: ResampleQuality,
    ) -> Result<RgbaImage, PreviewError> {
        (**self).rasterize(asset, edge, quality)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRasterizer;

impl AssetRasterizer for DefaultRasterizer {
    fn rasterize(
        &self,
        asset: &ResolvedAsset,
        edge: u32,
        quality: ResampleQuality,
    ) -> Result<RgbaImage, PreviewError> {
        let path = asset.file_path.as_path();
        let data = fs::read(path).map_err(|e| PreviewError::raster(path, e))?;

        if asset.is_vector {
            return render_svg(path, &data, edge);
        }
        if is_xcursor(&data) {
            return render_xcursor(path, &data, edge, quality);
        }

        let img = image::load_from_memory(&data)
            .map_err(|e| PreviewError::raster(path, e))?
            .to_rgba8();
        Ok(fit_bitmap(&img, edge, quality))
    }
}

/// Size that fits `(w, h)` inside `edge` while keeping the aspect ratio.
pub fn fit_within(w: f32, h: f32, edge: u32) -> (u32, u32) {
    if w <= 0.0 || h <= 0.0 {
        return (edge, edge);
    }
    let scale = edge as f32 / w.max(h);
    let fw = ((w * scale).round() as u32).clamp(1, edge.max(1));
    let fh = ((h * scale).round() as u32).clamp(1, edge.max(1));
    (fw, fh)
}

/// Render SVG (or gzip-compressed SVGZ) data directly at the target size.
pub fn render_svg(path: &Path, data: &[u8], edge: u32) -> Result<RgbaImage, PreviewError> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(data, &options).map_err(|e| PreviewError::raster(path, e))?;

    let size = tree.size();
    let (w, h) = fit_within(size.width(), size.height(), edge);
    let mut pixmap = tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| PreviewError::raster(path, "zero-sized pixmap"))?;

    let transform =
        tiny_skia::Transform::from_scale(w as f32 / size.width(), h as f32 / size.height());
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut image = RgbaImage::new(w, h);
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(image)
}

fn render_xcursor(
    path: &Path,
    data: &[u8],
    edge: u32,
    quality: ResampleQuality,
) -> Result<RgbaImage, PreviewError> {
    let cursor = Xcursor::from_bytes(data).map_err(|e| PreviewError::raster(path, e))?;
    let frame = cursor
        .best_frame(edge)
        .ok_or_else(|| PreviewError::raster(path, "no frames"))?;
    Ok(fit_bitmap(&frame.image, edge, quality))
}

/// Resample a bitmap to fit inside `edge`, preserving aspect ratio.
pub fn fit_bitmap(img: &RgbaImage, edge: u32, quality: ResampleQuality) -> RgbaImage {
    let (w, h) = fit_within(img.width() as f32, img.height() as f32, edge);
    resample(img, w, h, quality)
}

pub fn resample(img: &RgbaImage, w: u32, h: u32, quality: ResampleQuality) -> RgbaImage {
    if img.width() == w && img.height() == h {
        return img.clone();
    }
    let shrinking = w <= img.width() && h <= img.height();
    match quality {
        ResampleQuality::Nearest => imageops::resize(img, w, h, FilterType::Nearest),
        // thumbnail() is a box filter, only meaningful when reducing
        ResampleQuality::Area if shrinking => imageops::thumbnail(img, w, h),
        ResampleQuality::Area => imageops::resize(img, w, h, FilterType::Triangle),
        ResampleQuality::High => imageops::resize(img, w, h, FilterType::Lanczos3),
    }
}
