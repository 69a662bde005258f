//! Fixed-grid preview composition.
//!
//! The grid always has room for the full role table, so previews of
//! different themes line up cell for cell even when some roles are missing.

use crate::error::PreviewError;
use crate::raster::{AssetRasterizer, resample};
use crate::types::{PreviewSize, RenderBudget, ResampleQuality};
use image::imageops;
use image::{Pixel, Rgba, RgbaImage};
use lens_themes::{CanonicalRole, ResolvedAsset};
use log::{debug, warn};

/// Rows and columns of the preview grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: u32,
    pub cols: u32,
}

impl GridLayout {
    /// Smallest near-square grid holding `count` cells (16 -> 4x4).
    pub fn for_count(count: usize) -> Self {
        let count = count.max(1) as u32;
        let cols = (count as f64).sqrt().ceil() as u32;
        let rows = count.div_ceil(cols);
        Self { rows, cols }
    }

    pub fn cells(&self) -> u32 {
        self.rows * self.cols
    }
}

#[derive(Clone, Debug)]
pub struct ComposeOptions {
    pub background: Rgba<u8>,
    pub border: Rgba<u8>,
    pub gridline: Rgba<u8>,
    /// Fraction of the cell edge left empty on each side of a tile.
    pub margin_ratio: f32,
    /// Supersample when the smaller output edge is at least this long.
    pub supersample_min_edge: u32,
    pub supersample_factor: u32,
    /// Supersampling is skipped when the work canvas would exceed this
    /// many pixels.
    pub max_work_pixels: u64,
    /// Draw gridlines when the smaller output edge is at least this long.
    pub gridline_min_edge: u32,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            background: Rgba([246, 245, 244, 255]),
            border: Rgba([192, 191, 188, 255]),
            gridline: Rgba([0, 0, 0, 10]),
            margin_ratio: 0.1,
            supersample_min_edge: 192,
            supersample_factor: 2,
            max_work_pixels: 4096 * 4096,
            gridline_min_edge: 128,
        }
    }
}

/// Result of one composition.
#[derive(Debug)]
pub struct ComposedPreview {
    pub image: RgbaImage,
    /// Number of cells that received a tile.
    pub filled: usize,
    /// Tiles that could not be rendered.
    pub errors: Vec<PreviewError>,
}

pub struct Compositor<R: AssetRasterizer> {
    rasterizer: R,
    options: ComposeOptions,
}

impl<R: AssetRasterizer> Compositor<R> {
    pub fn new(rasterizer: R) -> Self {
        Self::with_options(rasterizer, ComposeOptions::default())
    }

    pub fn with_options(rasterizer: R, options: ComposeOptions) -> Self {
        Self {
            rasterizer,
            options,
        }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Compose `assets` into one image. Each asset lands in the cell of its
    /// role's index within `roles`; assets whose role is not in the table
    /// are ignored.
    pub fn compose(
        &self,
        roles: &[CanonicalRole],
        assets: &[ResolvedAsset],
        size: PreviewSize,
        budget: &RenderBudget,
    ) -> ComposedPreview {
        let opts = &self.options;
        let layout = GridLayout::for_count(roles.len());
        if !size.is_valid() {
            warn!("Preview size {} out of range, clamping", size);
        }
        let size = size.clamped();

        let (factor, work_w, work_h) = self.work_canvas(size);
        let mut canvas = RgbaImage::from_pixel(work_w, work_h, opts.background);

        if size.min_edge() >= opts.gridline_min_edge {
            draw_gridlines(&mut canvas, layout, opts.gridline);
        }

        let mut filled = 0;
        let mut errors = Vec::new();

        for asset in assets {
            let Some(index) = roles.iter().position(|r| r.id == asset.role.id) else {
                continue;
            };

            if budget.exceeded() {
                errors.push(PreviewError::raster(
                    &asset.file_path,
                    "render budget exceeded",
                ));
                continue;
            }

            let cell = cell_rect(layout, index as u32, work_w, work_h);
            let edge = cell.w.min(cell.h);
            let margin = ((edge as f32 * opts.margin_ratio) as u32).max(1);
            let tile_edge = edge.saturating_sub(margin * 2);
            if tile_edge == 0 {
                continue;
            }

            match self
                .rasterizer
                .rasterize(asset, tile_edge, ResampleQuality::Area)
            {
                Ok(tile) => {
                    let x = cell.x + (cell.w.saturating_sub(tile.width())) / 2;
                    let y = cell.y + (cell.h.saturating_sub(tile.height())) / 2;
                    imageops::overlay(&mut canvas, &tile, x as i64, y as i64);
                    filled += 1;
                }
                Err(e) => {
                    warn!("Skipping tile {}: {}", asset.role.id, e);
                    errors.push(e);
                }
            }
        }

        let mut image = if factor > 1 {
            resample(&canvas, size.width, size.height, ResampleQuality::High)
        } else {
            canvas
        };
        draw_border(&mut image, opts.border);

        debug!(
            "Composed {} preview: {}/{} cells, supersample x{}",
            size,
            filled,
            roles.len(),
            factor
        );

        ComposedPreview {
            image,
            filled,
            errors,
        }
    }
}

impl<R: AssetRasterizer> Compositor<R> {
    /// Supersample factor and canvas dimensions for `size`.
    fn work_canvas(&self, size: PreviewSize) -> (u32, u32, u32) {
        let opts = &self.options;
        if size.min_edge() < opts.supersample_min_edge {
            return (1, size.width, size.height);
        }
        let factor = opts.supersample_factor.max(1);
        let scaled = size
            .width
            .checked_mul(factor)
            .zip(size.height.checked_mul(factor))
            .filter(|&(w, h)| u64::from(w) * u64::from(h) <= opts.max_work_pixels);
        match scaled {
            Some((w, h)) => (factor, w, h),
            None => (1, size.width, size.height),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Cell bounds; boundaries are spread so rounding never leaves a gap.
fn cell_rect(layout: GridLayout, index: u32, width: u32, height: u32) -> CellRect {
    let col = index % layout.cols;
    let row = index / layout.cols;
    let x0 = col * width / layout.cols;
    let x1 = (col + 1) * width / layout.cols;
    let y0 = row * height / layout.rows;
    let y1 = (row + 1) * height / layout.rows;
    CellRect {
        x: x0,
        y: y0,
        w: x1 - x0,
        h: y1 - y0,
    }
}

fn draw_gridlines(canvas: &mut RgbaImage, layout: GridLayout, color: Rgba<u8>) {
    let (w, h) = canvas.dimensions();
    for c in 1..layout.cols {
        let x = c * w / layout.cols;
        for y in 0..h {
            canvas.get_pixel_mut(x, y).blend(&color);
        }
    }
    for r in 1..layout.rows {
        let y = r * h / layout.rows;
        for x in 0..w {
            canvas.get_pixel_mut(x, y).blend(&color);
        }
    }
}

fn draw_border(image: &mut RgbaImage, color: Rgba<u8>) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    for x in 0..w {
        image.put_pixel(x, 0, color);
        image.put_pixel(x, h - 1, color);
    }
    for y in 0..h {
        image.put_pixel(0, y, color);
        image.put_pixel(w - 1, y, color);
    }
}
