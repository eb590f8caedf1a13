// THEORY:
// The `BlockClassifier` turns a frame into a two-class label map. It is the same grid
// walk the engine has always used for spatial pooling: the frame is cut into square,
// non-overlapping blocks aligned to the top-left corner, and a trailing strip narrower
// than a block is dropped rather than padded.
//
// Per block:
// 1.  **Fingerprint**: the block's pixels are sampled into a finalized `ColorDistribution`.
// 2.  **Match**: the nearest-template distance is computed against both classes.
// 3.  **Decide**: the block is `Object` only if the object distance is strictly smaller;
//     ties go to `Background`.
//
// The resulting `LabelMap` is a compact row-major grid of decisions. Rendering it into a
// full-resolution label image and blending that with a grayscale copy of the source are
// presentation helpers kept next to the classifier so every front-end draws the same
// picture.

use crate::core_modules::color_distribution::HIST_SIZE;
use crate::core_modules::region::{Point, Region};
use crate::core_modules::region_sampler;
use crate::core_modules::template_matcher::nearest;
use crate::core_modules::template_store::{TemplateClass, TemplateStore};
use crate::error::{Result, SegmentError};
use image::{Rgb, RgbImage, imageops};
use std::ops::Range;

/// Display colors used to paint each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgb<u8>,
    pub object: Rgb<u8>,
}

impl Palette {
    pub fn color(&self, class: TemplateClass) -> Rgb<u8> {
        match class {
            TemplateClass::Background => self.background,
            TemplateClass::Object => self.object,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Rgb([0, 0, 0]),
            object: Rgb([255, 0, 0]),
        }
    }
}

/// Per-block classification of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    /// Side of a block in pixels.
    pub block_size: u32,
    /// Number of block columns (frame width / block size).
    pub grid_width: u32,
    /// Number of block rows (frame height / block size).
    pub grid_height: u32,
    /// Row-major block labels.
    pub labels: Vec<TemplateClass>,
}

impl LabelMap {
    pub fn block_count(&self) -> usize {
        self.labels.len()
    }

    /// Label of the block at grid column `bx`, row `by`.
    pub fn label_at(&self, bx: u32, by: u32) -> Option<TemplateClass> {
        if bx >= self.grid_width || by >= self.grid_height {
            return None;
        }
        self.labels.get((by * self.grid_width + bx) as usize).copied()
    }

    pub fn count(&self, class: TemplateClass) -> usize {
        self.labels.iter().filter(|label| **label == class).count()
    }

    /// Paints every pixel of each block with its class color.
    ///
    /// Pixels in the dropped remainder strip carry the background color, so the image
    /// only ever holds the two palette colors.
    pub fn render(&self, width: u32, height: u32, palette: &Palette) -> RgbImage {
        let mut image = RgbImage::from_pixel(width, height, palette.background);
        for (i, label) in self.labels.iter().enumerate() {
            if *label == TemplateClass::Background {
                continue;
            }
            let bx = i as u32 % self.grid_width;
            let by = i as u32 / self.grid_width;
            let color = palette.color(*label);
            for y in by * self.block_size..(by + 1) * self.block_size {
                for x in bx * self.block_size..(bx + 1) * self.block_size {
                    if x < width && y < height {
                        image.put_pixel(x, y, color);
                    }
                }
            }
        }
        image
    }
}

/// Grid dimensions (columns, rows) of full blocks covering a frame.
pub fn grid_dimensions(width: u32, height: u32, block_size: u32) -> Result<(u32, u32)> {
    if block_size == 0 {
        return Err(SegmentError::InvalidBlockSize(block_size));
    }
    Ok((width / block_size, height / block_size))
}

/// Classifies a single region against both template collections.
pub fn classify_region(frame: &RgbImage, region: &Region, store: &TemplateStore) -> Result<TemplateClass> {
    let histogram = region_sampler::sample::<HIST_SIZE>(frame, region)?;
    let background_distance = nearest(
        &histogram,
        store.templates(TemplateClass::Background),
        TemplateClass::Background,
    )?;
    let object_distance = nearest(&histogram, store.templates(TemplateClass::Object), TemplateClass::Object)?;

    if object_distance < background_distance {
        Ok(TemplateClass::Object)
    } else {
        Ok(TemplateClass::Background)
    }
}

/// Classifies the block rows `rows` of `frame`, returning their labels row-major.
///
/// This is the unit of work shared by the sequential classifier and the worker pool.
pub fn classify_rows(
    frame: &RgbImage,
    store: &TemplateStore,
    block_size: u32,
    rows: Range<u32>,
) -> Result<Vec<TemplateClass>> {
    let (grid_width, grid_height) = grid_dimensions(frame.width(), frame.height(), block_size)?;
    let rows = rows.start.min(grid_height)..rows.end.min(grid_height);
    let mut labels = Vec::with_capacity((rows.len() as u32 * grid_width) as usize);

    for by in rows {
        for bx in 0..grid_width {
            let top_left = Point::new(bx * block_size, by * block_size);
            let bottom_right = Point::new(top_left.x + block_size, top_left.y + block_size);
            labels.push(classify_region(frame, &Region::new(top_left, bottom_right), store)?);
        }
    }
    Ok(labels)
}

/// Classifies every full block of `frame`.
///
/// Fails with `NoTemplates` up front if either class is empty: there is no meaningful
/// decision to make for any block in that case.
pub fn classify(frame: &RgbImage, store: &TemplateStore, block_size: u32) -> Result<LabelMap> {
    let (grid_width, grid_height) = grid_dimensions(frame.width(), frame.height(), block_size)?;
    ensure_ready(store)?;

    let labels = classify_rows(frame, store, block_size, 0..grid_height)?;
    Ok(LabelMap {
        block_size,
        grid_width,
        grid_height,
        labels,
    })
}

pub(crate) fn ensure_ready(store: &TemplateStore) -> Result<()> {
    for class in [TemplateClass::Background, TemplateClass::Object] {
        if store.len(class) == 0 {
            return Err(SegmentError::NoTemplates(class));
        }
    }
    Ok(())
}

/// Per-pixel weighted average of the label image and a grayscale copy of `source`.
///
/// `label_weight` is clamped to `0.0..=1.0`; the source gets the remaining weight.
pub fn blend_with_grayscale(labels: &RgbImage, source: &RgbImage, label_weight: f32) -> Result<RgbImage> {
    if labels.dimensions() != source.dimensions() {
        return Err(SegmentError::FrameSizeMismatch {
            left_width: labels.width(),
            left_height: labels.height(),
            right_width: source.width(),
            right_height: source.height(),
        });
    }
    let weight = label_weight.clamp(0.0, 1.0);
    let gray = imageops::grayscale(source);

    let blended = RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let luma = gray.get_pixel(x, y).0[0] as f32;
        let label = labels.get_pixel(x, y).0;
        Rgb(label.map(|channel| (weight * channel as f32 + (1.0 - weight) * luma).round() as u8))
    });
    Ok(blended)
}
