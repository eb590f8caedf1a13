// THEORY:
// The `pipeline` module is the top-level API of the segmentation engine. It owns the
// calibration state (a `TemplateStore`) and exposes the handful of operations a
// front-end needs: capture a labeled sample, forget all samples, classify a frame,
// compare the two halves of a frame, and render a classification for display.
//
// The pipeline is synchronous and single-threaded. Templates are only appended through
// `capture` and only read during `generate_report`, so there is nothing to lock. The
// concurrent variant lives in `parallel_pipeline`.

use crate::core_modules::block_classifier::{self, LabelMap, Palette};
use crate::core_modules::color_distribution::HIST_SIZE;
use crate::core_modules::region::Region;
use crate::core_modules::region_sampler;
use crate::core_modules::template_store::TemplateStore;
use crate::error::{Result, SegmentError};
use image::RgbImage;

// Re-export key data structures for the public API.
pub use crate::core_modules::template_store::{Template, TemplateClass};

/// Configuration for the segmentation engine.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Side of a classification block in pixels.
    pub block_size: u32,
    /// Side of the centered calibration square in pixels.
    pub sample_size: u32,
    /// Colors used to paint each class in the label image.
    pub palette: Palette,
    /// Weight of the label image when blended with the grayscale source (0.0..=1.0).
    pub overlay_weight: f32,
    /// Number of workers used by the parallel pipeline.
    pub workers: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            block_size: 16,
            sample_size: 50,
            palette: Palette::default(),
            overlay_weight: 0.5,
            workers: num_cpus::get(),
        }
    }
}

/// Per-frame classification summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub label_map: LabelMap,
    /// Share of blocks labeled as object, 0.0 when the frame has no full block.
    pub object_fraction: f64,
}

impl Segmentation {
    pub fn new(label_map: LabelMap) -> Self {
        let blocks = label_map.block_count();
        let object_fraction = if blocks == 0 {
            0.0
        } else {
            label_map.count(TemplateClass::Object) as f64 / blocks as f64
        };
        Self {
            label_map,
            object_fraction,
        }
    }
}

/// The primary output of the pipeline for a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// At least one class has no template yet; nothing was classified this frame.
    Unavailable(TemplateClass),
    Segmented(Segmentation),
}

/// The main, top-level struct for the segmentation engine.
pub struct SegmentationPipeline {
    config: SegmentationConfig,
    templates: TemplateStore,
    last_label_map: Option<LabelMap>,
}

impl SegmentationPipeline {
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            config,
            templates: TemplateStore::new(),
            last_label_map: None,
        }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Samples `region` of `frame` and stores it as a template of `class`.
    /// Returns the number of templates now held for that class.
    pub fn capture(&mut self, class: TemplateClass, frame: &RgbImage, region: &Region) -> Result<usize> {
        let template = region_sampler::sample::<HIST_SIZE>(frame, region)?;
        self.templates.add(class, template);
        let count = self.templates.len(class);
        log::info!("captured {} template #{} from {:?}", class, count, region);
        Ok(count)
    }

    /// Captures the centered calibration square.
    pub fn capture_centered(&mut self, class: TemplateClass, frame: &RgbImage) -> Result<usize> {
        let region = self.calibration_region(frame.width(), frame.height());
        self.capture(class, frame, &region)
    }

    pub fn calibration_region(&self, width: u32, height: u32) -> Region {
        Region::centered(width, height, self.config.sample_size)
    }

    pub fn reset_templates(&mut self) {
        self.templates.clear();
        self.last_label_map = None;
        log::info!("templates cleared");
    }

    /// Classifies every block of `frame`.
    ///
    /// A missing class is a transient state, not an error: it yields
    /// [`Report::Unavailable`].
    pub fn generate_report(&mut self, frame: &RgbImage) -> Result<Report> {
        match block_classifier::classify(frame, &self.templates, self.config.block_size) {
            Ok(label_map) => {
                let segmentation = Segmentation::new(label_map);
                log::debug!(
                    "classified {} blocks, {} object",
                    segmentation.label_map.block_count(),
                    segmentation.label_map.count(TemplateClass::Object)
                );
                self.last_label_map = Some(segmentation.label_map.clone());
                Ok(Report::Segmented(segmentation))
            }
            Err(SegmentError::NoTemplates(class)) => {
                log::warn!("classification unavailable: no {} templates", class);
                self.last_label_map = None;
                Ok(Report::Unavailable(class))
            }
            Err(e) => Err(e),
        }
    }

    /// Chi-squared distance between the left and right halves of `frame`.
    pub fn compare_halves(&self, frame: &RgbImage) -> Result<f32> {
        compare_halves(frame)
    }

    /// Label image for `label_map`, blended with a grayscale copy of `frame`.
    pub fn render(&self, frame: &RgbImage, label_map: &LabelMap) -> Result<RgbImage> {
        let labels = label_map.render(frame.width(), frame.height(), &self.config.palette);
        block_classifier::blend_with_grayscale(&labels, frame, self.config.overlay_weight)
    }

    pub fn get_last_label_map(&self) -> Option<&LabelMap> {
        self.last_label_map.as_ref()
    }
}

/// Chi-squared distance between the left and right halves of `frame`.
pub fn compare_halves(frame: &RgbImage) -> Result<f32> {
    let (left, right) = Region::halves(frame.width(), frame.height());
    let left = region_sampler::sample::<HIST_SIZE>(frame, &left)?;
    let right = region_sampler::sample::<HIST_SIZE>(frame, &right)?;
    let distance = left.try_distance(&right)?;
    log::info!("left/right distance: {}", distance);
    Ok(distance)
}
