// THEORY:
// The `parallel_pipeline` runs block classification on a pool of tokio workers while
// calibration keeps appending templates from another task.
//
// Key architectural principles:
// 1.  **Copy-on-read templates**: The `TemplateStore` lives behind a `RwLock`. Each frame
//     clones it under a read lock into an `Arc` snapshot before any work is dispatched,
//     so a classification never observes a store mid-append and captures never wait on
//     a whole frame's worth of classification.
// 2.  **Band decomposition**: The block grid is cut into horizontal bands of block rows.
//     Each band is one `BandTask`, classified with the same `classify_rows` routine the
//     sequential pipeline uses, so both paths produce identical label maps.
// 3.  **Round-robin dispatch**: A dispatcher task spreads incoming bands across the worker
//     channels. Each worker hands its band to the blocking pool so the async threads stay
//     free. Results come back over oneshot channels and are reassembled in band order.

use crate::core_modules::block_classifier::{self, LabelMap};
use crate::core_modules::color_distribution::HIST_SIZE;
use crate::core_modules::region::Region;
use crate::core_modules::region_sampler;
use crate::core_modules::template_store::{TemplateClass, TemplateStore};
use crate::error::{Result, SegmentError};
use crate::pipeline::{Report, Segmentation, SegmentationConfig};
use image::RgbImage;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};

/// One band of block rows to classify against a template snapshot.
pub struct BandTask {
    pub frame: Arc<RgbImage>,
    pub templates: Arc<TemplateStore>,
    pub block_size: u32,
    pub rows: Range<u32>,
    pub result_sender: oneshot::Sender<Result<Vec<TemplateClass>>>,
}

pub struct WorkerPool {
    task_sender: mpsc::UnboundedSender<BandTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers plus a dispatcher. Must be called inside a tokio runtime.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<BandTask>();
        let mut workers = Vec::with_capacity(size);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel::<BandTask>()).unzip();

        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        for mut worker_receiver in worker_receivers {
            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let BandTask {
                        frame,
                        templates,
                        block_size,
                        rows,
                        result_sender,
                    } = task;
                    // Classification is CPU-bound; keep it off the async worker threads.
                    let labels = tokio::task::spawn_blocking(move || {
                        block_classifier::classify_rows(&frame, &templates, block_size, rows)
                    })
                    .await
                    .unwrap_or(Err(SegmentError::WorkerPool("Band classification task failed")));
                    let _ = result_sender.send(labels);
                }
            });
            workers.push(worker);
        }

        Self { task_sender, workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues one band and waits for its labels.
    pub async fn classify_band(
        &self,
        frame: Arc<RgbImage>,
        templates: Arc<TemplateStore>,
        block_size: u32,
        rows: Range<u32>,
    ) -> Result<Vec<TemplateClass>> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = BandTask {
            frame,
            templates,
            block_size,
            rows,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| SegmentError::WorkerPool("Failed to send task to worker pool"))?;

        result_receiver
            .await
            .map_err(|_| SegmentError::WorkerPool("Failed to receive result from worker"))?
    }
}

/// Splits `0..rows` into at most `bands` contiguous, non-empty ranges.
pub fn band_ranges(rows: u32, bands: usize) -> Vec<Range<u32>> {
    let bands = (bands.max(1) as u32).min(rows.max(1));
    let base = rows / bands;
    let extra = rows % bands;
    let mut ranges = Vec::with_capacity(bands as usize);
    let mut start = 0;
    for band in 0..bands {
        let len = base + u32::from(band < extra);
        if len > 0 {
            ranges.push(start..start + len);
        }
        start += len;
    }
    ranges
}

/// Segmentation engine whose templates may be updated while frames are classified.
pub struct ParallelPipeline {
    config: SegmentationConfig,
    worker_pool: WorkerPool,
    templates: Arc<RwLock<TemplateStore>>,
}

impl ParallelPipeline {
    /// Must be called inside a tokio runtime.
    pub fn new(config: SegmentationConfig) -> Self {
        let worker_pool = WorkerPool::new(config.workers);
        Self {
            config,
            worker_pool,
            templates: Arc::new(RwLock::new(TemplateStore::new())),
        }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Samples `region` of `frame` into the `class` collection.
    /// Returns the number of templates now held for that class.
    pub async fn capture(&self, class: TemplateClass, frame: &RgbImage, region: &Region) -> Result<usize> {
        let template = region_sampler::sample::<HIST_SIZE>(frame, region)?;
        let mut templates = self.templates.write().await;
        templates.add(class, template);
        let count = templates.len(class);
        log::info!("captured {} template #{} from {:?}", class, count, region);
        Ok(count)
    }

    pub async fn reset_templates(&self) {
        self.templates.write().await.clear();
        log::info!("templates cleared");
    }

    /// A consistent copy of the current templates.
    pub async fn snapshot(&self) -> Arc<TemplateStore> {
        Arc::new(self.templates.read().await.clone())
    }

    /// Classifies every block of `frame` across the worker pool.
    pub async fn generate_report(&self, frame: &RgbImage) -> Result<Report> {
        let block_size = self.config.block_size;
        let (grid_width, grid_height) = block_classifier::grid_dimensions(frame.width(), frame.height(), block_size)?;

        let templates = self.snapshot().await;
        if let Err(SegmentError::NoTemplates(class)) = block_classifier::ensure_ready(&templates) {
            log::warn!("classification unavailable: no {} templates", class);
            return Ok(Report::Unavailable(class));
        }

        let frame = Arc::new(frame.clone());
        let bands = band_ranges(grid_height, self.worker_pool.size());
        let band_results = futures::future::try_join_all(bands.into_iter().map(|rows| {
            self.worker_pool
                .classify_band(Arc::clone(&frame), Arc::clone(&templates), block_size, rows)
        }))
        .await?;

        let label_map = LabelMap {
            block_size,
            grid_width,
            grid_height,
            labels: band_results.into_iter().flatten().collect(),
        };
        log::debug!(
            "classified {} blocks on {} workers, {} object",
            label_map.block_count(),
            self.worker_pool.size(),
            label_map.count(TemplateClass::Object)
        );
        Ok(Report::Segmented(Segmentation::new(label_map)))
    }
}
