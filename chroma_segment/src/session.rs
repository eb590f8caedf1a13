// THEORY:
// The `session` module is the calibration workflow. It sits between the interactive
// front-end (camera, window, keyboard) and the `SegmentationPipeline`, and is the only
// place that knows what a key press means.
//
// The front-end is an external collaborator behind the `Harness` trait: it hands out
// frames (`next_frame`), reports commands (`poll_command`) and displays whatever the
// session produces (`render`). The session never touches a device itself, which keeps
// the whole workflow testable with scripted frames and commands.
//
// Two views:
// - **Calibration**: the live frame with the calibration square outlined. Samples are
//   taken from that square.
// - **Classification**: the label image blended over a grayscale copy of the frame.
//   While a class has no template yet, the session falls back to the calibration view.

use crate::core_modules::utils::image_helper;
use crate::error::{Result, SegmentError};
use crate::pipeline::{Report, SegmentationConfig, SegmentationPipeline, TemplateClass};
use image::{Rgb, RgbImage};
use std::path::PathBuf;

const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Calibration actions and view controls a front-end can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CaptureBackground,
    CaptureObject,
    ResetTemplates,
    ToggleClassification,
    CompareHalves,
    ToggleFreeze,
    Snapshot,
    Quit,
}

impl Command {
    /// Keyboard binding used by the interactive front-end.
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'b' => Some(Command::CaptureBackground),
            'a' => Some(Command::CaptureObject),
            'r' => Some(Command::ResetTemplates),
            'c' => Some(Command::ToggleClassification),
            'v' => Some(Command::CompareHalves),
            'f' => Some(Command::ToggleFreeze),
            's' => Some(Command::Snapshot),
            'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Calibration,
    Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The interactive surroundings of a session.
pub trait Harness {
    type Error: From<SegmentError>;

    /// Blocks until the next frame is available; `None` ends the session.
    fn next_frame(&mut self) -> std::result::Result<Option<RgbImage>, Self::Error>;

    /// The command triggered since the last call, if any.
    fn poll_command(&mut self) -> std::result::Result<Option<Command>, Self::Error>;

    fn render(&mut self, frame: &RgbImage) -> std::result::Result<(), Self::Error>;
}

pub struct Session {
    pipeline: SegmentationPipeline,
    mode: Mode,
    frozen: bool,
    current_frame: Option<RgbImage>,
    last_rendered: Option<RgbImage>,
    last_distance: Option<f32>,
    snapshot_dir: PathBuf,
    snapshots_taken: u64,
}

impl Session {
    pub fn new(config: SegmentationConfig, snapshot_dir: PathBuf) -> Self {
        Self {
            pipeline: SegmentationPipeline::new(config),
            mode: Mode::Calibration,
            frozen: false,
            current_frame: None,
            last_rendered: None,
            last_distance: None,
            snapshot_dir,
            snapshots_taken: 0,
        }
    }

    pub fn pipeline(&self) -> &SegmentationPipeline {
        &self.pipeline
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Distance reported by the most recent `CompareHalves`.
    pub fn last_distance(&self) -> Option<f32> {
        self.last_distance
    }

    pub fn snapshots_taken(&self) -> u64 {
        self.snapshots_taken
    }

    /// Drives the session until the harness runs out of frames or a `Quit` arrives.
    pub fn run<H: Harness>(&mut self, harness: &mut H) -> std::result::Result<(), H::Error> {
        loop {
            let command = harness.poll_command()?;

            if !self.frozen || self.current_frame.is_none() {
                match harness.next_frame()? {
                    Some(frame) => self.current_frame = Some(frame),
                    None => break,
                }
            }
            let Some(frame) = self.current_frame.take() else {
                break;
            };

            let flow = match command {
                Some(command) => self.apply(command, &frame)?,
                None => Flow::Continue,
            };
            if flow == Flow::Quit {
                break;
            }

            let view = self.present(&frame)?;
            harness.render(&view)?;
            self.current_frame = Some(frame);
        }
        Ok(())
    }

    /// Applies one command against the frame currently on screen.
    pub fn apply(&mut self, command: Command, frame: &RgbImage) -> Result<Flow> {
        match command {
            Command::CaptureBackground => self.capture(TemplateClass::Background, frame),
            Command::CaptureObject => self.capture(TemplateClass::Object, frame),
            Command::ResetTemplates => self.pipeline.reset_templates(),
            Command::ToggleClassification => {
                self.mode = match self.mode {
                    Mode::Calibration => Mode::Classification,
                    Mode::Classification => Mode::Calibration,
                };
                log::info!("switched to {:?} view", self.mode);
            }
            Command::CompareHalves => match self.pipeline.compare_halves(frame) {
                Ok(distance) => self.last_distance = Some(distance),
                Err(e) => log::warn!("cannot compare frame halves: {}", e),
            },
            Command::ToggleFreeze => {
                self.frozen = !self.frozen;
                log::info!("frame {}", if self.frozen { "frozen" } else { "released" });
            }
            Command::Snapshot => self.snapshot(),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Produces the image to display for `frame` in the current mode.
    pub fn present(&mut self, frame: &RgbImage) -> Result<RgbImage> {
        let view = match self.mode {
            Mode::Classification => match self.pipeline.generate_report(frame)? {
                Report::Segmented(segmentation) => self.pipeline.render(frame, &segmentation.label_map)?,
                Report::Unavailable(_) => self.calibration_view(frame),
            },
            Mode::Calibration => self.calibration_view(frame),
        };
        self.last_rendered = Some(view.clone());
        Ok(view)
    }

    fn calibration_view(&self, frame: &RgbImage) -> RgbImage {
        let mut view = frame.clone();
        let region = self.pipeline.calibration_region(frame.width(), frame.height());
        image_helper::draw_outline(&mut view, &region, OUTLINE_COLOR);
        view
    }

    fn capture(&mut self, class: TemplateClass, frame: &RgbImage) {
        if let Err(e) = self.pipeline.capture_centered(class, frame) {
            log::warn!("rejected {} sample: {}", class, e);
        }
    }

    fn snapshot(&mut self) {
        let Some(view) = &self.last_rendered else {
            log::warn!("nothing rendered yet, snapshot skipped");
            return;
        };
        let path = image_helper::snapshot_path(&self.snapshot_dir, self.snapshots_taken);
        match image_helper::save(&path, view) {
            Ok(()) => {
                self.snapshots_taken += 1;
                log::info!("saved snapshot to {}", path.display());
            }
            Err(e) => log::warn!("failed to save snapshot to {}: {}", path.display(), e),
        }
    }
}
