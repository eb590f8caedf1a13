use anyhow::{Context, Result, bail};
use chroma_segment::core_modules::block_classifier::Palette;
use chroma_segment::pipeline::SegmentationConfig;
use chroma_segment::session::{Command, Harness, Session};
use clap::Parser;
use image::{Rgb, RgbImage};
use opencv::{
    core::{self, Mat, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::PathBuf;

const WINDOW_NAME: &str = "input";

#[derive(Parser, Debug)]
#[command(name = "visual_tester", about = "Interactive color-histogram segmentation of a camera or video feed")]
struct Args {
    /// Camera index to open when no file is given.
    #[arg(long, default_value_t = 0)]
    camera: i32,
    /// Read frames from a video file instead of a camera.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    #[arg(long, default_value_t = 640)]
    width: u32,
    #[arg(long, default_value_t = 480)]
    height: u32,
    #[arg(long, default_value_t = 16)]
    block_size: u32,
    #[arg(long, default_value_t = 50)]
    sample_size: u32,
    /// Weight of the label colors when blended over the grayscale frame.
    #[arg(long, default_value_t = 0.5)]
    overlay_weight: f32,
    #[arg(long, value_parser = parse_color, default_value = "0,0,0")]
    background_color: Rgb<u8>,
    #[arg(long, value_parser = parse_color, default_value = "255,0,0")]
    object_color: Rgb<u8>,
    /// Delay between key polls; 50 ms is about 20 frames per second.
    #[arg(long, default_value_t = 50)]
    delay_ms: i32,
    #[arg(long, default_value = ".")]
    snapshot_dir: PathBuf,
}

/// Parses an `r,g,b` triple.
fn parse_color(value: &str) -> Result<Rgb<u8>> {
    let channels = value
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid color {value:?}"))?;
    match channels.as_slice() {
        [r, g, b] => Ok(Rgb([*r, *g, *b])),
        _ => bail!("expected three comma-separated channels, got {value:?}"),
    }
}

/// Camera/video acquisition, window display and keyboard polling through OpenCV.
struct OpenCvHarness {
    capture: VideoCapture,
    delay_ms: i32,
    bgr: Mat,
}

impl OpenCvHarness {
    fn open(args: &Args) -> Result<Self> {
        let mut capture = match &args.file {
            Some(path) => {
                let path = path.to_str().context("video path is not valid UTF-8")?;
                VideoCapture::from_file(path, videoio::CAP_ANY)?
            }
            None => VideoCapture::new(args.camera, videoio::CAP_ANY)?,
        };
        if !capture.is_opened()? {
            bail!("couldn't open image / camera");
        }
        if args.file.is_none() {
            capture.set(videoio::CAP_PROP_FRAME_WIDTH, args.width as f64)?;
            capture.set(videoio::CAP_PROP_FRAME_HEIGHT, args.height as f64)?;
        }
        highgui::named_window(WINDOW_NAME, highgui::WINDOW_AUTOSIZE).context("failed to create window")?;

        Ok(Self {
            capture,
            delay_ms: args.delay_ms,
            bgr: Mat::default(),
        })
    }
}

impl Harness for OpenCvHarness {
    type Error = anyhow::Error;

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if !self.capture.read(&mut self.bgr)? || self.bgr.empty() {
            return Ok(None);
        }
        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let size = rgb.size()?;
        let frame = RgbImage::from_raw(size.width as u32, size.height as u32, rgb.data_bytes()?.to_vec())
            .context("camera frame is not a packed 8-bit RGB buffer")?;
        Ok(Some(frame))
    }

    fn poll_command(&mut self) -> Result<Option<Command>> {
        let key = highgui::wait_key(self.delay_ms)?;
        if key < 0 {
            return Ok(None);
        }
        Ok(char::from_u32((key & 0xff) as u32).and_then(Command::from_key))
    }

    fn render(&mut self, frame: &RgbImage) -> Result<()> {
        let mut rgb = Mat::new_rows_cols_with_default(
            frame.height() as i32,
            frame.width() as i32,
            core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
        let mut bgr = Mat::default();
        imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
        highgui::imshow(WINDOW_NAME, &bgr)?;
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = SegmentationConfig {
        block_size: args.block_size,
        sample_size: args.sample_size,
        palette: Palette {
            background: args.background_color,
            object: args.object_color,
        },
        overlay_weight: args.overlay_weight,
        ..SegmentationConfig::default()
    };
    log::info!("starting with {:?}", config);
    log::info!("keys: b=background a=object r=reset c=classify v=compare f=freeze s=snapshot q=quit");

    let mut harness = OpenCvHarness::open(&args)?;
    let mut session = Session::new(config, args.snapshot_dir.clone());
    session.run(&mut harness)?;

    log::info!("session ended, {} snapshot(s) saved", session.snapshots_taken());
    Ok(())
}
