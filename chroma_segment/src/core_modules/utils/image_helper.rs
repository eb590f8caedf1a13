use crate::core_modules::region::Region;
use crate::error::Result;
use image::{ImageEncoder, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// Encodes `image` as PNG at `path`.
pub fn save(path: &Path, image: &RgbImage) -> Result<()> {
    let output = std::fs::File::create(path).map_err(image::ImageError::IoError)?;
    let encoder = image::codecs::png::PngEncoder::new(output);

    encoder.write_image(image.as_raw(), image.width(), image.height(), image::ExtendedColorType::Rgb8)?;

    Ok(())
}

/// File name used for the `index`-th snapshot written to `dir`.
pub fn snapshot_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("segmentation_{index:05}.png"))
}

/// Draws a one-pixel outline just inside `region`, clipped to the image.
pub fn draw_outline(image: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    let x1 = region.bottom_right.x.min(image.width());
    let y1 = region.bottom_right.y.min(image.height());
    let (x0, y0) = (region.top_left.x, region.top_left.y);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    for x in x0..x1 {
        image.put_pixel(x, y0, color);
        image.put_pixel(x, y1 - 1, color);
    }
    for y in y0..y1 {
        image.put_pixel(x0, y, color);
        image.put_pixel(x1 - 1, y, color);
    }
}
