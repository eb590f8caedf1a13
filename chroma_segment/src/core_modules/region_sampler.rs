// THEORY:
// The `RegionSampler` is the bridge between raw frames and fingerprints. It walks every
// pixel of a rectangle, feeds it into a fresh `ColorDistribution` and finalizes the
// result, so whatever it returns is always ready for comparison. The rectangle is
// checked up front: an empty region would leave nothing to normalize by, and an
// out-of-bounds one would read past the frame.

use crate::core_modules::color_distribution::ColorDistribution;
use crate::core_modules::region::Region;
use crate::error::Result;
use image::RgbImage;

/// Builds the finalized color distribution of `region` within `frame`.
pub fn sample<const K: usize>(frame: &RgbImage, region: &Region) -> Result<ColorDistribution<K>> {
    region.validate(frame.width(), frame.height())?;

    let mut distribution = ColorDistribution::<K>::new();
    for y in region.top_left.y..region.bottom_right.y {
        for x in region.top_left.x..region.bottom_right.x {
            distribution.add(*frame.get_pixel(x, y));
        }
    }
    distribution.finalize()?;
    Ok(distribution)
}
