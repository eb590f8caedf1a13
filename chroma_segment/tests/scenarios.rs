use chroma_segment::core_modules::block_classifier::{self, Palette};
use chroma_segment::core_modules::color_distribution::{ColorDistribution, NOT_READY};
use chroma_segment::core_modules::region::{Point, Region};
use chroma_segment::core_modules::region_sampler::sample;
use chroma_segment::core_modules::template_matcher::nearest;
use chroma_segment::core_modules::template_store::{Template, TemplateClass, TemplateStore};
use image::{Rgb, RgbImage};

fn checkerboard(width: u32, height: u32, a: Rgb<u8>, b: Rgb<u8>) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| if (x + y) % 2 == 0 { a } else { b })
}

#[test]
fn flat_region_fills_exactly_one_bin() {
    let frame = RgbImage::from_pixel(30, 20, Rgb([70, 140, 210]));
    let histogram = sample::<8>(&frame, &Region::full(30, 20)).unwrap();

    let bins: Vec<f32> = histogram.bins().collect();
    assert_eq!(bins.len(), 512);
    assert_eq!(bins.iter().filter(|bin| **bin == 1.0).count(), 1);
    assert_eq!(bins.iter().filter(|bin| **bin == 0.0).count(), 511);
    assert_eq!(histogram.bin(2, 4, 6), 1.0);
}

#[test]
fn distance_separates_quantized_colors() {
    let frame = RgbImage::from_fn(40, 10, |x, _| match x {
        0..10 => Rgb([10, 10, 10]),
        10..20 => Rgb([25, 5, 30]),
        _ => Rgb([200, 10, 10]),
    });
    let first = sample::<8>(&frame, &Region::new(Point::new(0, 0), Point::new(10, 10))).unwrap();
    let same_bin = sample::<8>(&frame, &Region::new(Point::new(10, 0), Point::new(20, 10))).unwrap();
    let other = sample::<8>(&frame, &Region::new(Point::new(20, 0), Point::new(40, 10))).unwrap();

    assert_eq!(first.distance(&same_bin), 0.0);
    assert!(first.distance(&other) > 0.0);
}

#[test]
fn finalized_distributions_behave_as_a_metric() {
    let frame = checkerboard(16, 16, Rgb([0, 100, 200]), Rgb([255, 30, 90]));
    let a = sample::<8>(&frame, &Region::full(16, 16)).unwrap();
    let b = sample::<8>(&frame, &Region::new(Point::new(0, 0), Point::new(3, 1))).unwrap();

    let total: f32 = a.bins().sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert_eq!(a.distance(&a), 0.0);
    assert_eq!(a.distance(&b), b.distance(&a));
    assert!(a.distance(&b) >= 0.0);
}

#[test]
fn open_distribution_yields_not_ready_sentinel() {
    let mut open = ColorDistribution::<8>::new();
    for value in 0..=255u8 {
        open.add(Rgb([value, value, value]));
    }
    let closed = sample::<8>(&RgbImage::new(4, 4), &Region::full(4, 4)).unwrap();
    assert_eq!(open.distance(&closed), NOT_READY);
    assert_eq!(closed.distance(&open), NOT_READY);
}

#[test]
fn exact_background_match_wins() {
    let background = Rgb([40, 160, 40]);
    let block = RgbImage::from_pixel(8, 8, background);
    let template: Template = sample(&block, &Region::full(8, 8)).unwrap();

    let mut store = TemplateStore::new();
    store.add(TemplateClass::Background, template.clone());
    store.add(
        TemplateClass::Object,
        sample(&RgbImage::from_pixel(8, 8, Rgb([200, 40, 40])), &Region::full(8, 8)).unwrap(),
    );
    store.add(
        TemplateClass::Object,
        sample(&checkerboard(8, 8, background, Rgb([0, 0, 255])), &Region::full(8, 8)).unwrap(),
    );

    assert_eq!(
        nearest(&template, store.templates(TemplateClass::Background), TemplateClass::Background).unwrap(),
        0.0
    );
    assert!(nearest(&template, store.templates(TemplateClass::Object), TemplateClass::Object).unwrap() > 0.0);

    let map = block_classifier::classify(&block, &store, 8).unwrap();
    assert_eq!(map.labels, vec![TemplateClass::Background]);
}

#[test]
fn remainder_strips_are_dropped() {
    let mut store = TemplateStore::new();
    let flat = |color: Rgb<u8>| -> Template { sample(&RgbImage::from_pixel(2, 2, color), &Region::full(2, 2)).unwrap() };
    store.add(TemplateClass::Background, flat(Rgb([0, 0, 0])));
    store.add(TemplateClass::Object, flat(Rgb([255, 255, 255])));

    for (width, height, block_size) in [(103, 77, 10), (64, 48, 16), (15, 15, 16), (33, 9, 4)] {
        let frame = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let map = block_classifier::classify(&frame, &store, block_size).unwrap();
        assert_eq!(map.block_count() as u32, (width / block_size) * (height / block_size));
        assert_eq!(map.count(TemplateClass::Object), map.block_count());

        let image = map.render(width, height, &Palette::default());
        assert_eq!(image.dimensions(), (width, height));
        if width % block_size != 0 {
            assert_eq!(*image.get_pixel(width - 1, 0), Palette::default().background);
        }
    }
}

#[test]
fn frames_larger_than_f32_precision_still_normalize() {
    // 4200 * 4000 = 16_800_000 pixels, past the 2^24 an f32 counter can track.
    let (width, height) = (4200, 4000);
    let frame = RgbImage::from_pixel(width, height, Rgb([90, 90, 90]));
    let histogram = sample::<8>(&frame, &Region::full(width, height)).unwrap();

    assert_eq!(histogram.sample_count(), width * height);
    assert_eq!(histogram.count(2, 2, 2), width * height);
    assert_eq!(histogram.bin(2, 2, 2), 1.0);
    let total: f32 = histogram.bins().sum();
    assert!((total - 1.0).abs() < 1e-6);
}
