//! Synthetic test picture: three clusters of jittered rectangles, each in a
//! distinct color family, so a 3-color conversion has an obvious answer.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageResult, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const WIDTH: u32 = 400;
pub const HEIGHT: u32 = 300;
pub const JPEG_QUALITY: u8 = 95;
const RECTS_PER_FAMILY: usize = 50;
const RECT_SIZE: i32 = 30;
const JITTER: i32 = 30;

struct Family {
    base: [i32; 3],
    x: (i32, i32),
    y: (i32, i32),
}

const FAMILIES: [Family; 3] = [
    // red
    Family {
        base: [200, 50, 50],
        x: (0, 150),
        y: (0, 150),
    },
    // blue
    Family {
        base: [50, 100, 200],
        x: (200, 350),
        y: (0, 150),
    },
    // green
    Family {
        base: [50, 180, 80],
        x: (100, 300),
        y: (150, 270),
    },
];

pub fn draw(seed: Option<u64>) -> RgbImage {
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut image = RgbImage::new(WIDTH, HEIGHT);
    for family in &FAMILIES {
        for _ in 0..RECTS_PER_FAMILY {
            let color = Rgb(family.base.map(|channel| {
                (channel + rng.random_range(-JITTER..JITTER)).clamp(0, 255) as u8
            }));
            let x0 = rng.random_range(family.x.0..family.x.1);
            let y0 = rng.random_range(family.y.0..family.y.1);
            let x1 = rng.random_range(family.x.0..family.x.1) + RECT_SIZE;
            let y1 = rng.random_range(family.y.0..family.y.1) + RECT_SIZE;
            fill_rect(&mut image, (x0, y0), (x1, y1), color);
        }
    }
    image
}

/// Fills the rectangle spanned by two corners, both inclusive, clipped to
/// the image.
fn fill_rect(image: &mut RgbImage, a: (i32, i32), b: (i32, i32), color: Rgb<u8>) {
    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;
    let (left, right) = (a.0.min(b.0).max(0), a.0.max(b.0).min(max_x));
    let (top, bottom) = (a.1.min(b.1).max(0), a.1.max(b.1).min(max_y));
    for y in top..=bottom {
        for x in left..=right {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

pub fn save_jpeg(image: &RgbImage, path: &Path) -> ImageResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_draw_is_reproducible() {
        assert_eq!(draw(Some(7)).as_raw(), draw(Some(7)).as_raw());
    }

    #[test]
    fn draw_paints_each_family() {
        let image = draw(Some(1));
        assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
        let reddish = image.pixels().any(|Rgb([r, g, b])| *r > 150 && *g < 90 && *b < 90);
        let bluish = image.pixels().any(|Rgb([r, _, b])| *b > 150 && *r < 90);
        let greenish = image.pixels().any(|Rgb([r, g, b])| *g > 140 && *r < 90 && *b < 120);
        assert!(reddish && bluish && greenish);
    }

    #[test]
    fn fill_rect_clips_and_orders_corners() {
        let mut image = RgbImage::new(4, 4);
        fill_rect(&mut image, (10, 2), (2, -5), Rgb([9, 9, 9]));
        assert_eq!(image.get_pixel(3, 0), &Rgb([9, 9, 9]));
        assert_eq!(image.get_pixel(2, 2), &Rgb([9, 9, 9]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(3, 3), &Rgb([0, 0, 0]));
    }
}
