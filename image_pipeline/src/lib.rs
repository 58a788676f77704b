use std::cmp::Ordering;
use std::io::Cursor;

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use irodori_core::{ColorCount, ColorSwatch};
use kmeans_colors::{get_kmeans, Kmeans};
use palette::Srgb;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("image decode failed: {0}")]
    Decode(String),
    #[error("image encode failed: {0}")]
    Encode(String),
    #[error("invalid image dimensions")]
    Dimensions,
    #[error("n_samples={pixels} should be >= n_clusters={colors}")]
    TooFewPixels { pixels: usize, colors: usize },
    #[error("palette size must be between 1 and 255, got {0}")]
    InvalidColorCount(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct PaletteConfig {
    pub n_colors: usize,
    /// Independent k-means runs; the lowest-score run wins.
    pub n_init: u32,
    pub max_iter: usize,
    pub converge: f32,
    pub seed: u64,
    /// Downsizes the clustering sample only; remapping always uses the
    /// full-resolution image.
    pub sample_max_dim: Option<u32>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            n_colors: irodori_core::DEFAULT_COLOR_COUNT as usize,
            n_init: 10,
            max_iter: 300,
            converge: 1e-4,
            seed: 42,
            sample_max_dim: None,
        }
    }
}

impl PaletteConfig {
    pub fn with_color_count(count: ColorCount) -> Self {
        Self {
            n_colors: count.get() as usize,
            ..Self::default()
        }
    }
}

pub struct ImagePipeline {
    config: PaletteConfig,
}

impl ImagePipeline {
    pub fn new(config: PaletteConfig) -> Self {
        Self { config }
    }

    /// Decodes `bytes`, extracts the palette and remaps every pixel onto it.
    pub fn process(&self, bytes: &[u8]) -> Result<PaletteImage, PipelineError> {
        let rgb = decode_rgb8(bytes)?;
        let palette = extract_palette(&rgb, &self.config)?;
        let pixels = map_to_palette(&rgb, &palette);
        Ok(PaletteImage {
            width: pixels.width(),
            height: pixels.height(),
            palette,
            pixels,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PaletteImage {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<Rgb<u8>>,
    pub pixels: RgbImage,
}

impl PaletteImage {
    pub fn swatches(&self) -> Vec<ColorSwatch> {
        self.palette
            .iter()
            .map(|Rgb([r, g, b])| ColorSwatch::from_rgb(*r, *g, *b))
            .collect()
    }

    pub fn to_bmp(&self) -> Result<Vec<u8>, PipelineError> {
        encode_bmp(&self.pixels)
    }
}

/// Decodes any supported format to 8-bit RGB. Images with an alpha channel
/// are composited onto a white background first.
pub fn decode_rgb8(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    let image =
        image::load_from_memory(bytes).map_err(|err| PipelineError::Decode(err.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::Dimensions);
    }
    let rgb = match image.color() {
        ColorType::La8
        | ColorType::La16
        | ColorType::Rgba8
        | ColorType::Rgba16
        | ColorType::Rgba32F => flatten_on_white(&image.to_rgba8()),
        _ => image.to_rgb8(),
    };
    Ok(rgb)
}

pub fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut out = RgbImage::new(width, height);
    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let alpha = src[3] as u32;
        let blend = |channel: u8| -> u8 {
            ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        *dst = Rgb([blend(src[0]), blend(src[1]), blend(src[2])]);
    }
    out
}

/// Finds `config.n_colors` dominant colors with k-means in RGB space.
pub fn extract_palette(
    rgb: &RgbImage,
    config: &PaletteConfig,
) -> Result<Vec<Rgb<u8>>, PipelineError> {
    let colors = config.n_colors;
    if colors == 0 || colors > u8::MAX as usize {
        return Err(PipelineError::InvalidColorCount(colors));
    }
    let sample = resize_to_max_dim(rgb, config.sample_max_dim);
    let pixels: Vec<Srgb<f32>> = sample
        .pixels()
        .map(|Rgb([r, g, b])| Srgb::new(*r, *g, *b).into_format::<f32>())
        .collect();
    if pixels.len() < colors {
        return Err(PipelineError::TooFewPixels {
            pixels: pixels.len(),
            colors,
        });
    }

    let runs = config.n_init.max(1) as u64;
    let best: Option<Kmeans<Srgb<f32>>> = (0..runs)
        .map(|run| {
            get_kmeans(
                colors,
                config.max_iter,
                config.converge,
                false,
                &pixels,
                config.seed.wrapping_add(run),
            )
        })
        .min_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
    let Some(best) = best else {
        return Err(PipelineError::TooFewPixels { pixels: 0, colors });
    };

    let mut palette = cluster_means(&sample, &best);
    // k-means can collapse clusters on images with few distinct colors; the
    // palette always has the requested size.
    if let Some(last) = palette.last().copied() {
        palette.resize(colors, last);
    }
    Ok(palette)
}

/// Integer mean of each cluster's member pixels, truncated toward zero.
/// A cluster with no members keeps its (truncated) centroid.
fn cluster_means(sample: &RgbImage, kmeans: &Kmeans<Srgb<f32>>) -> Vec<Rgb<u8>> {
    let mut sums = vec![([0u64; 3], 0u64); kmeans.centroids.len()];
    for (pixel, &index) in sample.pixels().zip(&kmeans.indices) {
        let Some((sum, count)) = sums.get_mut(index as usize) else {
            continue;
        };
        for (total, channel) in sum.iter_mut().zip(pixel.0) {
            *total += channel as u64;
        }
        *count += 1;
    }
    kmeans
        .centroids
        .iter()
        .zip(sums)
        .map(|(center, (sum, count))| {
            if count == 0 {
                return to_rgb8(*center);
            }
            Rgb(sum.map(|total| (total / count) as u8))
        })
        .collect()
}

/// Replaces every pixel with its nearest palette color (Euclidean RGB; the
/// first of equally close colors wins).
pub fn map_to_palette(rgb: &RgbImage, palette: &[Rgb<u8>]) -> RgbImage {
    if palette.is_empty() {
        return rgb.clone();
    }
    let (width, height) = rgb.dimensions();
    let mut out = RgbImage::new(width, height);
    for (src, dst) in rgb.pixels().zip(out.pixels_mut()) {
        *dst = nearest(*src, palette);
    }
    out
}

pub fn encode_bmp(rgb: &RgbImage) -> Result<Vec<u8>, PipelineError> {
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(PipelineError::Dimensions);
    }
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(rgb.clone())
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Bmp)
        .map_err(|err| PipelineError::Encode(err.to_string()))?;
    Ok(out)
}

fn nearest(pixel: Rgb<u8>, palette: &[Rgb<u8>]) -> Rgb<u8> {
    let mut best = palette[0];
    let mut best_dist = i32::MAX;
    for color in palette {
        let dr = pixel[0] as i32 - color[0] as i32;
        let dg = pixel[1] as i32 - color[1] as i32;
        let db = pixel[2] as i32 - color[2] as i32;
        let dist = dr * dr + dg * dg + db * db;
        if dist < best_dist {
            best_dist = dist;
            best = *color;
        }
    }
    best
}

fn to_rgb8(center: Srgb<f32>) -> Rgb<u8> {
    // The small bias keeps exact integers from falling one level short
    // after the f32 round trip.
    let channel = |value: f32| (value * 255.0 + 1e-3).clamp(0.0, 255.0) as u8;
    Rgb([channel(center.red), channel(center.green), channel(center.blue)])
}

fn resize_to_max_dim(rgb: &RgbImage, max_dim: Option<u32>) -> RgbImage {
    let Some(max_dim) = max_dim else {
        return rgb.clone();
    };
    if max_dim == 0 {
        return rgb.clone();
    }
    let (width, height) = rgb.dimensions();
    let max_axis = width.max(height);
    if max_axis <= max_dim {
        return rgb.clone();
    }
    let scale = max_dim as f32 / max_axis as f32;
    let next_width = ((width as f32) * scale).round().max(1.0) as u32;
    let next_height = ((height as f32) * scale).round().max(1.0) as u32;
    image::imageops::resize(rgb, next_width, next_height, FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    fn three_blocks() -> RgbImage {
        RgbImage::from_fn(30, 10, |x, _| match x / 10 {
            0 => RED,
            1 => GREEN,
            _ => BLUE,
        })
    }

    fn encode_png(image: DynamicImage) -> Vec<u8> {
        let mut out = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("png encode");
        out
    }

    #[test]
    fn palette_finds_flat_blocks() {
        let palette = extract_palette(&three_blocks(), &PaletteConfig::default()).expect("palette");
        let found: HashSet<_> = palette.iter().map(|c| c.0).collect();
        let expected: HashSet<_> = [RED.0, GREEN.0, BLUE.0].into_iter().collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn palette_is_deterministic_for_seed() {
        let config = PaletteConfig::default();
        let first = extract_palette(&three_blocks(), &config).expect("palette");
        let second = extract_palette(&three_blocks(), &config).expect("palette");
        assert_eq!(first, second);
    }

    #[test]
    fn remap_only_uses_palette_colors() {
        let image = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 40]));
        let config = PaletteConfig {
            n_colors: 4,
            ..PaletteConfig::default()
        };
        let palette = extract_palette(&image, &config).expect("palette");
        let mapped = map_to_palette(&image, &palette);
        let allowed: HashSet<_> = palette.iter().map(|c| c.0).collect();
        assert!(mapped.pixels().all(|p| allowed.contains(&p.0)));
    }

    #[test]
    fn palette_centers_truncate_toward_zero() {
        let image = RgbImage::from_fn(3, 1, |x, _| Rgb([if x == 2 { 102 } else { 100 }, 0, 0]));
        let config = PaletteConfig {
            n_colors: 1,
            ..PaletteConfig::default()
        };
        let palette = extract_palette(&image, &config).expect("palette");
        assert_eq!(palette, vec![Rgb([100, 0, 0])]);
    }

    #[test]
    fn palette_is_padded_to_requested_size() {
        let flat = RgbImage::from_pixel(20, 20, Rgb([200, 10, 10]));
        let palette = extract_palette(&flat, &PaletteConfig::default()).expect("palette");
        assert_eq!(palette.len(), 3);
        assert!(palette.iter().all(|color| *color == Rgb([200, 10, 10])));
    }

    #[test]
    fn nearest_prefers_first_on_ties() {
        let palette = [Rgb([0, 0, 0]), Rgb([2, 0, 0])];
        assert_eq!(nearest(Rgb([1, 0, 0]), &palette), Rgb([0, 0, 0]));
    }

    #[test]
    fn too_few_pixels_is_an_error() {
        let tiny = RgbImage::from_pixel(1, 2, RED);
        let err = extract_palette(&tiny, &PaletteConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::TooFewPixels { pixels: 2, colors: 3 }));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let rgba = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([10, 20, 30, 0])
            } else {
                image::Rgba([10, 20, 30, 255])
            }
        });
        let bytes = encode_png(DynamicImage::ImageRgba8(rgba));
        let rgb = decode_rgb8(&bytes).expect("decode");
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn transparent_luma_alpha_becomes_white() {
        let la = image::GrayAlphaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::LumaA([0, 0])
            } else {
                image::LumaA([40, 255])
            }
        });
        let bytes = encode_png(DynamicImage::ImageLumaA8(la));
        let rgb = decode_rgb8(&bytes).expect("decode");
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([40, 40, 40]));
    }

    #[test]
    fn process_produces_bmp_and_swatches() {
        let bytes = encode_png(DynamicImage::ImageRgb8(three_blocks()));
        let pipeline = ImagePipeline::new(PaletteConfig::with_color_count(ColorCount::new(3)));
        let result = pipeline.process(&bytes).expect("process");
        assert_eq!((result.width, result.height), (30, 10));

        let mut hexes: Vec<_> = result.swatches().into_iter().map(|s| s.hex).collect();
        hexes.sort();
        assert_eq!(hexes, vec!["#0000ff", "#00ff00", "#ff0000"]);

        let bmp = result.to_bmp().expect("bmp");
        assert!(bmp.starts_with(b"BM"));
        let decoded = image::load_from_memory_with_format(&bmp, ImageFormat::Bmp).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (30, 10));
    }

    #[test]
    fn sample_downsize_keeps_aspect() {
        let image = RgbImage::from_pixel(400, 200, RED);
        let sample = resize_to_max_dim(&image, Some(100));
        assert_eq!(sample.dimensions(), (100, 50));
        let untouched = resize_to_max_dim(&image, Some(1000));
        assert_eq!(untouched.dimensions(), (400, 200));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            decode_rgb8(b"not an image"),
            Err(PipelineError::Decode(_))
        ));
    }
}
