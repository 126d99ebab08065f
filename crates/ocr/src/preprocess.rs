use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{NormalizedImage, PassThroughReason, RawImage};

/// Inputs larger than this on either side are handed through untouched.
pub const MAX_INPUT_DIMENSION: u32 = 5000;
/// Longest side of the normalized canvas.
pub const TARGET_MAX_DIMENSION: u32 = 3000;
/// Small images are enlarged at most this much.
pub const MAX_UPSCALE: f64 = 3.0;

/// Luminance above `BAND_HIGH * t` is always background.
pub const BAND_HIGH: f32 = 1.1;
/// Luminance below `BAND_LOW * t` is always ink.
pub const BAND_LOW: f32 = 0.9;

pub const SHARPEN_CONTRAST: f32 = 1.2;
pub const SHARPEN_BRIGHTNESS: f32 = 1.1;

pub const DEFAULT_BUDGET: Duration = Duration::from_secs(10);

// ── Geometry ──────────────────────────────────────────────────────────────────

pub fn dimensions_acceptable(width: u32, height: u32) -> bool {
    width > 0 && height > 0 && width <= MAX_INPUT_DIMENSION && height <= MAX_INPUT_DIMENSION
}

/// `min(3, 3000 / longest side)`.
pub fn scale_factor(width: u32, height: u32) -> f64 {
    let longest = width.max(height).max(1);
    (TARGET_MAX_DIMENSION as f64 / longest as f64).min(MAX_UPSCALE)
}

/// Canvas size for an input of `width`×`height`: each side is `floor(dim * scale)`.
/// The longest side is computed exactly as `min(3 * longest, 3000)` so float
/// rounding can never land it one pixel short.
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height);
    let target_longest = longest
        .saturating_mul(MAX_UPSCALE as u32)
        .min(TARGET_MAX_DIMENSION)
        .max(1);
    let scale = scale_factor(width, height);
    let fit = |dim: u32| {
        if dim == longest {
            target_longest
        } else {
            ((dim as f64 * scale).floor() as u32).clamp(1, target_longest)
        }
    };
    (fit(width), fit(height))
}

// ── Luminance & thresholding ──────────────────────────────────────────────────

/// ITU-R BT.601 luma, unrounded.
pub fn luminance(p: &Rgb<u8>) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

pub fn luminance_histogram(img: &RgbImage) -> [u32; 256] {
    let mut histogram = [0u32; 256];
    for p in img.pixels() {
        let gray = luminance(p).round().clamp(0.0, 255.0) as usize;
        histogram[gray] += 1;
    }
    histogram
}

/// Otsu's method: the level maximizing between-class variance
/// `wB * wF * (mB - mF)^2`, where the background class is every level up to
/// and including the candidate. When several levels share the maximum (empty
/// bins between the two classes) their mean is returned.
pub fn otsu_threshold(histogram: &[u32; 256]) -> u8 {
    let total: u64 = histogram.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return 0;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_b = 0.0f64;
    let mut w_b = 0u64;
    let mut max_between = 0.0f64;
    let (mut level_sum, mut level_count) = (0usize, 0usize);

    for (i, &count) in histogram.iter().enumerate() {
        w_b += count as u64;
        if w_b == 0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f == 0 {
            break;
        }
        sum_b += i as f64 * count as f64;
        let m_b = sum_b / w_b as f64;
        let m_f = (sum_all - sum_b) / w_f as f64;
        let between = w_b as f64 * w_f as f64 * (m_b - m_f) * (m_b - m_f);

        if between > max_between {
            max_between = between;
            level_sum = i;
            level_count = 1;
        } else if between == max_between && level_count > 0 {
            level_sum += i;
            level_count += 1;
        }
    }

    if level_count == 0 {
        0
    } else {
        (level_sum / level_count) as u8
    }
}

/// Two-level output around `threshold` with a widened decision band.
pub fn binarize(img: &RgbImage, threshold: u8) -> GrayImage {
    let t = threshold as f32;
    let (high, low) = (t * BAND_HIGH, t * BAND_LOW);
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let gray = luminance(img.get_pixel(x, y));
        let v = if gray > high {
            255
        } else if gray < low {
            0
        } else if gray > t {
            255
        } else {
            0
        };
        Luma([v])
    })
}

/// Contrast then brightness, with CSS filter semantics.
pub fn sharpen(img: &mut GrayImage) {
    for p in img.pixels_mut() {
        let v = p[0] as f32 / 255.0;
        let v = ((v - 0.5) * SHARPEN_CONTRAST + 0.5).clamp(0.0, 1.0);
        let v = (v * SHARPEN_BRIGHTNESS).clamp(0.0, 1.0);
        p[0] = (v * 255.0).round() as u8;
    }
}

/// Resample to `width`×`height` and flatten any transparency onto white.
fn render_on_white(img: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let resized = image::imageops::resize(&img.to_rgba8(), width, height, FilterType::Lanczos3);
    ImageBuffer::from_fn(width, height, |x, y| {
        let p = resized.get_pixel(x, y);
        let alpha = p[3] as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

// ── Normalization ─────────────────────────────────────────────────────────────

/// Rescale, binarize and sharpen `raw`. Never fails: any problem yields the
/// raw image with the reason recorded in the outcome.
pub fn normalize(raw: &RawImage) -> NormalizedImage {
    match enhance(raw) {
        Ok(normalized) => normalized,
        Err(reason) => {
            warn!(%reason, "image normalization skipped, using raw image");
            NormalizedImage::pass_through(raw, reason)
        }
    }
}

fn enhance(raw: &RawImage) -> Result<NormalizedImage, PassThroughReason> {
    let (width, height) = raw.dimensions().ok_or(PassThroughReason::UnknownDimensions)?;
    if !dimensions_acceptable(width, height) {
        return Err(PassThroughReason::InvalidDimensions { width, height });
    }

    let img = image::load_from_memory(raw.bytes())
        .map_err(|e| PassThroughReason::Decode(e.to_string()))?;
    // Header and payload can disagree; trust the decoded image.
    if !dimensions_acceptable(img.width(), img.height()) {
        return Err(PassThroughReason::InvalidDimensions {
            width: img.width(),
            height: img.height(),
        });
    }

    let (target_w, target_h) = target_dimensions(img.width(), img.height());
    let scale = scale_factor(img.width(), img.height());
    let canvas = render_on_white(&img, target_w, target_h);

    let threshold = otsu_threshold(&luminance_histogram(&canvas));
    let mut binary = binarize(&canvas, threshold);
    sharpen(&mut binary);

    debug!(
        width,
        height,
        target_w,
        target_h,
        threshold,
        "image normalized"
    );

    let bytes = encode_as_png(binary)?;
    Ok(NormalizedImage::enhanced(bytes, (target_w, target_h), scale as f32, threshold))
}

fn encode_as_png(img: GrayImage) -> Result<Vec<u8>, PassThroughReason> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PassThroughReason::Encode(e.to_string()))?;
    Ok(buf)
}

/// [`normalize`] on the blocking pool, abandoned after `budget`.
pub async fn normalize_within(raw: RawImage, budget: Duration) -> NormalizedImage {
    let worker = tokio::task::spawn_blocking({
        let raw = raw.clone();
        move || normalize(&raw)
    });

    match tokio::time::timeout(budget, worker).await {
        Ok(Ok(normalized)) => normalized,
        Ok(Err(e)) => {
            warn!(error = %e, "normalization worker failed, using raw image");
            NormalizedImage::pass_through(&raw, PassThroughReason::Aborted(e.to_string()))
        }
        Err(_) => {
            warn!(?budget, "normalization timed out, using raw image");
            NormalizedImage::pass_through(&raw, PassThroughReason::TimedOut(budget))
        }
    }
}
