//! Classical-vision fallback used when no trained model is available.
//!
//! Whole-image statistics are mapped to labels by fixed thresholds. The
//! rules are independent and evaluated in a fixed order; at most two labels
//! are reported.

use std::path::Path;

use image::DynamicImage;

/// Canny hysteresis thresholds on 8-bit luma.
const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 200.0;

/// Longest label list the heuristic reports.
const MAX_LABELS: usize = 2;

/// Label emitted when no rule fires on a decodable image.
pub const SUSPECTED_DAMAGE: &str = "suspected_damage";

/// Coarse whole-image statistics, each normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub edge_density: f64,
    pub saturation: f64,
    pub value: f64,
    pub blue: f64,
    pub red: f64,
}

impl ImageStats {
    pub fn compute(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let pixels = u64::from(rgb.width()) * u64::from(rgb.height());
        if pixels == 0 {
            return Self {
                edge_density: 0.0,
                saturation: 0.0,
                value: 0.0,
                blue: 0.0,
                red: 0.0,
            };
        }

        let (mut sat_sum, mut val_sum, mut blue_sum, mut red_sum) = (0.0f64, 0.0f64, 0u64, 0u64);
        for pixel in rgb.pixels() {
            let [r, g, b] = pixel.0;
            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            if max > 0 {
                sat_sum += f64::from(max - min) / f64::from(max);
            }
            val_sum += f64::from(max) / 255.0;
            blue_sum += u64::from(b);
            red_sum += u64::from(r);
        }

        let edges = imageproc::edges::canny(&image.to_luma8(), CANNY_LOW, CANNY_HIGH);
        let edge_pixels = edges.pixels().filter(|p| p.0[0] > 0).count() as u64;

        let n = pixels as f64;
        Self {
            edge_density: edge_pixels as f64 / n,
            saturation: sat_sum / n,
            value: val_sum / n,
            blue: blue_sum as f64 / (255.0 * n),
            red: red_sum as f64 / (255.0 * n),
        }
    }
}

/// Map statistics to labels, in rule order, truncated to two.
pub fn classify(stats: &ImageStats) -> Vec<&'static str> {
    let mut labels = Vec::new();
    if stats.edge_density > 0.085 && stats.saturation < 0.36 {
        labels.push("crack");
    }
    if stats.blue - stats.red > 0.05 && stats.saturation > 0.20 {
        labels.push("leakage");
    }
    if stats.value > 0.70 && stats.saturation < 0.22 && stats.edge_density < 0.12 {
        labels.push("peeling");
    }
    if stats.edge_density > 0.16 && stats.value < 0.56 {
        labels.push("breakage");
    }
    if labels.is_empty() {
        labels.push(SUSPECTED_DAMAGE);
    }
    labels.truncate(MAX_LABELS);
    labels
}

/// Heuristic detector over image files.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFallbackDetector;

impl HeuristicFallbackDetector {
    pub fn new() -> Self {
        Self
    }

    /// Labels for the image at `path`; empty when it cannot be decoded.
    /// CPU bound, so async callers should run it on a blocking thread.
    pub fn detect(&self, path: &Path) -> Vec<String> {
        let image = match image::open(path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Heuristic could not decode image");
                return Vec::new();
            }
        };
        let stats = ImageStats::compute(&image);
        tracing::debug!(path = %path.display(), ?stats, "Heuristic image statistics");
        classify(&stats).into_iter().map(str::to_string).collect()
    }
}
