use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::debug;

use crate::{
    traits::{BackgroundEraser, ErasedImage},
    types::{PixelGrid, neighbours4},
};

/// Colour written over erased background
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Distance between two RGBA colours, compared against a tolerance
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColorMetric {
    /// Sum of absolute channel differences
    #[default]
    Manhattan,
    /// Straight-line distance in RGBA space
    Euclidean,
}

impl ColorMetric {
    pub fn within(&self, a: &Rgba<u8>, b: &Rgba<u8>, tolerance: u32) -> bool {
        let deltas = a.0.iter().zip(b.0.iter()).map(|(&p, &q)| p.abs_diff(q) as u32);
        match self {
            Self::Manhattan => deltas.sum::<u32>() <= tolerance,
            Self::Euclidean => {
                let squared: u64 = deltas.map(|d| (d * d) as u64).sum();
                squared <= tolerance as u64 * tolerance as u64
            }
        }
    }
}

/// Tolerance-based flood fill from a seed pixel known to lie on background.
///
/// Every pixel 4-connected to the seed through pixels within `tolerance` of
/// the seed colour becomes fully transparent. The foreground mask is the
/// resulting alpha channel.
#[derive(Debug, Clone)]
pub struct FloodFillEraser {
    pub seed: (u32, u32),
    pub tolerance: u32,
    pub metric: ColorMetric,
}

impl Default for FloodFillEraser {
    fn default() -> Self {
        Self {
            seed: (1, 1),
            tolerance: 100,
            metric: ColorMetric::Manhattan,
        }
    }
}

impl FloodFillEraser {
    pub fn with_tolerance(tolerance: u32) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }
}

impl BackgroundEraser for FloodFillEraser {
    fn erase(&self, image: &RgbaImage) -> ErasedImage {
        let (width, height) = image.dimensions();
        let (seed_x, seed_y) = self.seed;
        let mut erased = image.clone();

        if seed_x >= width || seed_y >= height {
            debug!(seed = ?self.seed, width, height, "Seed outside image, nothing erased");
            let grid = PixelGrid::from_alpha(&erased);
            return ErasedImage { image: erased, grid };
        }

        let background = *image.get_pixel(seed_x, seed_y);
        if self.metric.within(&TRANSPARENT, &background, self.tolerance) {
            debug!(?background, "Seed already matches the fill colour, nothing erased");
            let grid = PixelGrid::from_alpha(&erased);
            return ErasedImage { image: erased, grid };
        }

        let w = width as usize;
        let seed = seed_y as usize * w + seed_x as usize;
        let mut filled = vec![false; w * height as usize];
        let mut frontier = vec![seed];
        filled[seed] = true;
        let mut erased_count = 0usize;

        while let Some(index) = frontier.pop() {
            let (x, y) = ((index % w) as u32, (index / w) as u32);
            erased.put_pixel(x, y, TRANSPARENT);
            erased_count += 1;

            for next in neighbours4(index, width, height) {
                if filled[next] {
                    continue;
                }
                filled[next] = true;
                let pixel = image.get_pixel((next % w) as u32, (next / w) as u32);
                if self.metric.within(pixel, &background, self.tolerance) {
                    frontier.push(next);
                }
            }
        }

        debug!(erased_count, "Background flood fill finished");
        let grid = PixelGrid::from_alpha(&erased);
        ErasedImage { image: erased, grid }
    }
}

/// Eraser for inputs that already carry transparency: the mask is the alpha channel
#[derive(Debug, Clone, Default)]
pub struct AlphaMaskEraser;

impl BackgroundEraser for AlphaMaskEraser {
    fn erase(&self, image: &RgbaImage) -> ErasedImage {
        ErasedImage {
            image: image.clone(),
            grid: PixelGrid::from_alpha(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);

    fn white_with_squares() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(40, 30, WHITE);
        for y in 5..10 {
            for x in 5..12 {
                img.put_pixel(x, y, RED);
            }
        }
        for y in 18..25 {
            for x in 25..35 {
                img.put_pixel(x, y, RED);
            }
        }
        img
    }

    #[test]
    fn test_background_becomes_transparent() {
        let image = white_with_squares();
        let result = FloodFillEraser::default().erase(&image);

        assert_eq!(result.image.get_pixel(0, 0)[3], 0);
        assert_eq!(result.image.get_pixel(39, 29)[3], 0);
        assert_eq!(result.image.get_pixel(7, 7), &RED);
        assert_eq!(result.image.get_pixel(30, 20), &RED);
        assert_eq!(result.grid.foreground_count(), 7 * 5 + 10 * 7);
        assert!(result.grid.get(5, 5));
        assert!(!result.grid.get(4, 5));
    }

    #[test]
    fn test_near_background_is_erased_within_tolerance() {
        let mut image = RgbaImage::from_pixel(10, 10, WHITE);
        // 3 * 30 = 90 <= 100 under the Manhattan metric
        image.put_pixel(6, 6, Rgba([225, 225, 225, 255]));
        // 3 * 40 = 120 > 100
        image.put_pixel(2, 7, Rgba([215, 215, 215, 255]));

        let result = FloodFillEraser::default().erase(&image);
        assert!(!result.grid.get(6, 6));
        assert!(result.grid.get(2, 7));
        assert_eq!(result.grid.foreground_count(), 1);
    }

    #[test]
    fn test_enclosed_background_is_kept() {
        // A ring of red encloses white pixels the fill cannot reach
        let mut image = RgbaImage::from_pixel(12, 12, WHITE);
        for y in 3..9 {
            for x in 3..9 {
                if x == 3 || x == 8 || y == 3 || y == 8 {
                    image.put_pixel(x, y, RED);
                }
            }
        }
        let result = FloodFillEraser::default().erase(&image);
        assert!(result.grid.get(5, 5));
        assert_eq!(result.grid.foreground_count(), 36);
    }

    #[test]
    fn test_uniform_image_yields_empty_mask() {
        let image = RgbaImage::from_pixel(16, 8, WHITE);
        let result = FloodFillEraser::default().erase(&image);
        assert_eq!(result.grid.foreground_count(), 0);
        assert!(result.image.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_seed_outside_image_erases_nothing() {
        let image = RgbaImage::from_pixel(1, 1, WHITE);
        let result = FloodFillEraser::default().erase(&image);
        assert_eq!(result.grid.foreground_count(), 1);
    }

    #[test]
    fn test_seed_matching_fill_colour_erases_nothing() {
        let mut image = RgbaImage::from_pixel(5, 5, Rgba([10, 10, 10, 20]));
        image.put_pixel(4, 4, RED);
        let result = FloodFillEraser::default().erase(&image);
        assert_eq!(result.grid.foreground_count(), 25);
        assert_eq!(result.image, image);
    }

    #[test]
    fn test_metrics_disagree_on_spread_differences() {
        let a = Rgba([100, 100, 100, 255]);
        let b = Rgba([140, 140, 140, 255]);
        // Manhattan 120, Euclidean ~69
        assert!(!ColorMetric::Manhattan.within(&a, &b, 100));
        assert!(ColorMetric::Euclidean.within(&a, &b, 100));
    }

    #[test]
    fn test_metric_parses_from_name() {
        assert_eq!("euclidean".parse::<ColorMetric>().unwrap(), ColorMetric::Euclidean);
        assert_eq!(ColorMetric::Manhattan.to_string(), "manhattan");
    }

    #[test]
    fn test_alpha_mask_eraser_keeps_pixels() {
        let mut image = RgbaImage::from_pixel(4, 4, TRANSPARENT);
        image.put_pixel(1, 2, RED);
        let result = AlphaMaskEraser.erase(&image);
        assert_eq!(result.image, image);
        assert!(result.grid.get(1, 2));
        assert_eq!(result.grid.foreground_count(), 1);
    }
}
