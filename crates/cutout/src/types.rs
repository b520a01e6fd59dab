use std::path::PathBuf;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{CutoutError, Result};

/// A pixel coordinate, `(x, y)`.
pub type Coord = (u32, u32);

/// Foreground mask of one source image.
///
/// Cells are stored row-major; `mask.len() == width * height` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    mask: Vec<bool>,
}

impl PixelGrid {
    pub fn new(width: u32, height: u32, mask: Vec<bool>) -> Result<Self> {
        if mask.len() != width as usize * height as usize {
            return Err(CutoutError::InvalidGrid {
                width,
                height,
                len: mask.len(),
            });
        }
        Ok(Self { width, height, mask })
    }

    /// An all-background grid
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mask: vec![false; width as usize * height as usize],
        }
    }

    /// Build a grid by evaluating `f` at every coordinate
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut mask = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                mask.push(f(x, y));
            }
        }
        Self { width, height, mask }
    }

    /// Foreground is every pixel whose alpha is non-zero
    pub fn from_alpha(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let mask = image.pixels().map(|p| p[3] > 0).collect();
        Self { width, height, mask }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells in the grid
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Mask value at `(x, y)`, `false` outside the grid
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.mask[self.index(x, y)]
    }

    /// Number of foreground cells
    pub fn foreground_count(&self) -> usize {
        self.mask.iter().filter(|&&cell| cell).count()
    }

    pub(crate) fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub(crate) fn coord(&self, index: usize) -> Coord {
        let width = self.width as usize;
        ((index % width) as u32, (index / width) as u32)
    }

    pub(crate) fn cell(&self, index: usize) -> bool {
        self.mask[index]
    }

    pub(crate) fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> + use<> {
        neighbours4(index, self.width, self.height)
    }
}

/// Indices of the 4-connected neighbours of `index` inside a `width` x `height` raster
pub(crate) fn neighbours4(index: usize, width: u32, height: u32) -> impl Iterator<Item = usize> {
    let w = width as usize;
    let (x, y) = (index % w, index / w);
    let right = (x + 1 < w).then_some(index + 1);
    let left = (x > 0).then(|| index - 1);
    let down = (y + 1 < height as usize).then_some(index + w);
    let up = (y > 0).then(|| index - w);
    [right, left, down, up].into_iter().flatten()
}

/// A maximal set of 4-connected foreground coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub pixels: Vec<Coord>,
}

impl Region {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.pixels.contains(&coord)
    }

    pub fn bounding_box(&self) -> Result<BoundingBox> {
        crate::algorithms::reduce_bounds(&self.pixels)
    }
}

/// Inclusive axis-aligned rectangle, `min <= max` on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn contains(&self, (x, y): Coord) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }

    pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// One crop written by the exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub file_name: String,
    pub path: PathBuf,
    pub bounds: BoundingBox,
}
