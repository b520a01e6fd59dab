use std::iter::FusedIterator;

use crate::types::{PixelGrid, Region};

/// Lazily enumerates the 4-connected foreground regions of a [`PixelGrid`].
///
/// Every cell is marked processed exactly once, either when the linear
/// cursor reaches it or when it is pushed onto the traversal frontier, so a
/// full scan is `O(width * height)` whatever the shape or number of regions.
/// Emission order is not part of the contract.
#[derive(Debug)]
pub struct ComponentScanner<'a> {
    grid: &'a PixelGrid,
    processed: Vec<bool>,
    cursor: usize,
    frontier: Vec<usize>,
}

impl<'a> ComponentScanner<'a> {
    pub fn new(grid: &'a PixelGrid) -> Self {
        Self {
            grid,
            processed: vec![false; grid.len()],
            cursor: 0,
            frontier: Vec::new(),
        }
    }

    fn enqueue_neighbours(&mut self, index: usize) {
        for next in self.grid.neighbours(index) {
            if !self.processed[next] {
                self.processed[next] = true;
                self.frontier.push(next);
            }
        }
    }

    fn collect_region(&mut self, start: usize) -> Region {
        let grid = self.grid;
        let mut pixels = vec![grid.coord(start)];
        self.enqueue_neighbours(start);

        while let Some(index) = self.frontier.pop() {
            // Background cells end this branch of the traversal
            if !grid.cell(index) {
                continue;
            }
            pixels.push(grid.coord(index));
            self.enqueue_neighbours(index);
        }

        Region { pixels }
    }
}

impl Iterator for ComponentScanner<'_> {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        while self.cursor < self.processed.len() {
            let index = self.cursor;
            self.cursor += 1;

            if self.processed[index] {
                continue;
            }
            self.processed[index] = true;

            if self.grid.cell(index) {
                return Some(self.collect_region(index));
            }
        }
        None
    }
}

impl FusedIterator for ComponentScanner<'_> {}
