pub mod builder;

use std::path::{Path, PathBuf};

use image::RgbaImage;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    algorithms::ComponentScanner,
    error::{CutoutError, Result},
    events::{Event, NotificationBus},
    export::CropExporter,
    traits::{BackgroundEraser, ErasedImage},
    types::{BoundingBox, ExportRecord},
};

/// Erased pixels and foreground mask of one image, ready to be scanned
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub erased: ErasedImage,
}

impl Segmentation {
    /// Bounding boxes of the foreground regions, computed one region at a time
    pub fn bounding_boxes(&self) -> impl Iterator<Item = Result<BoundingBox>> + '_ {
        ComponentScanner::new(&self.erased.grid).map(|region| region.bounding_box())
    }
}

/// Outcome of processing one source image
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    pub exports: Vec<ExportRecord>,
}

/// A source image whose processing failed
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: CutoutError,
}

/// Outcome of processing a batch of source images
#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<ImageReport>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn exported(&self) -> usize {
        self.reports.iter().map(|report| report.exports.len()).sum()
    }
}

/// Background erasure, region scanning and crop export for a stream of images
pub struct Pipeline {
    eraser: Box<dyn BackgroundEraser>,
    exporter: CropExporter,
    bus: NotificationBus,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(eraser: Box<dyn BackgroundEraser>, exporter: CropExporter, bus: NotificationBus) -> Self {
        Self {
            eraser,
            exporter,
            bus,
        }
    }

    pub fn exporter(&self) -> &CropExporter {
        &self.exporter
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Erase the background of `image` without touching the file system
    pub fn segment(&self, image: &RgbaImage) -> Segmentation {
        Segmentation {
            erased: self.eraser.erase(image),
        }
    }

    /// Decode `path` and export every region found in it
    pub fn process_file(&self, path: &Path) -> Result<ImageReport> {
        self.bus.publish(&Event::ProcessStarted(path.to_path_buf()))?;

        let image = image::open(path)
            .map_err(|source| CutoutError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();

        self.export_regions(path, &image)
    }

    /// Export every region of an already decoded image
    pub fn process_image(&self, source: &Path, image: &RgbaImage) -> Result<ImageReport> {
        self.bus.publish(&Event::ProcessStarted(source.to_path_buf()))?;
        self.export_regions(source, image)
    }

    fn export_regions(&self, source: &Path, image: &RgbaImage) -> Result<ImageReport> {
        let (width, height) = image.dimensions();
        let segmentation = self.segment(image);
        debug!(
            source = %source.display(),
            foreground = segmentation.erased.grid.foreground_count(),
            "Background erased"
        );

        let mut exports = Vec::new();
        for bounds in segmentation.bounding_boxes() {
            let bounds = bounds?;
            let record = self.exporter.export(&segmentation.erased.image, &bounds)?;
            debug!(file = %record.file_name, bounds = ?bounds.as_tuple(), "Region exported");
            self.bus.publish(&Event::RegionExported(record.path.clone()))?;
            exports.push(record);
        }

        self.bus.publish(&Event::ProcessCompleted(source.to_path_buf()))?;
        info!(source = %source.display(), regions = exports.len(), "Image processed");

        Ok(ImageReport {
            source: source.to_path_buf(),
            width,
            height,
            exports,
        })
    }

    /// Process every file, isolating failures per file.
    ///
    /// With `parallel` set, files are spread over the rayon thread pool; the
    /// exporter's name registry is shared so names stay unique.
    pub fn process_batch(&self, files: &[PathBuf], parallel: bool) -> BatchReport {
        let outcomes: Vec<(PathBuf, Result<ImageReport>)> = if parallel {
            files
                .par_iter()
                .map(|path| (path.clone(), self.process_file(path)))
                .collect()
        } else {
            files
                .iter()
                .map(|path| (path.clone(), self.process_file(path)))
                .collect()
        };

        let mut batch = BatchReport::default();
        for (path, outcome) in outcomes {
            match outcome {
                Ok(report) => batch.reports.push(report),
                Err(error) => {
                    warn!(path = %path.display(), %error, "Skipping file");
                    batch.failures.push(FileFailure { path, error });
                }
            }
        }
        batch
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: output to {} as .{}, {} subscribers",
            self.exporter.output_dir().display(),
            self.exporter.extension(),
            self.bus.len()
        )
    }
}
