//! # Cutout
//!
//! Splits raster images holding several disjoint shapes on a removable
//! background into one cropped image per shape.
//!
//! ## Stages
//!
//! - **Background erasure**: tolerance-based flood fill from a background seed pixel
//! - **Region scanning**: 4-connected components of the resulting foreground mask
//! - **Bounding boxes**: minimal inclusive rectangle per region
//! - **Crop export**: one file per region under a collision-free random name
//! - **Notifications**: lifecycle events fanned out to subscribers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cutout::{Event, Pipeline};
//! use std::path::Path;
//!
//! let pipeline = Pipeline::builder()
//!     .output_dir("output")
//!     .extension("png")
//!     .subscribe(|event: &Event| -> cutout::Result<()> {
//!         println!("{}: {}", event, event.path().display());
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let report = pipeline.process_file(Path::new("input/sheet.png"))?;
//! println!("{} crops written", report.exports.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Segmentation only
//!
//! ```rust,no_run
//! use cutout::{BackgroundEraser, ComponentScanner, FloodFillEraser};
//!
//! let image = image::open("sheet.png")?.to_rgba8();
//! let erased = FloodFillEraser::default().erase(&image);
//! for region in ComponentScanner::new(&erased.grid) {
//!     println!("{:?}", region.bounding_box()?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod events;
pub mod export;
pub mod pipeline;

// Re-exports for convenience
pub use error::{CutoutError, Result};
pub use types::{BoundingBox, Coord, ExportRecord, PixelGrid, Region};
pub use traits::*;
pub use algorithms::*;
pub use events::{Event, NotificationBus};
pub use export::{CropExporter, RandomTokens};
pub use pipeline::{BatchReport, FileFailure, ImageReport, Pipeline, Segmentation, builder::PipelineBuilder};
