use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CutoutError {
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot compute a bounding box for an empty region")]
    EmptyRegion,

    #[error("No free output file name after {attempts} attempts")]
    NameSpaceExhaustion { attempts: usize },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Unsupported output file type: {0}")]
    UnsupportedFormat(String),

    #[error("Mask of length {len} does not match a {width}x{height} grid")]
    InvalidGrid { width: u32, height: u32, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event handler failed: {0}")]
    Handler(String),
}

pub type Result<T> = std::result::Result<T, CutoutError>;
