use std::{fs, path::PathBuf};

use crate::{
    algorithms::FloodFillEraser,
    error::Result,
    events::NotificationBus,
    export::{CropExporter, DEFAULT_MAX_ATTEMPTS, RandomTokens},
    pipeline::Pipeline,
    traits::{BackgroundEraser, EventHandler, TokenSource},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    eraser: Option<Box<dyn BackgroundEraser>>,
    output_dir: PathBuf,
    extension: String,
    max_attempts: usize,
    tokens: Option<Box<dyn TokenSource>>,
    bus: NotificationBus,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            eraser: None,
            output_dir: PathBuf::from("output"),
            extension: "png".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            tokens: None,
            bus: NotificationBus::new(),
        }
    }

    /// Set the background eraser (replaces any existing one)
    pub fn set_eraser<E>(mut self, eraser: E) -> Self
    where
        E: BackgroundEraser + 'static,
    {
        self.eraser = Some(Box::new(eraser));
        self
    }

    /// Use the default flood fill eraser with a custom tolerance
    pub fn tolerance(self, tolerance: u32) -> Self {
        self.set_eraser(FloodFillEraser::with_tolerance(tolerance))
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// File extension of exported crops, which also selects the encoder
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn token_source<T>(mut self, tokens: T) -> Self
    where
        T: TokenSource + 'static,
    {
        self.tokens = Some(Box::new(tokens));
        self
    }

    /// Register a subscriber; subscribers are notified in registration order
    pub fn subscribe<H>(mut self, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.bus.subscribe(handler);
        self
    }

    /// Build the pipeline, creating the output directory if needed
    pub fn build(self) -> Result<Pipeline> {
        let eraser = self
            .eraser
            .unwrap_or_else(|| Box::new(FloodFillEraser::default()));
        let tokens = self.tokens.unwrap_or_else(|| Box::new(RandomTokens));

        fs::create_dir_all(&self.output_dir)?;
        let exporter = CropExporter::from_parts(self.output_dir, &self.extension, tokens)?
            .with_max_attempts(self.max_attempts);

        Ok(Pipeline::new(eraser, exporter, self.bus))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
