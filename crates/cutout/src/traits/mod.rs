use image::RgbaImage;

use crate::{error::Result, events::Event, types::PixelGrid};

/// Output of background erasure: the erased pixels and the mask derived from them
#[derive(Debug, Clone)]
pub struct ErasedImage {
    pub image: RgbaImage,
    pub grid: PixelGrid,
}

/// Trait for background removal algorithms
pub trait BackgroundEraser: Send + Sync {
    /// Neutralise background pixels and derive the foreground mask
    fn erase(&self, image: &RgbaImage) -> ErasedImage;
}

/// Source of random tokens used to name exported crops
pub trait TokenSource: Send {
    fn next_token(&mut self) -> u64;
}

/// Subscriber on the notification bus
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event) -> Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    fn handle(&self, event: &Event) -> Result<()> {
        self(event)
    }
}
