use std::{fmt, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::{error::Result, traits::EventHandler};

/// Pipeline lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    /// A source image is about to be processed
    ProcessStarted(PathBuf),
    /// A crop has been written
    RegionExported(PathBuf),
    /// Every region of a source image has been exported
    ProcessCompleted(PathBuf),
}

impl Event {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::ProcessStarted(path) | Self::RegionExported(path) | Self::ProcessCompleted(path) => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

/// Synchronous publish/subscribe register.
///
/// Handlers run in registration order. The first handler error stops
/// delivery and is returned to the publisher.
#[derive(Clone, Default)]
pub struct NotificationBus {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    pub fn publish(&self, event: &Event) -> Result<()> {
        for handler in &self.handlers {
            handler.handle(event)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
