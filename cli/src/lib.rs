use cutout::{Event, EventHandler};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::info;


#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported settings format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}


/// Persistent run settings, created with defaults on first start
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Settings {
    pub version: String,
    /// Extension of exported crops; also selects the encoder
    #[serde(rename = "output file type", alias = "output_file_type")]
    pub output_file_type: String,
    /// Flood fill colour tolerance (sum of RGBA channel differences)
    #[serde(default = "default_tolerance")]
    pub tolerance: u32,
}

fn default_tolerance() -> u32 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            output_file_type: "png".to_string(),
            tolerance: default_tolerance(),
        }
    }
}

impl Settings {
    /// Load settings, writing the defaults first if the file does not exist
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }
        let settings = Self::default();
        settings.to_file(path)?;
        info!("Wrote default settings to {}", path.display());
        Ok(settings)
    }

    /// Auto-detect file format and load settings
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?),
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?),
            _ => Err(SettingsError::UnsupportedFileFormat),
        }
    }

    /// Auto-detect file format and save settings
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path_ref = path.as_ref();
        let content = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml()?,
            Some("json") => self.to_json()?,
            _ => return Err(SettingsError::UnsupportedFileFormat),
        };
        fs::write(path_ref, content)?;
        Ok(())
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn from_json(content: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(content)?)
    }

    /// JSON with four-space indentation
    pub fn to_json(&self) -> Result<String, SettingsError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Settings)
    }
}


/// The `input`, `output` and `logs` directories under one root
#[derive(Debug, Clone, PartialEq)]
pub struct Workspace {
    pub input: PathBuf,
    pub output: PathBuf,
    pub logs: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            input: root.join("input"),
            output: root.join("output"),
            logs: root.join("logs"),
        }
    }

    /// Create any missing directory
    pub fn ensure(&self) -> Result<(), SettingsError> {
        for dir in [&self.input, &self.output, &self.logs] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Regular files of the input directory, sorted by name
    pub fn input_files(&self) -> Result<Vec<PathBuf>, SettingsError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.input)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}


/// Prints one human-readable line per lifecycle event
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter;

impl EventHandler for ConsoleReporter {
    fn handle(&self, event: &Event) -> cutout::Result<()> {
        match event {
            Event::ProcessStarted(path) => info!(">> Processing {}", path.display()),
            Event::RegionExported(path) => info!("<< Found {}", path.display()),
            Event::ProcessCompleted(path) => info!("Done {}", path.display()),
        }
        Ok(())
    }
}


/// Counts completed images and exported crops across a run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    images: Arc<AtomicUsize>,
    crops: Arc<AtomicUsize>,
}

impl RunStats {
    pub fn images(&self) -> usize {
        self.images.load(Ordering::Relaxed)
    }

    pub fn crops(&self) -> usize {
        self.crops.load(Ordering::Relaxed)
    }
}

impl EventHandler for RunStats {
    fn handle(&self, event: &Event) -> cutout::Result<()> {
        match event {
            Event::ProcessStarted(_) => {}
            Event::RegionExported(_) => {
                self.crops.fetch_add(1, Ordering::Relaxed);
            }
            Event::ProcessCompleted(_) => {
                self.images.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}
