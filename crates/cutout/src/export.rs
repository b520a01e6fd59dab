use std::{
    collections::HashSet,
    fs::{self, File, OpenOptions},
    io::{BufWriter, ErrorKind},
    path::{Path, PathBuf},
    sync::Mutex,
};

use image::{ImageFormat, RgbaImage, imageops};
use rand::Rng;
use tracing::{debug, warn};

use crate::{
    error::{CutoutError, Result},
    traits::TokenSource,
    types::{BoundingBox, ExportRecord},
};

/// Exclusive upper bound of generated name tokens
pub const TOKEN_SPACE: u64 = 10_000_000_000;

/// Default number of name draws before giving up on a region
pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Draws name tokens uniformly from `[0, TOKEN_SPACE)`
#[derive(Debug, Clone, Default)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> u64 {
        rand::thread_rng().gen_range(0..TOKEN_SPACE)
    }
}

/// Writes cropped regions into one destination directory under
/// collision-free random names.
///
/// Names already present in the directory when the exporter is created, and
/// every name it hands out, are never reused. Files are opened with
/// create-new semantics, so a file that appears later is not overwritten
/// either.
pub struct CropExporter {
    output_dir: PathBuf,
    extension: String,
    format: ImageFormat,
    max_attempts: usize,
    taken: Mutex<HashSet<String>>,
    tokens: Mutex<Box<dyn TokenSource>>,
}

impl CropExporter {
    pub fn new(output_dir: impl Into<PathBuf>, extension: &str) -> Result<Self> {
        Self::with_tokens(output_dir, extension, RandomTokens)
    }

    pub fn with_tokens<T>(output_dir: impl Into<PathBuf>, extension: &str, tokens: T) -> Result<Self>
    where
        T: TokenSource + 'static,
    {
        Self::from_parts(output_dir.into(), extension, Box::new(tokens))
    }

    pub(crate) fn from_parts(
        output_dir: PathBuf,
        extension: &str,
        tokens: Box<dyn TokenSource>,
    ) -> Result<Self> {
        let extension = extension.trim_start_matches('.').to_string();
        let format = ImageFormat::from_extension(&extension)
            .filter(|format| writes_rgba(*format))
            .ok_or_else(|| CutoutError::UnsupportedFormat(extension.clone()))?;

        let taken = existing_names(&output_dir)?;
        debug!(dir = %output_dir.display(), existing = taken.len(), "Export directory scanned");

        Ok(Self {
            output_dir,
            extension,
            format,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            taken: Mutex::new(taken),
            tokens: Mutex::new(tokens),
        })
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Number of names known to be taken
    pub fn reserved(&self) -> usize {
        self.taken
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Crop `bounds` (inclusive) out of `image` and write it under a fresh name
    pub fn export(&self, image: &RgbaImage, bounds: &BoundingBox) -> Result<ExportRecord> {
        let crop = imageops::crop_imm(
            image,
            bounds.min_x,
            bounds.min_y,
            bounds.width(),
            bounds.height(),
        )
        .to_image();

        let mut attempts = 0;
        while attempts < self.max_attempts {
            let Some(file_name) = self.reserve_name(&mut attempts) else {
                break;
            };
            let path = self.output_dir.join(&file_name);

            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!(%file_name, "Name taken on disk, drawing again");
                    continue;
                }
                Err(source) => return Err(CutoutError::Write { path, source }),
            };

            self.encode(file, &crop, &path)?;
            return Ok(ExportRecord {
                file_name,
                path,
                bounds: *bounds,
            });
        }

        warn!(attempts = self.max_attempts, dir = %self.output_dir.display(), "Output name space exhausted");
        Err(CutoutError::NameSpaceExhaustion {
            attempts: self.max_attempts,
        })
    }

    /// Draw tokens until one yields an unreserved name, counting every draw
    fn reserve_name(&self, attempts: &mut usize) -> Option<String> {
        let mut taken = self.taken.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut tokens = self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        while *attempts < self.max_attempts {
            *attempts += 1;
            let file_name = format!("{}.{}", tokens.next_token(), self.extension);
            if taken.insert(file_name.clone()) {
                return Some(file_name);
            }
        }
        None
    }

    fn encode(&self, file: File, crop: &RgbaImage, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(file);
        if let Err(source) = crop.write_to(&mut writer, self.format) {
            drop(writer);
            if let Err(err) = fs::remove_file(path) {
                warn!(path = %path.display(), %err, "Could not remove partial crop");
            }
            return Err(CutoutError::Encode {
                path: path.to_path_buf(),
                source,
            });
        }
        writer.into_inner().map_err(|err| CutoutError::Write {
            path: path.to_path_buf(),
            source: err.into_error(),
        })?;
        Ok(())
    }
}

impl std::fmt::Debug for CropExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CropExporter")
            .field("output_dir", &self.output_dir)
            .field("extension", &self.extension)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Crops carry transparency, so only encoders that take RGBA8 are usable
fn writes_rgba(format: ImageFormat) -> bool {
    format.writing_enabled()
        && matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Tiff
                | ImageFormat::Bmp
                | ImageFormat::Ico
                | ImageFormat::Tga
                | ImageFormat::WebP
                | ImageFormat::Qoi
        )
}

fn existing_names(dir: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(dir)? {
        names.insert(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use image::Rgba;
    use tempfile::TempDir;

    use super::*;

    /// Replays a fixed token sequence, then repeats the last token
    struct ScriptedTokens(VecDeque<u64>, u64);

    impl ScriptedTokens {
        fn new(tokens: &[u64]) -> Self {
            Self(tokens.iter().copied().collect(), *tokens.last().unwrap())
        }
    }

    impl TokenSource for ScriptedTokens {
        fn next_token(&mut self) -> u64 {
            self.0.pop_front().unwrap_or(self.1)
        }
    }

    fn checkerboard() -> RgbaImage {
        RgbaImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([200, 10, 10, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    fn bounds(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> BoundingBox {
        BoundingBox { min_x, min_y, max_x, max_y }
    }

    #[test]
    fn test_crop_is_inclusive_and_keeps_transparency() {
        let dir = TempDir::new().unwrap();
        let exporter = CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[7])).unwrap();
        let image = checkerboard();

        let record = exporter.export(&image, &bounds(2, 3, 4, 6)).unwrap();
        assert_eq!(record.file_name, "7.png");
        assert_eq!(record.path, dir.path().join("7.png"));

        let written = image::open(&record.path).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (3, 4));
        assert_eq!(written.get_pixel(0, 0)[3], 0);
        assert_eq!(written.get_pixel(1, 0), image.get_pixel(3, 3));
        assert_eq!(written.get_pixel(2, 3), image.get_pixel(4, 6));
    }

    #[test]
    fn test_single_pixel_crop() {
        let dir = TempDir::new().unwrap();
        let exporter = CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[1])).unwrap();
        let record = exporter.export(&checkerboard(), &bounds(5, 5, 5, 5)).unwrap();
        let written = image::open(&record.path).unwrap();
        assert_eq!((written.width(), written.height()), (1, 1));
    }

    #[test]
    fn test_existing_files_are_never_overwritten() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("42.png"), b"keep me").unwrap();

        let exporter =
            CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[42, 42, 43])).unwrap();
        let record = exporter.export(&checkerboard(), &bounds(0, 0, 1, 1)).unwrap();

        assert_eq!(record.file_name, "43.png");
        assert_eq!(fs::read(dir.path().join("42.png")).unwrap(), b"keep me");
    }

    #[test]
    fn test_repeated_collisions_within_a_run() {
        let dir = TempDir::new().unwrap();
        let exporter =
            CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[5, 5, 5, 6, 5, 6, 7])).unwrap();
        let image = checkerboard();

        let names: Vec<String> = (0..3)
            .map(|_| exporter.export(&image, &bounds(0, 0, 2, 2)).unwrap().file_name)
            .collect();

        assert_eq!(names, vec!["5.png", "6.png", "7.png"]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_file_created_after_scan_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let exporter =
            CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[9, 10])).unwrap();
        fs::write(dir.path().join("9.png"), b"late arrival").unwrap();

        let record = exporter.export(&checkerboard(), &bounds(0, 0, 0, 0)).unwrap();
        assert_eq!(record.file_name, "10.png");
        assert_eq!(fs::read(dir.path().join("9.png")).unwrap(), b"late arrival");
    }

    #[test]
    fn test_name_space_exhaustion_is_bounded() {
        let dir = TempDir::new().unwrap();
        let exporter = CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[3]))
            .unwrap()
            .with_max_attempts(25);
        let image = checkerboard();

        exporter.export(&image, &bounds(0, 0, 1, 1)).unwrap();
        let result = exporter.export(&image, &bounds(0, 0, 1, 1));
        assert!(matches!(result, Err(CutoutError::NameSpaceExhaustion { attempts: 25 })));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = CropExporter::new(dir.path(), "notaformat");
        assert!(matches!(result, Err(CutoutError::UnsupportedFormat(ext)) if ext == "notaformat"));
    }

    #[test]
    fn test_formats_without_alpha_are_rejected_up_front() {
        let dir = TempDir::new().unwrap();
        for ext in ["jpg", "jpeg", "JPG"] {
            let result = CropExporter::new(dir.path(), ext);
            assert!(matches!(result, Err(CutoutError::UnsupportedFormat(found)) if found == ext));
        }
        assert!(CropExporter::new(dir.path(), "tiff").is_ok());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_reserved_counts_existing_and_issued_names() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        let exporter = CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[1, 2])).unwrap();
        assert_eq!(exporter.reserved(), 1);

        exporter.export(&checkerboard(), &bounds(0, 0, 1, 1)).unwrap();
        exporter.export(&checkerboard(), &bounds(0, 0, 1, 1)).unwrap();
        assert_eq!(exporter.reserved(), 3);
    }

    #[test]
    fn test_reserved_survives_a_poisoned_registry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("1.png"), b"").unwrap();
        let exporter = CropExporter::with_tokens(dir.path(), "png", ScriptedTokens::new(&[2])).unwrap();

        std::thread::scope(|scope| {
            let handle = scope.spawn(|| {
                let _guard = exporter.taken.lock().unwrap();
                panic!("poison the registry");
            });
            assert!(handle.join().is_err());
        });

        assert!(exporter.taken.is_poisoned());
        assert_eq!(exporter.reserved(), 1);
    }

    #[test]
    fn test_leading_dot_in_extension_is_ignored() {
        let dir = TempDir::new().unwrap();
        let exporter = CropExporter::new(dir.path(), ".png").unwrap();
        assert_eq!(exporter.extension(), "png");
    }

    #[test]
    fn test_random_tokens_stay_in_range() {
        let mut tokens = RandomTokens;
        for _ in 0..1000 {
            assert!(tokens.next_token() < TOKEN_SPACE);
        }
    }
}
