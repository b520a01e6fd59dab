use clap::{Parser, Subcommand};
use cli::{ConsoleReporter, RunStats, Settings, Workspace};
use color_eyre::eyre::{Result, WrapErr};
use cutout::{ColorMetric, FloodFillEraser, Pipeline};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split every image of the input directory into one crop per shape
    Run {
        /// Directory holding input/, output/ and logs/
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
        /// Settings file (.json or .toml), created with defaults if missing
        #[arg(short, long, default_value = "settings.json")]
        settings: PathBuf,
        /// Process images concurrently, one task per file
        #[arg(long)]
        parallel: bool,
        /// Colour distance used by the background flood fill
        #[arg(long, default_value = "manhattan")]
        metric: ColorMetric,
    },
    /// Create the directories and the default settings file, then exit
    Init {
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
        #[arg(short, long, default_value = "settings.json")]
        settings: PathBuf,
    },
    /// Print the JSON schema of the settings file
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            root,
            settings,
            parallel,
            metric,
        } => {
            run(root, settings, *parallel, *metric)?;
        }
        Commands::Init { root, settings } => {
            prepare(root, settings)?;
        }
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&Settings::schema())?);
        }
    }

    Ok(())
}

fn prepare(root: &Path, settings_path: &Path) -> Result<(Workspace, Settings)> {
    let workspace = Workspace::new(root);
    workspace
        .ensure()
        .wrap_err_with(|| format!("Could not create directories under {}", root.display()))?;

    let settings_path = if settings_path.is_relative() {
        root.join(settings_path)
    } else {
        settings_path.to_path_buf()
    };
    let settings = Settings::load_or_init(&settings_path)
        .wrap_err_with(|| format!("Could not load {}", settings_path.display()))?;
    info!("Settings: {:?}", settings);

    Ok((workspace, settings))
}

fn run(root: &Path, settings_path: &Path, parallel: bool, metric: ColorMetric) -> Result<()> {
    let (workspace, settings) = prepare(root, settings_path)?;

    let stats = RunStats::default();
    let eraser = FloodFillEraser {
        tolerance: settings.tolerance,
        metric,
        ..FloodFillEraser::default()
    };
    let pipeline = Pipeline::builder()
        .set_eraser(eraser)
        .output_dir(&workspace.output)
        .extension(settings.output_file_type.as_str())
        .subscribe(ConsoleReporter)
        .subscribe(stats.clone())
        .build()?;
    info!("{}", pipeline.info());

    let files = workspace.input_files()?;
    if files.is_empty() {
        info!("No images in {}", workspace.input.display());
        return Ok(());
    }

    let batch = pipeline.process_batch(&files, parallel);

    for failure in &batch.failures {
        error!("❌ {}: {}", failure.path.display(), failure.error);
    }
    info!(
        "✅ {} of {} images processed, {} crops written to {}",
        stats.images(),
        files.len(),
        stats.crops(),
        workspace.output.display()
    );

    Ok(())
}
