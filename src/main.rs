use clap::{Parser, Subcommand, ValueEnum};
use pixpress::formats::FormatTag;
use pixpress::imaging::RustCodec;
use pixpress::output;
use pixpress::settings::{CompressionSettings, Quality, SettingsUpdate};
use pixpress::store::{MemoryHandles, Status, Store};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pixpress")]
#[command(about = "Batch image transcoder with quality targeting")]
#[command(long_about = "\
Batch image transcoder with quality targeting

Re-encodes images into one or more target formats, optionally bounded by
maximum dimensions and a maximum output file size. When a size budget is
set, the encoder quality is searched automatically to land the largest
file that still fits.

Examples:

  pixpress convert photo.jpg --format webp
  pixpress convert shots/ --format webp --format avif --quality 85
  pixpress convert photo.jpg --format jpeg --max-size-mb 0.5 --max-width 1600
  pixpress convert shots/ --preset low --report report.json

Run 'pixpress formats' to see what each format supports.")]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcode images into the target formats
    Convert(ConvertArgs),
    /// List supported formats and their capabilities
    Formats,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Image files or directories (directories are walked recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target format (repeatable; default keeps the original format)
    #[arg(long = "format", value_parser = FormatTag::parse)]
    formats: Vec<FormatTag>,

    /// Encoder quality, 1-100
    #[arg(long)]
    quality: Option<u32>,

    /// Quality preset (overridden by an explicit --quality)
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Bound output width in pixels (aspect ratio preserved)
    #[arg(long)]
    max_width: Option<u32>,

    /// Bound output height in pixels (aspect ratio preserved)
    #[arg(long)]
    max_height: Option<u32>,

    /// Target maximum output file size in megabytes
    #[arg(long)]
    max_size_mb: Option<f64>,

    /// Settings file (TOML); command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = "compressed")]
    output: PathBuf,

    /// Write a JSON processing report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    High,
    Medium,
    Low,
}

impl Preset {
    fn quality(self) -> u32 {
        match self {
            Preset::High => 90,
            Preset::Medium => 70,
            Preset::Low => 50,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Convert(args) => convert(args),
        Command::Formats => {
            print_formats();
            Ok(())
        }
    }
}

fn convert(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = Store::new(RustCodec, MemoryHandles::default());
    store.update_settings(build_settings_update(&args)?)?;

    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        return Err("no image files found in the given inputs".into());
    }

    for path in &files {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if let Err(error) = store.add_image(&name, None, bytes) {
            eprintln!("Skipping {name}: {error}");
        }
    }

    store.process_all();
    output::print_results(store.entries());

    std::fs::create_dir_all(&args.output)?;
    let written = write_outputs(&store, &args.output)?;
    println!("Wrote {} files to {}", written, args.output.display());

    if let Some(report_path) = &args.report {
        let report = output::build_report(store.entries());
        std::fs::write(report_path, serde_json::to_string_pretty(&report)?)?;
        println!("Report: {}", report_path.display());
    }

    let failed = store
        .entries()
        .iter()
        .filter(|e| e.status == Status::Error)
        .count();
    if failed > 0 {
        return Err(format!("{failed} images failed to process").into());
    }
    Ok(())
}

/// Merge the settings file (if any) with command-line flags; flags win.
fn build_settings_update(
    args: &ConvertArgs,
) -> Result<SettingsUpdate, Box<dyn std::error::Error>> {
    let mut update = SettingsUpdate::default();

    if let Some(config_path) = &args.config {
        let text = std::fs::read_to_string(config_path)?;
        let settings: CompressionSettings = toml::from_str(&text)?;
        update.quality = Some(settings.quality);
        update.max_size_mb = Some(settings.max_size_mb);
        update.max_width = Some(settings.max_width);
        update.max_height = Some(settings.max_height);
        update.target_formats = Some(settings.target_formats);
    }

    if let Some(preset) = args.preset {
        update.quality = Some(Quality::new(preset.quality()));
    }
    if let Some(quality) = args.quality {
        update.quality = Some(Quality::new(quality));
    }
    if let Some(width) = args.max_width {
        update.max_width = Some(Some(width));
    }
    if let Some(height) = args.max_height {
        update.max_height = Some(Some(height));
    }
    if let Some(mb) = args.max_size_mb {
        update.max_size_mb = Some(Some(mb));
    }
    if !args.formats.is_empty() {
        update.target_formats = Some(args.formats.clone());
    }

    Ok(update)
}

/// Expand files and directories into a flat, deterministic file list.
/// Directory walks keep only files whose extension names a known format.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for dir_entry in walkdir::WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                if has_image_extension(dir_entry.path()) {
                    files.push(dir_entry.into_path());
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FormatTag::parse(ext).is_ok())
}

/// Write every successful result as `<stem>-<format>.<ext>`. Pass-through
/// copies keep the source extension when the source format is known.
fn write_outputs<H: pixpress::store::HandleRegistry>(
    store: &Store<RustCodec, H>,
    output_dir: &Path,
) -> Result<usize, std::io::Error> {
    let mut written = 0;
    for entry in store.entries() {
        let stem = Path::new(&entry.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.name.clone());
        for result in entry.results.iter() {
            let extension = match (result.format, entry.source_format) {
                (FormatTag::Original, Some(source)) => source.extension(),
                (format, _) => format.extension(),
            };
            let file_name = format!("{}-{}.{}", stem, result.format.name(), extension);
            std::fs::write(output_dir.join(file_name), &result.bytes)?;
            written += 1;
        }
    }
    Ok(written)
}

fn print_formats() {
    println!("FORMAT  ENCODE  DECODE  NOTES");
    for &format in FormatTag::CODEC_FORMATS {
        let encode = if format.is_encodable() { "yes" } else { "no" };
        let decode = if format.is_decodable_by_runtime() {
            "yes"
        } else {
            "no"
        };
        let notes = match format {
            FormatTag::Avif => "encode only",
            FormatTag::Ico => "dimensions snap to standard icon sizes",
            f if f.is_read_only() => "pass-through only",
            _ => "",
        };
        println!("{:<7} {:<7} {:<7} {}", format.name(), encode, decode, notes);
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pixpress=debug"
    } else {
        "pixpress=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
