//! Command-line interface for the PPMS figure pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::color::{demo_blends, to_hex, PaletteKind};
use crate::core::{load_extracted, write_extracted, write_family_csv};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "ppms-pipeline")]
#[command(about = "Depth-profile and magnetotransport figure pipeline", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plot implantation depth profiles
    DepthProfile {
        /// Output image (.png or .svg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Raster resolution
        #[arg(long)]
        dpi: Option<u32>,
    },

    /// Symmetrize PPMS sweeps into the extraction cache
    Extract {
        /// Directory holding one subdirectory per sample
        #[arg(short, long)]
        base_dir: Option<PathBuf>,
        /// Cache file to write
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Bridge channel to read
        #[arg(long)]
        channel: Option<u32>,
        /// Also write one CSV table per sample and geometry into this directory
        #[arg(long)]
        export_csv: Option<PathBuf>,
    },

    /// Draw the colorbar, resistivity and magnetoresistance figures
    Plot {
        /// Extraction cache to read
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Directory for the figures
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Figure format (png or svg)
        #[arg(short, long)]
        format: Option<String>,
        /// Line colour palette
        #[arg(short, long, value_enum)]
        palette: Option<PaletteKind>,
        /// Smoothing window in grid points
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Print colour blends and palette samples
    Colors {
        /// Also print samples of this palette
        #[arg(short, long, value_enum)]
        palette: Option<PaletteKind>,
        /// Number of palette samples
        #[arg(short = 'n', long, default_value_t = 26)]
        count: usize,
    },

    /// Write the default configuration as YAML
    InitConfig {
        /// Destination file
        #[arg(default_value = "pipeline.yaml")]
        path: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::DepthProfile { output, dpi } => {
            cmd_depth_profile(output, dpi, config);
        }
        Commands::Extract { base_dir, output, channel, export_csv } => {
            cmd_extract(base_dir, output, channel, export_csv, config);
        }
        Commands::Plot { cache, output_dir, format, palette, window } => {
            cmd_plot(cache, output_dir, format, palette, window, config);
        }
        Commands::Colors { palette, count } => {
            cmd_colors(palette, count);
        }
        Commands::InitConfig { path } => {
            cmd_init_config(&path, &config);
        }
    }
}

fn cmd_depth_profile(output: Option<PathBuf>, dpi: Option<u32>, config: PipelineConfig) {
    use crate::processors::figures;

    let start = Instant::now();

    let mut profile_config = config.depth_profile;
    if let Some(output) = output {
        profile_config.output = output;
    }
    if let Some(dpi) = dpi {
        profile_config.dpi = dpi;
    }

    let spinner = create_spinner("Rendering depth profiles...");

    match figures::render_depth_profile(&profile_config) {
        Ok(path) => {
            spinner.finish_and_clear();

            let labels: Vec<&str> = profile_config.profiles.iter().map(|p| p.label.as_str()).collect();
            print_summary(
                "Depth Profile Complete",
                &[
                    ("Profiles", labels.join(", ")),
                    ("Output", path.display().to_string()),
                    ("DPI", profile_config.dpi.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Depth profile failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_extract(
    base_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    channel: Option<u32>,
    export_csv: Option<PathBuf>,
    config: PipelineConfig,
) {
    use crate::processors::extraction;

    let start = Instant::now();

    let mut extraction_config = config.extraction;
    if let Some(base_dir) = base_dir {
        extraction_config.base_dir = base_dir;
    }
    if let Some(output) = output {
        extraction_config.cache_path = output;
    }
    if let Some(channel) = channel {
        extraction_config.channel = channel;
    }

    println!("Extracting resistivity families...");
    println!("Base directory: {}", extraction_config.base_dir.display());
    println!("Samples: {}", extraction_config.samples.join(", "));

    let spinner = create_spinner("Symmetrizing field sweeps...");

    let data = match extraction::extract_all(&extraction_config) {
        Ok(data) => data,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Extraction failed: {:#}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Writing cache...");

    if let Err(e) = write_extracted(&extraction_config.cache_path, &data) {
        spinner.finish_and_clear();
        error!("Failed to write cache: {}", e);
        std::process::exit(1);
    }

    let mut exported = 0usize;
    if let Some(dir) = &export_csv {
        spinner.set_message("Exporting CSV tables...");
        for (sample, families) in data.ordered_samples() {
            for (experiment, family) in families {
                let path = dir.join(format!("{}_{}.csv", experiment, sample));
                if let Err(e) = write_family_csv(&path, &data.fields, family) {
                    spinner.finish_and_clear();
                    error!("CSV export failed: {}", e);
                    std::process::exit(1);
                }
                exported += 1;
            }
        }
    }

    spinner.finish_and_clear();

    let sweeps: usize = data
        .samples
        .values()
        .flat_map(|families| families.values())
        .map(|family| family.len())
        .sum();

    print_summary(
        "Extraction Complete",
        &[
            ("Base directory", extraction_config.base_dir.display().to_string()),
            ("Samples", data.samples.len().to_string()),
            ("Sweeps", sweeps.to_string()),
            ("Field points", data.fields.len().to_string()),
            ("Cache", extraction_config.cache_path.display().to_string()),
            ("CSV tables", exported.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_plot(
    cache: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    format: Option<String>,
    palette: Option<PaletteKind>,
    window: Option<usize>,
    config: PipelineConfig,
) {
    use crate::processors::figures;

    let start = Instant::now();

    let cache_path = cache.unwrap_or(config.extraction.cache_path);
    let mut plot_config = config.plot;
    if let Some(dir) = output_dir {
        plot_config.output_dir = dir;
    }
    if let Some(format) = format {
        plot_config.format = format;
    }
    if let Some(palette) = palette {
        plot_config.palette = palette;
    }
    if let Some(window) = window {
        plot_config.smoothing_window = window;
    }

    let spinner = create_spinner("Loading extraction cache...");

    let data = match load_extracted(&cache_path) {
        Ok(data) => data,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load cache {}: {}", cache_path.display(), e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Rendering figures...");

    match figures::render_transport_figures(&data, &plot_config) {
        Ok(paths) => {
            spinner.finish_and_clear();

            print_summary(
                "Plotting Complete",
                &[
                    ("Cache", cache_path.display().to_string()),
                    ("Output directory", plot_config.output_dir.display().to_string()),
                    ("Figures", paths.len().to_string()),
                    ("Palette", plot_config.palette.to_string()),
                    ("Window", plot_config.smoothing_window.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Plotting failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_colors(palette: Option<PaletteKind>, count: usize) {
    match demo_blends() {
        Ok(blends) => {
            for (description, hex) in blends {
                println!("{:<28} {}", description, hex);
            }
        }
        Err(e) => {
            error!("Colour blending failed: {}", e);
            std::process::exit(1);
        }
    }

    let Some(kind) = palette else {
        return;
    };

    match kind.line_colors(count) {
        Ok(colors) => {
            println!();
            println!("{} ({} samples):", kind, count);
            for (i, color) in colors.into_iter().enumerate() {
                println!("{:>4} {}", i, to_hex(color));
            }
        }
        Err(e) => {
            error!("Failed to build palette {}: {}", kind, e);
            std::process::exit(1);
        }
    }
}

fn cmd_init_config(path: &Path, config: &PipelineConfig) {
    if path.exists() {
        warn!("Overwriting existing config: {}", path.display());
    }

    match config.to_yaml(path) {
        Ok(()) => println!("Wrote config to {}", path.display()),
        Err(e) => {
            error!("Failed to write config: {}", e);
            std::process::exit(1);
        }
    }
}
