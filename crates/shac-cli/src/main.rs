//! SHAC CLI — inspect and validate `.shac` spatial audio containers.
//!
//! The codec core itself exposes no command-line surface; this binary
//! is a thin consumer of the library API for working with files on
//! disk.
//!
//! # Usage
//!
//! ```bash
//! shac info scene.shac
//! shac info scene.shac --json
//! shac validate scene.shac
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shac_format::{read_from_path, Normalization, ShacFile};

// ───────────────────────── CLI definition ─────────────────────────

/// Top-level entry point for the `shac` binary.
#[derive(Parser)]
#[command(
    name = "shac",
    about = "Inspector for SHAC layered ambisonic audio containers",
    version
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available sub-commands.
#[derive(Subcommand)]
enum Commands {
    /// Show header and per-layer information for a .shac file.
    Info {
        /// Input .shac file path.
        input: PathBuf,

        /// Emit machine-readable JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Parse a .shac file and report the first violation, if any.
    ///
    /// Exits non-zero when the file is invalid.
    Validate {
        /// Input .shac file path.
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Validate { input } => cmd_validate(&input),
    }
}

// ───────────────────────── commands ─────────────────────────

fn cmd_info(path: &Path, json: bool) -> Result<()> {
    let file = read_from_path(path)
        .with_context(|| format!("failed to read SHAC file {}", path.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info_json(&file))?);
    } else {
        print_info(path, &file);
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let file = read_from_path(path)
        .with_context(|| format!("invalid SHAC file {}", path.display()))?;
    println!(
        "ok: {} ({} layers, order {}, {} samples at {} Hz)",
        path.display(),
        file.header.layer_count,
        file.header.order,
        file.header.samples,
        file.header.sample_rate
    );
    Ok(())
}

// ───────────────────────── output helpers ─────────────────────────

fn normalization_name(n: Normalization) -> &'static str {
    match n {
        Normalization::Sn3d => "SN3D",
        Normalization::N3d => "N3D",
    }
}

fn print_info(path: &Path, file: &ShacFile) {
    let h = &file.header;
    let duration = h.samples as f64 / h.sample_rate as f64;
    println!("File:          {}", path.display());
    println!("Version:       {}", h.version);
    println!("Order:         {} ({} channels)", h.order, h.channels);
    println!("Sample rate:   {} Hz", h.sample_rate);
    println!("Samples:       {} ({duration:.3} s)", h.samples);
    println!("Normalization: {}", normalization_name(h.normalization));
    println!("Layers:        {}", h.layer_count);
    for layer in &file.layers {
        let [x, y, z] = layer.metadata.position;
        println!(
            "  {:24} type={} position=({x:.2}, {y:.2}, {z:.2}) gain={:.2} audio={} bytes",
            layer.id,
            layer.metadata.kind,
            layer.metadata.gain,
            layer.audio.samples().len() * 4,
        );
    }
}

fn info_json(file: &ShacFile) -> serde_json::Value {
    let h = &file.header;
    serde_json::json!({
        "version": h.version,
        "order": h.order,
        "channels": h.channels,
        "sample_rate": h.sample_rate,
        "bit_depth": h.bit_depth,
        "samples": h.samples,
        "normalization": normalization_name(h.normalization),
        "layers": file.layers.iter().map(|layer| {
            serde_json::json!({
                "id": layer.id,
                "type": layer.metadata.kind,
                "position": layer.metadata.position,
                "gain": layer.metadata.gain,
                "audio_bytes": layer.audio.samples().len() * 4,
                "extra_fields": layer.metadata.extra.keys().collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
    })
}
