//! smpbank-export - AlgoTracker sample bank export tool
//!
//! Packs a directory of WAV samples into an offset-indexed bank (.raw) and
//! embeds that bank in the `__gfx__` section of a PICO-8 cart (.p8).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use smpbank::{cart, Bank, CartLayout, CART_IDENTIFIER, DEFAULT_LINE_WIDTH};
use smpbank_export::{
    discover, pipeline, resample, Backend, FailurePolicy, Manifest, MANIFEST_FILE,
};

#[derive(Parser)]
#[command(name = "smpbank-export")]
#[command(about = "AlgoTracker sample bank export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (byte-level offset trace)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write the trace to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build bank and cart from a manifest (or from defaults)
    Build {
        /// Path to smpbank.toml (defaults to ./smpbank.toml when present)
        manifest: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Validate manifest and list inputs without building
    Check {
        /// Path to smpbank.toml (defaults to ./smpbank.toml when present)
        manifest: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Encode any binary file as a PICO-8 cart
    Encode {
        /// Input binary file
        input: PathBuf,

        /// Output .p8 file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Body line width in hex characters
        #[arg(long, default_value_t = DEFAULT_LINE_WIDTH)]
        line_width: usize,
    },

    /// Extract the binary blob from a cart's __gfx__ section
    Decode {
        /// Input .p8 file
        input: PathBuf,

        /// Output binary file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the offset table of a bank (.raw or .p8)
    Inspect {
        /// Bank or cart file
        input: PathBuf,
    },
}

/// Command-line overrides applied on top of the manifest
#[derive(Args)]
struct Overrides {
    /// Input directory
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output bank file
    #[arg(long)]
    bank: Option<PathBuf>,

    /// Output cart file
    #[arg(long)]
    cart: Option<PathBuf>,

    /// Target sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Body line width in hex characters
    #[arg(long)]
    line_width: Option<usize>,

    /// Resampler backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Skip inputs that fail to resample instead of aborting
    #[arg(long)]
    skip_failed: bool,

    /// Produce a header-only bank when no inputs are found
    #[arg(long)]
    allow_empty: bool,
}

impl Overrides {
    fn apply(self, manifest: &mut Manifest) {
        if let Some(input) = self.input {
            manifest.input.dir = input;
        }
        if let Some(bank) = self.bank {
            manifest.output.bank = bank;
        }
        if let Some(cart) = self.cart {
            manifest.output.cart = cart;
        }
        if let Some(sample_rate) = self.sample_rate {
            manifest.resample.sample_rate = sample_rate;
        }
        if let Some(line_width) = self.line_width {
            manifest.cart.line_width = line_width;
        }
        if let Some(backend) = self.backend {
            manifest.resample.backend = backend;
        }
        if self.skip_failed {
            manifest.resample.on_error = FailurePolicy::Skip;
        }
        if self.allow_empty {
            manifest.input.allow_empty = true;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            manifest,
            overrides,
        } => {
            let manifest = load_manifest(manifest.as_deref(), overrides)?;
            let log_file = cli.log_file.or_else(|| manifest.output.log.clone());
            init_logging(cli.verbose, log_file.as_deref())?;

            manifest.validate()?;
            let resampler = resample::from_config(&manifest.resample)?;
            let report = pipeline::build(&manifest, resampler.as_ref())?;
            pipeline::print_summary(&report);
        }

        Commands::Check {
            manifest,
            overrides,
        } => {
            let manifest = load_manifest(manifest.as_deref(), overrides)?;
            init_logging(cli.verbose, cli.log_file.as_deref())?;

            manifest.validate()?;
            resample::from_config(&manifest.resample)?;
            let input = &manifest.input;
            let sources = discover::discover_sources(&input.dir, &input.extensions)?;

            println!("Inputs in {} (bank order):", input.dir.display());
            for (index, source) in sources.iter().enumerate() {
                let path = source.path.display();
                println!("  [{:>3}] {:<10} {}", index, source.name, path);
            }
            println!("Manifest is valid ({} inputs)", sources.len());
        }

        Commands::Encode {
            input,
            output,
            line_width,
        } => {
            init_logging(cli.verbose, cli.log_file.as_deref())?;
            let output = output.unwrap_or_else(|| input.with_extension("p8"));
            tracing::info!("Encoding {:?} -> {:?}", input, output);

            let layout = CartLayout::new(line_width)?;
            let blob = std::fs::read(&input)
                .with_context(|| format!("Failed to read input: {}", input.display()))?;
            let doc = cart::encode(&blob, layout);
            std::fs::write(&output, doc.to_text())
                .with_context(|| format!("Failed to write cart: {}", output.display()))?;
            tracing::info!("length: {}", blob.len());
        }

        Commands::Decode { input, output } => {
            init_logging(cli.verbose, cli.log_file.as_deref())?;
            let output = output.unwrap_or_else(|| input.with_extension("bin"));
            tracing::info!("Decoding {:?} -> {:?}", input, output);

            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read cart: {}", input.display()))?;
            let blob = cart::decode(&text)
                .with_context(|| format!("Failed to decode cart: {}", input.display()))?;
            std::fs::write(&output, &blob)
                .with_context(|| format!("Failed to write output: {}", output.display()))?;
            tracing::info!("length: {}", blob.len());
        }

        Commands::Inspect { input } => {
            init_logging(cli.verbose, cli.log_file.as_deref())?;
            inspect(&input)?;
        }
    }

    Ok(())
}

/// Explicit manifest must exist; otherwise ./smpbank.toml is optional
fn load_manifest(path: Option<&Path>, overrides: Overrides) -> Result<Manifest> {
    let mut manifest = match path {
        Some(path) => Manifest::load(path)?,
        None if Path::new(MANIFEST_FILE).exists() => Manifest::load(Path::new(MANIFEST_FILE))?,
        None => Manifest::default(),
    };
    overrides.apply(&mut manifest);
    Ok(manifest)
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .without_time()
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;

    let bytes = if data.starts_with(CART_IDENTIFIER.as_bytes()) {
        let text = String::from_utf8(data)
            .with_context(|| format!("Cart is not valid UTF-8: {}", path.display()))?;
        cart::decode(&text)
            .with_context(|| format!("Failed to decode cart: {}", path.display()))?
    } else {
        data
    };

    let bank = Bank::from_bytes(&bytes)
        .with_context(|| format!("Not a valid sample bank: {}", path.display()))?;

    println!("Bank: {} ({} bytes)", path.display(), bank.size());
    println!("  Samples: {}", bank.count());
    let offsets = bank.offsets();
    for (index, pair) in offsets.windows(2).enumerate() {
        let (offset, size) = (pair[0], pair[1] - pair[0]);
        println!("  [{:>3}] offset {:>5}  size {:>5}", index, offset, size);
    }
    println!("  Sentinel: {}", offsets[bank.count()]);

    Ok(())
}
