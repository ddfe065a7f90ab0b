//! Build orchestration
//!
//! discover -> resample -> pack -> encode -> write. Both artifacts are built
//! in memory, staged as temporary siblings of their destinations and only
//! renamed into place once both are fully written. A failed run leaves the
//! previous outputs untouched.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use smpbank::{cart, Bank, Sample, GFX_SECTION_CAPACITY};
use tempfile::NamedTempFile;

use crate::discover::{discover_sources, SourceFile};
use crate::manifest::{FailurePolicy, Manifest};
use crate::resample::Resampler;
use crate::ExportError;

/// Where one sample landed in the bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntry {
    pub name: String,
    pub offset: u16,
    pub size: usize,
}

/// An input left out under the skip policy
#[derive(Debug, Clone)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub samples: Vec<SampleEntry>,
    pub skipped: Vec<SkippedSource>,
    pub bank_path: PathBuf,
    pub bank_size: usize,
    pub cart_path: PathBuf,
    pub cart_lines: usize,
}

/// Resampled samples in bank order
#[derive(Debug, Default)]
pub struct Collected {
    pub samples: Vec<Sample>,
    pub skipped: Vec<SkippedSource>,
}

/// Resample every source in order, applying the failure policy
pub fn collect_samples(
    sources: &[SourceFile],
    resampler: &dyn Resampler,
    policy: FailurePolicy,
) -> Result<Collected, ExportError> {
    let mut collected = Collected::default();

    for source in sources {
        match resampler.resample(&source.path) {
            Ok(data) => {
                tracing::debug!("{}: {} bytes", source.name, data.len());
                let sample = Sample::new(source.name.clone(), data);
                collected.samples.push(sample);
            }
            Err(err) if policy == FailurePolicy::Skip => {
                tracing::warn!("Skipping {}: {}", source.path.display(), err);
                collected.skipped.push(SkippedSource {
                    path: source.path.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(collected)
}

/// Run the full pipeline described by `manifest`
pub fn build(manifest: &Manifest, resampler: &dyn Resampler) -> Result<BuildReport, ExportError> {
    manifest.validate()?;
    let layout = manifest.cart_layout()?;

    let sources = discover_sources(&manifest.input.dir, &manifest.input.extensions)?;
    tracing::info!(
        "Found {} input file(s) in {}",
        sources.len(),
        manifest.input.dir.display()
    );

    let collected = collect_samples(&sources, resampler, manifest.resample.on_error)?;
    if collected.samples.is_empty() && !manifest.input.allow_empty {
        return Err(ExportError::EmptyInput {
            dir: manifest.input.dir.clone(),
        });
    }

    let bank = Bank::pack(&collected.samples)?;
    let bank_bytes = bank.to_bytes();
    tracing::info!("length: {}", bank_bytes.len());
    if bank_bytes.len() > GFX_SECTION_CAPACITY {
        tracing::warn!(
            "Bank is {} bytes, larger than the {} bytes addressable through __gfx__",
            bank_bytes.len(),
            GFX_SECTION_CAPACITY
        );
    }

    let cart = cart::encode(&bank_bytes, layout);

    let staged_bank = stage_output(&manifest.output.bank, |w| bank.write_to(w))?;
    let staged_cart = stage_output(&manifest.output.cart, |w| cart.write_to(w))?;

    commit_output(staged_cart, &manifest.output.cart)?;
    if let Err(err) = commit_output(staged_bank, &manifest.output.bank) {
        // never leave a cart that disagrees with the bank
        let _ = std::fs::remove_file(&manifest.output.cart);
        return Err(err);
    }
    tracing::info!("Wrote bank: {}", manifest.output.bank.display());
    tracing::info!("Wrote cart: {}", manifest.output.cart.display());

    let samples = collected
        .samples
        .iter()
        .zip(bank.offsets())
        .map(|(sample, &offset)| SampleEntry {
            name: sample.name.clone(),
            offset,
            size: sample.len(),
        })
        .collect();

    Ok(BuildReport {
        samples,
        skipped: collected.skipped,
        bank_path: manifest.output.bank.clone(),
        bank_size: bank_bytes.len(),
        cart_path: manifest.output.cart.clone(),
        cart_lines: cart.body_lines().len(),
    })
}

/// Write an artifact into a temporary file next to `path`
fn stage_output<F>(path: &Path, write: F) -> Result<NamedTempFile, ExportError>
where
    F: FnOnce(&mut BufWriter<&File>) -> std::io::Result<()>,
{
    let io_error = |source| ExportError::io(path, source);

    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::io(parent, source))?;
            parent
        }
        None => Path::new("."),
    };

    let staged = NamedTempFile::new_in(dir).map_err(|source| ExportError::io(dir, source))?;
    {
        let mut writer = BufWriter::new(staged.as_file());
        write(&mut writer).map_err(io_error)?;
        writer.flush().map_err(io_error)?;
    }
    Ok(staged)
}

/// Rename a staged artifact over its destination
fn commit_output(staged: NamedTempFile, path: &Path) -> Result<(), ExportError> {
    staged
        .persist(path)
        .map(|_| ())
        .map_err(|err| ExportError::io(path, err.error))
}

pub fn print_summary(report: &BuildReport) {
    println!();
    println!(
        "Created: {} ({} bytes, {} samples)",
        report.bank_path.display(),
        report.bank_size,
        report.samples.len()
    );
    println!(
        "Created: {} ({} body lines)",
        report.cart_path.display(),
        report.cart_lines
    );
    for entry in &report.samples {
        println!(
            "  {:<10} offset {:>5}  size {:>5}",
            entry.name, entry.offset, entry.size
        );
    }
    if !report.skipped.is_empty() {
        println!("  Skipped {} input(s):", report.skipped.len());
        for skipped in &report.skipped {
            println!("    {}: {}", skipped.path.display(), skipped.reason);
        }
    }
}
