//! Manifest parsing (smpbank.toml)
//!
//! Every field is optional; an empty manifest means:
//!
//! ```toml
//! [input]
//! dir = "input"
//! extensions = ["wav"]
//! allow_empty = false
//!
//! [output]
//! bank = "bank.raw"
//! cart = "samples.p8"
//! # log = "genbank-log.txt"
//!
//! [resample]
//! backend = "builtin"     # or "sox"
//! sample_rate = 5512
//! on_error = "abort"      # or "skip"
//! sox = "sox"
//!
//! [cart]
//! line_width = 128
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use smpbank::{CartLayout, DEFAULT_LINE_WIDTH, DEFAULT_SAMPLE_RATE};

use crate::ExportError;

/// Root manifest structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub resample: ResampleConfig,
    #[serde(default)]
    pub cart: CartConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dir: PathBuf,
    /// Matched case-insensitively, without the leading dot
    pub extensions: Vec<String>,
    /// Produce a header-only bank instead of failing when nothing is found
    pub allow_empty: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("input"),
            extensions: vec!["wav".to_string()],
            allow_empty: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub bank: PathBuf,
    pub cart: PathBuf,
    pub log: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bank: PathBuf::from("bank.raw"),
            cart: PathBuf::from("samples.p8"),
            log: None,
        }
    }
}

/// Which resampler turns source audio into 8-bit unsigned PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process WAV decoding and linear resampling
    #[default]
    Builtin,
    /// External `sox` process
    Sox,
}

/// What to do when one input cannot be resampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole build
    #[default]
    Abort,
    /// Warn and leave the sample out of the bank
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub backend: Backend,
    pub sample_rate: u32,
    pub on_error: FailurePolicy,
    /// Program name or path used by the sox backend
    pub sox: PathBuf,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            on_error: FailurePolicy::default(),
            sox: PathBuf::from("sox"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Body line width in hex characters
    pub line_width: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl Manifest {
    /// Parse manifest text without touching the filesystem
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a manifest; relative paths resolve against its directory
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ExportError::io(path, source))?;
        let mut manifest = Self::parse(&content).map_err(|source| ExportError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.resolve_paths(base_dir);
        Ok(manifest)
    }

    /// Rebase relative input/output paths onto `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };
        rebase(&mut self.input.dir);
        rebase(&mut self.output.bank);
        rebase(&mut self.output.cart);
        if let Some(log) = &mut self.output.log {
            rebase(log);
        }
    }

    /// Cart wrapping derived from `[cart]`
    pub fn cart_layout(&self) -> Result<CartLayout, ExportError> {
        Ok(CartLayout::new(self.cart.line_width)?)
    }

    /// Check the values serde cannot
    pub fn validate(&self) -> Result<(), ExportError> {
        self.cart_layout()?;

        if self.resample.sample_rate == 0 {
            return Err(ExportError::InvalidConfig(
                "resample.sample_rate must be greater than zero".to_string(),
            ));
        }
        if self.input.extensions.is_empty() {
            return Err(ExportError::InvalidConfig(
                "input.extensions must list at least one extension".to_string(),
            ));
        }
        if self.output.bank == self.output.cart {
            return Err(ExportError::InvalidConfig(format!(
                "bank and cart outputs both point to {}",
                self.output.bank.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_minimal() {
        let manifest = Manifest::parse("").unwrap();
        assert_eq!(manifest.input.dir, PathBuf::from("input"));
        assert_eq!(manifest.input.extensions, vec!["wav"]);
        assert!(!manifest.input.allow_empty);
        assert_eq!(manifest.output.bank, PathBuf::from("bank.raw"));
        assert_eq!(manifest.output.cart, PathBuf::from("samples.p8"));
        assert_eq!(manifest.output.log, None);
        assert_eq!(manifest.resample.backend, Backend::Builtin);
        assert_eq!(manifest.resample.sample_rate, 5512);
        assert_eq!(manifest.resample.on_error, FailurePolicy::Abort);
        assert_eq!(manifest.cart.line_width, 128);
        manifest.validate().unwrap();
    }

    #[test]
    fn test_manifest_full() {
        let manifest = Manifest::parse(
            r#"
[input]
dir = "sounds"
extensions = ["wav", "aiff"]
allow_empty = true

[output]
bank = "build/bank.raw"
cart = "build/samples.p8"
log = "build/genbank-log.txt"

[resample]
backend = "sox"
sample_rate = 11025
on_error = "skip"
sox = "/usr/local/bin/sox"

[cart]
line_width = 64
"#,
        )
        .unwrap();

        assert_eq!(manifest.input.dir, PathBuf::from("sounds"));
        assert_eq!(manifest.input.extensions, vec!["wav", "aiff"]);
        assert!(manifest.input.allow_empty);
        assert_eq!(
            manifest.output.log,
            Some(PathBuf::from("build/genbank-log.txt"))
        );
        assert_eq!(manifest.resample.backend, Backend::Sox);
        assert_eq!(manifest.resample.sample_rate, 11025);
        assert_eq!(manifest.resample.on_error, FailurePolicy::Skip);
        assert_eq!(manifest.resample.sox, PathBuf::from("/usr/local/bin/sox"));
        assert_eq!(manifest.cart_layout().unwrap().bytes_per_line(), 32);
    }

    #[test]
    fn test_manifest_rejects_unknown_backend() {
        assert!(Manifest::parse("[resample]\nbackend = \"ffmpeg\"\n").is_err());
    }

    #[test]
    fn test_validate_errors() {
        let mut manifest = Manifest::default();
        manifest.cart.line_width = 127;
        assert!(matches!(manifest.validate(), Err(ExportError::Cart(_))));

        let mut manifest = Manifest::default();
        manifest.resample.sample_rate = 0;
        assert!(matches!(
            manifest.validate(),
            Err(ExportError::InvalidConfig(_))
        ));

        let mut manifest = Manifest::default();
        manifest.input.extensions.clear();
        assert!(matches!(
            manifest.validate(),
            Err(ExportError::InvalidConfig(_))
        ));

        let mut manifest = Manifest::default();
        manifest.output.cart = manifest.output.bank.clone();
        assert!(matches!(
            manifest.validate(),
            Err(ExportError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("smpbank.toml");
        std::fs::write(
            &path,
            "[input]\ndir = \"wavs\"\n[output]\ncart = \"/abs/samples.p8\"\nlog = \"trace.txt\"\n",
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.input.dir, dir.path().join("wavs"));
        assert_eq!(manifest.output.bank, dir.path().join("bank.raw"));
        assert_eq!(manifest.output.cart, PathBuf::from("/abs/samples.p8"));
        assert_eq!(manifest.output.log, Some(dir.path().join("trace.txt")));
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Manifest::load(&missing),
            Err(ExportError::Io { path, .. }) if path == missing
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[cart]\nline_width = \"wide\"\n").unwrap();
        assert!(matches!(
            Manifest::load(&broken),
            Err(ExportError::Manifest { .. })
        ));
    }
}
