//! smpbank-export library
//!
//! Discovery, resampling and build orchestration for the `smpbank-export`
//! tool. The bank and cart formats themselves live in the `smpbank` crate.

pub mod discover;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod resample;

pub use error::ExportError;
pub use manifest::{Backend, FailurePolicy, Manifest};
pub use pipeline::{build, BuildReport};
pub use resample::{BuiltinResampler, ResampleError, Resampler, SoxResampler};

/// Default manifest file name
pub const MANIFEST_FILE: &str = "smpbank.toml";
