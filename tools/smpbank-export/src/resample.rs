//! Resampling collaborators
//!
//! Turns one source audio file into mono 8-bit unsigned PCM at the bank's
//! sample rate. Two backends:
//!
//! - [`BuiltinResampler`]: WAV via hound, channel downmix, linear interpolation.
//! - [`SoxResampler`]: an external
//!   `sox <in> -r <rate> -b 8 -e unsigned-integer -c 1 -t raw -` call.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;

use crate::manifest::{Backend, ResampleConfig};

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode WAV {}: {source}", .path.display())]
    Wav { path: PathBuf, source: hound::Error },

    #[error("unsupported WAV format in {}: {bits}-bit {format:?}", .path.display())]
    UnsupportedFormat {
        path: PathBuf,
        format: hound::SampleFormat,
        bits: u16,
    },

    #[error("resampler `{}` not found: {source}", .program.display())]
    ToolNotFound {
        program: PathBuf,
        source: which::Error,
    },

    #[error("`{}` failed on {} ({status}): {stderr}", .program.display(), .path.display())]
    ToolFailed {
        program: PathBuf,
        path: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
}

/// Converts one input file into raw 8-bit unsigned PCM
pub trait Resampler {
    fn resample(&self, path: &Path) -> Result<Vec<u8>, ResampleError>;
}

/// Build the resampler selected by `[resample]`
pub fn from_config(config: &ResampleConfig) -> Result<Box<dyn Resampler>, ResampleError> {
    Ok(match config.backend {
        Backend::Builtin => Box::new(BuiltinResampler::new(config.sample_rate)),
        Backend::Sox => Box::new(SoxResampler::locate(&config.sox, config.sample_rate)?),
    })
}

// =============================================================================
// Built-in backend
// =============================================================================

/// In-process WAV resampler
#[derive(Debug, Clone, Copy)]
pub struct BuiltinResampler {
    sample_rate: u32,
}

impl BuiltinResampler {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Resampler for BuiltinResampler {
    fn resample(&self, path: &Path) -> Result<Vec<u8>, ResampleError> {
        let wav_error = |source| ResampleError::Wav {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = hound::WavReader::open(path).map_err(wav_error)?;
        let spec = reader.spec();
        if !is_supported(spec) {
            return Err(ResampleError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: spec.sample_format,
                bits: spec.bits_per_sample,
            });
        }
        let samples = read_pcm16(&mut reader).map_err(wav_error)?;

        let mono = downmix(&samples, spec.channels);
        let resampled = resample_linear(&mono, spec.sample_rate, self.sample_rate);

        tracing::debug!(
            "{}: {} frames ({}Hz, {}ch) -> {} bytes ({}Hz)",
            path.display(),
            mono.len(),
            spec.sample_rate,
            spec.channels,
            resampled.len(),
            self.sample_rate
        );

        Ok(resampled.into_iter().map(to_unsigned_8bit).collect())
    }
}

fn is_supported(spec: hound::WavSpec) -> bool {
    matches!(
        (spec.sample_format, spec.bits_per_sample),
        (hound::SampleFormat::Int, 8 | 16..=32) | (hound::SampleFormat::Float, 32)
    )
}

/// Read any integer or float WAV as i16
fn read_pcm16<R: Read>(reader: &mut hound::WavReader<R>) -> hound::Result<Vec<i16>> {
    let spec = reader.spec();
    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| i16::from(v) << 8))
            .collect(),
        (hound::SampleFormat::Int, 16) => reader.samples::<i16>().collect(),
        (hound::SampleFormat::Int, bits @ 17..=32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v >> (bits - 16)) as i16))
            .collect(),
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * 32767.0) as i16))
            .collect(),
        _ => Err(hound::Error::Unsupported),
    }
}

/// Average interleaved channels into one
pub fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

/// Resample using linear interpolation
pub fn resample_linear(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if samples.is_empty() {
        return Vec::new();
    }
    if source_rate == target_rate {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos - src_idx as f64;

        let sample = if src_idx + 1 < samples.len() {
            let s1 = samples[src_idx] as f64;
            let s2 = samples[src_idx + 1] as f64;
            (s1 + (s2 - s1) * frac).round() as i16
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };

        output.push(sample);
    }

    output
}

/// Signed 16-bit to unsigned 8-bit (0x80 is silence)
pub fn to_unsigned_8bit(sample: i16) -> u8 {
    ((sample as i32 + 32768) >> 8) as u8
}

// =============================================================================
// sox backend
// =============================================================================

/// External sox resampler
#[derive(Debug, Clone)]
pub struct SoxResampler {
    program: PathBuf,
    sample_rate: u32,
}

impl SoxResampler {
    /// Resolve `program` on PATH (or as a path) once, up front
    pub fn locate(program: &Path, sample_rate: u32) -> Result<Self, ResampleError> {
        let resolved = which::which(program).map_err(|source| ResampleError::ToolNotFound {
            program: program.to_path_buf(),
            source,
        })?;
        Ok(Self {
            program: resolved,
            sample_rate,
        })
    }

    /// Arguments for one conversion, raw output on stdout
    pub fn args(&self, input: &Path) -> Vec<OsString> {
        let rate = self.sample_rate.to_string();
        let mut args = vec![input.as_os_str().to_os_string()];
        args.extend(
            [
                "-r",
                rate.as_str(),
                "-b",
                "8",
                "-e",
                "unsigned-integer",
                "-c",
                "1",
                "-t",
                "raw",
                "-",
            ]
            .map(OsString::from),
        );
        args
    }
}

impl Resampler for SoxResampler {
    fn resample(&self, path: &Path) -> Result<Vec<u8>, ResampleError> {
        let args = self.args(path);
        tracing::debug!(
            "{} {}",
            self.program.display(),
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ResampleError::Io {
                path: self.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ResampleError::ToolFailed {
                program: self.program.clone(),
                path: path.to_path_buf(),
                status: output.status,
                stderr,
            });
        }
        if !stderr.is_empty() {
            tracing::debug!("{}", stderr);
        }

        Ok(output.stdout)
    }
}
