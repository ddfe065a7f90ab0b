//! AlgoTracker sample bank (.raw)
//!
//! POD format, all multi-byte values little-endian.
//!
//! # Layout
//! ```text
//! 0x00: magic u8 ('A')
//! 0x01: count u8 (N)
//! 0x02: offsets [u16 LE; N + 1]
//!         offsets[i] = start of sample i, relative to the start of the bank
//!         offsets[N] = sentinel, one past the last data byte (= bank size)
//! 0x02 + 2(N+1): sample data
//! ```
//!
//! Consumers compute the length of sample `i` as `offsets[i + 1] - offsets[i]`,
//! so the sentinel replaces a per-sample length field.

use std::io::Write;

use thiserror::Error;

use crate::{BANK_MAGIC, MAX_OFFSET, MAX_SAMPLES};

/// One resampled clip (8-bit unsigned PCM)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Identifier derived from the source file name
    pub name: String,
    pub data: Vec<u8>,
}

impl Sample {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Errors produced while packing or parsing a bank
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    /// More samples than the one-byte count field can hold
    #[error("too many samples: {count} (a bank holds at most {max})", max = MAX_SAMPLES)]
    TooManySamples { count: usize },

    /// An offset table entry does not fit in 16 bits
    #[error(
        "offset {offset} for entry {index} exceeds the 16-bit offset table (max {max})",
        max = MAX_OFFSET
    )]
    OffsetOverflow { index: usize, offset: usize },

    #[error("bad bank magic 0x{0:02x} (expected 0x{expected:02x})", expected = BANK_MAGIC)]
    BadMagic(u8),

    #[error("bank truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("first offset {found} does not match header size {expected}")]
    MisplacedData { expected: usize, found: usize },

    #[error("offset table decreases at entry {index}")]
    NonMonotonicOffsets { index: usize },

    #[error("sentinel offset {sentinel} does not match bank size {actual}")]
    LengthMismatch { sentinel: usize, actual: usize },
}

impl BankError {
    /// True when the input set does not fit the format's 1-byte/2-byte fields
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            BankError::TooManySamples { .. } | BankError::OffsetOverflow { .. }
        )
    }
}

/// Size of magic + count + offset table for `count` samples
///
/// The offset table has `count + 1` entries (the last one is the sentinel),
/// so an empty bank still carries a 4-byte header.
pub const fn header_size(count: usize) -> usize {
    2 + 2 * (count + 1)
}

/// A packed sample bank with a finalized offset table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    /// `count + 1` entries, the last one is the sentinel
    offsets: Vec<u16>,
    data: Vec<u8>,
}

impl Bank {
    /// Pack samples in the given order
    ///
    /// The offset table is accumulated over the sample sizes, starting after
    /// the header. Every offset is known before any byte is produced, so a
    /// bank that does not fit is rejected without partial output.
    pub fn pack(samples: &[Sample]) -> Result<Self, BankError> {
        let count = samples.len();
        if count > MAX_SAMPLES {
            return Err(BankError::TooManySamples { count });
        }

        tracing::info!("Sound count: {}", count);
        tracing::info!("Metadata");
        tracing::info!("- offsets are output as LSB, MSB");

        let mut offsets = Vec::with_capacity(count + 1);
        let mut end = header_size(count);
        for (index, sample) in samples.iter().enumerate() {
            let entry = table_entry(index, end)?;
            tracing::info!("{:<10} offset = {}", sample.name, end);
            trace_word(entry);
            tracing::info!("{:<10} size = {}", sample.name, sample.len());
            offsets.push(entry);
            end += sample.len();
        }

        let sentinel = table_entry(count, end)?;
        trace_word(sentinel);
        offsets.push(sentinel);

        let mut data = Vec::with_capacity(end - header_size(count));
        for sample in samples {
            data.extend_from_slice(&sample.data);
        }

        Ok(Self { offsets, data })
    }

    /// Parse and validate a serialized bank
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BankError> {
        if bytes.len() < 2 {
            return Err(BankError::Truncated {
                expected: 2,
                actual: bytes.len(),
            });
        }
        if bytes[0] != BANK_MAGIC {
            return Err(BankError::BadMagic(bytes[0]));
        }

        let count = bytes[1] as usize;
        let header = header_size(count);
        if bytes.len() < header {
            return Err(BankError::Truncated {
                expected: header,
                actual: bytes.len(),
            });
        }

        let offsets: Vec<u16> = bytes[2..header]
            .chunks_exact(2)
            .map(|word| u16::from_le_bytes([word[0], word[1]]))
            .collect();

        if offsets[0] as usize != header {
            return Err(BankError::MisplacedData {
                expected: header,
                found: offsets[0] as usize,
            });
        }
        if let Some(index) = offsets.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(BankError::NonMonotonicOffsets { index: index + 1 });
        }

        let sentinel = offsets[count] as usize;
        if sentinel != bytes.len() {
            return Err(BankError::LengthMismatch {
                sentinel,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            offsets,
            data: bytes[header..].to_vec(),
        })
    }

    /// Number of samples
    pub fn count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Offset table including the sentinel
    pub fn offsets(&self) -> &[u16] {
        &self.offsets
    }

    /// Total serialized size in bytes (equal to the sentinel offset)
    pub fn size(&self) -> usize {
        header_size(self.count()) + self.data.len()
    }

    /// Data of sample `index`
    pub fn sample(&self, index: usize) -> Option<&[u8]> {
        let header = header_size(self.count());
        let start = *self.offsets.get(index)? as usize;
        let end = *self.offsets.get(index + 1)? as usize;
        self.data.get(start - header..end - header)
    }

    /// Iterate over sample data in bank order
    pub fn samples(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.count()).filter_map(|index| self.sample(index))
    }

    /// Serialize: magic, count, offset table (LSB first), data
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.push(BANK_MAGIC);
        bytes.push(self.count() as u8);
        for offset in &self.offsets {
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// Write the complete bank to a binary sink
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.to_bytes())
    }
}

fn table_entry(index: usize, offset: usize) -> Result<u16, BankError> {
    u16::try_from(offset).map_err(|_| BankError::OffsetOverflow { index, offset })
}

fn trace_word(value: u16) {
    let [lsb, msb] = value.to_le_bytes();
    tracing::info!("  bank <- {:>6} [ {:02x} {:02x} ]", value, lsb, msb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples_of_sizes(sizes: &[usize]) -> Vec<Sample> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| Sample::new(format!("s{}", i), vec![i as u8; size]))
            .collect()
    }

    #[test]
    fn test_single_sample_layout() {
        let bank = Bank::pack(&[Sample::new("ab", b"AB".to_vec())]).unwrap();
        assert_eq!(
            bank.to_bytes(),
            vec![BANK_MAGIC, 0x01, 0x06, 0x00, 0x08, 0x00, 0x41, 0x42]
        );
        assert_eq!(bank.offsets(), &[6, 8]);
        assert_eq!(bank.size(), 8);
    }

    #[test]
    fn test_empty_bank_is_header_only() {
        let bank = Bank::pack(&[]).unwrap();
        assert_eq!(bank.count(), 0);
        assert_eq!(bank.offsets(), &[4]);
        assert_eq!(bank.to_bytes(), vec![BANK_MAGIC, 0x00, 0x04, 0x00]);
        assert_eq!(bank.to_bytes().len(), bank.offsets()[0] as usize);
    }

    #[test]
    fn test_header_size() {
        assert_eq!(header_size(0), 4);
        assert_eq!(header_size(1), 6);
        assert_eq!(header_size(3), 10);
        assert_eq!(header_size(255), 514);
    }

    #[test]
    fn test_offsets_match_sample_sizes() {
        let sizes = [3, 0, 17, 1, 250, 0];
        let samples = samples_of_sizes(&sizes);
        let bank = Bank::pack(&samples).unwrap();
        let offsets = bank.offsets();

        assert_eq!(offsets.len(), sizes.len() + 1);
        assert_eq!(offsets[0] as usize, header_size(sizes.len()));
        for (i, size) in sizes.iter().enumerate() {
            assert_eq!((offsets[i + 1] - offsets[i]) as usize, *size);
        }
        assert_eq!(*offsets.last().unwrap() as usize, bank.to_bytes().len());
    }

    #[test]
    fn test_sample_data_follows_offsets() {
        let samples = vec![
            Sample::new("kick", vec![1, 2, 3]),
            Sample::new("snare", vec![]),
            Sample::new("hat", vec![9, 8]),
        ];
        let bank = Bank::pack(&samples).unwrap();
        let bytes = bank.to_bytes();

        for (i, sample) in samples.iter().enumerate() {
            let start = bank.offsets()[i] as usize;
            let end = bank.offsets()[i + 1] as usize;
            assert_eq!(&bytes[start..end], sample.data.as_slice());
            assert_eq!(bank.sample(i), Some(sample.data.as_slice()));
        }
        assert_eq!(bank.sample(3), None);
        assert_eq!(bank.samples().count(), 3);
    }

    #[test]
    fn test_offsets_little_endian() {
        let bank = Bank::pack(&samples_of_sizes(&[0x1234])).unwrap();
        let bytes = bank.to_bytes();
        // 6 + 0x1234 = 0x123a
        assert_eq!(&bytes[2..6], &[0x06, 0x00, 0x3a, 0x12]);
    }

    #[test]
    fn test_max_sample_count() {
        let samples = samples_of_sizes(&[0; MAX_SAMPLES]);
        let bank = Bank::pack(&samples).unwrap();
        assert_eq!(bank.count(), 255);
        assert_eq!(bank.to_bytes()[1], 255);
    }

    #[test]
    fn test_too_many_samples() {
        let samples = samples_of_sizes(&[0; MAX_SAMPLES + 1]);
        let err = Bank::pack(&samples).unwrap_err();
        assert_eq!(err, BankError::TooManySamples { count: 256 });
        assert!(err.is_capacity_exceeded());
    }

    #[test]
    fn test_sentinel_at_u16_max() {
        let bank = Bank::pack(&samples_of_sizes(&[MAX_OFFSET - 6])).unwrap();
        assert_eq!(bank.offsets()[1], u16::MAX);
        assert_eq!(bank.to_bytes().len(), MAX_OFFSET);
    }

    #[test]
    fn test_sentinel_past_u16_max() {
        let err = Bank::pack(&samples_of_sizes(&[MAX_OFFSET - 5])).unwrap_err();
        assert_eq!(
            err,
            BankError::OffsetOverflow {
                index: 1,
                offset: 65536
            }
        );
        assert!(err.is_capacity_exceeded());
    }

    #[test]
    fn test_start_offset_overflow() {
        let err = Bank::pack(&samples_of_sizes(&[MAX_OFFSET, 1])).unwrap_err();
        assert!(matches!(err, BankError::OffsetOverflow { index: 1, .. }));
    }

    #[test]
    fn test_parse_roundtrip() {
        let bank = Bank::pack(&samples_of_sizes(&[5, 0, 12])).unwrap();
        let parsed = Bank::from_bytes(&bank.to_bytes()).unwrap();
        assert_eq!(parsed, bank);

        let empty = Bank::pack(&[]).unwrap();
        assert_eq!(Bank::from_bytes(&empty.to_bytes()).unwrap(), empty);
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = Bank::pack(&[]).unwrap().to_bytes();
        bytes[0] = b'Z';
        assert_eq!(Bank::from_bytes(&bytes), Err(BankError::BadMagic(b'Z')));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            BankError::BadMagic(b'Z').to_string(),
            "bad bank magic 0x5a (expected 0x41)"
        );
        assert_eq!(
            BankError::TooManySamples { count: 256 }.to_string(),
            "too many samples: 256 (a bank holds at most 255)"
        );
        assert_eq!(
            BankError::OffsetOverflow {
                index: 1,
                offset: 65536
            }
            .to_string(),
            "offset 65536 for entry 1 exceeds the 16-bit offset table (max 65535)"
        );
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert_eq!(
            Bank::from_bytes(&[BANK_MAGIC]),
            Err(BankError::Truncated {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            Bank::from_bytes(&[BANK_MAGIC, 2, 8, 0]),
            Err(BankError::Truncated {
                expected: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_parse_rejects_inconsistent_tables() {
        let bank = Bank::pack(&samples_of_sizes(&[4, 4])).unwrap();

        let mut trailing = bank.to_bytes();
        trailing.push(0);
        assert_eq!(
            Bank::from_bytes(&trailing),
            Err(BankError::LengthMismatch {
                sentinel: 16,
                actual: 17
            })
        );

        let mut shifted = bank.to_bytes();
        shifted[2] = 9;
        assert_eq!(
            Bank::from_bytes(&shifted),
            Err(BankError::MisplacedData {
                expected: 8,
                found: 9
            })
        );

        let mut decreasing = bank.to_bytes();
        // offsets [8, 12, 16] -> [8, 20, 16]
        decreasing[4] = 20;
        assert_eq!(
            Bank::from_bytes(&decreasing),
            Err(BankError::NonMonotonicOffsets { index: 2 })
        );
    }

    #[test]
    fn test_write_to() {
        let bank = Bank::pack(&samples_of_sizes(&[2])).unwrap();
        let mut out = Vec::new();
        bank.write_to(&mut out).unwrap();
        assert_eq!(out, bank.to_bytes());
    }
}
