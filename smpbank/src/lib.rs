//! smpbank: AlgoTracker sample bank format and PICO-8 cartridge codec
//!
//! Two pure transformations over in-memory byte sequences, used in sequence by
//! the `smpbank-export` tool:
//!
//! 1. [`Bank::pack`] packs resampled 8-bit unsigned PCM clips into a single
//!    offset-indexed binary bank.
//! 2. [`cart::encode`] re-encodes any binary blob as the nibble-swapped hex body
//!    of a PICO-8 `__gfx__` section, so it can be pasted into a `.p8` cart.
//!
//! # Bank Layout
//!
//! ```text
//! 0x00: magic 'A' (u8)
//! 0x01: sample count N (u8, 0-255)
//! 0x02: offset table, (N + 1) x u16 LE
//!         N per-sample start offsets + 1 sentinel (= total bank size)
//! 0x02 + 2(N+1): sample data, concatenated in order
//! ```
//!
//! Offsets are relative to the start of the bank, so sample `i` occupies
//! `offsets[i]..offsets[i + 1]`.
//!
//! # Cart Encoding
//!
//! | Byte | Conventional hex | Cart hex |
//! |------|------------------|----------|
//! | 0x41 | `41`             | `14`     |
//! | 0xA0 | `a0`             | `0a`     |
//!
//! PICO-8 stores gfx memory with the low nibble first, so each byte is written
//! as its low digit followed by its high digit.
//!
//! # Usage
//!
//! ```
//! use smpbank::{cart, Bank, CartLayout, Sample};
//!
//! let samples = vec![Sample::new("kick", b"AB".to_vec())];
//! let bank = Bank::pack(&samples).unwrap();
//! assert_eq!(bank.to_bytes(), [b'A', 1, 6, 0, 8, 0, 0x41, 0x42]);
//!
//! let doc = cart::encode(&bank.to_bytes(), CartLayout::default());
//! assert_eq!(doc.body_lines(), ["1410600080001424"]);
//! assert_eq!(doc.decode().unwrap(), bank.to_bytes());
//! ```

pub mod bank;
pub mod cart;

pub use bank::{Bank, BankError, Sample, header_size};
pub use cart::{CartDocument, CartError, CartLayout};

// =============================================================================
// Constants
// =============================================================================

/// Bank format tag ('A' for AlgoTracker)
pub const BANK_MAGIC: u8 = b'A';

/// Maximum number of samples (count is stored in one byte)
pub const MAX_SAMPLES: usize = u8::MAX as usize;

/// Largest offset representable in the u16 offset table
pub const MAX_OFFSET: usize = u16::MAX as usize;

/// Default resampling rate of AlgoTracker samples (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 5512;

/// Cartridge identifier line
pub const CART_IDENTIFIER: &str = "pico-8 cartridge // http://www.pico-8.com";

/// Cartridge version line
pub const CART_VERSION: &str = "version 33";

/// Section marker under which the body is read as gfx memory
pub const GFX_SECTION: &str = "__gfx__";

/// Default body line width in hex characters (64 bytes per line)
pub const DEFAULT_LINE_WIDTH: usize = 128;

/// Bytes addressable through the `__gfx__` section (128 lines x 64 bytes)
pub const GFX_SECTION_CAPACITY: usize = 8192;
