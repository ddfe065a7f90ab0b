//! PICO-8 cartridge text codec (.p8)
//!
//! Embeds an arbitrary binary blob as the `__gfx__` section of a text cart.
//!
//! # Layout
//! ```text
//! pico-8 cartridge // http://www.pico-8.com
//! version 33
//! __gfx__
//! <line_width hex digits>      64 bytes per line by default
//! ...
//! <shorter final line>         only when the blob is not a multiple of a line
//! ```
//!
//! PICO-8 keeps gfx memory little-endian per nibble: the byte `0x41` is written
//! as `14`. Encoding is total over all byte sequences; an empty blob produces
//! the header and no body lines.

use std::io::Write;

use thiserror::Error;

use crate::{CART_IDENTIFIER, CART_VERSION, DEFAULT_LINE_WIDTH, GFX_SECTION};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Fixed lines preceding the body
pub const HEADER_LINES: [&str; 3] = [CART_IDENTIFIER, CART_VERSION, GFX_SECTION];

/// Errors produced while configuring or decoding a cart
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("invalid line width {0} (must be a non-zero even number of hex digits)")]
    InvalidLineWidth(usize),

    #[error("cartridge header missing: expected {expected:?}")]
    MissingHeader { expected: &'static str },

    #[error("unexpected header on line {line}: expected {expected:?}, found {found:?}")]
    UnexpectedHeader {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("cartridge has no {} section", GFX_SECTION)]
    MissingSection,

    #[error("invalid hex digit {found:?} on line {line}, column {column}")]
    InvalidHexDigit {
        line: usize,
        column: usize,
        found: char,
    },

    #[error("odd number of hex digits on line {line}")]
    OddDigitCount { line: usize },
}

/// Body wrapping parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLayout {
    line_width: usize,
}

impl CartLayout {
    /// `line_width` is in hex characters, two per byte
    pub fn new(line_width: usize) -> Result<Self, CartError> {
        if line_width == 0 || !line_width.is_multiple_of(2) {
            return Err(CartError::InvalidLineWidth(line_width));
        }
        Ok(Self { line_width })
    }

    pub fn line_width(&self) -> usize {
        self.line_width
    }

    pub fn bytes_per_line(&self) -> usize {
        self.line_width / 2
    }
}

impl Default for CartLayout {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

/// A cart holding one binary blob in its gfx section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartDocument {
    /// Hex lines, always an even number of valid digits
    body: Vec<String>,
}

impl CartDocument {
    pub fn header_lines(&self) -> [&'static str; 3] {
        HEADER_LINES
    }

    pub fn body_lines(&self) -> &[String] {
        &self.body
    }

    /// Header followed by body
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        HEADER_LINES
            .into_iter()
            .chain(self.body.iter().map(String::as_str))
    }

    /// Full text, one `\n` after every line
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in self.lines() {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Write the complete document to a text sink
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for line in self.lines() {
            writeln!(w, "{}", line)?;
        }
        Ok(())
    }

    /// Parse a cart and extract its gfx section
    ///
    /// Accepts full carts: any `version` line, other sections before `__gfx__`
    /// and after it. Blank lines inside the body are skipped. Errors report
    /// 1-based line numbers of `text`.
    pub fn parse(text: &str) -> Result<Self, CartError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end()));

        match lines.next() {
            Some((_, found)) if found == CART_IDENTIFIER => {}
            Some((line, found)) => {
                return Err(CartError::UnexpectedHeader {
                    line,
                    expected: CART_IDENTIFIER,
                    found: found.to_string(),
                });
            }
            None => {
                return Err(CartError::MissingHeader {
                    expected: CART_IDENTIFIER,
                });
            }
        }

        match lines.next() {
            Some((_, found)) if found.starts_with("version ") => {}
            Some((line, found)) => {
                return Err(CartError::UnexpectedHeader {
                    line,
                    expected: CART_VERSION,
                    found: found.to_string(),
                });
            }
            None => {
                return Err(CartError::MissingHeader {
                    expected: CART_VERSION,
                });
            }
        }

        if !lines.any(|(_, line)| line == GFX_SECTION) {
            return Err(CartError::MissingSection);
        }

        let mut body = Vec::new();
        for (line, digits) in lines {
            if is_section_marker(digits) {
                break;
            }
            if digits.is_empty() {
                continue;
            }
            decode_line(digits, line)?;
            body.push(digits.to_string());
        }

        Ok(Self { body })
    }

    /// Recover the embedded blob
    ///
    /// Errors report 1-based body line numbers.
    pub fn decode(&self) -> Result<Vec<u8>, CartError> {
        let mut blob = Vec::new();
        for (index, digits) in self.body.iter().enumerate() {
            blob.extend(decode_line(digits, index + 1)?);
        }
        Ok(blob)
    }
}

/// Encode a blob as a cart document, wrapped per `layout`
pub fn encode(blob: &[u8], layout: CartLayout) -> CartDocument {
    let body = blob
        .chunks(layout.bytes_per_line())
        .map(encode_nibbles)
        .collect();
    CartDocument { body }
}

/// Parse a cart and recover the blob embedded in its gfx section
pub fn decode(text: &str) -> Result<Vec<u8>, CartError> {
    CartDocument::parse(text)?.decode()
}

/// Hex-encode bytes, low nibble first
pub fn encode_nibbles(bytes: &[u8]) -> String {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        digits.push(HEX_DIGITS[(byte & 0xf) as usize] as char);
        digits.push(HEX_DIGITS[(byte >> 4) as usize] as char);
    }
    digits
}

/// Inverse of [`encode_nibbles`]; accepts upper and lower case digits
pub fn decode_nibbles(digits: &str) -> Result<Vec<u8>, CartError> {
    decode_line(digits, 1)
}

fn decode_line(digits: &str, line: usize) -> Result<Vec<u8>, CartError> {
    let chars: Vec<char> = digits.chars().collect();
    if !chars.len().is_multiple_of(2) {
        return Err(CartError::OddDigitCount { line });
    }

    chars
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let lo = nibble(pair[0], line, 2 * i + 1)?;
            let hi = nibble(pair[1], line, 2 * i + 2)?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn nibble(found: char, line: usize, column: usize) -> Result<u8, CartError> {
    found
        .to_digit(16)
        .map(|value| value as u8)
        .ok_or(CartError::InvalidHexDigit {
            line,
            column,
            found,
        })
}

fn is_section_marker(line: &str) -> bool {
    line.len() > 4 && line.starts_with("__") && line.ends_with("__")
}
