//! Property-based tests for the bank and cart formats.
//! Verifies invariants hold for ALL byte sequences, not just fixed patterns.

use proptest::collection::vec;
use proptest::prelude::*;
use smpbank::{Bank, CartLayout, Sample, cart, header_size};

proptest! {
    /// Any blob survives encode -> text -> decode unchanged, at any valid width.
    #[test]
    fn cart_roundtrip_any_blob(blob in vec(any::<u8>(), 0..2048), half in 1usize..=96) {
        let layout = CartLayout::new(half * 2).unwrap();
        let doc = cart::encode(&blob, layout);
        prop_assert_eq!(cart::decode(&doc.to_text()).unwrap(), blob);
    }

    /// Body lines are full width except the last, never empty, always lowercase hex.
    #[test]
    fn cart_body_wrapping(blob in vec(any::<u8>(), 0..1024), half in 1usize..=96) {
        let layout = CartLayout::new(half * 2).unwrap();
        let doc = cart::encode(&blob, layout);
        let body = doc.body_lines();

        prop_assert_eq!(body.len(), blob.len().div_ceil(half));
        if let Some((last, full)) = body.split_last() {
            for line in full {
                prop_assert_eq!(line.len(), layout.line_width());
            }
            prop_assert!(!last.is_empty());
            prop_assert!(last.len() <= layout.line_width());
        }
        for line in body {
            prop_assert!(line.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
        }
    }

    /// Offsets start after the header, step by sample size and end at the bank size.
    #[test]
    fn bank_offsets_match_sizes(sizes in vec(0usize..200, 0..64)) {
        let samples: Vec<Sample> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| Sample::new(format!("s{}", i), vec![i as u8; size]))
            .collect();
        let bank = Bank::pack(&samples).unwrap();
        let bytes = bank.to_bytes();
        let offsets = bank.offsets();

        prop_assert_eq!(offsets[0] as usize, header_size(sizes.len()));
        for (i, size) in sizes.iter().enumerate() {
            prop_assert_eq!((offsets[i + 1] - offsets[i]) as usize, *size);
        }
        prop_assert_eq!(offsets[sizes.len()] as usize, bytes.len());
        prop_assert_eq!(Bank::from_bytes(&bytes).unwrap(), bank);
    }
}
