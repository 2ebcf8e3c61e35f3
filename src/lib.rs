// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

#![forbid(unsafe_code)]
#![cfg_attr(test, deny(warnings))]

/*!
A parser for Ogg-encapsulated Vorbis I streams, written in Rust.

This crate does not decode audio. It demultiplexes the Ogg container,
then parses the three mandatory Vorbis headers (identification, comment,
setup) into a read-only [`LogicalStreamInfo`](header::LogicalStreamInfo)
record: channel counts, block sizes, comment metadata, and the full set of
codebooks, floors, residues, mappings and modes declared by the setup
header. It is meant for tooling that inspects or validates Vorbis streams
rather than for playback.

See the [`header`] module for the parser entry point, [`ogg`] for the
page-granular container reader, and [`bitpack`] for the underlying bit
cursor.
*/

extern crate byteorder;
#[macro_use]
extern crate thiserror;
#[macro_use]
extern crate log;

pub mod bitpack;
pub mod ogg;
mod huffman;
pub mod header;

/// Errors that can occur anywhere in the open/parse pipeline.
///
/// This is the crate's single public error type; it unifies container-level
/// failures (bad capture pattern, missing pages) with header-level failures
/// (structural violations of the Vorbis setup format).
#[derive(Debug, Error)]
pub enum ParseError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	#[error("not an Ogg container")]
	NotAnOggContainer,
	#[error("not a vorbis stream: {0}")]
	NotVorbis(String),
	#[error("corrupted stream: {reason}")]
	Corrupted {
		reason: String,
		#[cfg(debug_assertions)]
		offset: Option<u64>,
	},
	#[error("unexpected end of file")]
	EndOfFile,
	#[error("not supported: {0}")]
	NotSupported(String),
}

impl ParseError {
	pub(crate) fn corrupted(reason: impl Into<String>) -> ParseError {
		Self::corrupted_at(reason, None)
	}

	pub(crate) fn corrupted_at(reason: impl Into<String>, offset: Option<u64>) -> ParseError {
		let reason = reason.into();
		debug!("corrupted stream at offset {:?}: {}", offset, reason);
		#[cfg(debug_assertions)]
		{
			ParseError::Corrupted { reason, offset }
		}
		#[cfg(not(debug_assertions))]
		{
			let _ = offset;
			ParseError::Corrupted { reason }
		}
	}
}

/// Condition signalled by the [`bitpack`] layer when a read runs past the
/// end of the packet buffer it was given.
///
/// This is not part of [`ParseError`]: callers decide per-field whether to
/// recover (the comment header does) or to promote it to
/// `ParseError::Corrupted` (everywhere else), exactly as the Vorbis spec's
/// "packet decode" sections describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfPacket;

/// Returns the one-based position of the highest set bit of `val`, or 0
/// if `val` is zero. Used throughout the setup header to compute the
/// width of a dynamically-sized field (`ilog(n-1)` bits are exactly enough
/// to enumerate `0..n`).
pub(crate) fn ilog(val: u64) -> u8 {
	64 - val.leading_zeros() as u8
}

#[test]
fn test_ilog() {
	// Uses the test vectors from the Vorbis I spec
	assert_eq!(ilog(0), 0);
	assert_eq!(ilog(1), 1);
	assert_eq!(ilog(2), 2);
	assert_eq!(ilog(3), 2);
	assert_eq!(ilog(4), 3);
	assert_eq!(ilog(7), 3);
}

/// Reverses the 32 bits of `n`.
///
/// Used by the canonical Huffman codeword builder to turn the
/// "available-branches" slot value (a left-justified binary tree position)
/// into the natural, non-bit-reversed codeword string.
pub(crate) fn bit_reverse(n: u32) -> u32 {
	// From the stb_vorbis implementation, also used by lewton.
	let mut nn = n;
	nn = ((nn & 0xAAAAAAAA) >> 1) | ((nn & 0x55555555) << 1);
	nn = ((nn & 0xCCCCCCCC) >> 2) | ((nn & 0x33333333) << 2);
	nn = ((nn & 0xF0F0F0F0) >> 4) | ((nn & 0x0F0F0F0F) << 4);
	nn = ((nn & 0xFF00FF00) >> 8) | ((nn & 0x00FF00FF) << 8);
	(nn >> 16) | (nn << 16)
}

#[test]
fn test_bit_reverse_involution() {
	for &x in &[0u32, 1, 2, 0xdead_beef, 0xffff_ffff, 0x8000_0000, 12345] {
		assert_eq!(bit_reverse(bit_reverse(x)), x);
	}
}

/// Decomposes a 32-bit packed Vorbis float into its IEEE-754-adjacent
/// value, per section 1.3.2 of the Vorbis I spec: sign is bit 31,
/// exponent is bits 21..=30, mantissa is bits 0..=20.
pub(crate) fn float32_unpack(val: u32) -> f64 {
	let sign = (val & 0x8000_0000) != 0;
	let exponent = ((val & 0x7fe0_0000) >> 21) as i32;
	let mantissa = (val & 0x001f_ffff) as f64;
	let signed_mantissa = if sign { -mantissa } else { mantissa };
	signed_mantissa * 2f64.powi(exponent - 788)
}

#[test]
fn test_float32_unpack() {
	// Values cross-checked against lewton's float32_unpack
	// (which targets the same bit layout via a different route).
	assert_eq!(float32_unpack(1611661312), 1.0);
	assert_eq!(float32_unpack(1616117760), 5.0);
	assert_eq!(float32_unpack(3759144960), -1.0);
	assert_eq!(float32_unpack(3761242112), -2.0);
}

static MAX_BASES_WITHOUT_OVERFLOW: &[u32] = &[
	0xffffffff, 0xffffffff, 0x0000ffff, 0x00000659,
	0x000000ff, 0x00000054, 0x00000028, 0x00000017,
	0x0000000f, 0x0000000b, 0x00000009, 0x00000007,
	0x00000006, 0x00000005, 0x00000004, 0x00000004,
	0x00000003, 0x00000003, 0x00000003, 0x00000003,
	0x00000003, 0x00000002, 0x00000002, 0x00000002,
	0x00000002, 0x00000002, 0x00000002, 0x00000002,
	0x00000002, 0x00000002, 0x00000002, 0x00000002];

static MAX_BASE_MAX_BITS_WITHOUT_OVERFLOW: &[u8] = &[
	0x1f, 0x1f, 0x0f, 0x0a,
	0x07, 0x06, 0x05, 0x04,
	0x03, 0x03, 0x03, 0x02,
	0x02, 0x02, 0x02, 0x02,
	0x01, 0x01, 0x01, 0x01,
	0x01, 0x01, 0x01, 0x01,
	0x01, 0x01, 0x01, 0x01,
	0x01, 0x01, 0x01, 0x01];

fn exp_fast(base: u32, exponent: u8) -> u32 {
	let mut res: u32 = 1;
	let mut selfmul = base;
	for i in 0..8 {
		if (1 << i) & exponent > 0 {
			res *= selfmul;
		}
		if let Some(newselfmul) = u32::checked_mul(selfmul, selfmul) {
			selfmul = newselfmul;
		} else {
			if i < 7 && (exponent >> (i + 1)) > 0 {
				panic!("overflow when squaring for exp_fast, precondition violated");
			}
			return res;
		}
	}
	res
}

/// Returns the largest integer `r` for which `r ^ dimensions <= entries`:
/// an "nth-root" search, per the Vorbis I spec's `lookup1_values`.
pub(crate) fn lookup1_values(entries: u32, dimensions: u16) -> u32 {
	if dimensions >= 32 {
		return if entries == 0 { 0 } else { 1 };
	}
	let max_base_bits = MAX_BASE_MAX_BITS_WITHOUT_OVERFLOW[dimensions as usize];
	let max_base = MAX_BASES_WITHOUT_OVERFLOW[dimensions as usize];
	let mut base_bits: u32 = 0;
	for i in 0..max_base_bits + 1 {
		let cur_disputed_bit: u32 = 1 << (max_base_bits - i);
		base_bits |= cur_disputed_bit;
		if max_base < base_bits || exp_fast(base_bits, dimensions as u8) > entries {
			base_bits &= !cur_disputed_bit;
		}
	}
	base_bits
}

#[test]
fn test_lookup1_values() {
	assert_eq!(lookup1_values(1025, 10), 2);
	assert_eq!(lookup1_values(1024, 10), 2);
	assert_eq!(lookup1_values(1023, 10), 1);
	assert_eq!(lookup1_values(3126, 5), 5);
	assert_eq!(lookup1_values(3125, 5), 5);
	assert_eq!(lookup1_values(3124, 5), 4);
	assert_eq!(lookup1_values(1, 1), 1);
	assert_eq!(lookup1_values(0, 15), 0);
	assert_eq!(lookup1_values(0, 0), 0);
	assert_eq!(lookup1_values(1, 0), std::u32::MAX);
}

#[test]
fn test_lookup1_values_round_trip() {
	for r in 1u32..6 {
		for d in 1u16..6 {
			let entries = r.pow(d as u32);
			assert_eq!(lookup1_values(entries, d), r);
		}
	}
}
