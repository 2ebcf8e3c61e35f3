// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

//! Codebook decoding (section 4.3.3.a): Huffman codeword construction plus
//! the optional vector-quantization lookup table.

use std::convert::TryInto;

use bitpack::BitCursor;
use huffman;
use ilog;
use lookup1_values;
use ParseError;

const SYNC_PATTERN: u64 = 0x56_43_42; // "BCV", read as a 24-bit little-endian value

/// A fully decoded Vorbis codebook: a Huffman code plus an optional VQ
/// lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct Codebook {
	pub dimensions: u16,
	pub entries: u32,
	pub codeword_lengths: Vec<Option<u8>>,
	pub codewords: Vec<String>,
	pub lookup_type: u8,
	pub vq: Option<CodebookVq>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodebookVq {
	pub min_value: f64,
	pub delta_value: f64,
	pub value_bits: u8,
	pub sequence_p: bool,
	pub multiplicands: Vec<u32>,
	pub vq_table: Vec<Vec<f64>>,
}

pub(crate) fn read_codebook(cur: &mut BitCursor) -> Result<Codebook, ParseError> {
	let eop = |_| ParseError::corrupted("end of packet while reading codebook");

	let sync = cur.read_uint(24).map_err(eop)?;
	if sync != SYNC_PATTERN {
		return Err(ParseError::corrupted(format!("bad codebook sync pattern {:#x}", sync)));
	}

	let dimensions = cur.read_uint(16).map_err(eop)? as u16;
	let entries = cur.read_uint(24).map_err(eop)? as u32;
	if entries == 1 {
		return Err(ParseError::corrupted("codebook entries must not equal 1"));
	}

	let ordered = cur.read_bit().map_err(eop)?;
	let codeword_lengths = if ordered {
		read_ordered_lengths(cur, entries)?
	} else {
		let sparse = cur.read_bit().map_err(eop)?;
		read_unordered_lengths(cur, entries, sparse)?
	};

	let codewords = huffman::build_codewords(&codeword_lengths)?;

	let lookup_type = cur.read_uint(4).map_err(eop)? as u8;
	let vq = match lookup_type {
		0 => None,
		1 | 2 => Some(read_vq_lookup(cur, lookup_type, entries, dimensions)?),
		_ => return Err(ParseError::corrupted(format!("bad codebook lookup_type {}", lookup_type))),
	};

	Ok(Codebook { dimensions, entries, codeword_lengths, codewords, lookup_type, vq })
}

fn read_unordered_lengths(
	cur: &mut BitCursor,
	entries: u32,
	sparse: bool,
) -> Result<Vec<Option<u8>>, ParseError> {
	let eop = |_| ParseError::corrupted("end of packet while reading codeword lengths");
	let mut lengths = Vec::with_capacity(entries as usize);
	for _ in 0..entries {
		let length = if sparse {
			if cur.read_bit().map_err(eop)? {
				Some(cur.read_uint(5).map_err(eop)? as u8 + 1)
			} else {
				None
			}
		} else {
			Some(cur.read_uint(5).map_err(eop)? as u8 + 1)
		};
		if let Some(l) = length {
			if l > 32 {
				return Err(ParseError::corrupted("codeword length exceeds 32 bits"));
			}
		}
		lengths.push(length);
	}
	Ok(lengths)
}

fn read_ordered_lengths(cur: &mut BitCursor, entries: u32) -> Result<Vec<Option<u8>>, ParseError> {
	let eop = |_| ParseError::corrupted("end of packet while reading ordered codeword lengths");
	let mut lengths = vec![None; entries as usize];
	let mut current_length = cur.read_uint(5).map_err(eop)? as u32 + 1;
	let mut i: u32 = 0;
	while i < entries {
		let width = ilog((entries - i) as u64);
		let number = cur.read_uint(width).map_err(eop)? as u32;
		if i + number > entries {
			return Err(ParseError::corrupted("ordered codeword length run overflows entries"));
		}
		if current_length > 32 {
			return Err(ParseError::corrupted("codeword length exceeds 32 bits"));
		}
		for slot in lengths.iter_mut().skip(i as usize).take(number as usize) {
			*slot = Some(current_length as u8);
		}
		i += number;
		current_length += 1;
	}
	Ok(lengths)
}

fn read_vq_lookup(
	cur: &mut BitCursor,
	lookup_type: u8,
	entries: u32,
	dimensions: u16,
) -> Result<CodebookVq, ParseError> {
	let eop = |_| ParseError::corrupted("end of packet while reading VQ lookup table");

	let min_value = cur.read_float32().map_err(eop)?;
	let delta_value = cur.read_float32().map_err(eop)?;
	let value_bits = cur.read_uint(4).map_err(eop)? as u8 + 1;
	let sequence_p = cur.read_bit().map_err(eop)?;

	if lookup_type == 2 && sequence_p {
		return Err(ParseError::NotSupported(
			"codebook lookup_type 2 with sequence_p is not supported".to_string(),
		));
	}

	let lookup_values: u64 = if lookup_type == 1 {
		lookup1_values(entries, dimensions) as u64
	} else {
		entries as u64 * dimensions as u64
	};
	let lookup_values_usize: usize = lookup_values
		.try_into()
		.map_err(|_| ParseError::corrupted("VQ lookup table too large to address"))?;

	let mut multiplicands = Vec::with_capacity(lookup_values_usize);
	for _ in 0..lookup_values_usize {
		multiplicands.push(cur.read_uint(value_bits).map_err(eop)? as u32);
	}

	let entries_usize = entries as usize;
	let dimensions_usize = dimensions as usize;
	let mut vq_table = Vec::with_capacity(entries_usize);

	match lookup_type {
		1 => {
			for n in 0..entries_usize {
				let mut vec_i = Vec::with_capacity(dimensions_usize);
				let mut last = 0.0f64;
				let mut index_divisor: u64 = 1;
				for _ in 0..dimensions_usize {
					let multiplicand_offset = if lookup_values == 0 {
						0
					} else {
						((n as u64 / index_divisor) % lookup_values) as usize
					};
					let multiplicand = *multiplicands.get(multiplicand_offset).ok_or_else(|| {
						ParseError::corrupted("VQ multiplicand index out of range")
					})?;
					let scalar = multiplicand as f64 * delta_value + min_value + last;
					if sequence_p {
						last = scalar;
					}
					vec_i.push(scalar);
					index_divisor = index_divisor.saturating_mul(lookup_values.max(1));
				}
				vq_table.push(vec_i);
			}
		}
		2 => {
			for n in 0..entries_usize {
				let base = n * dimensions_usize;
				let mut vec_i = Vec::with_capacity(dimensions_usize);
				for d in 0..dimensions_usize {
					let multiplicand = *multiplicands.get(base + d).ok_or_else(|| {
						ParseError::corrupted("VQ multiplicand index out of range")
					})?;
					vec_i.push(multiplicand as f64 * delta_value + min_value);
				}
				vq_table.push(vec_i);
			}
		}
		_ => unreachable!("lookup_type validated by caller"),
	}

	Ok(CodebookVq { min_value, delta_value, value_bits, sequence_p, multiplicands, vq_table })
}
