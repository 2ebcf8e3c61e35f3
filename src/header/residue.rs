// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

//! Residue decoding (section 4.3.3.d).

use bitpack::BitCursor;
use header::codebook::Codebook;
use ParseError;

#[derive(Debug, Clone, PartialEq)]
pub struct ResidueConfig {
	pub begin: u32,
	pub end: u32,
	pub partition_size: u32,
	pub classifications: u8,
	pub classbook: u8,
	pub cascade: Vec<u8>,
	pub books: Vec<[Option<u8>; 8]>,
}

pub(crate) fn read_residue(
	cur: &mut BitCursor,
	codebooks: &[Codebook],
) -> Result<(u16, ResidueConfig), ParseError> {
	let eop = |_| ParseError::corrupted("end of packet while reading residue");

	let residue_type = cur.read_uint(16).map_err(eop)? as u16;
	if residue_type > 2 {
		return Err(ParseError::corrupted(format!("unknown residue type {}", residue_type)));
	}

	let begin = cur.read_uint(24).map_err(eop)? as u32;
	let end = cur.read_uint(24).map_err(eop)? as u32;
	if begin > end {
		return Err(ParseError::corrupted("residue begin must not exceed end"));
	}
	let partition_size = cur.read_uint(24).map_err(eop)? as u32 + 1;
	let classifications = cur.read_uint(6).map_err(eop)? as u8 + 1;
	let classbook = cur.read_uint(8).map_err(eop)? as u8;

	if classbook as usize >= codebooks.len() {
		return Err(ParseError::corrupted("residue classbook index out of range"));
	}
	let classbook_cb = &codebooks[classbook as usize];
	let mut capacity: u64 = 1;
	for _ in 0..classbook_cb.dimensions {
		capacity = capacity.saturating_mul(classifications as u64);
	}
	if capacity > classbook_cb.entries as u64 {
		return Err(ParseError::corrupted(
			"residue classbook does not have enough entries for the classification count",
		));
	}

	let mut cascade = Vec::with_capacity(classifications as usize);
	for _ in 0..classifications {
		let low = cur.read_uint(3).map_err(eop)? as u8;
		let bitflag = cur.read_bit().map_err(eop)?;
		let high = if bitflag { cur.read_uint(5).map_err(eop)? as u8 } else { 0 };
		cascade.push(high * 8 + low);
	}

	let mut books = Vec::with_capacity(classifications as usize);
	for &mask in &cascade {
		let mut row: [Option<u8>; 8] = [None; 8];
		for (j, slot) in row.iter_mut().enumerate() {
			if mask & (1 << j) != 0 {
				let book_index = cur.read_uint(8).map_err(eop)? as u8;
				if book_index as usize >= codebooks.len() {
					return Err(ParseError::corrupted("residue book index out of range"));
				}
				if codebooks[book_index as usize].lookup_type == 0 {
					return Err(ParseError::corrupted(
						"residue book must have a non-zero lookup_type",
					));
				}
				*slot = Some(book_index);
			}
		}
		books.push(row);
	}

	Ok((
		residue_type,
		ResidueConfig { begin, end, partition_size, classifications, classbook, cascade, books },
	))
}
