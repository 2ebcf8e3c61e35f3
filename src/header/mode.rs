// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

//! Mode decoding (section 4.3.3.f).

use bitpack::BitCursor;
use ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeConfig {
	pub blockflag: bool,
	pub mapping_index: u8,
}

pub(crate) fn read_mode(cur: &mut BitCursor, mapping_count: usize) -> Result<ModeConfig, ParseError> {
	let eop = |_| ParseError::corrupted("end of packet while reading mode");

	let blockflag = cur.read_bit().map_err(eop)?;
	let window_type = cur.read_uint(16).map_err(eop)?;
	if window_type != 0 {
		return Err(ParseError::corrupted("mode window_type must be zero"));
	}
	let transform_type = cur.read_uint(16).map_err(eop)?;
	if transform_type != 0 {
		return Err(ParseError::corrupted("mode transform_type must be zero"));
	}
	let mapping_index = cur.read_uint(8).map_err(eop)? as u8;
	if mapping_index as usize >= mapping_count {
		return Err(ParseError::corrupted("mode mapping_index out of range"));
	}

	Ok(ModeConfig { blockflag, mapping_index })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pack_bits(bits: &[(u64, u8)]) -> Vec<u8> {
		let mut out_bits: Vec<bool> = Vec::new();
		for &(value, width) in bits {
			for i in 0..width {
				out_bits.push((value >> i) & 1 != 0);
			}
		}
		let mut bytes = vec![0u8; (out_bits.len() + 7) / 8];
		for (i, &b) in out_bits.iter().enumerate() {
			if b {
				bytes[i / 8] |= 1 << (i % 8);
			}
		}
		bytes
	}

	#[test]
	fn test_well_formed_mode() {
		let bytes = pack_bits(&[(1, 1), (0, 16), (0, 16), (0, 8)]);
		let mut cur = BitCursor::new(&bytes);
		let mode = read_mode(&mut cur, 1).unwrap();
		assert!(mode.blockflag);
		assert_eq!(mode.mapping_index, 0);
	}

	#[test]
	fn test_nonzero_window_type_is_corrupted() {
		let bytes = pack_bits(&[(0, 1), (1, 16), (0, 16), (0, 8)]);
		let mut cur = BitCursor::new(&bytes);
		assert!(read_mode(&mut cur, 1).is_err());
	}

	#[test]
	fn test_mapping_index_out_of_range_is_corrupted() {
		let bytes = pack_bits(&[(0, 1), (0, 16), (0, 16), (1, 8)]);
		let mut cur = BitCursor::new(&bytes);
		assert!(read_mode(&mut cur, 1).is_err());
	}
}
