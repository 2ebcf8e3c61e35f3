// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

//! Mapping decoding (section 4.3.3.e). Only mapping type 0 exists in
//! Vorbis I.

use bitpack::BitCursor;
use ilog;
use ParseError;

#[derive(Debug, Clone, PartialEq)]
pub struct MappingConfig {
	pub submaps: u8,
	pub coupling_steps: Vec<(u16, u16)>,
	pub mux: Option<Vec<u8>>,
	pub submap_floor: Vec<u8>,
	pub submap_residue: Vec<u8>,
}

pub(crate) fn read_mapping(
	cur: &mut BitCursor,
	channels: u8,
	floor_count: usize,
	residue_count: usize,
) -> Result<MappingConfig, ParseError> {
	let eop = |_| ParseError::corrupted("end of packet while reading mapping");

	let mapping_type = cur.read_uint(16).map_err(eop)?;
	if mapping_type != 0 {
		return Err(ParseError::corrupted(format!("unknown mapping type {}", mapping_type)));
	}

	let submaps = if cur.read_bit().map_err(eop)? { cur.read_uint(4).map_err(eop)? as u8 + 1 } else { 1 };

	let mut coupling_steps = Vec::new();
	if cur.read_bit().map_err(eop)? {
		let steps = cur.read_uint(8).map_err(eop)? as u32 + 1;
		let width = ilog((channels as u64).saturating_sub(1));
		for _ in 0..steps {
			let magnitude = cur.read_uint(width).map_err(eop)? as u16;
			let angle = cur.read_uint(width).map_err(eop)? as u16;
			if magnitude as u8 >= channels || angle as u8 >= channels || angle == magnitude {
				return Err(ParseError::corrupted("invalid coupling-step channel indices"));
			}
			coupling_steps.push((magnitude, angle));
		}
	}

	let reserved = cur.read_uint(2).map_err(eop)?;
	if reserved != 0 {
		return Err(ParseError::corrupted("mapping reserved field must be zero"));
	}

	let mux = if submaps > 1 {
		let mut values = Vec::with_capacity(channels as usize);
		for _ in 0..channels {
			let v = cur.read_uint(4).map_err(eop)? as u8;
			if v > submaps - 1 {
				return Err(ParseError::corrupted("mapping mux value exceeds submaps-1"));
			}
			values.push(v);
		}
		Some(values)
	} else {
		None
	};

	let mut submap_floor = Vec::with_capacity(submaps as usize);
	let mut submap_residue = Vec::with_capacity(submaps as usize);
	for _ in 0..submaps {
		let _placeholder = cur.read_uint(8).map_err(eop)?;
		let floor_idx = cur.read_uint(8).map_err(eop)? as u8;
		if floor_idx as usize >= floor_count {
			return Err(ParseError::corrupted("mapping submap floor index out of range"));
		}
		let residue_idx = cur.read_uint(8).map_err(eop)? as u8;
		if residue_idx as usize >= residue_count {
			return Err(ParseError::corrupted("mapping submap residue index out of range"));
		}
		submap_floor.push(floor_idx);
		submap_residue.push(residue_idx);
	}

	Ok(MappingConfig { submaps, coupling_steps, mux, submap_floor, submap_residue })
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
	fn test_minimal_single_submap_mapping() {
		let bytes = pack_bits(&[
			(0, 16), // mapping_type
			(0, 1),  // no explicit submaps field -> submaps = 1
			(0, 1),  // no coupling steps
			(0, 2),  // reserved
			(0, 8),  // placeholder
			(0, 8),  // submap_floor
			(0, 8),  // submap_residue
		]);
		let mut cur = BitCursor::new(&bytes);
		let mapping = read_mapping(&mut cur, 2, 1, 1).unwrap();
		assert_eq!(mapping.submaps, 1);
		assert!(mapping.coupling_steps.is_empty());
		assert!(mapping.mux.is_none());
		assert_eq!(mapping.submap_floor, vec![0]);
		assert_eq!(mapping.submap_residue, vec![0]);
	}

	#[test]
	fn test_reserved_field_nonzero_is_corrupted() {
		let bytes = pack_bits(&[(0, 16), (0, 1), (0, 1), (1, 2)]);
		let mut cur = BitCursor::new(&bytes);
		assert!(read_mapping(&mut cur, 2, 1, 1).is_err());
	}

	#[test]
	fn test_coupling_step_equal_channels_is_corrupted() {
		// channels = 2, width = ilog(1) = 1 bit per field.
		let bytes = pack_bits(&[
			(0, 16), // mapping_type
			(0, 1),  // submaps = 1
			(1, 1),  // coupling present
			(0, 8),  // coupling_steps - 1 = 0 -> 1 step
			(0, 1),  // magnitude = 0
			(0, 1),  // angle = 0 (equal to magnitude -> invalid)
		]);
		let mut cur = BitCursor::new(&bytes);
		assert!(read_mapping(&mut cur, 2, 1, 1).is_err());
	}

	#[test]
	fn test_mux_out_of_range_is_corrupted() {
		// submaps = 2 (explicit field = 1), so mux values must be <= 1.
		let bytes = pack_bits(&[
			(0, 16), // mapping_type
			(1, 1),  // explicit submaps field present
			(1, 4),  // submaps - 1 = 1 -> submaps = 2
			(0, 1),  // no coupling
			(0, 2),  // reserved
			(2, 4),  // mux[0] = 2, channels = 1 here so only one mux value
		]);
		let mut cur = BitCursor::new(&bytes);
		assert!(read_mapping(&mut cur, 1, 1, 1).is_err());
	}
}
