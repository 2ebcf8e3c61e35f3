// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

//! Identification header (packet type `0x01`).

use bitpack::BitCursor;
use ParseError;

use super::read_header_begin;

/// Parsed identification header fields, per section 4.3.1.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentHeader {
	pub audio_channels: u8,
	pub audio_sample_rate: u32,
	pub bitrate_maximum: i32,
	pub bitrate_nominal: i32,
	pub bitrate_minimum: i32,
	pub blocksize_0: u16,
	pub blocksize_1: u16,
}

const ALLOWED_BLOCKSIZE_EXPONENTS: std::ops::RangeInclusive<u8> = 6..=13;

pub(crate) fn read_ident_header(packet: &[u8]) -> Result<IdentHeader, ParseError> {
	let mut cur = BitCursor::new(packet);
	read_header_begin(&mut cur, 0x01)?;

	let eop = |_| ParseError::corrupted("end of packet while reading identification header");

	let vorbis_version = cur.read_uint(32).map_err(eop)?;
	if vorbis_version != 0 {
		return Err(ParseError::corrupted(format!(
			"unsupported vorbis_version {}",
			vorbis_version
		)));
	}

	let audio_channels = cur.read_uint(8).map_err(eop)? as u8;
	let audio_sample_rate = cur.read_uint(32).map_err(eop)? as u32;
	let bitrate_maximum = cur.read_sint(32).map_err(eop)? as i32;
	let bitrate_nominal = cur.read_sint(32).map_err(eop)? as i32;
	let bitrate_minimum = cur.read_sint(32).map_err(eop)? as i32;
	let blocksize_0_exponent = cur.read_uint(4).map_err(eop)? as u8;
	let blocksize_1_exponent = cur.read_uint(4).map_err(eop)? as u8;
	let framing = cur.read_bit().map_err(eop)?;

	if audio_channels == 0 {
		return Err(ParseError::corrupted("audio_channels must not be zero"));
	}
	if audio_sample_rate == 0 {
		return Err(ParseError::corrupted("audio_sample_rate must not be zero"));
	}
	if !ALLOWED_BLOCKSIZE_EXPONENTS.contains(&blocksize_0_exponent)
		|| !ALLOWED_BLOCKSIZE_EXPONENTS.contains(&blocksize_1_exponent)
	{
		return Err(ParseError::corrupted(format!(
			"blocksize exponents out of range: {} {}",
			blocksize_0_exponent, blocksize_1_exponent
		)));
	}
	if blocksize_0_exponent > blocksize_1_exponent {
		return Err(ParseError::corrupted("blocksize_0 must be <= blocksize_1"));
	}
	if !framing {
		return Err(ParseError::corrupted("identification header framing bit is not set"));
	}

	Ok(IdentHeader {
		audio_channels,
		audio_sample_rate,
		bitrate_maximum,
		bitrate_nominal,
		bitrate_minimum,
		blocksize_0: 1u16 << blocksize_0_exponent,
		blocksize_1: 1u16 << blocksize_1_exponent,
	})
}
