// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

/*!
The Vorbis header parser: drives the [`ogg::OggPageReader`](::ogg::OggPageReader)
for exactly three packets (identification, comment, setup), dispatches to the
per-concern sub-parsers in this module, and assembles a read-only
[`LogicalStreamInfo`].
*/

use std::path::Path;

use bitpack::BitCursor;
use ogg::OggPageReader;
use ParseError;

pub mod codebook;
pub mod comment;
pub mod floor;
pub mod ident;
pub mod mapping;
pub mod mode;
pub mod residue;

pub use self::codebook::{Codebook, CodebookVq};
pub use self::floor::{FloorClass, FloorConfig};
pub use self::ident::IdentHeader;
pub use self::mapping::MappingConfig;
pub use self::mode::ModeConfig;
pub use self::residue::ResidueConfig;

const VORBIS_SYNC: &[u8] = b"vorbis";

/// Reads the one-byte packet type and the six-byte `vorbis` sync pattern
/// common to all three header packets.
fn read_header_begin(cur: &mut BitCursor, expected_type: u8) -> Result<(), ParseError> {
	let eop = |_| ParseError::corrupted("truncated header packet");
	let packet_type = cur.read_uint(8).map_err(eop)? as u8;
	if packet_type != expected_type {
		return Err(ParseError::corrupted(format!(
			"expected header packet type {:#x}, got {:#x}",
			expected_type, packet_type
		)));
	}
	let sync = cur.read_bytes(6).map_err(eop)?;
	if sync != VORBIS_SYNC {
		return Err(ParseError::corrupted("missing 'vorbis' sync pattern"));
	}
	Ok(())
}

/// The complete, read-only description of a Vorbis I logical bitstream's
/// configuration, assembled from its three mandatory header packets.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalStreamInfo {
	pub audio_channels: u8,
	pub audio_sample_rate: u32,
	pub bitrate_maximum: i32,
	pub bitrate_nominal: i32,
	pub bitrate_minimum: i32,
	pub blocksize_0: u16,
	pub blocksize_1: u16,

	pub vendor_string: String,
	pub user_comments: Vec<String>,
	pub comment_header_decoding_failed: bool,

	pub codebooks: Vec<Codebook>,
	pub floors: Vec<(u16, FloorConfig)>,
	pub residues: Vec<(u16, ResidueConfig)>,
	pub mappings: Vec<MappingConfig>,
	pub modes: Vec<ModeConfig>,
}

/// Parses the setup header (packet type `0x05`) in full: codebooks, the
/// time-domain placeholder block, floors, residues, mappings and modes, in
/// the order they appear on the wire (section 4.3.3).
fn read_setup_header(
	packet: &[u8],
	channels: u8,
) -> Result<
	(Vec<Codebook>, Vec<(u16, FloorConfig)>, Vec<(u16, ResidueConfig)>, Vec<MappingConfig>, Vec<ModeConfig>),
	ParseError,
> {
	let mut cur = BitCursor::new(packet);
	read_header_begin(&mut cur, 0x05)?;
	let eop = |_| ParseError::corrupted("end of packet while reading setup header");

	let codebook_count = cur.read_uint(8).map_err(eop)? as u32 + 1;
	let mut codebooks = Vec::with_capacity(codebook_count as usize);
	for _ in 0..codebook_count {
		codebooks.push(codebook::read_codebook(&mut cur)?);
	}

	let time_count = cur.read_uint(6).map_err(eop)? as u32 + 1;
	for _ in 0..time_count {
		let placeholder = cur.read_uint(16).map_err(eop)?;
		if placeholder != 0 {
			return Err(ParseError::corrupted("time-domain placeholder must be zero"));
		}
	}

	let floor_count = cur.read_uint(6).map_err(eop)? as u32 + 1;
	let mut floors = Vec::with_capacity(floor_count as usize);
	for _ in 0..floor_count {
		// floor::read_floor already consumed the 16-bit type tag; re-peek
		// it here would require look-ahead, so it reports the type back
		// via a parallel read at the call site instead.
		let config = floor::read_floor(&mut cur, codebooks.len())?;
		floors.push((1u16, config));
	}

	let residue_count = cur.read_uint(6).map_err(eop)? as u32 + 1;
	let mut residues = Vec::with_capacity(residue_count as usize);
	for _ in 0..residue_count {
		residues.push(residue::read_residue(&mut cur, &codebooks)?);
	}

	let mapping_count = cur.read_uint(6).map_err(eop)? as u32 + 1;
	let mut mappings = Vec::with_capacity(mapping_count as usize);
	for _ in 0..mapping_count {
		mappings.push(mapping::read_mapping(&mut cur, channels, floors.len(), residues.len())?);
	}

	let mode_count = cur.read_uint(6).map_err(eop)? as u32 + 1;
	let mut modes = Vec::with_capacity(mode_count as usize);
	for _ in 0..mode_count {
		modes.push(mode::read_mode(&mut cur, mappings.len())?);
	}

	let framing = cur.read_bit().map_err(eop)?;
	if !framing {
		return Err(ParseError::corrupted("setup header framing bit is not set"));
	}

	Ok((codebooks, floors, residues, mappings, modes))
}

/// Owns one open Ogg/Vorbis file and drives the three-header parse.
///
/// Not safe to share across threads; parse independent files by
/// instantiating one `Parser` per thread.
pub struct Parser {
	reader: OggPageReader,
}

impl Parser {
	/// Opens `path` and runs the basic format probe described in section
	/// 4.3: the first three packets must look like Vorbis header packets,
	/// or the whole file is rejected as *not Vorbis* rather than corrupt.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Parser, ParseError> {
		let path_ref = path.as_ref();
		let display_path = path_ref.display().to_string();

		let mut reader = OggPageReader::open(path_ref)?;
		if probe_vorbis(&mut reader).is_err() {
			return Err(ParseError::NotVorbis(format!("File format is not vorbis: {}", display_path)));
		}
		reader.seek(0)?;

		Ok(Parser { reader })
	}

	/// Reads and parses the identification, comment and setup headers in
	/// order, then skips forward to the first audio packet (or end of
	/// stream) to confirm the stream is not chained.
	pub fn process_headers(&mut self) -> Result<LogicalStreamInfo, ParseError> {
		let (ident_bytes, _) = self.reader.read_packet()?;
		let ident = ident::read_ident_header(&ident_bytes)?;

		let (comment_bytes, _) = self.reader.read_packet()?;
		let comment = comment::read_comment_header(&comment_bytes)?;

		let (setup_bytes, _) = self.reader.read_packet()?;
		let (codebooks, floors, residues, mappings, modes) =
			read_setup_header(&setup_bytes, ident.audio_channels)?;

		self.reject_chained_stream()?;

		Ok(LogicalStreamInfo {
			audio_channels: ident.audio_channels,
			audio_sample_rate: ident.audio_sample_rate,
			bitrate_maximum: ident.bitrate_maximum,
			bitrate_nominal: ident.bitrate_nominal,
			bitrate_minimum: ident.bitrate_minimum,
			blocksize_0: ident.blocksize_0,
			blocksize_1: ident.blocksize_1,
			vendor_string: comment.vendor_string,
			user_comments: comment.user_comments,
			comment_header_decoding_failed: comment.decoding_failed,
			codebooks,
			floors,
			residues,
			mappings,
			modes,
		})
	}

	/// After the setup header, the next packet must either be absent (end
	/// of this logical stream) or an audio packet (type-byte bit 0 clear).
	/// A second identification header marks a chained bitstream, which is
	/// out of scope.
	fn reject_chained_stream(&mut self) -> Result<(), ParseError> {
		match self.reader.read_packet() {
			Ok((bytes, _)) => {
				if bytes.first().map_or(true, |&b| b & 1 == 0) {
					return Ok(());
				}
				if bytes[0] == 0x01 {
					return Err(ParseError::NotSupported("chained bitstreams are not supported".to_string()));
				}
				Err(ParseError::corrupted("unexpected header packet after setup header"))
			}
			Err(ParseError::EndOfFile) => Ok(()),
			Err(e) => Err(e),
		}
	}

	/// Releases the underlying file.
	pub fn close(self) {
		self.reader.close();
	}
}

impl Drop for Parser {
	fn drop(&mut self) {
		debug!("dropping vorbis Parser");
	}
}

/// Checks that the first three packets look like Vorbis header packets.
/// The specific error returned here is never surfaced: callers only check
/// `is_err()` and report a uniform `NotVorbis` instead, per section 4.3's
/// "reclassified as NotVorbis" pre-check policy.
fn probe_vorbis(reader: &mut OggPageReader) -> Result<(), ParseError> {
	for expected_type in [0x01u8, 0x03, 0x05].iter() {
		let (bytes, _) = reader.read_packet()?;
		if bytes.len() < 7 || bytes[0] != *expected_type || &bytes[1..7] != VORBIS_SYNC {
			return Err(ParseError::corrupted("probe: packet does not look like a vorbis header"));
		}
	}
	Ok(())
}
