// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

/*!
Ogg page reader.

A random-access, page-granular demultiplexer: it scans a byte buffer for
`OggS` page capture patterns, validates page-sequence continuity, and
reassembles the pages belonging to one logical packet. It does not
understand anything about Vorbis; it only knows the Ogg page layout
(RFC 3533).

Unlike lewton, which delegates this job to the external `ogg` crate, this
module owns the whole container layer itself, including the backward
capture-pattern scan used by `seek`.
*/

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use ParseError;

const CAPTURE_PATTERN: &[u8; 4] = b"OggS";
const HEADER_LEN: usize = 27;

fn page_header_type(data: &[u8], page_start: usize) -> u8 {
	data[page_start + 5]
}

fn page_is_continued_packet(data: &[u8], page_start: usize) -> bool {
	page_header_type(data, page_start) & 0x1 != 0
}

fn page_is_last_of_stream(data: &[u8], page_start: usize) -> bool {
	page_header_type(data, page_start) & 0x4 != 0
}

fn page_sequence_number(data: &[u8], page_start: usize) -> u32 {
	LittleEndian::read_u32(&data[page_start + 18..page_start + 22])
}

fn capture_pattern_at(data: &[u8], page_start: usize) -> bool {
	page_start + 4 <= data.len() && &data[page_start..page_start + 4] == CAPTURE_PATTERN
}

/// A page-granular reader over an Ogg-encapsulated bitstream.
///
/// Reads the whole file into memory up front (the same approach the
/// reference Python implementation takes), since the backward-scanning
/// `seek` contract needs arbitrary byte-offset random access regardless.
pub struct OggPageReader {
	data: Vec<u8>,
	byte_pointer: usize,
	last_page: i64,
}

impl OggPageReader {
	/// Opens `path`, verifying the first four bytes equal `OggS`.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<OggPageReader, ParseError> {
		let mut file = File::open(path)?;
		let mut data = Vec::new();
		file.read_to_end(&mut data)?;
		if data.len() < 4 || &data[0..4] != CAPTURE_PATTERN {
			return Err(ParseError::NotAnOggContainer);
		}
		Ok(OggPageReader { data, byte_pointer: 0, last_page: -1 })
	}

	/// Releases the in-memory buffer. Present for symmetry with `open`
	/// and to give callers an explicit point to drop resources instead
	/// of relying solely on scope exit.
	pub fn close(self) {}

	fn fresh_packet_on_page(&self) -> bool {
		!page_is_continued_packet(&self.data, self.byte_pointer)
	}

	fn capture_pattern_missing(&self) -> bool {
		!capture_pattern_at(&self.data, self.byte_pointer)
	}

	/// Repositions to `offset`, then (unless already at a page boundary
	/// that starts a fresh packet) scans backwards to the nearest page
	/// whose continued-packet flag is clear.
	pub fn seek(&mut self, offset: u64) -> Result<(), ParseError> {
		self.byte_pointer = offset as usize;

		if self.capture_pattern_missing() || !self.fresh_packet_on_page() {
			self.move_to_page_beginning_above()?;
			while !self.fresh_packet_on_page() {
				if self.byte_pointer == 0 {
					return Err(ParseError::corrupted(
						"seek reached offset 0 while continued-packet flag was still set",
					));
				}
				self.byte_pointer -= 1;
				self.move_to_page_beginning_above()?;
			}
		}

		self.last_page = page_sequence_number(&self.data, self.byte_pointer) as i64 - 1;
		Ok(())
	}

	fn move_to_page_beginning_above(&mut self) -> Result<(), ParseError> {
		while self.capture_pattern_missing() {
			if self.byte_pointer == 0 {
				return Err(ParseError::corrupted(
					"capture pattern is missing at the beginning of the file",
				));
			}
			self.byte_pointer -= 1;
		}
		Ok(())
	}

	/// Reads and consumes one page's worth of packet data starting at
	/// `byte_pointer`, advancing the cursor past it.
	fn read_page_data(&mut self) -> Result<Vec<u8>, ParseError> {
		if self.capture_pattern_missing() {
			return Err(ParseError::corrupted("missing Ogg capture pattern at page start"));
		}
		if self.byte_pointer + HEADER_LEN > self.data.len() {
			return Err(ParseError::corrupted("file truncated mid page header"));
		}

		let page_counter = page_sequence_number(&self.data, self.byte_pointer) as i64;
		if page_counter != self.last_page + 1 {
			return Err(ParseError::corrupted_at(
				format!(
					"non-consecutive page: expected {}, got {}",
					self.last_page + 1,
					page_counter
				),
				Some(self.byte_pointer as u64),
			));
		}
		self.last_page += 1;

		let segment_count = self.data[self.byte_pointer + 26] as usize;
		let segment_table_start = self.byte_pointer + HEADER_LEN;
		if segment_table_start + segment_count > self.data.len() {
			return Err(ParseError::corrupted("file truncated mid segment table"));
		}
		let segment_table = &self.data[segment_table_start..segment_table_start + segment_count];
		let data_len: usize = segment_table.iter().map(|&b| b as usize).sum();

		let data_start = segment_table_start + segment_count;
		if data_start + data_len > self.data.len() {
			return Err(ParseError::corrupted("file truncated mid page data"));
		}
		let page_data = self.data[data_start..data_start + data_len].to_vec();
		self.byte_pointer = data_start + data_len;
		Ok(page_data)
	}

	/// Returns the next packet's bytes and the list of page sequence
	/// numbers that carried it. Fails with `EndOfFile` when the previous
	/// page read had the last-page-of-stream flag set and no further
	/// page is available.
	pub fn read_packet(&mut self) -> Result<(Vec<u8>, Vec<u32>), ParseError> {
		if self.byte_pointer >= self.data.len() {
			return Err(ParseError::EndOfFile);
		}

		let mut packet_data = Vec::new();
		let mut packet_pages = Vec::new();

		let was_last_page = page_is_last_of_stream(&self.data, self.byte_pointer);
		let page_no = page_sequence_number(&self.data, self.byte_pointer);
		packet_pages.push(page_no);
		packet_data.extend_from_slice(&self.read_page_data()?);

		let mut last_page_was_last_of_stream = was_last_page;
		while self.byte_pointer < self.data.len() && !self.fresh_packet_on_page() {
			if last_page_was_last_of_stream {
				return Err(ParseError::corrupted(
					"page continues a packet after the last-page-of-stream flag was set",
				));
			}
			last_page_was_last_of_stream = page_is_last_of_stream(&self.data, self.byte_pointer);
			let page_no = page_sequence_number(&self.data, self.byte_pointer);
			packet_pages.push(page_no);
			packet_data.extend_from_slice(&self.read_page_data()?);
		}

		Ok((packet_data, packet_pages))
	}
}
