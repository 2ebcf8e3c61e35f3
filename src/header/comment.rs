// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

//! Comment header (packet type `0x03`).
//!
//! The only header with a lenient failure policy: a truncated or
//! non-UTF-8 comment degrades to a sentinel value and a flag, rather than
//! aborting the whole parse, since comments are metadata rather than
//! structure the audio decode depends on.

use bitpack::BitCursor;
use EndOfPacket;
use ParseError;

use super::read_header_begin;

const UTF8_FAILURE_SENTINEL: &str = "<invalid utf-8>";

pub(crate) struct CommentHeaderResult {
	pub vendor_string: String,
	pub user_comments: Vec<String>,
	pub decoding_failed: bool,
}

fn read_length_prefixed_utf8(cur: &mut BitCursor) -> Result<Option<String>, EndOfPacket> {
	let len = cur.read_uint(32)? as usize;
	let bytes = cur.read_bytes(len)?;
	Ok(String::from_utf8(bytes).ok())
}

pub(crate) fn read_comment_header(packet: &[u8]) -> Result<CommentHeaderResult, ParseError> {
	let mut cur = BitCursor::new(packet);
	read_header_begin(&mut cur, 0x03)?;

	let mut decoding_failed = false;

	let vendor_string = match read_length_prefixed_utf8(&mut cur) {
		Ok(Some(s)) => s,
		Ok(None) => {
			decoding_failed = true;
			UTF8_FAILURE_SENTINEL.to_string()
		}
		Err(EndOfPacket) => {
			warn!("comment header truncated while reading vendor string");
			return Ok(CommentHeaderResult {
				vendor_string: String::new(),
				user_comments: Vec::new(),
				decoding_failed: true,
			});
		}
	};

	let comment_count = match cur.read_uint(32) {
		Ok(v) => v,
		Err(EndOfPacket) => {
			return Ok(CommentHeaderResult {
				vendor_string,
				user_comments: Vec::new(),
				decoding_failed: true,
			});
		}
	};

	// Cap the up-front allocation regardless of what the field claims;
	// actual pushes still happen one at a time below.
	let mut user_comments = Vec::with_capacity(comment_count.min(1024) as usize);
	for _ in 0..comment_count {
		match read_length_prefixed_utf8(&mut cur) {
			Ok(Some(s)) => user_comments.push(s),
			Ok(None) => {
				decoding_failed = true;
				user_comments.push(UTF8_FAILURE_SENTINEL.to_string());
			}
			Err(EndOfPacket) => {
				warn!("comment header truncated mid user comment list");
				decoding_failed = true;
				break;
			}
		}
	}

	match cur.read_bit() {
		Ok(true) => {}
		Ok(false) => decoding_failed = true,
		Err(EndOfPacket) => decoding_failed = true,
	}

	Ok(CommentHeaderResult { vendor_string, user_comments, decoding_failed })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn build(vendor: &str, comments: &[&str], framing: bool) -> Vec<u8> {
		let mut body = Vec::new();
		body.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
		body.extend_from_slice(vendor.as_bytes());
		body.extend_from_slice(&(comments.len() as u32).to_le_bytes());
		for c in comments {
			body.extend_from_slice(&(c.len() as u32).to_le_bytes());
			body.extend_from_slice(c.as_bytes());
		}
		let mut out = Vec::new();
		out.push(0x03);
		out.extend_from_slice(b"vorbis");
		out.extend_from_slice(&body);
		out.push(if framing { 0x01 } else { 0x00 });
		out
	}

	#[test]
	fn test_well_formed_comment_header() {
		let bytes = build("vorbis_probe 0.1", &["ARTIST=test", "TITLE=seed"], true);
		let result = read_comment_header(&bytes).unwrap();
		assert_eq!(result.vendor_string, "vorbis_probe 0.1");
		assert_eq!(result.user_comments, vec!["ARTIST=test", "TITLE=seed"]);
		assert!(!result.decoding_failed);
	}

	#[test]
	fn test_missing_framing_bit_sets_flag_not_error() {
		let bytes = build("vendor", &[], false);
		let result = read_comment_header(&bytes).unwrap();
		assert!(result.decoding_failed);
		assert_eq!(result.vendor_string, "vendor");
	}

	#[test]
	fn test_truncated_comment_list_recovers() {
		let mut bytes = build("vendor", &["one", "two", "three"], true);
		bytes.truncate(bytes.len() - 6); // cut off partway through "three"
		let result = read_comment_header(&bytes).unwrap();
		assert!(result.decoding_failed);
		assert_eq!(result.vendor_string, "vendor");
		assert!(result.user_comments.len() <= 3);
	}

	#[test]
	fn test_invalid_utf8_substitutes_sentinel() {
		let mut bytes = Vec::new();
		bytes.push(0x03);
		bytes.extend_from_slice(b"vorbis");
		bytes.extend_from_slice(&0u32.to_le_bytes()); // empty vendor string
		bytes.extend_from_slice(&1u32.to_le_bytes()); // one comment
		bytes.extend_from_slice(&3u32.to_le_bytes());
		bytes.extend_from_slice(&[0xff, 0xfe, 0xfd]); // not valid utf-8
		bytes.push(0x01); // framing bit set

		let result = read_comment_header(&bytes).unwrap();
		assert!(result.decoding_failed);
		assert_eq!(result.user_comments, vec![UTF8_FAILURE_SENTINEL.to_string()]);
	}
}
