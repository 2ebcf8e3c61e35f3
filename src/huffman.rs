// Vorbis header parser written in Rust
//
// Copyright (c) 2016 est31 <MTest31@outlook.com>
// and contributors. All rights reserved.
// Licensed under MIT license, or Apache 2 license,
// at your option. Please see the LICENSE file
// attached to this source distribution for details.

/*!
Canonical Huffman codeword construction for Vorbis codebooks.

Two algorithms exist for this problem: a quadratic "try a codeword value,
test for conflicts, increment" builder, and a linear "available-branches"
builder that walks the length vector once. This module implements the
linear one, which is the one real decoders (and this crate) use; the
quadratic one is kept only as a test oracle (see `tests` below), per the
historical design note that the brute-force approach is "extremely slow,
use for tests only".

This crate never needs to decode audio, so unlike lewton's
`huffman_tree`, there is no tree-walking iterator here: only the vector
of natural (non-bit-reversed-at-the-call-site) codeword strings and a
completeness check are produced.
*/

use bit_reverse;
use ParseError;

/// Builds one natural codeword string per entry (empty for unused
/// entries), then checks the resulting code for Kraft-inequality
/// completeness. `lengths[i]` is `None` for an unused codebook entry,
/// `Some(length)` (`1..=32`) otherwise.
pub(crate) fn build_codewords(lengths: &[Option<u8>]) -> Result<Vec<String>, ParseError> {
	let mut used = lengths.iter().enumerate().filter_map(|(i, &l)| l.map(|l| (i, l)));
	let first_used = used.next();
	let second_used = used.next();

	// Single-entry codebooks are a documented Vorbis special case: the lone
	// used entry is assigned the one-bit codeword "0" and matches either
	// bit value during audio decode, without needing a complete tree.
	if let (Some((idx, length)), None) = (first_used, second_used) {
		if length != 1 {
			return Err(ParseError::corrupted("single-entry codebook's codeword length must be 1"));
		}
		let mut result = vec![String::new(); lengths.len()];
		result[idx] = "0".to_string();
		return Ok(result);
	}

	let codewords = build_codewords_raw(lengths)?;
	if first_used.is_some() {
		check_completeness(lengths)?;
	}
	Ok(codewords)
}

fn build_codewords_raw(lengths: &[Option<u8>]) -> Result<Vec<String>, ParseError> {
	let entries = lengths.len();
	let mut result = vec![String::new(); entries];

	let mut start_entry = 0;
	while start_entry < entries && lengths[start_entry].is_none() {
		start_entry += 1;
	}
	if start_entry == entries {
		// Every entry unused: a degenerate but valid codebook (e.g. one
		// that only carries a VQ lookup table and never entropy codes).
		return Ok(result);
	}

	let l0 = lengths[start_entry].expect("checked above");
	result[start_entry] = "0".repeat(l0 as usize);
	// available[k] holds the next free left-justified 32-bit tree
	// position at depth k, or 0 if depth k has no free slot.
	let mut available = [0u32; 33];
	for k in 1..=l0 {
		available[k as usize] = 1u32 << (32 - k as u32);
	}

	for (i, &length) in lengths.iter().enumerate().skip(start_entry + 1) {
		let length = match length {
			None => continue,
			Some(l) => l,
		};

		let mut max_branch = length;
		while max_branch > 0 && available[max_branch as usize] == 0 {
			max_branch -= 1;
		}
		if max_branch == 0 {
			return Err(ParseError::corrupted(
				"huffman tree is overspecified: ran out of available codeword slots",
			));
		}

		let slot_value = available[max_branch as usize];
		available[max_branch as usize] = 0;

		let reversed = bit_reverse(slot_value);
		let padded = format!("{:0width$b}", reversed, width = length as usize);
		let codeword: String = padded.chars().rev().collect();
		result[i] = codeword;

		if max_branch != length {
			for new_branch in (max_branch + 1..=length).rev() {
				available[new_branch as usize] = slot_value + (1u32 << (32 - new_branch as u32));
			}
		}
	}

	Ok(result)
}

/// Checks the Kraft-inequality equality `sum(2^32 >> length_i) == 2^32`
/// over used entries, equivalent to "the tree has no dangling leaves and
/// no undefined prefixes".
fn check_completeness(lengths: &[Option<u8>]) -> Result<(), ParseError> {
	let mut kraft_sum: u64 = 0;
	for len in lengths.iter().flatten() {
		kraft_sum += (1u64 << 32) >> len;
	}
	if kraft_sum != 1u64 << 32 {
		return Err(ParseError::corrupted(format!(
			"huffman tree is not complete (kraft sum {} != 2^32)",
			kraft_sum
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lens(v: &[i32]) -> Vec<Option<u8>> {
		v.iter().map(|&x| if x < 0 { None } else { Some(x as u8) }).collect()
	}

	#[test]
	fn test_seed_codebook_dense() {
		// Seed scenario: unordered + dense, 8 entries, lengths [1,3,4,7,2,5,6,7].
		let lengths = lens(&[1, 3, 4, 7, 2, 5, 6, 7]);
		let codewords = build_codewords(&lengths).unwrap();
		assert_eq!(
			codewords,
			vec!["0", "100", "1010", "1011000", "11", "10111", "101101", "1011001"]
		);
	}

	#[test]
	fn test_seed_codebook_sparse_prefix() {
		// Seed scenario: sparse codebook, first eight entries
		// [1,5,5,unused,5,5,unused,5]; not a complete codebook on its
		// own (only a fragment of a larger 81-entry one), so the raw
		// builder is exercised directly rather than the public
		// completeness-checked entry point.
		let lengths = lens(&[1, 5, 5, -1, 5, 5, -1, 5]);
		let codewords = build_codewords_raw(&lengths).unwrap();
		assert_eq!(
			codewords,
			vec!["0", "10000", "10001", "", "10010", "10011", "", "10100"]
		);
	}

	#[test]
	fn test_vorbis_spec_example_tree() {
		// The worked example from Vorbis I spec section 3.2.1.
		let lengths = lens(&[2, 4, 4, 4, 4, 2, 3, 3]);
		let codewords = build_codewords(&lengths).unwrap();
		assert_eq!(codewords.len(), 8);
		assert_no_prefix_conflicts(&codewords);
	}

	#[test]
	fn test_all_unused_is_not_an_error() {
		let lengths = lens(&[-1, -1, -1, -1]);
		let codewords = build_codewords(&lengths).unwrap();
		assert_eq!(codewords, vec!["", "", "", ""]);
	}

	#[test]
	fn test_underspecified_tree_is_corrupted() {
		// Two length-2 codewords only cover half of a depth-2 tree's four
		// leaves: too few codewords to be complete.
		let lengths = lens(&[2, 2]);
		assert!(build_codewords(&lengths).is_err());
	}

	#[test]
	fn test_single_entry_codebook_is_accepted() {
		// Documented Vorbis special case: a codebook with exactly one used
		// entry is valid regardless of the Kraft-completeness check, as
		// long as its length is 1.
		let lengths = lens(&[1]);
		let codewords = build_codewords(&lengths).unwrap();
		assert_eq!(codewords, vec!["0"]);

		let lengths = lens(&[-1, -1, 1, -1]);
		let codewords = build_codewords(&lengths).unwrap();
		assert_eq!(codewords, vec!["", "", "0", ""]);
	}

	#[test]
	fn test_single_entry_codebook_with_wrong_length_is_corrupted() {
		let lengths = lens(&[2]);
		assert!(build_codewords(&lengths).is_err());
	}

	#[test]
	fn test_overspecified_tree_is_corrupted() {
		// Three length-1 codes can't exist in a binary tree at once.
		let lengths = lens(&[1, 1, 1]);
		assert!(build_codewords(&lengths).is_err());
	}

	/// Brute-force adversarial oracle: independently confirms codeword
	/// uniqueness and prefix-freedom by pairwise comparison. Quadratic,
	/// and only ever used here, as a check on the linear builder above.
	fn assert_no_prefix_conflicts(codewords: &[String]) {
		for (i, a) in codewords.iter().enumerate() {
			if a.is_empty() {
				continue;
			}
			for (j, b) in codewords.iter().enumerate() {
				if i == j || b.is_empty() {
					continue;
				}
				assert!(
					!b.starts_with(a.as_str()),
					"codeword {} ({:?}) is a prefix of codeword {} ({:?})",
					i,
					a,
					j,
					b
				);
			}
		}
	}

	#[test]
	fn test_codeword_uniqueness_property() {
		let lengths = lens(&[1, 3, 4, 7, 2, 5, 6, 7]);
		let codewords = build_codewords(&lengths).unwrap();
		assert_no_prefix_conflicts(&codewords);
	}
}
