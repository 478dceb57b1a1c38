//! Static canonical Huffman code over rank symbols.
//!
//! The code is built once from a rank sequence and shared by encoder and
//! decoder through its code lengths only: canonical codes are a pure
//! function of the lengths.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::bits::BitBuffer;
use crate::error::{MarkovError, Result};

/// Longest code the bit buffer can push in one call.
pub const MAX_CODE_LENGTH: u8 = 64;

/// Canonical Huffman code for symbols `0..symbol_count`.
///
/// # Invariants
/// - Every symbol has a code (lengths are in `1..=MAX_CODE_LENGTH`)
/// - The code is complete (Kraft sum of 1), except for a single symbol
///   which is coded on one bit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HuffmanCode {
	lengths: Vec<u8>,
	codes: Vec<u64>,
	/// Number of codes per length, indexed by length.
	length_counts: Vec<usize>,
	/// Symbols ordered by (length, symbol): the canonical order.
	sorted_symbols: Vec<usize>,
}

impl HuffmanCode {
	/// Builds a code fitted to `ranks`.
	///
	/// Every symbol below `symbol_count` receives one extra occurrence so
	/// that ranks absent from `ranks` remain encodable.
	///
	/// # Errors
	/// - `InvalidInput` if `symbol_count` is zero or a code would exceed
	///   `MAX_CODE_LENGTH` bits
	/// - `InvalidRank` if a rank is not below `symbol_count`
	pub fn from_ranks(ranks: &[usize], symbol_count: usize) -> Result<Self> {
		let mut frequencies = vec![1u64; symbol_count];
		for &rank in ranks {
			match frequencies.get_mut(rank) {
				Some(frequency) => *frequency += 1,
				None => return Err(MarkovError::InvalidRank { rank, size: symbol_count }),
			}
		}
		Self::from_frequencies(&frequencies)
	}

	/// Builds a code from symbol frequencies.
	///
	/// Ties are broken by symbol index (leaves) and creation order
	/// (internal nodes), so equal inputs always give equal codes.
	pub fn from_frequencies(frequencies: &[u64]) -> Result<Self> {
		let symbol_count = frequencies.len();
		if symbol_count == 0 {
			return Err(MarkovError::InvalidInput("a Huffman code needs at least one symbol".to_owned()));
		}
		if symbol_count == 1 {
			return Self::from_lengths(vec![1]);
		}

		// Node ids: leaves are 0..n, internal nodes follow in creation order
		let mut parent = vec![usize::MAX; 2 * symbol_count - 1];
		let mut heap: BinaryHeap<Reverse<(u64, usize)>> = frequencies
			.iter()
			.enumerate()
			.map(|(symbol, &frequency)| Reverse((frequency, symbol)))
			.collect();

		let mut next_id = symbol_count;
		while heap.len() > 1 {
			let (Some(Reverse((left_weight, left))), Some(Reverse((right_weight, right)))) = (heap.pop(), heap.pop()) else {
				break;
			};
			parent[left] = next_id;
			parent[right] = next_id;
			heap.push(Reverse((left_weight.saturating_add(right_weight), next_id)));
			next_id += 1;
		}

		let root = next_id - 1;
		let mut lengths = Vec::with_capacity(symbol_count);
		for symbol in 0..symbol_count {
			let mut depth = 0usize;
			let mut node = symbol;
			while node != root {
				node = parent[node];
				depth += 1;
			}
			if depth > MAX_CODE_LENGTH as usize {
				return Err(MarkovError::InvalidInput(format!("Huffman code of {depth} bits is too long")));
			}
			lengths.push(depth as u8);
		}

		Self::from_lengths(lengths)
	}

	/// Rebuilds the canonical code from its code lengths.
	///
	/// # Errors
	/// Returns `CorruptData` if a length is out of range or the lengths do
	/// not describe a complete prefix code.
	pub fn from_lengths(lengths: Vec<u8>) -> Result<Self> {
		if lengths.is_empty() {
			return Err(MarkovError::corrupt("empty Huffman code"));
		}
		if let Some(length) = lengths.iter().find(|&&length| length == 0 || length > MAX_CODE_LENGTH) {
			return Err(MarkovError::corrupt(format!("Huffman code length {length} out of range")));
		}

		let kraft: u128 = lengths.iter().map(|&length| 1u128 << (MAX_CODE_LENGTH - length)).sum();
		let expected = if lengths.len() == 1 { 1u128 << (MAX_CODE_LENGTH - 1) } else { 1u128 << MAX_CODE_LENGTH };
		if kraft != expected {
			return Err(MarkovError::corrupt("Huffman code lengths do not form a complete code"));
		}

		let mut sorted_symbols: Vec<usize> = (0..lengths.len()).collect();
		sorted_symbols.sort_by_key(|&symbol| (lengths[symbol], symbol));

		let mut codes = vec![0u64; lengths.len()];
		let mut length_counts = vec![0usize; MAX_CODE_LENGTH as usize + 1];
		let mut code = 0u64;
		let mut previous_length = lengths[sorted_symbols[0]];
		for (position, &symbol) in sorted_symbols.iter().enumerate() {
			let length = lengths[symbol];
			if position > 0 {
				code = (code + 1) << (length - previous_length);
			}
			codes[symbol] = code;
			length_counts[length as usize] += 1;
			previous_length = length;
		}

		Ok(Self { lengths, codes, length_counts, sorted_symbols })
	}

	/// Number of symbols covered by the code.
	pub fn symbol_count(&self) -> usize {
		self.lengths.len()
	}

	/// Code length of every symbol, the only state needed to rebuild the code.
	pub fn lengths(&self) -> &[u8] {
		&self.lengths
	}

	/// Canonical code and length of `symbol`.
	pub fn code(&self, symbol: usize) -> Option<(u64, u8)> {
		Some((*self.codes.get(symbol)?, self.lengths[symbol]))
	}

	/// Appends the codes of `ranks` to `buffer`.
	///
	/// # Errors
	/// Returns `InvalidRank` for a rank outside the code.
	pub fn encode(&self, ranks: &[usize], buffer: &mut BitBuffer) -> Result<()> {
		for &rank in ranks {
			let (code, length) = self
				.code(rank)
				.ok_or(MarkovError::InvalidRank { rank, size: self.symbol_count() })?;
			buffer.push_bits(code, length);
		}
		Ok(())
	}

	/// Consumes `count` symbols from `buffer`.
	///
	/// # Errors
	/// Returns `CorruptData` if the buffer ends early or holds a bit
	/// pattern that is not a code.
	pub fn decode(&self, buffer: &mut BitBuffer, count: usize) -> Result<Vec<usize>> {
		let mut ranks = Vec::with_capacity(count.min(buffer.len()));
		for _ in 0..count {
			ranks.push(self.decode_symbol(buffer)?);
		}
		Ok(ranks)
	}

	fn decode_symbol(&self, buffer: &mut BitBuffer) -> Result<usize> {
		let mut code = 0u128;
		let mut first = 0u128;
		let mut index = 0usize;

		for length in 1..=MAX_CODE_LENGTH as usize {
			let bit = buffer.pop_bit().ok_or_else(|| MarkovError::corrupt("truncated Huffman stream"))?;
			code |= bit as u128;
			let count = self.length_counts[length] as u128;
			if code >= first && code - first < count {
				return Ok(self.sorted_symbols[index + (code - first) as usize]);
			}
			index += count as usize;
			first = (first + count) << 1;
			code <<= 1;
		}

		Err(MarkovError::corrupt("invalid Huffman code"))
	}
}
