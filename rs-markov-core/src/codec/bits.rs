use std::collections::VecDeque;

use crate::error::{MarkovError, Result};

/// Bit-addressable FIFO buffer (MSB-first within each byte).
///
/// Bits are appended at `end` and consumed from `start`. Fully consumed
/// leading bytes are released after every read, so the buffer never holds
/// more than one partially consumed byte at the front.
///
/// # Invariants
/// - `start <= end <= 8 * bytes.len()`
/// - `start < 8` (leading bytes are released once consumed)
/// - Bits past `end` in the last byte are zero
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitBuffer {
	bytes: VecDeque<u8>,
	start: usize,
	end: usize,
}

impl BitBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps `bit_len` bits stored MSB-first in `bytes`.
	///
	/// # Errors
	/// Returns `CorruptData` if `bytes` does not hold exactly the bytes
	/// needed for `bit_len` bits.
	pub fn from_bytes(bytes: &[u8], bit_len: usize) -> Result<Self> {
		if bytes.len() != bit_len.div_ceil(8) {
			return Err(MarkovError::corrupt(format!(
				"bit stream of {} bits needs {} bytes, got {}",
				bit_len,
				bit_len.div_ceil(8),
				bytes.len()
			)));
		}

		let mut bytes: VecDeque<u8> = bytes.iter().copied().collect();
		let tail = bit_len % 8;
		if tail != 0 {
			if let Some(last) = bytes.back_mut() {
				*last &= 0xFF << (8 - tail);
			}
		}
		Ok(Self { bytes, start: 0, end: bit_len })
	}

	/// Number of unread bits.
	pub fn len(&self) -> usize {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Appends one bit.
	pub fn push_bit(&mut self, bit: bool) {
		if self.end == self.bytes.len() * 8 {
			self.bytes.push_back(0);
		}
		if bit {
			self.bytes[self.end / 8] |= 0x80 >> (self.end % 8);
		}
		self.end += 1;
	}

	/// Appends the `count` low bits of `value`, most significant first.
	pub fn push_bits(&mut self, value: u64, count: u8) {
		debug_assert!(count <= 64, "push_bits too large");
		for shift in (0..count).rev() {
			self.push_bit((value >> shift) & 1 == 1);
		}
	}

	/// Consumes one bit, `None` when the buffer is empty.
	pub fn pop_bit(&mut self) -> Option<bool> {
		if self.is_empty() {
			return None;
		}
		let bit = self.bytes[self.start / 8] & (0x80 >> (self.start % 8)) != 0;
		self.start += 1;
		self.release();
		Some(bit)
	}

	/// Consumes `count` bits as an integer, most significant first.
	///
	/// Nothing is consumed when fewer than `count` bits are left.
	pub fn pop_bits(&mut self, count: u8) -> Option<u64> {
		if count > 64 || self.len() < count as usize {
			return None;
		}
		let mut value = 0u64;
		for _ in 0..count {
			// Length checked above
			let bit = self.pop_bit()?;
			value = (value << 1) | bit as u64;
		}
		Some(value)
	}

	/// Copies the unread bits into bytes, MSB-first and zero-padded.
	pub fn to_bytes(&self) -> Vec<u8> {
		if self.start == 0 {
			return self.bytes.iter().copied().collect();
		}
		let mut aligned = BitBuffer::new();
		for position in self.start..self.end {
			aligned.push_bit(self.bytes[position / 8] & (0x80 >> (position % 8)) != 0);
		}
		aligned.bytes.into_iter().collect()
	}

	/// Drops fully consumed leading bytes.
	fn release(&mut self) {
		if self.start == self.end {
			self.bytes.clear();
			self.start = 0;
			self.end = 0;
			return;
		}
		while self.start >= 8 {
			self.bytes.pop_front();
			self.start -= 8;
			self.end -= 8;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bits_come_out_in_order() {
		let mut buffer = BitBuffer::new();
		buffer.push_bits(0b101, 3);
		buffer.push_bit(true);
		assert_eq!(buffer.len(), 4);
		assert_eq!(buffer.pop_bit(), Some(true));
		assert_eq!(buffer.pop_bits(3), Some(0b011));
		assert_eq!(buffer.pop_bit(), None);
		assert!(buffer.is_empty());
	}

	#[test]
	fn bytes_are_msb_first_and_padded() {
		let mut buffer = BitBuffer::new();
		buffer.push_bits(0b1100_0001_1, 9);
		assert_eq!(buffer.to_bytes(), vec![0b1100_0001, 0b1000_0000]);
	}

	#[test]
	fn consumed_bytes_are_released() {
		let mut buffer = BitBuffer::new();
		buffer.push_bits(0xABCD, 16);
		buffer.push_bits(0b1, 1);
		assert_eq!(buffer.pop_bits(12), Some(0xABC));
		assert_eq!(buffer.bytes.len(), 2);
		assert!(buffer.start < 8);
		assert_eq!(buffer.to_bytes(), vec![0b1101_1000]);
	}

	#[test]
	fn short_reads_consume_nothing() {
		let mut buffer = BitBuffer::new();
		buffer.push_bits(0b11, 2);
		assert_eq!(buffer.pop_bits(3), None);
		assert_eq!(buffer.len(), 2);
	}

	#[test]
	fn from_bytes_validates_and_masks() {
		assert!(BitBuffer::from_bytes(&[0xFF], 9).is_err());
		assert!(BitBuffer::from_bytes(&[0xFF, 0xFF], 8).is_err());

		let mut buffer = BitBuffer::from_bytes(&[0xFF], 3).unwrap();
		assert_eq!(buffer.to_bytes(), vec![0b1110_0000]);
		assert_eq!(buffer.pop_bits(3), Some(0b111));
		assert!(buffer.is_empty());
	}
}
