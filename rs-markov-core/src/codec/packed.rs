//! Compact byte container for rank sequences.
//!
//! Layout: `b"RSMP"`, one version byte, then a postcard body holding the
//! Huffman code lengths, the number of ranks and the MSB-first payload.

use log::debug;
use serde::{Deserialize, Serialize};

use super::bits::BitBuffer;
use super::huffman::HuffmanCode;
use super::sequence;
use crate::error::{MarkovError, Result};
use crate::model::FrequencyModel;

const MAGIC: &[u8; 4] = b"RSMP";
const VERSION: u8 = 1;

#[derive(Serialize, Deserialize, Debug)]
struct PackedBody {
	lengths: Vec<u8>,
	rank_count: usize,
	bit_len: usize,
	payload: Vec<u8>,
}

/// Packs a rank sequence whose ranks are all below `symbol_count`.
///
/// # Errors
/// Returns `InvalidRank` for a rank outside `0..symbol_count`.
pub fn pack(ranks: &[usize], symbol_count: usize) -> Result<Vec<u8>> {
	let code = HuffmanCode::from_ranks(ranks, symbol_count)?;
	let mut buffer = BitBuffer::new();
	code.encode(ranks, &mut buffer)?;

	let body = PackedBody {
		lengths: code.lengths().to_vec(),
		rank_count: ranks.len(),
		bit_len: buffer.len(),
		payload: buffer.to_bytes(),
	};

	let mut bytes = Vec::with_capacity(MAGIC.len() + 1 + body.payload.len() + body.lengths.len() + 8);
	bytes.extend_from_slice(MAGIC);
	bytes.push(VERSION);
	bytes.extend_from_slice(&postcard::to_stdvec(&body)?);

	debug!("packed {} ranks into {} bytes", ranks.len(), bytes.len());
	Ok(bytes)
}

/// Unpacks a rank sequence produced by [`pack`].
///
/// # Errors
/// Returns `CorruptData` on a bad header, a malformed body or a payload
/// that does not decode to exactly the announced number of ranks.
pub fn unpack(bytes: &[u8]) -> Result<Vec<usize>> {
	let body = bytes
		.strip_prefix(MAGIC.as_slice())
		.ok_or_else(|| MarkovError::corrupt("not a packed rank sequence"))?;
	let (&version, body) = body.split_first().ok_or_else(|| MarkovError::corrupt("missing version"))?;
	if version != VERSION {
		return Err(MarkovError::corrupt(format!("unsupported packed version {version}")));
	}

	let (body, rest): (PackedBody, &[u8]) = postcard::take_from_bytes(body)?;
	if !rest.is_empty() {
		return Err(MarkovError::corrupt(format!("{} trailing bytes", rest.len())));
	}

	// Every code is at least one bit long
	if body.rank_count > body.bit_len {
		return Err(MarkovError::corrupt(format!("{} ranks cannot fit in {} bits", body.rank_count, body.bit_len)));
	}

	let code = HuffmanCode::from_lengths(body.lengths)?;
	let mut buffer = BitBuffer::from_bytes(&body.payload, body.bit_len)?;
	let ranks = code.decode(&mut buffer, body.rank_count)?;
	if !buffer.is_empty() {
		return Err(MarkovError::corrupt(format!("{} unused payload bits", buffer.len())));
	}
	Ok(ranks)
}

/// Encodes `text` with `model` and packs the resulting ranks.
pub fn compress(model: &FrequencyModel, text: &str) -> Result<Vec<u8>> {
	let ranks = sequence::encode(model, text)?;
	pack(&ranks, model.alphabet().len())
}

/// Unpacks ranks produced by [`compress`] and decodes them with `model`.
pub fn decompress(model: &FrequencyModel, bytes: &[u8]) -> Result<String> {
	let ranks = unpack(bytes)?;
	sequence::decode(model, &ranks)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{Alphabet, ModelConfig};

	#[test]
	fn pack_then_unpack() {
		let ranks = vec![0, 1, 0, 0, 4, 2, 0, 0, 0, 1];
		let bytes = pack(&ranks, 5).unwrap();
		assert!(bytes.starts_with(MAGIC));
		assert_eq!(unpack(&bytes).unwrap(), ranks);
	}

	#[test]
	fn empty_sequence() {
		let bytes = pack(&[], 3).unwrap();
		assert!(unpack(&bytes).unwrap().is_empty());
	}

	#[test]
	fn bad_headers_are_corrupt() {
		let bytes = pack(&[0, 1], 2).unwrap();

		let mut wrong_magic = bytes.clone();
		wrong_magic[0] = b'X';
		assert!(matches!(unpack(&wrong_magic), Err(MarkovError::CorruptData(_))));

		let mut wrong_version = bytes.clone();
		wrong_version[4] = 99;
		assert!(matches!(unpack(&wrong_version), Err(MarkovError::CorruptData(_))));

		assert!(matches!(unpack(&bytes[..bytes.len() - 1]), Err(MarkovError::CorruptData(_))));

		let mut trailing = bytes;
		trailing.push(0);
		assert!(matches!(unpack(&trailing), Err(MarkovError::CorruptData(_))));
	}

	fn encode_body(body: &PackedBody) -> Vec<u8> {
		let mut bytes = MAGIC.to_vec();
		bytes.push(VERSION);
		bytes.extend(postcard::to_stdvec(body).unwrap());
		bytes
	}

	#[test]
	fn announced_rank_count_must_fit_the_payload() {
		let huge = PackedBody { lengths: vec![1, 1], rank_count: usize::MAX, bit_len: 0, payload: vec![] };
		assert!(matches!(unpack(&encode_body(&huge)), Err(MarkovError::CorruptData(_))));

		let too_many = PackedBody { lengths: vec![1, 1], rank_count: 9, bit_len: 8, payload: vec![0] };
		assert!(matches!(unpack(&encode_body(&too_many)), Err(MarkovError::CorruptData(_))));

		let exact = PackedBody { lengths: vec![1, 1], rank_count: 8, bit_len: 8, payload: vec![0b1000_0001] };
		assert_eq!(unpack(&encode_body(&exact)).unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 1]);
	}

	#[test]
	fn compress_round_trips_text() {
		let corpus = "it was the best of times, it was the worst of times.";
		let model = FrequencyModel::trained(ModelConfig::new(3, Alphabet::BASIC, true).unwrap(), corpus).unwrap();
		let text = "it was the best of times.";
		let bytes = compress(&model, text).unwrap();
		assert_eq!(decompress(&model, &bytes).unwrap(), text);
	}
}
