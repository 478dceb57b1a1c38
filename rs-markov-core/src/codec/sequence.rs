//! Rank-sequence codec.
//!
//! Every symbol of a text is replaced by its rank (0-based position) in the
//! model's ranked candidate list for the context that precedes it. Decoding
//! replays the same contexts and picks the candidate at each rank, so the
//! pair is lossless for a given trained model.
//!
//! The initial context is always empty; the context then grows by one
//! symbol per step and keeps only the last `order` symbols.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{MarkovError, Result};
use crate::model::FrequencyModel;

/// Rolling context shared by `encode` and `decode`.
struct Context {
	order: usize,
	symbols: Vec<char>,
}

impl Context {
	fn new(order: usize) -> Self {
		Self { order, symbols: Vec::new() }
	}

	fn as_slice(&self) -> &[char] {
		&self.symbols
	}

	fn push(&mut self, symbol: char) {
		if self.order == 0 {
			return;
		}
		if self.symbols.len() == self.order {
			self.symbols.remove(0);
		}
		self.symbols.push(symbol);
	}
}

/// Encodes `text` as a rank sequence.
///
/// The text is case-folded first.
///
/// # Errors
/// - `SymbolNotFound` if the text holds a symbol outside the alphabet
/// - Any ranking error of the model (`NotTrained`, `NoTransition`)
pub fn encode(model: &FrequencyModel, text: &str) -> Result<Vec<usize>> {
	model.counts()?;
	let symbols = model.alphabet().fold(text)?;
	let mut context = Context::new(model.order());
	let mut ranks = Vec::with_capacity(symbols.len());

	for symbol in symbols {
		let candidates = model.ranked_candidates_for(context.as_slice())?;
		let rank = candidates
			.iter()
			.position(|candidate| candidate.symbol == symbol)
			.ok_or(MarkovError::SymbolNotFound { symbol })?;
		ranks.push(rank);
		context.push(symbol);
	}

	debug!("encoded {} symbols", ranks.len());
	Ok(ranks)
}

/// Decodes a rank sequence produced by [`encode`] with the same model.
///
/// # Errors
/// - `InvalidRank` if a rank is not below the alphabet size
/// - Any ranking error of the model (`NotTrained`, `NoTransition`)
pub fn decode(model: &FrequencyModel, ranks: &[usize]) -> Result<String> {
	model.counts()?;
	let mut context = Context::new(model.order());
	let mut text = String::with_capacity(ranks.len());

	for &rank in ranks {
		let candidates = model.ranked_candidates_for(context.as_slice())?;
		let symbol = candidates
			.get(rank)
			.map(|candidate| candidate.symbol)
			.ok_or(MarkovError::InvalidRank { rank, size: candidates.len() })?;
		text.push(symbol);
		context.push(symbol);
	}

	debug!("decoded {} symbols", ranks.len());
	Ok(text)
}

/// Number of occurrences of each rank.
///
/// A well-fitted model concentrates the sequence on small ranks, which is
/// what the Huffman packing takes advantage of.
pub fn rank_histogram(ranks: &[usize]) -> BTreeMap<usize, usize> {
	let mut histogram = BTreeMap::new();
	for &rank in ranks {
		*histogram.entry(rank).or_insert(0) += 1;
	}
	histogram
}
