//! Error type shared by every part of the crate.
//!
//! Each variant maps to one failure a caller can react to: re-filter the
//! input, retry with another seed, or give up on a corrupt file.

use thiserror::Error;

/// Main error type for the Markov model, codec and persistence layers.
#[derive(Error, Debug)]
pub enum MarkovError {
	/// A query was made before the model was trained or loaded.
	#[error("model is not trained")]
	NotTrained,

	/// The filtered corpus holds fewer symbols than the model order.
	#[error("insufficient training data: need at least {needed} symbols, found {found}")]
	InsufficientData {
		/// Minimum number of symbols (the model order)
		needed: usize,
		/// Number of symbols left after filtering
		found: usize,
	},

	/// No symbol was ever observed after this context and backoff is disabled.
	#[error("no transition observed for context {context:?}")]
	NoTransition {
		/// Context that was queried
		context: String,
	},

	/// Every candidate has a zero weight, even after backoff.
	#[error("dead end: every candidate after {context:?} has zero weight")]
	DeadEnd {
		/// Context that was queried
		context: String,
	},

	/// A symbol is not part of the model alphabet.
	#[error("symbol {symbol:?} is not in the alphabet")]
	SymbolNotFound {
		/// The offending symbol
		symbol: char,
	},

	/// A rank does not address any candidate.
	#[error("invalid rank {rank}: only {size} candidates")]
	InvalidRank {
		/// The offending rank
		rank: usize,
		/// Number of candidates (alphabet size)
		size: usize,
	},

	/// Persisted data could not be decoded.
	#[error("corrupt data: {0}")]
	CorruptData(String),

	/// The alphabet is empty or holds duplicated symbols.
	#[error("invalid alphabet: {0}")]
	InvalidAlphabet(String),

	/// A generation seed has the wrong length.
	#[error("invalid seed: expected {expected} symbols, found {found}")]
	InvalidSeed {
		/// Required seed length (the model order)
		expected: usize,
		/// Actual seed length
		found: usize,
	},

	/// A parameter is outside its valid range.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// I/O related errors
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl MarkovError {
	/// Builds a `CorruptData` error from any displayable message.
	pub fn corrupt(message: impl Into<String>) -> Self {
		MarkovError::CorruptData(message.into())
	}
}

impl From<postcard::Error> for MarkovError {
	fn from(err: postcard::Error) -> Self {
		MarkovError::CorruptData(err.to_string())
	}
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MarkovError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn messages_carry_details() {
		let err = MarkovError::InvalidRank { rank: 99, size: 2 };
		assert_eq!(err.to_string(), "invalid rank 99: only 2 candidates");

		let err = MarkovError::InsufficientData { needed: 3, found: 1 };
		assert!(err.to_string().contains("need at least 3"));
	}

	#[test]
	fn io_errors_convert() {
		let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
		let err: MarkovError = io.into();
		assert!(matches!(err, MarkovError::Io(_)));
	}
}
