use serde::{Deserialize, Serialize};

use super::alphabet::Alphabet;
use crate::error::Result;

/// Configuration of a frequency model.
///
/// # Fields
/// - `order`: maximum context length used to predict the next symbol
/// - `alphabet`: the only symbols allowed in training and encoded text
/// - `backoff`: store every order from 0 to `order` and fall back to
///   shorter contexts when the full context does not resolve a symbol
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ModelConfig {
	pub order: usize,
	pub alphabet: Alphabet,
	pub backoff: bool,
}

impl ModelConfig {
	/// Creates a configuration from an alphabet string.
	///
	/// # Errors
	/// Returns `InvalidAlphabet` if `alphabet` is empty or holds duplicates.
	pub fn new(order: usize, alphabet: &str, backoff: bool) -> Result<Self> {
		Ok(Self { order, alphabet: Alphabet::new(alphabet)?, backoff })
	}
}

impl Default for ModelConfig {
	/// Order 5 over the basic alphabet, with backoff.
	fn default() -> Self {
		Self { order: 5, alphabet: Alphabet::default(), backoff: true }
	}
}
