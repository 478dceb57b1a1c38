use log::debug;
use rand::Rng;

use super::frequency_model::FrequencyModel;
use super::generation_input::{GenerationInput, StartSeed};
use crate::error::{MarkovError, Result};

/// High-level text generator over a trained `FrequencyModel`.
///
/// # Responsibilities
/// - Resolve the starting seed (empty, corpus prefix or custom)
/// - Extend the text one sampled symbol at a time until the requested length
///
/// The generator only borrows the model, so several generators may share
/// one trained model across threads.
#[derive(Debug, Clone, Copy)]
pub struct Generator<'a> {
	model: &'a FrequencyModel,
}

impl<'a> Generator<'a> {
	pub fn new(model: &'a FrequencyModel) -> Self {
		Self { model }
	}

	/// Generates text using the thread-local RNG.
	pub fn generate(&self, input: &GenerationInput) -> Result<String> {
		self.generate_with(input, &mut rand::rng())
	}

	/// Generates text with the given RNG.
	///
	/// # Behavior
	/// - The returned text starts with the seed and holds `input.length()`
	///   symbols; a seed already that long is returned unchanged.
	/// - Each new symbol is sampled from the last `order` symbols.
	///
	/// # Errors
	/// - `NotTrained` if the model has no table
	/// - `SymbolNotFound` if a custom seed holds foreign symbols
	/// - `InvalidSeed` if backoff is disabled and the seed is not exactly
	///   `order` symbols long
	/// - Any sampling error (`NoTransition`, `DeadEnd`)
	pub fn generate_with<R: Rng>(&self, input: &GenerationInput, rng: &mut R) -> Result<String> {
		if !self.model.is_trained() {
			return Err(MarkovError::NotTrained);
		}

		let order = self.model.order();
		let mut text: Vec<char> = match &input.start_seed {
			StartSeed::Empty => Vec::new(),
			StartSeed::Corpus => self.model.corpus_seed().chars().collect(),
			StartSeed::Custom(seed) => self.model.alphabet().fold(seed)?,
		};

		if !self.model.backoff() && text.len() != order {
			return Err(MarkovError::InvalidSeed { expected: order, found: text.len() });
		}

		while text.len() < input.length() {
			let start = text.len().saturating_sub(order);
			let next = self.model.sample_folded(&text[start..], rng)?;
			text.push(next);
		}

		debug!("generated {} symbols", text.len());
		Ok(text.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::config::ModelConfig;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn model(corpus: &str, order: usize, backoff: bool) -> FrequencyModel {
		FrequencyModel::trained(ModelConfig::new(order, "ab", backoff).unwrap(), corpus).unwrap()
	}

	#[test]
	fn alternating_corpus_alternates() {
		let model = model("abababab", 1, false);
		let input = GenerationInput::new(9).unwrap().with_seed(StartSeed::Custom("A".to_owned()));
		let text = Generator::new(&model).generate_with(&input, &mut StdRng::seed_from_u64(1)).unwrap();
		assert_eq!(text, "ababababa");
	}

	#[test]
	fn corpus_seed_is_used() {
		let model = model("babababa", 1, false);
		let input = GenerationInput::new(4).unwrap().with_seed(StartSeed::Corpus);
		assert_eq!(Generator::new(&model).generate(&input).unwrap(), "baba");
	}

	#[test]
	fn seed_length_must_match_order_without_backoff() {
		let model = model("abababab", 1, false);
		let input = GenerationInput::new(5).unwrap();
		assert!(matches!(
			Generator::new(&model).generate(&input),
			Err(MarkovError::InvalidSeed { expected: 1, found: 0 })
		));
	}

	#[test]
	fn backoff_allows_an_empty_seed() {
		let model = model("abababab", 2, true);
		let input = GenerationInput::new(12).unwrap();
		let text = Generator::new(&model).generate(&input).unwrap();
		assert_eq!(text.chars().count(), 12);
		assert!(text.chars().all(|c| c == 'a' || c == 'b'));
	}

	#[test]
	fn long_seed_is_returned_as_is() {
		let model = model("abababab", 0, true);
		let input = GenerationInput::new(2).unwrap().with_seed(StartSeed::Custom("abba".to_owned()));
		assert_eq!(Generator::new(&model).generate(&input).unwrap(), "abba");
	}

	#[test]
	fn foreign_seed_symbols_are_rejected() {
		let model = model("abababab", 0, true);
		let input = GenerationInput::new(5).unwrap().with_seed(StartSeed::Custom("xyz".to_owned()));
		assert!(matches!(Generator::new(&model).generate(&input), Err(MarkovError::SymbolNotFound { .. })));
	}

	#[test]
	fn untrained_model_is_rejected() {
		let model = FrequencyModel::new(ModelConfig::new(1, "ab", true).unwrap());
		let input = GenerationInput::new(5).unwrap();
		assert!(matches!(Generator::new(&model).generate(&input), Err(MarkovError::NotTrained)));
	}
}
