/// Strategy used to select the starting seed when generating text.
///
/// # Variants
/// - `Empty`: start from an empty context (requires backoff when the
///   model order is above zero).
/// - `Corpus`: start from the first `order` symbols of the training text.
/// - `Custom(String)`: use the provided string as the initial text.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum StartSeed {
	#[default]
	Empty,
	Corpus,
	Custom(String),
}

/// Input parameters for text generation.
///
/// # Invariants
/// - `length` is at least 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationInput {
	/// Total number of symbols of the generated text, seed included.
	length: usize,

	/// Starting seed for generation.
	pub start_seed: StartSeed,
}

impl GenerationInput {
	/// Creates an input producing `length` symbols from an empty seed.
	///
	/// # Errors
	/// Returns an error if `length` is zero.
	pub fn new(length: usize) -> Result<Self, String> {
		let mut input = Self { length: 1, start_seed: StartSeed::Empty };
		input.set_length(length)?;
		Ok(input)
	}

	/// Returns the requested text length.
	pub fn length(&self) -> usize {
		self.length
	}

	/// Sets the requested text length.
	///
	/// # Errors
	/// Returns an error if `length` is zero.
	pub fn set_length(&mut self, length: usize) -> Result<(), String> {
		if length == 0 {
			return Err("Length must be at least 1".to_owned());
		}
		self.length = length;
		Ok(())
	}

	/// Builder-style seed setter.
	pub fn with_seed(mut self, start_seed: StartSeed) -> Self {
		self.start_seed = start_seed;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn length_must_be_positive() {
		assert!(GenerationInput::new(0).is_err());
		let mut input = GenerationInput::new(10).unwrap();
		assert!(input.set_length(0).is_err());
		assert_eq!(input.length(), 10);
	}

	#[test]
	fn defaults_to_empty_seed() {
		let input = GenerationInput::new(3).unwrap();
		assert_eq!(input.start_seed, StartSeed::Empty);
		let input = input.with_seed(StartSeed::Corpus);
		assert_eq!(input.start_seed, StartSeed::Corpus);
	}
}
