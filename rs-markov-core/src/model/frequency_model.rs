use std::cmp::Reverse;
use std::ops::Range;
use std::sync::mpsc;
use std::thread;

use log::{debug, info};
use rand::Rng;

use super::alphabet::Alphabet;
use super::config::ModelConfig;
use super::count_table::CountTable;
use crate::error::{MarkovError, Result};

/// Corpora shorter than this are counted on the calling thread.
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// One entry of a ranked candidate list.
///
/// # Fields
/// - `symbol`: the candidate next symbol
/// - `weight`: probability mass given to the symbol (0 when unresolved)
/// - `count`: raw count of the n-gram that resolved the symbol
/// - `context_len`: length of the context that resolved the symbol, `None`
///   when no context did
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
	pub symbol: char,
	pub weight: f64,
	pub count: u64,
	pub context_len: Option<usize>,
}

/// Character-level frequency model over a fixed alphabet.
///
/// The model counts every n-gram of the training corpus up to `order + 1`
/// symbols and answers "which symbol comes next after this context" with a
/// ranked list covering the whole alphabet.
///
/// # Responsibilities
/// - Build the count table from a corpus (optionally in parallel)
/// - Rank every alphabet symbol for a given context, backing off to
///   shorter contexts when enabled
/// - Sample the next symbol proportionally to its weight
///
/// # Invariants
/// - `table` is `None` until a training or a load succeeds
/// - Every stored n-gram is 1 to `order + 1` alphabet symbols long
/// - Without backoff, every stored n-gram is exactly `order + 1` symbols long
#[derive(Clone, Debug)]
pub struct FrequencyModel {
	config: ModelConfig,
	table: Option<CountTable>,
	/// First `order` symbols of the filtered training text.
	corpus_seed: String,
}

impl FrequencyModel {
	/// Creates an untrained model.
	pub fn new(config: ModelConfig) -> Self {
		Self { config, table: None, corpus_seed: String::new() }
	}

	/// Creates a model and trains it on `corpus`.
	pub fn trained(config: ModelConfig, corpus: &str) -> Result<Self> {
		let mut model = Self::new(config);
		model.train(corpus)?;
		Ok(model)
	}

	/// Rebuilds a trained model from its parts, used by persistence.
	pub(crate) fn from_parts(config: ModelConfig, table: CountTable, corpus_seed: String) -> Self {
		Self { config, table: Some(table), corpus_seed }
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	pub fn order(&self) -> usize {
		self.config.order
	}

	pub fn alphabet(&self) -> &Alphabet {
		&self.config.alphabet
	}

	pub fn backoff(&self) -> bool {
		self.config.backoff
	}

	pub fn is_trained(&self) -> bool {
		self.table.is_some()
	}

	/// Read-only access to the count table.
	///
	/// # Errors
	/// Returns `NotTrained` before a training or a load.
	pub fn counts(&self) -> Result<&CountTable> {
		self.table.as_ref().ok_or(MarkovError::NotTrained)
	}

	/// First `order` symbols of the filtered training text.
	pub fn corpus_seed(&self) -> &str {
		&self.corpus_seed
	}

	/// Trains the model on `corpus`, replacing any previous table.
	///
	/// The corpus is lower-cased and every symbol outside the alphabet is
	/// dropped. Each n-gram of length 1 to `order + 1` (or exactly
	/// `order + 1` without backoff) is counted once per position it starts
	/// at; n-grams running past the end of the text are ignored.
	///
	/// # Errors
	/// Returns `InsufficientData` if fewer than `order` symbols survive the
	/// filtering. The model is left untouched on error.
	pub fn train(&mut self, corpus: &str) -> Result<()> {
		let order = self.config.order;
		let text = self.config.alphabet.filter(corpus);
		if text.len() < order {
			return Err(MarkovError::InsufficientData { needed: order, found: text.len() });
		}

		let table = Self::count_ngrams(&text, order, self.config.backoff);
		info!(
			"trained order {} model (backoff: {}) on {} symbols, {} distinct n-grams",
			order,
			self.config.backoff,
			text.len(),
			table.len()
		);

		self.corpus_seed = text[..order].iter().collect();
		self.table = Some(table);
		Ok(())
	}

	/// Counts the n-grams of the whole text.
	///
	/// Large texts are split into one chunk of start positions per CPU;
	/// each worker reads past its chunk end as far as its n-grams need, so
	/// the merged table matches a single pass exactly.
	fn count_ngrams(text: &[char], order: usize, backoff: bool) -> CountTable {
		if text.len() < PARALLEL_THRESHOLD {
			return Self::count_range(text, 0..text.len(), order, backoff);
		}

		let chunks = num_cpus::get().max(1);
		let chunk_size = text.len().div_ceil(chunks);
		debug!("counting {} symbols in {} chunks of {}", text.len(), chunks, chunk_size);

		let (tx, rx) = mpsc::channel();
		thread::scope(|scope| {
			for start in (0..text.len()).step_by(chunk_size) {
				let tx = tx.clone();
				let end = (start + chunk_size).min(text.len());
				scope.spawn(move || {
					let partial = Self::count_range(text, start..end, order, backoff);
					// The receiver outlives every worker
					let _ = tx.send(partial);
				});
			}
			drop(tx);

			let mut table = CountTable::new();
			for partial in rx.iter() {
				table.merge(&partial);
			}
			table
		})
	}

	/// Counts the n-grams starting at each position of `positions`.
	fn count_range(text: &[char], positions: Range<usize>, order: usize, backoff: bool) -> CountTable {
		let mut table = CountTable::new();
		let min_len = if backoff { 1 } else { order + 1 };
		let mut key = String::with_capacity((order + 1) * 4);

		for i in positions {
			let max_len = (order + 1).min(text.len() - i);
			if max_len < min_len {
				continue;
			}
			key.clear();
			for len in 1..=max_len {
				key.push(text[i + len - 1]);
				if len >= min_len {
					table.add(&key);
				}
			}
		}
		table
	}

	/// Ranks every alphabet symbol as a continuation of `context`.
	///
	/// The context is case-folded and only its last `order` symbols are
	/// used. See [`FrequencyModel::rank`] for the ordering.
	///
	/// # Errors
	/// - `NotTrained` before a training or a load
	/// - `SymbolNotFound` if the context holds a symbol outside the alphabet
	/// - `NoTransition` if backoff is disabled and the context was never
	///   followed by any symbol
	pub fn ranked_candidates(&self, context: &str) -> Result<Vec<Candidate>> {
		let folded = self.config.alphabet.fold(context)?;
		self.ranked_candidates_for(&folded)
	}

	/// Same as [`FrequencyModel::ranked_candidates`] on already folded symbols.
	pub(crate) fn ranked_candidates_for(&self, context: &[char]) -> Result<Vec<Candidate>> {
		let table = self.counts()?;
		let start = context.len().saturating_sub(self.config.order);
		self.rank(table, &context[start..])
	}

	/// Builds the ranked candidate list.
	///
	/// Layers go from the full context down to the empty one (only the full
	/// context without backoff). A layer resolves the symbols that are still
	/// unresolved and have a non-zero count for that layer's context; they
	/// share the layer's mass proportionally to their counts. When a shorter
	/// layer can still resolve something, one pseudo-count of the layer is
	/// kept back as the mass handed down to the shorter layers.
	///
	/// Ordering: resolving context length (longest first, unresolved last),
	/// then count (highest first), then alphabet order. Weights are
	/// non-increasing along that order.
	fn rank(&self, table: &CountTable, context: &[char]) -> Result<Vec<Candidate>> {
		let alphabet = &self.config.alphabet;
		let size = alphabet.len();

		let lengths: Vec<usize> = if self.config.backoff {
			(0..=context.len()).rev().collect()
		} else {
			vec![context.len()]
		};

		let mut buffer = String::new();
		let mut layers: Vec<Vec<u64>> = Vec::with_capacity(lengths.len());
		for &len in &lengths {
			let suffix = &context[context.len() - len..];
			let mut counts = Vec::with_capacity(size);
			for symbol in alphabet.iter() {
				counts.push(table.get_transition(suffix, symbol, &mut buffer));
			}
			layers.push(counts);
		}

		if !self.config.backoff && layers[0].iter().all(|count| *count == 0) {
			return Err(MarkovError::NoTransition { context: context.iter().collect() });
		}

		let mut resolved: Vec<Option<(usize, u64)>> = vec![None; size];
		let mut weights = vec![0.0_f64; size];
		let mut mass = 1.0_f64;

		for (layer_index, (&len, counts)) in lengths.iter().zip(&layers).enumerate() {
			let newly: Vec<usize> = (0..size).filter(|&i| resolved[i].is_none() && counts[i] > 0).collect();
			if newly.is_empty() {
				continue;
			}

			let total: u64 = newly.iter().map(|&i| counts[i]).sum();
			for &i in &newly {
				resolved[i] = Some((len, counts[i]));
			}

			let escape = layers[layer_index + 1..]
				.iter()
				.any(|deeper| (0..size).any(|i| resolved[i].is_none() && deeper[i] > 0));
			let denominator = total as f64 + if escape { 1.0 } else { 0.0 };

			for &i in &newly {
				weights[i] = mass * counts[i] as f64 / denominator;
			}

			if !escape {
				break;
			}
			mass /= denominator;
		}

		let mut candidates: Vec<Candidate> = alphabet
			.iter()
			.enumerate()
			.map(|(i, symbol)| Candidate {
				symbol,
				weight: weights[i],
				count: resolved[i].map_or(0, |(_, count)| count),
				context_len: resolved[i].map(|(len, _)| len),
			})
			.collect();

		// Stable sort: equal keys keep the alphabet order
		candidates.sort_by_key(|candidate| (Reverse(candidate.context_len), Reverse(candidate.count)));
		Ok(candidates)
	}

	/// Draws the next symbol after `context`, using the thread-local RNG.
	pub fn sample_next(&self, context: &str) -> Result<char> {
		self.sample_next_with(context, &mut rand::rng())
	}

	/// Draws the next symbol after `context` with probability proportional
	/// to its weight.
	///
	/// # Errors
	/// Same as [`FrequencyModel::ranked_candidates`], plus `DeadEnd` when
	/// every candidate weighs zero.
	pub fn sample_next_with<R: Rng>(&self, context: &str, rng: &mut R) -> Result<char> {
		let folded = self.config.alphabet.fold(context)?;
		self.sample_folded(&folded, rng)
	}

	/// Same as [`FrequencyModel::sample_next_with`] on already folded symbols.
	pub(crate) fn sample_folded<R: Rng>(&self, context: &[char], rng: &mut R) -> Result<char> {
		let candidates = self.ranked_candidates_for(context)?;
		let dead_end = || MarkovError::DeadEnd { context: context.iter().collect() };

		let total: f64 = candidates.iter().map(|candidate| candidate.weight).sum();
		if total <= 0.0 {
			return Err(dead_end());
		}

		let mut r = rng.random::<f64>() * total;
		let mut fallback = None;
		for candidate in candidates.iter().filter(|candidate| candidate.weight > 0.0) {
			if r < candidate.weight {
				return Ok(candidate.symbol);
			}
			r -= candidate.weight;
			fallback = Some(candidate.symbol);
		}

		// Rounding may leave a sliver of mass past the last candidate
		fallback.ok_or_else(dead_end)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn model(corpus: &str, order: usize, alphabet: &str, backoff: bool) -> FrequencyModel {
		FrequencyModel::trained(ModelConfig::new(order, alphabet, backoff).unwrap(), corpus).unwrap()
	}

	fn symbols(candidates: &[Candidate]) -> String {
		candidates.iter().map(|candidate| candidate.symbol).collect()
	}

	#[test]
	fn counts_every_fitting_ngram() {
		let model = model("abababab", 1, "ab", true);
		let table = model.counts().unwrap();
		assert_eq!(table.get("a"), 4);
		assert_eq!(table.get("b"), 4);
		assert_eq!(table.get("ab"), 4);
		// The trailing 'b' has no follower
		assert_eq!(table.get("ba"), 3);
		assert_eq!(table.get("aa"), 0);
		assert_eq!(table.get("bb"), 0);
		assert_eq!(table.len(), 4);
	}

	#[test]
	fn without_backoff_only_full_ngrams_are_stored() {
		let model = model("abababab", 1, "ab", false);
		let table = model.counts().unwrap();
		assert_eq!(table.get("a"), 0);
		assert_eq!(table.get("ab"), 4);
		assert_eq!(table.len(), 2);
	}

	#[test]
	fn training_folds_case_and_drops_foreign_symbols() {
		let model = model("A-b, AB!", 0, "ab", true);
		let table = model.counts().unwrap();
		assert_eq!(table.get("a"), 2);
		assert_eq!(table.get("b"), 2);
	}

	#[test]
	fn ranks_follow_the_context() {
		let model = model("abababab", 1, "ab", true);

		let after_a = model.ranked_candidates("a").unwrap();
		assert_eq!(symbols(&after_a), "ba");
		assert_eq!(after_a[0].count, 4);
		assert_eq!(after_a[0].context_len, Some(1));
		assert_eq!(after_a[1].context_len, Some(0));
		assert!(after_a[0].weight > after_a[1].weight);

		// Unigram tie: alphabet order wins
		let empty = model.ranked_candidates("").unwrap();
		assert_eq!(symbols(&empty), "ab");
		assert_eq!(empty[0].weight, empty[1].weight);
	}

	#[test]
	fn longer_context_wins_a_weight_tie() {
		let model = model("ab", 1, "ab", true);
		let after_a = model.ranked_candidates("a").unwrap();
		assert_eq!(symbols(&after_a), "ba");
		assert_eq!(after_a[0].weight, 0.5);
		assert_eq!(after_a[1].weight, 0.5);
		assert_eq!(after_a[0].context_len, Some(1));
		assert_eq!(after_a[1].context_len, Some(0));
	}

	#[test]
	fn weights_sum_to_one_once_resolved() {
		let model = model("the cat sat on the mat", 3, Alphabet::BASIC, true);
		for context in ["", "t", "th", "the", "xyz", "at "] {
			let candidates = model.ranked_candidates(context).unwrap();
			assert_eq!(candidates.len(), Alphabet::BASIC.chars().count());
			let total: f64 = candidates.iter().filter(|c| c.context_len.is_some()).map(|c| c.weight).sum();
			assert!((total - 1.0).abs() < 1e-9, "context {context:?} sums to {total}");
			assert!(candidates.windows(2).all(|pair| pair[0].weight + 1e-12 >= pair[1].weight));
		}
	}

	#[test]
	fn unseen_symbols_rank_last_in_alphabet_order() {
		let model = model("aaaa", 0, "cba", true);
		let candidates = model.ranked_candidates("").unwrap();
		assert_eq!(symbols(&candidates), "acb");
		assert_eq!(candidates[1].weight, 0.0);
		assert_eq!(candidates[1].context_len, None);
	}

	#[test]
	fn long_contexts_are_truncated() {
		let model = model("abcabcabc", 2, "abc", true);
		assert_eq!(model.ranked_candidates("ccab").unwrap(), model.ranked_candidates("ab").unwrap());
	}

	#[test]
	fn order_zero_ignores_context() {
		let model = model("aabbb", 0, "ab", true);
		let candidates = model.ranked_candidates("aaaa").unwrap();
		assert_eq!(symbols(&candidates), "ba");
		assert_eq!(candidates[0].count, 3);
	}

	#[test]
	fn missing_transition_without_backoff() {
		let model = model("abababab", 1, "ab", false);
		assert!(matches!(model.ranked_candidates("").unwrap_err(), MarkovError::NoTransition { .. }));
		assert_eq!(symbols(&model.ranked_candidates("a").unwrap()), "ba");
	}

	#[test]
	fn queries_require_training() {
		let model = FrequencyModel::new(ModelConfig::new(1, "ab", true).unwrap());
		assert!(matches!(model.ranked_candidates(""), Err(MarkovError::NotTrained)));
		assert!(matches!(model.sample_next(""), Err(MarkovError::NotTrained)));
	}

	#[test]
	fn foreign_context_symbol_is_rejected() {
		let model = model("abab", 1, "ab", true);
		assert!(matches!(model.ranked_candidates("z"), Err(MarkovError::SymbolNotFound { symbol: 'z' })));
	}

	#[test]
	fn failed_training_keeps_previous_state() {
		let mut model = FrequencyModel::new(ModelConfig::new(3, "ab", true).unwrap());
		let err = model.train("ab").unwrap_err();
		assert!(matches!(err, MarkovError::InsufficientData { needed: 3, found: 2 }));
		assert!(!model.is_trained());

		model.train("abab").unwrap();
		let before = model.counts().unwrap().clone();
		assert!(model.train("a").is_err());
		assert_eq!(model.counts().unwrap(), &before);
		assert_eq!(model.corpus_seed(), "aba");
	}

	#[test]
	fn training_is_deterministic() {
		let corpus = "she sells sea shells by the sea shore.";
		let first = model(corpus, 2, Alphabet::BASIC, true);
		let second = model(corpus, 2, Alphabet::BASIC, true);
		for context in ["", "s", "se", "ea", "q"] {
			assert_eq!(first.ranked_candidates(context).unwrap(), second.ranked_candidates(context).unwrap());
		}
	}

	#[test]
	fn parallel_counting_matches_single_pass() {
		let text: Vec<char> = "the quick brown fox jumps over the lazy dog. "
			.chars()
			.cycle()
			.take(PARALLEL_THRESHOLD + 1234)
			.collect();
		for backoff in [true, false] {
			let parallel = FrequencyModel::count_ngrams(&text, 3, backoff);
			let single = FrequencyModel::count_range(&text, 0..text.len(), 3, backoff);
			assert_eq!(parallel, single);
		}
	}

	#[test]
	fn sampling_follows_the_only_transition() {
		let model = model("abababab", 1, "ab", false);
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..20 {
			assert_eq!(model.sample_next_with("a", &mut rng).unwrap(), 'b');
			assert_eq!(model.sample_next_with("b", &mut rng).unwrap(), 'a');
		}
	}

	#[test]
	fn empty_corpus_is_a_dead_end() {
		let model = model("", 0, "ab", true);
		assert!(matches!(model.sample_next(""), Err(MarkovError::DeadEnd { .. })));
	}
}
