use std::collections::{BTreeMap, HashMap};

use super::alphabet::Alphabet;

/// Sparse table of n-gram occurrence counts.
///
/// Keys are full n-grams (context followed by the predicted symbol), so a
/// single flat map holds every order at once. An n-gram that was never
/// observed is simply absent and reads as zero.
///
/// ## Responsibilities:
/// - Accumulate occurrences during training
/// - Answer count lookups for a context and a symbol
/// - Merge with another table (parallel training support)
/// - Summarise counts for statistics consumers
///
/// ## Invariants
/// - Every stored count is strictly positive
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountTable {
	/// Occurrences indexed by n-gram.
	/// Example: { "a" => 4, "ab" => 4, "ba" => 3 }
	counts: HashMap<String, u64>,
}

impl CountTable {
	/// Creates a new empty table.
	pub fn new() -> Self {
		Self { counts: HashMap::new() }
	}

	/// Records one occurrence of `ngram`.
	///
	/// The key is only allocated the first time an n-gram is seen.
	pub fn add(&mut self, ngram: &str) {
		self.add_count(ngram, 1);
	}

	/// Adds `count` occurrences of `ngram`. A zero count is ignored.
	pub(crate) fn add_count(&mut self, ngram: &str, count: u64) {
		if count == 0 {
			return;
		}
		match self.counts.get_mut(ngram) {
			Some(existing) => *existing += count,
			None => {
				self.counts.insert(ngram.to_owned(), count);
			}
		}
	}

	/// Occurrences of `ngram`, zero when it was never observed.
	pub fn get(&self, ngram: &str) -> u64 {
		self.counts.get(ngram).copied().unwrap_or(0)
	}

	/// Occurrences of `context` followed by `symbol`.
	///
	/// `buffer` is reused between calls to avoid one allocation per lookup.
	pub(crate) fn get_transition(&self, context: &[char], symbol: char, buffer: &mut String) -> u64 {
		buffer.clear();
		buffer.extend(context.iter());
		buffer.push(symbol);
		self.get(buffer)
	}

	/// Occurrences of every alphabet symbol after `context`, in alphabet order.
	pub fn continuations(&self, context: &[char], alphabet: &Alphabet) -> Vec<u64> {
		let mut buffer = String::new();
		alphabet.iter().map(|symbol| self.get_transition(context, symbol, &mut buffer)).collect()
	}

	/// Occurrences of every alphabet symbol as the last symbol of an
	/// n-gram of `length` symbols, in alphabet order.
	pub fn last_symbol_totals(&self, length: usize, alphabet: &Alphabet) -> Vec<u64> {
		let mut totals = vec![0; alphabet.len()];
		for (ngram, count) in self.iter() {
			if ngram.chars().count() != length {
				continue;
			}
			if let Some(index) = ngram.chars().last().and_then(|symbol| alphabet.index_of(symbol)) {
				totals[index] += count;
			}
		}
		totals
	}

	/// Number of distinct n-grams stored.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Iterates over `(ngram, count)` pairs in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
		self.counts.iter().map(|(key, count)| (key.as_str(), *count))
	}

	/// Returns every entry sorted by key, for stable output.
	pub fn sorted_entries(&self) -> Vec<(&str, u64)> {
		let mut entries: Vec<(&str, u64)> = self.iter().collect();
		entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
		entries
	}

	/// Merges another table into this one, summing counts.
	///
	/// Intended for parallel training, where each worker fills a partial
	/// table over its own slice of the corpus.
	pub fn merge(&mut self, other: &Self) {
		for (ngram, count) in &other.counts {
			self.add_count(ngram, *count);
		}
	}

	/// Number of stored n-grams per count value.
	///
	/// Example: `{1: 120, 2: 37, ...}` means 120 n-grams were seen exactly once.
	pub fn histogram(&self) -> BTreeMap<u64, usize> {
		let mut histogram = BTreeMap::new();
		for count in self.counts.values() {
			*histogram.entry(*count).or_insert(0) += 1;
		}
		histogram
	}

	/// Largest stored count, `None` for an empty table.
	pub fn max_count(&self) -> Option<u64> {
		self.counts.values().max().copied()
	}
}
