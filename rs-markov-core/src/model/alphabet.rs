use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};

/// Ordered, finite set of symbols a model works with.
///
/// The iteration order is fixed at construction time and is the tie-break
/// order used when ranking candidates, so two alphabets built from the same
/// string always rank identically.
///
/// # Invariants
/// - At least one symbol
/// - No duplicated symbol
/// - Every symbol is already lower-cased
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet {
	symbols: Vec<char>,
	#[serde(skip)]
	index: HashMap<char, usize>,
}

impl Alphabet {
	/// Lower-case letters, period, space and newline.
	pub const BASIC: &'static str = "abcdefghijklmnopqrstuvwxyz. \n";

	/// Lower-case letters, digits and common punctuation.
	pub const EXTENDED: &'static str = "abcdefghijklmnopqrstuvwxyz0123456789 .,?\"\n";

	/// Builds an alphabet from the characters of `symbols`, in order.
	///
	/// Characters are lower-cased first; a character whose lower-case form is
	/// more than one character long is rejected.
	///
	/// # Errors
	/// Returns `InvalidAlphabet` if the alphabet is empty or holds duplicates.
	pub fn new(symbols: &str) -> Result<Self> {
		let mut ordered = Vec::with_capacity(symbols.len());
		let mut index = HashMap::new();

		for c in symbols.chars() {
			let mut lower = c.to_lowercase();
			let folded = match (lower.next(), lower.next()) {
				(Some(folded), None) => folded,
				_ => return Err(MarkovError::InvalidAlphabet(format!("symbol {c:?} has no single-character lower case"))),
			};
			if index.insert(folded, ordered.len()).is_some() {
				return Err(MarkovError::InvalidAlphabet(format!("duplicated symbol {folded:?}")));
			}
			ordered.push(folded);
		}

		if ordered.is_empty() {
			return Err(MarkovError::InvalidAlphabet("alphabet is empty".to_owned()));
		}

		Ok(Self { symbols: ordered, index })
	}

	/// Number of symbols.
	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	/// Always false, kept for API symmetry with collections.
	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	/// Position of `symbol` in the alphabet order.
	pub fn index_of(&self, symbol: char) -> Option<usize> {
		self.index.get(&symbol).copied()
	}

	pub fn contains(&self, symbol: char) -> bool {
		self.index.contains_key(&symbol)
	}

	/// Symbol at `index` in the alphabet order.
	pub fn symbol(&self, index: usize) -> Option<char> {
		self.symbols.get(index).copied()
	}

	/// Iterates over the symbols in alphabet order.
	pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
		self.symbols.iter().copied()
	}

	/// Case-folds `text` and drops every symbol outside the alphabet.
	pub fn filter(&self, text: &str) -> Vec<char> {
		text.chars()
			.flat_map(|c| c.to_lowercase())
			.filter(|c| self.contains(*c))
			.collect()
	}

	/// Case-folds `text` and checks that every symbol belongs to the alphabet.
	///
	/// # Errors
	/// Returns `SymbolNotFound` on the first foreign symbol.
	pub fn fold(&self, text: &str) -> Result<Vec<char>> {
		text.chars()
			.flat_map(|c| c.to_lowercase())
			.map(|c| if self.contains(c) { Ok(c) } else { Err(MarkovError::SymbolNotFound { symbol: c }) })
			.collect()
	}

	/// The alphabet as a string, in order.
	pub fn as_string(&self) -> String {
		self.symbols.iter().collect()
	}
}

impl Default for Alphabet {
	fn default() -> Self {
		// BASIC is a valid alphabet
		Self::new(Self::BASIC).expect("built-in alphabet is valid")
	}
}

impl TryFrom<String> for Alphabet {
	type Error = MarkovError;

	fn try_from(symbols: String) -> Result<Self> {
		Self::new(&symbols)
	}
}

impl From<Alphabet> for String {
	fn from(alphabet: Alphabet) -> Self {
		alphabet.as_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_construction_order() {
		let alphabet = Alphabet::new("ba").unwrap();
		assert_eq!(alphabet.index_of('b'), Some(0));
		assert_eq!(alphabet.index_of('a'), Some(1));
		assert_eq!(alphabet.symbol(1), Some('a'));
		assert_eq!(alphabet.iter().collect::<String>(), "ba");
	}

	#[test]
	fn rejects_empty_and_duplicates() {
		assert!(matches!(Alphabet::new(""), Err(MarkovError::InvalidAlphabet(_))));
		assert!(matches!(Alphabet::new("aba"), Err(MarkovError::InvalidAlphabet(_))));
		// 'A' folds onto 'a'
		assert!(matches!(Alphabet::new("aA"), Err(MarkovError::InvalidAlphabet(_))));
	}

	#[test]
	fn filter_folds_and_drops() {
		let alphabet = Alphabet::new("ab ").unwrap();
		assert_eq!(alphabet.filter("A-b, C a"), vec!['a', 'b', ' ', ' ', 'a']);
	}

	#[test]
	fn fold_reports_foreign_symbols() {
		let alphabet = Alphabet::new("ab").unwrap();
		assert_eq!(alphabet.fold("AB").unwrap(), vec!['a', 'b']);
		assert!(matches!(alphabet.fold("abc"), Err(MarkovError::SymbolNotFound { symbol: 'c' })));
	}

	#[test]
	fn builtins_are_valid() {
		assert_eq!(Alphabet::default().len(), Alphabet::BASIC.chars().count());
		assert!(Alphabet::new(Alphabet::EXTENDED).is_ok());
	}
}
