//! Chi-square tests of symbol dependence over a trained model.
//!
//! The continuation counts of a context are compared with an expected
//! distribution: uniform, the overall symbol frequencies (independence from
//! the context) or any caller-supplied one. Cells observed fewer than
//! `MIN_CELL_COUNT` times are left out of a test.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::{MarkovError, Result};
use crate::model::FrequencyModel;

/// Smallest observed count a cell needs to take part in a test.
pub const MIN_CELL_COUNT: u64 = 5;

/// Outcome of a chi-square goodness-of-fit test.
///
/// # Fields
/// - `statistic`: sum of `(observed - expected)² / expected` over the kept cells
/// - `degrees_of_freedom`: kept cells minus one
/// - `p_value`: probability of a statistic at least this large if the
///   expected distribution holds
/// - `observations`: total count of the kept cells
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChiSquareTest {
	pub statistic: f64,
	pub degrees_of_freedom: usize,
	pub p_value: f64,
	pub observations: u64,
}

impl ChiSquareTest {
	/// Whether the expected distribution is rejected at `significance`.
	pub fn rejects(&self, significance: f64) -> bool {
		self.p_value < significance
	}
}

/// Tests `observed` counts against an `expected` distribution.
///
/// `expected` holds relative weights; only the cells kept by the
/// `MIN_CELL_COUNT` filter are rescaled to the observed total.
///
/// # Errors
/// - `InvalidInput` on a length mismatch, a negative or non-finite weight,
///   or a kept cell with no expected weight
/// - `InsufficientData` when fewer than two cells are kept
pub fn goodness_of_fit(observed: &[u64], expected: &[f64]) -> Result<ChiSquareTest> {
	if observed.len() != expected.len() {
		return Err(MarkovError::InvalidInput(format!(
			"{} observed cells against {} expected weights",
			observed.len(),
			expected.len()
		)));
	}
	if expected.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
		return Err(MarkovError::InvalidInput("expected weights must be finite and non-negative".to_owned()));
	}

	let kept: Vec<(u64, f64)> = observed
		.iter()
		.zip(expected)
		.filter(|(count, _)| **count >= MIN_CELL_COUNT)
		.map(|(count, weight)| (*count, *weight))
		.collect();
	if kept.len() < 2 {
		return Err(MarkovError::InsufficientData { needed: 2, found: kept.len() });
	}

	let observations: u64 = kept.iter().map(|(count, _)| count).sum();
	let total_weight: f64 = kept.iter().map(|(_, weight)| weight).sum();

	let mut statistic = 0.0;
	for &(count, weight) in &kept {
		let expected_count = observations as f64 * weight / total_weight;
		if expected_count <= 0.0 {
			return Err(MarkovError::InvalidInput("an observed symbol has no expected weight".to_owned()));
		}
		let deviation = count as f64 - expected_count;
		statistic += deviation * deviation / expected_count;
	}

	let degrees_of_freedom = kept.len() - 1;
	let distribution =
		ChiSquared::new(degrees_of_freedom as f64).map_err(|err| MarkovError::InvalidInput(err.to_string()))?;

	Ok(ChiSquareTest { statistic, degrees_of_freedom, p_value: distribution.sf(statistic), observations })
}

/// Counts of every alphabet symbol after `context`, in alphabet order.
///
/// # Errors
/// - `NotTrained` before a training or a load
/// - `SymbolNotFound` if the context holds a foreign symbol
/// - `InvalidInput` if the context is longer than the model order
pub fn continuation_counts(model: &FrequencyModel, context: &str) -> Result<Vec<u64>> {
	let table = model.counts()?;
	let folded = model.alphabet().fold(context)?;
	if folded.len() > model.order() {
		return Err(MarkovError::InvalidInput(format!(
			"context of {} symbols exceeds order {}",
			folded.len(),
			model.order()
		)));
	}
	Ok(table.continuations(&folded, model.alphabet()))
}

/// Overall occurrences of every alphabet symbol, in alphabet order.
///
/// Without backoff only full n-grams are stored, so the totals are taken
/// over their last symbols.
pub fn symbol_frequencies(model: &FrequencyModel) -> Result<Vec<u64>> {
	let table = model.counts()?;
	if model.backoff() {
		Ok(table.continuations(&[], model.alphabet()))
	} else {
		Ok(table.last_symbol_totals(model.order() + 1, model.alphabet()))
	}
}

/// Tests whether the symbols following `context` are uniformly distributed.
pub fn is_uniform(model: &FrequencyModel, context: &str) -> Result<ChiSquareTest> {
	let observed = continuation_counts(model, context)?;
	let expected = vec![1.0; observed.len()];
	goodness_of_fit(&observed, &expected)
}

/// Tests the symbols following `context` against `distribution`, given as
/// one weight per alphabet symbol in alphabet order.
pub fn is_distributed(model: &FrequencyModel, context: &str, distribution: &[f64]) -> Result<ChiSquareTest> {
	let observed = continuation_counts(model, context)?;
	goodness_of_fit(&observed, distribution)
}

/// Tests whether the symbol following `context` is independent of it, that
/// is distributed like the symbols of the whole corpus.
///
/// # Errors
/// `InvalidInput` for the empty context, which would be tested against itself.
pub fn is_independent(model: &FrequencyModel, context: &str) -> Result<ChiSquareTest> {
	if context.is_empty() {
		return Err(MarkovError::InvalidInput("the empty context cannot be tested against itself".to_owned()));
	}
	let expected: Vec<f64> = symbol_frequencies(model)?.into_iter().map(|count| count as f64).collect();
	is_distributed(model, context, &expected)
}

/// Runs [`is_independent`] on every context stored in the model.
///
/// Contexts without two well-populated continuations are skipped. The
/// result is sorted by context.
pub fn all_independent(model: &FrequencyModel) -> Result<Vec<(String, ChiSquareTest)>> {
	let contexts: BTreeSet<String> = model
		.counts()?
		.iter()
		.filter_map(|(ngram, _)| {
			let mut symbols = ngram.chars();
			symbols.next_back();
			let context = symbols.as_str();
			(!context.is_empty()).then(|| context.to_owned())
		})
		.collect();

	let mut results = Vec::with_capacity(contexts.len());
	for context in contexts {
		match is_independent(model, &context) {
			Ok(test) => results.push((context, test)),
			Err(MarkovError::InsufficientData { found, .. }) => {
				debug!("skipping context {context:?}: {found} usable cells");
			}
			Err(err) => return Err(err),
		}
	}
	Ok(results)
}
