//! Binary persistence of trained models.
//!
//! Layout: `b"RSMK"`, one version byte, then a postcard body (varint
//! integers, length-prefixed strings) holding the order, the backoff flag,
//! the alphabet, the corpus seed and the count table as key-sorted pairs.
//! Sorting makes the bytes a pure function of the model.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::corpus::{Corpus, CorpusOptions};
use crate::error::{MarkovError, Result};
use crate::io::build_output_path;
use crate::model::{Alphabet, CountTable, FrequencyModel, ModelConfig};

const MAGIC: &[u8; 4] = b"RSMK";
const VERSION: u8 = 1;

#[derive(Serialize, Debug)]
struct SnapshotRef<'a> {
	order: usize,
	backoff: bool,
	alphabet: String,
	corpus_seed: &'a str,
	counts: Vec<(&'a str, u64)>,
}

#[derive(Deserialize, Debug)]
struct Snapshot {
	order: usize,
	backoff: bool,
	alphabet: String,
	corpus_seed: String,
	counts: Vec<(String, u64)>,
}

/// Serializes a trained model into `writer`.
///
/// # Errors
/// - `NotTrained` if the model has no table
/// - `Io` if writing fails
pub fn save<W: Write>(model: &FrequencyModel, mut writer: W) -> Result<()> {
	let table = model.counts()?;
	let snapshot = SnapshotRef {
		order: model.order(),
		backoff: model.backoff(),
		alphabet: model.alphabet().as_string(),
		corpus_seed: model.corpus_seed(),
		counts: table.sorted_entries(),
	};

	writer.write_all(MAGIC)?;
	writer.write_all(&[VERSION])?;
	writer.write_all(&postcard::to_stdvec(&snapshot)?)?;
	writer.flush()?;
	Ok(())
}

/// Serializes a trained model into a byte vector.
pub fn to_bytes(model: &FrequencyModel) -> Result<Vec<u8>> {
	let mut bytes = Vec::new();
	save(model, &mut bytes)?;
	Ok(bytes)
}

/// Reads a model written by [`save`].
///
/// # Errors
/// - `CorruptData` on a wrong header, a malformed or truncated body,
///   trailing bytes, or a table the model could not have produced
/// - `Io` if reading fails
pub fn load<R: Read>(mut reader: R) -> Result<FrequencyModel> {
	let mut bytes = Vec::new();
	reader.read_to_end(&mut bytes)?;
	from_bytes(&bytes)
}

/// Reads a model from bytes produced by [`to_bytes`].
pub fn from_bytes(bytes: &[u8]) -> Result<FrequencyModel> {
	let body = bytes
		.strip_prefix(MAGIC.as_slice())
		.ok_or_else(|| MarkovError::corrupt("not a model file"))?;
	let (&version, body) = body.split_first().ok_or_else(|| MarkovError::corrupt("missing version"))?;
	if version != VERSION {
		return Err(MarkovError::corrupt(format!("unsupported model version {version}")));
	}

	let (snapshot, rest): (Snapshot, &[u8]) = postcard::take_from_bytes(body)?;
	if !rest.is_empty() {
		return Err(MarkovError::corrupt(format!("{} trailing bytes", rest.len())));
	}
	validate(snapshot)
}

/// Checks every invariant of the model before rebuilding it.
fn validate(snapshot: Snapshot) -> Result<FrequencyModel> {
	let alphabet = Alphabet::new(&snapshot.alphabet).map_err(|err| MarkovError::corrupt(err.to_string()))?;
	let order = snapshot.order;

	let seed_len = snapshot.corpus_seed.chars().count();
	if seed_len != order || !snapshot.corpus_seed.chars().all(|c| alphabet.contains(c)) {
		return Err(MarkovError::corrupt(format!("invalid corpus seed {:?}", snapshot.corpus_seed)));
	}

	let max_len = order.checked_add(1).ok_or_else(|| MarkovError::corrupt(format!("order {order} out of range")))?;
	let min_len = if snapshot.backoff { 1 } else { max_len };

	let mut seen = HashSet::with_capacity(snapshot.counts.len());
	let mut table = CountTable::new();
	for (key, count) in &snapshot.counts {
		let len = key.chars().count();
		if len < min_len || len > max_len {
			return Err(MarkovError::corrupt(format!("n-gram {key:?} has an invalid length")));
		}
		if let Some(symbol) = key.chars().find(|c| !alphabet.contains(*c)) {
			return Err(MarkovError::corrupt(format!("n-gram {key:?} holds foreign symbol {symbol:?}")));
		}
		if *count == 0 {
			return Err(MarkovError::corrupt(format!("n-gram {key:?} has a zero count")));
		}
		if !seen.insert(key.as_str()) {
			return Err(MarkovError::corrupt(format!("n-gram {key:?} is duplicated")));
		}
		table.add_count(key, *count);
	}

	let config = ModelConfig { order, alphabet, backoff: snapshot.backoff };
	Ok(FrequencyModel::from_parts(config, table, snapshot.corpus_seed))
}

/// Saves a trained model to `path`, creating or truncating the file.
pub fn save_to_path<P: AsRef<Path>>(model: &FrequencyModel, path: P) -> Result<()> {
	let file = File::create(&path)?;
	save(model, BufWriter::new(file))?;
	info!("saved model to {}", path.as_ref().display());
	Ok(())
}

/// Loads a model from `path`.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<FrequencyModel> {
	let file = File::open(&path)?;
	let model = load(BufReader::new(file))?;
	info!("loaded order {} model from {}", model.order(), path.as_ref().display());
	Ok(model)
}

/// Loads the cached model next to a corpus file, or trains and caches it.
///
/// - The cache lives at the corpus path with a `bin` extension.
/// - A cache whose configuration differs from `config`, or that cannot be
///   read, is rebuilt from the corpus.
pub fn load_or_train<P: AsRef<Path>>(corpus_path: P, config: &ModelConfig, options: &CorpusOptions) -> Result<FrequencyModel> {
	let cache_path = build_output_path(&corpus_path, "bin")?;
	if cache_path.exists() {
		match load_from_path(&cache_path) {
			Ok(model) if model.config() == config => return Ok(model),
			Ok(_) => warn!("cached model {} has another configuration, retraining", cache_path.display()),
			Err(err) => warn!("cannot read cached model {}: {err}, retraining", cache_path.display()),
		}
	}

	let text = Corpus::File(corpus_path.as_ref().to_path_buf()).read(options)?;
	let model = FrequencyModel::trained(config.clone(), &text)?;
	save_to_path(&model, &cache_path)?;
	Ok(model)
}
