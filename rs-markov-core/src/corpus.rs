//! Training corpus loading and cleanup.
//!
//! A corpus is read fully into memory. Case folding and alphabet filtering
//! happen later, in `FrequencyModel::train`; this module only deals with
//! where the text comes from and with optional cleanup of book files.

use std::path::PathBuf;

use log::debug;

use crate::error::Result;
use crate::io::read_text;

/// Marker opening and closing the body of a Project Gutenberg book.
const GUTENBERG_MARKER: &str = "***";

/// Source of training text.
///
/// # Variants
/// - `Text`: an in-memory string
/// - `File`: a single text file
/// - `Files`: several text files, concatenated with a space in between
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Corpus {
	Text(String),
	File(PathBuf),
	Files(Vec<PathBuf>),
}

/// Optional cleanup applied to every part of a corpus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CorpusOptions {
	/// Keep only the lines between the first two `***` marker lines.
	pub strip_gutenberg: bool,
	/// Replace accented letters and typographic quotes by ASCII.
	pub replace_accents: bool,
}

impl Corpus {
	/// Reads and cleans the corpus.
	///
	/// # Errors
	/// Returns `Io` if a file cannot be read.
	pub fn read(&self, options: &CorpusOptions) -> Result<String> {
		let text = match self {
			Corpus::Text(text) => clean(text, options),
			Corpus::File(path) => clean(&read_text(path)?, options),
			Corpus::Files(paths) => {
				let mut parts = Vec::with_capacity(paths.len());
				for path in paths {
					parts.push(clean(&read_text(path)?, options));
				}
				parts.join(" ")
			}
		};
		debug!("read corpus of {} bytes", text.len());
		Ok(text)
	}
}

fn clean(text: &str, options: &CorpusOptions) -> String {
	let body = if options.strip_gutenberg { strip_gutenberg(text) } else { text.to_owned() };
	if options.replace_accents { replace_accents(&body) } else { body }
}

/// Keeps the lines between the first two lines starting with `***`.
///
/// Text without an opening marker is returned unchanged; without a closing
/// marker, everything after the opening one is kept.
pub fn strip_gutenberg(text: &str) -> String {
	let lines: Vec<&str> = text.lines().collect();
	let Some(start) = lines.iter().position(|line| line.starts_with(GUTENBERG_MARKER)) else {
		return text.to_owned();
	};

	let body = &lines[start + 1..];
	let end = body
		.iter()
		.position(|line| line.starts_with(GUTENBERG_MARKER))
		.unwrap_or(body.len());
	body[..end].join("\n")
}

/// Replaces accented letters and typographic quotes by ASCII equivalents.
pub fn replace_accents(text: &str) -> String {
	let mut output = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'é' | 'è' | 'ê' | 'ë' => output.push('e'),
			'à' | 'â' => output.push('a'),
			'ô' => output.push('o'),
			'ç' => output.push('c'),
			'ü' => output.push('u'),
			'ï' => output.push('i'),
			'æ' => output.push_str("ae"),
			'“' | '”' => output.push('"'),
			'‘' | '’' => output.push('\''),
			_ => output.push(c),
		}
	}
	output
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	#[test]
	fn text_is_passed_through() {
		let corpus = Corpus::Text("Hello".to_owned());
		assert_eq!(corpus.read(&CorpusOptions::default()).unwrap(), "Hello");
	}

	#[test]
	fn files_are_joined_with_a_space() {
		let dir = tempfile::tempdir().unwrap();
		let first = dir.path().join("a.txt");
		let second = dir.path().join("b.txt");
		fs::write(&first, "one").unwrap();
		fs::write(&second, "two").unwrap();

		let corpus = Corpus::Files(vec![first.clone(), second]);
		assert_eq!(corpus.read(&CorpusOptions::default()).unwrap(), "one two");
		assert_eq!(Corpus::File(first).read(&CorpusOptions::default()).unwrap(), "one");
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let corpus = Corpus::File(PathBuf::from("/definitely/not/here.txt"));
		assert!(matches!(corpus.read(&CorpusOptions::default()), Err(crate::error::MarkovError::Io(_))));
	}

	#[test]
	fn gutenberg_body_is_kept() {
		let text = "header\n*** START OF BOOK ***\nline one\nline two\n*** END OF BOOK ***\nlicense";
		assert_eq!(strip_gutenberg(text), "line one\nline two");
		assert_eq!(strip_gutenberg("no markers"), "no markers");
		assert_eq!(strip_gutenberg("*** START\nrest"), "rest");
	}

	#[test]
	fn accents_are_replaced() {
		assert_eq!(replace_accents("café “æther” à l’été"), "cafe \"aether\" a l'ete");
	}

	#[test]
	fn options_apply_to_every_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("book.txt");
		fs::write(&path, "junk\n*** START\nélan\n*** END\njunk").unwrap();
		let options = CorpusOptions { strip_gutenberg: true, replace_accents: true };
		assert_eq!(Corpus::Files(vec![path.clone(), path]).read(&options).unwrap(), "elan elan");
	}
}
