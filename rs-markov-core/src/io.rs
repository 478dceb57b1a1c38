use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Reads a whole text file into memory.
///
/// The file handle is closed before returning, on success and on error.
pub fn read_text<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}

/// Path of the model cached next to a corpus file.
///
/// `books/alice.txt` with `"bin"` gives `books/alice.bin`; a bare file
/// name stays in the current folder.
pub fn build_output_path<P: AsRef<Path>>(corpus_path: P, extension: &str) -> io::Result<PathBuf> {
	let corpus_path = corpus_path.as_ref();
	let stem = corpus_path
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no file name", corpus_path.display())))?;

	let folder = corpus_path.parent().unwrap_or_else(|| Path::new("."));
	Ok(folder.join(stem).with_extension(extension))
}

/// Model name of a saved model file: `data/alice.bin` is served as `alice`.
pub fn get_filename<P: AsRef<Path>>(model_path: P) -> io::Result<String> {
	let model_path = model_path.as_ref();
	model_path
		.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no file name", model_path.display())))
}

/// Folder the server looks for `.bin` models in.
///
/// The current folder is made absolute so start-up logs show where models
/// are read from; anything else is kept as given.
pub fn normalize_folder(folder: &str) -> PathBuf {
	match folder {
		"." | "./" => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
		_ => PathBuf::from(folder),
	}
}

/// Lists all files with a given extension in a directory, sorted by name.
///
/// Returns file names only (no paths).
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		let path = build_output_path("data/input.txt", "bin").unwrap();
		assert_eq!(path, PathBuf::from("data/input.bin"));
		let path = build_output_path("input", "bin").unwrap();
		assert_eq!(path, PathBuf::from("input.bin"));
	}

	#[test]
	fn output_path_needs_a_file_name() {
		assert!(build_output_path("..", "bin").is_err());
	}

	#[test]
	fn current_folder_is_made_absolute() {
		assert!(normalize_folder(".").is_absolute());
		assert_eq!(normalize_folder("models"), PathBuf::from("models"));
	}

	#[test]
	fn filename_drops_folder_and_extension() {
		assert_eq!(get_filename("./data/model.bin").unwrap(), "model");
		assert_eq!(get_filename("model.bin").unwrap(), "model");
	}

	#[test]
	fn lists_matching_files_only() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.bin"), b"").unwrap();
		fs::write(dir.path().join("a.bin"), b"").unwrap();
		fs::write(dir.path().join("c.txt"), b"").unwrap();
		assert_eq!(list_files(dir.path(), "bin").unwrap(), vec!["a.bin", "b.bin"]);
	}

	#[test]
	fn reads_whole_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "line one\nline two\n").unwrap();
		assert_eq!(read_text(&path).unwrap(), "line one\nline two\n");
	}
}
