use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn no_file_name(path: &Path) -> io::Error {
	io::Error::new(io::ErrorKind::InvalidInput, format!("No file name in {}", path.display()))
}

/// Reads a whole text file.
///
/// Line breaks are kept: the tokenizer turns them into `NewLine` tokens.
pub fn read_text<P: AsRef<Path>>(filename: P) -> io::Result<String> {
	fs::read_to_string(filename)
}

/// Path of a file derived from `path`: same directory, with `suffix`
/// replacing the last extension only.
///
/// `data/english.dat` + `"3-nospace.bin"` → `data/english.3-nospace.bin`,
/// `data/en.v2.dat` → `data/en.v2.3-nospace.bin`.
pub fn derived_path<P: AsRef<Path>>(path: P, suffix: &str) -> io::Result<PathBuf> {
	let path = path.as_ref();
	let mut name = path.file_stem().ok_or_else(|| no_file_name(path))?.to_os_string();
	name.push(".");
	name.push(suffix);
	Ok(path.with_file_name(name))
}

/// File name without its last extension: `./data/english.dat` → `english`.
pub fn stem_of<P: AsRef<Path>>(path: P) -> io::Result<String> {
	let path = path.as_ref();
	path.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.ok_or_else(|| no_file_name(path))
}

/// Lists the files of `dir` with the given extension, sorted by name.
///
/// Returns file names only (no paths).
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().into_owned());
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
	fn derived_path_replaces_last_extension() {
		assert_eq!(
			derived_path("data/english.dat", "3-nospace.bin").unwrap(),
			PathBuf::from("data/english.3-nospace.bin")
		);
		assert_eq!(derived_path("english.dat", "bin").unwrap(), PathBuf::from("english.bin"));
		assert!(derived_path("..", "bin").is_err());
	}

	#[test]
	fn dotted_stems_keep_distinct_paths() {
		let b = derived_path("data/a.b.dat", "3-nospace.bin").unwrap();
		let c = derived_path("data/a.c.dat", "3-nospace.bin").unwrap();
		assert_eq!(b, PathBuf::from("data/a.b.3-nospace.bin"));
		assert_ne!(b, c);
	}

	#[test]
	fn stem_without_extension() {
		assert_eq!(stem_of("./data/english.dat").unwrap(), "english");
		assert_eq!(stem_of("a.b.dat").unwrap(), "a.b");
		assert!(stem_of("..").is_err());
	}

	#[test]
	fn lists_only_matching_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.dat"), "b").unwrap();
		fs::write(dir.path().join("a.dat"), "a").unwrap();
		fs::write(dir.path().join("a.3-nospace.bin"), "").unwrap();
		fs::create_dir(dir.path().join("c.dat")).unwrap();
		assert_eq!(list_files(dir.path(), "dat").unwrap(), vec!["a.dat", "b.dat"]);
	}
}
