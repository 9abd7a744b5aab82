use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::alphabet::Alphabet;
use super::builder::{build_parallel, build_with_config};
use super::config::ModelConfig;
use super::stats_table::StatsTable;
use crate::error::{ModelError, Result};
use crate::io;

/// Extension of corpus files.
pub const CORPUS_EXTENSION: &str = "dat";

/// Extension of the cached table of a corpus for a given configuration.
///
/// Order and space handling are part of the name so that tables trained with
/// different settings never shadow each other.
pub fn cache_extension(config: &ModelConfig) -> String {
	let spaces = if config.remove_spaces { "nospace" } else { "space" };
	format!("{}-{spaces}.bin", config.order)
}

/// Path of the corpus `name` inside `folder`.
///
/// # Errors
/// Returns `InvalidName` unless `name` is a single plain file name: no
/// separator, no `.` or `..`, not empty.
pub fn corpus_path<P: AsRef<Path>>(folder: P, name: &str) -> Result<PathBuf> {
	let mut components = Path::new(name).components();
	let plain = matches!(components.next(), Some(Component::Normal(_)))
		&& components.next().is_none()
		&& !name.contains(['/', '\\']);
	if !plain {
		return Err(ModelError::InvalidName(name.to_owned()));
	}
	Ok(folder.as_ref().join(format!("{name}.{CORPUS_EXTENSION}")))
}

/// On-disk cache entry: the table together with everything it depends on.
#[derive(Serialize, Deserialize)]
struct CachedTable {
	alphabet: Alphabet,
	order: usize,
	remove_spaces: bool,
	smoothing_scale: f64,
	table: StatsTable,
}

impl CachedTable {
	fn matches(&self, alphabet: &Alphabet, config: &ModelConfig) -> bool {
		self.alphabet == *alphabet
			&& self.order == config.order
			&& self.remove_spaces == config.remove_spaces
			&& self.smoothing_scale == config.smoothing_scale
			&& self.table.dim() == alphabet.dim()
			&& self.table.order() == config.order
	}

	fn read(path: &Path) -> Result<Self> {
		let bytes = fs::read(path)?;
		Ok(postcard::from_bytes(&bytes)?)
	}

	fn write(&self, path: &Path) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		fs::write(path, &bytes)?;
		info!("Cached {}^{} table in {} ({} bytes)", self.table.dim(), self.order, path.display(), bytes.len());
		Ok(())
	}
}

/// Loads the table of a corpus file, training it if needed.
///
/// - If a cached table exists next to the corpus and was built over the same
///   alphabet (letters, their order and the boundary), order, space handling
///   and smoothing scale, it is loaded with `postcard`.
/// - Otherwise the corpus is tokenized, the model is built and the cache is
///   overwritten for future fast loading.
pub fn load_or_build<P: AsRef<Path>>(corpus: P, alphabet: &Alphabet, config: &ModelConfig) -> Result<StatsTable> {
	let corpus = corpus.as_ref();
	let cache = io::derived_path(corpus, &cache_extension(config))?;
	if cache.exists() {
		match CachedTable::read(&cache) {
			Ok(entry) if entry.matches(alphabet, config) => {
				debug!("Loaded cached table {}", cache.display());
				return Ok(entry.table);
			}
			Ok(_) => warn!("Ignoring cache {}: built with other settings", cache.display()),
			Err(e) => warn!("Ignoring unreadable cache {}: {e}", cache.display()),
		}
	}

	let text = io::read_text(corpus)?;
	debug!("Training on {} ({} chars)", corpus.display(), text.len());
	let table = build_with_config(&alphabet.tokenize(&text), alphabet.dim(), config)?;
	let entry = CachedTable {
		alphabet: alphabet.clone(),
		order: config.order,
		remove_spaces: config.remove_spaces,
		smoothing_scale: config.smoothing_scale,
		table,
	};
	entry.write(&cache)?;
	Ok(entry.table)
}

/// Builds one table from several corpus files, each an independent document
/// counted on its own worker.
pub fn build_combined<P: AsRef<Path>>(corpora: &[P], alphabet: &Alphabet, config: &ModelConfig) -> Result<StatsTable> {
	let documents = corpora
		.iter()
		.map(|corpus| Ok(alphabet.tokenize(&io::read_text(corpus)?)))
		.collect::<Result<Vec<_>>>()?;
	build_parallel(&documents, alphabet.dim(), config)
}

/// Named frozen tables trained over one alphabet.
///
/// Tables are handed out as `Arc`s: scoring workers keep reading a table even
/// if it is replaced in the store meanwhile.
#[derive(Debug)]
pub struct ModelStore {
	alphabet: Alphabet,
	models: HashMap<String, Arc<StatsTable>>,
}

impl ModelStore {
	pub fn new(alphabet: Alphabet) -> Self {
		Self { alphabet, models: HashMap::new() }
	}

	/// Creates a store with the tables of every corpus (`.dat`) of a directory.
	///
	/// # Errors
	/// - Returns an error if the path is not a directory.
	/// - Returns an error if a model fails to load or train.
	pub fn from_folder<P: AsRef<Path>>(folder: P, alphabet: Alphabet, config: &ModelConfig) -> Result<Self> {
		let folder = folder.as_ref();
		if !folder.is_dir() {
			return Err(ModelError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Expected a directory, got: {}", folder.display()),
			)));
		}

		let mut store = Self::new(alphabet);
		for file in io::list_files(folder, CORPUS_EXTENSION)? {
			store.load_model(folder.join(&file), config)?;
		}
		info!("Loaded {} models from {}", store.models.len(), folder.display());
		Ok(store)
	}

	pub fn alphabet(&self) -> &Alphabet {
		&self.alphabet
	}

	/// Loads (or trains) the table of a corpus file under its file name.
	/// Replaces a previously loaded model of the same name.
	pub fn load_model<P: AsRef<Path>>(&mut self, corpus: P, config: &ModelConfig) -> Result<Arc<StatsTable>> {
		let name = io::stem_of(&corpus)?;
		let table = Arc::new(load_or_build(&corpus, &self.alphabet, config)?);
		self.insert(&name, Arc::clone(&table))?;
		Ok(table)
	}

	fn check_alphabet(&self, table: &StatsTable) -> Result<()> {
		if table.dim() != self.alphabet.dim() {
			return Err(ModelError::ShapeMismatch {
				expected_dim: self.alphabet.dim(),
				expected_order: table.order(),
				found_dim: table.dim(),
				found_order: table.order(),
			});
		}
		Ok(())
	}

	/// Registers an already built table.
	///
	/// # Errors
	/// Returns `ShapeMismatch` if the table was not built over this store's alphabet.
	pub fn insert(&mut self, name: &str, table: Arc<StatsTable>) -> Result<()> {
		self.check_alphabet(&table)?;
		if self.models.insert(name.to_owned(), table).is_some() {
			debug!("Replaced model {name}");
		}
		Ok(())
	}

	/// Replaces every loaded model with `models`.
	///
	/// # Errors
	/// Returns `ShapeMismatch` if any table was not built over this store's
	/// alphabet; the store is then left untouched.
	pub fn replace_all<I>(&mut self, models: I) -> Result<()>
	where
		I: IntoIterator<Item = (String, Arc<StatsTable>)>,
	{
		let models: HashMap<String, Arc<StatsTable>> = models.into_iter().collect();
		for table in models.values() {
			self.check_alphabet(table)?;
		}
		self.models = models;
		Ok(())
	}

	pub fn get(&self, name: &str) -> Option<Arc<StatsTable>> {
		self.models.get(name).cloned()
	}

	/// Names of the loaded models, sorted.
	pub fn model_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.models.keys().cloned().collect();
		names.sort();
		names
	}
}
