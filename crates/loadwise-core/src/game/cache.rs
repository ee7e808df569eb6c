//! Thread-safe memoisation shared across one game handle.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::helpers::normalise_filename;
use crate::plugin::PluginInterface;

#[derive(Default)]
struct CacheState {
	/* Condition results are keyed by the exact condition text; plugin
	handles and CRCs are keyed by lowercased filename. */
	conditions: HashMap<String, bool>,
	crcs: HashMap<String, u32>,
	plugins: BTreeMap<String, Arc<dyn PluginInterface>>,
	archive_paths: HashSet<PathBuf>,
}

/// Memoised per-game state: condition results, file CRCs, loaded plugin
/// handles and discovered archive paths.
///
/// The cache may be shared with threads that scan the data directory while
/// a sort is running, so every operation takes the one internal mutex.
/// Nothing is ever evicted; callers clear categories explicitly when the
/// data directory may have changed.
#[derive(Default)]
pub struct GameCache {
	state: Mutex<CacheState>,
}

impl GameCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cache_condition(&self, condition: &str, result: bool) {
		self.lock().conditions.insert(condition.to_string(), result);
	}

	pub fn cached_condition(&self, condition: &str) -> Option<bool> {
		self.lock().conditions.get(condition).copied()
	}

	pub fn cache_crc(&self, file: &str, crc: u32) {
		self.lock().crcs.insert(normalise_filename(file), crc);
	}

	pub fn cached_crc(&self, file: &str) -> Option<u32> {
		self.lock().crcs.get(&normalise_filename(file)).copied()
	}

	/// Stores a plugin handle, replacing any existing handle for the same
	/// filename.
	pub fn add_plugin(&self, plugin: Arc<dyn PluginInterface>) {
		let key = normalise_filename(plugin.name());
		self.lock().plugins.insert(key, plugin);
	}

	pub fn plugin(&self, name: &str) -> Option<Arc<dyn PluginInterface>> {
		self.lock().plugins.get(&normalise_filename(name)).cloned()
	}

	/// All cached plugin handles, ordered by lowercased filename.
	///
	/// The sorter creates graph vertices in this order, so it must be
	/// stable across runs for sorting to be deterministic.
	pub fn plugins(&self) -> Vec<Arc<dyn PluginInterface>> {
		self.lock().plugins.values().cloned().collect()
	}

	pub fn cache_archive_path(&self, path: &Path) {
		self.lock().archive_paths.insert(path.to_path_buf());
	}

	pub fn archive_paths(&self) -> HashSet<PathBuf> {
		self.lock().archive_paths.clone()
	}

	/// Clears cached condition results and CRCs together: both are
	/// derived from the same data directory state.
	pub fn clear_cached_conditions(&self) {
		let mut state = self.lock();
		state.conditions.clear();
		state.crcs.clear();
	}

	pub fn clear_cached_plugins(&self) {
		self.lock().plugins.clear();
	}

	pub fn clear_cached_archive_paths(&self) {
		self.lock().archive_paths.clear();
	}

	fn lock(&self) -> MutexGuard<'_, CacheState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
}
