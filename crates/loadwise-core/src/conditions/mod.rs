//! Parsing and evaluation of the condition strings embedded in metadata.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Error;
use crate::game::{GameCache, GameType, LoadOrderHandler};
use crate::helpers::{self, ghosted};
use crate::metadata::{File, PluginCleaningData, PluginMetadata};
use crate::version::{Comparator, Version};

mod parser;

use parser::{Atom, Expr};

/// The token masterlist syntax uses to refer to the host application
/// itself rather than a file in the data directory.
const HOST_APPLICATION_TOKEN: &str = "LOOT";

/// Evaluates condition strings against one game install.
///
/// Results are memoised in the game cache, keyed by the exact condition
/// text. An evaluator constructed without a cache and load order handler
/// runs in parse-only mode: conditions are syntax-checked but every
/// non-empty condition evaluates to false.
pub struct ConditionEvaluator {
	game_type: GameType,
	data_path: PathBuf,
	game_cache: Option<Arc<GameCache>>,
	load_order_handler: Option<Arc<dyn LoadOrderHandler>>,
}

impl ConditionEvaluator {
	pub fn new(
		game_type: GameType,
		data_path: impl Into<PathBuf>,
		game_cache: Arc<GameCache>,
		load_order_handler: Arc<dyn LoadOrderHandler>,
	) -> Self {
		ConditionEvaluator {
			game_type,
			data_path: data_path.into(),
			game_cache: Some(game_cache),
			load_order_handler: Some(load_order_handler),
		}
	}

	/// Creates an evaluator that only checks condition syntax.
	pub fn parse_only(game_type: GameType) -> Self {
		ConditionEvaluator {
			game_type,
			data_path: PathBuf::new(),
			game_cache: None,
			load_order_handler: None,
		}
	}

	fn should_parse_only(&self) -> bool {
		self.game_cache.is_none() || self.load_order_handler.is_none()
	}

	pub fn clear_condition_cache(&self) {
		if let Some(cache) = &self.game_cache {
			cache.clear_cached_conditions();
		}
	}

	/// Evaluates one condition string. The empty condition is always
	/// true.
	pub fn evaluate(&self, condition: &str) -> crate::Result<bool> {
		if condition.is_empty() {
			return Ok(true);
		}

		let (Some(cache), Some(handler)) = (&self.game_cache, &self.load_order_handler) else {
			/* Parse-only mode still checks the syntax. */
			parser::parse_condition(condition)?;
			return Ok(false);
		};

		log::trace!("Evaluating condition: {}", condition);

		if let Some(result) = cache.cached_condition(condition) {
			return Ok(result);
		}

		let expression = parser::parse_condition(condition)?;
		let result = self.evaluate_expression(&expression, cache, handler.as_ref())?;

		cache.cache_condition(condition, result);

		Ok(result)
	}

	/// Whether a cleaning record applies to the installed build of a
	/// plugin, i.e. whether the plugin's CRC matches the record's.
	pub fn evaluate_cleaning_data(
		&self,
		cleaning_data: &PluginCleaningData,
		plugin_name: &str,
	) -> crate::Result<bool> {
		let Some(cache) = &self.game_cache else {
			return Ok(false);
		};

		if self.load_order_handler.is_none() || plugin_name.is_empty() {
			return Ok(false);
		}

		Ok(self.crc_of(plugin_name, cache)? == Some(cleaning_data.crc()))
	}

	/// Filters a plugin record down to the sub-items whose conditions
	/// hold. In parse-only mode the record is returned unchanged.
	pub fn evaluate_all(&self, metadata: &PluginMetadata) -> crate::Result<PluginMetadata> {
		if self.should_parse_only() {
			return Ok(metadata.clone());
		}

		let mut evaluated = PluginMetadata::new(metadata.name());
		evaluated.set_enabled(metadata.is_enabled());
		evaluated.set_locations(metadata.locations().to_vec());
		if let Some(group) = metadata.group() {
			evaluated.set_group(group);
		}

		evaluated.set_load_after_files(self.filter_files(metadata.load_after_files())?);
		evaluated.set_requirements(self.filter_files(metadata.requirements())?);
		evaluated.set_incompatibilities(self.filter_files(metadata.incompatibilities())?);

		let mut messages = Vec::new();
		for message in metadata.messages() {
			if self.evaluate(message.condition())? {
				messages.push(message.clone());
			}
		}
		evaluated.set_messages(messages);

		let mut tags = Vec::new();
		for tag in metadata.tags() {
			if self.evaluate(tag.condition())? {
				tags.push(tag.clone());
			}
		}
		evaluated.set_tags(tags);

		/* A regex record matches many plugins, so it has no single CRC to
		check cleaning data against. */
		if !metadata.is_regex_plugin() {
			let mut dirty_info = Vec::new();
			for info in metadata.dirty_info() {
				if self.evaluate_cleaning_data(info, metadata.name())? {
					dirty_info.push(info.clone());
				}
			}
			evaluated.set_dirty_info(dirty_info);

			let mut clean_info = Vec::new();
			for info in metadata.clean_info() {
				if self.evaluate_cleaning_data(info, metadata.name())? {
					clean_info.push(info.clone());
				}
			}
			evaluated.set_clean_info(clean_info);
		}

		Ok(evaluated)
	}

	fn filter_files(&self, files: &[File]) -> crate::Result<Vec<File>> {
		let mut filtered = Vec::new();
		for file in files {
			if self.evaluate(file.condition())? {
				filtered.push(file.clone());
			}
		}
		Ok(filtered)
	}

	fn evaluate_expression(
		&self,
		expression: &Expr,
		cache: &GameCache,
		handler: &dyn LoadOrderHandler,
	) -> crate::Result<bool> {
		match expression {
			Expr::Or(lhs, rhs) => Ok(self.evaluate_expression(lhs, cache, handler)?
				|| self.evaluate_expression(rhs, cache, handler)?),
			Expr::And(lhs, rhs) => Ok(self.evaluate_expression(lhs, cache, handler)?
				&& self.evaluate_expression(rhs, cache, handler)?),
			Expr::Not(inner) => Ok(!self.evaluate_expression(inner, cache, handler)?),
			Expr::Atom(atom) => self.evaluate_atom(atom, cache, handler),
		}
	}

	fn evaluate_atom(
		&self,
		atom: &Atom,
		cache: &GameCache,
		handler: &dyn LoadOrderHandler,
	) -> crate::Result<bool> {
		match atom {
			Atom::File(path) => Ok(self.file_exists(path, cache)),
			Atom::Active(path) => {
				Ok(path != HOST_APPLICATION_TOKEN && handler.is_plugin_active(path))
			}
			Atom::Regex(regex_string) => {
				self.regex_matches_in_data_directory(regex_string, |_| true, 1)
			}
			Atom::Many(regex_string) => {
				self.regex_matches_in_data_directory(regex_string, |_| true, 2)
			}
			Atom::ManyActive(regex_string) => self.regex_matches_in_data_directory(
				regex_string,
				|filename| handler.is_plugin_active(filename),
				2,
			),
			Atom::Checksum(path, crc) => Ok(self.crc_of(path, cache)? == Some(*crc)),
			Atom::Version(path, version, comparator) => {
				self.compare_versions(path, version, *comparator, cache)
			}
		}
	}

	fn file_exists(&self, file_path: &str, cache: &GameCache) -> bool {
		if file_path == HOST_APPLICATION_TOKEN {
			return true;
		}

		/* Most file entries refer to plugins, so try the plugin cache
		before touching the filesystem. */
		if cache.plugin(file_path).is_some() {
			return true;
		}

		let path = self.data_path.join(file_path);
		if helpers::has_plugin_file_extension(file_path, self.game_type) {
			path.exists() || ghosted(&path).exists()
		} else {
			path.exists()
		}
	}

	fn regex_matches_in_data_directory(
		&self,
		regex_string: &str,
		mut accept: impl FnMut(&str) -> bool,
		needed: usize,
	) -> crate::Result<bool> {
		let (parent, regex) = parser::split_regex(regex_string)?;
		let directory = self.data_path.join(parent);

		if !directory.is_dir() {
			log::trace!(
				"The path \"{}\" is not a game subdirectory.",
				directory.display()
			);
			return Ok(false);
		}

		let entries = std::fs::read_dir(&directory).map_err(|source| Error::FileAccess {
			path: directory.clone(),
			source,
		})?;

		let mut found = 0;
		for entry in entries {
			let entry = entry.map_err(|source| Error::FileAccess {
				path: directory.clone(),
				source,
			})?;

			let filename = entry.file_name();
			let Some(filename) = filename.to_str() else {
				continue;
			};

			if regex.is_match(filename) && accept(filename) {
				found += 1;
				if found >= needed {
					return Ok(true);
				}
			}
		}

		Ok(false)
	}

	fn crc_of(&self, file: &str, cache: &GameCache) -> crate::Result<Option<u32>> {
		if let Some(crc) = cache.cached_crc(file) {
			return Ok(Some(crc));
		}

		if file == HOST_APPLICATION_TOKEN {
			let executable = std::env::current_exe().map_err(|source| Error::FileAccess {
				path: PathBuf::from(HOST_APPLICATION_TOKEN),
				source,
			})?;
			let crc = helpers::file_crc32(&executable)?;
			cache.cache_crc(file, crc);
			return Ok(Some(crc));
		}

		/* Prefer the CRC the plugin parser already computed. */
		let mut crc = cache.plugin(file).and_then(|plugin| plugin.crc());

		if crc.is_none() {
			let path = self.data_path.join(file);
			let ghost_path = ghosted(&path);

			if path.exists() {
				crc = Some(helpers::file_crc32(&path)?);
			} else if helpers::has_plugin_file_extension(file, self.game_type)
				&& ghost_path.exists()
			{
				crc = Some(helpers::file_crc32(&ghost_path)?);
			}
		}

		if let Some(crc) = crc {
			cache.cache_crc(file, crc);
		}

		Ok(crc)
	}

	fn compare_versions(
		&self,
		file_path: &str,
		given_version: &str,
		comparator: Comparator,
		cache: &GameCache,
	) -> crate::Result<bool> {
		if !self.file_exists(file_path, cache) {
			/* A missing file compares as "less than" any version. */
			return Ok(matches!(
				comparator,
				Comparator::NotEqual | Comparator::LessThan | Comparator::LessThanEqual
			));
		}

		let true_version = self.version_of(file_path, cache);

		log::trace!(
			"Version extracted from \"{}\": {}",
			file_path,
			true_version
		);

		Ok(comparator.compare(&true_version, &Version::new(given_version)))
	}

	fn version_of(&self, file_path: &str, cache: &GameCache) -> Version {
		/* Only cached plugins report a version; other files have no
		portable version source and evaluate as versionless. */
		cache
			.plugin(file_path)
			.map(|plugin| Version::new(plugin.version().unwrap_or("")))
			.unwrap_or_default()
	}
}

#[cfg(test)]
mod test {
	use std::collections::HashSet;
	use std::path::Path;

	use super::*;
	use crate::plugin::PluginInterface;

	#[derive(Debug, Default)]
	struct TestPlugin {
		name: String,
		version: Option<String>,
		crc: Option<u32>,
		override_form_ids: HashSet<u32>,
	}

	impl PluginInterface for TestPlugin {
		fn name(&self) -> &str {
			&self.name
		}
		fn is_master(&self) -> bool {
			false
		}
		fn masters(&self) -> &[String] {
			&[]
		}
		fn override_form_ids(&self) -> &HashSet<u32> {
			&self.override_form_ids
		}
		fn version(&self) -> Option<&str> {
			self.version.as_deref()
		}
		fn crc(&self) -> Option<u32> {
			self.crc
		}
	}

	#[derive(Debug, Default)]
	struct TestHandler {
		active: Vec<String>,
	}

	impl LoadOrderHandler for TestHandler {
		fn load_order(&self) -> Vec<String> {
			Vec::new()
		}
		fn implicitly_active_plugins(&self) -> Vec<String> {
			Vec::new()
		}
		fn is_plugin_active(&self, plugin_name: &str) -> bool {
			self.active.iter().any(|p| p == plugin_name)
		}
	}

	struct Fixture {
		/* Kept alive so the data directory outlives the evaluator. */
		_data_dir: tempfile::TempDir,
		cache: Arc<GameCache>,
		evaluator: ConditionEvaluator,
	}

	impl Fixture {
		fn new(active: &[&str]) -> Fixture {
			let data_dir = tempfile::TempDir::new().unwrap();
			let cache = Arc::new(GameCache::new());
			let handler = Arc::new(TestHandler {
				active: active.iter().map(|p| p.to_string()).collect(),
			});
			let evaluator = ConditionEvaluator::new(
				GameType::Tes5,
				data_dir.path(),
				Arc::clone(&cache),
				handler,
			);

			Fixture {
				_data_dir: data_dir,
				cache,
				evaluator,
			}
		}

		fn data_path(&self) -> &Path {
			self.evaluator.data_path.as_path()
		}

		fn write_file(&self, name: &str, contents: &[u8]) {
			let path = self.data_path().join(name);
			if let Some(parent) = path.parent() {
				std::fs::create_dir_all(parent).unwrap();
			}
			std::fs::write(path, contents).unwrap();
		}
	}

	#[test]
	fn empty_condition_is_true() {
		let fixture = Fixture::new(&[]);
		assert!(fixture.evaluator.evaluate("").unwrap());
	}

	#[test]
	fn file_checks_the_data_directory() {
		let fixture = Fixture::new(&[]);
		fixture.write_file("present.esp", b"");

		assert!(fixture.evaluator.evaluate("file(\"present.esp\")").unwrap());
		assert!(!fixture.evaluator.evaluate("file(\"missing.esp\")").unwrap());
	}

	#[test]
	fn file_finds_ghosted_plugins() {
		let fixture = Fixture::new(&[]);
		fixture.write_file("ghosted.esp.ghost", b"");
		fixture.write_file("readme.txt.ghost", b"");

		assert!(fixture.evaluator.evaluate("file(\"ghosted.esp\")").unwrap());
		/* The ghost fallback only applies to plugin extensions. */
		assert!(!fixture.evaluator.evaluate("file(\"readme.txt\")").unwrap());
	}

	#[test]
	fn file_finds_cached_plugins_without_touching_disk() {
		let fixture = Fixture::new(&[]);
		fixture.cache.add_plugin(Arc::new(TestPlugin {
			name: "cached.esp".into(),
			..Default::default()
		}));

		assert!(fixture.evaluator.evaluate("file(\"cached.esp\")").unwrap());
	}

	#[test]
	fn the_host_application_exists_but_is_never_active() {
		let fixture = Fixture::new(&[]);

		assert!(fixture.evaluator.evaluate("file(\"LOOT\")").unwrap());
		assert!(!fixture.evaluator.evaluate("active(\"LOOT\")").unwrap());
	}

	#[test]
	fn active_asks_the_load_order_handler() {
		let fixture = Fixture::new(&["on.esp"]);

		assert!(fixture.evaluator.evaluate("active(\"on.esp\")").unwrap());
		assert!(!fixture.evaluator.evaluate("active(\"off.esp\")").unwrap());
	}

	#[test]
	fn regex_needs_one_match_and_many_needs_two() {
		let fixture = Fixture::new(&[]);
		fixture.write_file("patch1.esp", b"");

		assert!(fixture.evaluator.evaluate(r#"regex("patch\d\.esp")"#).unwrap());
		assert!(!fixture.evaluator.evaluate(r#"many("patch\d\.esp")"#).unwrap());

		fixture.write_file("patch2.esp", b"");
		fixture.cache.clear_cached_conditions();

		assert!(fixture.evaluator.evaluate(r#"many("patch\d\.esp")"#).unwrap());
	}

	#[test]
	fn regex_scans_literal_subdirectories() {
		let fixture = Fixture::new(&[]);
		fixture.write_file("textures/cat1.dds", b"");

		assert!(fixture
			.evaluator
			.evaluate(r#"regex("textures/cat\d\.dds")"#)
			.unwrap());
		assert!(!fixture
			.evaluator
			.evaluate(r#"regex("meshes/cat\d\.dds")"#)
			.unwrap());
	}

	#[test]
	fn many_active_needs_two_active_matches() {
		let fixture = Fixture::new(&["part1.esp", "part2.esp"]);
		fixture.write_file("part1.esp", b"");
		fixture.write_file("part2.esp", b"");
		fixture.write_file("part3.esp", b"");

		assert!(fixture
			.evaluator
			.evaluate(r#"many_active("part\d\.esp")"#)
			.unwrap());

		let one_active = Fixture::new(&["part1.esp"]);
		one_active.write_file("part1.esp", b"");
		one_active.write_file("part2.esp", b"");

		assert!(!one_active
			.evaluator
			.evaluate(r#"many_active("part\d\.esp")"#)
			.unwrap());
	}

	#[test]
	fn checksum_compares_the_file_crc() {
		let fixture = Fixture::new(&[]);
		fixture.write_file("data.bin", b"123456789");

		let crc = crate::helpers::crc32(b"123456789");

		assert!(fixture
			.evaluator
			.evaluate(&format!("checksum(\"data.bin\", {crc:X})"))
			.unwrap());
		assert!(!fixture
			.evaluator
			.evaluate("checksum(\"data.bin\", 12345678)")
			.unwrap());
	}

	#[test]
	fn checksum_prefers_the_cached_plugin_crc() {
		let fixture = Fixture::new(&[]);
		fixture.cache.add_plugin(Arc::new(TestPlugin {
			name: "cached.esp".into(),
			crc: Some(0xABCD1234),
			..Default::default()
		}));

		assert!(fixture
			.evaluator
			.evaluate("checksum(\"cached.esp\", ABCD1234)")
			.unwrap());
	}

	#[test]
	fn version_compares_against_the_cached_plugin_version() {
		let fixture = Fixture::new(&[]);
		fixture.cache.add_plugin(Arc::new(TestPlugin {
			name: "versioned.esp".into(),
			version: Some("1.2.3".into()),
			..Default::default()
		}));

		assert!(fixture
			.evaluator
			.evaluate("version(\"versioned.esp\", \"1.0\", >)")
			.unwrap());
		assert!(fixture
			.evaluator
			.evaluate("version(\"versioned.esp\", \"1.2.3\", ==)")
			.unwrap());
		assert!(!fixture
			.evaluator
			.evaluate("version(\"versioned.esp\", \"2.0\", >=)")
			.unwrap());
	}

	#[test]
	fn version_of_a_missing_file_is_less_than_anything() {
		let fixture = Fixture::new(&[]);

		assert!(fixture
			.evaluator
			.evaluate("version(\"missing.esp\", \"1.0\", <)")
			.unwrap());
		assert!(fixture
			.evaluator
			.evaluate("version(\"missing.esp\", \"1.0\", !=)")
			.unwrap());
		assert!(!fixture
			.evaluator
			.evaluate("version(\"missing.esp\", \"1.0\", ==)")
			.unwrap());
	}

	#[test]
	fn results_are_cached_by_exact_condition_text() {
		let fixture = Fixture::new(&[]);
		fixture.write_file("fleeting.esp", b"");

		assert!(fixture.evaluator.evaluate("file(\"fleeting.esp\")").unwrap());

		std::fs::remove_file(fixture.data_path().join("fleeting.esp")).unwrap();

		/* Still true: the second evaluation hits the cache. */
		assert!(fixture.evaluator.evaluate("file(\"fleeting.esp\")").unwrap());

		fixture.cache.clear_cached_conditions();
		assert!(!fixture.evaluator.evaluate("file(\"fleeting.esp\")").unwrap());
	}

	#[test]
	fn boolean_operators_combine_atoms() {
		let fixture = Fixture::new(&[]);
		fixture.write_file("a.esp", b"");

		assert!(fixture
			.evaluator
			.evaluate("file(\"a.esp\") and not file(\"b.esp\")")
			.unwrap());
		assert!(fixture
			.evaluator
			.evaluate("file(\"b.esp\") or file(\"a.esp\")")
			.unwrap());
		assert!(!fixture
			.evaluator
			.evaluate("file(\"a.esp\") and file(\"b.esp\")")
			.unwrap());
	}

	#[test]
	fn parse_only_mode_validates_but_never_matches() {
		let evaluator = ConditionEvaluator::parse_only(GameType::Tes5);

		assert!(evaluator.evaluate("").unwrap());
		assert!(!evaluator.evaluate("file(\"a.esp\")").unwrap());
		assert!(evaluator.evaluate("file(").is_err());
	}

	#[test]
	fn cleaning_data_matches_on_crc() {
		let fixture = Fixture::new(&[]);
		fixture.cache.add_plugin(Arc::new(TestPlugin {
			name: "dirty.esp".into(),
			crc: Some(0xDEADBEEF),
			..Default::default()
		}));

		let matching = PluginCleaningData::new(0xDEADBEEF, "xEdit");
		let other = PluginCleaningData::new(0x12345678, "xEdit");

		assert!(fixture
			.evaluator
			.evaluate_cleaning_data(&matching, "dirty.esp")
			.unwrap());
		assert!(!fixture
			.evaluator
			.evaluate_cleaning_data(&other, "dirty.esp")
			.unwrap());
		assert!(!fixture
			.evaluator
			.evaluate_cleaning_data(&matching, "")
			.unwrap());
	}

	#[test]
	fn evaluate_all_filters_conditional_sub_items() {
		use crate::metadata::{Message, MessageType, Tag};

		let fixture = Fixture::new(&[]);
		fixture.write_file("present.esp", b"");

		let mut metadata = PluginMetadata::new("subject.esp");
		metadata.set_group("late");
		metadata.set_load_after_files(vec![
			File::new("kept.esp").with_condition("file(\"present.esp\")"),
			File::new("dropped.esp").with_condition("file(\"missing.esp\")"),
			File::new("unconditional.esp"),
		]);
		metadata.set_messages(vec![
			Message::new(MessageType::Say, "kept"),
			Message::new(MessageType::Warn, "dropped").with_condition("file(\"missing.esp\")"),
		]);
		metadata.set_tags(vec![
			Tag::addition("Relev").with_condition("file(\"present.esp\")"),
			Tag::removal("Delev").with_condition("file(\"missing.esp\")"),
		]);

		let evaluated = fixture.evaluator.evaluate_all(&metadata).unwrap();

		let load_after: Vec<_> = evaluated
			.load_after_files()
			.iter()
			.map(File::name)
			.collect();
		assert_eq!(vec!["kept.esp", "unconditional.esp"], load_after);
		assert_eq!(1, evaluated.messages().len());
		assert_eq!(1, evaluated.tags().len());
		assert_eq!(Some("late"), evaluated.group());
	}

	#[test]
	fn evaluate_all_keeps_only_crc_matched_cleaning_data() {
		let fixture = Fixture::new(&[]);
		fixture.cache.add_plugin(Arc::new(TestPlugin {
			name: "subject.esp".into(),
			crc: Some(0xAAAA5555),
			..Default::default()
		}));

		let mut metadata = PluginMetadata::new("subject.esp");
		metadata.set_dirty_info(vec![
			PluginCleaningData::new(0xAAAA5555, "xEdit").with_counts(4, 0, 1),
			PluginCleaningData::new(0x00000001, "xEdit"),
		]);

		let evaluated = fixture.evaluator.evaluate_all(&metadata).unwrap();

		assert_eq!(1, evaluated.dirty_info().len());
		assert_eq!(0xAAAA5555, evaluated.dirty_info()[0].crc());
	}

	#[test]
	fn evaluate_all_propagates_syntax_errors() {
		let fixture = Fixture::new(&[]);

		let mut metadata = PluginMetadata::new("subject.esp");
		metadata.set_requirements(vec![File::new("a.esp").with_condition("nonsense(")]);

		assert!(fixture.evaluator.evaluate_all(&metadata).is_err());
	}
}
