use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use super::{File, Location, Message, PluginCleaningData, Tag};

/// Characters that mark a record name as a regex entry rather than an
/// exact filename.
const REGEX_CHARACTERS: &[char] = &[':', '\\', '*', '?', '|'];

/// One plugin's metadata record, from a masterlist or userlist.
///
/// Records from multiple sources are combined with
/// [`merge_metadata()`](PluginMetadata::merge_metadata) before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
	name: String,
	enabled: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	group: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	load_after_files: Vec<File>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	requirements: Vec<File>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	incompatibilities: Vec<File>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	messages: Vec<Message>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	tags: Vec<Tag>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	dirty_info: Vec<PluginCleaningData>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	clean_info: Vec<PluginCleaningData>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	locations: Vec<Location>,
}

impl PluginMetadata {
	pub fn new(name: impl Into<String>) -> Self {
		PluginMetadata {
			name: name.into(),
			enabled: true,
			group: None,
			load_after_files: Vec::new(),
			requirements: Vec::new(),
			incompatibilities: Vec::new(),
			messages: Vec::new(),
			tags: Vec::new(),
			dirty_info: Vec::new(),
			clean_info: Vec::new(),
			locations: Vec::new(),
		}
	}

	/* Fields */

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
	}

	pub fn group(&self) -> Option<&str> {
		self.group.as_deref()
	}

	pub fn set_group(&mut self, group: impl Into<String>) {
		self.group = Some(group.into());
	}

	pub fn unset_group(&mut self) {
		self.group = None;
	}

	pub fn load_after_files(&self) -> &[File] {
		&self.load_after_files
	}

	pub fn set_load_after_files(&mut self, files: Vec<File>) {
		self.load_after_files = files;
	}

	pub fn requirements(&self) -> &[File] {
		&self.requirements
	}

	pub fn set_requirements(&mut self, files: Vec<File>) {
		self.requirements = files;
	}

	pub fn incompatibilities(&self) -> &[File] {
		&self.incompatibilities
	}

	pub fn set_incompatibilities(&mut self, files: Vec<File>) {
		self.incompatibilities = files;
	}

	pub fn messages(&self) -> &[Message] {
		&self.messages
	}

	pub fn set_messages(&mut self, messages: Vec<Message>) {
		self.messages = messages;
	}

	pub fn tags(&self) -> &[Tag] {
		&self.tags
	}

	pub fn set_tags(&mut self, tags: Vec<Tag>) {
		self.tags = tags;
	}

	pub fn dirty_info(&self) -> &[PluginCleaningData] {
		&self.dirty_info
	}

	pub fn set_dirty_info(&mut self, dirty_info: Vec<PluginCleaningData>) {
		self.dirty_info = dirty_info;
	}

	pub fn clean_info(&self) -> &[PluginCleaningData] {
		&self.clean_info
	}

	pub fn set_clean_info(&mut self, clean_info: Vec<PluginCleaningData>) {
		self.clean_info = clean_info;
	}

	pub fn locations(&self) -> &[Location] {
		&self.locations
	}

	pub fn set_locations(&mut self, locations: Vec<Location>) {
		self.locations = locations;
	}

	/* Merging */

	/// Merges another record for the same plugin into this one.
	///
	/// Collection fields are unioned, keeping this record's entries first
	/// and dropping duplicates. The other record's scalar fields (enabled
	/// flag, group, locations) win where they are set, which makes user
	/// metadata override masterlist metadata when merged in that order.
	/// Merging the same record twice changes nothing.
	pub fn merge_metadata(&mut self, other: &PluginMetadata) {
		self.enabled = other.enabled;

		if other.group.is_some() {
			self.group = other.group.clone();
		}

		if !other.locations.is_empty() {
			self.locations = other.locations.clone();
		}

		merge_unique(&mut self.load_after_files, &other.load_after_files);
		merge_unique(&mut self.requirements, &other.requirements);
		merge_unique(&mut self.incompatibilities, &other.incompatibilities);
		merge_unique(&mut self.messages, &other.messages);
		merge_unique(&mut self.tags, &other.tags);
		merge_unique(&mut self.dirty_info, &other.dirty_info);
		merge_unique(&mut self.clean_info, &other.clean_info);
	}

	/* Queries */

	/// Whether the record's name is a regex matching many plugins rather
	/// than one exact filename.
	pub fn is_regex_plugin(&self) -> bool {
		self.name.contains(REGEX_CHARACTERS)
	}

	/// Whether this record applies to the named plugin. Exact names match
	/// case-insensitively; regex entries must match the whole filename.
	pub fn name_matches(&self, plugin_name: &str) -> bool {
		if !self.is_regex_plugin() {
			return crate::helpers::filenames_equal(&self.name, plugin_name);
		}

		let regex = RegexBuilder::new(&format!("^(?:{})$", self.name))
			.case_insensitive(true)
			.build();

		match regex {
			Ok(regex) => regex.is_match(plugin_name),
			Err(error) => {
				log::error!(
					"Treating regex metadata entry \"{}\" as matching nothing: {}",
					self.name,
					error
				);
				false
			}
		}
	}

	/// True when the record carries nothing beyond its name.
	pub fn has_name_only(&self) -> bool {
		self.group.is_none()
			&& self.load_after_files.is_empty()
			&& self.requirements.is_empty()
			&& self.incompatibilities.is_empty()
			&& self.messages.is_empty()
			&& self.tags.is_empty()
			&& self.dirty_info.is_empty()
			&& self.clean_info.is_empty()
			&& self.locations.is_empty()
	}
}

fn merge_unique<T: Clone + PartialEq>(target: &mut Vec<T>, source: &[T]) {
	for item in source {
		if !target.contains(item) {
			target.push(item.clone());
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn new_records_are_enabled_and_groupless() {
		let metadata = PluginMetadata::new("A.esp");

		assert!(metadata.is_enabled());
		assert!(metadata.group().is_none());
		assert!(metadata.has_name_only());
	}

	#[test]
	fn merge_unions_collections_without_duplicates() {
		let mut base = PluginMetadata::new("A.esp");
		base.set_requirements(vec![File::new("B.esp"), File::new("C.esp")]);

		let mut other = PluginMetadata::new("A.esp");
		other.set_requirements(vec![File::new("C.esp"), File::new("D.esp")]);

		base.merge_metadata(&other);

		let names: Vec<_> = base.requirements().iter().map(File::name).collect();
		assert_eq!(vec!["B.esp", "C.esp", "D.esp"], names);
	}

	#[test]
	fn merge_lets_the_other_group_win_when_set() {
		let mut base = PluginMetadata::new("A.esp");
		base.set_group("early");

		let mut other = PluginMetadata::new("A.esp");
		other.set_group("late");

		base.merge_metadata(&other);
		assert_eq!(Some("late"), base.group());
	}

	#[test]
	fn merge_keeps_the_group_when_the_other_has_none() {
		let mut base = PluginMetadata::new("A.esp");
		base.set_group("early");

		base.merge_metadata(&PluginMetadata::new("A.esp"));
		assert_eq!(Some("early"), base.group());
	}

	#[test]
	fn merge_replaces_locations_when_the_other_has_some() {
		let mut base = PluginMetadata::new("A.esp");
		base.set_locations(vec![Location::new("https://example.com/1")]);

		let mut other = PluginMetadata::new("A.esp");
		other.set_locations(vec![Location::new("https://example.com/2")]);

		base.merge_metadata(&other);
		assert_eq!(1, base.locations().len());
		assert_eq!("https://example.com/2", base.locations()[0].url());
	}

	#[test]
	fn merge_is_idempotent() {
		let mut other = PluginMetadata::new("A.esp");
		other.set_group("late");
		other.set_load_after_files(vec![File::new("B.esp")]);
		other.set_tags(vec![Tag::addition("Relev")]);

		let mut once = PluginMetadata::new("A.esp");
		once.merge_metadata(&other);

		let mut twice = once.clone();
		twice.merge_metadata(&other);

		assert_eq!(once, twice);
	}

	#[test]
	fn names_with_regex_characters_are_regex_plugins() {
		assert!(PluginMetadata::new(r"Oscuro's_Oblivion_Overhaul.*\.esp").is_regex_plugin());
		assert!(!PluginMetadata::new("plain.esp").is_regex_plugin());
	}

	#[test]
	fn regex_names_match_whole_filenames_case_insensitively() {
		let metadata = PluginMetadata::new(r"patch( v\d+)?\.esp");

		assert!(metadata.name_matches("Patch.esp"));
		assert!(metadata.name_matches("patch v2.ESP"));
		assert!(!metadata.name_matches("some patch.esp"));
	}

	#[test]
	fn exact_names_match_case_insensitively() {
		let metadata = PluginMetadata::new("A.esp");

		assert!(metadata.name_matches("a.ESP"));
		assert!(!metadata.name_matches("b.esp"));
	}
}
