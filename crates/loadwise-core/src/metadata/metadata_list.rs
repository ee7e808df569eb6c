use std::collections::{BTreeSet, HashMap};

use super::{Group, Message, PluginMetadata};
use crate::helpers::normalise_filename;

/// An in-memory metadata catalogue: one masterlist or one userlist.
///
/// Parsing catalogue files is the embedding application's concern; lists
/// are populated through [`add_plugin()`](MetadataList::add_plugin) and
/// friends.
#[derive(Debug, Default)]
pub struct MetadataList {
	groups: Vec<Group>,
	bash_tags: BTreeSet<String>,
	/* Exact-name records are keyed by lowercased filename; regex records
	are kept separately in insertion order. */
	plugins: HashMap<String, PluginMetadata>,
	regex_plugins: Vec<PluginMetadata>,
	messages: Vec<Message>,
}

impl MetadataList {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn clear(&mut self) {
		self.groups.clear();
		self.bash_tags.clear();
		self.plugins.clear();
		self.regex_plugins.clear();
		self.messages.clear();
	}

	/// Every plugin record in the list, exact entries first.
	pub fn plugins(&self) -> Vec<&PluginMetadata> {
		let mut plugins: Vec<&PluginMetadata> = self.plugins.values().collect();
		plugins.sort_by_key(|p| normalise_filename(p.name()));
		plugins.extend(self.regex_plugins.iter());
		plugins
	}

	pub fn messages(&self) -> &[Message] {
		&self.messages
	}

	pub fn append_message(&mut self, message: Message) {
		self.messages.push(message);
	}

	pub fn bash_tags(&self) -> &BTreeSet<String> {
		&self.bash_tags
	}

	pub fn set_bash_tags(&mut self, bash_tags: BTreeSet<String>) {
		self.bash_tags = bash_tags;
	}

	pub fn groups(&self) -> &[Group] {
		&self.groups
	}

	pub fn set_groups(&mut self, groups: Vec<Group>) {
		self.groups = groups;
	}

	/// Finds the metadata applying to a plugin, merging any matching
	/// regex entries into the exact entry.
	pub fn find_plugin(&self, plugin_name: &str) -> Option<PluginMetadata> {
		let mut metadata = self
			.plugins
			.get(&normalise_filename(plugin_name))
			.cloned()
			.unwrap_or_else(|| PluginMetadata::new(plugin_name));

		for regex_plugin in &self.regex_plugins {
			if regex_plugin.name_matches(plugin_name) {
				metadata.merge_metadata(regex_plugin);
			}
		}

		if metadata.has_name_only() {
			None
		} else {
			Some(metadata)
		}
	}

	/// Adds a record, replacing any existing exact entry with the same
	/// name. Regex entries always append.
	pub fn add_plugin(&mut self, plugin: PluginMetadata) {
		if plugin.is_regex_plugin() {
			self.regex_plugins.push(plugin);
		} else {
			self.plugins.insert(normalise_filename(plugin.name()), plugin);
		}
	}

	/// Removes the exact entry for a plugin. Regex entries are left in
	/// place, as they may also apply to other plugins.
	pub fn erase_plugin(&mut self, plugin_name: &str) {
		self.plugins.remove(&normalise_filename(plugin_name));
	}
}
