use std::collections::BTreeSet;
use std::sync::Arc;

use crate::helpers::filenames_equal;
use crate::metadata::{File, PluginMetadata, DEFAULT_GROUP_NAME};
use crate::plugin::PluginInterface;

/// Everything the sorter needs to know about one plugin, combined from
/// the plugin file itself, its merged masterlist record, its userlist
/// record and the current load order. Immutable for the duration of one
/// sort, except for the after-group plugin set the group pass fills in.
pub(crate) struct PluginSortingData {
	plugin: Arc<dyn PluginInterface>,
	group: String,
	masterlist_load_after: Vec<String>,
	user_load_after: Vec<String>,
	masterlist_requirements: Vec<String>,
	user_requirements: Vec<String>,
	load_order_index: Option<usize>,
	after_group_plugins: BTreeSet<String>,
}

impl PluginSortingData {
	pub(crate) fn new(
		plugin: Arc<dyn PluginInterface>,
		masterlist_metadata: &PluginMetadata,
		user_metadata: &PluginMetadata,
		load_order: &[String],
	) -> Self {
		let group = user_metadata
			.group()
			.or_else(|| masterlist_metadata.group())
			.unwrap_or(DEFAULT_GROUP_NAME)
			.to_string();

		let load_order_index = load_order
			.iter()
			.position(|entry| filenames_equal(entry, plugin.name()));

		PluginSortingData {
			group,
			masterlist_load_after: file_names(masterlist_metadata.load_after_files()),
			user_load_after: file_names(user_metadata.load_after_files()),
			masterlist_requirements: file_names(masterlist_metadata.requirements()),
			user_requirements: file_names(user_metadata.requirements()),
			load_order_index,
			after_group_plugins: BTreeSet::new(),
			plugin,
		}
	}

	pub(crate) fn name(&self) -> &str {
		self.plugin.name()
	}

	pub(crate) fn is_master(&self) -> bool {
		self.plugin.is_master()
	}

	pub(crate) fn masters(&self) -> &[String] {
		self.plugin.masters()
	}

	pub(crate) fn num_override_form_ids(&self) -> usize {
		self.plugin.override_form_ids().len()
	}

	pub(crate) fn do_form_ids_overlap(&self, other: &PluginSortingData) -> bool {
		self.plugin.do_form_ids_overlap(other.plugin.as_ref())
	}

	pub(crate) fn group(&self) -> &str {
		&self.group
	}

	pub(crate) fn masterlist_load_after(&self) -> &[String] {
		&self.masterlist_load_after
	}

	pub(crate) fn user_load_after(&self) -> &[String] {
		&self.user_load_after
	}

	pub(crate) fn masterlist_requirements(&self) -> &[String] {
		&self.masterlist_requirements
	}

	pub(crate) fn user_requirements(&self) -> &[String] {
		&self.user_requirements
	}

	pub(crate) fn load_order_index(&self) -> Option<usize> {
		self.load_order_index
	}

	pub(crate) fn after_group_plugins(&self) -> &BTreeSet<String> {
		&self.after_group_plugins
	}

	pub(crate) fn set_after_group_plugins(&mut self, plugins: BTreeSet<String>) {
		self.after_group_plugins = plugins;
	}
}

fn file_names(files: &[File]) -> Vec<String> {
	files.iter().map(|file| file.name().to_string()).collect()
}
