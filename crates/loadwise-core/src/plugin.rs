//! Read-only plugin introspection.

use std::collections::HashSet;

/// A read-only view of one loaded plugin file.
///
/// Implementations are supplied by the embedding application, which owns
/// the actual plugin parsing. A plugin that fails to load is simply never
/// added to the game cache, so the sorter never sees it.
pub trait PluginInterface: Send + Sync {
	/// The plugin's filename, case preserved.
	fn name(&self) -> &str;

	/// Whether the plugin is flagged as a master file.
	fn is_master(&self) -> bool;

	/// The filenames this plugin lists as masters, in declaration order.
	fn masters(&self) -> &[String];

	/// The record identifiers this plugin overrides from its masters.
	fn override_form_ids(&self) -> &HashSet<u32>;

	/// The version read from the plugin's description field, if any.
	fn version(&self) -> Option<&str>;

	fn crc(&self) -> Option<u32>;

	fn do_form_ids_overlap(&self, other: &dyn PluginInterface) -> bool {
		self.override_form_ids()
			.intersection(other.override_form_ids())
			.next()
			.is_some()
	}
}
