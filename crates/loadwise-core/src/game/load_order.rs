//! Interface to the game's load order machinery.

/// Answers load order queries for one game install.
///
/// Reading and writing the on-disk load order file is the embedding
/// application's concern; the core only consumes the answers.
pub trait LoadOrderHandler: Send + Sync {
	/// The current on-disk load order, earliest-loading plugin first.
	fn load_order(&self) -> Vec<String>;

	/// Plugins the game engine always activates, in their hardcoded
	/// positions.
	fn implicitly_active_plugins(&self) -> Vec<String>;

	fn is_plugin_active(&self, plugin_name: &str) -> bool;
}
