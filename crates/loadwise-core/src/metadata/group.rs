use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The group given to plugins whose metadata names none.
pub const DEFAULT_GROUP_NAME: &str = "default";

/// A named ordering bucket. Plugins in a group load after every plugin in
/// any of the group's (transitive) after-groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
	name: String,
	#[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
	after_groups: BTreeSet<String>,
}

impl Group {
	pub fn new(name: impl Into<String>) -> Self {
		Group {
			name: name.into(),
			after_groups: BTreeSet::new(),
		}
	}

	pub fn with_after_groups<I, S>(mut self, after_groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.after_groups = after_groups.into_iter().map(Into::into).collect();
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn after_groups(&self) -> &BTreeSet<String> {
		&self.after_groups
	}
}

impl Default for Group {
	fn default() -> Self {
		Group::new(DEFAULT_GROUP_NAME)
	}
}
