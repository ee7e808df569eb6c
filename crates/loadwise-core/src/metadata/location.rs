use serde::{Deserialize, Serialize};

/// A place a plugin can be downloaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
	url: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	name: String,
}

impl Location {
	pub fn new(url: impl Into<String>) -> Self {
		Location {
			url: url.into(),
			name: String::new(),
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}
