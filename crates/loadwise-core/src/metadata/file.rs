use serde::{Deserialize, Serialize};

/// A reference to a file from inside another plugin's metadata record,
/// e.g. a requirement or a load-after entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct File {
	name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	display: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	condition: String,
}

impl File {
	pub fn new(name: impl Into<String>) -> Self {
		File {
			name: name.into(),
			..Default::default()
		}
	}

	pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
		self.condition = condition.into();
		self
	}

	pub fn with_display(mut self, display: impl Into<String>) -> Self {
		self.display = display.into();
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The name shown to users, falling back to the filename.
	pub fn display_name(&self) -> &str {
		if self.display.is_empty() {
			&self.name
		} else {
			&self.display
		}
	}

	pub fn condition(&self) -> &str {
		&self.condition
	}
}
