use serde::{Deserialize, Serialize};

/// A Bash Tag suggestion: either an addition or a removal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
	name: String,
	is_addition: bool,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	condition: String,
}

impl Tag {
	pub fn addition(name: impl Into<String>) -> Self {
		Tag {
			name: name.into(),
			is_addition: true,
			condition: String::new(),
		}
	}

	pub fn removal(name: impl Into<String>) -> Self {
		Tag {
			name: name.into(),
			is_addition: false,
			condition: String::new(),
		}
	}

	pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
		self.condition = condition.into();
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_addition(&self) -> bool {
		self.is_addition
	}

	pub fn condition(&self) -> &str {
		&self.condition
	}
}
