use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
	Say,
	Warn,
	Error,
}

/// A note attached to a plugin record or to a whole metadata list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
	#[serde(rename = "type")]
	message_type: MessageType,
	text: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	condition: String,
}

impl Message {
	pub fn new(message_type: MessageType, text: impl Into<String>) -> Self {
		Message {
			message_type,
			text: text.into(),
			condition: String::new(),
		}
	}

	pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
		self.condition = condition.into();
		self
	}

	pub fn message_type(&self) -> MessageType {
		self.message_type
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn condition(&self) -> &str {
		&self.condition
	}
}
