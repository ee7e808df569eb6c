use serde::{Deserialize, Serialize};

/// A record of a cleaning utility's verdict on one specific build of a
/// plugin, identified by CRC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginCleaningData {
	crc: u32,
	cleaning_utility: String,
	#[serde(default)]
	itm_count: u32,
	#[serde(default)]
	deleted_reference_count: u32,
	#[serde(default)]
	deleted_navmesh_count: u32,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	info: String,
}

impl PluginCleaningData {
	pub fn new(crc: u32, cleaning_utility: impl Into<String>) -> Self {
		PluginCleaningData {
			crc,
			cleaning_utility: cleaning_utility.into(),
			..Default::default()
		}
	}

	pub fn with_counts(mut self, itm: u32, deleted_references: u32, deleted_navmeshes: u32) -> Self {
		self.itm_count = itm;
		self.deleted_reference_count = deleted_references;
		self.deleted_navmesh_count = deleted_navmeshes;
		self
	}

	pub fn with_info(mut self, info: impl Into<String>) -> Self {
		self.info = info.into();
		self
	}

	pub fn crc(&self) -> u32 {
		self.crc
	}

	pub fn cleaning_utility(&self) -> &str {
		&self.cleaning_utility
	}

	pub fn itm_count(&self) -> u32 {
		self.itm_count
	}

	pub fn deleted_reference_count(&self) -> u32 {
		self.deleted_reference_count
	}

	pub fn deleted_navmesh_count(&self) -> u32 {
		self.deleted_navmesh_count
	}

	pub fn info(&self) -> &str {
		&self.info
	}
}
