//! Merged access to masterlist and userlist metadata.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::conditions::ConditionEvaluator;
use crate::metadata::{Group, Message, MetadataList, PluginMetadata};
use crate::sorting::group_sort;

/// Owns the loaded masterlist and userlist and answers merged metadata
/// queries, optionally with conditions evaluated.
pub struct Database {
	masterlist: MetadataList,
	userlist: MetadataList,
	condition_evaluator: Arc<ConditionEvaluator>,
}

impl Database {
	pub fn new(condition_evaluator: Arc<ConditionEvaluator>) -> Self {
		Database {
			masterlist: MetadataList::new(),
			userlist: MetadataList::new(),
			condition_evaluator,
		}
	}

	/* List management. Parsing catalogue files is the embedding
	application's concern; it hands over populated lists. */

	pub fn set_masterlist(&mut self, masterlist: MetadataList) {
		self.masterlist = masterlist;
	}

	pub fn set_userlist(&mut self, userlist: MetadataList) {
		self.userlist = userlist;
	}

	pub fn masterlist(&self) -> &MetadataList {
		&self.masterlist
	}

	pub fn userlist(&self) -> &MetadataList {
		&self.userlist
	}

	pub fn condition_evaluator(&self) -> &ConditionEvaluator {
		&self.condition_evaluator
	}

	/* Queries */

	pub fn get_known_bash_tags(&self) -> BTreeSet<String> {
		let mut tags = self.masterlist.bash_tags().clone();
		tags.extend(self.userlist.bash_tags().iter().cloned());
		tags
	}

	pub fn get_general_messages(&self, evaluate_conditions: bool) -> crate::Result<Vec<Message>> {
		let mut messages = self.masterlist.messages().to_vec();
		messages.extend(self.userlist.messages().iter().cloned());

		if evaluate_conditions {
			/* Evaluate from scratch: the data directory may have changed
			since the cache was filled. */
			self.condition_evaluator.clear_condition_cache();

			let mut evaluated = Vec::with_capacity(messages.len());
			for message in messages {
				if self.condition_evaluator.evaluate(message.condition())? {
					evaluated.push(message);
				}
			}
			messages = evaluated;
		}

		Ok(messages)
	}

	/// The groups defined in the masterlist, with userlist groups merged
	/// in when asked for. The `default` group is always present.
	pub fn get_groups(&self, include_user_metadata: bool) -> Vec<Group> {
		if include_user_metadata {
			group_sort::merged_groups(self.masterlist.groups(), self.userlist.groups())
		} else {
			group_sort::merged_groups(self.masterlist.groups(), &[])
		}
	}

	pub fn get_user_groups(&self) -> Vec<Group> {
		self.userlist.groups().to_vec()
	}

	pub fn set_user_groups(&mut self, groups: Vec<Group>) {
		self.userlist.set_groups(groups);
	}

	/// The names of the groups lying on any path between two groups in
	/// the merged group graph.
	pub fn get_groups_in_paths(&self, first_group: &str, last_group: &str) -> BTreeSet<String> {
		group_sort::groups_in_paths(&self.get_groups(true), first_group, last_group)
	}

	/// A plugin's merged metadata record. User metadata is merged over
	/// masterlist metadata when asked for, and conditions filter the
	/// record's sub-items when asked for.
	pub fn get_plugin_metadata(
		&self,
		plugin_name: &str,
		include_user_metadata: bool,
		evaluate_conditions: bool,
	) -> crate::Result<Option<PluginMetadata>> {
		let mut metadata = self.masterlist.find_plugin(plugin_name);

		if include_user_metadata {
			if let Some(user_metadata) = self.userlist.find_plugin(plugin_name) {
				match &mut metadata {
					Some(metadata) => metadata.merge_metadata(&user_metadata),
					None => metadata = Some(user_metadata),
				}
			}
		}

		match (evaluate_conditions, metadata) {
			(true, Some(metadata)) => self.condition_evaluator.evaluate_all(&metadata).map(Some),
			(_, metadata) => Ok(metadata),
		}
	}

	pub fn get_plugin_user_metadata(
		&self,
		plugin_name: &str,
		evaluate_conditions: bool,
	) -> crate::Result<Option<PluginMetadata>> {
		let metadata = self.userlist.find_plugin(plugin_name);

		match (evaluate_conditions, metadata) {
			(true, Some(metadata)) => self.condition_evaluator.evaluate_all(&metadata).map(Some),
			(_, metadata) => Ok(metadata),
		}
	}

	pub fn set_plugin_user_metadata(&mut self, plugin_metadata: PluginMetadata) {
		self.userlist.erase_plugin(plugin_metadata.name());
		self.userlist.add_plugin(plugin_metadata);
	}

	pub fn discard_plugin_user_metadata(&mut self, plugin_name: &str) {
		self.userlist.erase_plugin(plugin_name);
	}

	pub fn discard_all_user_metadata(&mut self) {
		self.userlist.clear();
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::game::GameType;
	use crate::metadata::{File, DEFAULT_GROUP_NAME};

	fn database() -> Database {
		Database::new(Arc::new(ConditionEvaluator::parse_only(GameType::Tes5)))
	}

	#[test]
	fn get_groups_always_contains_the_default_group() {
		let database = database();

		let groups = database.get_groups(true);
		assert!(groups.iter().any(|g| g.name() == DEFAULT_GROUP_NAME));
	}

	#[test]
	fn get_groups_merges_after_groups_of_shared_names() {
		let mut database = database();

		let mut masterlist = MetadataList::new();
		masterlist.set_groups(vec![
			Group::new("early"),
			Group::new("late").with_after_groups(["early"]),
		]);
		database.set_masterlist(masterlist);

		let mut userlist = MetadataList::new();
		userlist.set_groups(vec![Group::new("late").with_after_groups([DEFAULT_GROUP_NAME])]);
		database.set_userlist(userlist);

		let groups = database.get_groups(true);
		let late = groups.iter().find(|g| g.name() == "late").unwrap();

		assert!(late.after_groups().contains("early"));
		assert!(late.after_groups().contains(DEFAULT_GROUP_NAME));

		/* Without user metadata the userlist's addition disappears. */
		let groups = database.get_groups(false);
		let late = groups.iter().find(|g| g.name() == "late").unwrap();
		assert!(!late.after_groups().contains(DEFAULT_GROUP_NAME));
	}

	#[test]
	fn plugin_metadata_merges_user_over_masterlist() {
		let mut database = database();

		let mut masterlist = MetadataList::new();
		let mut record = PluginMetadata::new("A.esp");
		record.set_group("early");
		record.set_requirements(vec![File::new("B.esp")]);
		masterlist.add_plugin(record);
		database.set_masterlist(masterlist);

		let mut userlist = MetadataList::new();
		let mut record = PluginMetadata::new("A.esp");
		record.set_group("late");
		record.set_requirements(vec![File::new("C.esp")]);
		userlist.add_plugin(record);
		database.set_userlist(userlist);

		let merged = database
			.get_plugin_metadata("A.esp", true, false)
			.unwrap()
			.unwrap();

		assert_eq!(Some("late"), merged.group());
		assert_eq!(2, merged.requirements().len());

		let masterlist_only = database
			.get_plugin_metadata("A.esp", false, false)
			.unwrap()
			.unwrap();
		assert_eq!(Some("early"), masterlist_only.group());
	}

	#[test]
	fn user_metadata_can_be_discarded() {
		let mut database = database();

		let mut record = PluginMetadata::new("A.esp");
		record.set_group("late");
		database.set_plugin_user_metadata(record);

		assert!(database
			.get_plugin_user_metadata("A.esp", false)
			.unwrap()
			.is_some());

		database.discard_plugin_user_metadata("A.esp");
		assert!(database
			.get_plugin_user_metadata("A.esp", false)
			.unwrap()
			.is_none());
	}

	#[test]
	fn known_bash_tags_union_both_lists() {
		let mut database = database();

		let mut masterlist = MetadataList::new();
		masterlist.set_bash_tags(["Relev".to_string()].into());
		database.set_masterlist(masterlist);

		let mut userlist = MetadataList::new();
		userlist.set_bash_tags(["Delev".to_string(), "Relev".to_string()].into());
		database.set_userlist(userlist);

		let tags = database.get_known_bash_tags();
		assert_eq!(2, tags.len());
	}
}
