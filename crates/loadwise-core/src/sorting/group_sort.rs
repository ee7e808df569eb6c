//! Group graph closure and path finding.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{EdgeType, Error};
use crate::metadata::{Group, DEFAULT_GROUP_NAME};

/// Merges userlist groups into masterlist groups: groups defined in both
/// get the union of their after-groups. The `default` group is always
/// present. Output is sorted by group name.
pub fn merged_groups(masterlist_groups: &[Group], user_groups: &[Group]) -> Vec<Group> {
	let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

	for group in masterlist_groups.iter().chain(user_groups) {
		merged
			.entry(group.name().to_string())
			.or_default()
			.extend(group.after_groups().iter().cloned());
	}

	merged.entry(DEFAULT_GROUP_NAME.to_string()).or_default();

	merged
		.into_iter()
		.map(|(name, after_groups)| Group::new(name).with_after_groups(after_groups))
		.collect()
}

/// Maps every group to the transitive closure of its after-groups.
///
/// # Errors
/// [`Error::UndefinedGroup`] when a group names an after-group that does
/// not exist, [`Error::CyclicInteraction`] when the after relation is
/// cyclic.
pub fn transitive_after_groups(
	masterlist_groups: &[Group],
	user_groups: &[Group],
) -> crate::Result<HashMap<String, BTreeSet<String>>> {
	let groups = merged_groups(masterlist_groups, user_groups);

	let mut graph = DiGraph::<String, EdgeType>::new();
	let mut indices: HashMap<String, NodeIndex> = HashMap::new();

	for group in &groups {
		let index = graph.add_node(group.name().to_string());
		indices.insert(group.name().to_string(), index);
	}

	/* Edges run from each after-group to the group declaring it, so a
	group's transitive after-set is its ancestor set. */
	for group in &groups {
		let to = indices[group.name()];
		for after_group in group.after_groups() {
			let from = *indices
				.get(after_group)
				.ok_or_else(|| Error::UndefinedGroup(after_group.clone()))?;
			graph.add_edge(from, to, EdgeType::LoadAfter);
		}
	}

	if let Some(cycle) = super::find_cycle(&graph, |name| name.clone(), |&edge| edge) {
		return Err(Error::CyclicInteraction(cycle));
	}

	let mut closures = HashMap::new();
	for group in &groups {
		let mut closure = BTreeSet::new();
		let mut stack = vec![indices[group.name()]];
		let mut visited: HashSet<NodeIndex> = HashSet::new();

		while let Some(node) = stack.pop() {
			for ancestor in graph.neighbors_directed(node, Direction::Incoming) {
				if visited.insert(ancestor) {
					closure.insert(graph[ancestor].clone());
					stack.push(ancestor);
				}
			}
		}

		closures.insert(group.name().to_string(), closure);
	}

	Ok(closures)
}

/// The names of every group on any path from `last_group_name` back to
/// `first_group_name` through after-group links, excluding the last group
/// itself. Empty when no such path exists.
pub fn groups_in_paths(
	groups: &[Group],
	first_group_name: &str,
	last_group_name: &str,
) -> BTreeSet<String> {
	let by_name: HashMap<&str, &Group> = groups.iter().map(|g| (g.name(), g)).collect();

	let Some(last_group) = by_name.get(last_group_name) else {
		return BTreeSet::new();
	};

	let mut in_paths = pathfinder(last_group, first_group_name, &by_name, BTreeSet::new());
	in_paths.remove(last_group_name);

	in_paths
}

/// Walks after-group links from `group` looking for `target_name`,
/// returning every group on a path that reaches it. `visited` is passed
/// by value so each branch records its own path. Assumes the group graph
/// is acyclic.
fn pathfinder(
	group: &Group,
	target_name: &str,
	groups: &HashMap<&str, &Group>,
	mut visited: BTreeSet<String>,
) -> BTreeSet<String> {
	if group.name() == target_name {
		return visited;
	}

	if group.after_groups().is_empty() {
		return BTreeSet::new();
	}

	visited.insert(group.name().to_string());

	let mut merged = BTreeSet::new();
	for after_group in group.after_groups() {
		let Some(after_group) = groups.get(after_group.as_str()) else {
			continue;
		};

		merged.extend(pathfinder(after_group, target_name, groups, visited.clone()));
	}

	/* Empty means none of this group's after groups reach the target. */
	if merged.is_empty() {
		return merged;
	}

	visited.extend(merged);
	visited
}
