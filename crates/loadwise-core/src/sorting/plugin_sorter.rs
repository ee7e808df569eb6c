//! Builds the plugin interaction graph and derives a total load order
//! from it.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{EdgeType, Error, Vertex};
use crate::game::{Game, GameType};
use crate::helpers::{compare_filenames, filenames_equal, ghosted};
use crate::metadata::{Group, PluginMetadata, DEFAULT_GROUP_NAME};

use super::group_sort;
use super::PluginSortingData;

type PluginGraph = DiGraph<PluginSortingData, EdgeType>;

/// Sorts a game's plugins into a load order that satisfies every hard
/// constraint and as many soft preferences as possible.
///
/// Edges are added to the plugin graph in phases, each weaker than the
/// last: master flags and masters, then hardcoded positions, then group
/// memberships, then record overlaps, and finally tie breaks. A phase
/// never adds an edge that would contradict an earlier one, so stronger
/// constraints always win.
#[derive(Default)]
pub struct PluginSorter {
	graph: PluginGraph,
	/* Ordered pairs known to be reachable through existing edges. An
	approximation filled in by cycle prediction, not a full transitive
	closure; sound for the short-circuits it is used for. */
	paths_cache: HashSet<(NodeIndex, NodeIndex)>,
	groups: Vec<Group>,
}

impl PluginSorter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sorts the plugins in the game's cache, returning their names in
	/// load order.
	pub fn sort(&mut self, game: &Game) -> crate::Result<Vec<String>> {
		/* Clear any state left by a previous sort. */
		self.graph.clear();
		self.paths_cache.clear();
		self.groups.clear();

		self.add_plugin_vertices(game)?;

		/* Everything below assumes there is at least one plugin. */
		if self.graph.node_count() == 0 {
			return Ok(Vec::new());
		}

		log::info!("Current load order:");
		for plugin in game.load_order() {
			log::info!("\t{}", plugin);
		}

		self.add_specific_edges();
		self.add_hardcoded_plugin_edges(game);
		self.add_group_edges();
		self.add_overlap_edges();
		self.add_tie_break_edges();

		self.check_for_cycles()?;

		log::trace!("Performing topological sort on plugin graph...");
		let sorted_vertices = match petgraph::algo::toposort(&self.graph, None) {
			Ok(vertices) => vertices,
			/* Unreachable after the cycle check above. */
			Err(_) => {
				return Err(Error::CyclicInteraction(
					self.first_cycle().unwrap_or_default(),
				))
			}
		};

		/* The tie-break phase leaves every pair of vertices connected, so
		the topological order should be a Hamiltonian path. If it is not,
		a phase above has a bug. */
		log::trace!("Checking uniqueness of calculated load order...");
		for pair in sorted_vertices.windows(2) {
			if self.graph.find_edge(pair[0], pair[1]).is_none() {
				log::error!(
					"The calculated load order is not unique. No edge exists between {} and {}.",
					self.graph[pair[0]].name(),
					self.graph[pair[1]].name()
				);
			}
		}

		let plugins: Vec<String> = sorted_vertices
			.iter()
			.map(|&vertex| self.graph[vertex].name().to_string())
			.collect();

		log::info!("Calculated order:");
		for plugin in &plugins {
			log::info!("\t{}", plugin);
		}

		Ok(plugins)
	}

	/// Creates one vertex per cached plugin and attributes each group's
	/// transitive after-groups to the plugins in those groups.
	fn add_plugin_vertices(&mut self, game: &Game) -> crate::Result<()> {
		/* Vertices are created in the order the cache yields plugins
		(sorted by lowercased filename). Tie-break resolution depends on
		vertex iteration order, so this order must be stable for sorting
		to be deterministic. */
		let load_order = game.load_order();
		let mut group_plugins: HashMap<String, Vec<String>> = HashMap::new();

		for plugin in game.cache().plugins() {
			let masterlist_metadata = game
				.database()
				.get_plugin_metadata(plugin.name(), false, true)?
				.unwrap_or_else(|| PluginMetadata::new(plugin.name()));
			let user_metadata = game
				.database()
				.get_plugin_user_metadata(plugin.name(), true)?
				.unwrap_or_else(|| PluginMetadata::new(plugin.name()));

			let sorting_data =
				PluginSortingData::new(plugin, &masterlist_metadata, &user_metadata, &load_order);

			group_plugins
				.entry(sorting_data.group().to_string())
				.or_default()
				.push(sorting_data.name().to_string());

			self.graph.add_node(sorting_data);
		}

		self.groups = game.database().get_groups(true);

		/* Map each group's transitive after-groups to the plugins those
		groups contain. */
		let closures = group_sort::transitive_after_groups(
			&game.database().get_groups(false),
			&game.database().get_user_groups(),
		)?;

		let mut transitive_plugins: HashMap<String, BTreeSet<String>> = HashMap::new();
		for (group_name, after_groups) in &closures {
			let mut plugins = BTreeSet::new();
			for after_group in after_groups {
				if let Some(names) = group_plugins.get(after_group) {
					plugins.extend(names.iter().cloned());
				}
			}
			transitive_plugins.insert(group_name.clone(), plugins);
		}

		for vertex in self.graph.node_indices().collect::<Vec<_>>() {
			let group = self.graph[vertex].group().to_string();

			log::trace!(
				"Plugin \"{}\" belongs to group \"{}\", setting after group plugins",
				self.graph[vertex].name(),
				group
			);

			match transitive_plugins.get(&group) {
				Some(plugins) => self.graph[vertex].set_after_group_plugins(plugins.clone()),
				None => return Err(Error::UndefinedGroup(group)),
			}
		}

		Ok(())
	}

	fn vertex_by_name(&self, name: &str) -> Option<NodeIndex> {
		self.graph
			.node_indices()
			.find(|&vertex| filenames_equal(self.graph[vertex].name(), name))
	}

	/// Whether adding the edge `from -> to` would close a cycle.
	///
	/// Runs a bidirectional breadth-first search: forward from the edge's
	/// head and backward from its tail. Reachability discovered on the
	/// way is banked in the paths cache for later short-circuits.
	fn edge_creates_cycle(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
		if self.paths_cache.contains(&(to, from)) {
			return true;
		}

		let start = to;
		let end = from;

		let mut forward_queue = VecDeque::from([start]);
		let mut reverse_queue = VecDeque::from([end]);
		let mut forward_visited = HashSet::from([start]);
		let mut reverse_visited = HashSet::from([end]);

		while !forward_queue.is_empty() && !reverse_queue.is_empty() {
			if let Some(vertex) = forward_queue.pop_front() {
				if vertex == end || reverse_visited.contains(&vertex) {
					return true;
				}

				for adjacent in self.graph.neighbors_directed(vertex, Direction::Outgoing) {
					if forward_visited.insert(adjacent) {
						self.paths_cache.insert((start, adjacent));
						forward_queue.push_back(adjacent);
					}
				}
			}

			if let Some(vertex) = reverse_queue.pop_front() {
				if vertex == start || forward_visited.contains(&vertex) {
					return true;
				}

				for adjacent in self.graph.neighbors_directed(vertex, Direction::Incoming) {
					if reverse_visited.insert(adjacent) {
						self.paths_cache.insert((adjacent, end));
						reverse_queue.push_back(adjacent);
					}
				}
			}
		}

		false
	}

	/// Adds an edge unless the pair is already known to be connected,
	/// which keeps the graph free of redundant parallel edges.
	fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge_type: EdgeType) {
		if self.paths_cache.contains(&(from, to)) {
			return;
		}

		log::trace!(
			"Adding {} edge from \"{}\" to \"{}\".",
			edge_type,
			self.graph[from].name(),
			self.graph[to].name()
		);

		self.graph.add_edge(from, to, edge_type);
		self.paths_cache.insert((from, to));
	}

	/// Adds the edges for every relationship that isn't an overlap:
	/// master flags, masters, requirements and load-after files.
	fn add_specific_edges(&mut self) {
		let vertices: Vec<NodeIndex> = self.graph.node_indices().collect();

		for (position, &vertex) in vertices.iter().enumerate() {
			for &other_vertex in &vertices[position..] {
				if self.graph[vertex].is_master() == self.graph[other_vertex].is_master() {
					continue;
				}

				let (parent, child) = if self.graph[other_vertex].is_master() {
					(other_vertex, vertex)
				} else {
					(vertex, other_vertex)
				};

				self.add_edge(parent, child, EdgeType::MasterFlag);
			}

			/* A referenced file with no vertex is not installed. That is
			expected for load-after entries, and a missing master or
			requirement is reported outside the sorter. */
			let masters = self.graph[vertex].masters().to_vec();
			for master in masters {
				if let Some(parent) = self.vertex_by_name(&master) {
					self.add_edge(parent, vertex, EdgeType::Master);
				}
			}

			let files = self.graph[vertex].masterlist_requirements().to_vec();
			for file in files {
				if let Some(parent) = self.vertex_by_name(&file) {
					self.add_edge(parent, vertex, EdgeType::MasterlistRequirement);
				}
			}

			let files = self.graph[vertex].user_requirements().to_vec();
			for file in files {
				if let Some(parent) = self.vertex_by_name(&file) {
					self.add_edge(parent, vertex, EdgeType::UserRequirement);
				}
			}

			let files = self.graph[vertex].masterlist_load_after().to_vec();
			for file in files {
				if let Some(parent) = self.vertex_by_name(&file) {
					self.add_edge(parent, vertex, EdgeType::MasterlistLoadAfter);
				}
			}

			let files = self.graph[vertex].user_load_after().to_vec();
			for file in files {
				if let Some(parent) = self.vertex_by_name(&file) {
					self.add_edge(parent, vertex, EdgeType::UserLoadAfter);
				}
			}
		}
	}

	/// Orders each implicitly active plugin before every plugin whose
	/// canonical path has not already been processed.
	fn add_hardcoded_plugin_edges(&mut self, game: &Game) {
		let implicitly_active_plugins = game.load_order_handler().implicitly_active_plugins();

		let mut processed_plugin_paths: HashSet<PathBuf> = HashSet::new();
		for plugin in &implicitly_active_plugins {
			let plugin_path = game.data_path().join(plugin);

			match std::fs::canonicalize(&plugin_path) {
				Ok(canonical) => {
					processed_plugin_paths.insert(canonical);
				}
				Err(error) => {
					log::trace!(
						"Skipping adding hardcoded plugin edges for \"{}\" as its canonical path could not be determined: {}",
						plugin,
						error
					);
					continue;
				}
			}

			/* Update.esm is implicitly active on Skyrim but has no
			hardcoded position. */
			if game.game_type() == GameType::Tes5 && filenames_equal(plugin, "Update.esm") {
				log::trace!(
					"Skipping adding hardcoded plugin edges for Update.esm as it does not have a hardcoded position."
				);
				continue;
			}

			let Some(plugin_vertex) = self.vertex_by_name(plugin) else {
				log::trace!(
					"Skipping adding hardcoded plugin edges for \"{}\" as it has not been loaded.",
					plugin
				);
				continue;
			};

			let vertices: Vec<NodeIndex> = self.graph.node_indices().collect();
			for vertex in vertices {
				let mut graph_plugin_path = game.data_path().join(self.graph[vertex].name());
				if !graph_plugin_path.exists() {
					graph_plugin_path = ghosted(&graph_plugin_path);
				}

				if !graph_plugin_path.exists() {
					continue;
				}

				let canonical = match std::fs::canonicalize(&graph_plugin_path) {
					Ok(canonical) => canonical,
					Err(error) => {
						log::trace!(
							"Skipping hardcoded edge to \"{}\" as its canonical path could not be determined: {}",
							self.graph[vertex].name(),
							error
						);
						continue;
					}
				};

				if !processed_plugin_paths.contains(&canonical) {
					self.add_edge(plugin_vertex, vertex, EdgeType::Hardcoded);
				}
			}
		}
	}

	/// Adds the edges derived from group memberships. A group edge that
	/// would close a cycle is dropped rather than failing the sort, and
	/// may additionally get the offending plugin's group ignored across
	/// the groups between the two involved.
	fn add_group_edges(&mut self) {
		let mut acyclic_edge_pairs: Vec<(NodeIndex, NodeIndex)> = Vec::new();
		let mut group_plugins_to_ignore: HashMap<String, HashSet<String>> = HashMap::new();

		let vertices: Vec<NodeIndex> = self.graph.node_indices().collect();
		for &vertex in &vertices {
			let after_group_plugins: Vec<String> = self.graph[vertex]
				.after_group_plugins()
				.iter()
				.cloned()
				.collect();

			for plugin_name in after_group_plugins {
				let Some(parent_vertex) = self.vertex_by_name(&plugin_name) else {
					continue;
				};

				if !self.edge_creates_cycle(parent_vertex, vertex) {
					acyclic_edge_pairs.push((parent_vertex, vertex));
					continue;
				}

				let from_plugin = &self.graph[parent_vertex];
				let to_plugin = &self.graph[vertex];

				log::trace!(
					"Skipping group edge from \"{}\" to \"{}\" as it would create a cycle.",
					from_plugin.name(),
					to_plugin.name()
				);

				/* If the earlier plugin is not a master and the later one
				is, the master-flag edges already order the pair the other
				way round. Ignoring a group here could suppress edges for
				masters that are not involved in the cycle at all. */
				if !from_plugin.is_master() && to_plugin.is_master() {
					continue;
				}

				/* The default group is the one given to plugins with no
				metadata. When such a plugin's group edge closes a cycle,
				ignore its group for every group on the paths between the
				two groups involved. If neither plugin is in the default
				group there is no principled choice, so ignore neither. */
				let plugin_to_ignore = if to_plugin.group() == DEFAULT_GROUP_NAME {
					to_plugin.name().to_string()
				} else if from_plugin.group() == DEFAULT_GROUP_NAME {
					from_plugin.name().to_string()
				} else {
					continue;
				};

				let groups_in_paths = group_sort::groups_in_paths(
					&self.groups,
					from_plugin.group(),
					to_plugin.group(),
				);

				ignore_plugin(
					&plugin_to_ignore,
					&groups_in_paths,
					&mut group_plugins_to_ignore,
				);
			}
		}

		for (from, to) in acyclic_edge_pairs {
			let ignore =
				should_ignore_group_edge(&self.graph[from], &self.graph[to], &group_plugins_to_ignore);

			if !ignore {
				self.add_edge(from, to, EdgeType::Group);
			} else {
				log::trace!(
					"Skipping group edge from \"{}\" to \"{}\" as it would create a multi-group cycle.",
					self.graph[from].name(),
					self.graph[to].name()
				);
			}
		}
	}

	/// Orders plugins that override some of the same records: the one
	/// that overrides more loads first, so the more specific plugin wins
	/// the conflicts.
	fn add_overlap_edges(&mut self) {
		let vertices: Vec<NodeIndex> = self.graph.node_indices().collect();

		for (position, &vertex) in vertices.iter().enumerate() {
			if self.graph[vertex].num_override_form_ids() == 0 {
				log::trace!(
					"Skipping vertex for \"{}\": the plugin contains no override records.",
					self.graph[vertex].name()
				);
				continue;
			}

			for &other_vertex in &vertices[position + 1..] {
				if self.graph.find_edge(vertex, other_vertex).is_some()
					|| self.graph.find_edge(other_vertex, vertex).is_some()
					|| self.graph[vertex].num_override_form_ids()
						== self.graph[other_vertex].num_override_form_ids()
					|| !self.graph[vertex].do_form_ids_overlap(&self.graph[other_vertex])
				{
					continue;
				}

				let (from, to) = if self.graph[vertex].num_override_form_ids()
					> self.graph[other_vertex].num_override_form_ids()
				{
					(vertex, other_vertex)
				} else {
					(other_vertex, vertex)
				};

				if !self.edge_creates_cycle(from, to) {
					self.add_edge(from, to, EdgeType::Overlap);
				}
			}
		}
	}

	/// Connects every remaining unordered pair so the topological order
	/// is unique, using the current load order to pick directions.
	fn add_tie_break_edges(&mut self) {
		let vertices: Vec<NodeIndex> = self.graph.node_indices().collect();

		for (position, &vertex) in vertices.iter().enumerate() {
			for &other_vertex in &vertices[position + 1..] {
				let (from, to) =
					if compare_plugins(&self.graph[vertex], &self.graph[other_vertex])
						== Ordering::Less
					{
						(vertex, other_vertex)
					} else {
						(other_vertex, vertex)
					};

				if !self.edge_creates_cycle(from, to) {
					self.add_edge(from, to, EdgeType::TieBreak);
				}
			}
		}
	}

	fn check_for_cycles(&self) -> crate::Result<()> {
		log::trace!("Checking plugin graph for cycles...");

		match self.first_cycle() {
			Some(cycle) => Err(Error::CyclicInteraction(cycle)),
			None => Ok(()),
		}
	}

	fn first_cycle(&self) -> Option<Vec<Vertex>> {
		super::find_cycle(
			&self.graph,
			|plugin: &PluginSortingData| plugin.name().to_string(),
			|&edge| edge,
		)
	}
}

/// The tie-break comparator: plugins in the current load order come
/// first, in their current order; the rest order by basename and then by
/// extension.
fn compare_plugins(lhs: &PluginSortingData, rhs: &PluginSortingData) -> Ordering {
	match (lhs.load_order_index(), rhs.load_order_index()) {
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(Some(lhs_index), Some(rhs_index)) => lhs_index.cmp(&rhs_index),
		(None, None) => {
			let (lhs_basename, lhs_extension) = split_extension(lhs.name());
			let (rhs_basename, rhs_extension) = split_extension(rhs.name());

			/* A .esp and .esm pair can share a basename, so compare the
			extensions as well. */
			compare_filenames(lhs_basename, rhs_basename)
				.then_with(|| compare_filenames(lhs_extension, rhs_extension))
		}
	}
}

/// Splits a plugin filename into its basename and its four-character
/// extension.
fn split_extension(name: &str) -> (&str, &str) {
	if name.len() >= 4 && name.is_char_boundary(name.len() - 4) {
		name.split_at(name.len() - 4)
	} else {
		(name, "")
	}
}

fn should_ignore_plugin(
	group: &str,
	plugin_name: &str,
	group_plugins_to_ignore: &HashMap<String, HashSet<String>>,
) -> bool {
	group_plugins_to_ignore
		.get(group)
		.map(|plugins| plugins.contains(plugin_name))
		.unwrap_or(false)
}

fn should_ignore_group_edge(
	from_plugin: &PluginSortingData,
	to_plugin: &PluginSortingData,
	group_plugins_to_ignore: &HashMap<String, HashSet<String>>,
) -> bool {
	should_ignore_plugin(from_plugin.group(), to_plugin.name(), group_plugins_to_ignore)
		|| should_ignore_plugin(to_plugin.group(), from_plugin.name(), group_plugins_to_ignore)
}

fn ignore_plugin(
	plugin_name: &str,
	groups: &BTreeSet<String>,
	group_plugins_to_ignore: &mut HashMap<String, HashSet<String>>,
) {
	for group in groups {
		group_plugins_to_ignore
			.entry(group.clone())
			.or_default()
			.insert(plugin_name.to_string());
	}
}

#[cfg(test)]
mod test {
	use std::collections::HashSet;
	use std::sync::Arc;

	use super::*;
	use crate::plugin::PluginInterface;

	#[derive(Debug, Default)]
	struct TestPlugin {
		name: String,
		override_form_ids: HashSet<u32>,
	}

	impl PluginInterface for TestPlugin {
		fn name(&self) -> &str {
			&self.name
		}
		fn is_master(&self) -> bool {
			false
		}
		fn masters(&self) -> &[String] {
			&[]
		}
		fn override_form_ids(&self) -> &HashSet<u32> {
			&self.override_form_ids
		}
		fn version(&self) -> Option<&str> {
			None
		}
		fn crc(&self) -> Option<u32> {
			None
		}
	}

	fn sorting_data(name: &str, load_order: &[String]) -> PluginSortingData {
		PluginSortingData::new(
			Arc::new(TestPlugin {
				name: name.to_string(),
				..Default::default()
			}),
			&PluginMetadata::new(name),
			&PluginMetadata::new(name),
			load_order,
		)
	}

	#[test]
	fn plugins_in_the_load_order_come_before_ones_that_are_not() {
		let load_order = vec!["b.esp".to_string()];

		let in_order = sorting_data("b.esp", &load_order);
		let not_in_order = sorting_data("a.esp", &load_order);

		assert_eq!(Ordering::Less, compare_plugins(&in_order, &not_in_order));
		assert_eq!(Ordering::Greater, compare_plugins(&not_in_order, &in_order));
	}

	#[test]
	fn load_order_indices_decide_between_two_positioned_plugins() {
		let load_order = vec!["b.esp".to_string(), "a.esp".to_string()];

		let first = sorting_data("b.esp", &load_order);
		let second = sorting_data("a.esp", &load_order);

		assert_eq!(Ordering::Less, compare_plugins(&first, &second));
	}

	#[test]
	fn unpositioned_plugins_compare_by_basename_then_extension() {
		let load_order = Vec::new();

		let esp = sorting_data("Alpha.esp", &load_order);
		let esm = sorting_data("alpha.esm", &load_order);
		let beta = sorting_data("beta.esp", &load_order);

		assert_eq!(Ordering::Less, compare_plugins(&esm, &esp));
		assert_eq!(Ordering::Less, compare_plugins(&esp, &beta));
	}

	#[test]
	fn split_extension_takes_the_last_four_characters() {
		assert_eq!(("Alpha", ".esp"), split_extension("Alpha.esp"));
		assert_eq!(("", ".esp"), split_extension(".esp"));
		assert_eq!(("abc", ""), split_extension("abc"));
	}
}
