//! Plugin sorting: the interaction graph, the group resolver and the
//! edge phases that turn metadata into a total load order.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{EdgeType, Vertex};

pub mod group_sort;

mod plugin_sorter;
mod plugin_sorting_data;

pub use plugin_sorter::PluginSorter;

pub(crate) use plugin_sorting_data::PluginSortingData;

#[derive(Clone, Copy, PartialEq)]
enum Colour {
	White,
	Grey,
	Black,
}

/// Depth-first search for a cycle, reporting the vertices on the first
/// one found together with the type of each vertex's incoming edge.
pub(crate) fn find_cycle<N, E>(
	graph: &DiGraph<N, E>,
	vertex_name: impl Fn(&N) -> String,
	edge_type: impl Fn(&E) -> EdgeType,
) -> Option<Vec<Vertex>> {
	let mut colours = vec![Colour::White; graph.node_count()];

	for start in graph.node_indices() {
		if colours[start.index()] != Colour::White {
			continue;
		}

		/* The root's recorded edge type is a placeholder; if the root
		closes a cycle its incoming edge is the back edge instead. */
		let mut path = vec![(start, EdgeType::TieBreak)];
		let cycle = visit(graph, &vertex_name, &edge_type, start, &mut colours, &mut path);
		if cycle.is_some() {
			return cycle;
		}
	}

	None
}

fn visit<N, E>(
	graph: &DiGraph<N, E>,
	vertex_name: &impl Fn(&N) -> String,
	edge_type: &impl Fn(&E) -> EdgeType,
	node: NodeIndex,
	colours: &mut [Colour],
	path: &mut Vec<(NodeIndex, EdgeType)>,
) -> Option<Vec<Vertex>> {
	colours[node.index()] = Colour::Grey;

	for edge in graph.edges(node) {
		let next = edge.target();
		let entering = edge_type(edge.weight());

		match colours[next.index()] {
			Colour::Grey => {
				/* Back edge: the cycle runs from `next` along the current
				path to `node`, closed by this edge. */
				let position = path
					.iter()
					.position(|(vertex, _)| *vertex == next)
					.unwrap_or(0);

				let cycle = path[position..]
					.iter()
					.enumerate()
					.map(|(offset, (vertex, edge_into))| {
						let incoming = if offset == 0 { entering } else { *edge_into };
						Vertex::new(vertex_name(&graph[*vertex]), incoming)
					})
					.collect();

				return Some(cycle);
			}
			Colour::White => {
				path.push((next, entering));
				let cycle = visit(graph, vertex_name, edge_type, next, colours, path);
				if cycle.is_some() {
					return cycle;
				}
				path.pop();
			}
			Colour::Black => {}
		}
	}

	colours[node.index()] = Colour::Black;

	None
}
