use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// How two plugins or groups are linked in an interaction graph.
///
/// Variants are ordered from strongest to weakest: an edge added by an
/// earlier sorting phase can never be displaced by a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeType {
	Hardcoded,
	MasterFlag,
	Master,
	MasterlistRequirement,
	UserRequirement,
	MasterlistLoadAfter,
	UserLoadAfter,
	/// Links two groups in the group graph, not two plugins.
	LoadAfter,
	Group,
	Overlap,
	TieBreak,
}

impl EdgeType {
	pub fn description(self) -> &'static str {
		match self {
			EdgeType::Hardcoded => "Hardcoded",
			EdgeType::MasterFlag => "Master Flag",
			EdgeType::Master => "Master",
			EdgeType::MasterlistRequirement => "Masterlist Requirement",
			EdgeType::UserRequirement => "User Requirement",
			EdgeType::MasterlistLoadAfter => "Masterlist Load After",
			EdgeType::UserLoadAfter => "User Load After",
			EdgeType::LoadAfter => "Load After",
			EdgeType::Group => "Group",
			EdgeType::Overlap => "Overlap",
			EdgeType::TieBreak => "Tie Break",
		}
	}
}

impl fmt::Display for EdgeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.description())
	}
}

/// One element of a reported interaction cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
	name: String,
	incoming_edge_type: EdgeType,
}

impl Vertex {
	pub fn new(name: String, incoming_edge_type: EdgeType) -> Self {
		Vertex {
			name,
			incoming_edge_type,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The type of the edge leading to this vertex from the previous
	/// vertex in the cycle.
	pub fn incoming_edge_type(&self) -> EdgeType {
		self.incoming_edge_type
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A plugin or group graph contains a cycle, so no load order exists.
	#[error("cyclic interaction detected: {}", describe_cycle(.0))]
	CyclicInteraction(Vec<Vertex>),
	/// A plugin's metadata places it in a group that does not exist.
	#[error("the group \"{0}\" does not exist")]
	UndefinedGroup(String),
	/// A condition string could not be parsed, or contains an invalid
	/// path or regex.
	#[error("{0}")]
	ConditionSyntax(String),
	#[error("failed to access \"{}\": {source}", .path.display())]
	FileAccess {
		path: std::path::PathBuf,
		source: std::io::Error,
	},
}

fn describe_cycle(cycle: &[Vertex]) -> String {
	/* Each vertex records the type of the edge leading into it, so the
	label printed between two vertices is taken from the later one. */
	let mut description = String::new();
	for (position, vertex) in cycle.iter().enumerate() {
		let next = cycle.get(position + 1).or_else(|| cycle.first());
		description.push_str(vertex.name());
		if let Some(next) = next {
			description.push_str(" --[");
			description.push_str(next.incoming_edge_type().description());
			description.push_str("]--> ");
		}
	}
	description.push_str(cycle.first().map(Vertex::name).unwrap_or_default());
	description
}
