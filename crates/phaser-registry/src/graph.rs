//! Phase dependency graph.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: qualified phase names (`lower_files/flatten_blocks` for nested phases)
//! - Edges: `Requires` from a prerequisite to its dependent, `Contains` from
//!   a per-file phase to the phases it runs
//!
//! The graph is for inspection only. Execution order always comes from the
//! phase list itself.

use std::fmt;

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use phaser_core::PhaseId;

use crate::descriptor::PhaseSummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyEdge {
    Requires,
    Contains,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyEdge::Requires => write!(f, "requires"),
            DependencyEdge::Contains => write!(f, "contains"),
        }
    }
}

pub type DependencyGraph = DiGraph<String, DependencyEdge>;

/// Build the dependency graph of a list of phases and everything nested in it.
pub fn dependency_graph(phases: &[PhaseSummary]) -> DependencyGraph {
    let mut graph = DiGraph::new();
    add_level(&mut graph, phases, None, "");
    graph
}

fn add_level(
    graph: &mut DependencyGraph,
    level: &[PhaseSummary],
    parent: Option<NodeIndex>,
    prefix: &str,
) {
    let mut index: FxHashMap<PhaseId, NodeIndex> = FxHashMap::default();

    for summary in level {
        let name = format!("{}{}", prefix, summary.id);
        let node = graph.add_node(name.clone());
        index.insert(summary.id, node);

        if let Some(parent) = parent {
            graph.add_edge(parent, node, DependencyEdge::Contains);
        }
        for prerequisite in &summary.prerequisites {
            if let Some(&from) = index.get(prerequisite) {
                graph.add_edge(from, node, DependencyEdge::Requires);
            }
        }

        if !summary.children.is_empty() {
            add_level(graph, &summary.children, Some(node), &format!("{}/", name));
        }
    }
}

/// Render the graph in Graphviz DOT format.
pub fn to_dot(graph: &DependencyGraph) -> String {
    format!("{}", Dot::with_config(graph, &[Config::EdgeNoLabel]))
}
