//! Phase registry for the phaser lowering pipeline.
//!
//! - [`descriptor`]: [`PhaseDescriptor`] and the [`PhaseBody`] contract
//! - [`list`]: [`OrderedPhaseList`] and prerequisite-order validation
//! - [`graph`]: dependency graph export for inspection

pub mod descriptor;
pub mod graph;
pub mod list;

pub use descriptor::{PhaseBody, PhaseDescriptor, PhaseKind, PhaseSummary, Transform};
pub use graph::{DependencyEdge, DependencyGraph, dependency_graph, to_dot};
pub use list::{OrderedPhaseList, check_order, validate};
