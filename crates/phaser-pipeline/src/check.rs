//! Invariant-check phases.
//!
//! A check only reads. It receives the context and the unit through shared
//! references even though the runner hands every body mutable ones, so a
//! check that tries to repair what it inspects does not compile.

use phaser_core::{CompilationContext, File, InvariantViolation, Module, NodeId, PhaseFailure};
use phaser_registry::{PhaseBody, PhaseKind};
use rustc_hash::FxHashSet;

/// A phase body asserting a structural property of its unit.
pub struct InvariantCheck<F>(pub F);

impl<U, F> PhaseBody<U> for InvariantCheck<F>
where
    F: Fn(&CompilationContext, &U) -> Result<(), InvariantViolation>,
{
    fn kind(&self) -> PhaseKind {
        PhaseKind::Check
    }

    fn run(&self, ctx: &mut CompilationContext, unit: &mut U) -> Result<(), PhaseFailure> {
        (self.0)(&*ctx, &*unit).map_err(PhaseFailure::from)
    }
}

/// Every reachable node's parent link names its structural parent.
///
/// The root must have no parent. Nodes are visited in pre-order and the
/// first offending node is reported. A child id past the end of the arena
/// or a node reachable through a second path is reported at the parent
/// that lists it.
pub fn check_parent_links(file: &File) -> Result<(), InvariantViolation> {
    let root = file.root();
    if let Some(parent) = file.node(root).parent {
        return Err(InvariantViolation::new(
            format!("root has parent link to {}", parent),
            file.node_ref(root),
        ));
    }

    let mut visited = FxHashSet::default();
    visited.insert(root);
    let mut stack = children_of(file, root);
    while let Some((parent, child)) = stack.pop() {
        let Some(node) = file.get(child) else {
            return Err(InvariantViolation::new("child id out of range", file.node_ref(parent)));
        };
        if !visited.insert(child) {
            return Err(InvariantViolation::new("node reachable twice", file.node_ref(parent)));
        }
        match node.parent {
            Some(p) if p == parent => {}
            Some(p) => {
                return Err(InvariantViolation::new(
                    format!("parent link points at {}, expected {}", p, parent),
                    file.node_ref(child),
                ));
            }
            None => {
                return Err(InvariantViolation::new("parent link is unset", file.node_ref(child)));
            }
        }
        stack.extend(children_of(file, child));
    }
    Ok(())
}

/// `(id, child)` pairs for `id`, reversed so popping yields them in order.
fn children_of(file: &File, id: NodeId) -> Vec<(NodeId, NodeId)> {
    file.node(id)
        .children
        .iter()
        .rev()
        .map(|&c| (id, c))
        .collect()
}

/// [`check_parent_links`] over every file, in stored order.
pub fn check_module_parent_links(module: &Module) -> Result<(), InvariantViolation> {
    module.files().iter().try_for_each(check_parent_links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaser_core::{FileBuilder, NodeKind, PhaseId};
    use phaser_registry::PhaseDescriptor;

    fn sample() -> (File, NodeId) {
        let mut b = FileBuilder::new("lib.src");
        let root = b.root();
        let f = b.function(root, "f");
        let block = b.block(f);
        let call = b.call(block, "g");
        (b.finish(), call)
    }

    #[test]
    fn well_formed_file_passes() {
        let (file, _) = sample();
        assert_eq!(check_parent_links(&file), Ok(()));
    }

    #[test]
    fn unset_link_names_the_node_until_repaired() {
        let (mut file, call) = sample();
        let parent = file.node(call).parent;
        file.node_mut(call).parent = None;

        let violation = check_parent_links(&file).unwrap_err();
        assert_eq!(violation.node, file.node_ref(call));
        assert_eq!(violation.description, "parent link is unset");

        file.node_mut(call).parent = parent;
        assert_eq!(check_parent_links(&file), Ok(()));
    }

    #[test]
    fn stale_link_is_reported_separately() {
        let (mut file, call) = sample();
        file.node_mut(call).parent = Some(file.root());

        let violation = check_parent_links(&file).unwrap_err();
        assert_eq!(violation.node.node, call);
        assert_eq!(
            violation.description,
            "parent link points at #0, expected #2"
        );
    }

    #[test]
    fn unreachable_nodes_are_ignored() {
        let (mut file, _) = sample();
        file.alloc(NodeKind::Literal(1), Some(NodeId::new(40)));
        assert_eq!(check_parent_links(&file), Ok(()));
    }

    #[test]
    fn cycles_are_reported_at_the_repeating_parent() {
        let (mut file, call) = sample();
        file.node_mut(call).children.push(NodeId::new(1));

        let violation = check_parent_links(&file).unwrap_err();
        assert_eq!(violation.node, file.node_ref(call));
        assert_eq!(violation.description, "node reachable twice");
    }

    #[test]
    fn dangling_child_ids_are_reported_at_the_parent() {
        let (mut file, call) = sample();
        let block = file.node(call).parent.unwrap();
        file.node_mut(block).children.push(NodeId::new(40));

        let violation = check_parent_links(&file).unwrap_err();
        assert_eq!(violation.node, file.node_ref(block));
        assert_eq!(violation.description, "child id out of range");
    }

    #[test]
    fn check_phase_reports_invariant_failure() {
        let (mut file, call) = sample();
        file.node_mut(call).parent = None;
        let module = Module::new("m").with_file(file);
        let phase = PhaseDescriptor::<Module>::new(
            PhaseId::new("check_links"),
            "parent links are consistent",
            InvariantCheck(|_: &CompilationContext, m: &Module| check_module_parent_links(m)),
        );

        let mut ctx = CompilationContext::default();
        let mut module = module;
        let failure = phase.body().run(&mut ctx, &mut module).unwrap_err();

        assert_eq!(phase.kind(), PhaseKind::Check);
        assert!(matches!(failure, PhaseFailure::Invariant(ref v) if v.node.node == call));
        assert_eq!(failure.location().map(|l| l.path.as_str()), Some("lib.src"));
    }
}
