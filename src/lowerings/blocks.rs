//! Block flattening and parent-link repair.

use phaser_core::{CompilationContext, File, InvariantViolation, NodeId, NodeKind, PhaseFailure};
use phaser_pipeline::check_parent_links;

/// Replace every nested block by its statements.
///
/// Nodes lifted out of a block keep their old parent link; `patch_parents`
/// is expected to run next. Flattened blocks stay in the arena, detached.
pub fn flatten_blocks(ctx: &mut CompilationContext, file: &mut File) -> Result<(), PhaseFailure> {
    let mut flattened = 0;
    let mut expanded = vec![false; file.node_count()];

    for id in file.preorder() {
        if file.node(id).kind == NodeKind::Block {
            continue;
        }
        let children = file.node(id).children.clone();
        if !children.iter().any(|&c| is_block(file, c)) {
            continue;
        }

        let mut spliced = Vec::with_capacity(children.len());
        for child in children {
            flattened += splice(file, child, &mut spliced, &mut expanded);
        }
        file.node_mut(id).children = spliced;
    }

    if flattened > 0 {
        tracing::trace!(path = file.path(), flattened, "flattened blocks");
    }
    ctx.bump("blocks_flattened", flattened);
    Ok(())
}

fn is_block(file: &File, id: NodeId) -> bool {
    file.get(id).map(|n| &n.kind) == Some(&NodeKind::Block)
}

/// Push `id`, or the spliced contents of `id` if it is a block. Returns the
/// number of blocks removed.
///
/// A block is expanded at most once; a block reached again through a cycle
/// contributes nothing. Out-of-range ids are kept as they are.
fn splice(file: &File, id: NodeId, out: &mut Vec<NodeId>, expanded: &mut [bool]) -> u64 {
    if !is_block(file, id) {
        out.push(id);
        return 0;
    }
    if std::mem::replace(&mut expanded[id.index()], true) {
        return 0;
    }
    file.node(id)
        .children
        .iter()
        .map(|&child| splice(file, child, out, expanded))
        .sum::<u64>()
        + 1
}

/// Point every reachable node's parent link at its structural parent.
pub fn patch_parents(ctx: &mut CompilationContext, file: &mut File) -> Result<(), PhaseFailure> {
    let mut patched = 0;
    for (parent, child) in file.edges() {
        let node = file.node_mut(child);
        if node.parent != Some(parent) {
            node.parent = Some(parent);
            patched += 1;
        }
    }
    ctx.bump("parents_patched", patched);
    Ok(())
}

pub fn check_parents(_: &CompilationContext, file: &File) -> Result<(), InvariantViolation> {
    check_parent_links(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaser_core::FileBuilder;

    /// `fun main { block { block { lit 1 } call f } lit 2 }`
    fn nested() -> (File, NodeId, NodeId, NodeId) {
        let mut b = FileBuilder::new("main.src");
        let root = b.root();
        let main = b.function(root, "main");
        let outer = b.block(main);
        let inner = b.block(outer);
        let one = b.literal(inner, 1);
        let call = b.call(outer, "f");
        b.literal(main, 2);
        (b.finish(), main, one, call)
    }

    fn kinds(file: &File, id: NodeId) -> Vec<String> {
        file.node(id)
            .children
            .iter()
            .map(|&c| file.node(c).kind.to_string())
            .collect()
    }

    #[test]
    fn nested_blocks_are_spliced_in_order() {
        let (mut file, main, _, _) = nested();
        let mut ctx = CompilationContext::default();

        flatten_blocks(&mut ctx, &mut file).unwrap();

        assert_eq!(kinds(&file, main), ["lit 1", "call f -> ?", "lit 2"]);
        assert_eq!(ctx.statistic("blocks_flattened"), 2);
        let order = file.preorder();
        assert!(order.iter().all(|&id| !is_block(&file, id)));
    }

    #[test]
    fn flattening_leaves_links_stale_until_patched() {
        let (mut file, main, one, call) = nested();
        let mut ctx = CompilationContext::default();

        flatten_blocks(&mut ctx, &mut file).unwrap();
        let violation = check_parents(&ctx, &file).unwrap_err();
        assert_eq!(violation.node, file.node_ref(one));

        patch_parents(&mut ctx, &mut file).unwrap();
        assert_eq!(check_parents(&ctx, &file), Ok(()));
        assert_eq!(file.node(one).parent, Some(main));
        assert_eq!(file.node(call).parent, Some(main));
        assert_eq!(ctx.statistic("parents_patched"), 2);
    }

    #[test]
    fn self_containing_block_is_expanded_once() {
        let (mut file, main, one, call) = nested();
        let outer = file.node(call).parent.unwrap();
        file.node_mut(outer).children.push(outer);
        file.node_mut(outer).children.push(NodeId::new(50));
        let mut ctx = CompilationContext::default();

        flatten_blocks(&mut ctx, &mut file).unwrap();

        let spliced = [one, call, NodeId::new(50), NodeId::new(6)];
        assert_eq!(file.node(main).children, spliced);
        assert_eq!(ctx.statistic("blocks_flattened"), 2);
    }

    #[test]
    fn file_without_blocks_is_untouched() {
        let mut b = FileBuilder::new("flat.src");
        let root = b.root();
        let f = b.function(root, "f");
        b.call(f, "g");
        let mut file = b.finish();
        let before = file.clone();
        let mut ctx = CompilationContext::default();

        flatten_blocks(&mut ctx, &mut file).unwrap();
        patch_parents(&mut ctx, &mut file).unwrap();

        assert_eq!(file, before);
        assert_eq!(ctx.statistic("blocks_flattened"), 0);
    }
}
