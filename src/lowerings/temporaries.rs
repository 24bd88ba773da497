//! Temporaries for call results.

use phaser_core::{CompilationContext, File, InvariantViolation, NodeId, NodeKind, PhaseFailure};

/// Next temporary number in the current file.
///
/// Kept in the file's scratch, so numbering starts over at `tmp0` in every
/// file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TemporaryCounter(pub u32);

fn is_call(file: &File, id: NodeId) -> bool {
    matches!(file.get(id).map(|n| &n.kind), Some(NodeKind::Call { .. }))
}

/// Wrap every call not already in a temporary in a fresh one.
pub fn introduce_temporaries(
    ctx: &mut CompilationContext,
    file: &mut File,
) -> Result<(), PhaseFailure> {
    let mut introduced = 0;

    for (parent, call) in file.edges() {
        let wrapped = matches!(file.node(parent).kind, NodeKind::Temporary { .. });
        if wrapped || !is_call(file, call) {
            continue;
        }

        let counter = ctx.scratch().get_or_default::<TemporaryCounter>();
        let name = format!("tmp{}", counter.0);
        counter.0 += 1;

        let temporary = file.alloc(NodeKind::Temporary { name }, Some(parent));
        file.node_mut(temporary).children.push(call);
        file.node_mut(call).parent = Some(temporary);
        for slot in file.node_mut(parent).children.iter_mut() {
            if *slot == call {
                *slot = temporary;
            }
        }
        introduced += 1;
    }

    ctx.bump("temporaries", introduced);
    Ok(())
}

/// Every temporary holds exactly one call and every call sits in a temporary.
pub fn check_temporaries(_: &CompilationContext, file: &File) -> Result<(), InvariantViolation> {
    for (parent, child) in file.edges() {
        let in_temporary = matches!(file.node(parent).kind, NodeKind::Temporary { .. });
        if is_call(file, child) && !in_temporary {
            return Err(InvariantViolation::new(
                "call result is not bound to a temporary",
                file.node_ref(child),
            ));
        }
    }

    for id in file.preorder() {
        let node = file.node(id);
        if !matches!(node.kind, NodeKind::Temporary { .. }) {
            continue;
        }
        match node.children.as_slice() {
            [only] if is_call(file, *only) => {}
            children => {
                return Err(InvariantViolation::new(
                    format!(
                        "temporary must hold one call, holds {} nodes",
                        children.len()
                    ),
                    file.node_ref(id),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaser_core::FileBuilder;

    fn two_calls() -> File {
        let mut b = FileBuilder::new("a.src");
        let root = b.root();
        let main = b.function(root, "main");
        b.call(main, "f");
        b.literal(main, 0);
        b.call(main, "g");
        b.finish()
    }

    #[test]
    fn calls_are_wrapped_in_numbered_temporaries() {
        let mut file = two_calls();
        let mut ctx = CompilationContext::default();

        introduce_temporaries(&mut ctx, &mut file).unwrap();

        let rendered = file.render();
        assert!(rendered.contains("tmp tmp0"));
        assert!(rendered.contains("tmp tmp1"));
        assert_eq!(check_temporaries(&ctx, &file), Ok(()));
        assert_eq!(phaser_pipeline::check_parent_links(&file), Ok(()));
        assert_eq!(
            ctx.scratch().get::<TemporaryCounter>(),
            Some(&TemporaryCounter(2))
        );
    }

    #[test]
    fn running_twice_adds_nothing() {
        let mut file = two_calls();
        let mut ctx = CompilationContext::default();

        introduce_temporaries(&mut ctx, &mut file).unwrap();
        let once = file.render();
        introduce_temporaries(&mut ctx, &mut file).unwrap();

        assert_eq!(file.render(), once);
        assert_eq!(ctx.statistic("temporaries"), 2);
    }

    #[test]
    fn unwrapped_call_is_reported() {
        let file = two_calls();
        let ctx = CompilationContext::default();
        let violation = check_temporaries(&ctx, &file).unwrap_err();
        assert_eq!(
            violation.description,
            "call result is not bound to a temporary"
        );
        assert_eq!(violation.node.node.index(), 2);
    }

    #[test]
    fn temporary_holding_a_dangling_id_is_reported() {
        let mut file = two_calls();
        let mut ctx = CompilationContext::default();
        introduce_temporaries(&mut ctx, &mut file).unwrap();
        let tmp = file.node(NodeId::new(2)).parent.unwrap();
        file.node_mut(tmp).children = vec![NodeId::new(80)];

        let violation = check_temporaries(&ctx, &file).unwrap_err();
        assert_eq!(violation.node, file.node_ref(tmp));
        assert_eq!(
            violation.description,
            "temporary must hold one call, holds 1 nodes"
        );
    }

    #[test]
    fn empty_temporary_is_reported() {
        let mut file = two_calls();
        let root = file.root();
        let tmp = file.add_child(
            root,
            NodeKind::Temporary {
                name: "tmp9".into(),
            },
        );
        let mut ctx = CompilationContext::default();
        introduce_temporaries(&mut ctx, &mut file).unwrap();

        let violation = check_temporaries(&ctx, &file).unwrap_err();
        assert_eq!(violation.node, file.node_ref(tmp));
    }
}
