//! Whole-module verification and statistics.

use phaser_core::{
    CompilationContext, InvariantViolation, Module, NodeKind, PhaseFailure, SymbolKind,
};
use phaser_pipeline::check_module_parent_links;

/// The module is fully lowered: parent links hold in every file and every
/// call is bound to a function symbol.
pub fn verify_module(ctx: &CompilationContext, module: &Module) -> Result<(), InvariantViolation> {
    check_module_parent_links(module)?;

    for file in module.files() {
        for id in file.preorder() {
            let NodeKind::Call { callee, target } = &file.node(id).kind else {
                continue;
            };
            let is_function = match target {
                Some(symbol) if symbol.index() < ctx.symbols.len() => {
                    ctx.symbols.get(*symbol).kind == SymbolKind::Function
                }
                _ => false,
            };
            if !is_function {
                return Err(InvariantViolation::new(
                    format!("call to `{}` is not bound to a function", callee),
                    file.node_ref(id),
                ));
            }
        }
    }
    Ok(())
}

/// Record node counts by kind, summed over every file.
pub fn collect_statistics(
    ctx: &mut CompilationContext,
    module: &mut Module,
) -> Result<(), PhaseFailure> {
    let mut nodes = 0;
    let mut functions = 0;
    let mut aliases = 0;
    let mut calls = 0;

    for file in module.files() {
        for id in file.preorder() {
            nodes += 1;
            match file.node(id).kind {
                NodeKind::Function { .. } => functions += 1,
                NodeKind::Alias { .. } => aliases += 1,
                NodeKind::Call { .. } => calls += 1,
                _ => {}
            }
        }
    }

    ctx.set_statistic("files", module.files().len() as u64);
    ctx.set_statistic("nodes", nodes);
    ctx.set_statistic("functions", functions);
    ctx.set_statistic("aliases", aliases);
    ctx.set_statistic("calls", calls);
    Ok(())
}
