//! Declarations, alias resolution and call binding.
//!
//! Functions and aliases share one namespace across the whole module.
//! Aliases may name other aliases and may be declared in any file and any
//! order, so resolving them is a fixpoint: each round resolves every alias
//! whose target is already known.

use phaser_core::{CompilationContext, Module, NodeKind, PhaseFailure, Symbol, SymbolId, SymbolKind};
use phaser_pipeline::Progress;

/// Enter every function and alias into the symbol table, files in order.
///
/// # Errors
///
/// Fails on the second declaration of a name, pointing at it.
pub fn collect_declarations(
    ctx: &mut CompilationContext,
    module: &mut Module,
) -> Result<(), PhaseFailure> {
    for file in module.files() {
        for id in file.preorder() {
            let node = file.node(id);
            let Some(name) = node.kind.declared_name() else {
                continue;
            };
            let kind = match &node.kind {
                NodeKind::Alias { target, .. } => SymbolKind::Alias {
                    target: target.clone(),
                    resolved: None,
                },
                _ => SymbolKind::Function,
            };
            let symbol = Symbol {
                name: name.to_string(),
                kind,
                declared_at: file.node_ref(id),
            };
            if let Err(existing) = ctx.symbols.declare(symbol) {
                return Err(PhaseFailure::at(
                    format!(
                        "`{}` is already declared at {}",
                        name,
                        ctx.symbols.get(existing).declared_at
                    ),
                    file.node_ref(id),
                ));
            }
        }
    }
    ctx.set_statistic("symbols", ctx.symbols.len() as u64);
    Ok(())
}

/// One round of alias resolution.
///
/// Walks the aliases in declaration order and resolves each one whose
/// target is a function or an already resolved alias. Resolved aliases are
/// written back to their IR node. Reports the number still unresolved, so a
/// cycle of aliases never converges.
///
/// # Errors
///
/// Fails if an alias names something that was never declared.
pub fn resolve_alias_round(
    ctx: &mut CompilationContext,
    module: &mut Module,
) -> Result<Progress, PhaseFailure> {
    let pending: Vec<SymbolId> = ctx
        .symbols
        .iter()
        .filter(|(_, s)| matches!(s.kind, SymbolKind::Alias { resolved: None, .. }))
        .map(|(id, _)| id)
        .collect();

    let mut residual = 0;
    for alias in pending {
        let symbol = ctx.symbols.get(alias);
        let SymbolKind::Alias { target, .. } = &symbol.kind else {
            continue;
        };
        let Some(target_id) = ctx.symbols.lookup(target) else {
            return Err(PhaseFailure::at(
                format!("alias `{}` names unknown symbol `{}`", symbol.name, target),
                symbol.declared_at.clone(),
            ));
        };
        let function = match ctx.symbols.get(target_id).kind {
            SymbolKind::Function => Some(target_id),
            SymbolKind::Alias { resolved, .. } => resolved,
        };
        let Some(function) = function else {
            residual += 1;
            continue;
        };

        let at = symbol.declared_at.clone();
        if let SymbolKind::Alias { resolved, .. } = &mut ctx.symbols.get_mut(alias).kind {
            *resolved = Some(function);
        }
        let file = &mut module.files_mut()[at.file.index()];
        if let NodeKind::Alias { resolved, .. } = &mut file.node_mut(at.node).kind {
            *resolved = Some(function);
        }
    }

    Ok(Progress::from_residual(residual))
}

/// Bind every call to the function its callee names, through aliases.
///
/// # Errors
///
/// Fails on the first call whose callee is not a declared function or
/// resolved alias.
pub fn resolve_calls(
    ctx: &mut CompilationContext,
    module: &mut Module,
) -> Result<(), PhaseFailure> {
    let mut bound = 0;
    for file in module.files_mut() {
        for id in file.preorder() {
            let callee = match &file.node(id).kind {
                NodeKind::Call {
                    callee,
                    target: None,
                } => callee.clone(),
                _ => continue,
            };
            let Some(function) = ctx.symbols.function_for(&callee) else {
                return Err(PhaseFailure::at(
                    format!("call to unknown function `{}`", callee),
                    file.node_ref(id),
                ));
            };
            if let NodeKind::Call { target, .. } = &mut file.node_mut(id).kind {
                *target = Some(function);
                bound += 1;
            }
        }
    }
    ctx.bump("calls_bound", bound);
    Ok(())
}
