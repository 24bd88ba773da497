//! CompilationContext - the state shared by every phase of one run.
//!
//! Exactly one context exists per compilation run. Phases borrow it for the
//! duration of a call and never keep it; concurrent runs use separate
//! contexts.
//!
//! ## Scopes
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ root scope                         │  ← module-level phases
//! │   PhaserState + Scratch            │
//! └────────────────────────────────────┘
//!              ▲ enter_scope / exit_scope
//! ┌────────────────────────────────────┐
//! │ ChildScope for one file            │  ← file-level phases
//! │   fresh PhaserState + Scratch      │
//! └────────────────────────────────────┘
//! ```
//!
//! A per-file sub-pipeline pushes a fresh [`ChildScope`] before lowering a
//! file and pops it afterwards, so nothing a file-level phase stores in
//! scratch is visible to the next file. Everything else in the context is
//! shared on purpose.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::PhaseId;
use crate::config::PipelineConfig;
use crate::diagnostics::Diagnostics;
use crate::symbols::SymbolTable;

// ============================================================================
// Per-scope state
// ============================================================================

/// Which phases have run in one scope.
#[derive(Debug, Default, Clone)]
pub struct PhaserState {
    done: FxHashSet<PhaseId>,
    executed: Vec<PhaseId>,
    skipped: Vec<PhaseId>,
}

impl PhaserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_done(&mut self, phase: PhaseId) {
        self.done.insert(phase);
        self.executed.push(phase);
    }

    pub fn mark_skipped(&mut self, phase: PhaseId) {
        self.skipped.push(phase);
    }

    pub fn is_done(&self, phase: PhaseId) -> bool {
        self.done.contains(&phase)
    }

    /// Completed phases in execution order.
    pub fn executed(&self) -> &[PhaseId] {
        &self.executed
    }

    pub fn skipped(&self) -> &[PhaseId] {
        &self.skipped
    }
}

/// Typed scratch slots, one value per type.
#[derive(Default)]
pub struct Scratch {
    slots: FxHashMap<TypeId, Box<dyn Any>>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_mut())
    }

    /// The slot for `T`, created with `T::default()` on first use.
    pub fn get_or_default<T: Default + 'static>(&mut self) -> &mut T {
        self.slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut()
            .unwrap_or_else(|| unreachable!("scratch slot keyed by its own TypeId"))
    }

    /// Store a value, returning the previous one.
    pub fn insert<T: 'static>(&mut self, value: T) -> Option<T> {
        self.slots
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok())
            .map(|old| *old)
    }

    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.slots
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast().ok())
            .map(|old| *old)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for Scratch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scratch")
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// Bookkeeping owned by one runner scope.
#[derive(Debug)]
pub struct ChildScope {
    label: String,
    depth: usize,
    pub state: PhaserState,
    pub scratch: Scratch,
}

impl ChildScope {
    pub fn new(label: impl Into<String>, depth: usize) -> Self {
        Self {
            label: label.into(),
            depth,
            state: PhaserState::new(),
            scratch: Scratch::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Nesting depth; 0 for the root scope.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

// ============================================================================
// Run history
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Skipped,
    Failed,
}

/// One phase invocation, in the order it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseRecord {
    pub phase: PhaseId,
    pub unit: String,
    pub depth: usize,
    pub outcome: PhaseOutcome,
}

/// Text form of a unit recorded after a phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrDump {
    pub phase: PhaseId,
    pub unit: String,
    pub text: String,
}

/// Cooperative cancellation flag, checked at phase boundaries.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// CompilationContext
// ============================================================================

/// Mutable state threaded through every phase of one compilation run.
#[derive(Debug)]
pub struct CompilationContext {
    config: PipelineConfig,
    pub symbols: SymbolTable,
    pub diagnostics: Diagnostics,
    statistics: BTreeMap<String, u64>,
    history: Vec<PhaseRecord>,
    dumps: Vec<IrDump>,
    scopes: Vec<ChildScope>,
    cancel: CancelToken,
}

impl CompilationContext {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
            diagnostics: Diagnostics::default(),
            statistics: BTreeMap::new(),
            history: Vec::new(),
            dumps: Vec::new(),
            scopes: vec![ChildScope::new("root", 0)],
            cancel: CancelToken::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // === Scopes ===

    /// The innermost scope.
    pub fn scope(&self) -> &ChildScope {
        self.scopes
            .last()
            .unwrap_or_else(|| unreachable!("root scope is never popped"))
    }

    pub fn scope_mut(&mut self) -> &mut ChildScope {
        self.scopes
            .last_mut()
            .unwrap_or_else(|| unreachable!("root scope is never popped"))
    }

    /// Scratch of the innermost scope.
    pub fn scratch(&mut self) -> &mut Scratch {
        &mut self.scope_mut().scratch
    }

    /// Push a fresh scope one level below the current one.
    pub fn enter_scope(&mut self, label: impl Into<String>) {
        let depth = self.scope().depth() + 1;
        self.scopes.push(ChildScope::new(label, depth));
    }

    /// Pop the innermost scope. The root scope cannot be popped.
    pub fn exit_scope(&mut self) -> Option<ChildScope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    // === History and dumps ===

    pub fn record(&mut self, record: PhaseRecord) {
        self.history.push(record);
    }

    pub fn history(&self) -> &[PhaseRecord] {
        &self.history
    }

    /// Ids of completed phases at every depth, in execution order.
    pub fn completed_phases(&self) -> Vec<PhaseId> {
        self.history
            .iter()
            .filter(|r| r.outcome == PhaseOutcome::Completed)
            .map(|r| r.phase)
            .collect()
    }

    pub fn record_dump(&mut self, dump: IrDump) {
        self.dumps.push(dump);
    }

    pub fn dumps(&self) -> &[IrDump] {
        &self.dumps
    }

    // === Statistics ===

    pub fn bump(&mut self, counter: &str, by: u64) {
        *self.statistics.entry(counter.to_string()).or_default() += by;
    }

    pub fn set_statistic(&mut self, counter: &str, value: u64) {
        self.statistics.insert(counter.to_string(), value);
    }

    pub fn statistic(&self, counter: &str) -> u64 {
        self.statistics.get(counter).copied().unwrap_or(0)
    }

    /// Counters sorted by name.
    pub fn statistics(&self) -> &BTreeMap<String, u64> {
        &self.statistics
    }

    // === Cancellation ===

    /// A handle that can cancel this run from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for CompilationContext {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Counter(u32);

    #[test]
    fn scratch_slots_are_typed() {
        let mut scratch = Scratch::new();
        assert!(scratch.get::<Counter>().is_none());
        scratch.get_or_default::<Counter>().0 += 2;
        scratch.get_or_default::<Counter>().0 += 1;
        assert_eq!(scratch.get::<Counter>(), Some(&Counter(3)));
        assert_eq!(scratch.insert(Counter(10)), Some(Counter(3)));
        assert_eq!(scratch.remove::<Counter>(), Some(Counter(10)));
        assert!(scratch.is_empty());
    }

    #[test]
    fn child_scope_starts_fresh_and_is_discarded() {
        let mut ctx = CompilationContext::default();
        ctx.scratch().insert(Counter(1));

        ctx.enter_scope("file `a.src`");
        assert_eq!(ctx.scope().depth(), 1);
        assert!(ctx.scratch().get::<Counter>().is_none());
        ctx.scratch().insert(Counter(7));
        let flatten = PhaseId::new("flatten_blocks");
        ctx.scope_mut().state.mark_done(flatten);

        let popped = ctx.exit_scope().unwrap();
        assert_eq!(popped.label(), "file `a.src`");
        assert!(popped.state.is_done(flatten));

        ctx.enter_scope("file `b.src`");
        assert!(ctx.scratch().get::<Counter>().is_none());
        assert!(!ctx.scope().state.is_done(PhaseId::new("flatten_blocks")));
        ctx.exit_scope();

        assert_eq!(ctx.scratch().get::<Counter>(), Some(&Counter(1)));
    }

    #[test]
    fn root_scope_cannot_be_popped() {
        let mut ctx = CompilationContext::default();
        assert!(ctx.exit_scope().is_none());
        assert_eq!(ctx.scope().label(), "root");
    }

    #[test]
    fn cancel_token_is_shared() {
        let ctx = CompilationContext::default();
        let token = ctx.cancel_token();
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn statistics_accumulate() {
        let mut ctx = CompilationContext::default();
        ctx.bump("calls", 2);
        ctx.bump("calls", 3);
        ctx.set_statistic("files", 4);
        assert_eq!(ctx.statistic("calls"), 5);
        assert_eq!(ctx.statistic("missing"), 0);
        let names: Vec<&str> = ctx.statistics().keys().map(String::as_str).collect();
        assert_eq!(names, ["calls", "files"]);
    }
}
