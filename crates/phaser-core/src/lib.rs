//! Core types for the phaser lowering pipeline.
//!
//! This crate holds everything phases and runners share:
//!
//! - [`ids`]: phase, file, node and symbol identifiers
//! - [`ir`]: the tree IR the reference lowerings operate on
//! - [`unit`]: work units ([`Module`] and [`File`]) and their granularity
//! - [`context`]: the [`CompilationContext`] threaded through every phase
//! - [`config`]: pipeline options
//! - [`diagnostics`]: the diagnostic sink
//! - [`symbols`]: the module-wide symbol table
//! - [`error`]: the error taxonomy

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod ids;
pub mod ir;
pub mod symbols;
pub mod unit;

pub use config::{
    DEFAULT_MAX_FIXPOINT_ITERATIONS, DebugFlags, FileErrorPolicy, PipelineConfig, PipelineOption,
};
pub use context::{
    CancelToken, ChildScope, CompilationContext, IrDump, PhaseOutcome, PhaseRecord, PhaserState,
    Scratch,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{
    ConfigError, InvariantViolation, NonConvergenceError, OrderingError, PhaseError, PhaseFailure,
    PipelineError,
};
pub use ids::{FileId, NodeId, NodeRef, PhaseId, SymbolId};
pub use ir::{File, FileBuilder, Module, Node, NodeKind};
pub use symbols::{Symbol, SymbolKind, SymbolTable};
pub use unit::{Granularity, WorkUnit};
