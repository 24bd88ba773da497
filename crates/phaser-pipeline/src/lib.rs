//! Execution for phaser phase lists.
//!
//! - [`PhaseRunner`] runs one validated list against one work unit
//! - [`ScopedSubPipeline`] runs a file-level list per file inside a child scope
//! - [`Fixpoint`] and [`run_to_fixpoint`] repeat a body until it converges
//! - [`InvariantCheck`] wraps read-only structural checks such as
//!   [`check_parent_links`]
//!
//! ## Example
//!
//! ```
//! use phaser_core::{CompilationContext, Module, PhaseId};
//! use phaser_pipeline::PhaseRunner;
//! use phaser_registry::{OrderedPhaseList, PhaseDescriptor};
//!
//! let list = OrderedPhaseList::new(vec![PhaseDescriptor::transform(
//!     PhaseId::new("count_files"),
//!     "count files",
//!     |ctx: &mut CompilationContext, module: &mut Module| {
//!         ctx.set_statistic("files", module.files().len() as u64);
//!         Ok(())
//!     },
//! )])
//! .unwrap();
//!
//! let mut ctx = CompilationContext::default();
//! PhaseRunner::new(&list).run(&mut ctx, &mut Module::new("app")).unwrap();
//! assert_eq!(ctx.statistic("files"), 0);
//! ```

pub mod check;
pub mod fixpoint;
pub mod nested;
pub mod runner;

pub use check::{InvariantCheck, check_module_parent_links, check_parent_links};
pub use fixpoint::{Fixpoint, Progress, run_to_fixpoint};
pub use nested::ScopedSubPipeline;
pub use runner::PhaseRunner;
