//! Reference lowering phases.
//!
//! ## Module-level list
//!
//! ```text
//! collect_declarations
//! resolve_aliases          (fixpoint)      after collect_declarations
//! resolve_calls                            after resolve_aliases
//! lower_files              (per file)      after resolve_calls
//! │ flatten_blocks
//! │ patch_parents
//! │ check_parents          (check)         after patch_parents
//! │ introduce_temporaries                  after check_parents
//! │ check_temporaries      (check)         after introduce_temporaries
//! verify_module            (check)         after lower_files
//! collect_statistics                       after lower_files
//! ```
//!
//! The lists are written out by hand below and the order above is the order
//! they run in. `flatten_blocks` leaves moved nodes pointing at the block
//! they came from; `check_parents` sits directly behind the repair so a
//! missing or misplaced repair fails in the file where it happened.

mod blocks;
mod declarations;
mod temporaries;
mod verify;

pub use blocks::{check_parents, flatten_blocks, patch_parents};
pub use declarations::{collect_declarations, resolve_alias_round, resolve_calls};
pub use temporaries::{TemporaryCounter, check_temporaries, introduce_temporaries};
pub use verify::{collect_statistics, verify_module};

use phaser_core::{File, Module, OrderingError, PhaseId};
use phaser_pipeline::{Fixpoint, InvariantCheck, ScopedSubPipeline};
use phaser_registry::{OrderedPhaseList, PhaseDescriptor};

pub const COLLECT_DECLARATIONS: PhaseId = PhaseId::new("collect_declarations");
pub const RESOLVE_ALIASES: PhaseId = PhaseId::new("resolve_aliases");
pub const RESOLVE_CALLS: PhaseId = PhaseId::new("resolve_calls");
pub const LOWER_FILES: PhaseId = PhaseId::new("lower_files");
pub const VERIFY_MODULE: PhaseId = PhaseId::new("verify_module");
pub const COLLECT_STATISTICS: PhaseId = PhaseId::new("collect_statistics");

pub const FLATTEN_BLOCKS: PhaseId = PhaseId::new("flatten_blocks");
pub const PATCH_PARENTS: PhaseId = PhaseId::new("patch_parents");
pub const CHECK_PARENTS: PhaseId = PhaseId::new("check_parents");
pub const INTRODUCE_TEMPORARIES: PhaseId = PhaseId::new("introduce_temporaries");
pub const CHECK_TEMPORARIES: PhaseId = PhaseId::new("check_temporaries");

/// The file-level lowerings, in execution order.
pub fn file_phases() -> Vec<PhaseDescriptor<File>> {
    vec![
        PhaseDescriptor::transform(
            FLATTEN_BLOCKS,
            "splice nested blocks into their parent",
            flatten_blocks,
        ),
        PhaseDescriptor::transform(
            PATCH_PARENTS,
            "repair parent links after restructuring",
            patch_parents,
        ),
        PhaseDescriptor::new(
            CHECK_PARENTS,
            "parent links match the tree",
            InvariantCheck(check_parents),
        )
        .requires([PATCH_PARENTS]),
        PhaseDescriptor::transform(
            INTRODUCE_TEMPORARIES,
            "bind every call result to a temporary",
            introduce_temporaries,
        )
        .requires([CHECK_PARENTS]),
        PhaseDescriptor::new(
            CHECK_TEMPORARIES,
            "every call sits in its own temporary",
            InvariantCheck(check_temporaries),
        )
        .requires([INTRODUCE_TEMPORARIES]),
    ]
}

/// The module-level lowerings, in execution order, with the file-level list
/// nested under `lower_files`.
pub fn module_phases() -> Result<OrderedPhaseList<Module>, OrderingError> {
    let per_file = ScopedSubPipeline::from_phases(file_phases())?;

    OrderedPhaseList::new(vec![
        PhaseDescriptor::transform(
            COLLECT_DECLARATIONS,
            "register functions and aliases",
            collect_declarations,
        ),
        PhaseDescriptor::new(
            RESOLVE_ALIASES,
            "resolve alias chains",
            Fixpoint::new(resolve_alias_round).with_statistic("resolve_aliases.iterations"),
        )
        .requires([COLLECT_DECLARATIONS]),
        PhaseDescriptor::transform(RESOLVE_CALLS, "bind calls to functions", resolve_calls)
            .requires([RESOLVE_ALIASES]),
        PhaseDescriptor::new(LOWER_FILES, "lower each file", per_file).requires([RESOLVE_CALLS]),
        PhaseDescriptor::new(
            VERIFY_MODULE,
            "module is fully lowered",
            InvariantCheck(verify_module),
        )
        .requires([LOWER_FILES]),
        PhaseDescriptor::transform(
            COLLECT_STATISTICS,
            "count what the lowering produced",
            collect_statistics,
        )
        .requires([LOWER_FILES]),
    ])
}
