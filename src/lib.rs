//! phaser - a staged lowering pipeline with validated phase ordering.
//!
//! Phases are curated into ordered lists by hand. Each list is checked once
//! against the prerequisites its phases declare and then run in exactly
//! that order. Module-level phases see the whole [`Module`]; a per-file
//! phase runs a second, file-level list once per file inside an isolated
//! child scope. Fixpoint phases carry an iteration bound and invariant
//! checks sit right behind the phases whose repairs they guard.
//!
//! # Example
//!
//! ```
//! use phaser::prelude::*;
//!
//! let mut file = FileBuilder::new("main.src");
//! let root = file.root();
//! let main = file.function(root, "main");
//! let body = file.block(main);
//! file.call(body, "main");
//!
//! let mut module = Module::new("app").with_file(file.finish());
//! let pipeline = Pipeline::from_options(["dump-after=introduce_temporaries"]).unwrap();
//! let output = pipeline.run(&mut module).unwrap();
//!
//! assert_eq!(output.context.statistic("temporaries"), 1);
//! assert_eq!(output.context.dumps().len(), 1);
//! ```
//!
//! # Crates
//!
//! - `phaser-core`: IR, context, configuration and errors
//! - `phaser-registry`: phase descriptors and ordered lists
//! - `phaser-pipeline`: runners, per-file nesting, fixpoints and checks
//! - `phaser-harness`: exit-code and output checks for built artifacts

pub mod driver;
pub mod lowerings;

pub use driver::{CompilationOutput, Pipeline, lower};
pub use phaser_core::{File, FileBuilder, Module};

pub mod prelude {
    pub use crate::driver::{CompilationOutput, Pipeline, lower};
    pub use phaser_core::{
        CompilationContext, DebugFlags, File, FileBuilder, FileErrorPolicy, Module, NodeKind,
        OrderingError, PhaseError, PhaseFailure, PhaseId, PipelineConfig, PipelineError,
    };
    pub use phaser_pipeline::{Fixpoint, InvariantCheck, PhaseRunner, Progress, ScopedSubPipeline};
    pub use phaser_registry::{OrderedPhaseList, PhaseDescriptor, PhaseKind};
}
