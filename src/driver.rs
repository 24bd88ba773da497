//! Pipeline driver.
//!
//! [`Pipeline`] owns the validated module-level phase list and the
//! configuration. Validation happens once, in the constructor; every run
//! after that trusts the list order.

use phaser_core::{CompilationContext, Module, PipelineConfig, PipelineError, WorkUnit};
use phaser_pipeline::PhaseRunner;
use phaser_registry::{DependencyGraph, OrderedPhaseList, dependency_graph, to_dot};

use crate::lowerings;

/// End state of a successful run.
#[derive(Debug)]
pub struct CompilationOutput {
    pub context: CompilationContext,
}

/// A configured lowering pipeline, ready to run any number of modules.
pub struct Pipeline {
    config: PipelineConfig,
    phases: OrderedPhaseList<Module>,
}

impl Pipeline {
    /// The reference lowering pipeline under `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Ordering`] if the phase lists are out of
    /// order, or if `config` names an unknown phase or disables a phase that
    /// an enabled phase needs.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_phases(config, lowerings::module_phases()?)
    }

    /// The reference pipeline configured from textual options.
    pub fn from_options<I, S>(options: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(PipelineConfig::from_options(options)?)
    }

    /// A pipeline over a caller-supplied module-level list.
    pub fn with_phases(
        config: PipelineConfig,
        phases: OrderedPhaseList<Module>,
    ) -> Result<Self, PipelineError> {
        if let Err(error) = phases.check_config(&config) {
            tracing::debug!(phase = ?error.phase(), %error, "configuration rejected");
            return Err(error.into());
        }
        Ok(Self { config, phases })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn phases(&self) -> &OrderedPhaseList<Module> {
        &self.phases
    }

    /// One line per phase, file-level phases indented under `lower_files`.
    pub fn listing(&self) -> String {
        self.phases.to_string()
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        dependency_graph(&self.phases.summaries())
    }

    pub fn dependency_dot(&self) -> String {
        to_dot(&self.dependency_graph())
    }

    /// A fresh context for one run.
    ///
    /// Take its cancel token before handing it to [`Pipeline::run_in`] to
    /// cancel the run from elsewhere.
    pub fn context(&self) -> CompilationContext {
        CompilationContext::new(self.config.clone())
    }

    /// Run every phase over `module` in a fresh context.
    ///
    /// # Errors
    ///
    /// Returns the first failing phase as [`PipelineError::Phase`].
    pub fn run(&self, module: &mut Module) -> Result<CompilationOutput, PipelineError> {
        let mut context = self.context();
        self.run_in(&mut context, module)?;
        Ok(CompilationOutput { context })
    }

    /// Run every phase over `module` in a caller-owned context.
    ///
    /// The context keeps whatever the phases recorded even when the run
    /// fails.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run_in(
        &self,
        ctx: &mut CompilationContext,
        module: &mut Module,
    ) -> Result<(), PipelineError> {
        let _span = tracing::info_span!("pipeline", module = module.name()).entered();
        tracing::debug!(files = module.files().len(), "starting run");

        match PhaseRunner::new(&self.phases).run(ctx, module) {
            Ok(()) => {
                tracing::debug!(phases = ctx.history().len(), "run finished");
                Ok(())
            }
            Err(error) => {
                let innermost = error.innermost();
                tracing::debug!(
                    phase = %innermost.phase,
                    unit = %innermost.unit,
                    "run aborted"
                );
                Err(error.into())
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("phases", &self.phases.ids())
            .finish()
    }
}

/// Run the reference pipeline over `module` with the default configuration.
pub fn lower(module: &mut Module) -> Result<CompilationOutput, PipelineError> {
    tracing::trace!(unit = %module.label(), "lowering with defaults");
    Pipeline::new(PipelineConfig::default())?.run(module)
}
