//! PhaseRunner - executes an ordered phase list against one work unit.
//!
//! The runner does no scheduling of its own. Phases run in list order, one
//! at a time, and the first failure ends the run:
//!
//! 1. Stop if the run was cancelled.
//! 2. Skip the phase if the configuration disables it.
//! 3. Fail if a prerequisite has not completed in the current scope.
//! 4. Run the body, then record the outcome in the scope and the history.
//!
//! The runner operates on the innermost scope of the context, so a runner
//! started inside a freshly entered child scope sees none of the phases the
//! outer runner completed.

use std::time::Instant;

use phaser_core::{
    CompilationContext, DebugFlags, Diagnostic, IrDump, PhaseError, PhaseFailure, PhaseOutcome,
    PhaseRecord, WorkUnit,
};
use phaser_registry::{OrderedPhaseList, PhaseDescriptor};

/// Executes one ordered phase list.
pub struct PhaseRunner<'l, U> {
    phases: &'l OrderedPhaseList<U>,
}

impl<'l, U: WorkUnit> PhaseRunner<'l, U> {
    pub fn new(phases: &'l OrderedPhaseList<U>) -> Self {
        Self { phases }
    }

    /// Run every phase in order against `unit`.
    ///
    /// # Errors
    ///
    /// Returns the first phase failure, tagged with the phase id and
    /// description. Phases after the failing one are never invoked.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(&self, ctx: &mut CompilationContext, unit: &mut U) -> Result<(), PhaseError> {
        let label = unit.label();
        for phase in self.phases.iter() {
            self.run_phase(phase, ctx, unit, &label)?;
        }
        Ok(())
    }

    fn run_phase(
        &self,
        phase: &PhaseDescriptor<U>,
        ctx: &mut CompilationContext,
        unit: &mut U,
        label: &str,
    ) -> Result<(), PhaseError> {
        let id = phase.id();
        let depth = ctx.scope().depth();
        let error = |failure| PhaseError::new(id, phase.description(), label, failure);

        if ctx.is_cancelled() {
            tracing::debug!(phase = %id, unit = %label, "cancelled before phase");
            return Err(error(PhaseFailure::Cancelled));
        }

        if !ctx.config().is_enabled(id) {
            tracing::warn!(phase = %id, unit = %label, "phase disabled, skipping");
            ctx.scope_mut().state.mark_skipped(id);
            ctx.record(PhaseRecord {
                phase: id,
                unit: label.to_string(),
                depth,
                outcome: PhaseOutcome::Skipped,
            });
            return Ok(());
        }

        if let Some(&prerequisite) = phase
            .prerequisites()
            .iter()
            .find(|p| !ctx.scope().state.is_done(**p))
        {
            return Err(error(PhaseFailure::PrerequisiteNotRun { prerequisite }));
        }

        let _span = tracing::debug_span!("phase", id = %id, unit = %label).entered();
        let debug = ctx.config().debug;
        if debug.contains(DebugFlags::VERBOSE) {
            tracing::info!(kind = %phase.kind(), "{}", phase.description());
        } else {
            tracing::debug!(kind = %phase.kind(), "{}", phase.description());
        }

        let started = Instant::now();
        let result = phase.body().run(ctx, unit);
        if debug.contains(DebugFlags::TIMINGS) {
            let elapsed_us = started.elapsed().as_micros() as u64;
            tracing::info!(elapsed_us, "phase timing");
        }

        match result {
            Ok(()) => {
                ctx.scope_mut().state.mark_done(id);
                ctx.record(PhaseRecord {
                    phase: id,
                    unit: label.to_string(),
                    depth,
                    outcome: PhaseOutcome::Completed,
                });
                if ctx.config().should_dump(id) {
                    ctx.record_dump(IrDump {
                        phase: id,
                        unit: label.to_string(),
                        text: unit.render(),
                    });
                }
                tracing::debug!("phase completed");
                Ok(())
            }
            Err(failure) => {
                ctx.record(PhaseRecord {
                    phase: id,
                    unit: label.to_string(),
                    depth,
                    outcome: PhaseOutcome::Failed,
                });
                // Nested runners already reported their own failures.
                if !matches!(failure, PhaseFailure::File { .. } | PhaseFailure::Files(_)) {
                    let mut diagnostic = Diagnostic::error(failure.to_string()).with_phase(id);
                    if let Some(location) = failure.location() {
                        diagnostic = diagnostic.with_location(location.clone());
                    }
                    ctx.diagnostics.push(diagnostic);
                }
                tracing::debug!(%failure, "phase failed");
                Err(error(failure))
            }
        }
    }
}
