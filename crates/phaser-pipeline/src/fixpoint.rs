//! Fixpoint phases - re-run a body until no residual work remains.
//!
//! Every fixpoint loop is bounded. The bound comes from the phase itself
//! when set, otherwise from `PipelineConfig::max_fixpoint_iterations`.

use phaser_core::{CompilationContext, NonConvergenceError, PhaseFailure};
use phaser_registry::{PhaseBody, PhaseKind};

/// What one iteration of a fixpoint body achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Nothing left to do.
    Converged,
    /// This many work items are still outstanding.
    Pending(usize),
}

impl Progress {
    pub fn from_residual(residual: usize) -> Self {
        if residual == 0 {
            Progress::Converged
        } else {
            Progress::Pending(residual)
        }
    }

    pub fn residual(self) -> usize {
        match self {
            Progress::Converged => 0,
            Progress::Pending(n) => n,
        }
    }
}

/// Invoke `body` until it reports no residual work.
///
/// Returns the number of iterations it took, counting the converging one.
/// A bound of zero is treated as one, so the body always runs.
///
/// # Errors
///
/// Body failures are returned as-is. If `max_iterations` invocations all
/// report pending work, fails with [`NonConvergenceError`] carrying the last
/// residual count.
pub fn run_to_fixpoint<U, F>(
    mut body: F,
    ctx: &mut CompilationContext,
    unit: &mut U,
    max_iterations: usize,
) -> Result<usize, PhaseFailure>
where
    F: FnMut(&mut CompilationContext, &mut U) -> Result<Progress, PhaseFailure>,
{
    let max_iterations = max_iterations.max(1);
    let mut residual = 0;
    for iteration in 1..=max_iterations {
        residual = body(ctx, unit)?.residual();
        if residual == 0 {
            return Ok(iteration);
        }
        tracing::trace!(iteration, residual, "fixpoint not reached");
    }
    Err(NonConvergenceError {
        iterations: max_iterations,
        residual,
    }
    .into())
}

/// A phase body that runs to a fixpoint.
pub struct Fixpoint<F> {
    body: F,
    max_iterations: Option<usize>,
    statistic: Option<&'static str>,
}

impl<F> Fixpoint<F> {
    pub fn new(body: F) -> Self {
        Self {
            body,
            max_iterations: None,
            statistic: None,
        }
    }

    /// Override the configured iteration bound for this phase. Zero is
    /// raised to one.
    pub fn with_max_iterations(mut self, bound: usize) -> Self {
        self.max_iterations = Some(bound.max(1));
        self
    }

    /// Record the iteration count under this statistic name.
    pub fn with_statistic(mut self, name: &'static str) -> Self {
        self.statistic = Some(name);
        self
    }
}

impl<U, F> PhaseBody<U> for Fixpoint<F>
where
    F: Fn(&mut CompilationContext, &mut U) -> Result<Progress, PhaseFailure>,
{
    fn kind(&self) -> PhaseKind {
        PhaseKind::Fixpoint
    }

    fn run(&self, ctx: &mut CompilationContext, unit: &mut U) -> Result<(), PhaseFailure> {
        let bound = self
            .max_iterations
            .unwrap_or(ctx.config().max_fixpoint_iterations);
        let iterations = run_to_fixpoint(&self.body, ctx, unit, bound)?;
        tracing::debug!(iterations, "fixpoint reached");
        if let Some(name) = self.statistic {
            ctx.bump(name, iterations as u64);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaser_core::{Module, PhaseId, PipelineConfig};
    use phaser_registry::PhaseDescriptor;
    use std::cell::Cell;

    #[test]
    fn two_then_zero_converges_in_two() {
        let reports = [2, 0];
        let calls = Cell::new(0);
        let mut ctx = CompilationContext::default();

        let iterations = run_to_fixpoint(
            |_, _: &mut ()| {
                let n = reports[calls.get()];
                calls.set(calls.get() + 1);
                Ok(Progress::from_residual(n))
            },
            &mut ctx,
            &mut (),
            50,
        )
        .unwrap();

        assert_eq!(iterations, 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn never_zero_hits_the_bound() {
        let calls = Cell::new(0);
        let mut ctx = CompilationContext::default();

        let err = run_to_fixpoint(
            |_, _: &mut ()| {
                calls.set(calls.get() + 1);
                Ok(Progress::Pending(3))
            },
            &mut ctx,
            &mut (),
            50,
        )
        .unwrap_err();

        assert_eq!(calls.get(), 50);
        assert_eq!(
            err,
            PhaseFailure::NonConvergence(NonConvergenceError {
                iterations: 50,
                residual: 3,
            })
        );
    }

    #[test]
    fn body_failure_passes_through() {
        let mut ctx = CompilationContext::default();
        let err = run_to_fixpoint(
            |_, _: &mut ()| Err(PhaseFailure::msg("undefined")),
            &mut ctx,
            &mut (),
            5,
        )
        .unwrap_err();
        assert_eq!(err, PhaseFailure::msg("undefined"));
    }

    fn spin(ctx: &mut CompilationContext, _: &mut Module) -> Result<Progress, PhaseFailure> {
        ctx.bump("spins", 1);
        Ok(Progress::Pending(1))
    }

    fn countdown(ctx: &mut CompilationContext, _: &mut Module) -> Result<Progress, PhaseFailure> {
        ctx.bump("rounds", 1);
        Ok(Progress::from_residual(3 - ctx.statistic("rounds") as usize))
    }

    #[test]
    fn phase_uses_configured_bound() {
        let phase = PhaseDescriptor::<Module>::new(
            PhaseId::new("spin"),
            "never converges",
            Fixpoint::new(spin),
        );
        let config = PipelineConfig::new().with_max_fixpoint_iterations(4);
        let mut ctx = CompilationContext::new(config);
        let mut module = Module::new("m");

        let err = phase.body().run(&mut ctx, &mut module).unwrap_err();

        assert_eq!(ctx.statistic("spins"), 4);
        assert!(matches!(
            err,
            PhaseFailure::NonConvergence(NonConvergenceError { iterations: 4, .. })
        ));
        assert_eq!(phase.kind(), PhaseKind::Fixpoint);
    }

    #[test]
    fn phase_bound_overrides_config_and_records_statistic() {
        let phase = PhaseDescriptor::<Module>::new(
            PhaseId::new("countdown"),
            "converges on the third round",
            Fixpoint::new(countdown)
                .with_max_iterations(3)
                .with_statistic("countdown.iterations"),
        );
        let config = PipelineConfig::new().with_max_fixpoint_iterations(1);
        let mut ctx = CompilationContext::new(config);
        let mut module = Module::new("m");

        phase.body().run(&mut ctx, &mut module).unwrap();

        assert_eq!(ctx.statistic("countdown.iterations"), 3);
    }

    #[test]
    fn zero_bound_still_runs_the_body_once() {
        let fixpoint = Fixpoint::new(spin).with_max_iterations(0);
        let mut ctx = CompilationContext::default();
        let mut module = Module::new("m");

        let err = fixpoint.run(&mut ctx, &mut module).unwrap_err();

        assert_eq!(ctx.statistic("spins"), 1);
        assert!(matches!(
            err,
            PhaseFailure::NonConvergence(NonConvergenceError { iterations: 1, .. })
        ));

        let mut calls = 0;
        let zero = |_: &mut CompilationContext, _: &mut ()| {
            calls += 1;
            Ok(Progress::Converged)
        };
        assert_eq!(run_to_fixpoint(zero, &mut ctx, &mut (), 0), Ok(1));
        assert_eq!(calls, 1);
    }
}
