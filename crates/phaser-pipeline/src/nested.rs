//! ScopedSubPipeline - a module-level phase that lowers files one at a time.
//!
//! For each file, in stored order:
//!
//! ```text
//! enter_scope(file)  →  PhaseRunner(file list).run(ctx, file)  →  exit_scope()
//! ```
//!
//! The child scope is popped whether the file succeeded or not, so the next
//! file starts with an empty `PhaserState` and empty scratch. Symbols,
//! diagnostics, statistics and history stay in the shared context.

use phaser_core::{
    CompilationContext, File, FileErrorPolicy, Module, OrderingError, PhaseError, PhaseFailure,
    WorkUnit,
};
use phaser_registry::{OrderedPhaseList, PhaseBody, PhaseDescriptor, PhaseKind, PhaseSummary};

use crate::runner::PhaseRunner;

/// Runs a file-level phase list once per file of the module.
pub struct ScopedSubPipeline {
    phases: OrderedPhaseList<File>,
}

impl ScopedSubPipeline {
    pub fn new(phases: OrderedPhaseList<File>) -> Self {
        Self { phases }
    }

    /// Validate `phases` and wrap them.
    pub fn from_phases(phases: Vec<PhaseDescriptor<File>>) -> Result<Self, OrderingError> {
        OrderedPhaseList::new(phases).map(Self::new)
    }

    pub fn phases(&self) -> &OrderedPhaseList<File> {
        &self.phases
    }

    fn run_file(&self, ctx: &mut CompilationContext, file: &mut File) -> Result<(), PhaseError> {
        let _span = tracing::debug_span!("file", path = %file.path()).entered();
        ctx.enter_scope(file.label());
        let result = PhaseRunner::new(&self.phases).run(ctx, file);
        ctx.exit_scope();
        result
    }
}

impl PhaseBody<Module> for ScopedSubPipeline {
    fn kind(&self) -> PhaseKind {
        PhaseKind::PerFile
    }

    fn run(&self, ctx: &mut CompilationContext, module: &mut Module) -> Result<(), PhaseFailure> {
        let policy = ctx.config().file_error_policy;
        let mut failures = Vec::new();

        for file in module.files_mut() {
            if let Err(error) = self.run_file(ctx, file) {
                match policy {
                    FileErrorPolicy::FailFast => {
                        return Err(PhaseFailure::File {
                            file: file.path().to_string(),
                            error: Box::new(error),
                        });
                    }
                    FileErrorPolicy::CollectAll => {
                        tracing::debug!(path = %file.path(), %error, "file failed, continuing");
                        failures.push(error);
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PhaseFailure::Files(failures))
        }
    }

    fn sub_phases(&self) -> Vec<PhaseSummary> {
        self.phases.summaries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use phaser_core::{Granularity, PhaseId, PipelineConfig};

    const NOTE: PhaseId = PhaseId::new("note");
    const PEEK: PhaseId = PhaseId::new("peek");
    const LOWER: PhaseId = PhaseId::new("lower_files");

    /// Scratch slot written by `note` and read back by `peek`.
    #[derive(Debug, Default, PartialEq)]
    struct Seen(Vec<String>);

    type Log = Rc<RefCell<Vec<String>>>;

    fn module(paths: &[&str]) -> Module {
        paths
            .iter()
            .fold(Module::new("m"), |m, p| m.with_file(File::new(*p)))
    }

    fn note_and_peek(log: &Log, fail_on: Option<&'static str>) -> ScopedSubPipeline {
        let note_log = Rc::clone(log);
        let peek_log = Rc::clone(log);
        ScopedSubPipeline::from_phases(vec![
            PhaseDescriptor::transform(NOTE, "note the file", move |ctx, file: &mut File| {
                let before = ctx.scratch().get_or_default::<Seen>().0.len();
                note_log
                    .borrow_mut()
                    .push(format!("{} saw {}", file.path(), before));
                let path = file.path().to_string();
                ctx.scratch().get_or_default::<Seen>().0.push(path);
                if fail_on == Some(file.path()) {
                    return Err(PhaseFailure::msg("refused"));
                }
                Ok(())
            }),
            PhaseDescriptor::transform(PEEK, "peek at scratch", move |ctx, file: &mut File| {
                let seen = ctx.scratch().get::<Seen>().map(|s| s.0.len()).unwrap_or(0);
                peek_log
                    .borrow_mut()
                    .push(format!("{} peek {}", file.path(), seen));
                Ok(())
            })
            .requires([NOTE]),
        ])
        .unwrap()
    }

    #[test]
    fn runs_file_list_once_per_file_in_order() {
        let log = Log::default();
        let sub = note_and_peek(&log, None);
        let mut ctx = CompilationContext::default();
        let mut m = module(&["a.src", "b.src", "c.src"]);

        sub.run(&mut ctx, &mut m).unwrap();

        assert_eq!(
            *log.borrow(),
            [
                "a.src saw 0",
                "a.src peek 1",
                "b.src saw 0",
                "b.src peek 1",
                "c.src saw 0",
                "c.src peek 1",
            ]
        );
        assert_eq!(ctx.completed_phases(), [NOTE, PEEK, NOTE, PEEK, NOTE, PEEK]);
        assert!(ctx.history().iter().all(|r| r.depth == 1));
    }

    #[test]
    fn scopes_are_discarded_after_each_file() {
        let log = Log::default();
        let sub = note_and_peek(&log, None);
        let mut ctx = CompilationContext::default();
        let mut m = module(&["a.src", "b.src"]);

        sub.run(&mut ctx, &mut m).unwrap();

        assert_eq!(ctx.scope().depth(), 0);
        assert!(ctx.scope().scratch.get::<Seen>().is_none());
        assert!(ctx.scope().state.executed().is_empty());
    }

    #[test]
    fn first_failing_file_stops_the_module_phase() {
        let log = Log::default();
        let sub = note_and_peek(&log, Some("b.src"));
        let mut ctx = CompilationContext::default();
        let mut m = module(&["a.src", "b.src", "c.src"]);

        let failure = sub.run(&mut ctx, &mut m).unwrap_err();

        assert_eq!(
            *log.borrow(),
            ["a.src saw 0", "a.src peek 1", "b.src saw 0"]
        );
        match failure {
            PhaseFailure::File { file, error } => {
                assert_eq!(file, "b.src");
                assert_eq!(error.phase, NOTE);
                assert_eq!(error.unit, "file `b.src`");
            }
            other => panic!("expected a file failure, got {:?}", other),
        }
        assert_eq!(ctx.scope().depth(), 0);
    }

    #[test]
    fn collect_all_processes_every_file() {
        let log = Log::default();
        let sub = note_and_peek(&log, Some("a.src"));
        let config = PipelineConfig::new().with_file_error_policy(FileErrorPolicy::CollectAll);
        let mut ctx = CompilationContext::new(config);
        let mut m = module(&["a.src", "b.src"]);

        let failure = sub.run(&mut ctx, &mut m).unwrap_err();

        assert_eq!(
            *log.borrow(),
            ["a.src saw 0", "b.src saw 0", "b.src peek 1"]
        );
        match failure {
            PhaseFailure::Files(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].unit, "file `a.src`");
            }
            other => panic!("expected collected failures, got {:?}", other),
        }
    }

    #[test]
    fn nested_phases_are_listed_under_the_parent() {
        let log = Log::default();
        let sub = note_and_peek(&log, None);
        let phase = PhaseDescriptor::<Module>::new(LOWER, "lower each file", sub);
        let summary = phase.summary();

        assert_eq!(summary.kind, PhaseKind::PerFile);
        assert_eq!(summary.children.len(), 2);
        assert_eq!(summary.children[1].prerequisites, [NOTE]);
        assert_eq!(summary.children[0].granularity, Granularity::SingleFile);
    }
}
