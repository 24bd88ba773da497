//! Phase descriptors and the phase body contract.

use std::fmt;

use phaser_core::{CompilationContext, Granularity, PhaseFailure, PhaseId, WorkUnit};

/// What kind of work a phase body does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Runs once and may mutate the context and the unit.
    Transform,
    /// Re-runs until no residual work remains.
    Fixpoint,
    /// Read-only structural check.
    Check,
    /// Runs a nested file-level list once per file.
    PerFile,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::Transform => write!(f, "transform"),
            PhaseKind::Fixpoint => write!(f, "fixpoint"),
            PhaseKind::Check => write!(f, "check"),
            PhaseKind::PerFile => write!(f, "per-file"),
        }
    }
}

/// The executable part of a phase.
///
/// A body receives the context and the unit for the duration of the call
/// and must not keep either. Failures are returned, never recovered from by
/// the runner.
pub trait PhaseBody<U> {
    fn kind(&self) -> PhaseKind;

    fn run(&self, ctx: &mut CompilationContext, unit: &mut U) -> Result<(), PhaseFailure>;

    /// Phases run underneath this one, for listings and graphs.
    fn sub_phases(&self) -> Vec<PhaseSummary> {
        Vec::new()
    }
}

/// A plain transformation backed by a closure or function.
pub struct Transform<F>(pub F);

impl<U, F> PhaseBody<U> for Transform<F>
where
    F: Fn(&mut CompilationContext, &mut U) -> Result<(), PhaseFailure>,
{
    fn kind(&self) -> PhaseKind {
        PhaseKind::Transform
    }

    fn run(&self, ctx: &mut CompilationContext, unit: &mut U) -> Result<(), PhaseFailure> {
        (self.0)(ctx, unit)
    }
}

/// Immutable metadata plus body for one phase.
pub struct PhaseDescriptor<U> {
    id: PhaseId,
    description: &'static str,
    prerequisites: Vec<PhaseId>,
    body: Box<dyn PhaseBody<U>>,
}

impl<U: WorkUnit> PhaseDescriptor<U> {
    pub fn new(id: PhaseId, description: &'static str, body: impl PhaseBody<U> + 'static) -> Self {
        Self {
            id,
            description,
            prerequisites: Vec::new(),
            body: Box::new(body),
        }
    }

    /// A transformation phase from a function.
    pub fn transform<F>(id: PhaseId, description: &'static str, body: F) -> Self
    where
        F: Fn(&mut CompilationContext, &mut U) -> Result<(), PhaseFailure> + 'static,
    {
        Self::new(id, description, Transform(body))
    }

    /// Declare the phases that must have run before this one.
    pub fn requires(mut self, prerequisites: impl IntoIterator<Item = PhaseId>) -> Self {
        for prerequisite in prerequisites {
            if !self.prerequisites.contains(&prerequisite) {
                self.prerequisites.push(prerequisite);
            }
        }
        self
    }

    pub fn id(&self) -> PhaseId {
        self.id
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Prerequisites in declaration order.
    pub fn prerequisites(&self) -> &[PhaseId] {
        &self.prerequisites
    }

    pub fn body(&self) -> &dyn PhaseBody<U> {
        self.body.as_ref()
    }

    pub fn kind(&self) -> PhaseKind {
        self.body.kind()
    }

    pub fn summary(&self) -> PhaseSummary {
        PhaseSummary {
            id: self.id,
            description: self.description,
            kind: self.body.kind(),
            granularity: U::GRANULARITY,
            prerequisites: self.prerequisites.clone(),
            children: self.body.sub_phases(),
        }
    }
}

impl<U> fmt::Debug for PhaseDescriptor<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseDescriptor")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("prerequisites", &self.prerequisites)
            .finish_non_exhaustive()
    }
}

/// Body-less description of a phase and whatever runs underneath it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseSummary {
    pub id: PhaseId,
    pub description: &'static str,
    pub kind: PhaseKind,
    pub granularity: Granularity,
    pub prerequisites: Vec<PhaseId>,
    pub children: Vec<PhaseSummary>,
}

impl PhaseSummary {
    /// This phase and all nested phases, depth first.
    pub fn walk(&self) -> Vec<&PhaseSummary> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}
