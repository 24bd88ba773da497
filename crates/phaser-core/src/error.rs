//! Error types for the lowering pipeline.
//!
//! ## Error Hierarchy
//!
//! ```text
//! PipelineError (returned by the driver)
//! ├── OrderingError  - setup-time: a prerequisite is missing, misplaced or disabled
//! ├── ConfigError    - setup-time: malformed pipeline options
//! └── PhaseError     - run-time: a named phase failed
//!     └── PhaseFailure
//!         ├── Failed              - the phase body reported an error
//!         ├── Invariant           - an invariant-check phase found broken IR
//!         ├── NonConvergence      - a fixpoint phase hit its iteration bound
//!         ├── File / Files        - a per-file sub-pipeline failed
//!         ├── PrerequisiteNotRun  - a prerequisite was skipped at run time
//!         └── Cancelled           - the run was cancelled before this phase
//! ```
//!
//! None of these are recovered from inside the pipeline. Every failure aborts
//! the current run and is handed to the embedding driver.

use thiserror::Error;

use crate::{NodeRef, PhaseId};

// ============================================================================
// Setup Errors
// ============================================================================

/// A phase list whose order does not honour declared prerequisites.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    /// Two phases in one list share an id.
    #[error("phase `{phase}` appears more than once")]
    DuplicatePhase { phase: PhaseId },

    /// A prerequisite does not appear anywhere in the list.
    #[error("phase `{phase}` requires `{prerequisite}`, which is not in the phase list")]
    MissingPrerequisite {
        phase: PhaseId,
        prerequisite: PhaseId,
    },

    /// A prerequisite appears, but only after the phase that needs it.
    #[error("phase `{phase}` requires `{prerequisite}`, which is scheduled after it")]
    MisplacedPrerequisite {
        phase: PhaseId,
        prerequisite: PhaseId,
    },

    /// Configuration disables a phase that an enabled phase needs.
    #[error("phase `{phase}` requires `{prerequisite}`, which is disabled")]
    DisabledPrerequisite {
        phase: PhaseId,
        prerequisite: PhaseId,
    },

    /// Configuration names a phase that no phase list contains.
    #[error("unknown phase `{phase}`")]
    UnknownPhase { phase: String },
}

impl OrderingError {
    /// The phase the error is reported against.
    pub fn phase(&self) -> Option<PhaseId> {
        match self {
            OrderingError::DuplicatePhase { phase }
            | OrderingError::MissingPrerequisite { phase, .. }
            | OrderingError::MisplacedPrerequisite { phase, .. }
            | OrderingError::DisabledPrerequisite { phase, .. } => Some(*phase),
            OrderingError::UnknownPhase { .. } => None,
        }
    }
}

/// Malformed pipeline options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown option `{option}`")]
    UnknownOption { option: String },

    #[error("option `{option}` requires a value")]
    MissingValue { option: String },

    #[error("option `{option}` does not take a value")]
    UnexpectedValue { option: String },

    #[error("invalid value `{value}` for option `{option}`: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
}

// ============================================================================
// Run-time Errors
// ============================================================================

/// A structural property of the IR does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated at {node}: {description}")]
pub struct InvariantViolation {
    pub description: String,
    pub node: NodeRef,
}

impl InvariantViolation {
    pub fn new(description: impl Into<String>, node: NodeRef) -> Self {
        Self {
            description: description.into(),
            node,
        }
    }
}

/// A fixpoint phase ran out of iterations with work still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no fixpoint after {iterations} iterations ({residual} items still pending)")]
pub struct NonConvergenceError {
    pub iterations: usize,
    pub residual: usize,
}

/// Why a phase failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhaseFailure {
    /// The phase body reported an error.
    #[error("{message}")]
    Failed {
        message: String,
        location: Option<NodeRef>,
    },

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    NonConvergence(#[from] NonConvergenceError),

    /// A file-level phase failed inside a per-file sub-pipeline.
    #[error("in file `{file}`: {error}")]
    File {
        file: String,
        error: Box<PhaseError>,
    },

    /// Several files failed; only produced when file errors are collected.
    #[error("{} files failed", .0.len())]
    Files(Vec<PhaseError>),

    /// A prerequisite was skipped in this scope.
    #[error("prerequisite `{prerequisite}` has not run")]
    PrerequisiteNotRun { prerequisite: PhaseId },

    #[error("compilation cancelled")]
    Cancelled,
}

impl PhaseFailure {
    /// A plain failure with a message.
    pub fn msg(message: impl Into<String>) -> Self {
        PhaseFailure::Failed {
            message: message.into(),
            location: None,
        }
    }

    /// A failure pointing at a node.
    pub fn at(message: impl Into<String>, location: NodeRef) -> Self {
        PhaseFailure::Failed {
            message: message.into(),
            location: Some(location),
        }
    }

    /// The IR location this failure points at, if any.
    pub fn location(&self) -> Option<&NodeRef> {
        match self {
            PhaseFailure::Failed { location, .. } => location.as_ref(),
            PhaseFailure::Invariant(violation) => Some(&violation.node),
            PhaseFailure::File { error, .. } => error.failure.location(),
            _ => None,
        }
    }
}

/// A named phase failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("phase `{phase}` ({description}) failed on {unit}: {failure}")]
pub struct PhaseError {
    pub phase: PhaseId,
    pub description: &'static str,
    /// Label of the work unit the phase ran on.
    pub unit: String,
    #[source]
    pub failure: PhaseFailure,
}

impl PhaseError {
    pub fn new(
        phase: PhaseId,
        description: &'static str,
        unit: impl Into<String>,
        failure: PhaseFailure,
    ) -> Self {
        Self {
            phase,
            description,
            unit: unit.into(),
            failure,
        }
    }

    /// The innermost failing phase, following per-file nesting.
    pub fn innermost(&self) -> &PhaseError {
        match &self.failure {
            PhaseFailure::File { error, .. } => error.innermost(),
            _ => self,
        }
    }
}

/// Anything that can stop a pipeline run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ordering(#[from] OrderingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Phase(#[from] PhaseError),
}
