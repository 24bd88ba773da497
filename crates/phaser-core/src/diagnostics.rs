//! Diagnostic sink carried by the compilation context.
//!
//! Rendering diagnostics for a user is left to the embedding driver; the
//! pipeline only collects them in emission order.

use std::fmt;

use crate::{NodeRef, PhaseId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Phase that emitted the diagnostic, if it came from a phase.
    pub phase: Option<PhaseId>,
    pub message: String,
    pub location: Option<NodeRef>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            phase: None,
            message: message.into(),
            location: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn with_phase(mut self, phase: PhaseId) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_location(mut self, location: NodeRef) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(phase) = self.phase {
            write!(f, "[{}]", phase)?;
        }
        if let Some(location) = &self.location {
            write!(f, " {}", location)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Diagnostics in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileId, NodeId};

    #[test]
    fn display_includes_phase_and_location() {
        let diag = Diagnostic::error("call to unknown function `nope`")
            .with_phase(PhaseId::new("resolve_calls"))
            .with_location(NodeRef::new(FileId::new(0), "a.src", NodeId::new(4)));
        assert_eq!(
            diag.to_string(),
            "error[resolve_calls] a.src#4: call to unknown function `nope`"
        );
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut sink = Diagnostics::default();
        sink.push(Diagnostic::warning("unused alias"));
        assert!(!sink.has_errors());
        sink.push(Diagnostic::error("broken"));
        assert!(sink.has_errors());
        assert_eq!(sink.len(), 2);
    }
}
