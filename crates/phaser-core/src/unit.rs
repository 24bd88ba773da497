//! Work units: the IR scope a phase operates on.

use std::fmt;

use crate::ir::{File, Module};

/// Granularity of a work unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Granularity {
    WholeModule,
    SingleFile,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::WholeModule => write!(f, "module"),
            Granularity::SingleFile => write!(f, "file"),
        }
    }
}

/// Something a phase list can run over.
///
/// Phase lists and runners are generic over the unit type, so a file-level
/// phase cannot be placed in a module-level list by accident.
pub trait WorkUnit {
    const GRANULARITY: Granularity;

    /// Human-readable label used in errors, logs and phase history.
    fn label(&self) -> String;

    /// Text form of the IR, recorded by IR dumps.
    fn render(&self) -> String;
}

impl WorkUnit for Module {
    const GRANULARITY: Granularity = Granularity::WholeModule;

    fn label(&self) -> String {
        format!("module `{}`", self.name())
    }

    fn render(&self) -> String {
        Module::render(self)
    }
}

impl WorkUnit for File {
    const GRANULARITY: Granularity = Granularity::SingleFile;

    fn label(&self) -> String {
        format!("file `{}`", self.path())
    }

    fn render(&self) -> String {
        File::render(self)
    }
}
