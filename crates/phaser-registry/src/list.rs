//! Ordered phase lists and their validation.
//!
//! A phase list is curated by hand: its order is the execution order. The
//! only thing checked is that the order honours every declared
//! prerequisite. Nothing here ever reorders phases; changing the order of a
//! pipeline is an edit to the list that builds it.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use phaser_core::{OrderingError, PhaseId, PipelineConfig, WorkUnit};

use crate::descriptor::{PhaseDescriptor, PhaseSummary};

/// Check that every prerequisite precedes its dependent.
///
/// Scans in list order and reports the first violation: a duplicate id, a
/// prerequisite missing from the list, or one that only appears at or after
/// the dependent's position.
pub fn check_order<'a, I>(phases: I) -> Result<(), OrderingError>
where
    I: IntoIterator<Item = (PhaseId, &'a [PhaseId])>,
{
    let phases: Vec<(PhaseId, &[PhaseId])> = phases.into_iter().collect();

    let mut positions: FxHashMap<PhaseId, usize> = FxHashMap::default();
    for (index, (id, _)) in phases.iter().enumerate() {
        positions.entry(*id).or_insert(index);
    }

    for (index, (id, prerequisites)) in phases.iter().enumerate() {
        if positions[id] != index {
            return Err(OrderingError::DuplicatePhase { phase: *id });
        }
        for prerequisite in prerequisites.iter() {
            match positions.get(prerequisite) {
                None => {
                    return Err(OrderingError::MissingPrerequisite {
                        phase: *id,
                        prerequisite: *prerequisite,
                    });
                }
                Some(&at) if at >= index => {
                    return Err(OrderingError::MisplacedPrerequisite {
                        phase: *id,
                        prerequisite: *prerequisite,
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}

/// Validate a sequence of descriptors.
pub fn validate<U: WorkUnit>(phases: &[PhaseDescriptor<U>]) -> Result<(), OrderingError> {
    check_order(phases.iter().map(|p| (p.id(), p.prerequisites())))
}

/// A validated, immutable sequence of phases in execution order.
pub struct OrderedPhaseList<U> {
    phases: Vec<PhaseDescriptor<U>>,
}

impl<U: WorkUnit> OrderedPhaseList<U> {
    /// Build a list, rejecting any order that breaks a prerequisite.
    pub fn new(phases: Vec<PhaseDescriptor<U>>) -> Result<Self, OrderingError> {
        validate(&phases)?;
        Ok(Self { phases })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseDescriptor<U>> {
        self.phases.iter()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn get(&self, id: PhaseId) -> Option<&PhaseDescriptor<U>> {
        self.phases.iter().find(|p| p.id() == id)
    }

    pub fn ids(&self) -> Vec<PhaseId> {
        self.phases.iter().map(|p| p.id()).collect()
    }

    /// Summaries of every phase, nested lists included.
    pub fn summaries(&self) -> Vec<PhaseSummary> {
        self.phases.iter().map(|p| p.summary()).collect()
    }

    /// Check a configuration against this list and everything nested in it.
    ///
    /// Every phase named by the configuration must exist somewhere, and no
    /// enabled phase may depend on a disabled one.
    pub fn check_config(&self, config: &PipelineConfig) -> Result<(), OrderingError> {
        let summaries = self.summaries();
        let known: FxHashSet<&str> = summaries
            .iter()
            .flat_map(|s| s.walk())
            .map(|s| s.id.as_str())
            .collect();

        for name in config.disabled_phases.iter().chain(&config.dump_after) {
            if !known.contains(name.as_str()) {
                return Err(OrderingError::UnknownPhase {
                    phase: name.clone(),
                });
            }
        }

        check_disabled(&summaries, config)
    }
}

fn check_disabled(level: &[PhaseSummary], config: &PipelineConfig) -> Result<(), OrderingError> {
    for summary in level {
        if !config.is_enabled(summary.id) {
            continue;
        }
        if let Some(prerequisite) = summary
            .prerequisites
            .iter()
            .find(|p| !config.is_enabled(**p))
        {
            return Err(OrderingError::DisabledPrerequisite {
                phase: summary.id,
                prerequisite: *prerequisite,
            });
        }
        check_disabled(&summary.children, config)?;
    }
    Ok(())
}

impl<U> fmt::Debug for OrderedPhaseList<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.phases.iter()).finish()
    }
}

/// One line per phase, nested phases indented under their parent.
impl<U: WorkUnit> fmt::Display for OrderedPhaseList<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_level(
            f: &mut fmt::Formatter<'_>,
            level: &[PhaseSummary],
            depth: usize,
        ) -> fmt::Result {
            for summary in level {
                write!(
                    f,
                    "{:indent$}{:<24} [{} {}] {}",
                    "",
                    summary.id.as_str(),
                    summary.granularity,
                    summary.kind,
                    summary.description,
                    indent = depth * 2
                )?;
                if !summary.prerequisites.is_empty() {
                    let names: Vec<&str> =
                        summary.prerequisites.iter().map(|p| p.as_str()).collect();
                    write!(f, " (after {})", names.join(", "))?;
                }
                writeln!(f)?;
                write_level(f, &summary.children, depth + 1)?;
            }
            Ok(())
        }

        write_level(f, &self.summaries(), 0)
    }
}
