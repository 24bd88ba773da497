//! Pipeline configuration.
//!
//! Options can be set programmatically through the builder methods on
//! [`PipelineConfig`] or parsed from `key` / `key=value` strings with
//! [`PipelineConfig::from_options`]:
//!
//! | option                      | effect                                           |
//! |-----------------------------|--------------------------------------------------|
//! | `verbose`                   | log phase start/finish at info level             |
//! | `timings`                   | log wall time of every phase                     |
//! | `dump-ir`                   | record the IR after every phase                  |
//! | `dump-after=<phase>`        | record the IR after one phase (repeatable)       |
//! | `disable=<phase>`           | skip a phase (repeatable)                        |
//! | `max-fixpoint-iterations=N` | iteration bound for fixpoint phases (N >= 1)     |
//! | `collect-file-errors`       | keep lowering other files after one file fails   |

use bitflags::bitflags;

use crate::PhaseId;
use crate::error::ConfigError;

/// Iteration bound for fixpoint phases when nothing else is configured.
///
/// Forward-reference resolution converges in one to three rounds on real
/// inputs; hitting this bound means a cycle or a progress-tracking bug.
pub const DEFAULT_MAX_FIXPOINT_ITERATIONS: usize = 50;

bitflags! {
    /// Debugging aids applied by every runner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DebugFlags: u8 {
        /// Log phase boundaries at info level instead of debug.
        const VERBOSE = 1 << 0;
        /// Record an IR dump after every phase.
        const DUMP_IR = 1 << 1;
        /// Log the wall time of every phase.
        const TIMINGS = 1 << 2;
    }
}

/// What a per-file sub-pipeline does when one file fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FileErrorPolicy {
    /// Stop at the first failing file.
    #[default]
    FailFast,
    /// Lower every file, then fail with all file errors in file order.
    CollectAll,
}

/// Scalar options with their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineOption {
    Verbose,
    DumpIr,
    Timings,
    MaxFixpointIterations,
    CollectFileErrors,
}

impl PipelineOption {
    pub fn default_value(&self) -> usize {
        match self {
            PipelineOption::Verbose => 0,
            PipelineOption::DumpIr => 0,
            PipelineOption::Timings => 0,
            PipelineOption::MaxFixpointIterations => DEFAULT_MAX_FIXPOINT_ITERATIONS,
            PipelineOption::CollectFileErrors => 0,
        }
    }
}

/// Configuration shared by every phase of one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub debug: DebugFlags,
    pub disabled_phases: Vec<String>,
    pub dump_after: Vec<String>,
    pub max_fixpoint_iterations: usize,
    pub file_error_policy: FileErrorPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debug: DebugFlags::empty(),
            disabled_phases: Vec::new(),
            dump_after: Vec::new(),
            max_fixpoint_iterations: PipelineOption::MaxFixpointIterations.default_value(),
            file_error_policy: FileErrorPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key` / `key=value` options on top of the defaults.
    pub fn from_options<I, S>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for option in options {
            config.apply_option(option.as_ref())?;
        }
        Ok(config)
    }

    /// Apply one textual option.
    pub fn apply_option(&mut self, option: &str) -> Result<(), ConfigError> {
        let (key, value) = match option.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (option.trim(), None),
        };

        match key {
            "verbose" => self.set_flag(key, value, DebugFlags::VERBOSE),
            "timings" => self.set_flag(key, value, DebugFlags::TIMINGS),
            "dump-ir" => self.set_flag(key, value, DebugFlags::DUMP_IR),
            "collect-file-errors" => {
                no_value(key, value)?;
                self.file_error_policy = FileErrorPolicy::CollectAll;
                Ok(())
            }
            "disable" => {
                let phase = phase_value(key, value)?;
                self.disabled_phases.push(phase);
                Ok(())
            }
            "dump-after" => {
                let phase = phase_value(key, value)?;
                self.dump_after.push(phase);
                Ok(())
            }
            "max-fixpoint-iterations" => {
                let raw = value.ok_or_else(|| ConfigError::MissingValue {
                    option: key.to_string(),
                })?;
                let bound: usize = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    option: key.to_string(),
                    value: raw.to_string(),
                    reason: "expected a positive integer".to_string(),
                })?;
                if bound == 0 {
                    return Err(ConfigError::InvalidValue {
                        option: key.to_string(),
                        value: raw.to_string(),
                        reason: "the bound must be at least 1".to_string(),
                    });
                }
                self.max_fixpoint_iterations = bound;
                Ok(())
            }
            _ => Err(ConfigError::UnknownOption {
                option: key.to_string(),
            }),
        }
    }

    fn set_flag(
        &mut self,
        key: &str,
        value: Option<&str>,
        flag: DebugFlags,
    ) -> Result<(), ConfigError> {
        no_value(key, value)?;
        self.debug.insert(flag);
        Ok(())
    }

    pub fn with_debug(mut self, flags: DebugFlags) -> Self {
        self.debug |= flags;
        self
    }

    pub fn disable(mut self, phase: impl Into<String>) -> Self {
        self.disabled_phases.push(phase.into());
        self
    }

    pub fn dump_after(mut self, phase: impl Into<String>) -> Self {
        self.dump_after.push(phase.into());
        self
    }

    pub fn with_max_fixpoint_iterations(mut self, bound: usize) -> Self {
        self.max_fixpoint_iterations = bound.max(1);
        self
    }

    pub fn with_file_error_policy(mut self, policy: FileErrorPolicy) -> Self {
        self.file_error_policy = policy;
        self
    }

    /// Current value of a scalar option, flags reported as 0 or 1.
    pub fn value(&self, option: PipelineOption) -> usize {
        match option {
            PipelineOption::Verbose => self.debug.contains(DebugFlags::VERBOSE) as usize,
            PipelineOption::DumpIr => self.debug.contains(DebugFlags::DUMP_IR) as usize,
            PipelineOption::Timings => self.debug.contains(DebugFlags::TIMINGS) as usize,
            PipelineOption::MaxFixpointIterations => self.max_fixpoint_iterations,
            PipelineOption::CollectFileErrors => {
                (self.file_error_policy == FileErrorPolicy::CollectAll) as usize
            }
        }
    }

    /// Whether a runner should execute this phase.
    pub fn is_enabled(&self, phase: PhaseId) -> bool {
        !self.disabled_phases.iter().any(|d| d == phase.as_str())
    }

    /// Whether the IR should be recorded after this phase.
    pub fn should_dump(&self, phase: PhaseId) -> bool {
        self.debug.contains(DebugFlags::DUMP_IR)
            || self.dump_after.iter().any(|d| d == phase.as_str())
    }
}

fn no_value(key: &str, value: Option<&str>) -> Result<(), ConfigError> {
    match value {
        None => Ok(()),
        Some(_) => Err(ConfigError::UnexpectedValue {
            option: key.to_string(),
        }),
    }
}

fn phase_value(key: &str, value: Option<&str>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingValue {
            option: key.to_string(),
        }),
    }
}
