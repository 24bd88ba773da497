//! Test-execution harness for artifacts produced by a phaser pipeline.
//!
//! Sits outside the pipeline: it only sees an exit status and the combined
//! stdout/stderr of a finished process. Nothing in the pipeline crates
//! depends on it.

pub mod expectation;
pub mod process;

pub use expectation::{
    Mismatch, OutputCheck, ProcessOutcome, TestExpectation, Verdict, evaluate, normalize_output,
};
pub use process::{HarnessError, run_artifact};
