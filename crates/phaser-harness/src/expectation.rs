//! Expectations about a finished test artifact and how they are judged.
//!
//! Two checks run independently of each other:
//!
//! - the exit status is compared against `expected_exit_status`
//! - the normalized output is compared against an [`OutputCheck`]
//!
//! `expected_fail` then inverts the overall result. An expected-fail test
//! passes when at least one check mismatches and fails when every check
//! holds.

use std::fmt;

/// Converts `\r\n` and lone `\r` line separators to `\n`.
pub fn normalize_output(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// How the captured output is judged.
pub enum OutputCheck {
    /// Output is not inspected.
    Any,
    /// Normalized output must equal this text, itself normalized.
    Exact(String),
    /// A caller-supplied test over the normalized output.
    Predicate {
        description: String,
        check: Box<dyn Fn(&str) -> bool>,
    },
}

impl OutputCheck {
    pub fn exact(text: impl Into<String>) -> Self {
        OutputCheck::Exact(text.into())
    }

    pub fn predicate(
        description: impl Into<String>,
        check: impl Fn(&str) -> bool + 'static,
    ) -> Self {
        OutputCheck::Predicate {
            description: description.into(),
            check: Box::new(check),
        }
    }

    fn mismatch(&self, output: &str) -> Option<Mismatch> {
        match self {
            OutputCheck::Any => None,
            OutputCheck::Exact(expected) => {
                let expected = normalize_output(expected);
                (expected != output).then(|| Mismatch::Output {
                    expected,
                    actual: output.to_string(),
                })
            }
            OutputCheck::Predicate { description, check } => {
                (!check(output)).then(|| Mismatch::Predicate {
                    description: description.clone(),
                    actual: output.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for OutputCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputCheck::Any => write!(f, "Any"),
            OutputCheck::Exact(text) => f.debug_tuple("Exact").field(text).finish(),
            OutputCheck::Predicate { description, .. } => f
                .debug_struct("Predicate")
                .field("description", description)
                .finish_non_exhaustive(),
        }
    }
}

/// What a test artifact is expected to do.
#[derive(Debug)]
pub struct TestExpectation {
    pub expected_exit_status: i32,
    /// The test is known to fail; a mismatch counts as success.
    pub expected_fail: bool,
    pub output: OutputCheck,
}

impl Default for TestExpectation {
    fn default() -> Self {
        Self {
            expected_exit_status: 0,
            expected_fail: false,
            output: OutputCheck::Any,
        }
    }
}

impl TestExpectation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_status(mut self, status: i32) -> Self {
        self.expected_exit_status = status;
        self
    }

    pub fn expecting_failure(mut self) -> Self {
        self.expected_fail = true;
        self
    }

    pub fn with_output(mut self, check: OutputCheck) -> Self {
        self.output = check;
        self
    }
}

/// What a test artifact actually did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_status: i32,
    /// Stdout followed by stderr, not yet normalized.
    pub output: String,
}

impl ProcessOutcome {
    pub fn new(exit_status: i32, output: impl Into<String>) -> Self {
        Self {
            exit_status,
            output: output.into(),
        }
    }
}

/// One check that did not hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    ExitStatus { expected: i32, actual: i32 },
    Output { expected: String, actual: String },
    Predicate { description: String, actual: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::ExitStatus { expected, actual } => {
                write!(f, "exit status {} (expected {})", actual, expected)
            }
            Mismatch::Output { expected, actual } => {
                write!(f, "output {:?} (expected {:?})", actual, expected)
            }
            Mismatch::Predicate {
                description,
                actual,
            } => write!(f, "output {:?} does not satisfy: {}", actual, description),
        }
    }
}

/// The judged result of one test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Vec<Mismatch>),
    /// Known failure that did fail.
    ExpectedFailure(Vec<Mismatch>),
    /// Known failure that unexpectedly held every check.
    UnexpectedPass,
}

impl Verdict {
    /// Overall outcome once `expected_fail` has been applied.
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Pass | Verdict::ExpectedFailure(_))
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        match self {
            Verdict::Fail(m) | Verdict::ExpectedFailure(m) => m,
            Verdict::Pass | Verdict::UnexpectedPass => &[],
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, mismatches) = match self {
            Verdict::Pass => return write!(f, "pass"),
            Verdict::UnexpectedPass => return write!(f, "unexpected pass"),
            Verdict::Fail(m) => ("fail", m),
            Verdict::ExpectedFailure(m) => ("expected failure", m),
        };
        write!(f, "{}", head)?;
        for (i, mismatch) in mismatches.iter().enumerate() {
            write!(f, "{} {}", if i == 0 { ":" } else { ";" }, mismatch)?;
        }
        Ok(())
    }
}

/// Judge `outcome` against `expectation`.
pub fn evaluate(expectation: &TestExpectation, outcome: &ProcessOutcome) -> Verdict {
    let mut mismatches = Vec::new();

    if outcome.exit_status != expectation.expected_exit_status {
        mismatches.push(Mismatch::ExitStatus {
            expected: expectation.expected_exit_status,
            actual: outcome.exit_status,
        });
    }

    let output = normalize_output(&outcome.output);
    mismatches.extend(expectation.output.mismatch(&output));

    match (expectation.expected_fail, mismatches.is_empty()) {
        (false, true) => Verdict::Pass,
        (false, false) => Verdict::Fail(mismatches),
        (true, true) => Verdict::UnexpectedPass,
        (true, false) => Verdict::ExpectedFailure(mismatches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_every_line_separator() {
        assert_eq!(normalize_output("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize_output("\r\r\n"), "\n\n");
        assert_eq!(normalize_output("plain"), "plain");
    }

    #[test]
    fn expected_failure_with_matching_output_passes_overall() {
        let expectation = TestExpectation::new()
            .expecting_failure()
            .with_output(OutputCheck::exact("42\n"));
        let verdict = evaluate(&expectation, &ProcessOutcome::new(1, "42\r\n"));

        assert_eq!(
            verdict,
            Verdict::ExpectedFailure(vec![Mismatch::ExitStatus {
                expected: 0,
                actual: 1
            }])
        );
        assert!(verdict.is_success());
    }

    #[test]
    fn mismatched_output_fails_and_names_the_mismatch() {
        let expectation = TestExpectation::new().with_output(OutputCheck::exact("hello\n"));
        let verdict = evaluate(&expectation, &ProcessOutcome::new(0, "goodbye\n"));

        assert!(!verdict.is_success());
        assert_eq!(
            verdict.mismatches(),
            [Mismatch::Output {
                expected: "hello\n".into(),
                actual: "goodbye\n".into()
            }]
        );
        assert_eq!(
            verdict.to_string(),
            "fail: output \"goodbye\\n\" (expected \"hello\\n\")"
        );
    }

    #[test]
    fn expected_failure_that_holds_is_an_unexpected_pass() {
        let expectation = TestExpectation::new().expecting_failure();
        let verdict = evaluate(&expectation, &ProcessOutcome::new(0, "anything"));
        assert_eq!(verdict, Verdict::UnexpectedPass);
        assert!(!verdict.is_success());
    }

    #[test]
    fn predicate_sees_normalized_output() {
        let expectation = TestExpectation::new()
            .with_exit_status(3)
            .with_output(OutputCheck::predicate("two lines", |out| {
                out.lines().count() == 2 && !out.contains('\r')
            }));

        assert_eq!(
            evaluate(&expectation, &ProcessOutcome::new(3, "a\r\nb\r\n")),
            Verdict::Pass
        );

        let verdict = evaluate(&expectation, &ProcessOutcome::new(4, "a\n"));
        assert_eq!(verdict.mismatches().len(), 2);
        assert!(matches!(
            &verdict.mismatches()[1],
            Mismatch::Predicate { description, .. } if description == "two lines"
        ));
    }
}
