//! Running a built test artifact.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, Stdio};
use std::thread;

use thiserror::Error;

use crate::expectation::ProcessOutcome;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to run `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{}` was terminated by a signal", path.display())]
    Signalled { path: PathBuf },
}

/// Run `path` with `args`, feeding it `stdin`, and capture how it ended.
///
/// The outcome's output is stdout followed by stderr, decoded lossily.
/// Input is written from a separate thread while the output is collected,
/// so a child that interleaves reading and writing cannot block on a full
/// pipe. A child that exits before reading all of its input is fine.
///
/// # Errors
///
/// Fails if the process cannot be spawned or waited on, or if it exits
/// without a status code.
pub fn run_artifact<I, S>(
    path: impl AsRef<Path>,
    args: I,
    stdin: Option<&[u8]>,
) -> Result<ProcessOutcome, HarnessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let path = path.as_ref();
    let io = |source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    };
    tracing::debug!(path = %path.display(), "running test artifact");

    let mut child = Command::new(path)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(io)?;

    let pending = stdin.zip(child.stdin.take());
    let output = thread::scope(|scope| -> Result<_, HarnessError> {
        let writer = pending.map(|input| scope.spawn(move || feed(input)));
        let output = child.wait_with_output().map_err(io)?;
        if let Some(writer) = writer {
            writer
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                .map_err(io)?;
        }
        Ok(output)
    })?;
    let exit_status = output.status.code().ok_or_else(|| HarnessError::Signalled {
        path: path.to_path_buf(),
    })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    tracing::debug!(exit_status, bytes = text.len(), "test artifact finished");

    Ok(ProcessOutcome {
        exit_status,
        output: text,
    })
}

/// Write the input to the child and close its stdin.
fn feed((input, mut pipe): (&[u8], ChildStdin)) -> std::io::Result<()> {
    match pipe.write_all(input) {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        result => result,
    }
}
