//! External tool execution.
//!
//! Every pipeline stage that shells out goes through [`execute`]: the child's
//! stdout and stderr are piped separately and drained by two readers that run
//! concurrently. Reading one stream to the end before touching the other
//! deadlocks as soon as the unread pipe fills while the tool is still writing,
//! so both readers are joined before the exit status is awaited.
//!
//! # Submodules
//!
//! - [`runner`] - exit-status policy and the [`ToolRunner`] seam used by stages
//! - [`sink`] - where echoed output lines go
//! - [`types`] - invocation and result values

pub mod runner;
pub mod sink;
pub mod types;

use std::io;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::BuildError;

pub use runner::{ProcessRunner, ToolRunner, check_status};
pub use sink::{ConsoleSink, LineSink, LogSink};
pub use types::{Channel, ExecutionResult, ToolInvocation};

/// Run one external program to completion.
///
/// `on_stdout` and `on_stderr` are called once per line, without the line
/// terminator, as soon as the line is read. Neither is called again after its
/// stream reaches end of file.
///
/// Only failures to start or read from the process are errors here; the exit
/// status is reported in the result and judged by [`check_status`].
pub async fn execute<O, E>(
  invocation: &ToolInvocation,
  mut on_stdout: O,
  mut on_stderr: E,
) -> Result<ExecutionResult, BuildError>
where
  O: FnMut(&str) + Send,
  E: FnMut(&str) + Send,
{
  let program = invocation.program_name();

  let mut command = Command::new(&invocation.program);
  command
    .args(&invocation.args)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  if let Some(dir) = &invocation.cwd {
    command.current_dir(dir);
  }

  debug!(program = %program, args = invocation.args.len(), "spawning process");

  let mut child = command.spawn().map_err(|source| BuildError::Spawn {
    program: program.clone(),
    source,
  })?;

  let stdout = child.stdout.take().ok_or_else(|| not_captured(&program, Channel::Stdout))?;
  let stderr = child.stderr.take().ok_or_else(|| not_captured(&program, Channel::Stderr))?;

  let (stdout, stderr) = tokio::join!(drain(stdout, &mut on_stdout), drain(stderr, &mut on_stderr));
  let stdout = stdout?;
  let stderr = stderr?;

  let status = child.wait().await?;

  debug!(program = %program, code = ?status.code(), "process exited");

  Ok(ExecutionResult {
    code: status.code(),
    stdout,
    stderr,
  })
}

/// Read `reader` line by line until end of stream.
///
/// Bytes are decoded lossily; tools occasionally print names in legacy code
/// pages and a decoding error must not stop the drain.
async fn drain<R, F>(reader: R, on_line: &mut F) -> io::Result<String>
where
  R: AsyncRead + Unpin,
  F: FnMut(&str),
{
  let mut reader = BufReader::new(reader);
  let mut text = String::new();
  let mut buf = Vec::new();

  loop {
    buf.clear();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
      break;
    }

    let line = String::from_utf8_lossy(&buf);
    on_line(line.trim_end_matches(['\n', '\r']));
    text.push_str(&line);
  }

  Ok(text)
}

fn not_captured(program: &str, channel: Channel) -> BuildError {
  BuildError::Spawn {
    program: program.to_string(),
    source: io::Error::other(format!("{} was not captured", channel)),
  }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::util::testutil::shell_cmd;

  fn sh(script: &str) -> ToolInvocation {
    let (program, args) = shell_cmd(script);
    ToolInvocation::new(program).args(args)
  }

  #[tokio::test]
  async fn collects_both_streams_in_arrival_order() {
    let inv = sh("printf 'a\\nb\\n'; printf 'e1\\n' >&2; printf 'c\\n'; printf 'e2\\n' >&2");

    let mut out_lines = Vec::new();
    let mut err_lines = Vec::new();
    let result = execute(
      &inv,
      |l| out_lines.push(l.to_string()),
      |l| err_lines.push(l.to_string()),
    )
    .await
    .unwrap();

    assert_eq!(result.code, Some(0));
    assert_eq!(result.stdout, "a\nb\nc\n");
    assert_eq!(result.stderr, "e1\ne2\n");
    assert_eq!(out_lines, vec!["a", "b", "c"]);
    assert_eq!(err_lines, vec!["e1", "e2"]);
  }

  #[tokio::test]
  async fn final_line_without_newline_is_kept() {
    let inv = sh("printf 'first\\ntail'");

    let mut lines = Vec::new();
    let result = execute(&inv, |l| lines.push(l.to_string()), |_| {}).await.unwrap();

    assert_eq!(result.stdout, "first\ntail");
    assert_eq!(lines, vec!["first", "tail"]);
  }

  #[tokio::test]
  async fn nonzero_exit_is_reported_not_raised() {
    let inv = sh("echo boom >&2; exit 3");

    let result = execute(&inv, |_| {}, |_| {}).await.unwrap();

    assert_eq!(result.code, Some(3));
    assert_eq!(result.stderr, "boom\n");
    assert!(!result.success());
  }

  #[tokio::test]
  async fn large_stderr_does_not_deadlock() {
    // Far more than a pipe buffer on stderr while stdout stays open.
    let inv = sh("head -c 1048576 /dev/zero | tr '\\000' x >&2; echo done; head -c 1048576 /dev/zero | tr '\\000' y");

    let result = tokio::time::timeout(Duration::from_secs(60), execute(&inv, |_| {}, |_| {}))
      .await
      .expect("runner hung on a full pipe")
      .unwrap();

    assert_eq!(result.code, Some(0));
    assert_eq!(result.stderr.len(), 1_048_576);
    assert!(result.stdout.starts_with("done\n"));
    assert_eq!(result.stdout.len(), "done\n".len() + 1_048_576);
  }

  #[tokio::test]
  async fn invalid_utf8_is_decoded_lossily() {
    let inv = sh("printf '\\377abc\\n'");

    let result = execute(&inv, |_| {}, |_| {}).await.unwrap();

    assert!(result.stdout.ends_with("abc\n"));
    assert!(result.stdout.contains('\u{FFFD}'));
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let inv = ToolInvocation::new("/nonexistent/gmapmaker-tool");

    let err = execute(&inv, |_| {}, |_| {}).await.unwrap_err();

    assert!(matches!(err, BuildError::Spawn { ref program, .. } if program == "/nonexistent/gmapmaker-tool"));
  }

  #[tokio::test]
  async fn runs_in_requested_directory() {
    let temp = tempfile::tempdir().unwrap();
    let inv = sh("pwd").current_dir(temp.path());

    let result = execute(&inv, |_| {}, |_| {}).await.unwrap();

    let reported = std::path::PathBuf::from(result.stdout.trim());
    assert_eq!(
      dunce::canonicalize(reported).unwrap(),
      dunce::canonicalize(temp.path()).unwrap()
    );
  }
}
