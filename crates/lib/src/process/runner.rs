//! Exit-status policy and the tool-runner seam.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::execute;
use super::sink::LineSink;
use super::types::{Channel, ExecutionResult, ToolInvocation};
use crate::error::BuildError;

/// Runs external tools on behalf of pipeline stages.
///
/// Stages only ever talk to this trait, which keeps their skip and argument
/// logic testable without the real contour generator, splitter or compiler.
#[async_trait]
pub trait ToolRunner: Send + Sync {
  /// Run `invocation` to completion, failing on a nonzero exit status (and on
  /// stderr output when the invocation is strict).
  async fn run(&self, invocation: &ToolInvocation) -> Result<ExecutionResult, BuildError>;
}

/// Runs tools as real child processes, echoing every line to a sink.
#[derive(Clone)]
pub struct ProcessRunner {
  sink: Arc<dyn LineSink>,
}

impl ProcessRunner {
  pub fn new(sink: Arc<dyn LineSink>) -> Self {
    Self { sink }
  }
}

impl std::fmt::Debug for ProcessRunner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProcessRunner").finish_non_exhaustive()
  }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
  async fn run(&self, invocation: &ToolInvocation) -> Result<ExecutionResult, BuildError> {
    info!(command = %invocation, strict = invocation.strict, "running tool");
    self.sink.started(invocation);

    let sink = self.sink.as_ref();
    let result = execute(
      invocation,
      |line| sink.line(Channel::Stdout, line),
      |line| sink.line(Channel::Stderr, line),
    )
    .await?;

    check_status(invocation, result)
  }
}

/// Apply the exit-status policy to a finished invocation.
///
/// A nonzero (or missing) exit code always fails. Under strict mode any stderr
/// output fails too, even with a zero exit code.
pub fn check_status(invocation: &ToolInvocation, result: ExecutionResult) -> Result<ExecutionResult, BuildError> {
  let stderr_rejected = invocation.strict && !result.stderr.is_empty();

  if result.success() && !stderr_rejected {
    return Ok(result);
  }

  error!(
    program = %invocation.program_name(),
    code = ?result.code,
    strict = invocation.strict,
    "tool failed"
  );

  Err(BuildError::ToolExecution {
    program: invocation.program_name(),
    code: result.code,
    stderr: result.stderr,
  })
}
