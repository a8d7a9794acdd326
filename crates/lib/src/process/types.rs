//! Value types for external tool invocations.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which output stream of a child process a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
  Stdout,
  Stderr,
}

impl Channel {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Stdout => "stdout",
      Self::Stderr => "stderr",
    }
  }
}

impl fmt::Display for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One call of an external program: the program plus its ordered arguments.
///
/// Built fresh for every call and never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
  pub program: OsString,
  pub args: Vec<OsString>,
  /// Treat any stderr output as failure even when the exit status is zero.
  pub strict: bool,
  /// Working directory for the child; inherits the parent's when `None`.
  pub cwd: Option<PathBuf>,
}

impl ToolInvocation {
  pub fn new(program: impl Into<OsString>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      strict: false,
      cwd: None,
    }
  }

  pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Opt this call into strict mode.
  pub fn strict(mut self) -> Self {
    self.strict = true;
    self
  }

  pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.cwd = Some(dir.as_ref().to_path_buf());
    self
  }

  /// Program name as shown in logs and errors.
  pub fn program_name(&self) -> String {
    self.program.to_string_lossy().into_owned()
  }

  /// Arguments rendered lossily, mostly for tests and logging.
  pub fn args_lossy(&self) -> Vec<String> {
    self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
  }

  /// Whether any argument equals `arg` exactly.
  pub fn has_arg(&self, arg: &str) -> bool {
    self.args.iter().any(|a| a == arg)
  }

  /// Value of the first `--name=value` style argument with the given prefix.
  pub fn arg_value(&self, prefix: &str) -> Option<String> {
    self
      .args
      .iter()
      .filter_map(|a| a.to_str())
      .find_map(|a| a.strip_prefix(prefix).map(str::to_string))
  }
}

impl fmt::Display for ToolInvocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program.to_string_lossy())?;
    for arg in &self.args {
      write!(f, " {}", arg.to_string_lossy())?;
    }
    Ok(())
  }
}

/// What a finished external program left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
  /// Exit code, `None` when the process was terminated by a signal.
  pub code: Option<i32>,
  /// Every stdout line in arrival order, line terminators included.
  pub stdout: String,
  /// Every stderr line in arrival order, line terminators included.
  pub stderr: String,
}

impl ExecutionResult {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}
