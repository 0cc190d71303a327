//! Shared error types used across the compilation pipeline.
//!
//! Diagnostics come in two user-facing flavours – syntax errors anchored to a
//! source line, and semantic errors anchored to a statement within a function
//! – plus an internal kind for states that are unreachable once a program has
//! passed analysis. Only the first two should ever be caused by user input.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// Lexical or syntactic fault, anchored to a 1-based source row.
  #[snafu(display("line {line}: {message}"))]
  Syntax { line: usize, message: String },

  /// Semantic fault, anchored to a 1-based statement index within a function.
  #[snafu(display(
    "error in statement {statement} of function {function}: {rendered}: {message}"
  ))]
  Semantic {
    function: String,
    statement: usize,
    rendered: String,
    message: String,
  },

  /// Invariant violation inside the compiler itself.
  #[snafu(display("internal error: {message}"))]
  Internal { message: String },
}

impl CompileError {
  /// Construct a syntax error anchored at a source row.
  pub fn syntax(line: usize, message: impl Into<String>) -> Self {
    Self::Syntax {
      line,
      message: message.into(),
    }
  }

  /// Construct a semantic error anchored at a statement within a function.
  pub fn semantic(
    function: impl Into<String>,
    statement: usize,
    rendered: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self::Semantic {
      function: function.into(),
      statement,
      rendered: rendered.into(),
      message: message.into(),
    }
  }

  /// Construct an internal invariant-violation error.
  pub fn internal(message: impl Into<String>) -> Self {
    Self::Internal {
      message: message.into(),
    }
  }
}
