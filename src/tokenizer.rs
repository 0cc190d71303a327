//! Lexical analysis: turns raw source text into a stream of logical lines.
//!
//! The language is line-oriented – no statement ever wraps across rows – so
//! the unit handed to the parser is a *logical line*: the ordered token texts
//! of one source row. Rows that are blank or whitespace-only produce no
//! logical line at all. The scanner knows nothing about the grammar beyond
//! token boundaries; keywords, identifiers and literals are told apart later.

use crate::error::{CompileError, CompileResult};

const TWO_CHAR_OPS: [&str; 6] = ["<<", ">>", "==", "!=", "<=", ">="];

/// One logical line: the 1-based source row it came from plus its tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
  pub row: usize,
  pub tokens: Vec<String>,
}

/// Cursor over the logical lines of one compilation.
///
/// `peek` inspects the next line without consuming it, `read` consumes it.
/// Both fail with a "no input remaining" diagnostic once the stream is
/// exhausted; `finished` lets the parser test for that instead.
#[derive(Debug)]
pub struct LineStream {
  lines: Vec<Line>,
  pos: usize,
}

impl LineStream {
  /// Scan the whole source up front; any lexical fault aborts immediately.
  pub fn new(source: &str) -> CompileResult<Self> {
    let mut lines = Vec::new();
    for (i, raw) in source.lines().enumerate() {
      let row = i + 1;
      let tokens = scan_row(raw, row)?;
      if !tokens.is_empty() {
        lines.push(Line { row, tokens });
      }
    }
    Ok(Self { lines, pos: 0 })
  }

  pub fn peek(&self) -> CompileResult<&Line> {
    self
      .lines
      .get(self.pos)
      .ok_or_else(|| CompileError::syntax(self.last_row(), "no input remaining"))
  }

  pub fn read(&mut self) -> CompileResult<Line> {
    let line = self
      .lines
      .get(self.pos)
      .cloned()
      .ok_or_else(|| CompileError::syntax(self.last_row(), "no input remaining"))?;
    self.pos += 1;
    Ok(line)
  }

  pub fn finished(&self) -> bool {
    self.pos >= self.lines.len()
  }

  /// Row to blame when the stream runs dry: the last line we ever held.
  fn last_row(&self) -> usize {
    self.lines.last().map(|line| line.row).unwrap_or(1)
  }
}

/// Scan one source row into its token texts.
fn scan_row(raw: &str, row: usize) -> CompileResult<Vec<String>> {
  let bytes = raw.as_bytes();
  let mut tokens = Vec::new();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];

    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    // A comment swallows the rest of the row as a single token.
    if c == b'#' {
      tokens.push(raw[i..].to_string());
      break;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      tokens.push(raw[start..i].to_string());
      continue;
    }

    // Numbers are consumed greedily over alphanumerics so `0x1F` stays one
    // token; validation of the digits happens at parse time.
    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
      }
      tokens.push(raw[start..i].to_string());
      continue;
    }

    if c == b'"' || c == b'\'' {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i] != c {
        i += 1;
      }
      if i >= bytes.len() {
        return Err(CompileError::syntax(row, "unterminated string literal"));
      }
      i += 1; // closing quote
      tokens.push(raw[start..i].to_string());
      continue;
    }

    if let Some(op) = TWO_CHAR_OPS.iter().find(|op| raw[i..].starts_with(**op)) {
      tokens.push((*op).to_string());
      i += op.len();
      continue;
    }

    if matches!(
      c,
      b'+'
        | b'-'
        | b'*'
        | b'/'
        | b'%'
        | b'&'
        | b'|'
        | b'^'
        | b'~'
        | b'<'
        | b'>'
        | b'='
        | b'('
        | b')'
        | b'['
        | b']'
        | b','
        | b':'
        | b'?'
    ) {
      tokens.push((c as char).to_string());
      i += 1;
      continue;
    }

    let invalid = raw[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::syntax(
      row,
      format!("invalid character '{invalid}'"),
    ));
  }

  Ok(tokens)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn groups_tokens_by_row_and_skips_blanks() {
    let stream = LineStream::new("FUNC main ( )\n\n   \nVARS :\n").unwrap();
    assert_eq!(stream.lines.len(), 2);
    assert_eq!(stream.lines[0].row, 1);
    assert_eq!(stream.lines[0].tokens, ["FUNC", "main", "(", ")"]);
    assert_eq!(stream.lines[1].row, 4);
  }

  #[test]
  fn peek_does_not_consume() {
    let mut stream = LineStream::new("a = b\nGOTO x\n").unwrap();
    assert_eq!(stream.peek().unwrap().tokens, ["a", "=", "b"]);
    assert_eq!(stream.read().unwrap().tokens, ["a", "=", "b"]);
    assert_eq!(stream.read().unwrap().tokens, ["GOTO", "x"]);
    assert!(stream.finished());
  }

  #[test]
  fn exhausted_stream_reports_no_input() {
    let mut stream = LineStream::new("END\n").unwrap();
    stream.read().unwrap();
    let err = stream.read().unwrap_err();
    assert!(err.to_string().contains("no input remaining"));
  }

  #[test]
  fn two_char_operators_scan_before_single() {
    let stream = LineStream::new("a << b >= c == d\n").unwrap();
    assert_eq!(
      stream.lines[0].tokens,
      ["a", "<<", "b", ">=", "c", "==", "d"]
    );
  }

  #[test]
  fn complement_operator_scans() {
    let stream = LineStream::new("x = ~ y\n").unwrap();
    assert_eq!(stream.lines[0].tokens, ["x", "=", "~", "y"]);
  }

  #[test]
  fn numbers_consume_hex_digits() {
    let stream = LineStream::new("x = 0x1F\n").unwrap();
    assert_eq!(stream.lines[0].tokens, ["x", "=", "0x1F"]);
  }

  #[test]
  fn strings_keep_their_quotes() {
    let stream = LineStream::new("PRINT \"hi there\"\n").unwrap();
    assert_eq!(stream.lines[0].tokens, ["PRINT", "\"hi there\""]);
  }

  #[test]
  fn unterminated_string_is_an_error() {
    let err = LineStream::new("PRINT \"oops\n").unwrap_err();
    assert!(err.to_string().contains("unterminated"));
    assert!(err.to_string().starts_with("line 1:"));
  }

  #[test]
  fn comment_token_swallows_the_row() {
    let stream = LineStream::new("# a = b, untouched\n").unwrap();
    assert_eq!(stream.lines[0].tokens, ["# a = b, untouched"]);
  }

  #[test]
  fn invalid_character_is_rejected() {
    let err = LineStream::new("a = @b\n").unwrap_err();
    assert!(err.to_string().contains("invalid character"));
  }
}
