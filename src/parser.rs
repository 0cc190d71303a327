//! Recursive-descent parser over the logical-line stream.
//!
//! One logical line is one declaration or statement; the only carry-over
//! between lines is a pending label (`name :` on its own line attaches to the
//! next statement). Literal operands never survive parsing: every literal is
//! rewritten into a synthesized constant pseudo-variable so later stages see
//! identifiers everywhere, and all-literal unary/binary expressions are
//! folded to a single constant right here with 16-bit runtime semantics.

use crate::ast::{BinaryOp, Expr, Function, Program, Stmt, StmtKind, Type, UnaryOp, Value};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Line, LineStream};

const RESERVED: [&str; 12] = [
  "FUNC", "END", "RETURN", "RETURNS", "PRINT", "READ", "GOTO", "WORD", "ARRAY", "STRING", "VARS",
  "CODE",
];

/// Parse a whole program: a sequence of function definitions.
pub fn parse(source: &str) -> CompileResult<Program> {
  let mut stream = LineStream::new(source)?;
  let mut program = Program::default();

  while !stream.finished() {
    let (name, func, row) = parse_function(&mut stream)?;
    if program.functions.contains_key(&name) {
      return Err(CompileError::syntax(
        row,
        format!("duplicate definition of function '{name}'"),
      ));
    }
    program.functions.insert(name, func);
  }

  Ok(program)
}

/// Does this token obey the identifier grammar (or name a synthesized
/// constant)? Reserved words never qualify.
pub fn is_valid_identifier(token: &str) -> bool {
  if RESERVED.contains(&token) {
    return false;
  }
  if token.starts_with("_CONST") {
    return true;
  }
  let mut chars = token.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_function(stream: &mut LineStream) -> CompileResult<(String, Function, usize)> {
  let (name, mut func, row) = parse_func_head(stream)?;
  parse_vars(stream, &mut func)?;
  parse_code(stream, &mut func)?;

  // Fall-through functions still terminate with a return.
  func.code.push(Stmt::new(
    StmtKind::Return { target: None },
    None,
    None,
  ));

  let line = stream.read()?;
  if line.tokens != ["END"] {
    return Err(CompileError::syntax(
      line.row,
      "no END found after function body",
    ));
  }

  Ok((name, func, row))
}

fn parse_func_head(stream: &mut LineStream) -> CompileResult<(String, Function, usize)> {
  let line = stream.read()?;
  let row = line.row;
  let mut cur = Cursor::new(&line);

  if cur.next() != Some("FUNC") {
    return Err(CompileError::syntax(
      row,
      "non-function statement in global scope",
    ));
  }

  let name = cur
    .next()
    .ok_or_else(|| CompileError::syntax(row, "error parsing function header"))?;
  if !is_valid_identifier(name) {
    return Err(CompileError::syntax(row, "invalid function name"));
  }

  if cur.next() != Some("(") {
    return Err(CompileError::syntax(
      row,
      "no parenthesis found after function name",
    ));
  }

  let mut func = Function::new(None);
  loop {
    match cur.peek() {
      Some(")") => {
        cur.next();
        break;
      }
      None => return Err(CompileError::syntax(row, "error parsing function header")),
      Some(_) => {
        let ty = parse_type(&mut cur, row)?
          .ok_or_else(|| CompileError::syntax(row, "NONE is not a valid parameter type"))?;
        let param = cur
          .next()
          .ok_or_else(|| CompileError::syntax(row, "error parsing function header"))?;
        if !is_valid_identifier(param) {
          return Err(CompileError::syntax(row, "invalid parameter name"));
        }
        declare(&mut func, param, ty, None, row)?;
        func.params.push(param.to_string());
        if cur.peek() == Some(",") {
          cur.next();
        }
      }
    }
  }

  if cur.next() != Some("RETURNS") {
    return Err(CompileError::syntax(
      row,
      "could not find RETURNS in function header",
    ));
  }
  func.return_type = parse_type(&mut cur, row)?;

  if cur.next() != Some(":") {
    return Err(CompileError::syntax(
      row,
      "no colon found after function header",
    ));
  }
  if !cur.at_end() {
    return Err(CompileError::syntax(
      row,
      "garbage found after function header",
    ));
  }

  Ok((name.to_string(), func, row))
}

fn parse_vars(stream: &mut LineStream, func: &mut Function) -> CompileResult<()> {
  let line = stream.read()?;
  if line.tokens != ["VARS", ":"] {
    return Err(CompileError::syntax(line.row, "error parsing vars header"));
  }

  while stream.peek()?.tokens != ["CODE", ":"] {
    let line = stream.read()?;
    let row = line.row;
    let mut cur = Cursor::new(&line);

    let ty = parse_type(&mut cur, row)?
      .ok_or_else(|| CompileError::syntax(row, "NONE is not a valid variable type"))?;
    let name = cur
      .next()
      .ok_or_else(|| CompileError::syntax(row, "error parsing var declaration"))?;
    if !is_valid_identifier(name) {
      return Err(CompileError::syntax(row, "invalid variable name"));
    }
    if !cur.at_end() {
      return Err(CompileError::syntax(
        row,
        "garbage found after var declaration",
      ));
    }
    declare(func, name, ty, None, row)?;
  }

  Ok(())
}

fn parse_code(stream: &mut LineStream, func: &mut Function) -> CompileResult<()> {
  let line = stream.read()?;
  if line.tokens != ["CODE", ":"] {
    return Err(CompileError::syntax(line.row, "error parsing code header"));
  }

  let mut label: Option<String> = None;
  while stream.peek()?.tokens != ["END"] {
    let line = stream.read()?;
    let row = line.row;
    let tokens = &line.tokens;

    // Comment lines are only meaningful inside CODE blocks.
    if tokens[0].starts_with('#') {
      continue;
    }

    // A label on its own line attaches to the next statement.
    if tokens.len() == 2 && tokens[1] == ":" {
      if !is_valid_identifier(&tokens[0]) {
        return Err(CompileError::syntax(row, "invalid label name"));
      }
      label = Some(tokens[0].clone());
      continue;
    }

    let mut rest: &[String] = tokens;
    let mut condition = None;
    if rest.len() >= 2 && rest[1] == "?" {
      if !is_valid_identifier(&rest[0]) {
        return Err(CompileError::syntax(row, "invalid condition name"));
      }
      condition = Some(rest[0].clone());
      rest = &rest[2..];
    }
    if rest.is_empty() {
      return Err(CompileError::syntax(row, "could not parse statement"));
    }

    let kind = parse_statement(rest, func, row)?;
    func.code.push(Stmt::new(kind, label.take(), condition));
  }

  Ok(())
}

fn parse_statement(
  tokens: &[String],
  func: &mut Function,
  row: usize,
) -> CompileResult<StmtKind> {
  match tokens[0].as_str() {
    "GOTO" => {
      if tokens.len() != 2 || !is_valid_identifier(&tokens[1]) {
        return Err(CompileError::syntax(
          row,
          "invalid identifier in GOTO statement",
        ));
      }
      Ok(StmtKind::Goto {
        target: tokens[1].clone(),
      })
    }
    "READ" => {
      if tokens.len() != 2 || !is_valid_identifier(&tokens[1]) {
        return Err(CompileError::syntax(
          row,
          "invalid identifier in READ statement",
        ));
      }
      Ok(StmtKind::Read {
        target: tokens[1].clone(),
      })
    }
    "PRINT" => match tokens.len() {
      1 => Ok(StmtKind::Print { target: None }),
      2 => {
        let target = if is_valid_identifier(&tokens[1]) {
          tokens[1].clone()
        } else {
          create_constant(&tokens[1], func, row)?
        };
        Ok(StmtKind::Print {
          target: Some(target),
        })
      }
      _ => Err(CompileError::syntax(row, "malformed PRINT statement")),
    },
    "RETURN" => match tokens.len() {
      1 => Ok(StmtKind::Return { target: None }),
      2 if is_valid_identifier(&tokens[1]) => Ok(StmtKind::Return {
        target: Some(tokens[1].clone()),
      }),
      _ => Err(CompileError::syntax(
        row,
        "invalid identifier in RETURN statement",
      )),
    },
    _ if tokens.iter().any(|t| t == "=") => parse_assignment(tokens, func, row),
    _ if tokens.len() >= 3 && tokens[1] == "(" && tokens[tokens.len() - 1] == ")" => {
      // Bare call, evaluated for its side effects only.
      let expr = parse_expression(tokens, func, row)?;
      Ok(StmtKind::Assign {
        target: None,
        index: None,
        expr,
      })
    }
    _ => Err(CompileError::syntax(row, "could not parse statement")),
  }
}

fn parse_assignment(
  tokens: &[String],
  func: &mut Function,
  row: usize,
) -> CompileResult<StmtKind> {
  let target = &tokens[0];
  if !is_valid_identifier(target) {
    return Err(CompileError::syntax(
      row,
      "invalid identifier in assignment statement",
    ));
  }

  let mut pos = 1;
  let mut index = None;
  if tokens.get(1).map(String::as_str) == Some("[") {
    if tokens.get(3).map(String::as_str) != Some("]") {
      return Err(CompileError::syntax(
        row,
        "unbalanced brackets in assignment statement",
      ));
    }
    index = Some(if is_valid_identifier(&tokens[2]) {
      tokens[2].clone()
    } else {
      create_constant(&tokens[2], func, row)?
    });
    pos = 4;
  }

  if tokens.get(pos).map(String::as_str) != Some("=") {
    return Err(CompileError::syntax(row, "could not parse statement"));
  }

  let expr = parse_expression(&tokens[pos + 1..], func, row)?;
  Ok(StmtKind::Assign {
    target: Some(target.clone()),
    index,
    expr,
  })
}

fn parse_expression(tokens: &[String], func: &mut Function, row: usize) -> CompileResult<Expr> {
  if tokens.is_empty() {
    return Err(CompileError::syntax(row, "could not parse expression"));
  }

  if tokens.len() == 1 {
    let name = if is_valid_identifier(&tokens[0]) {
      tokens[0].clone()
    } else {
      create_constant(&tokens[0], func, row)?
    };
    return Ok(Expr::Ident { name, index: None });
  }

  if tokens.len() == 4 && tokens[1] == "[" && tokens[3] == "]" {
    if !is_valid_identifier(&tokens[0]) {
      return Err(CompileError::syntax(row, "invalid base identifier name"));
    }
    let index = if is_valid_identifier(&tokens[2]) {
      tokens[2].clone()
    } else {
      create_constant(&tokens[2], func, row)?
    };
    return Ok(Expr::Ident {
      name: tokens[0].clone(),
      index: Some(index),
    });
  }

  if tokens.len() >= 3 && tokens[1] == "(" && tokens[tokens.len() - 1] == ")" {
    if !is_valid_identifier(&tokens[0]) {
      return Err(CompileError::syntax(
        row,
        "invalid function identifier in call expression",
      ));
    }
    let arguments = parse_arguments(&tokens[2..tokens.len() - 1], func, row)?;
    return Ok(Expr::Call {
      function: tokens[0].clone(),
      arguments,
    });
  }

  if let Some(op) = parse_unary_op(&tokens[0]) {
    if tokens.len() != 2 {
      return Err(CompileError::syntax(row, "could not parse expression"));
    }
    let operand = &tokens[1];
    if !is_valid_identifier(operand) {
      // Fold a literal operand at parse time.
      let value = fold_unary(op, parse_number(operand, row)?);
      let name = create_word_constant(value, func);
      return Ok(Expr::Ident { name, index: None });
    }
    return Ok(Expr::Unary {
      op,
      operand: operand.clone(),
    });
  }

  if tokens.len() == 3 {
    if let Some(op) = BinaryOp::from_token(&tokens[1]) {
      let (left, right) = (&tokens[0], &tokens[2]);
      if !is_valid_identifier(left) && !is_valid_identifier(right) {
        // Both operands literal: fold at parse time.
        let value = fold_binary(
          op,
          parse_number(left, row)?,
          parse_number(right, row)?,
          row,
        )?;
        let name = create_word_constant(value, func);
        return Ok(Expr::Ident { name, index: None });
      }
      let left = if is_valid_identifier(left) {
        left.clone()
      } else {
        create_constant(left, func, row)?
      };
      let right = if is_valid_identifier(right) {
        right.clone()
      } else {
        create_constant(right, func, row)?
      };
      return Ok(Expr::Binary { op, left, right });
    }
  }

  Err(CompileError::syntax(row, "could not parse expression"))
}

fn parse_arguments(
  tokens: &[String],
  func: &mut Function,
  row: usize,
) -> CompileResult<Vec<String>> {
  let mut arguments = Vec::new();
  let mut pos = 0;
  while pos < tokens.len() {
    let token = &tokens[pos];
    let arg = if is_valid_identifier(token) {
      token.clone()
    } else {
      create_constant(token, func, row)?
    };
    arguments.push(arg);
    pos += 1;
    if tokens.get(pos).map(String::as_str) == Some(",") {
      pos += 1;
    } else if pos < tokens.len() {
      return Err(CompileError::syntax(
        row,
        "malformed argument list in call expression",
      ));
    }
  }
  Ok(arguments)
}

fn parse_unary_op(token: &str) -> Option<UnaryOp> {
  match token {
    "-" => Some(UnaryOp::Neg),
    "~" => Some(UnaryOp::Not),
    _ => None,
  }
}

/// Parse `NONE`, `WORD`, or `STRING[n]`/`ARRAY[n]` with n > 0.
fn parse_type(cur: &mut Cursor<'_>, row: usize) -> CompileResult<Option<Type>> {
  match cur.next() {
    Some("NONE") => Ok(None),
    Some("WORD") => Ok(Some(Type::Word)),
    Some(kw @ ("STRING" | "ARRAY")) => {
      if cur.next() != Some("[") {
        return Err(CompileError::syntax(row, "invalid type"));
      }
      let token = cur
        .next()
        .ok_or_else(|| CompileError::syntax(row, "invalid type"))?;
      let size = parse_number(token, row)?;
      if cur.next() != Some("]") {
        return Err(CompileError::syntax(row, "invalid type"));
      }
      if size == 0 {
        return Err(CompileError::syntax(row, "invalid var size"));
      }
      Ok(Some(if kw == "STRING" {
        Type::Str { size }
      } else {
        Type::Array { size }
      }))
    }
    _ => Err(CompileError::syntax(row, "invalid type")),
  }
}

/// Parse a decimal or `0x`-prefixed hex literal fitting in 16 bits.
fn parse_number(token: &str, row: usize) -> CompileResult<u16> {
  let parsed = match token.strip_prefix("0x") {
    Some(hex) => u32::from_str_radix(hex, 16),
    None => token.parse::<u32>(),
  };
  let value = parsed
    .map_err(|_| CompileError::syntax(row, format!("invalid numeric literal '{token}'")))?;
  if value > 0xffff {
    return Err(CompileError::syntax(row, "numeric literal too large"));
  }
  Ok(value as u16)
}

/// Synthesize a constant for a literal token, returning its generated name.
fn create_constant(token: &str, func: &mut Function, row: usize) -> CompileResult<String> {
  if token.starts_with('"') || token.starts_with('\'') {
    let inner = &token[1..token.len() - 1];
    let name = next_const_name(func);
    // One trailing slot so the stored text fits under the declared size.
    let size = (inner.len() + 1) as u16;
    func
      .vars
      .insert(name.clone(), (Type::Str { size }, Some(Value::Str(inner.to_string()))));
    Ok(name)
  } else {
    let value = parse_number(token, row)?;
    Ok(create_word_constant(value, func))
  }
}

fn create_word_constant(value: u16, func: &mut Function) -> String {
  let name = next_const_name(func);
  func
    .vars
    .insert(name.clone(), (Type::Word, Some(Value::Word(value))));
  name
}

fn next_const_name(func: &Function) -> String {
  format!("_CONST_{:02}", func.vars.len())
}

fn fold_unary(op: UnaryOp, value: u16) -> u16 {
  match op {
    UnaryOp::Neg => value.wrapping_neg(),
    UnaryOp::Not => !value,
  }
}

fn fold_binary(op: BinaryOp, left: u16, right: u16, row: usize) -> CompileResult<u16> {
  let value = match op {
    BinaryOp::Add => left.wrapping_add(right),
    BinaryOp::Sub => left.wrapping_sub(right),
    BinaryOp::Mul => left.wrapping_mul(right),
    BinaryOp::Div | BinaryOp::Rem if right == 0 => {
      return Err(CompileError::syntax(
        row,
        "division by zero in constant expression",
      ));
    }
    BinaryOp::Div => left / right,
    BinaryOp::Rem => left % right,
    BinaryOp::And => left & right,
    BinaryOp::Or => left | right,
    BinaryOp::Xor => left ^ right,
    BinaryOp::Shl => {
      if right >= 16 {
        0
      } else {
        left << right
      }
    }
    BinaryOp::Shr => {
      if right >= 16 {
        0
      } else {
        left >> right
      }
    }
    BinaryOp::Eq => (left == right) as u16,
    BinaryOp::Ne => (left != right) as u16,
    BinaryOp::Lt => (left < right) as u16,
    BinaryOp::Le => (left <= right) as u16,
    BinaryOp::Gt => (left > right) as u16,
    BinaryOp::Ge => (left >= right) as u16,
  };
  Ok(value)
}

fn declare(
  func: &mut Function,
  name: &str,
  ty: Type,
  value: Option<Value>,
  row: usize,
) -> CompileResult<()> {
  if func.vars.contains_key(name) {
    return Err(CompileError::syntax(
      row,
      format!("duplicate declaration of '{name}'"),
    ));
  }
  func.vars.insert(name.to_string(), (ty, value));
  Ok(())
}

/// Lightweight cursor over one logical line's tokens.
struct Cursor<'a> {
  tokens: &'a [String],
  pos: usize,
}

impl<'a> Cursor<'a> {
  fn new(line: &'a Line) -> Self {
    Self {
      tokens: &line.tokens,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&'a str> {
    self.tokens.get(self.pos).map(String::as_str)
  }

  fn next(&mut self) -> Option<&'a str> {
    let token = self.peek()?;
    self.pos += 1;
    Some(token)
  }

  fn at_end(&self) -> bool {
    self.pos >= self.tokens.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse_one(source: &str) -> Function {
    let program = parse(source).unwrap();
    program.functions.into_iter().next().unwrap().1
  }

  #[test]
  fn minimal_function_gets_implicit_return() {
    let func = parse_one("FUNC main() RETURNS NONE:\nVARS:\nCODE:\nEND\n");
    assert_eq!(func.code.len(), 1);
    assert_eq!(func.code[0].kind, StmtKind::Return { target: None });
    assert!(func.return_type.is_none());
  }

  #[test]
  fn print_literal_synthesizes_a_constant() {
    let func = parse_one("FUNC main() RETURNS NONE:\nVARS:\nCODE:\nPRINT 1\nEND\n");
    assert_eq!(
      func.vars.get("_CONST_00"),
      Some(&(Type::Word, Some(Value::Word(1))))
    );
    assert_eq!(
      func.code[0].kind,
      StmtKind::Print {
        target: Some("_CONST_00".into())
      }
    );
  }

  #[test]
  fn string_literal_sizes_leave_terminator_room() {
    let func = parse_one("FUNC main() RETURNS NONE:\nVARS:\nCODE:\nPRINT \"hi\"\nEND\n");
    assert_eq!(
      func.vars.get("_CONST_00"),
      Some(&(Type::Str { size: 3 }, Some(Value::Str("hi".into()))))
    );
  }

  #[test]
  fn all_literal_binary_folds_at_parse_time() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nx = 2 + 3\nEND\n",
    );
    assert_eq!(
      func.vars.get("_CONST_01"),
      Some(&(Type::Word, Some(Value::Word(5))))
    );
    assert_eq!(
      func.code[0].kind,
      StmtKind::Assign {
        target: Some("x".into()),
        index: None,
        expr: Expr::Ident {
          name: "_CONST_01".into(),
          index: None
        },
      }
    );
  }

  #[test]
  fn all_literal_comparison_folds_to_bool() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nx = 7 < 3\nEND\n",
    );
    assert_eq!(
      func.vars.get("_CONST_01"),
      Some(&(Type::Word, Some(Value::Word(0))))
    );
  }

  #[test]
  fn unary_literal_folds_with_wrapping() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nx = - 1\nEND\n",
    );
    assert_eq!(
      func.vars.get("_CONST_01"),
      Some(&(Type::Word, Some(Value::Word(0xffff))))
    );
  }

  #[test]
  fn hex_literals_parse() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nx = 0x10\nEND\n",
    );
    assert_eq!(
      func.vars.get("_CONST_01"),
      Some(&(Type::Word, Some(Value::Word(16))))
    );
  }

  #[test]
  fn oversized_literal_is_rejected_with_row() {
    let err = parse("FUNC main() RETURNS NONE:\nVARS:\nCODE:\nPRINT 70000\nEND\n").unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("line 4:"), "{text}");
    assert!(text.contains("numeric literal too large"));
  }

  #[test]
  fn label_attaches_to_the_next_statement_only() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nWORD c\nCODE:\nloop :\nc ? GOTO loop\nPRINT\nEND\n",
    );
    assert_eq!(func.code[0].label.as_deref(), Some("loop"));
    assert_eq!(func.code[0].condition.as_deref(), Some("c"));
    assert_eq!(func.code[1].label, None);
  }

  #[test]
  fn same_line_label_is_rejected_not_dropped() {
    let err =
      parse("FUNC main() RETURNS NONE:\nVARS:\nCODE:\nlbl : PRINT\nEND\n").unwrap_err();
    assert!(err.to_string().contains("could not parse statement"));
  }

  #[test]
  fn comment_lines_are_skipped_in_code() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nCODE:\n# nothing here\nPRINT\nEND\n",
    );
    assert_eq!(func.code.len(), 2);
  }

  #[test]
  fn parameters_parse_with_and_without_commas() {
    let func = parse_one(
      "FUNC f(WORD a, WORD b WORD c) RETURNS WORD:\nVARS:\nCODE:\nRETURN a\nEND\n",
    );
    assert_eq!(func.params, ["a", "b", "c"]);
    assert_eq!(func.return_type, Some(Type::Word));
  }

  #[test]
  fn duplicate_declaration_is_rejected() {
    let err =
      parse("FUNC main(WORD x) RETURNS NONE:\nVARS:\nWORD x\nCODE:\nEND\n").unwrap_err();
    assert!(err.to_string().contains("duplicate declaration"));
  }

  #[test]
  fn duplicate_function_is_rejected() {
    let src = "FUNC main() RETURNS NONE:\nVARS:\nCODE:\nEND\n";
    let err = parse(&format!("{src}{src}")).unwrap_err();
    assert!(err.to_string().contains("duplicate definition"));
  }

  #[test]
  fn literal_return_target_is_rejected() {
    let err =
      parse("FUNC main() RETURNS NONE:\nVARS:\nCODE:\nRETURN 5\nEND\n").unwrap_err();
    assert!(err.to_string().contains("RETURN"));
  }

  #[test]
  fn bare_call_becomes_targetless_assign() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nCODE:\nmain(1, 2)\nEND\n",
    );
    assert_eq!(
      func.code[0].kind,
      StmtKind::Assign {
        target: None,
        index: None,
        expr: Expr::Call {
          function: "main".into(),
          arguments: vec!["_CONST_00".into(), "_CONST_01".into()],
        },
      }
    );
  }

  #[test]
  fn indexed_assignment_with_literal_index() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nARRAY[4] a\nWORD x\nCODE:\na [ 0 ] = x\nEND\n",
    );
    assert_eq!(
      func.code[0].kind,
      StmtKind::Assign {
        target: Some("a".into()),
        index: Some("_CONST_02".into()),
        expr: Expr::Ident {
          name: "x".into(),
          index: None
        },
      }
    );
  }

  #[test]
  fn unary_operators_parse_with_identifier_operands() {
    let func = parse_one(
      "FUNC main() RETURNS NONE:\nVARS:\nWORD x\nWORD y\nCODE:\nx = ~ y\ny = - x\nEND\n",
    );
    assert_eq!(
      func.code[0].kind,
      StmtKind::Assign {
        target: Some("x".into()),
        index: None,
        expr: Expr::Unary {
          op: UnaryOp::Not,
          operand: "y".into()
        },
      }
    );
    assert_eq!(
      func.code[1].kind,
      StmtKind::Assign {
        target: Some("y".into()),
        index: None,
        expr: Expr::Unary {
          op: UnaryOp::Neg,
          operand: "x".into()
        },
      }
    );
  }

  #[test]
  fn empty_assignment_right_hand_side_is_rejected() {
    let err = parse("FUNC main() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nx =\nEND\n").unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("line 5:"), "{text}");
    assert!(text.contains("could not parse expression"));
  }

  #[test]
  fn empty_indexed_assignment_right_hand_side_is_rejected() {
    let err = parse(
      "FUNC main() RETURNS NONE:\nVARS:\nARRAY[4] a\nWORD i\nCODE:\na [ i ] =\nEND\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("could not parse expression"));
  }

  #[test]
  fn garbage_expression_is_rejected() {
    let err = parse(
      "FUNC main() RETURNS NONE:\nVARS:\nWORD x\nWORD y\nCODE:\nx = y +\nEND\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("could not parse expression"));
  }

  #[test]
  fn zero_sized_aggregate_is_rejected() {
    let err = parse("FUNC main() RETURNS NONE:\nVARS:\nARRAY[0] a\nCODE:\nEND\n").unwrap_err();
    assert!(err.to_string().contains("invalid var size"));
  }

  #[test]
  fn premature_end_of_input_is_reported() {
    let err = parse("FUNC main() RETURNS NONE:\nVARS:\nCODE:\n").unwrap_err();
    assert!(err.to_string().contains("no input remaining"));
  }

  #[test]
  fn fold_time_division_by_zero_is_rejected() {
    let err =
      parse("FUNC main() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nx = 1 / 0\nEND\n").unwrap_err();
    assert!(err.to_string().contains("division by zero"));
  }
}
