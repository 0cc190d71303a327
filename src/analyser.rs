//! Static semantic analysis: symbol resolution and type checking.
//!
//! A global table maps every function name to its declared return type; each
//! function is then checked against that table overlaid with its own vars and
//! labels. The pass never mutates the program – it only gates the rest of the
//! pipeline, and the collapser/generator assume it has already succeeded.
//!
//! The condition name on conditional statements is deliberately not resolved
//! here; only each statement's own target and expression are checked.

use std::collections::HashMap;

use crate::ast::{Expr, Function, Program, StmtKind, Type};
use crate::error::{CompileError, CompileResult};

/// What a name resolves to within one function's scope.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Symbol {
  Function(Option<Type>),
  Var(Type),
  Label,
}

/// Check the whole program; `Ok(())` means every later stage may assume a
/// well-formed, fully resolved AST.
pub fn analyse(program: &Program) -> CompileResult<()> {
  let mut globals = HashMap::new();
  for (name, func) in &program.functions {
    globals.insert(name.clone(), Symbol::Function(func.return_type.clone()));
  }

  for (name, func) in &program.functions {
    analyse_function(name, func, &globals, program)?;
  }

  Ok(())
}

fn analyse_function(
  funcname: &str,
  func: &Function,
  globals: &HashMap<String, Symbol>,
  program: &Program,
) -> CompileResult<()> {
  // Vars shadow same-named functions, labels shadow both.
  let mut scope = globals.clone();
  for (name, (ty, _)) in &func.vars {
    scope.insert(name.clone(), Symbol::Var(ty.clone()));
  }
  for stmt in &func.code {
    if let Some(label) = &stmt.label {
      scope.insert(label.clone(), Symbol::Label);
    }
  }

  for (i, stmt) in func.code.iter().enumerate() {
    let ctx = Context {
      funcname,
      statement: i + 1,
      rendered: stmt.to_string(),
    };

    match &stmt.kind {
      StmtKind::Goto { target } => {
        if scope.get(target) != Some(&Symbol::Label) {
          return Err(ctx.error(format!("'{target}' is not a label")));
        }
      }
      StmtKind::Print { target: None } => {}
      StmtKind::Print {
        target: Some(target),
      }
      | StmtKind::Read { target } => {
        if !matches!(scope.get(target.as_str()), Some(Symbol::Var(_))) {
          return Err(ctx.error(format!("'{target}' is not a variable")));
        }
      }
      StmtKind::Return { target } => {
        check_return(target.as_deref(), func, i, &scope, &ctx)?;
      }
      StmtKind::Assign {
        target,
        index,
        expr,
      } => {
        check_assign(target.as_deref(), index.as_deref(), expr, &scope, program, &ctx)?;
      }
    }
  }

  Ok(())
}

fn check_return(
  target: Option<&str>,
  func: &Function,
  index: usize,
  scope: &HashMap<String, Symbol>,
  ctx: &Context<'_>,
) -> CompileResult<()> {
  match target {
    // `null` is the explicit no-value sentinel and is never type-checked.
    Some("null") => Ok(()),
    Some(target) => {
      let Some(declared) = &func.return_type else {
        return Err(ctx.error("function returns no value"));
      };
      match scope.get(target) {
        Some(Symbol::Var(ty)) if ty == declared => Ok(()),
        Some(Symbol::Var(ty)) => Err(ctx.error(format!(
          "return value is {ty}, function returns {declared}"
        ))),
        _ => Err(ctx.error(format!("'{target}' is not a variable"))),
      }
    }
    None => {
      // The parser-synthesized trailing return is always last and is the one
      // bare return a value-returning function may carry.
      if func.return_type.is_some() && index + 1 != func.code.len() {
        Err(ctx.error("return value required"))
      } else {
        Ok(())
      }
    }
  }
}

fn check_assign(
  target: Option<&str>,
  index: Option<&str>,
  expr: &Expr,
  scope: &HashMap<String, Symbol>,
  program: &Program,
  ctx: &Context<'_>,
) -> CompileResult<()> {
  let inferred = infer_type(expr, scope, program, ctx)?;

  if let Some(index) = index {
    if scope.get(index) != Some(&Symbol::Var(Type::Word)) {
      return Err(ctx.error("index must be WORD"));
    }
    let target = target.unwrap_or_default();
    if !matches!(scope.get(target), Some(Symbol::Var(_))) {
      return Err(ctx.error(format!("'{target}' is not a variable")));
    }
    // Element writes are word-sized regardless of the aggregate's type.
    if inferred != Some(Type::Word) {
      return Err(ctx.error("indexed assignment requires a WORD value"));
    }
    return Ok(());
  }

  if let Some(target) = target {
    let Some(inferred) = inferred else {
      return Err(ctx.error("expression produces no value"));
    };
    match scope.get(target) {
      Some(Symbol::Var(ty)) if *ty == inferred => Ok(()),
      Some(Symbol::Var(ty)) => {
        Err(ctx.error(format!("cannot assign {inferred} to {ty} variable")))
      }
      _ => Err(ctx.error(format!("'{target}' is not a variable"))),
    }
  } else {
    Ok(())
  }
}

/// Infer an expression's type. `Ok(None)` means the expression produces no
/// value (a call to a function declared `RETURNS NONE`).
fn infer_type(
  expr: &Expr,
  scope: &HashMap<String, Symbol>,
  program: &Program,
  ctx: &Context<'_>,
) -> CompileResult<Option<Type>> {
  match expr {
    Expr::Ident { name, index: None } => match scope.get(name) {
      Some(Symbol::Var(ty)) => Ok(Some(ty.clone())),
      _ => Err(ctx.error(format!("'{name}' is not a variable"))),
    },
    Expr::Ident {
      name,
      index: Some(index),
    } => {
      if !matches!(scope.get(name.as_str()), Some(Symbol::Var(_))) {
        return Err(ctx.error(format!("'{name}' is not a variable")));
      }
      if scope.get(index) != Some(&Symbol::Var(Type::Word)) {
        return Err(ctx.error("index must be WORD"));
      }
      Ok(Some(Type::Word))
    }
    Expr::Unary { operand, .. } => {
      require_word(operand, scope, ctx)?;
      Ok(Some(Type::Word))
    }
    Expr::Binary { left, right, .. } => {
      require_word(left, scope, ctx)?;
      require_word(right, scope, ctx)?;
      Ok(Some(Type::Word))
    }
    Expr::Call {
      function,
      arguments,
    } => {
      let Some(Symbol::Function(return_type)) = scope.get(function) else {
        return Err(ctx.error(format!("'{function}' is not a function")));
      };
      let callee = program
        .functions
        .get(function)
        .ok_or_else(|| ctx.error(format!("'{function}' is not a function")))?;

      if arguments.len() != callee.params.len() {
        return Err(ctx.error(format!(
          "'{function}' takes {} arguments, {} given",
          callee.params.len(),
          arguments.len()
        )));
      }
      for (argument, param) in arguments.iter().zip(&callee.params) {
        let declared = &callee.vars[param].0;
        match scope.get(argument) {
          Some(Symbol::Var(ty)) if ty == declared => {}
          Some(Symbol::Var(ty)) => {
            return Err(ctx.error(format!(
              "argument '{argument}' is {ty}, parameter '{param}' is {declared}"
            )));
          }
          _ => return Err(ctx.error(format!("'{argument}' is not a variable"))),
        }
      }

      Ok(return_type.clone())
    }
  }
}

fn require_word(
  name: &str,
  scope: &HashMap<String, Symbol>,
  ctx: &Context<'_>,
) -> CompileResult<()> {
  match scope.get(name) {
    Some(Symbol::Var(Type::Word)) => Ok(()),
    Some(Symbol::Var(ty)) => Err(ctx.error(format!("operand '{name}' is {ty}, not WORD"))),
    _ => Err(ctx.error(format!("'{name}' is not a variable"))),
  }
}

/// Location of the statement under analysis, for diagnostics.
struct Context<'a> {
  funcname: &'a str,
  statement: usize,
  rendered: String,
}

impl Context<'_> {
  fn error(&self, message: impl Into<String>) -> CompileError {
    CompileError::semantic(self.funcname, self.statement, &self.rendered, message)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::CompileError;
  use crate::parser;

  fn analyse_source(source: &str) -> CompileResult<()> {
    analyse(&parser::parse(source).unwrap())
  }

  fn semantic_parts(err: CompileError) -> (String, usize, String) {
    match err {
      CompileError::Semantic {
        function,
        statement,
        message,
        ..
      } => (function, statement, message),
      other => panic!("expected a semantic error, got {other:?}"),
    }
  }

  #[test]
  fn well_formed_program_passes() {
    analyse_source(
      "FUNC f(WORD x) RETURNS WORD:\nVARS:\nCODE:\nRETURN x\nEND\n\
       FUNC main() RETURNS NONE:\nVARS:\nWORD y\nCODE:\ny = f(1)\nPRINT y\nEND\n",
    )
    .unwrap();
  }

  #[test]
  fn undeclared_return_target_cites_function_and_statement() {
    let err = analyse_source("FUNC f(WORD x) RETURNS WORD:\nVARS:\nCODE:\nRETURN y\nEND\n")
      .unwrap_err();
    let (function, statement, _) = semantic_parts(err);
    assert_eq!(function, "f");
    assert_eq!(statement, 1);
  }

  #[test]
  fn return_type_must_match_exactly() {
    let err = analyse_source(
      "FUNC f() RETURNS WORD:\nVARS:\nSTRING[4] s\nCODE:\nRETURN s\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert!(message.contains("STRING[4]"));
  }

  #[test]
  fn return_value_in_none_function_is_rejected() {
    let err = analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nRETURN x\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert_eq!(message, "function returns no value");
  }

  #[test]
  fn return_null_sentinel_is_always_accepted() {
    analyse_source("FUNC f() RETURNS WORD:\nVARS:\nCODE:\nRETURN null\nEND\n").unwrap();
  }

  #[test]
  fn bare_return_mid_function_requires_a_value() {
    let err = analyse_source(
      "FUNC f() RETURNS WORD:\nVARS:\nWORD x\nCODE:\nRETURN\nRETURN x\nEND\n",
    )
    .unwrap_err();
    let (_, statement, message) = semantic_parts(err);
    assert_eq!(statement, 1);
    assert_eq!(message, "return value required");
  }

  #[test]
  fn goto_must_reference_a_label() {
    let err = analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nGOTO x\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert!(message.contains("not a label"));
  }

  #[test]
  fn aggregate_argument_against_word_parameter_is_rejected() {
    let err = analyse_source(
      "FUNC f(WORD x) RETURNS NONE:\nVARS:\nCODE:\nEND\n\
       FUNC main() RETURNS NONE:\nVARS:\nSTRING[8] s\nCODE:\nf(s)\nEND\n",
    )
    .unwrap_err();
    let (function, _, message) = semantic_parts(err);
    assert_eq!(function, "main");
    assert!(message.contains("STRING[8]"));
  }

  #[test]
  fn call_arity_must_match() {
    let err = analyse_source(
      "FUNC f(WORD x) RETURNS NONE:\nVARS:\nCODE:\nEND\n\
       FUNC main() RETURNS NONE:\nVARS:\nCODE:\nf(1, 2)\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert!(message.contains("takes 1 arguments, 2 given"));
  }

  #[test]
  fn non_word_index_is_rejected() {
    let err = analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nARRAY[4] a\nSTRING[4] s\nWORD x\nCODE:\na[s] = x\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert_eq!(message, "index must be WORD");
  }

  #[test]
  fn aggregate_assignment_requires_equal_types() {
    let err = analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nSTRING[4] a\nSTRING[8] b\nCODE:\na = b\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert!(message.contains("STRING[8]"));

    analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nSTRING[8] a\nSTRING[8] b\nCODE:\na = b\nEND\n",
    )
    .unwrap();
  }

  #[test]
  fn void_call_result_cannot_be_assigned() {
    let err = analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nCODE:\nEND\n\
       FUNC main() RETURNS NONE:\nVARS:\nWORD x\nCODE:\nx = f()\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert_eq!(message, "expression produces no value");
  }

  #[test]
  fn binary_operands_must_be_words() {
    let err = analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nWORD x\nSTRING[4] s\nCODE:\nx = x + s\nEND\n",
    )
    .unwrap_err();
    let (_, _, message) = semantic_parts(err);
    assert!(message.contains("not WORD"));
  }

  #[test]
  fn condition_name_is_not_validated() {
    // The condition identifier on a guarded statement is intentionally left
    // unresolved; `nosuch` never being declared must not fail analysis.
    analyse_source(
      "FUNC f() RETURNS NONE:\nVARS:\nCODE:\nnosuch ? PRINT\nEND\n",
    )
    .unwrap();
  }
}
