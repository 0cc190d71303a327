//! AST definitions shared by every pipeline stage.
//!
//! All operand positions hold identifier *names*, never resolved references
//! and never literals: the parser synthesizes a constant pseudo-variable for
//! every literal it meets, so later stages deal with a single uniform operand
//! shape. Names stay plain strings until the generator assigns storage.

use std::fmt;

use indexmap::IndexMap;

/// A variable type. `Word` is the machine word; `Str` and `Array` are
/// fixed-size aggregates whose size is validated > 0 at the parse site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
  Word,
  Str { size: u16 },
  Array { size: u16 },
}

impl Type {
  /// Number of machine words occupied by a value of this type.
  pub fn size(&self) -> u16 {
    match self {
      Type::Word => 1,
      Type::Str { size } | Type::Array { size } => *size,
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Word => write!(f, "WORD"),
      Type::Str { size } => write!(f, "STRING[{size}]"),
      Type::Array { size } => write!(f, "ARRAY[{size}]"),
    }
  }
}

/// Literal initializer carried by a synthesized constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Word(u16),
  Str(String),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Neg,
  Not,
}

impl fmt::Display for UnaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      UnaryOp::Neg => write!(f, "-"),
      UnaryOp::Not => write!(f, "~"),
    }
  }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  And,
  Or,
  Xor,
  Shl,
  Shr,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl BinaryOp {
  pub fn symbol(&self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Rem => "%",
      BinaryOp::And => "&",
      BinaryOp::Or => "|",
      BinaryOp::Xor => "^",
      BinaryOp::Shl => "<<",
      BinaryOp::Shr => ">>",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
      BinaryOp::Gt => ">",
      BinaryOp::Ge => ">=",
    }
  }

  /// Map a source token to its operator, if it is one.
  pub fn from_token(token: &str) -> Option<Self> {
    let op = match token {
      "+" => BinaryOp::Add,
      "-" => BinaryOp::Sub,
      "*" => BinaryOp::Mul,
      "/" => BinaryOp::Div,
      "%" => BinaryOp::Rem,
      "&" => BinaryOp::And,
      "|" => BinaryOp::Or,
      "^" => BinaryOp::Xor,
      "<<" => BinaryOp::Shl,
      ">>" => BinaryOp::Shr,
      "==" => BinaryOp::Eq,
      "!=" => BinaryOp::Ne,
      "<" => BinaryOp::Lt,
      "<=" => BinaryOp::Le,
      ">" => BinaryOp::Gt,
      ">=" => BinaryOp::Ge,
      _ => return None,
    };
    Some(op)
  }
}

impl fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.symbol())
  }
}

/// Expression tree. Every operand is an identifier name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  Ident {
    name: String,
    index: Option<String>,
  },
  Call {
    function: String,
    arguments: Vec<String>,
  },
  Unary {
    op: UnaryOp,
    operand: String,
  },
  Binary {
    op: BinaryOp,
    left: String,
    right: String,
  },
}

impl fmt::Display for Expr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Expr::Ident { name, index: None } => write!(f, "{name}"),
      Expr::Ident {
        name,
        index: Some(index),
      } => write!(f, "{name}[{index}]"),
      Expr::Call {
        function,
        arguments,
      } => write!(f, "{function}({})", arguments.join(", ")),
      Expr::Unary { op, operand } => write!(f, "{op}{operand}"),
      Expr::Binary { op, left, right } => write!(f, "{left}{op}{right}"),
    }
  }
}

/// Statement body, one variant per statement keyword plus assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
  Goto {
    target: String,
  },
  Print {
    target: Option<String>,
  },
  Read {
    target: String,
  },
  Return {
    target: Option<String>,
  },
  Assign {
    target: Option<String>,
    index: Option<String>,
    expr: Expr,
  },
}

/// One statement: an optional label (a Goto target), an optional condition
/// variable gating execution at runtime, and the statement body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
  pub label: Option<String>,
  pub condition: Option<String>,
  pub kind: StmtKind,
}

impl Stmt {
  pub fn new(kind: StmtKind, label: Option<String>, condition: Option<String>) -> Self {
    Self {
      label,
      condition,
      kind,
    }
  }
}

impl fmt::Display for Stmt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(label) = &self.label {
      write!(f, "{label}: ")?;
    }
    if let Some(condition) = &self.condition {
      write!(f, "{condition} ? ")?;
    }
    match &self.kind {
      StmtKind::Goto { target } => write!(f, "GOTO {target}"),
      StmtKind::Print { target: None } => write!(f, "PRINT"),
      StmtKind::Print {
        target: Some(target),
      } => write!(f, "PRINT {target}"),
      StmtKind::Read { target } => write!(f, "READ {target}"),
      StmtKind::Return { target: None } => write!(f, "RETURN"),
      StmtKind::Return {
        target: Some(target),
      } => write!(f, "RETURN {target}"),
      StmtKind::Assign {
        target: None,
        expr,
        ..
      } => write!(f, "{expr}"),
      StmtKind::Assign {
        target: Some(target),
        index: None,
        expr,
      } => write!(f, "{target} = {expr}"),
      StmtKind::Assign {
        target: Some(target),
        index: Some(index),
        expr,
      } => write!(f, "{target}[{index}] = {expr}"),
    }
  }
}

/// One function: parameter order, a flat namespace of params + locals +
/// synthesized constants, a declared return type (`None` means no value),
/// and the statement sequence.
#[derive(Debug, Clone)]
pub struct Function {
  pub params: Vec<String>,
  pub vars: IndexMap<String, (Type, Option<Value>)>,
  pub return_type: Option<Type>,
  pub code: Vec<Stmt>,
}

impl Function {
  pub fn new(return_type: Option<Type>) -> Self {
    Self {
      params: Vec::new(),
      vars: IndexMap::new(),
      return_type,
      code: Vec::new(),
    }
  }
}

/// A whole program: function name → function, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Program {
  pub functions: IndexMap<String, Function>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn type_sizes_and_display() {
    assert_eq!(Type::Word.size(), 1);
    assert_eq!(Type::Str { size: 8 }.size(), 8);
    assert_eq!(Type::Array { size: 3 }.to_string(), "ARRAY[3]");
    assert_eq!(Type::Word.to_string(), "WORD");
  }

  #[test]
  fn statement_rendering() {
    let stmt = Stmt::new(
      StmtKind::Assign {
        target: Some("t".into()),
        index: Some("i".into()),
        expr: Expr::Binary {
          op: BinaryOp::Add,
          left: "a".into(),
          right: "b".into(),
        },
      },
      Some("lbl".into()),
      Some("c".into()),
    );
    assert_eq!(stmt.to_string(), "lbl: c ? t[i] = a+b");
  }

  #[test]
  fn call_rendering() {
    let expr = Expr::Call {
      function: "f".into(),
      arguments: vec!["x".into(), "y".into()],
    };
    assert_eq!(expr.to_string(), "f(x, y)");
  }
}
