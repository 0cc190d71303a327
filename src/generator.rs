//! Code generation: lower the collapsed AST into Mano-machine assembly.
//!
//! The target has one accumulator, direct/indirect memory addressing, and no
//! hardware call stack, so the generator leans on a small runtime library
//! (`push`/`pop`/`call`, arithmetic routines, output routines) and gives each
//! variable a fixed global storage cell. Emission goes through an `Emitter`
//! that optionally folds the stream with a single-instruction-lookback
//! peephole window, then renders fixed-column assembly text.

use crate::ast::{BinaryOp, Expr, Function, Program, Stmt, StmtKind, Type, UnaryOp, Value};
use crate::error::{CompileError, CompileResult};

/// One abstract instruction: mnemonic, optional operand with an indirect
/// flag, optional label, optional explanatory comment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Instr {
  label: Option<String>,
  op: &'static str,
  operand: Option<String>,
  indirect: bool,
  comment: Option<String>,
}

impl Instr {
  fn new(op: &'static str) -> Self {
    Self {
      label: None,
      op,
      operand: None,
      indirect: false,
      comment: None,
    }
  }

  fn operand(mut self, operand: impl Into<String>) -> Self {
    self.operand = Some(operand.into());
    self
  }

  fn indirect(mut self) -> Self {
    self.indirect = true;
    self
  }

  fn label(mut self, label: impl Into<Option<String>>) -> Self {
    self.label = label.into();
    self
  }

  fn comment(mut self, comment: impl Into<String>) -> Self {
    self.comment = Some(comment.into());
    self
  }
}

/// What the peephole window decided to do with an incoming instruction.
enum Fold {
  Keep,
  TakeNopLabel,
  CancelPushPop,
  SkipLoad,
}

/// Owns the in-progress instruction buffer, the synthetic-label counter, and
/// the one-slot peephole lookback (the last real instruction emitted).
struct Emitter {
  optimize: bool,
  serial: u32,
  buffer: Vec<Option<Instr>>,
}

impl Emitter {
  fn new(optimize: bool) -> Self {
    Self {
      optimize,
      serial: 0,
      buffer: Vec::new(),
    }
  }

  /// Mint a synthetic label, unique across the whole emitted program.
  fn gen_name(&mut self, prefix: &str) -> String {
    let name = format!("{}{:03}", &prefix[..3], self.serial);
    self.serial += 1;
    name
  }

  /// Blank separator line; kept only in unoptimized output.
  fn blank(&mut self) {
    if !self.optimize {
      self.buffer.push(None);
    }
  }

  fn emit(&mut self, mut instr: Instr) {
    if self.optimize {
      match self.decide(&instr) {
        Fold::Keep => {}
        Fold::TakeNopLabel => {
          // Labels must never be lost: the dropped placeholder hands its
          // label to the instruction replacing it.
          if let Some(Some(nop)) = self.buffer.pop() {
            instr.label = nop.label;
          }
        }
        Fold::CancelPushPop => {
          self.buffer.pop();
          return;
        }
        Fold::SkipLoad => return,
      }
    }
    self.buffer.push(Some(instr));
  }

  /// Examine exactly the last emitted real instruction. A label on the
  /// incoming instruction marks an external jump target and blocks every
  /// rule; so does one on a last instruction that a rule would drop.
  fn decide(&self, instr: &Instr) -> Fold {
    let Some(Some(last)) = self.buffer.last() else {
      return Fold::Keep;
    };
    if instr.label.is_some() {
      return Fold::Keep;
    }

    if last.op == "NOP" {
      return Fold::TakeNopLabel;
    }

    let is_bsa = |i: &Instr, routine: &str| {
      i.op == "BSA" && i.operand.as_deref() == Some(routine) && !i.indirect
    };
    if is_bsa(last, "push") && last.label.is_none() && is_bsa(instr, "pop") {
      return Fold::CancelPushPop;
    }

    if last.op == "STA"
      && instr.op == "LDA"
      && last.operand == instr.operand
      && last.indirect == instr.indirect
    {
      // The stored value still sits in the accumulator; the store stays.
      return Fold::SkipLoad;
    }

    Fold::Keep
  }

  /// Render the buffer into fixed-column assembly text.
  fn render(self) -> String {
    let optimize = self.optimize;
    let mut out = String::new();
    for slot in self.buffer {
      let Some(mut instr) = slot else {
        out.push('\n');
        continue;
      };

      // Leftover placeholders become an explicit accumulator-safe no-op.
      if instr.op == "NOP" {
        instr.op = "CLE";
        if instr.comment.is_none() {
          instr.comment = Some("NOP".to_string());
        }
      }

      let head = match &instr.label {
        Some(label) => format!("{:<11} ", format!("{label},")),
        None => " ".repeat(12),
      };
      let operand = instr.operand.as_deref().unwrap_or("");
      let flag = if instr.indirect { 'I' } else { ' ' };
      out.push_str(&format!("{}{:>3} {:<6} {}", head, instr.op, operand, flag));
      if !optimize {
        if let Some(comment) = &instr.comment {
          out.push_str(" ;");
          out.push_str(comment);
        }
      }
      out.push('\n');
    }
    out
  }
}

/// Generate the assembly listing for a collapsed, analysed program.
pub fn generate(program: &Program, optimize: bool) -> CompileResult<String> {
  if !program.functions.contains_key("main") {
    return Err(CompileError::internal(
      "program contains no \"main\" function",
    ));
  }

  let mut emitter = Emitter::new(optimize);

  emitter.emit(Instr::new("ORG").operand("0").comment("Entry point"));
  emitter.emit(Instr::new("LDA").operand("main"));
  emitter.emit(Instr::new("BSA").operand("push"));
  emitter.emit(Instr::new("BSA").operand("call"));
  emitter.emit(Instr::new("HLT"));

  for (name, func) in &program.functions {
    emitter.blank();
    emitter.blank();
    generate_function(&mut emitter, name, func)?;
  }

  Ok(emitter.render())
}

fn generate_function(e: &mut Emitter, name: &str, func: &Function) -> CompileResult<()> {
  generate_vars(e, func);
  e.blank();

  let anchor = e.gen_name("fnc");
  e.emit(
    Instr::new("AND")
      .operand(anchor.as_str())
      .label(name.to_string())
      .comment(format!("Address of {name}")),
  );
  e.emit(
    Instr::new("NOP")
      .label(anchor)
      .comment(format!("Function {name}")),
  );

  // Callee prologue: stash the return address, pop the arguments in reverse
  // declaration order, then put the return address back for RETURN.
  e.emit(
    Instr::new("BSA")
      .operand("pop")
      .comment("Getting return address"),
  );
  e.emit(Instr::new("STA").operand("temp1"));
  for param in func.params.iter().rev() {
    e.emit(
      Instr::new("BSA")
        .operand("pop")
        .comment(format!("Processing arg {param}")),
    );
    e.emit(Instr::new("STA").operand(param.as_str()));
  }
  e.emit(Instr::new("LDA").operand("temp1"));
  e.emit(
    Instr::new("BSA")
      .operand("push")
      .comment("Putting return address back"),
  );

  generate_code(e, func)
}

/// Emit the storage cells for every variable and constant of one function:
/// one `DEC` word for scalars, a pointer cell plus `size` data words for
/// aggregates, with string bytes laid out as character codes.
fn generate_vars(e: &mut Emitter, func: &Function) {
  let mut names: Vec<&String> = func.vars.keys().collect();
  names.sort();

  for name in names {
    let (ty, value) = &func.vars[name.as_str()];
    match ty {
      Type::Word => {
        let word = match value {
          Some(Value::Word(word)) => *word,
          _ => 0,
        };
        e.emit(
          Instr::new("DEC")
            .operand(word.to_string())
            .label(name.clone()),
        );
      }
      Type::Str { .. } | Type::Array { .. } => {
        let mut comment = if func.params.contains(name) {
          "PARAM: ".to_string()
        } else {
          String::new()
        };
        match value {
          Some(Value::Str(text)) => comment.push_str(&format!("{ty} {name} = {text:?}")),
          _ => comment.push_str(&format!("{ty} {name}")),
        }

        let data: Vec<u16> = match value {
          Some(Value::Str(text)) => text.bytes().map(u16::from).collect(),
          _ => Vec::new(),
        };

        let cell = e.gen_name("var");
        e.emit(
          Instr::new("AND")
            .operand(cell.as_str())
            .label(name.clone())
            .comment(comment),
        );
        for i in 0..ty.size() as usize {
          let word = data.get(i).copied().unwrap_or(0);
          let mut instr = Instr::new("DEC").operand(word.to_string());
          if i == 0 {
            instr = instr.label(cell.clone());
          }
          e.emit(instr);
        }
      }
    }
  }
}

fn generate_code(e: &mut Emitter, func: &Function) -> CompileResult<()> {
  for stmt in &func.code {
    // A guarded statement is wrapped in a nonzero test; both branch targets
    // anchor placeholders so later labels survive even when the guarded
    // instructions fold away.
    let mut skip = None;
    if let Some(condition) = &stmt.condition {
      let start = e.gen_name("cnd");
      let end = e.gen_name("skp");
      e.emit(
        Instr::new("LDA")
          .operand(condition.as_str())
          .comment(format!("condition: {condition}")),
      );
      e.emit(Instr::new("SZA"));
      e.emit(Instr::new("BUN").operand(start.as_str()));
      e.emit(Instr::new("BUN").operand(end.as_str()));
      e.emit(Instr::new("NOP").label(start));
      skip = Some(end);
    }

    match &stmt.kind {
      StmtKind::Goto { target } => {
        e.emit(
          Instr::new("BUN")
            .operand(target.as_str())
            .label(stmt.label.clone())
            .comment(format!("GOTO {target}")),
        );
      }
      StmtKind::Print { target } => generate_print(e, func, stmt, target.as_deref())?,
      StmtKind::Read { .. } => {
        return Err(CompileError::internal("READ statement is not implemented"));
      }
      StmtKind::Return { target } => generate_return(e, stmt, target.as_deref()),
      StmtKind::Assign {
        target,
        index,
        expr,
      } => generate_assign(e, func, stmt, target.as_deref(), index.as_deref(), expr)?,
    }

    if let Some(end) = skip {
      e.emit(Instr::new("NOP").label(end));
    }
    e.blank();
  }
  Ok(())
}

fn generate_print(
  e: &mut Emitter,
  func: &Function,
  stmt: &Stmt,
  target: Option<&str>,
) -> CompileResult<()> {
  let Some(target) = target else {
    e.emit(
      Instr::new("BSA")
        .operand("outnln")
        .label(stmt.label.clone())
        .comment("Print new line"),
    );
    return Ok(());
  };

  let (ty, _) = var_entry(func, target)?;
  match ty {
    Type::Word => {
      e.emit(
        Instr::new("LDA")
          .operand(target)
          .label(stmt.label.clone())
          .comment(format!("PRINT word {target}")),
      );
      e.emit(Instr::new("BSA").operand("outdec"));
    }
    Type::Str { .. } => {
      e.emit(
        Instr::new("LDA")
          .operand(target)
          .label(stmt.label.clone())
          .comment(format!("PRINT string {target}")),
      );
      e.emit(Instr::new("BSA").operand("push"));
      e.emit(Instr::new("BSA").operand("outstr"));
    }
    Type::Array { size } => {
      e.emit(
        Instr::new("LDA")
          .operand(target)
          .label(stmt.label.clone())
          .comment(format!("PRINT array {target}")),
      );
      e.emit(Instr::new("STA").operand("temp1"));
      for _ in 0..*size {
        e.emit(Instr::new("LDA").operand("temp1").indirect());
        e.emit(Instr::new("BSA").operand("outdec"));
        e.emit(Instr::new("LDA").operand("chrspc"));
        e.emit(Instr::new("BSA").operand("outchr"));
        e.emit(
          Instr::new("ISZ")
            .operand("temp1")
            .comment("Always > 0 so just a memory INC"),
        );
      }
      e.emit(Instr::new("BSA").operand("outnln"));
    }
  }
  Ok(())
}

/// Pop the caller's return address into scratch, push the returned value (or
/// the `null` sentinel), and branch back indirectly – leaving exactly one
/// value on top of stack for the caller.
fn generate_return(e: &mut Emitter, stmt: &Stmt, target: Option<&str>) {
  e.emit(
    Instr::new("BSA")
      .operand("pop")
      .label(stmt.label.clone())
      .comment(format!("RETURN {}", target.unwrap_or(""))),
  );
  e.emit(Instr::new("STA").operand("temp1"));
  e.emit(Instr::new("LDA").operand(target.unwrap_or("null")));
  e.emit(Instr::new("BSA").operand("push"));
  e.emit(Instr::new("BUN").operand("temp1").indirect());
}

fn generate_assign(
  e: &mut Emitter,
  func: &Function,
  stmt: &Stmt,
  target: Option<&str>,
  index: Option<&str>,
  expr: &Expr,
) -> CompileResult<()> {
  let mut comment = String::new();
  if let Some(target) = target {
    let (ty, _) = var_entry(func, target)?;
    comment.push_str(&format!("{{{ty}}} {target}"));
    if let Some(index) = index {
      comment.push_str(&format!("[{index}]"));
    }
    comment.push_str(" = ");
  }
  comment.push_str(&expr.to_string());

  // The placeholder carries the statement's label and comment; in optimized
  // mode it folds into the expression's first instruction.
  e.emit(Instr::new("NOP").label(stmt.label.clone()).comment(comment));

  generate_expression(e, expr);

  let Some(target) = target else {
    // Expression evaluated for its side effects only.
    e.emit(Instr::new("BSA").operand("pop"));
    return Ok(());
  };
  let (ty, _) = var_entry(func, target)?;

  if let Some(index) = index {
    // Effective address is base plus index; store through it.
    e.emit(Instr::new("LDA").operand(target));
    e.emit(Instr::new("ADD").operand(index));
    e.emit(Instr::new("STA").operand("temp1"));
    e.emit(Instr::new("BSA").operand("pop"));
    e.emit(Instr::new("STA").operand("temp1").indirect());
    return Ok(());
  }

  match ty {
    Type::Word => {
      e.emit(Instr::new("BSA").operand("pop"));
      e.emit(Instr::new("STA").operand(target));
    }
    Type::Str { .. } | Type::Array { .. } => {
      // Whole-value copy: exactly `size` cells from source to target via
      // two scratch pointers.
      e.emit(Instr::new("LDA").operand(target));
      e.emit(Instr::new("STA").operand("temp1"));
      e.emit(Instr::new("BSA").operand("pop"));
      e.emit(Instr::new("STA").operand("temp2"));
      for _ in 0..ty.size() {
        e.emit(Instr::new("LDA").operand("temp2").indirect());
        e.emit(Instr::new("STA").operand("temp1").indirect());
        e.emit(
          Instr::new("ISZ")
            .operand("temp1")
            .comment("Always > 0 so just a memory INC"),
        );
        e.emit(
          Instr::new("ISZ")
            .operand("temp2")
            .comment("Always > 0 so just a memory INC"),
        );
      }
    }
  }
  Ok(())
}

/// Evaluate an expression; its result ends on top of the software stack.
fn generate_expression(e: &mut Emitter, expr: &Expr) {
  match expr {
    Expr::Ident { name, index: None } => {
      e.emit(Instr::new("LDA").operand(name.as_str()));
      e.emit(Instr::new("BSA").operand("push"));
    }
    Expr::Ident {
      name,
      index: Some(index),
    } => {
      e.emit(Instr::new("LDA").operand(name.as_str()));
      e.emit(Instr::new("ADD").operand(index.as_str()));
      e.emit(Instr::new("STA").operand("temp1"));
      e.emit(Instr::new("LDA").operand("temp1").indirect());
      e.emit(Instr::new("BSA").operand("push"));
    }
    Expr::Call {
      function,
      arguments,
    } => {
      // Caller pushes arguments left to right, then the callee's address.
      for argument in arguments {
        e.emit(Instr::new("LDA").operand(argument.as_str()));
        e.emit(Instr::new("BSA").operand("push"));
      }
      e.emit(Instr::new("LDA").operand(function.as_str()));
      e.emit(Instr::new("BSA").operand("push"));
      e.emit(Instr::new("BSA").operand("call"));
    }
    Expr::Unary { op, operand } => {
      e.emit(Instr::new("LDA").operand(operand.as_str()));
      match op {
        UnaryOp::Neg => e.emit(Instr::new("BSA").operand("neg")),
        UnaryOp::Not => e.emit(Instr::new("CMA")),
      }
      e.emit(Instr::new("BSA").operand("push"));
    }
    Expr::Binary { op, left, right } => match op {
      // ADD and AND act directly on the accumulator, no stack round trip.
      BinaryOp::Add => {
        e.emit(Instr::new("LDA").operand(left.as_str()));
        e.emit(Instr::new("ADD").operand(right.as_str()));
        e.emit(Instr::new("BSA").operand("push"));
      }
      BinaryOp::And => {
        e.emit(Instr::new("LDA").operand(left.as_str()));
        e.emit(Instr::new("AND").operand(right.as_str()));
        e.emit(Instr::new("BSA").operand("push"));
      }
      _ => {
        e.emit(Instr::new("LDA").operand(right.as_str()));
        e.emit(Instr::new("BSA").operand("push"));
        e.emit(Instr::new("LDA").operand(left.as_str()));
        e.emit(Instr::new("BSA").operand(routine(*op)));
        if is_comparison(*op) {
          // Pull the routine's E-bit result into a canonical 0/1 word.
          e.emit(Instr::new("CLA"));
          e.emit(Instr::new("CIL"));
        }
        e.emit(Instr::new("BSA").operand("push"));
      }
    },
  }
}

fn routine(op: BinaryOp) -> &'static str {
  match op {
    BinaryOp::Sub => "sub",
    BinaryOp::Mul => "mul",
    BinaryOp::Div => "div",
    BinaryOp::Rem => "mod",
    BinaryOp::Or => "or",
    BinaryOp::Xor => "xor",
    BinaryOp::Shl => "shftl",
    BinaryOp::Shr => "shftr",
    BinaryOp::Eq => "equal",
    BinaryOp::Ne => "nequal",
    BinaryOp::Lt => "less",
    BinaryOp::Le => "lesseq",
    BinaryOp::Gt => "more",
    BinaryOp::Ge => "moreeq",
    BinaryOp::Add | BinaryOp::And => unreachable!("handled via the accumulator"),
  }
}

fn is_comparison(op: BinaryOp) -> bool {
  matches!(
    op,
    BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
  )
}

fn var_entry<'a>(func: &'a Function, name: &str) -> CompileResult<&'a (Type, Option<Value>)> {
  func
    .vars
    .get(name)
    .ok_or_else(|| CompileError::internal(format!("unknown variable '{name}'")))
}
