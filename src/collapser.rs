//! Identifier collapsing: flatten the program into a single namespace.
//!
//! Every source identifier – function, variable, constant, label – is mapped
//! to a compact generated id (`q00001`, `q00002`, …) drawn from one counter
//! shared across the whole program, so the generator can hand each name a
//! global storage cell without clashes. Only `main` (the entry point) and
//! `null` (the absence-of-return-value sentinel) keep their source names.
//!
//! This pass is infallible but assumes analysis already succeeded: renaming
//! erases the information diagnostics are built from, so it must never run
//! on unchecked input.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::{Expr, Function, Program, StmtKind};

/// Rename every identifier in the program, returning the flattened program.
pub fn collapse(program: Program) -> Program {
  let mut collapser = Collapser::default();

  // Rename plan for functions first, computed before any map is rebuilt.
  let mut globals = HashMap::new();
  globals.insert("main".to_string(), "main".to_string());
  globals.insert("null".to_string(), "null".to_string());
  for name in program.functions.keys() {
    if name != "main" {
      globals.insert(name.clone(), collapser.gen_id());
    }
  }

  let functions: IndexMap<String, Function> = program
    .functions
    .into_iter()
    .map(|(name, func)| {
      (
        globals[&name].clone(),
        collapser.collapse_function(func, &globals),
      )
    })
    .collect();

  Program { functions }
}

#[derive(Default)]
struct Collapser {
  serial: u32,
}

impl Collapser {
  fn gen_id(&mut self) -> String {
    self.serial += 1;
    format!("q{:05}", self.serial)
  }

  fn collapse_function(&mut self, mut func: Function, globals: &HashMap<String, String>) -> Function {
    let mut lookup = globals.clone();

    // Vars first, in declaration order; the map is rebuilt, never edited in
    // place, so iteration and renaming stay separate.
    let mut vars = IndexMap::with_capacity(func.vars.len());
    for (name, entry) in func.vars {
      let id = self.gen_id();
      lookup.insert(name, id.clone());
      vars.insert(id, entry);
    }
    func.vars = vars;

    for param in &mut func.params {
      *param = lookup[param.as_str()].clone();
    }

    for stmt in &mut func.code {
      if let Some(label) = &mut stmt.label {
        self.rename(label, &mut lookup);
      }
      if let Some(condition) = &mut stmt.condition {
        self.rename(condition, &mut lookup);
      }
      match &mut stmt.kind {
        StmtKind::Goto { target } | StmtKind::Read { target } => {
          self.rename(target, &mut lookup);
        }
        StmtKind::Print { target } | StmtKind::Return { target } => {
          if let Some(target) = target {
            self.rename(target, &mut lookup);
          }
        }
        StmtKind::Assign {
          target,
          index,
          expr,
        } => {
          if let Some(target) = target {
            self.rename(target, &mut lookup);
          }
          if let Some(index) = index {
            self.rename(index, &mut lookup);
          }
          self.collapse_expr(expr, &mut lookup);
        }
      }
    }

    func
  }

  fn collapse_expr(&mut self, expr: &mut Expr, lookup: &mut HashMap<String, String>) {
    match expr {
      Expr::Ident { name, index } => {
        self.rename(name, lookup);
        if let Some(index) = index {
          self.rename(index, lookup);
        }
      }
      Expr::Call {
        function,
        arguments,
      } => {
        self.rename(function, lookup);
        for argument in arguments {
          self.rename(argument, lookup);
        }
      }
      Expr::Unary { operand, .. } => self.rename(operand, lookup),
      Expr::Binary { left, right, .. } => {
        self.rename(left, lookup);
        self.rename(right, lookup);
      }
    }
  }

  /// Rewrite one name through the scope map, minting a fresh id on first
  /// encounter (this is how labels get theirs).
  fn rename(&mut self, name: &mut String, lookup: &mut HashMap<String, String>) {
    if let Some(id) = lookup.get(name.as_str()) {
      *name = id.clone();
    } else {
      let id = self.gen_id();
      lookup.insert(name.clone(), id.clone());
      *name = id;
    }
  }
}
