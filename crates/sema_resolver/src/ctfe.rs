//! Compile-time evaluation of expressions and of function calls whose bodies
//! fold to constants.
//!
//! The interpreter covers straight-line code: local declarations,
//! assignments to locals and `return`. Branches, loops and other control flow
//! are skipped without failing the evaluation. Failures inside an executed
//! function are reported once, at the innermost function that failed.

use std::collections::HashMap;
use std::fmt;

use ordered_float::OrderedFloat;
use sema_ast::declarations::{ASTDeclarationKind, ASTFunction};
use sema_ast::expressions::{ASTAccessTarget, ASTBinaryOperator, ASTExpressionKind, ASTUnaryOperator};
use sema_ast::statements::{ASTStatement, ASTStatementKind};
use sema_ast::types::PrimitiveKind;
use sema_ast::{ASTExpression, DeclRef, Name};
use sema_config::DebugTrace;
use sema_diagnostics::message::DiagnosticMessage;
use sema_log::{phase_warn, trace_dbg};
use sema_type::{strip_all, AbstractType, ConstValue, SemanticResult, SymbolValue, TypeKind};

use crate::context::ResolutionContext;
use crate::expressions::{evaluate_callee, evaluate_type, literal_value, wider_primitive};
use crate::resolver::{declaration_to_result, enter_declaration_scope, lookup_identifier, resolve_type};

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
  NotConstant(String),
  MissingArgument { function: String, parameter: String },
  TooManyArguments { function: String },
  DivisionByZero,
  Overflow,
  TypeMismatch(String),
  DepthExceeded,
  Cancelled,
  NoBody(String),
  /// The body ran to its end without a `return`.
  NoReturn(String),
  NotAFunction,
  /// A called function failed; it has already been reported.
  CallFailed(String),
}

impl fmt::Display for EvalError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      EvalError::NotConstant(what) => write!(f, "'{}' is not a compile-time constant", what),
      EvalError::MissingArgument { function, parameter } => {
        write!(f, "missing argument for parameter '{}' of '{}'", parameter, function)
      },
      EvalError::TooManyArguments { function } => write!(f, "too many arguments for '{}'", function),
      EvalError::DivisionByZero => write!(f, "division by zero"),
      EvalError::Overflow => write!(f, "integer overflow"),
      EvalError::TypeMismatch(op) => write!(f, "operands of '{}' do not fold", op),
      EvalError::DepthExceeded => write!(f, "call depth limit exceeded"),
      EvalError::Cancelled => write!(f, "cancelled"),
      EvalError::NoBody(function) => write!(f, "'{}' has no body", function),
      EvalError::NoReturn(function) => write!(f, "'{}' does not return a value", function),
      EvalError::NotAFunction => write!(f, "callee is not a function"),
      EvalError::CallFailed(function) => write!(f, "call to '{}' failed", function),
    }
  }
}

impl std::error::Error for EvalError {}

type Locals = HashMap<Name, SymbolValue>;

/// Constant value of `expr` in the current frame, if it folds.
pub fn evaluate_constant(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> Option<SymbolValue> {
  let mut locals = Locals::new();
  eval_expression(expr, &mut locals, ctx).ok()
}

/// Runs `function` on constant arguments. Failures are reported as
/// diagnostics; a body without a `return` just has no value.
pub fn execute(
  function: &DeclRef,
  args: &[SymbolValue],
  ctx: &mut ResolutionContext,
) -> Option<SymbolValue> {
  match try_execute(function, args, ctx) {
    Ok(value) => Some(value),
    Err(EvalError::CallFailed(_)) | Err(EvalError::Cancelled) => None,
    Err(EvalError::NoReturn(_)) => {
      trace_dbg!(ctx.config(), DebugTrace::Ctfe, "{} ends without returning a constant", function.name);
      None
    },
    Err(error) => {
      phase_warn!(ctx.config(), "compile-time call to {} failed: {}", function.name, error);
      ctx.report(DiagnosticMessage::CtfeFailed {
        function: function.name.to_string(),
        reason: error.to_string(),
        span: function.span,
      });
      None
    },
  }
}

pub fn try_execute(
  function: &DeclRef,
  args: &[SymbolValue],
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  if ctx.is_cancelled() {
    return Err(EvalError::Cancelled);
  }
  let Some(info) = function.as_function() else {
    return Err(EvalError::NotAFunction);
  };
  if info.body.is_none() {
    return Err(EvalError::NoBody(function.name.to_string()));
  }
  if !ctx.enter_ctfe() {
    return Err(EvalError::DepthExceeded);
  }

  let result = run_function(function, info, args, ctx);
  ctx.leave_ctfe();
  result
}

fn run_function(
  function: &DeclRef,
  info: &ASTFunction,
  args: &[SymbolValue],
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  let mut locals = bind_parameters(function, info, args, ctx)?;
  let Some(body) = &info.body else {
    return Err(EvalError::NoBody(function.name.to_string()));
  };

  let substitutions = ctx.substitutions().clone();
  let mut frame = ctx.push_with_substitutions(function.clone(), None, substitutions);
  match run_block(body.statements(), &mut locals, &mut frame)? {
    Some(value) => Ok(value),
    None => Err(EvalError::NoReturn(function.name.to_string())),
  }
}

fn bind_parameters(
  function: &DeclRef,
  info: &ASTFunction,
  args: &[SymbolValue],
  ctx: &mut ResolutionContext,
) -> Result<Locals, EvalError> {
  let mut locals = Locals::new();
  let mut rest = args.iter();

  for param in &info.params {
    let Some(var) = param.as_variable() else {
      continue;
    };

    if var.is_variadic {
      let items: Vec<SymbolValue> = rest.by_ref().cloned().collect();
      let element = items
        .first()
        .map(|item| SemanticResult::Type(item.ty.clone()))
        .unwrap_or_else(|| SemanticResult::primitive(PrimitiveKind::Void));
      let ty = AbstractType::new(TypeKind::Array {
        element: Box::new(element),
        fixed_length: None,
      });
      let values = items.into_iter().map(|item| item.value).collect();
      locals.insert(param.name.clone(), SymbolValue::new(ConstValue::Array(values), ty));
      continue;
    }

    let value = match rest.next() {
      Some(arg) => arg.clone(),
      None => match &var.initializer {
        Some(default) => {
          let mut frame = enter_declaration_scope(function, ctx);
          eval_expression(default, &mut Locals::new(), &mut frame)?
        },
        None => {
          return Err(EvalError::MissingArgument {
            function: function.name.to_string(),
            parameter: param.name.to_string(),
          })
        },
      },
    };
    locals.insert(param.name.clone(), value);
  }

  if rest.next().is_some() {
    return Err(EvalError::TooManyArguments {
      function: function.name.to_string(),
    });
  }
  Ok(locals)
}

/// `Some` once a `return` with a value ran.
fn run_block(
  statements: &[ASTStatement],
  locals: &mut Locals,
  ctx: &mut ResolutionContext,
) -> Result<Option<SymbolValue>, EvalError> {
  for stmt in statements {
    if let Some(value) = run_statement(stmt, locals, ctx)? {
      return Ok(Some(value));
    }
  }
  Ok(None)
}

fn run_statement(
  stmt: &ASTStatement,
  locals: &mut Locals,
  ctx: &mut ResolutionContext,
) -> Result<Option<SymbolValue>, EvalError> {
  if ctx.is_cancelled() {
    return Err(EvalError::Cancelled);
  }

  match &stmt.kind {
    ASTStatementKind::Return(Some(value)) => eval_expression(value, locals, ctx).map(Some),
    ASTStatementKind::Return(None) => Err(EvalError::NotConstant("return".to_string())),
    ASTStatementKind::Block(block) => run_block(block.statements(), locals, ctx),
    ASTStatementKind::Declaration(decl) => {
      if let Some(initializer) = decl.as_variable().and_then(|v| v.initializer.as_ref()) {
        let value = eval_expression(initializer, locals, ctx)?;
        locals.insert(decl.name.clone(), value);
      }
      Ok(None)
    },
    ASTStatementKind::Expression(expr) => {
      if let ASTExpressionKind::Binary {
        op: ASTBinaryOperator::Assign,
        lhs,
        rhs,
      } = &expr.kind
      {
        if let ASTExpressionKind::Identifier(name) = &lhs.kind {
          if locals.contains_key(name) {
            let value = eval_expression(rhs, locals, ctx)?;
            locals.insert(name.clone(), value);
          }
        }
      }
      Ok(None)
    },
    _ => Ok(None),
  }
}

fn primitive(kind: PrimitiveKind) -> AbstractType {
  AbstractType::new(TypeKind::Primitive(kind))
}

fn primitive_of(ty: &AbstractType) -> Option<PrimitiveKind> {
  match strip_all(&SemanticResult::Type(ty.clone())).kind() {
    Some(TypeKind::Primitive(kind)) => Some(*kind),
    _ => None,
  }
}

fn eval_expression(
  expr: &ASTExpression,
  locals: &mut Locals,
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  if ctx.is_cancelled() {
    return Err(EvalError::Cancelled);
  }

  match &expr.kind {
    ASTExpressionKind::Literal(literal) => literal_value(literal)
      .as_value()
      .cloned()
      .ok_or_else(|| EvalError::NotConstant("literal".to_string())),
    ASTExpressionKind::Identifier(name) => {
      if let Some(local) = locals.get(name) {
        return Ok(local.clone());
      }
      let found = SemanticResult::from_candidates(lookup_identifier(name, ctx));
      constant_of(&found, ctx).map_err(|_| EvalError::NotConstant(name.to_string()))
    },
    ASTExpressionKind::Paren(inner) => eval_expression(inner, locals, ctx),
    ASTExpressionKind::Unary { op, operand } => {
      let operand = eval_expression(operand, locals, ctx)?;
      let value = const_eval_unary(*op, &operand.value)?;
      let ty = match op {
        ASTUnaryOperator::Not => primitive(PrimitiveKind::Bool),
        _ => operand.ty,
      };
      Ok(SymbolValue::new(value, ty))
    },
    ASTExpressionKind::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, locals, ctx),
    ASTExpressionKind::Conditional {
      condition,
      then,
      otherwise,
    } => {
      let condition = eval_expression(condition, locals, ctx)?;
      match condition.value.as_bool() {
        Some(true) => eval_expression(then, locals, ctx),
        Some(false) => eval_expression(otherwise, locals, ctx),
        None => Err(EvalError::TypeMismatch("?:".to_string())),
      }
    },
    ASTExpressionKind::ArrayLiteral(items) => {
      let items = items
        .iter()
        .map(|item| eval_expression(item, locals, ctx))
        .collect::<Result<Vec<_>, _>>()?;
      let element = items
        .first()
        .map(|item| SemanticResult::Type(item.ty.clone()))
        .unwrap_or_else(|| SemanticResult::primitive(PrimitiveKind::Void));
      let ty = AbstractType::new(TypeKind::Array {
        element: Box::new(element),
        fixed_length: None,
      });
      Ok(SymbolValue::new(ConstValue::Array(items.into_iter().map(|i| i.value).collect()), ty))
    },
    ASTExpressionKind::Index { base, indices } if indices.len() == 1 => {
      let base = eval_expression(base, locals, ctx)?;
      let index = eval_expression(&indices[0], locals, ctx)?;
      index_value(base, &index.value)
    },
    ASTExpressionKind::MemberAccess {
      base,
      member: ASTAccessTarget::Identifier(name),
    } if name.as_str() == "length" => match eval_expression(base, locals, ctx) {
      Ok(base) => match base.value.length() {
        Some(length) => Ok(SymbolValue::new(ConstValue::Int(length as i64), primitive(PrimitiveKind::ULong))),
        None => Err(EvalError::TypeMismatch(".length".to_string())),
      },
      Err(_) => fold_resolved(expr, ctx),
    },
    ASTExpressionKind::Cast {
      target: Some(target),
      operand,
    } => {
      let operand = eval_expression(operand, locals, ctx)?;
      let target = resolve_type(target, ctx);
      cast_value(operand, &target)
    },
    ASTExpressionKind::Cast { target: None, operand } => eval_expression(operand, locals, ctx),
    ASTExpressionKind::Call { callee, args } => {
      let args = args
        .iter()
        .map(|arg| eval_expression(arg, locals, ctx))
        .collect::<Result<Vec<_>, _>>()?;
      eval_call(callee, args, ctx)
    },
    _ => fold_resolved(expr, ctx),
  }
}

/// Anything else folds only if resolution already yields a constant.
fn fold_resolved(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  let resolved = evaluate_type(expr, ctx);
  constant_of(&resolved, ctx)
}

fn eval_binary(
  op: ASTBinaryOperator,
  lhs: &ASTExpression,
  rhs: &ASTExpression,
  locals: &mut Locals,
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  let bool_type = primitive(PrimitiveKind::Bool);
  let left = eval_expression(lhs, locals, ctx)?;

  if op.is_logical() {
    let l = left
      .value
      .as_bool()
      .ok_or_else(|| EvalError::TypeMismatch(op.symbol().to_string()))?;
    if (op == ASTBinaryOperator::And && !l) || (op == ASTBinaryOperator::Or && l) {
      return Ok(SymbolValue::new(ConstValue::Bool(l), bool_type));
    }
    let right = eval_expression(rhs, locals, ctx)?;
    let r = right
      .value
      .as_bool()
      .ok_or_else(|| EvalError::TypeMismatch(op.symbol().to_string()))?;
    return Ok(SymbolValue::new(ConstValue::Bool(r), bool_type));
  }
  if op == ASTBinaryOperator::Assign {
    return Err(EvalError::NotConstant("=".to_string()));
  }

  let right = eval_expression(rhs, locals, ctx)?;
  let value = const_eval_binary(op, &left.value, &right.value)?;
  let ty = if op.is_comparison() {
    bool_type
  } else if op == ASTBinaryOperator::Concat {
    left.ty
  } else {
    match (primitive_of(&left.ty), primitive_of(&right.ty)) {
      (Some(a), Some(b)) => primitive(wider_primitive(a, b)),
      _ => left.ty,
    }
  };
  Ok(SymbolValue::new(value, ty))
}

fn eval_call(
  callee: &ASTExpression,
  args: Vec<SymbolValue>,
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  let callee = evaluate_callee(callee, ctx);

  for candidate in callee.candidates() {
    let Some(definition) = candidate.definition().cloned() else {
      continue;
    };
    let Some(function) = definition.as_function() else {
      continue;
    };
    if function.body.is_none() {
      continue;
    }

    let mut effective = Vec::with_capacity(args.len() + 1);
    if let Some(tag) = candidate.tag() {
      effective.push(constant_of(&tag.first_argument, ctx)?);
    }
    effective.extend(args.iter().cloned());

    let (required, max) = function.arity();
    if effective.len() < required || max.map_or(false, |max| effective.len() > max) {
      continue;
    }

    return execute(&definition, &effective, ctx).ok_or(EvalError::CallFailed(definition.name.to_string()));
  }

  Err(EvalError::NotConstant(callee.to_string()))
}

/// Value a resolved symbol stands for: a folded value, a manifest constant,
/// an enum member or a bound value template parameter.
fn constant_of(
  result: &SemanticResult,
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  match result {
    SemanticResult::Value(value) => Ok(value.clone()),
    SemanticResult::Ambiguous(candidates) => match candidates.first() {
      Some(first) => constant_of(first, ctx),
      None => Err(EvalError::NotConstant(result.to_string())),
    },
    SemanticResult::Type(ty) => match &ty.kind {
      TypeKind::Member(member) => {
        let definition = member.definition.clone();
        match &definition.kind {
          ASTDeclarationKind::Variable(var) if definition.attributes.is_manifest_constant() => {
            let Some(initializer) = &var.initializer else {
              return Err(EvalError::NotConstant(definition.name.to_string()));
            };
            let declared = member.base.as_deref().and_then(|b| b.as_type()).cloned();
            let value = constant_initializer(&definition, initializer, ctx)?;
            Ok(match declared {
              Some(ty) => SymbolValue::new(value.value, ty),
              None => value,
            })
          },
          ASTDeclarationKind::EnumMember(_) => enum_member_value(&definition, ctx),
          _ => Err(EvalError::NotConstant(definition.name.to_string())),
        }
      },
      TypeKind::TemplateParameter(param) => match &param.base {
        Some(base) => constant_of(base, ctx),
        None => Err(EvalError::NotConstant(param.parameter.name.to_string())),
      },
      TypeKind::Alias(alias) => match &alias.base {
        Some(base) => constant_of(base, ctx),
        None => Err(EvalError::NotConstant(alias.definition.name.to_string())),
      },
      _ => Err(EvalError::NotConstant(result.to_string())),
    },
    SemanticResult::Unknown => Err(EvalError::NotConstant("unknown".to_string())),
  }
}

fn constant_initializer(
  definition: &DeclRef,
  initializer: &ASTExpression,
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  if !ctx.begin_resolving(definition.id) {
    return Err(EvalError::NotConstant(definition.name.to_string()));
  }
  let value = {
    let mut frame = enter_declaration_scope(definition, ctx);
    eval_expression(initializer, &mut Locals::new(), &mut frame)
  };
  ctx.end_resolving(definition.id);
  value
}

/// Explicit initializer, or one more than the previous member (zero for the first).
fn enum_member_value(
  member: &DeclRef,
  ctx: &mut ResolutionContext,
) -> Result<SymbolValue, EvalError> {
  let Some(parent) = member.parent() else {
    return Err(EvalError::NotConstant(member.name.to_string()));
  };
  let ty = declaration_to_result(&parent, ctx)
    .as_type()
    .cloned()
    .unwrap_or_else(|| primitive(PrimitiveKind::Int));

  let mut previous: Option<ConstValue> = None;
  for sibling in parent.scope().children() {
    let ASTDeclarationKind::EnumMember(info) = &sibling.kind else {
      continue;
    };
    let value = match &info.initializer {
      Some(initializer) => constant_initializer(&sibling, initializer, ctx)?.value,
      None => match &previous {
        None => ConstValue::Int(0),
        Some(ConstValue::Int(v)) => ConstValue::Int(v.checked_add(1).ok_or(EvalError::Overflow)?),
        Some(_) => return Err(EvalError::NotConstant(sibling.name.to_string())),
      },
    };
    if std::sync::Arc::ptr_eq(&sibling, member) {
      return Ok(SymbolValue::new(value, ty));
    }
    previous = Some(value);
  }
  Err(EvalError::NotConstant(member.name.to_string()))
}

fn index_value(
  base: SymbolValue,
  index: &ConstValue,
) -> Result<SymbolValue, EvalError> {
  let i = index
    .as_int()
    .and_then(|i| usize::try_from(i).ok())
    .ok_or_else(|| EvalError::TypeMismatch("[]".to_string()))?;

  let element_type = match strip_all(&SemanticResult::Type(base.ty.clone())).kind() {
    Some(TypeKind::Array { element, .. }) => element.as_type().cloned(),
    _ => None,
  };

  let value = match &base.value {
    ConstValue::Array(items) | ConstValue::Tuple(items) => items.get(i).cloned(),
    ConstValue::String(text) => text.chars().nth(i).map(ConstValue::Char),
    _ => None,
  }
  .ok_or_else(|| EvalError::NotConstant(format!("[{}]", i)))?;

  let ty = match element_type {
    Some(ty) => ty,
    None if matches!(value, ConstValue::Char(_)) => primitive(PrimitiveKind::Char),
    None => base.ty.clone(),
  };
  Ok(SymbolValue::new(value, ty))
}

fn cast_value(
  operand: SymbolValue,
  target: &SemanticResult,
) -> Result<SymbolValue, EvalError> {
  let Some(target_type) = strip_all(target).as_type().cloned() else {
    return Err(EvalError::NotConstant("cast".to_string()));
  };

  let value = match (&target_type.kind, &operand.value) {
    (TypeKind::Primitive(PrimitiveKind::Bool), v) => {
      ConstValue::Bool(v.as_bool().ok_or_else(|| EvalError::TypeMismatch("cast".to_string()))?)
    },
    (TypeKind::Primitive(kind), ConstValue::Float(f)) if kind.is_integral() => {
      if !f.is_finite() {
        return Err(EvalError::Overflow);
      }
      ConstValue::Int(f.trunc() as i64)
    },
    (TypeKind::Primitive(kind), ConstValue::Int(i)) if kind.is_floating() => ConstValue::Float(OrderedFloat(*i as f64)),
    (TypeKind::Primitive(kind), ConstValue::Char(c)) if kind.is_integral() && !kind.is_character() => {
      ConstValue::Int(*c as i64)
    },
    (_, v) => v.clone(),
  };
  Ok(SymbolValue::new(value, target_type))
}

fn const_eval_unary(
  op: ASTUnaryOperator,
  operand: &ConstValue,
) -> Result<ConstValue, EvalError> {
  match (op, operand) {
    (ASTUnaryOperator::Plus, v @ (ConstValue::Int(_) | ConstValue::Float(_))) => Ok(v.clone()),
    (ASTUnaryOperator::Negate, ConstValue::Int(i)) => i.checked_neg().map(ConstValue::Int).ok_or(EvalError::Overflow),
    (ASTUnaryOperator::Negate, ConstValue::Float(f)) => Ok(ConstValue::Float(-*f)),
    (ASTUnaryOperator::Complement, ConstValue::Int(i)) => Ok(ConstValue::Int(!i)),
    (ASTUnaryOperator::Not, v) => v
      .as_bool()
      .map(|b| ConstValue::Bool(!b))
      .ok_or_else(|| EvalError::TypeMismatch("!".to_string())),
    _ => Err(EvalError::NotConstant(format!("{:?}", op))),
  }
}

fn const_eval_binary(
  op: ASTBinaryOperator,
  left: &ConstValue,
  right: &ConstValue,
) -> Result<ConstValue, EvalError> {
  let mismatch = || EvalError::TypeMismatch(op.symbol().to_string());

  match (left, right) {
    (ConstValue::Int(l), ConstValue::Int(r)) => int_binary(op, *l, *r),
    (ConstValue::Float(_), ConstValue::Float(_) | ConstValue::Int(_))
    | (ConstValue::Int(_), ConstValue::Float(_)) => {
      let (l, r) = (left.as_float().ok_or_else(mismatch)?, right.as_float().ok_or_else(mismatch)?);
      float_binary(op, l, r)
    },
    (ConstValue::Char(_), ConstValue::Char(_) | ConstValue::Int(_)) if op.is_comparison() => {
      let (l, r) = (left.as_int().ok_or_else(mismatch)?, right.as_int().ok_or_else(mismatch)?);
      int_binary(op, l, r)
    },
    (ConstValue::Bool(l), ConstValue::Bool(r)) => match op {
      ASTBinaryOperator::Equal => Ok(ConstValue::Bool(l == r)),
      ASTBinaryOperator::NotEqual => Ok(ConstValue::Bool(l != r)),
      _ => Err(mismatch()),
    },
    (ConstValue::String(l), ConstValue::String(r)) => match op {
      ASTBinaryOperator::Concat => Ok(ConstValue::String(format!("{}{}", l, r))),
      ASTBinaryOperator::Equal => Ok(ConstValue::Bool(l == r)),
      ASTBinaryOperator::NotEqual => Ok(ConstValue::Bool(l != r)),
      ASTBinaryOperator::Less => Ok(ConstValue::Bool(l < r)),
      ASTBinaryOperator::LessEqual => Ok(ConstValue::Bool(l <= r)),
      ASTBinaryOperator::Greater => Ok(ConstValue::Bool(l > r)),
      ASTBinaryOperator::GreaterEqual => Ok(ConstValue::Bool(l >= r)),
      _ => Err(mismatch()),
    },
    (ConstValue::String(l), ConstValue::Char(c)) if op == ASTBinaryOperator::Concat => {
      Ok(ConstValue::String(format!("{}{}", l, c)))
    },
    (ConstValue::Array(l), ConstValue::Array(r)) => match op {
      ASTBinaryOperator::Concat => Ok(ConstValue::Array(l.iter().chain(r.iter()).cloned().collect())),
      ASTBinaryOperator::Equal => Ok(ConstValue::Bool(l == r)),
      ASTBinaryOperator::NotEqual => Ok(ConstValue::Bool(l != r)),
      _ => Err(mismatch()),
    },
    (ConstValue::Null, ConstValue::Null) => match op {
      ASTBinaryOperator::Equal => Ok(ConstValue::Bool(true)),
      ASTBinaryOperator::NotEqual => Ok(ConstValue::Bool(false)),
      _ => Err(mismatch()),
    },
    _ => Err(mismatch()),
  }
}

fn int_binary(
  op: ASTBinaryOperator,
  l: i64,
  r: i64,
) -> Result<ConstValue, EvalError> {
  let checked = |v: Option<i64>| v.map(ConstValue::Int).ok_or(EvalError::Overflow);
  match op {
    ASTBinaryOperator::Add => checked(l.checked_add(r)),
    ASTBinaryOperator::Subtract => checked(l.checked_sub(r)),
    ASTBinaryOperator::Multiply => checked(l.checked_mul(r)),
    ASTBinaryOperator::Divide | ASTBinaryOperator::Modulo if r == 0 => Err(EvalError::DivisionByZero),
    ASTBinaryOperator::Divide => checked(l.checked_div(r)),
    ASTBinaryOperator::Modulo => checked(l.checked_rem(r)),
    ASTBinaryOperator::Equal => Ok(ConstValue::Bool(l == r)),
    ASTBinaryOperator::NotEqual => Ok(ConstValue::Bool(l != r)),
    ASTBinaryOperator::Less => Ok(ConstValue::Bool(l < r)),
    ASTBinaryOperator::LessEqual => Ok(ConstValue::Bool(l <= r)),
    ASTBinaryOperator::Greater => Ok(ConstValue::Bool(l > r)),
    ASTBinaryOperator::GreaterEqual => Ok(ConstValue::Bool(l >= r)),
    ASTBinaryOperator::BitAnd => Ok(ConstValue::Int(l & r)),
    ASTBinaryOperator::BitOr => Ok(ConstValue::Int(l | r)),
    ASTBinaryOperator::BitXor => Ok(ConstValue::Int(l ^ r)),
    ASTBinaryOperator::ShiftLeft => checked(u32::try_from(r).ok().and_then(|shift| l.checked_shl(shift))),
    ASTBinaryOperator::ShiftRight => checked(u32::try_from(r).ok().and_then(|shift| l.checked_shr(shift))),
    _ => Err(EvalError::TypeMismatch(op.symbol().to_string())),
  }
}

fn float_binary(
  op: ASTBinaryOperator,
  l: f64,
  r: f64,
) -> Result<ConstValue, EvalError> {
  let float = |v: f64| ConstValue::Float(OrderedFloat(v));
  match op {
    ASTBinaryOperator::Add => Ok(float(l + r)),
    ASTBinaryOperator::Subtract => Ok(float(l - r)),
    ASTBinaryOperator::Multiply => Ok(float(l * r)),
    ASTBinaryOperator::Divide if r == 0.0 => Err(EvalError::DivisionByZero),
    ASTBinaryOperator::Divide => Ok(float(l / r)),
    ASTBinaryOperator::Modulo if r == 0.0 => Err(EvalError::DivisionByZero),
    ASTBinaryOperator::Modulo => Ok(float(l % r)),
    ASTBinaryOperator::Equal => Ok(ConstValue::Bool(l == r)),
    ASTBinaryOperator::NotEqual => Ok(ConstValue::Bool(l != r)),
    ASTBinaryOperator::Less => Ok(ConstValue::Bool(l < r)),
    ASTBinaryOperator::LessEqual => Ok(ConstValue::Bool(l <= r)),
    ASTBinaryOperator::Greater => Ok(ConstValue::Bool(l > r)),
    ASTBinaryOperator::GreaterEqual => Ok(ConstValue::Bool(l >= r)),
    _ => Err(EvalError::TypeMismatch(op.symbol().to_string())),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use sema_ast::declarations::{ASTDeclaration, ASTVariable};
  use sema_ast::metadata::DeclAttributes;
  use sema_ast::types::ASTType;
  use sema_ast::{ASTBlock, ParseCacheView, Span};
  use sema_config::SemaConfig;

  use super::*;

  fn context(scope: DeclRef) -> ResolutionContext {
    ResolutionContext::new(scope, ParseCacheView::default(), Arc::new(SemaConfig::silent()))
  }

  fn constant(
    name: &str,
    initializer: ASTExpression,
  ) -> DeclRef {
    ASTDeclaration::new(
      name,
      Span::default(),
      ASTDeclarationKind::Variable(ASTVariable {
        ty: None,
        initializer: Some(initializer),
        is_alias: false,
        is_variadic: false,
      }),
      DeclAttributes::ENUM,
    )
  }

  /// `int twice(int x) { return x * 2; }`
  fn twice() -> DeclRef {
    let body = ASTBlock::new(
      Span::new(10, 40),
      vec![ASTStatement::ret(
        Span::new(12, 30),
        Some(ASTExpression::binary(
          ASTBinaryOperator::Multiply,
          ASTExpression::identifier("x"),
          ASTExpression::int(2),
        )),
      )],
    );
    ASTDeclaration::function(
      "twice",
      Span::new(0, 40),
      ASTFunction::new(
        vec![ASTDeclaration::parameter("x", ASTType::primitive(PrimitiveKind::Int), None)],
        Some(ASTType::primitive(PrimitiveKind::Int)),
        Some(body),
      ),
    )
  }

  fn int_of(value: Option<SymbolValue>) -> Option<i64> {
    value.and_then(|v| v.value.as_int())
  }

  #[test]
  fn test_arithmetic_folds_with_promotion() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let mut ctx = context(module);

    let sum = ASTExpression::binary(ASTBinaryOperator::Add, ASTExpression::int(1), ASTExpression::float(0.5));
    let value = evaluate_constant(&sum, &mut ctx).expect("folds");
    assert_eq!(value.value.as_float(), Some(1.5));
    assert_eq!(value.ty, primitive(PrimitiveKind::Double));

    let division = ASTExpression::binary(ASTBinaryOperator::Divide, ASTExpression::int(1), ASTExpression::int(0));
    assert!(evaluate_constant(&division, &mut ctx).is_none());
  }

  #[test]
  fn test_manifest_constants_and_calls() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    module.scope().add(constant("N", ASTExpression::int(21)));
    module.scope().add(twice());
    let mut ctx = context(module);

    let call = ASTExpression::call(ASTExpression::identifier("twice"), vec![ASTExpression::identifier("N")]);
    assert_eq!(int_of(evaluate_constant(&call, &mut ctx)), Some(42));
    assert!(ctx.diagnostics().is_empty());
  }

  #[test]
  fn test_missing_argument_is_reported() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let function = twice();
    module.scope().add(function.clone());
    let mut ctx = context(module);

    assert!(execute(&function, &[], &mut ctx).is_none());
    let diagnostic = ctx.diagnostics().first().expect("reported");
    assert_eq!(diagnostic.error_code, "R0005");
    assert_eq!(ctx.depth(), 0);
  }

  #[test]
  fn test_body_without_return_has_no_value() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let silent = ASTDeclaration::function(
      "silent",
      Span::new(0, 20),
      ASTFunction::new(
        vec![],
        Some(ASTType::primitive(PrimitiveKind::Int)),
        Some(ASTBlock::new(Span::new(10, 20), vec![])),
      ),
    );
    module.scope().add(silent.clone());
    let mut ctx = context(module);

    assert_eq!(try_execute(&silent, &[], &mut ctx), Err(EvalError::NoReturn("silent".to_string())));
    assert!(execute(&silent, &[], &mut ctx).is_none());
    assert!(ctx.diagnostics().is_empty());
    assert_eq!(ctx.depth(), 0);
  }

  #[test]
  fn test_self_referencing_constant_does_not_fold() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    module.scope().add(constant(
      "A",
      ASTExpression::binary(ASTBinaryOperator::Add, ASTExpression::identifier("A"), ASTExpression::int(1)),
    ));
    let mut ctx = context(module);

    assert!(evaluate_constant(&ASTExpression::identifier("A"), &mut ctx).is_none());
  }

  #[test]
  fn test_enum_members_count_up() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let colors = ASTDeclaration::enumeration("Color", None, Span::default());
    colors.scope().add(ASTDeclaration::enum_member("red", None, Span::default()));
    colors
      .scope()
      .add(ASTDeclaration::enum_member("green", Some(ASTExpression::int(5)), Span::default()));
    colors.scope().add(ASTDeclaration::enum_member("blue", None, Span::default()));
    module.scope().add(colors);
    let mut ctx = context(module);

    let blue = ASTExpression::member(ASTExpression::identifier("Color"), "blue");
    assert_eq!(int_of(evaluate_constant(&blue, &mut ctx)), Some(6));
    let red = ASTExpression::member(ASTExpression::identifier("Color"), "red");
    assert_eq!(int_of(evaluate_constant(&red, &mut ctx)), Some(0));
  }

  #[test]
  fn test_string_length_and_index() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let mut ctx = context(module);

    let length = ASTExpression::member(ASTExpression::string("hello"), "length");
    assert_eq!(int_of(evaluate_constant(&length, &mut ctx)), Some(5));

    let index = ASTExpression::index(ASTExpression::string("hello"), vec![ASTExpression::int(1)]);
    assert_eq!(
      evaluate_constant(&index, &mut ctx).map(|v| v.value),
      Some(ConstValue::Char('e'))
    );
  }
}
