//! Structural matching of template parameters against arguments.
//!
//! A [`Deduction`] owns the bindings of one instantiation attempt. Bindings
//! are only handed out when every parameter matched; a failed attempt is
//! dropped whole.

use std::sync::Arc;

use sema_ast::declarations::{ASTFunction, ASTTemplateParameter, ASTTemplateParameterKind};
use sema_ast::expressions::ASTExpressionKind;
use sema_ast::types::{ASTArrayKey, ASTTemplateArgument, ASTType, ASTTypeKind, PrimitiveKind};
use sema_ast::{ASTExpression, DeclRef, Name};
use sema_type::{
  is_equal, is_implicitly_convertible, strip_all, strip_wrapper_layers, AbstractType, ConstValue, SemanticResult,
  TemplateBindings, TypeKind,
};

use crate::context::ResolutionContext;
use crate::expressions::evaluate_value;
use crate::resolver::resolve_type;

pub struct Deduction<'c> {
  ctx: &'c mut ResolutionContext,
  definition: DeclRef,
  bindings: TemplateBindings,
  strict: bool,
}

impl<'c> Deduction<'c> {
  pub fn new(
    definition: DeclRef,
    ctx: &'c mut ResolutionContext,
  ) -> Self {
    let strict = ctx.config().resolution.strict_deduction;
    Self {
      ctx,
      definition,
      bindings: TemplateBindings::new(),
      strict,
    }
  }

  pub fn bindings(&self) -> &TemplateBindings {
    &self.bindings
  }

  pub fn into_bindings(self) -> TemplateBindings {
    self.bindings
  }

  fn is_parameter(
    &self,
    name: &Name,
  ) -> bool {
    self.definition.template_params().iter().any(|p| &p.name == name)
  }

  fn parameter(
    &self,
    name: &Name,
  ) -> Option<Arc<ASTTemplateParameter>> {
    self.definition.template_params().iter().find(|p| &p.name == name).cloned()
  }

  fn is_bound(
    &self,
    name: &Name,
  ) -> bool {
    self.bindings.contains_key(name)
  }

  /// Binds `name`; a parameter bound twice must be bound to equal results.
  fn bind(
    &mut self,
    name: &Name,
    value: &SemanticResult,
  ) -> bool {
    match self.bindings.get(name) {
      Some(existing) => is_equal(existing, value),
      None => {
        self.bindings.insert(name.clone(), value.clone());
        true
      },
    }
  }

  /// Matches one template parameter against one supplied argument.
  pub fn handle(
    &mut self,
    parameter: &ASTTemplateParameter,
    argument: Option<&SemanticResult>,
  ) -> bool {
    let Some(argument) = argument else {
      return self.bind_default(parameter);
    };

    if let SemanticResult::Ambiguous(candidates) = argument {
      return self.handle_first_fitting(parameter, candidates);
    }

    match &parameter.kind {
      ASTTemplateParameterKind::Tuple => self.bind(&parameter.name, &SemanticResult::of(TypeKind::Tuple(vec![argument.clone()]))),
      ASTTemplateParameterKind::Value { specialization, .. } => {
        if argument.as_value().is_none() {
          return false;
        }
        if let Some(specialization) = specialization {
          let expected = self.evaluate_in_declaration(specialization);
          if !is_equal(&expected, argument) {
            return false;
          }
        }
        self.bind(&parameter.name, argument)
      },
      ASTTemplateParameterKind::Type { specialization, .. } | ASTTemplateParameterKind::Alias { specialization, .. } => {
        match specialization {
          None => self.bind(&parameter.name, argument),
          Some(pattern) => {
            if !self.match_pattern(pattern, argument) {
              return false;
            }
            if !self.is_bound(&parameter.name) {
              self.bindings.insert(parameter.name.clone(), argument.clone());
            }
            true
          },
        }
      },
    }
  }

  fn handle_first_fitting(
    &mut self,
    parameter: &ASTTemplateParameter,
    candidates: &[SemanticResult],
  ) -> bool {
    let saved = self.bindings.clone();
    for candidate in candidates {
      if self.handle(parameter, Some(candidate)) {
        return true;
      }
      self.bindings = saved.clone();
    }
    false
  }

  /// Default arguments resolve in the template's own scope, seeing earlier bindings.
  fn bind_default(
    &mut self,
    parameter: &ASTTemplateParameter,
  ) -> bool {
    if self.is_bound(&parameter.name) {
      return true;
    }

    let value = match &parameter.kind {
      ASTTemplateParameterKind::Type { default: Some(ty), .. } | ASTTemplateParameterKind::Alias { default: Some(ty), .. } => {
        self.resolve_in_declaration(ty)
      },
      ASTTemplateParameterKind::Value { default: Some(expr), .. } => self.evaluate_in_declaration(expr),
      ASTTemplateParameterKind::Tuple => SemanticResult::of(TypeKind::Tuple(Vec::new())),
      _ => return false,
    };

    if value.is_unknown() {
      return false;
    }
    self.bindings.insert(parameter.name.clone(), value);
    true
  }

  fn resolve_in_declaration(
    &mut self,
    ty: &ASTType,
  ) -> SemanticResult {
    let mut frame = self
      .ctx
      .push_with_substitutions(self.definition.clone(), None, self.bindings.clone());
    resolve_type(ty, &mut frame)
  }

  fn evaluate_in_declaration(
    &mut self,
    expr: &ASTExpression,
  ) -> SemanticResult {
    let mut frame = self
      .ctx
      .push_with_substitutions(self.definition.clone(), None, self.bindings.clone());
    evaluate_value(expr, &mut frame)
  }

  /// Walks `pattern` and `argument` together, binding the parameters named in the pattern.
  pub fn match_pattern(
    &mut self,
    pattern: &ASTType,
    argument: &SemanticResult,
  ) -> bool {
    match &pattern.kind {
      ASTTypeKind::Identifier {
        name,
        inner: None,
        module_scoped: false,
      } if self.is_parameter(name) => self.bind(name, argument),
      ASTTypeKind::Identifier { .. } | ASTTypeKind::Primitive(_) => {
        let resolved = self.resolve_in_declaration(pattern);
        if resolved.is_unknown() {
          return false;
        }
        if self.strict {
          is_equal(&resolved, argument)
        } else {
          is_implicitly_convertible(argument, &resolved)
        }
      },
      ASTTypeKind::Array { element, key } => self.match_array(element, key, argument),
      ASTTypeKind::Pointer(target) => match strip_all(argument).kind() {
        Some(TypeKind::Pointer(inner)) => {
          let inner = (**inner).clone();
          self.match_pattern(target, &inner)
        },
        _ => false,
      },
      ASTTypeKind::Delegate(delegate) => {
        let stripped = strip_all(argument);
        let Some(TypeKind::Delegate(actual)) = stripped.kind() else {
          return false;
        };
        if actual.is_function != delegate.is_function || actual.params.len() != delegate.params.len() {
          return false;
        }
        let attributes_match = delegate
          .params
          .iter()
          .zip(actual.param_attributes.iter())
          .all(|(expected, actual)| expected.attributes == *actual);
        if !attributes_match || !self.match_pattern(&delegate.return_type, &actual.return_type) {
          return false;
        }
        delegate
          .params
          .iter()
          .zip(actual.params.iter())
          .all(|(expected, actual)| self.match_pattern(&expected.ty, actual))
      },
      ASTTypeKind::Attributed { modifier, inner } => {
        let stripped = strip_all(argument);
        let Some(actual) = stripped.as_type() else {
          return false;
        };
        if actual.modifier != Some(*modifier) {
          return false;
        }
        match inner {
          Some(inner) => {
            let unqualified = SemanticResult::Type(actual.clone().with_modifier(None));
            self.match_pattern(inner, &unqualified)
          },
          None => true,
        }
      },
      ASTTypeKind::TypeOf(_) => {
        let resolved = self.resolve_in_declaration(pattern);
        !resolved.is_unknown() && is_implicitly_convertible(argument, &resolved)
      },
      ASTTypeKind::Vector(element) => match strip_all(argument).kind() {
        Some(TypeKind::Vector(inner)) => {
          let inner = (**inner).clone();
          self.match_pattern(element, &inner)
        },
        _ => false,
      },
      ASTTypeKind::TemplateInstance(instance) => {
        let stripped = strip_all(argument);
        let Some(abstract_type) = stripped.as_type() else {
          return false;
        };
        let (Some(definition), Some(deduced)) = (abstract_type.definition(), abstract_type.deduced()) else {
          return false;
        };
        if definition.name != instance.name {
          return false;
        }

        let params = definition.template_params().to_vec();
        let deduced = deduced.clone();
        for (i, arg_pattern) in instance.args.iter().enumerate() {
          let Some(bound) = params.get(i).and_then(|p| deduced.get(&p.name)) else {
            return false;
          };
          let fits = match arg_pattern {
            ASTTemplateArgument::Type(ty) => self.match_pattern(ty, bound),
            ASTTemplateArgument::Value(expr) => self.match_value(expr, bound),
          };
          if !fits {
            return false;
          }
        }
        true
      },
      ASTTypeKind::Variadic(inner) => match inner {
        Some(inner) => match strip_all(argument).kind() {
          Some(TypeKind::Array { element, .. }) => {
            let element = (**element).clone();
            self.match_pattern(inner, &element)
          },
          _ => false,
        },
        None => true,
      },
    }
  }

  fn match_array(
    &mut self,
    element: &ASTType,
    key: &ASTArrayKey,
    argument: &SemanticResult,
  ) -> bool {
    let stripped = strip_all(argument);
    match (key, stripped.kind()) {
      (
        ASTArrayKey::Dynamic,
        Some(TypeKind::Array {
          element: actual,
          fixed_length: None,
        }),
      ) => self.match_pattern(element, actual),
      (
        ASTArrayKey::Fixed(length),
        Some(TypeKind::Array {
          element: actual,
          fixed_length: Some(actual_length),
        }),
      ) => {
        let Ok(actual_length) = i64::try_from(*actual_length) else {
          return false;
        };
        let value = SemanticResult::value(
          ConstValue::Int(actual_length),
          AbstractType::new(TypeKind::Primitive(PrimitiveKind::ULong)),
        );
        self.match_value(length, &value) && self.match_pattern(element, actual)
      },
      (ASTArrayKey::Fixed(key_expr), Some(TypeKind::AssocArray { value, key })) => {
        let key_matches = match &key_expr.kind {
          ASTExpressionKind::Identifier(name) if self.is_parameter(name) => self.bind(name, key),
          ASTExpressionKind::Type(ty) => self.match_pattern(ty, key),
          _ => false,
        };
        key_matches && self.match_pattern(element, value)
      },
      (ASTArrayKey::Associative(key_pattern), Some(TypeKind::AssocArray { value, key })) => {
        self.match_pattern(key_pattern, key) && self.match_pattern(element, value)
      },
      _ => false,
    }
  }

  /// A parameter in value position binds the value; anything else must evaluate equal.
  fn match_value(
    &mut self,
    expr: &ASTExpression,
    actual: &SemanticResult,
  ) -> bool {
    if let ASTExpressionKind::Identifier(name) = &expr.kind {
      if let Some(parameter) = self.parameter(name) {
        return match parameter.kind {
          ASTTemplateParameterKind::Value { .. } => actual.as_value().is_some() && self.bind(name, actual),
          _ => self.bind(name, actual),
        };
      }
    }
    let expected = self.evaluate_in_declaration(expr);
    !expected.is_unknown() && is_equal(&expected, actual)
  }
}

/// Deduces the template parameters of `definition` from explicit arguments.
pub fn deduce_template(
  definition: &DeclRef,
  args: &[SemanticResult],
  ctx: &mut ResolutionContext,
) -> Option<TemplateBindings> {
  deduce_or_blame(definition, args, ctx).ok()
}

/// Like [`deduce_template`], naming the parameter that failed on error.
pub(crate) fn deduce_or_blame(
  definition: &DeclRef,
  args: &[SemanticResult],
  ctx: &mut ResolutionContext,
) -> Result<TemplateBindings, Name> {
  let params = definition.template_params().to_vec();
  let mut deduction = Deduction::new(definition.clone(), ctx);

  for (i, param) in params.iter().enumerate() {
    if matches!(param.kind, ASTTemplateParameterKind::Tuple) {
      let rest = args.get(i..).unwrap_or(&[]).to_vec();
      deduction.bindings.insert(param.name.clone(), SemanticResult::of(TypeKind::Tuple(rest)));
      return Ok(deduction.into_bindings());
    }
    if !deduction.handle(param, args.get(i)) {
      return Err(param.name.clone());
    }
  }

  if args.len() > params.len() {
    return Err(definition.name.clone());
  }
  Ok(deduction.into_bindings())
}

/// Implicit instantiation: deduces template parameters from call argument
/// types matched against the function's parameter types.
pub fn deduce_from_call(
  definition: &DeclRef,
  function: &ASTFunction,
  args: &[SemanticResult],
  ctx: &mut ResolutionContext,
) -> Option<TemplateBindings> {
  let mentions_parameter =
    |ty: &ASTType| function.template_params.iter().any(|p| ty.mentions(&p.name));
  let mut deduction = Deduction::new(definition.clone(), ctx);

  for (i, param) in function.params.iter().enumerate() {
    let Some(var) = param.as_variable() else {
      continue;
    };
    let Some(ty) = var.ty.as_ref().filter(|ty| mentions_parameter(ty)) else {
      continue;
    };

    if var.is_variadic {
      let element = match &ty.kind {
        ASTTypeKind::Array { element, .. } => &**element,
        _ => ty,
      };
      for arg in args.iter().skip(i) {
        if !deduction.match_pattern(element, &call_argument(arg)) {
          return None;
        }
      }
      break;
    }

    let Some(arg) = args.get(i) else {
      continue;
    };
    if !deduction.match_pattern(ty, &call_argument(arg)) {
      return None;
    }
  }

  for param in &function.template_params {
    if !deduction.is_bound(&param.name) && !deduction.bind_default(param) {
      return None;
    }
  }
  Some(deduction.into_bindings())
}

/// The type a call argument contributes to deduction.
fn call_argument(arg: &SemanticResult) -> SemanticResult {
  match arg {
    SemanticResult::Ambiguous(candidates) => SemanticResult::Ambiguous(candidates.iter().map(call_argument).collect()),
    other => strip_wrapper_layers(&other.type_of()),
  }
}
