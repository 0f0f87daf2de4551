//! Type declarations and identifiers to semantic results.
//!
//! Identifier lookup walks outward from the frame's scope: enclosing blocks
//! (innermost first), the function's template parameters and parameters, the
//! enclosing aggregate and its base classes, the module, its imports and
//! finally the root packages. The walk stops at the first level holding any
//! match and returns every match of that level.

use std::collections::HashSet;
use std::sync::Arc;

use sema_ast::declarations::{ASTAggregate, ASTDeclarationKind, ASTFunction, ASTVariable, FunctionKind};
use sema_ast::statements::{ASTStatement, ASTStatementKind};
use sema_ast::types::{ASTArrayKey, ASTType, ASTTypeKind, PrimitiveKind, TypeModifier};
use sema_ast::{BytePosition, DeclRef, Name};
use sema_config::DebugTrace;
use sema_diagnostics::message::DiagnosticMessage;
use sema_log::trace_dbg;
use sema_type::{
  strip_aliases, strip_all, strip_wrapper_layers, AliasType, DelegateType, MemberSymbol, SemanticResult,
  TemplateBindings, TemplateParameterSymbol, TypeKind, UserDefinedType, UserTypeKind,
};

use crate::context::{FrameGuard, ResolutionContext, ResolutionOptions};
use crate::expressions::{evaluate_type, evaluate_value};
use crate::properties::static_property;
use crate::templates::resolve_template_instance;

/// Resolves a type declaration in the current frame.
pub fn resolve_type(
  ty: &ASTType,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if let Some(cached) = ctx.cached(ty.id) {
    return cached;
  }

  let result = resolve_type_uncached(ty, ctx);
  ctx.memoize(ty.id, &result);
  result
}

fn resolve_type_uncached(
  ty: &ASTType,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  match &ty.kind {
    ASTTypeKind::Identifier {
      name,
      inner: None,
      module_scoped,
    } => {
      let found = if *module_scoped {
        let module = ctx.scope().node_root();
        lookup_in_declaration(&module, name, None, ctx)
      } else {
        lookup_identifier(name, ctx)
      };

      let result = SemanticResult::from_candidates(found);
      if result.is_unknown() {
        return builtin_alias(name);
      }
      if let SemanticResult::Ambiguous(candidates) = &result {
        let overloads = candidates
          .iter()
          .all(|c| c.definition().map(|d| d.as_function().is_some()).unwrap_or(false));
        if !overloads {
          ctx.report(DiagnosticMessage::AmbiguousResult {
            name: name.to_string(),
            count: candidates.len(),
            span: ty.span,
          });
        }
      }
      result
    },
    ASTTypeKind::Identifier {
      name,
      inner: Some(inner),
      ..
    } => {
      let base = resolve_type(inner, ctx);
      resolve_member(&base, name, ctx)
    },
    ASTTypeKind::Primitive(kind) => SemanticResult::primitive(*kind),
    ASTTypeKind::Array { element, key } => {
      let element = resolve_type(element, ctx);
      match key {
        ASTArrayKey::Dynamic => SemanticResult::array_of(element),
        ASTArrayKey::Associative(key) => {
          let key = resolve_type(key, ctx);
          SemanticResult::of(TypeKind::AssocArray {
            value: Box::new(element),
            key: Box::new(key),
          })
        },
        ASTArrayKey::Fixed(expr) => {
          // `V[K]` parses as a length expression; a key that names a type makes it associative.
          if let Some(length) = evaluate_value(expr, ctx).as_value().and_then(|v| v.value.as_int()) {
            return SemanticResult::fixed_array_of(element, length.max(0) as u64);
          }

          let key = evaluate_type(expr, ctx);
          match strip_aliases(&key).kind() {
            Some(TypeKind::Member(_)) | None => SemanticResult::array_of(element),
            Some(_) => SemanticResult::of(TypeKind::AssocArray {
              value: Box::new(element),
              key: Box::new(key),
            }),
          }
        },
      }
    },
    ASTTypeKind::Pointer(target) => SemanticResult::pointer_to(resolve_type(target, ctx)),
    ASTTypeKind::Delegate(delegate) => {
      let return_type = resolve_type(&delegate.return_type, ctx);
      let params = delegate.params.iter().map(|p| resolve_type(&p.ty, ctx)).collect();
      SemanticResult::of(TypeKind::Delegate(DelegateType {
        return_type: Box::new(return_type),
        params,
        param_attributes: delegate.params.iter().map(|p| p.attributes).collect(),
        is_function: delegate.is_function,
        definition: None,
      }))
    },
    ASTTypeKind::Attributed { modifier, inner } => match inner {
      Some(inner) => apply_modifier(resolve_type(inner, ctx), *modifier),
      None => SemanticResult::Unknown,
    },
    ASTTypeKind::TypeOf(expr) => {
      let result = evaluate_type(expr, ctx).type_of();
      strip_wrapper_layers(&result)
    },
    ASTTypeKind::Vector(element) => SemanticResult::of(TypeKind::Vector(Box::new(resolve_type(element, ctx)))),
    ASTTypeKind::TemplateInstance(instance) => resolve_template_instance(instance, ctx),
    ASTTypeKind::Variadic(inner) => match inner {
      Some(inner) => SemanticResult::array_of(resolve_type(inner, ctx)),
      None => SemanticResult::of(TypeKind::Tuple(Vec::new())),
    },
  }
}

fn apply_modifier(
  result: SemanticResult,
  modifier: TypeModifier,
) -> SemanticResult {
  result.map(&mut |candidate| match candidate {
    SemanticResult::Type(t) => SemanticResult::Type(t.with_modifier(Some(modifier))),
    other => other,
  })
}

/// Aliases the language predefines in every module.
pub fn builtin_alias(name: &Name) -> SemanticResult {
  match name.as_str() {
    "string" => SemanticResult::string_type(),
    "wstring" => SemanticResult::char_string(PrimitiveKind::WChar),
    "dstring" => SemanticResult::char_string(PrimitiveKind::DChar),
    "size_t" => SemanticResult::primitive(PrimitiveKind::ULong),
    "ptrdiff_t" => SemanticResult::primitive(PrimitiveKind::Long),
    _ => SemanticResult::Unknown,
  }
}

/// All results `name` denotes at the innermost level that knows it.
pub fn lookup_identifier(
  name: &Name,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  if let Some(bound) = ctx.substitution(name) {
    return vec![bound.clone()];
  }

  let mut location = ctx.location();
  let mut current = Some(ctx.scope().clone());

  while let Some(decl) = current {
    if ctx.is_cancelled() {
      return Vec::new();
    }

    let found = lookup_in_declaration(&decl, name, location, ctx);
    if !found.is_empty() {
      return found;
    }

    if decl.is_module() {
      let imported = lookup_in_imports(&decl, name, ctx);
      if !imported.is_empty() {
        return imported;
      }
      break;
    }

    location = Some(decl.span.start);
    current = decl.parent();
  }

  lookup_in_root_packages(name, ctx)
}

/// Matches for `name` directly inside `decl`: block locals visible at
/// `location`, template parameters, parameters and members.
pub fn lookup_in_declaration(
  decl: &DeclRef,
  name: &Name,
  location: Option<BytePosition>,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  match &decl.kind {
    ASTDeclarationKind::Function(function) => {
      if let Some(pos) = location {
        let ignore_order = ctx.has_option(ResolutionOptions::IGNORE_DECLARATION_CONDITIONS);
        for block in decl.blocks_at(pos) {
          if ctx.is_cancelled() {
            return Vec::new();
          }

          let visible: Vec<DeclRef> = block
            .scope()
            .lookup(name)
            .into_iter()
            .filter(|local| ignore_order || local.span.start <= pos)
            .collect();
          if !visible.is_empty() {
            return declarations_to_results(&visible, ctx);
          }
        }
      }

      if let Some(param) = function.template_params.iter().find(|p| &p.name == name) {
        return vec![SemanticResult::of(TypeKind::TemplateParameter(TemplateParameterSymbol {
          parameter: param.clone(),
          base: None,
        }))];
      }

      let params: Vec<DeclRef> = function.params.iter().filter(|p| &p.name == name).cloned().collect();
      declarations_to_results(&params, ctx)
    },
    ASTDeclarationKind::Aggregate(aggregate) => {
      if let Some(param) = aggregate.template_params.iter().find(|p| &p.name == name) {
        return vec![SemanticResult::of(TypeKind::TemplateParameter(TemplateParameterSymbol {
          parameter: param.clone(),
          base: None,
        }))];
      }

      let members = aggregate_members(decl, name, ctx);
      declarations_to_results(&members, ctx)
    },
    _ => {
      let members = decl.scope().lookup(name);
      declarations_to_results(&members, ctx)
    },
  }
}

fn lookup_in_imports(
  module: &DeclRef,
  name: &Name,
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  let mut visited: HashSet<sema_ast::NodeId> = HashSet::from([module.id]);
  let mut found = Vec::new();

  for imported in imported_modules(module, ctx, &mut visited) {
    if ctx.is_cancelled() {
      break;
    }
    let members: Vec<DeclRef> = imported
      .scope()
      .lookup(name)
      .into_iter()
      .filter(|m| is_visible(m, ctx))
      .collect();
    found.extend(declarations_to_results(&members, ctx));
  }

  found
}

/// Modules imported by `module`, followed through public imports.
pub fn imported_modules(
  module: &DeclRef,
  ctx: &ResolutionContext,
  visited: &mut HashSet<sema_ast::NodeId>,
) -> Vec<DeclRef> {
  let mut out = Vec::new();
  collect_imports(module, ctx, visited, false, &mut out);
  out
}

fn collect_imports(
  module: &DeclRef,
  ctx: &ResolutionContext,
  visited: &mut HashSet<sema_ast::NodeId>,
  public_only: bool,
  out: &mut Vec<DeclRef>,
) {
  let Some(info) = module.as_module() else {
    return;
  };

  for import in &info.imports {
    if public_only && !import.is_public {
      continue;
    }
    let Some(imported) = ctx.cache().module(&import.path) else {
      continue;
    };
    if !visited.insert(imported.id) {
      continue;
    }

    out.push(imported.clone());
    collect_imports(&imported, ctx, visited, true, out);
  }
}

fn lookup_in_root_packages(
  name: &Name,
  ctx: &ResolutionContext,
) -> Vec<SemanticResult> {
  let mut found = Vec::new();
  for root in ctx.cache().root_packages() {
    if let Some(package) = root.get_sub_package(name.as_str()) {
      found.push(SemanticResult::of(TypeKind::Package(package)));
    }
    if let Some(module) = root.get_module(name.as_str()) {
      found.push(SemanticResult::of(TypeKind::Module(module)));
    }
  }
  found
}

pub fn is_visible(
  decl: &DeclRef,
  ctx: &ResolutionContext,
) -> bool {
  ctx.has_option(ResolutionOptions::IGNORE_ALL_PROTECTION_ATTRIBUTES)
    || !decl.attributes.contains(sema_ast::metadata::DeclAttributes::PRIVATE)
}

/// Members named `name` of an aggregate, searching base classes when the
/// aggregate itself has none.
pub fn aggregate_members(
  aggregate: &DeclRef,
  name: &Name,
  ctx: &mut ResolutionContext,
) -> Vec<DeclRef> {
  let own = aggregate.scope().lookup(name);
  if !own.is_empty() || !resolves_base_classes(ctx) {
    return own;
  }

  for base in base_class_definitions(aggregate, ctx) {
    let inherited = aggregate_members(&base, name, ctx);
    if !inherited.is_empty() {
      return inherited;
    }
  }
  Vec::new()
}

fn resolves_base_classes(ctx: &ResolutionContext) -> bool {
  ctx.config().resolution.resolve_base_classes && !ctx.has_option(ResolutionOptions::DONT_RESOLVE_BASE_CLASSES)
}

/// Declarations of the base classes and interfaces of an aggregate, in declaration order.
pub fn base_class_definitions(
  aggregate: &DeclRef,
  ctx: &mut ResolutionContext,
) -> Vec<DeclRef> {
  let Some(info) = aggregate.as_aggregate() else {
    return Vec::new();
  };
  if info.base_classes.is_empty() || !ctx.begin_resolving(aggregate.id) {
    return Vec::new();
  }

  let scope = aggregate.parent().unwrap_or_else(|| aggregate.clone());
  let mut out = Vec::new();
  {
    let mut frame = ctx.push(scope, Some(aggregate.span.start));
    for base in &info.base_classes {
      let resolved = strip_all(&resolve_type(base, &mut frame));
      if let Some(definition) = resolved.definition() {
        if definition.as_aggregate().is_some() {
          out.push(definition.clone());
        }
      }
    }
  }

  ctx.end_resolving(aggregate.id);
  out
}

/// Resolves the members of `base` named `name`. Static properties are the fallback.
pub fn resolve_member(
  base: &SemanticResult,
  name: &Name,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let members = resolve_member_declarations(base, name, ctx);
  if !members.is_unknown() {
    return members;
  }

  static_property(&strip_all(base), name, ctx)
}

/// Declared members only; no static properties, no call-syntax extension.
pub fn resolve_member_declarations(
  base: &SemanticResult,
  name: &Name,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if let SemanticResult::Ambiguous(candidates) = base {
    let resolved = candidates
      .iter()
      .map(|candidate| resolve_member_declarations(candidate, name, ctx))
      .collect();
    return SemanticResult::from_candidates(resolved);
  }

  let stripped = strip_all(base);
  let found = match stripped.kind() {
    Some(TypeKind::Module(module)) => {
      let module = module.clone();
      let members: Vec<DeclRef> = module
        .scope()
        .lookup(name)
        .into_iter()
        .filter(|m| is_visible(m, ctx))
        .collect();
      declarations_to_results(&members, ctx)
    },
    Some(TypeKind::Package(package)) => {
      let mut found = Vec::new();
      if let Some(sub) = package.get_sub_package(name.as_str()) {
        found.push(SemanticResult::of(TypeKind::Package(sub)));
      }
      if let Some(module) = package.get_module(name.as_str()) {
        found.push(SemanticResult::of(TypeKind::Module(module)));
      }
      found
    },
    Some(TypeKind::UserDefined(user)) => {
      let definition = user.definition.clone();
      let deduced = user.deduced.clone();
      let members = if user.kind == UserTypeKind::Enum {
        definition.scope().lookup(name)
      } else {
        aggregate_members(&definition, name, ctx)
      };

      let mut frame = ctx.push_with_substitutions(definition, None, deduced);
      declarations_to_results(&members, &mut frame)
    },
    _ => Vec::new(),
  };

  SemanticResult::from_candidates(found)
}

pub fn declarations_to_results(
  decls: &[DeclRef],
  ctx: &mut ResolutionContext,
) -> Vec<SemanticResult> {
  let methods_only = ctx.has_option(ResolutionOptions::RETURN_METHOD_REFERENCES_ONLY);
  let mut out = Vec::with_capacity(decls.len());
  for decl in decls {
    if ctx.is_cancelled() {
      break;
    }
    if methods_only && decl.as_function().is_none() {
      continue;
    }
    out.push(declaration_to_result(decl, ctx));
  }
  out
}

/// Enters the scope a declaration was declared in. Substitutions carry over
/// when that scope lies inside the current one.
pub(crate) fn enter_declaration_scope<'a>(
  decl: &DeclRef,
  ctx: &'a mut ResolutionContext,
) -> FrameGuard<'a> {
  let scope = decl.parent().unwrap_or_else(|| decl.clone());
  enter_scope(scope, Some(decl.span.start), ctx)
}

pub(crate) fn enter_scope<'a>(
  scope: DeclRef,
  location: Option<BytePosition>,
  ctx: &'a mut ResolutionContext,
) -> FrameGuard<'a> {
  let substitutions = if is_within(&scope, ctx.scope()) {
    ctx.substitutions().clone()
  } else {
    TemplateBindings::new()
  };
  ctx.push_with_substitutions(scope, location, substitutions)
}

fn is_within(
  decl: &DeclRef,
  ancestor: &DeclRef,
) -> bool {
  let mut current = Some(decl.clone());
  while let Some(d) = current {
    if Arc::ptr_eq(&d, ancestor) {
      return true;
    }
    current = d.parent();
  }
  false
}

/// The semantic result a declaration stands for.
pub fn declaration_to_result(
  decl: &DeclRef,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  match &decl.kind {
    ASTDeclarationKind::Module(_) => SemanticResult::of(TypeKind::Module(decl.clone())),
    ASTDeclarationKind::Variable(var) if var.is_alias => alias_type(decl, var, ctx),
    ASTDeclarationKind::Variable(var) => variable_reference(decl, var, ctx),
    ASTDeclarationKind::Function(function) => function_reference(decl, function, TemplateBindings::new(), ctx),
    ASTDeclarationKind::Aggregate(aggregate) => aggregate_type(decl, aggregate, TemplateBindings::new(), ctx),
    ASTDeclarationKind::Enum(info) => {
      let base = match &info.base {
        Some(ty) => {
          let mut frame = enter_declaration_scope(decl, ctx);
          let base = resolve_type(ty, &mut frame);
          (!base.is_unknown()).then(|| Box::new(base))
        },
        None => None,
      };
      SemanticResult::of(TypeKind::UserDefined(UserDefinedType {
        kind: UserTypeKind::Enum,
        definition: decl.clone(),
        base,
        interfaces: Vec::new(),
        deduced: TemplateBindings::new(),
      }))
    },
    ASTDeclarationKind::EnumMember(_) => {
      let base = decl.parent().map(|parent| declaration_to_result(&parent, ctx));
      SemanticResult::member(decl.clone(), base)
    },
  }
}

fn alias_type(
  decl: &DeclRef,
  var: &ASTVariable,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let unresolved = || {
    SemanticResult::of(TypeKind::Alias(AliasType {
      definition: decl.clone(),
      base: None,
    }))
  };

  if ctx.has_option(ResolutionOptions::DONT_RESOLVE_ALIASES) {
    return unresolved();
  }
  if !ctx.begin_resolving(decl.id) {
    trace_dbg!(ctx.config(), DebugTrace::Symbols, "alias cycle through {}", decl.name);
    return unresolved();
  }

  let base = match &var.ty {
    Some(ty) => {
      let mut frame = enter_declaration_scope(decl, ctx);
      resolve_type(ty, &mut frame)
    },
    None => SemanticResult::Unknown,
  };
  ctx.end_resolving(decl.id);

  SemanticResult::of(TypeKind::Alias(AliasType {
    definition: decl.clone(),
    base: (!base.is_unknown()).then(|| Box::new(base)),
  }))
}

fn variable_reference(
  decl: &DeclRef,
  var: &ASTVariable,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  if ctx.has_option(ResolutionOptions::DONT_RESOLVE_BASE_TYPES) || !ctx.begin_resolving(decl.id) {
    return SemanticResult::member(decl.clone(), None);
  }

  let ty = {
    let mut frame = enter_declaration_scope(decl, ctx);
    match (&var.ty, &var.initializer) {
      (Some(ty), _) => resolve_type(ty, &mut frame),
      (None, Some(initializer)) => strip_wrapper_layers(&evaluate_type(initializer, &mut frame).type_of()),
      (None, None) => SemanticResult::Unknown,
    }
  };
  ctx.end_resolving(decl.id);

  SemanticResult::member(decl.clone(), (!ty.is_unknown()).then_some(ty))
}

/// Reference to a function; its base is the return type, resolved with `bindings`.
pub fn function_reference(
  decl: &DeclRef,
  function: &ASTFunction,
  bindings: TemplateBindings,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let base = match function.kind {
    FunctionKind::Constructor => decl.parent().map(|parent| declaration_to_result(&parent, ctx)),
    _ => {
      let mut frame = ctx.push_with_substitutions(decl.clone(), None, bindings.clone());
      let ty = match &function.return_type {
        Some(ty) => resolve_type(ty, &mut frame),
        None => infer_return_type(decl, function, &mut frame),
      };
      (!ty.is_unknown()).then_some(ty)
    },
  };

  SemanticResult::of(TypeKind::Member(MemberSymbol {
    definition: decl.clone(),
    base: base.map(Box::new),
    deduced: bindings,
  }))
}

/// Type of the first `return` with a value; `void` when there is none.
fn infer_return_type(
  decl: &DeclRef,
  function: &ASTFunction,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let Some(body) = &function.body else {
    return SemanticResult::Unknown;
  };
  let Some((span, value)) = first_return(body.statements()) else {
    return SemanticResult::primitive(PrimitiveKind::Void);
  };
  if !ctx.begin_resolving(decl.id) {
    return SemanticResult::Unknown;
  }

  let ty = {
    let substitutions = ctx.substitutions().clone();
    let mut frame = ctx.push_with_substitutions(decl.clone(), Some(span), substitutions);
    strip_wrapper_layers(&evaluate_type(value, &mut frame).type_of())
  };
  ctx.end_resolving(decl.id);
  ty
}

fn first_return(statements: &[ASTStatement]) -> Option<(BytePosition, &sema_ast::ASTExpression)> {
  for stmt in statements {
    if let ASTStatementKind::Return(Some(value)) = &stmt.kind {
      return Some((stmt.span.start, value));
    }
    let nested: Vec<&ASTStatement> = stmt.sub_statements();
    for sub in nested {
      if let Some(found) = first_return(std::slice::from_ref(sub)) {
        return Some(found);
      }
    }
  }
  None
}

/// Class, struct, union, interface or template type for an aggregate declaration.
pub fn aggregate_type(
  decl: &DeclRef,
  aggregate: &ASTAggregate,
  deduced: TemplateBindings,
  ctx: &mut ResolutionContext,
) -> SemanticResult {
  let mut base = None;
  let mut interfaces = Vec::new();

  if !aggregate.base_classes.is_empty() && resolves_base_classes(ctx) && ctx.begin_resolving(decl.id) {
    {
      let scope = decl.parent().unwrap_or_else(|| decl.clone());
      let mut frame = ctx.push(scope, Some(decl.span.start));
      for base_class in &aggregate.base_classes {
        let resolved = resolve_type(base_class, &mut frame);
        let is_interface = matches!(
          strip_all(&resolved).kind(),
          Some(TypeKind::UserDefined(UserDefinedType {
            kind: UserTypeKind::Interface,
            ..
          }))
        );

        if base.is_none() && !is_interface {
          base = Some(Box::new(resolved));
        } else {
          interfaces.push(resolved);
        }
      }
    }
    ctx.end_resolving(decl.id);
  }

  SemanticResult::of(TypeKind::UserDefined(UserDefinedType {
    kind: aggregate.kind.into(),
    definition: decl.clone(),
    base,
    interfaces,
    deduced,
  }))
}
