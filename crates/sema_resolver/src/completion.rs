//! Completion-side consumers of the resolver.
//!
//! Candidates are reported through a [`CompletionDataGenerator`] in the order
//! they are discovered. Formatting and sorting are left to the caller.

use std::collections::HashSet;

use sema_ast::expressions::ASTExpressionKind;
use sema_ast::metadata::DeclAttributes;
use sema_ast::types::ASTTemplateArgument;
use sema_ast::{ASTExpression, BytePosition, DeclRef, Name, NodeId};
use sema_config::DebugTrace;
use sema_log::trace_dbg;
use sema_type::{strip_all, SemanticResult, TypeKind, UserTypeKind};

use crate::context::{ResolutionContext, ResolutionOptions};
use crate::expressions::{constructors_of, evaluate_callee, evaluate_type, is_instance};
use crate::properties::static_property_names;
use crate::resolver::{base_class_definitions, resolve_type};
use crate::ufcs::resolve_ufcs;

/// Attributes offered after `@`.
pub const PROPERTY_ATTRIBUTES: &[&str] = &["property", "safe", "trusted", "system", "disable", "nogc"];

pub const STATEMENT_KEYWORDS: &[&str] = &[
  "if", "else", "while", "do", "for", "foreach", "switch", "case", "default", "return", "break", "continue", "goto",
  "try", "catch", "finally", "throw", "scope", "asm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionIcon {
  Property,
  Keyword,
  Snippet,
}

impl CompletionIcon {
  pub fn as_str(&self) -> &'static str {
    match self {
      CompletionIcon::Property => "property",
      CompletionIcon::Keyword => "keyword",
      CompletionIcon::Snippet => "snippet",
    }
  }
}

/// Receives completion candidates as the resolver finds them.
pub trait CompletionDataGenerator {
  fn add_token(
    &mut self,
    keyword: &str,
  );

  fn add_property_attribute(
    &mut self,
    attribute: &str,
  );

  fn add_icon_item(
    &mut self,
    icon: CompletionIcon,
    text: &str,
    description: &str,
  );

  fn add_text_item(
    &mut self,
    text: &str,
    description: &str,
  );

  /// A declared symbol.
  fn add(
    &mut self,
    decl: &DeclRef,
  );

  fn add_module(
    &mut self,
    module: &DeclRef,
    display_name: Option<&str>,
  );

  fn add_package(
    &mut self,
    name: &str,
  );

  /// An item that inserts `code`, built from `decl`.
  fn add_code_generating_item(
    &mut self,
    decl: &DeclRef,
    code: &str,
  );
}

/// One reported candidate, as kept by [`CompletionRecorder`].
#[derive(Debug, Clone)]
pub enum CompletionItem {
  Token(String),
  PropertyAttribute(String),
  Icon {
    icon: CompletionIcon,
    text: String,
    description: String,
  },
  Text {
    text: String,
    description: String,
  },
  Symbol(DeclRef),
  Module {
    module: DeclRef,
    display_name: Option<String>,
  },
  Package(String),
  Override {
    declaration: DeclRef,
    code: String,
  },
}

impl CompletionItem {
  /// Text shown to the user.
  pub fn label(&self) -> String {
    match self {
      CompletionItem::Token(text) | CompletionItem::PropertyAttribute(text) | CompletionItem::Package(text) => text.clone(),
      CompletionItem::Icon { text, .. } | CompletionItem::Text { text, .. } => text.clone(),
      CompletionItem::Symbol(decl) => decl.name.to_string(),
      CompletionItem::Module { module, display_name } => match display_name {
        Some(name) => name.clone(),
        None => module.name.to_string(),
      },
      CompletionItem::Override { declaration, .. } => declaration.name.to_string(),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      CompletionItem::Token(_) => "token",
      CompletionItem::PropertyAttribute(_) => "attribute",
      CompletionItem::Icon { icon, .. } => icon.as_str(),
      CompletionItem::Text { .. } => "text",
      CompletionItem::Symbol(_) => "symbol",
      CompletionItem::Module { .. } => "module",
      CompletionItem::Package(_) => "package",
      CompletionItem::Override { .. } => "override",
    }
  }

  pub fn detail(&self) -> String {
    match self {
      CompletionItem::Icon { description, .. } | CompletionItem::Text { description, .. } => description.clone(),
      CompletionItem::Symbol(decl) => decl.qualified_name(),
      CompletionItem::Module { module, .. } => module.as_module().map(|m| m.path.clone()).unwrap_or_default(),
      CompletionItem::Override { code, .. } => code.clone(),
      CompletionItem::Token(_) | CompletionItem::PropertyAttribute(_) | CompletionItem::Package(_) => String::new(),
    }
  }
}

/// Keeps every reported candidate in insertion order.
#[derive(Debug, Default)]
pub struct CompletionRecorder {
  pub items: Vec<CompletionItem>,
}

impl CompletionRecorder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn labels(&self) -> Vec<String> {
    self.items.iter().map(|item| item.label()).collect()
  }
}

impl CompletionDataGenerator for CompletionRecorder {
  fn add_token(
    &mut self,
    keyword: &str,
  ) {
    self.items.push(CompletionItem::Token(keyword.to_string()));
  }

  fn add_property_attribute(
    &mut self,
    attribute: &str,
  ) {
    self.items.push(CompletionItem::PropertyAttribute(attribute.to_string()));
  }

  fn add_icon_item(
    &mut self,
    icon: CompletionIcon,
    text: &str,
    description: &str,
  ) {
    self.items.push(CompletionItem::Icon {
      icon,
      text: text.to_string(),
      description: description.to_string(),
    });
  }

  fn add_text_item(
    &mut self,
    text: &str,
    description: &str,
  ) {
    self.items.push(CompletionItem::Text {
      text: text.to_string(),
      description: description.to_string(),
    });
  }

  fn add(
    &mut self,
    decl: &DeclRef,
  ) {
    self.items.push(CompletionItem::Symbol(decl.clone()));
  }

  fn add_module(
    &mut self,
    module: &DeclRef,
    display_name: Option<&str>,
  ) {
    self.items.push(CompletionItem::Module {
      module: module.clone(),
      display_name: display_name.map(str::to_string),
    });
  }

  fn add_package(
    &mut self,
    name: &str,
  ) {
    self.items.push(CompletionItem::Package(name.to_string()));
  }

  fn add_code_generating_item(
    &mut self,
    decl: &DeclRef,
    code: &str,
  ) {
    self.items.push(CompletionItem::Override {
      declaration: decl.clone(),
      code: code.to_string(),
    });
  }
}

/// Members of whatever `expr` resolves to, as after `expr.` in the editor.
pub fn complete_members(
  expr: &ASTExpression,
  ctx: &mut ResolutionContext,
  gen: &mut dyn CompletionDataGenerator,
) {
  let resolved = evaluate_type(expr, ctx);
  trace_dbg!(ctx.config(), DebugTrace::Completion, "members of '{}' ({})", expr, resolved);

  let mut emitted: HashSet<NodeId> = HashSet::new();
  for candidate in resolved.into_candidates() {
    if ctx.is_cancelled() {
      return;
    }
    complete_members_of(&candidate, ctx, gen, &mut emitted);
  }
}

fn complete_members_of(
  candidate: &SemanticResult,
  ctx: &mut ResolutionContext,
  gen: &mut dyn CompletionDataGenerator,
  emitted: &mut HashSet<NodeId>,
) {
  let ty = strip_all(&candidate.type_of());

  match ty.kind() {
    Some(TypeKind::Module(module)) => {
      for member in module.scope().children() {
        if member.attributes.is_public() && emitted.insert(member.id) {
          gen.add(&member);
        }
      }
    },
    Some(TypeKind::Package(package)) => {
      for sub in package.packages() {
        gen.add_package(&sub.name);
      }
      for module in package.modules() {
        gen.add_module(&module, Some(module.name.as_str()));
      }
    },
    Some(TypeKind::UserDefined(user)) if user.kind == UserTypeKind::Enum => {
      for member in user.definition.scope().children() {
        if emitted.insert(member.id) {
          gen.add(&member);
        }
      }
    },
    Some(TypeKind::UserDefined(user)) => {
      let mut shadowed: HashSet<Name> = HashSet::new();
      let mut visited: HashSet<NodeId> = HashSet::new();
      aggregate_members(&user.definition, ctx, gen, emitted, &mut shadowed, &mut visited);
    },
    _ => {},
  }

  if matches!(ty.kind(), Some(TypeKind::Module(_) | TypeKind::Package(_))) {
    return;
  }

  if ctx.config().completion.show_static_properties {
    for (name, description) in static_property_names(&ty) {
      gen.add_icon_item(CompletionIcon::Property, name, description);
    }
  }

  if ctx.config().completion.show_ufcs_items && is_instance(candidate) {
    for extension in resolve_ufcs(candidate, None, false, ctx) {
      if let Some(definition) = extension.definition() {
        if emitted.insert(definition.id) {
          gen.add(definition);
        }
      }
    }
  }
}

/// Members of an aggregate, then of its base classes; a base member hidden by
/// a derived one of the same name is skipped.
fn aggregate_members(
  aggregate: &DeclRef,
  ctx: &mut ResolutionContext,
  gen: &mut dyn CompletionDataGenerator,
  emitted: &mut HashSet<NodeId>,
  shadowed: &mut HashSet<Name>,
  visited: &mut HashSet<NodeId>,
) {
  if !visited.insert(aggregate.id) {
    return;
  }

  let members = aggregate.scope().children();
  for member in &members {
    if member.is_constructor() || shadowed.contains(&member.name) {
      continue;
    }
    if emitted.insert(member.id) {
      gen.add(member);
    }
  }
  shadowed.extend(members.iter().map(|m| m.name.clone()));

  if !ctx.config().resolution.resolve_base_classes || ctx.has_option(ResolutionOptions::DONT_RESOLVE_BASE_CLASSES) {
    return;
  }
  for base in base_class_definitions(aggregate, ctx) {
    aggregate_members(&base, ctx, gen, emitted, shadowed, visited);
  }
}

/// Overloads offered while typing the arguments of a call, `new` or template instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInsight {
  /// Every overload, unfiltered by the arguments typed so far.
  pub overloads: Vec<SemanticResult>,
  /// Index of the argument under the caret.
  pub current_argument: usize,
}

pub fn parameter_insight(
  expr: &ASTExpression,
  caret: BytePosition,
  ctx: &mut ResolutionContext,
) -> Option<ParameterInsight> {
  let call = expr.innermost_call_at(caret)?;

  let insight = match &call.kind {
    ASTExpressionKind::Call { callee, args } => ParameterInsight {
      overloads: evaluate_callee(callee, ctx).into_candidates(),
      current_argument: argument_index(args.iter().map(|a| a.span), caret),
    },
    ASTExpressionKind::New { ty, args } => {
      let constructed = strip_all(&resolve_type(ty, ctx));
      let overloads = match constructed.kind() {
        Some(TypeKind::UserDefined(user)) => constructors_of(&user.definition)
          .into_iter()
          .map(|ctor| SemanticResult::member(ctor, Some(constructed.clone())))
          .collect(),
        _ => Vec::new(),
      };
      ParameterInsight {
        overloads,
        current_argument: argument_index(args.iter().map(|a| a.span), caret),
      }
    },
    ASTExpressionKind::TemplateInstance(instance) => {
      let overloads = ctx
        .with_options(ResolutionOptions::NO_TEMPLATE_PARAMETER_DEDUCTION, |ctx| evaluate_type(call, ctx))
        .into_candidates();
      let spans = instance.args.iter().map(|arg| match arg {
        ASTTemplateArgument::Type(ty) => ty.span,
        ASTTemplateArgument::Value(value) => value.span,
      });
      ParameterInsight {
        overloads,
        current_argument: argument_index(spans, caret),
      }
    },
    _ => return None,
  };

  trace_dbg!(
    ctx.config(),
    DebugTrace::Completion,
    "{} overload(s), argument {}",
    insight.overloads.len(),
    insight.current_argument
  );
  Some(insight)
}

/// Number of arguments that end before the caret without containing it.
fn argument_index(
  spans: impl Iterator<Item = sema_ast::Span>,
  caret: BytePosition,
) -> usize {
  spans.take_while(|span| !span.contains(caret) && span.ends_before(caret)).count()
}

/// Inside a class body, offers an `override` stub for every base method that
/// can still be overridden.
pub fn complete_overrides(
  class: &DeclRef,
  ctx: &mut ResolutionContext,
  gen: &mut dyn CompletionDataGenerator,
) {
  if !ctx.config().completion.show_override_items || class.as_aggregate().is_none() {
    return;
  }

  let mut offered: HashSet<Name> = class
    .scope()
    .children()
    .into_iter()
    .filter(|member| member.as_function().is_some())
    .map(|member| member.name.clone())
    .collect();
  let mut visited: HashSet<NodeId> = HashSet::from([class.id]);
  let mut pending = base_class_definitions(class, ctx);

  while !pending.is_empty() {
    let mut next = Vec::new();
    for base in pending {
      if !visited.insert(base.id) {
        continue;
      }
      for method in base.scope().children() {
        if !is_overridable(&method) || !offered.insert(method.name.clone()) {
          continue;
        }
        gen.add_code_generating_item(&method, &override_stub(&method));
      }
      next.extend(base_class_definitions(&base, ctx));
    }
    pending = next;
  }
}

fn is_overridable(method: &DeclRef) -> bool {
  let Some(function) = method.as_function() else {
    return false;
  };
  function.kind == sema_ast::declarations::FunctionKind::Normal
    && !method
      .attributes
      .intersects(DeclAttributes::PRIVATE | DeclAttributes::FINAL | DeclAttributes::STATIC)
}

fn override_stub(method: &DeclRef) -> String {
  let Some(function) = method.as_function() else {
    return String::new();
  };

  let return_type = function
    .return_type
    .as_ref()
    .map(|ty| ty.to_string())
    .unwrap_or_else(|| "auto".to_string());
  let params: Vec<String> = function
    .params
    .iter()
    .map(|param| match param.as_variable().and_then(|v| v.ty.as_ref()) {
      Some(ty) => format!("{} {}", ty, param.name),
      None => param.name.to_string(),
    })
    .collect();

  format!("override {} {}({})", return_type, method.name, params.join(", "))
}

/// Attributes after `@`.
pub fn complete_attributes(gen: &mut dyn CompletionDataGenerator) {
  for attribute in PROPERTY_ATTRIBUTES {
    gen.add_property_attribute(attribute);
  }
}

pub fn complete_statement_keywords(gen: &mut dyn CompletionDataGenerator) {
  for keyword in STATEMENT_KEYWORDS {
    gen.add_token(keyword);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use sema_ast::declarations::{ASTAggregate, ASTDeclaration, ASTDeclarationKind, ASTFunction, AggregateKind};
  use sema_ast::types::{ASTType, PrimitiveKind};
  use sema_ast::{ModulePackage, ParseCacheView, Span};
  use sema_config::SemaConfig;

  use super::*;

  fn context(scope: DeclRef) -> ResolutionContext {
    ResolutionContext::new(scope, ParseCacheView::default(), Arc::new(SemaConfig::silent()))
  }

  fn method(
    name: &str,
    start: u32,
    attributes: DeclAttributes,
  ) -> DeclRef {
    ASTDeclaration::new(
      name,
      Span::new(start, start + 5),
      ASTDeclarationKind::Function(ASTFunction::new(
        vec![ASTDeclaration::parameter("x", ASTType::primitive(PrimitiveKind::Int), None)],
        Some(ASTType::primitive(PrimitiveKind::Void)),
        None,
      )),
      attributes,
    )
  }

  fn class_hierarchy(module: &DeclRef) -> (DeclRef, DeclRef) {
    let base = ASTDeclaration::aggregate("Base", Span::new(0, 50), ASTAggregate::new(AggregateKind::Class));
    base.scope().add(method("draw", 1, DeclAttributes::NONE));
    base.scope().add(method("resize", 10, DeclAttributes::NONE));
    base.scope().add(method("id", 20, DeclAttributes::FINAL));
    base.scope().add(method("secret", 30, DeclAttributes::PRIVATE));

    let derived = ASTDeclaration::aggregate(
      "Derived",
      Span::new(60, 100),
      ASTAggregate::new(AggregateKind::Class).with_base_classes(vec![ASTType::identifier("Base")]),
    );
    derived.scope().add(method("draw", 61, DeclAttributes::OVERRIDE));

    module.scope().add(base.clone());
    module.scope().add(derived.clone());
    (base, derived)
  }

  #[test]
  fn test_overrides_skip_final_private_and_existing() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    let (_, derived) = class_hierarchy(&module);
    let mut ctx = context(module);
    let mut recorder = CompletionRecorder::new();

    complete_overrides(&derived, &mut ctx, &mut recorder);
    assert_eq!(recorder.labels(), vec!["resize".to_string()]);
    assert_eq!(recorder.items[0].detail(), "override void resize(int x)");
  }

  #[test]
  fn test_members_include_base_classes_once() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    class_hierarchy(&module);
    let mut ctx = context(module);
    let mut recorder = CompletionRecorder::new();

    complete_members(&ASTExpression::identifier("Derived"), &mut ctx, &mut recorder);
    let symbols: Vec<String> = recorder
      .items
      .iter()
      .filter(|item| matches!(item, CompletionItem::Symbol(_)))
      .map(|item| item.label())
      .collect();
    assert_eq!(symbols, vec!["draw", "resize", "id", "secret"]);
    assert!(recorder.labels().contains(&"sizeof".to_string()));
  }

  #[test]
  fn test_package_lists_sub_packages_and_modules() {
    let root = ModulePackage::new_root();
    let current = ASTDeclaration::module("app", vec![], Span::default());
    root.add_module(current.clone());
    root.add_module(ASTDeclaration::module("std.io", vec![], Span::default()));
    root.add_module(ASTDeclaration::module("std.net.http", vec![], Span::default()));
    let mut ctx = ResolutionContext::new(current, ParseCacheView::new(vec![root]), Arc::new(SemaConfig::silent()));
    let mut recorder = CompletionRecorder::new();

    complete_members(&ASTExpression::identifier("std"), &mut ctx, &mut recorder);
    let kinds: Vec<(&str, String)> = recorder.items.iter().map(|item| (item.kind(), item.label())).collect();
    assert_eq!(
      kinds,
      vec![("package", "net".to_string()), ("module", "io".to_string())]
    );
  }

  #[test]
  fn test_parameter_insight_counts_arguments() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    module.scope().add(ASTDeclaration::function(
      "f",
      Span::new(0, 5),
      ASTFunction::new(vec![], None, None),
    ));
    module.scope().add(ASTDeclaration::function(
      "f",
      Span::new(6, 10),
      ASTFunction::new(
        vec![ASTDeclaration::parameter("a", ASTType::primitive(PrimitiveKind::Int), None)],
        None,
        None,
      ),
    ));
    let mut ctx = context(module);

    let call = ASTExpression::call(
      ASTExpression::identifier("f").at(Span::new(20, 21)),
      vec![
        ASTExpression::int(1).at(Span::new(22, 23)),
        ASTExpression::int(2).at(Span::new(25, 26)),
      ],
    )
    .at(Span::new(20, 27));

    let insight = parameter_insight(&call, BytePosition(25), &mut ctx).expect("caret is inside the call");
    assert_eq!(insight.overloads.len(), 2);
    assert_eq!(insight.current_argument, 1);

    assert!(parameter_insight(&call, BytePosition(40), &mut ctx).is_none());
  }

  #[test]
  fn test_new_insight_offers_synthesized_constructor() {
    let module = ASTDeclaration::module("app", vec![], Span::default());
    module
      .scope()
      .add(ASTDeclaration::aggregate("Widget", Span::new(0, 10), ASTAggregate::new(AggregateKind::Class)));
    let mut ctx = context(module);

    let created = ASTExpression::new_instance(ASTType::identifier("Widget"), vec![]).at(Span::new(20, 32));
    let insight = parameter_insight(&created, BytePosition(31), &mut ctx).expect("caret is inside new");
    assert_eq!(insight.overloads.len(), 1);
    assert_eq!(insight.current_argument, 0);
  }

  #[test]
  fn test_attribute_and_keyword_tokens() {
    let mut recorder = CompletionRecorder::new();
    complete_attributes(&mut recorder);
    complete_statement_keywords(&mut recorder);

    assert_eq!(recorder.items.len(), PROPERTY_ATTRIBUTES.len() + STATEMENT_KEYWORDS.len());
    assert_eq!(recorder.items[0].kind(), "attribute");
    assert_eq!(recorder.items[PROPERTY_ATTRIBUTES.len()].label(), "if");
  }
}
