mod common;

use std::sync::Arc;

use sema_ast::declarations::{ASTDeclaration, ASTFunction, ASTTemplateParameter};
use sema_ast::types::{ASTTemplateArgument, ASTType, PrimitiveKind};
use sema_ast::{ASTExpression, Name, Span};
use sema_resolver::{deduce_template, evaluate_type, resolve_type, SemanticResult};
use sema_type::TypeKind;

fn array_pattern() -> Arc<ASTTemplateParameter> {
  ASTTemplateParameter::specialized("T", ASTType::array(ASTType::identifier("T")))
}

#[test]
fn array_specialization_binds_element() {
  let module = common::module("app");
  let class = common::template_class("C", 0, vec![array_pattern()]);
  module.scope().add(class.clone());
  let mut ctx = common::context(module);

  let ints = SemanticResult::array_of(SemanticResult::primitive(PrimitiveKind::Int));
  let bindings = deduce_template(&class, &[ints], &mut ctx).expect("int[] fits T : T[]");
  assert_eq!(bindings.get(&Name::new("T")), Some(&SemanticResult::primitive(PrimitiveKind::Int)));

  assert!(deduce_template(&class, &[SemanticResult::primitive(PrimitiveKind::Int)], &mut ctx).is_none());
  assert_eq!(ctx.depth(), 0);
}

#[test]
fn more_specialized_overload_is_selected() {
  let module = common::module("app");
  module
    .scope()
    .add(common::template_class("C", 0, vec![ASTTemplateParameter::type_param("T")]));
  let specialized = common::template_class("C", 20, vec![array_pattern()]);
  module.scope().add(specialized.clone());
  let mut ctx = common::context(module);

  let instance = ASTType::template_instance(
    "C",
    vec![ASTTemplateArgument::Type(ASTType::array(common::int()))],
  );
  let resolved = resolve_type(&instance, &mut ctx);
  assert!(Arc::ptr_eq(resolved.definition().expect("a single instance"), &specialized));
  assert!(ctx.diagnostics().is_empty());

  let scalar = ASTType::template_instance("C", vec![ASTTemplateArgument::Type(common::int())]);
  let resolved = resolve_type(&scalar, &mut ctx);
  assert_eq!(
    resolved.as_type().and_then(|t| t.deduced()).and_then(|d| d.get(&Name::new("T")).cloned()),
    Some(SemanticResult::primitive(PrimitiveKind::Int))
  );
}

#[test]
fn implicit_instantiation_through_call() {
  let module = common::module("app");
  let front = ASTDeclaration::function(
    "front",
    Span::new(0, 10),
    ASTFunction::new(
      vec![ASTDeclaration::parameter("items", ASTType::array(ASTType::identifier("T")), None)],
      Some(ASTType::identifier("T")),
      None,
    )
    .with_template_params(vec![ASTTemplateParameter::type_param("T")]),
  );
  module.scope().add(front);
  module
    .scope()
    .add(common::variable("words", ASTType::array(ASTType::identifier("string")), 30));
  let mut ctx = common::context(module);

  let call = ASTExpression::call(ASTExpression::identifier("front"), vec![ASTExpression::identifier("words")]);
  let result = evaluate_type(&call, &mut ctx);
  assert_eq!(result, SemanticResult::string_type());
}

#[test]
fn value_parameter_takes_folded_constant() {
  let module = common::module("app");
  module.scope().add(common::template_class(
    "Buffer",
    0,
    vec![ASTTemplateParameter::value_param("N", common::int())],
  ));
  let mut ctx = common::context(module);

  let instance = ASTType::template_instance(
    "Buffer",
    vec![ASTTemplateArgument::Value(ASTExpression::binary(
      sema_ast::expressions::ASTBinaryOperator::Multiply,
      ASTExpression::int(4),
      ASTExpression::int(8),
    ))],
  );
  let resolved = resolve_type(&instance, &mut ctx);
  let Some(TypeKind::UserDefined(user)) = resolved.kind() else {
    panic!("expected an instance, got {}", resolved);
  };
  let bound = user.deduced.get(&Name::new("N")).and_then(|n| n.as_value()).and_then(|v| v.value.as_int());
  assert_eq!(bound, Some(32));
}
