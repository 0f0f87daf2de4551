mod common;

use std::sync::Arc;

use sema_ast::declarations::{ASTDeclaration, ASTFunction, ASTTemplateParameter};
use sema_ast::types::{ASTType, PrimitiveKind};
use sema_ast::{ASTExpression, DeclRef, Span};
use sema_resolver::completion::{complete_members, CompletionRecorder};
use sema_resolver::{evaluate_callee, evaluate_type, SemanticResult};

fn module_with_shout() -> (DeclRef, DeclRef) {
  let module = common::module("app");
  let shout = common::function(
    "shout",
    0,
    vec![("s", ASTType::identifier("string"))],
    ASTType::identifier("string"),
  );
  module.scope().add(shout.clone());
  module.scope().add(common::variable("text", ASTType::identifier("string"), 20));
  module.scope().add(common::variable("count", common::int(), 30));
  (module, shout)
}

#[test]
fn member_call_reaches_free_function() {
  let (module, shout) = module_with_shout();
  let mut ctx = common::context(module);

  let callee = evaluate_callee(&ASTExpression::member(ASTExpression::identifier("text"), "shout"), &mut ctx);
  assert!(Arc::ptr_eq(callee.definition().expect("shout is found"), &shout));

  let tagged = callee.tag().expect("tagged with the receiver");
  assert_eq!(
    tagged.first_argument.definition().map(|d| d.name.to_string()),
    Some("text".to_string())
  );

  let call = ASTExpression::call(ASTExpression::member(ASTExpression::identifier("text"), "shout"), vec![]);
  assert_eq!(evaluate_type(&call, &mut ctx), SemanticResult::string_type());
}

#[test]
fn unconvertible_receiver_gets_no_candidate() {
  let (module, _) = module_with_shout();
  let mut ctx = common::context(module);

  let callee = evaluate_callee(&ASTExpression::member(ASTExpression::identifier("count"), "shout"), &mut ctx);
  assert!(callee.tag().is_none());
  assert!(callee.definition().is_none());
}

#[test]
fn completion_lists_extension_functions_for_instances() {
  let (module, _) = module_with_shout();
  let mut ctx = common::context(module);
  let mut recorder = CompletionRecorder::new();

  complete_members(&ASTExpression::identifier("text"), &mut ctx, &mut recorder);
  let labels = recorder.labels();
  assert!(labels.contains(&"shout".to_string()));
  assert!(labels.contains(&"length".to_string()));

  let mut recorder = CompletionRecorder::new();
  complete_members(&ASTExpression::type_expression(ASTType::primitive(PrimitiveKind::Int)), &mut ctx, &mut recorder);
  assert!(!recorder.labels().contains(&"shout".to_string()));
}

#[test]
fn templated_function_reached_through_member_syntax() {
  let module = common::module("app");
  module.scope().add(ASTDeclaration::function(
    "front",
    Span::new(0, 10),
    ASTFunction::new(
      vec![ASTDeclaration::parameter("items", ASTType::array(ASTType::identifier("T")), None)],
      Some(ASTType::identifier("T")),
      None,
    )
    .with_template_params(vec![ASTTemplateParameter::type_param("T")]),
  ));
  module
    .scope()
    .add(common::variable("words", ASTType::array(ASTType::identifier("string")), 30));
  let mut ctx = common::context(module);

  let call = ASTExpression::call(ASTExpression::member(ASTExpression::identifier("words"), "front"), vec![]);
  assert_eq!(evaluate_type(&call, &mut ctx), SemanticResult::string_type());
  assert_eq!(ctx.depth(), 0);
}
