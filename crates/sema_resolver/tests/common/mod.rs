#![allow(dead_code)]

use std::sync::Arc;

use sema_ast::declarations::{
  ASTAggregate, ASTDeclaration, ASTFunction, ASTImport, ASTTemplateParameter, AggregateKind,
};
use sema_ast::statements::ASTStatement;
use sema_ast::types::{ASTType, PrimitiveKind};
use sema_ast::{ASTBlock, BytePosition, DeclRef, ModulePackage, ParseCacheView, Span};
use sema_config::SemaConfig;
use sema_resolver::ResolutionContext;

pub fn int() -> ASTType {
  ASTType::primitive(PrimitiveKind::Int)
}

pub fn long() -> ASTType {
  ASTType::primitive(PrimitiveKind::Long)
}

pub fn module(path: &str) -> DeclRef {
  ASTDeclaration::module(path, vec![], Span::default())
}

pub fn module_importing(
  path: &str,
  imports: &[&str],
) -> DeclRef {
  let imports = imports
    .iter()
    .map(|path| ASTImport {
      path: path.to_string(),
      is_public: false,
    })
    .collect();
  ASTDeclaration::module(path, imports, Span::default())
}

/// A root package holding `modules`, filed by their dotted paths.
pub fn cache_of(modules: &[&DeclRef]) -> ParseCacheView {
  let root = ModulePackage::new_root();
  for module in modules {
    root.add_module((*module).clone());
  }
  ParseCacheView::new(vec![root])
}

pub fn context(scope: DeclRef) -> ResolutionContext {
  ResolutionContext::new(scope, ParseCacheView::default(), Arc::new(SemaConfig::silent()))
}

pub fn context_in(
  scope: DeclRef,
  cache: ParseCacheView,
) -> ResolutionContext {
  ResolutionContext::new(scope, cache, Arc::new(SemaConfig::silent()))
}

pub fn context_at(
  scope: DeclRef,
  caret: u32,
) -> ResolutionContext {
  context(scope).at(BytePosition(caret))
}

pub fn variable(
  name: &str,
  ty: ASTType,
  start: u32,
) -> DeclRef {
  ASTDeclaration::variable(name, Some(ty), None, Span::new(start, start + 6))
}

pub fn local(decl: DeclRef) -> ASTStatement {
  ASTStatement::declaration(decl)
}

pub fn block(
  start: u32,
  end: u32,
  statements: Vec<ASTStatement>,
) -> ASTStatement {
  ASTStatement::block(ASTBlock::new(Span::new(start, end), statements))
}

/// A free function with one parameter per `(name, type)` pair and no body.
pub fn function(
  name: &str,
  start: u32,
  params: Vec<(&str, ASTType)>,
  return_type: ASTType,
) -> DeclRef {
  let params = params
    .into_iter()
    .map(|(name, ty)| ASTDeclaration::parameter(name, ty, None))
    .collect();
  ASTDeclaration::function(
    name,
    Span::new(start, start + 10),
    ASTFunction::new(params, Some(return_type), None),
  )
}

/// A function whose body is exactly `statements`, spanning `start..end`.
pub fn function_with_body(
  name: &str,
  start: u32,
  end: u32,
  statements: Vec<ASTStatement>,
) -> DeclRef {
  let body = ASTBlock::new(Span::new(start + 1, end), statements);
  ASTDeclaration::function(
    name,
    Span::new(start, end),
    ASTFunction::new(vec![], Some(ASTType::primitive(PrimitiveKind::Void)), Some(body)),
  )
}

pub fn template_class(
  name: &str,
  start: u32,
  params: Vec<Arc<ASTTemplateParameter>>,
) -> DeclRef {
  ASTDeclaration::aggregate(
    name,
    Span::new(start, start + 10),
    ASTAggregate::new(AggregateKind::Class).with_template_params(params),
  )
}
