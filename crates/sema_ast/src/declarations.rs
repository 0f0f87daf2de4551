use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::expressions::ASTExpression;
use crate::metadata::DeclAttributes;
use crate::statements::ASTBlock;
use crate::types::ASTType;
use crate::{BytePosition, Name, NodeId, Scope, Span};

pub type DeclRef = Arc<ASTDeclaration>;

/// A named entity owned by exactly one enclosing scope.
///
/// The parent link is a weak handle so the tree never forms a reference
/// cycle. Equality is identity.
pub struct ASTDeclaration {
  pub id: NodeId,
  pub name: Name,
  pub span: Span,
  pub kind: ASTDeclarationKind,
  pub attributes: DeclAttributes,
  parent: RwLock<Weak<ASTDeclaration>>,
  scope: Scope,
}

pub enum ASTDeclarationKind {
  Module(ASTModule),
  Variable(ASTVariable),
  Function(ASTFunction),
  Aggregate(ASTAggregate),
  Enum(ASTEnum),
  EnumMember(ASTEnumMember),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASTImport {
  pub path: String,
  pub is_public: bool,
}

pub struct ASTModule {
  /// Fully qualified dotted module name.
  pub path: String,
  pub imports: Vec<ASTImport>,
}

pub struct ASTVariable {
  pub ty: Option<ASTType>,
  pub initializer: Option<ASTExpression>,
  pub is_alias: bool,
  pub is_variadic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
  Normal,
  Constructor,
  Destructor,
}

pub struct ASTFunction {
  pub template_params: Vec<Arc<ASTTemplateParameter>>,
  pub params: Vec<DeclRef>,
  pub return_type: Option<ASTType>,
  pub body: Option<Arc<ASTBlock>>,
  pub kind: FunctionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateKind {
  Class,
  Struct,
  Union,
  Interface,
  Template,
  MixinTemplate,
}

impl AggregateKind {
  pub fn keyword(&self) -> &'static str {
    match self {
      AggregateKind::Class => "class",
      AggregateKind::Struct => "struct",
      AggregateKind::Union => "union",
      AggregateKind::Interface => "interface",
      AggregateKind::Template => "template",
      AggregateKind::MixinTemplate => "mixin template",
    }
  }
}

pub struct ASTAggregate {
  pub kind: AggregateKind,
  pub template_params: Vec<Arc<ASTTemplateParameter>>,
  pub base_classes: Vec<ASTType>,
}

pub struct ASTEnum {
  pub base: Option<ASTType>,
}

pub struct ASTEnumMember {
  pub initializer: Option<ASTExpression>,
}

/// One parameter of a template declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASTTemplateParameter {
  pub id: NodeId,
  pub name: Name,
  pub span: Span,
  pub kind: ASTTemplateParameterKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ASTTemplateParameterKind {
  Type {
    specialization: Option<ASTType>,
    default: Option<ASTType>,
  },
  Value {
    ty: Option<ASTType>,
    specialization: Option<ASTExpression>,
    default: Option<ASTExpression>,
  },
  Alias {
    specialization: Option<ASTType>,
    default: Option<ASTType>,
  },
  Tuple,
}

impl ASTTemplateParameter {
  pub fn new(
    name: &str,
    kind: ASTTemplateParameterKind,
  ) -> Arc<Self> {
    Arc::new(Self {
      id: NodeId::fresh(),
      name: Name::new(name),
      span: Span::default(),
      kind,
    })
  }

  /// `T`
  pub fn type_param(name: &str) -> Arc<Self> {
    Self::new(
      name,
      ASTTemplateParameterKind::Type {
        specialization: None,
        default: None,
      },
    )
  }

  /// `T : pattern`
  pub fn specialized(
    name: &str,
    specialization: ASTType,
  ) -> Arc<Self> {
    Self::new(
      name,
      ASTTemplateParameterKind::Type {
        specialization: Some(specialization),
        default: None,
      },
    )
  }

  /// `T = default`
  pub fn with_default(
    name: &str,
    default: ASTType,
  ) -> Arc<Self> {
    Self::new(
      name,
      ASTTemplateParameterKind::Type {
        specialization: None,
        default: Some(default),
      },
    )
  }

  /// `ty name`
  pub fn value_param(
    name: &str,
    ty: ASTType,
  ) -> Arc<Self> {
    Self::new(
      name,
      ASTTemplateParameterKind::Value {
        ty: Some(ty),
        specialization: None,
        default: None,
      },
    )
  }

  pub fn tuple(name: &str) -> Arc<Self> {
    Self::new(name, ASTTemplateParameterKind::Tuple)
  }

  pub fn type_specialization(&self) -> Option<&ASTType> {
    match &self.kind {
      ASTTemplateParameterKind::Type { specialization, .. } | ASTTemplateParameterKind::Alias { specialization, .. } => {
        specialization.as_ref()
      },
      _ => None,
    }
  }

  pub fn has_specialization(&self) -> bool {
    match &self.kind {
      ASTTemplateParameterKind::Type { specialization, .. } | ASTTemplateParameterKind::Alias { specialization, .. } => {
        specialization.is_some()
      },
      ASTTemplateParameterKind::Value { specialization, .. } => specialization.is_some(),
      ASTTemplateParameterKind::Tuple => false,
    }
  }

  pub fn has_default(&self) -> bool {
    match &self.kind {
      ASTTemplateParameterKind::Type { default, .. } | ASTTemplateParameterKind::Alias { default, .. } => {
        default.is_some()
      },
      ASTTemplateParameterKind::Value { default, .. } => default.is_some(),
      ASTTemplateParameterKind::Tuple => false,
    }
  }

  pub fn is_type_parameter(&self) -> bool {
    matches!(
      self.kind,
      ASTTemplateParameterKind::Type { .. } | ASTTemplateParameterKind::Alias { .. }
    )
  }
}

impl ASTDeclaration {
  /// Allocates the declaration with a member scope owned by itself. Function
  /// parameters and body locals are re-parented to the new declaration.
  pub fn new(
    name: &str,
    span: Span,
    kind: ASTDeclarationKind,
    attributes: DeclAttributes,
  ) -> DeclRef {
    let decl = Arc::new_cyclic(|this: &Weak<ASTDeclaration>| Self {
      id: NodeId::fresh(),
      name: Name::new(name),
      span,
      kind,
      attributes,
      parent: RwLock::new(Weak::new()),
      scope: Scope::new(this.clone()),
    });

    if let ASTDeclarationKind::Function(function) = &decl.kind {
      let owner = Arc::downgrade(&decl);
      for param in &function.params {
        param.set_parent(owner.clone());
      }
      if let Some(body) = &function.body {
        body.adopt(&owner);
      }
    }

    decl
  }

  pub fn module(
    path: &str,
    imports: Vec<ASTImport>,
    span: Span,
  ) -> DeclRef {
    let name = path.rsplit('.').next().unwrap_or(path);
    Self::new(
      name,
      span,
      ASTDeclarationKind::Module(ASTModule {
        path: path.to_string(),
        imports,
      }),
      DeclAttributes::NONE,
    )
  }

  pub fn variable(
    name: &str,
    ty: Option<ASTType>,
    initializer: Option<ASTExpression>,
    span: Span,
  ) -> DeclRef {
    Self::new(
      name,
      span,
      ASTDeclarationKind::Variable(ASTVariable {
        ty,
        initializer,
        is_alias: false,
        is_variadic: false,
      }),
      DeclAttributes::NONE,
    )
  }

  /// `alias name = ty;`
  pub fn alias(
    name: &str,
    ty: ASTType,
    span: Span,
  ) -> DeclRef {
    Self::new(
      name,
      span,
      ASTDeclarationKind::Variable(ASTVariable {
        ty: Some(ty),
        initializer: None,
        is_alias: true,
        is_variadic: false,
      }),
      DeclAttributes::NONE,
    )
  }

  pub fn parameter(
    name: &str,
    ty: ASTType,
    default: Option<ASTExpression>,
  ) -> DeclRef {
    Self::variable(name, Some(ty), default, Span::default())
  }

  pub fn variadic_parameter(
    name: &str,
    ty: ASTType,
  ) -> DeclRef {
    Self::new(
      name,
      Span::default(),
      ASTDeclarationKind::Variable(ASTVariable {
        ty: Some(ty),
        initializer: None,
        is_alias: false,
        is_variadic: true,
      }),
      DeclAttributes::NONE,
    )
  }

  pub fn function(
    name: &str,
    span: Span,
    function: ASTFunction,
  ) -> DeclRef {
    Self::new(name, span, ASTDeclarationKind::Function(function), DeclAttributes::NONE)
  }

  pub fn aggregate(
    name: &str,
    span: Span,
    aggregate: ASTAggregate,
  ) -> DeclRef {
    Self::new(name, span, ASTDeclarationKind::Aggregate(aggregate), DeclAttributes::NONE)
  }

  pub fn enumeration(
    name: &str,
    base: Option<ASTType>,
    span: Span,
  ) -> DeclRef {
    Self::new(name, span, ASTDeclarationKind::Enum(ASTEnum { base }), DeclAttributes::NONE)
  }

  pub fn enum_member(
    name: &str,
    initializer: Option<ASTExpression>,
    span: Span,
  ) -> DeclRef {
    Self::new(
      name,
      span,
      ASTDeclarationKind::EnumMember(ASTEnumMember { initializer }),
      DeclAttributes::NONE,
    )
  }

  pub fn parent(&self) -> Option<DeclRef> {
    self.parent.read().unwrap_or_else(PoisonError::into_inner).upgrade()
  }

  pub fn set_parent(
    &self,
    parent: Weak<ASTDeclaration>,
  ) {
    *self.parent.write().unwrap_or_else(PoisonError::into_inner) = parent;
  }

  /// Member scope: module members, aggregate members, enum members. Empty for other kinds.
  pub fn scope(&self) -> &Scope {
    &self.scope
  }

  /// The module this declaration lives in, itself for a module.
  pub fn node_root(self: &Arc<Self>) -> DeclRef {
    let mut current = self.clone();
    while let Some(parent) = current.parent() {
      current = parent;
    }
    current
  }

  pub fn as_module(&self) -> Option<&ASTModule> {
    match &self.kind {
      ASTDeclarationKind::Module(module) => Some(module),
      _ => None,
    }
  }

  pub fn as_variable(&self) -> Option<&ASTVariable> {
    match &self.kind {
      ASTDeclarationKind::Variable(var) => Some(var),
      _ => None,
    }
  }

  pub fn as_function(&self) -> Option<&ASTFunction> {
    match &self.kind {
      ASTDeclarationKind::Function(function) => Some(function),
      _ => None,
    }
  }

  pub fn as_aggregate(&self) -> Option<&ASTAggregate> {
    match &self.kind {
      ASTDeclarationKind::Aggregate(aggregate) => Some(aggregate),
      _ => None,
    }
  }

  pub fn is_module(&self) -> bool {
    matches!(self.kind, ASTDeclarationKind::Module(_))
  }

  pub fn is_alias(&self) -> bool {
    self.as_variable().map(|v| v.is_alias).unwrap_or(false)
  }

  pub fn is_constructor(&self) -> bool {
    self
      .as_function()
      .map(|f| f.kind == FunctionKind::Constructor)
      .unwrap_or(false)
  }

  /// Template parameters of a function or aggregate, empty otherwise.
  pub fn template_params(&self) -> &[Arc<ASTTemplateParameter>] {
    match &self.kind {
      ASTDeclarationKind::Function(function) => &function.template_params,
      ASTDeclarationKind::Aggregate(aggregate) => &aggregate.template_params,
      _ => &[],
    }
  }

  pub fn is_template(&self) -> bool {
    !self.template_params().is_empty()
      || matches!(
        &self.kind,
        ASTDeclarationKind::Aggregate(ASTAggregate {
          kind: AggregateKind::Template | AggregateKind::MixinTemplate,
          ..
        })
      )
  }

  /// Blocks of a function body enclosing `pos`, innermost first.
  pub fn blocks_at(
    &self,
    pos: BytePosition,
  ) -> Vec<Arc<ASTBlock>> {
    match self.as_function().and_then(|f| f.body.as_ref()) {
      Some(body) => body.chain_at(pos),
      None => Vec::new(),
    }
  }

  /// Dotted path of the enclosing declarations, module first.
  pub fn qualified_name(self: &Arc<Self>) -> String {
    let mut parts = vec![self.name.to_string()];
    let mut current = self.parent();
    while let Some(decl) = current {
      match decl.as_module() {
        Some(module) => {
          parts.push(module.path.clone());
          break;
        },
        None => parts.push(decl.name.to_string()),
      }
      current = decl.parent();
    }
    parts.reverse();
    parts.join(".")
  }
}

impl ASTFunction {
  pub fn new(
    params: Vec<DeclRef>,
    return_type: Option<ASTType>,
    body: Option<Arc<ASTBlock>>,
  ) -> Self {
    Self {
      template_params: Vec::new(),
      params,
      return_type,
      body,
      kind: FunctionKind::Normal,
    }
  }

  pub fn with_template_params(
    mut self,
    template_params: Vec<Arc<ASTTemplateParameter>>,
  ) -> Self {
    self.template_params = template_params;
    self
  }

  pub fn constructor(
    params: Vec<DeclRef>,
    body: Option<Arc<ASTBlock>>,
  ) -> Self {
    Self {
      template_params: Vec::new(),
      params,
      return_type: None,
      body,
      kind: FunctionKind::Constructor,
    }
  }

  /// Smallest and largest (None when variadic) number of call arguments accepted.
  pub fn arity(&self) -> (usize, Option<usize>) {
    let mut required = 0;
    for param in &self.params {
      match param.as_variable() {
        Some(var) if var.is_variadic => return (required, None),
        Some(var) if var.initializer.is_some() => {},
        _ => required += 1,
      }
    }
    (required, Some(self.params.len()))
  }
}

impl ASTAggregate {
  pub fn new(kind: AggregateKind) -> Self {
    Self {
      kind,
      template_params: Vec::new(),
      base_classes: Vec::new(),
    }
  }

  pub fn with_template_params(
    mut self,
    template_params: Vec<Arc<ASTTemplateParameter>>,
  ) -> Self {
    self.template_params = template_params;
    self
  }

  pub fn with_base_classes(
    mut self,
    base_classes: Vec<ASTType>,
  ) -> Self {
    self.base_classes = base_classes;
    self
  }
}

impl PartialEq for ASTDeclaration {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    std::ptr::eq(self, other)
  }
}

impl Eq for ASTDeclaration {}

impl fmt::Debug for ASTDeclaration {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let kind = match &self.kind {
      ASTDeclarationKind::Module(_) => "module",
      ASTDeclarationKind::Variable(v) if v.is_alias => "alias",
      ASTDeclarationKind::Variable(_) => "variable",
      ASTDeclarationKind::Function(_) => "function",
      ASTDeclarationKind::Aggregate(a) => a.kind.keyword(),
      ASTDeclarationKind::Enum(_) => "enum",
      ASTDeclarationKind::EnumMember(_) => "enum member",
    };
    write!(f, "{} {}{}", kind, self.name, self.id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::statements::ASTStatement;

  #[test]
  fn test_function_adopts_params_and_locals() {
    let param = ASTDeclaration::parameter("a", ASTType::identifier("int"), None);
    let local = ASTDeclaration::variable("x", Some(ASTType::identifier("int")), None, Span::new(12, 18));
    let body = ASTBlock::new(Span::new(10, 40), vec![ASTStatement::declaration(local.clone())]);
    let function = ASTDeclaration::function(
      "f",
      Span::new(0, 40),
      ASTFunction::new(vec![param.clone()], None, Some(body.clone())),
    );

    assert!(Arc::ptr_eq(&param.parent().unwrap(), &function));
    assert!(Arc::ptr_eq(&local.parent().unwrap(), &function));
    assert!(Arc::ptr_eq(&body.scope().owner().unwrap(), &function));
  }

  #[test]
  fn test_qualified_name_and_root() {
    let module = ASTDeclaration::module("std.range", vec![], Span::default());
    let class = ASTDeclaration::aggregate("Range", Span::default(), ASTAggregate::new(AggregateKind::Class));
    module.scope().add(class.clone());
    let method = ASTDeclaration::function("front", Span::default(), ASTFunction::new(vec![], None, None));
    class.scope().add(method.clone());

    assert_eq!(module.name.as_str(), "range");
    assert_eq!(method.qualified_name(), "std.range.Range.front");
    assert!(Arc::ptr_eq(&method.node_root(), &module));
  }

  #[test]
  fn test_arity_with_defaults_and_variadics() {
    let f = ASTFunction::new(
      vec![
        ASTDeclaration::parameter("a", ASTType::identifier("int"), None),
        ASTDeclaration::parameter("b", ASTType::identifier("int"), Some(ASTExpression::int(1))),
      ],
      None,
      None,
    );
    assert_eq!(f.arity(), (1, Some(2)));

    let g = ASTFunction::new(
      vec![
        ASTDeclaration::parameter("a", ASTType::identifier("int"), None),
        ASTDeclaration::variadic_parameter("rest", ASTType::array(ASTType::identifier("int"))),
      ],
      None,
      None,
    );
    assert_eq!(g.arity(), (1, None));
  }
}
