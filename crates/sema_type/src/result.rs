use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sema_ast::declarations::{ASTTemplateParameter, AggregateKind};
use sema_ast::metadata::ParamAttributes;
use sema_ast::types::{PrimitiveKind, TypeModifier};
use sema_ast::{DeclRef, ModulePackage, Name};

use crate::value::{ConstValue, SymbolValue};

/// Template parameter name to the result it was deduced as.
pub type TemplateBindings = BTreeMap<Name, SemanticResult>;

#[derive(Debug, Clone, PartialEq)]
pub enum SemanticResult {
  Type(AbstractType),
  Value(SymbolValue),
  Ambiguous(Vec<SemanticResult>),
  Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbstractType {
  pub kind: TypeKind,
  pub modifier: Option<TypeModifier>,
  /// Set on free functions found by call-syntax extension lookup.
  pub tag: Option<UfcsTag>,
}

/// Marks a candidate reached through `value.f(...)` rewriting; `first_argument` is `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct UfcsTag {
  pub first_argument: Box<SemanticResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
  Primitive(PrimitiveKind),
  Null,
  Pointer(Box<SemanticResult>),
  Array {
    element: Box<SemanticResult>,
    fixed_length: Option<u64>,
  },
  AssocArray {
    value: Box<SemanticResult>,
    key: Box<SemanticResult>,
  },
  Delegate(DelegateType),
  Vector(Box<SemanticResult>),
  Tuple(Vec<SemanticResult>),
  UserDefined(UserDefinedType),
  Alias(AliasType),
  Member(MemberSymbol),
  TemplateParameter(TemplateParameterSymbol),
  /// Result of indexing; wraps the element type.
  ArrayAccess(Box<SemanticResult>),
  /// Result of calling a delegate value; wraps the return type.
  DelegateCall(Box<SemanticResult>),
  Module(DeclRef),
  Package(Arc<ModulePackage>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateType {
  pub return_type: Box<SemanticResult>,
  pub params: Vec<SemanticResult>,
  pub param_attributes: Vec<ParamAttributes>,
  pub is_function: bool,
  /// Function declaration this delegate type was taken from, if any.
  pub definition: Option<DeclRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserTypeKind {
  Class,
  Struct,
  Union,
  Interface,
  Template,
  MixinTemplate,
  Enum,
}

impl From<AggregateKind> for UserTypeKind {
  fn from(kind: AggregateKind) -> Self {
    match kind {
      AggregateKind::Class => UserTypeKind::Class,
      AggregateKind::Struct => UserTypeKind::Struct,
      AggregateKind::Union => UserTypeKind::Union,
      AggregateKind::Interface => UserTypeKind::Interface,
      AggregateKind::Template => UserTypeKind::Template,
      AggregateKind::MixinTemplate => UserTypeKind::MixinTemplate,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserDefinedType {
  pub kind: UserTypeKind,
  pub definition: DeclRef,
  /// Base class of a class, base type of an enum.
  pub base: Option<Box<SemanticResult>>,
  pub interfaces: Vec<SemanticResult>,
  pub deduced: TemplateBindings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasType {
  pub definition: DeclRef,
  /// `None` when the aliased type could not be resolved (or its resolution cycled).
  pub base: Option<Box<SemanticResult>>,
}

/// Reference to a variable, parameter or function; `base` is its declared
/// (or return) type. A constructor reference carries the constructed type.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSymbol {
  pub definition: DeclRef,
  pub base: Option<Box<SemanticResult>>,
  pub deduced: TemplateBindings,
}

impl MemberSymbol {
  pub fn is_constructor(&self) -> bool {
    self.definition.is_constructor()
  }
}

/// A template parameter, bound to `base` once deduced.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParameterSymbol {
  pub parameter: Arc<ASTTemplateParameter>,
  pub base: Option<Box<SemanticResult>>,
}

impl AbstractType {
  pub fn new(kind: TypeKind) -> Self {
    Self {
      kind,
      modifier: None,
      tag: None,
    }
  }

  pub fn with_modifier(
    mut self,
    modifier: Option<TypeModifier>,
  ) -> Self {
    self.modifier = modifier;
    self
  }

  /// `immutable(kind)[]`
  pub fn char_string(kind: PrimitiveKind) -> Self {
    let element = AbstractType::new(TypeKind::Primitive(kind)).with_modifier(Some(TypeModifier::Immutable));
    Self::new(TypeKind::Array {
      element: Box::new(SemanticResult::Type(element)),
      fixed_length: None,
    })
  }

  /// Declaration behind user types, aliases, members and modules.
  pub fn definition(&self) -> Option<&DeclRef> {
    match &self.kind {
      TypeKind::UserDefined(t) => Some(&t.definition),
      TypeKind::Alias(t) => Some(&t.definition),
      TypeKind::Member(t) => Some(&t.definition),
      TypeKind::Module(m) => Some(m),
      TypeKind::Delegate(d) => d.definition.as_ref(),
      _ => None,
    }
  }

  pub fn deduced(&self) -> Option<&TemplateBindings> {
    match &self.kind {
      TypeKind::UserDefined(t) => Some(&t.deduced),
      TypeKind::Member(t) => Some(&t.deduced),
      _ => None,
    }
  }
}

impl SemanticResult {
  pub fn of(kind: TypeKind) -> Self {
    SemanticResult::Type(AbstractType::new(kind))
  }

  pub fn primitive(kind: PrimitiveKind) -> Self {
    Self::of(TypeKind::Primitive(kind))
  }

  pub fn pointer_to(target: SemanticResult) -> Self {
    Self::of(TypeKind::Pointer(Box::new(target)))
  }

  pub fn array_of(element: SemanticResult) -> Self {
    Self::of(TypeKind::Array {
      element: Box::new(element),
      fixed_length: None,
    })
  }

  pub fn fixed_array_of(
    element: SemanticResult,
    length: u64,
  ) -> Self {
    Self::of(TypeKind::Array {
      element: Box::new(element),
      fixed_length: Some(length),
    })
  }

  /// `immutable(char)[]`
  pub fn string_type() -> Self {
    Self::char_string(PrimitiveKind::Char)
  }

  pub fn char_string(kind: PrimitiveKind) -> Self {
    SemanticResult::Type(AbstractType::char_string(kind))
  }

  pub fn value(
    value: ConstValue,
    ty: AbstractType,
  ) -> Self {
    SemanticResult::Value(SymbolValue::new(value, ty))
  }

  pub fn int_value(value: i64) -> Self {
    Self::value(ConstValue::Int(value), AbstractType::new(TypeKind::Primitive(PrimitiveKind::Int)))
  }

  pub fn member(
    definition: DeclRef,
    base: Option<SemanticResult>,
  ) -> Self {
    Self::of(TypeKind::Member(MemberSymbol {
      definition,
      base: base.map(Box::new),
      deduced: TemplateBindings::new(),
    }))
  }

  /// Collapses a candidate list: nested sets are flattened and unknowns dropped.
  pub fn from_candidates(candidates: Vec<SemanticResult>) -> Self {
    let mut flat = Vec::new();
    for candidate in candidates {
      match candidate {
        SemanticResult::Ambiguous(inner) => flat.extend(inner.into_iter().filter(|c| !c.is_unknown())),
        SemanticResult::Unknown => {},
        other => flat.push(other),
      }
    }

    match flat.len() {
      0 => SemanticResult::Unknown,
      1 => flat.remove(0),
      _ => SemanticResult::Ambiguous(flat),
    }
  }

  /// Applies `f` to every candidate of an ambiguous set and re-wraps the outputs.
  pub fn map(
    self,
    f: &mut impl FnMut(SemanticResult) -> SemanticResult,
  ) -> SemanticResult {
    match self {
      SemanticResult::Ambiguous(candidates) => {
        SemanticResult::Ambiguous(candidates.into_iter().map(|c| c.map(&mut *f)).collect())
      },
      other => f(other),
    }
  }

  pub fn is_unknown(&self) -> bool {
    matches!(self, SemanticResult::Unknown)
  }

  pub fn is_ambiguous(&self) -> bool {
    matches!(self, SemanticResult::Ambiguous(_))
  }

  pub fn as_type(&self) -> Option<&AbstractType> {
    match self {
      SemanticResult::Type(t) => Some(t),
      _ => None,
    }
  }

  pub fn kind(&self) -> Option<&TypeKind> {
    self.as_type().map(|t| &t.kind)
  }

  /// Single candidates as a one-element list, sets as their members.
  pub fn candidates(&self) -> Vec<&SemanticResult> {
    match self {
      SemanticResult::Ambiguous(candidates) => candidates.iter().collect(),
      SemanticResult::Unknown => Vec::new(),
      other => vec![other],
    }
  }

  pub fn into_candidates(self) -> Vec<SemanticResult> {
    match self {
      SemanticResult::Ambiguous(candidates) => candidates,
      SemanticResult::Unknown => Vec::new(),
      other => vec![other],
    }
  }

  pub fn definition(&self) -> Option<&DeclRef> {
    self.as_type().and_then(|t| t.definition())
  }

  pub fn tag(&self) -> Option<&UfcsTag> {
    self.as_type().and_then(|t| t.tag.as_ref())
  }

  pub fn with_tag(
    self,
    first_argument: SemanticResult,
  ) -> SemanticResult {
    match self {
      SemanticResult::Type(mut t) => {
        t.tag = Some(UfcsTag {
          first_argument: Box::new(first_argument),
        });
        SemanticResult::Type(t)
      },
      other => other,
    }
  }

  pub fn as_value(&self) -> Option<&SymbolValue> {
    match self {
      SemanticResult::Value(v) => Some(v),
      _ => None,
    }
  }

  /// The type of a value, the result itself otherwise.
  pub fn type_of(&self) -> SemanticResult {
    match self {
      SemanticResult::Value(v) => SemanticResult::Type(v.ty.clone()),
      other => other.clone(),
    }
  }
}

fn write_bindings(
  f: &mut fmt::Formatter<'_>,
  deduced: &TemplateBindings,
) -> fmt::Result {
  if deduced.is_empty() {
    return Ok(());
  }
  write!(f, "!(")?;
  for (i, value) in deduced.values().enumerate() {
    if i > 0 {
      write!(f, ", ")?;
    }
    write!(f, "{}", value)?;
  }
  write!(f, ")")
}

fn write_boxed(
  f: &mut fmt::Formatter<'_>,
  inner: &Option<Box<SemanticResult>>,
) -> fmt::Result {
  match inner {
    Some(inner) => write!(f, "{}", inner),
    None => write!(f, "?"),
  }
}

impl fmt::Display for AbstractType {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    if let Some(modifier) = self.modifier {
      write!(f, "{}(", modifier.keyword())?;
    }

    match &self.kind {
      TypeKind::Primitive(kind) => write!(f, "{}", kind.keyword())?,
      TypeKind::Null => write!(f, "typeof(null)")?,
      TypeKind::Pointer(inner) => write!(f, "{}*", inner)?,
      TypeKind::Array { element, fixed_length } => match fixed_length {
        Some(len) => write!(f, "{}[{}]", element, len)?,
        None => write!(f, "{}[]", element)?,
      },
      TypeKind::AssocArray { value, key } => write!(f, "{}[{}]", value, key)?,
      TypeKind::Delegate(delegate) => {
        let keyword = if delegate.is_function { "function" } else { "delegate" };
        write!(f, "{} {}(", delegate.return_type, keyword)?;
        for (i, param) in delegate.params.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", param)?;
        }
        write!(f, ")")?;
      },
      TypeKind::Vector(inner) => write!(f, "__vector({})", inner)?,
      TypeKind::Tuple(items) => {
        write!(f, "(")?;
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", item)?;
        }
        write!(f, ")")?;
      },
      TypeKind::UserDefined(t) => {
        write!(f, "{}", t.definition.name)?;
        write_bindings(f, &t.deduced)?;
      },
      TypeKind::Alias(t) => {
        write!(f, "{} = ", t.definition.name)?;
        write_boxed(f, &t.base)?;
      },
      TypeKind::Member(t) => {
        write!(f, "{}", t.definition.name)?;
        write_bindings(f, &t.deduced)?;
        write!(f, " : ")?;
        write_boxed(f, &t.base)?;
      },
      TypeKind::TemplateParameter(t) => {
        write!(f, "{}", t.parameter.name)?;
        if let Some(base) = &t.base {
          write!(f, " = {}", base)?;
        }
      },
      TypeKind::ArrayAccess(inner) | TypeKind::DelegateCall(inner) => write!(f, "{}", inner)?,
      TypeKind::Module(m) => match m.as_module() {
        Some(module) => write!(f, "module {}", module.path)?,
        None => write!(f, "module {}", m.name)?,
      },
      TypeKind::Package(p) => write!(f, "package {}", p.path())?,
    }

    if self.modifier.is_some() {
      write!(f, ")")?;
    }
    Ok(())
  }
}

impl fmt::Display for SemanticResult {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      SemanticResult::Type(t) => write!(f, "{}", t),
      SemanticResult::Value(v) => write!(f, "{}", v.value),
      SemanticResult::Ambiguous(candidates) => {
        write!(f, "ambiguous(")?;
        for (i, c) in candidates.iter().enumerate() {
          if i > 0 {
            write!(f, " | ")?;
          }
          write!(f, "{}", c)?;
        }
        write!(f, ")")
      },
      SemanticResult::Unknown => write!(f, "<unknown>"),
    }
  }
}
