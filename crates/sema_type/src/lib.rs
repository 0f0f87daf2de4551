//! Resolved semantics of syntax nodes.
//!
//! A [`SemanticResult`] is a closed variant set: a type, a compile-time value,
//! an ambiguous set of candidates, or unknown. Wrapper kinds (pointer, array,
//! member reference, template parameter binding...) own their inner result;
//! links back to declarations are shared handles into the symbol table.

pub mod compare;
pub mod result;
pub mod strip;
pub mod value;

pub use compare::{is_equal, is_implicitly_convertible};
pub use result::{
  AbstractType, AliasType, DelegateType, MemberSymbol, SemanticResult, TemplateBindings, TemplateParameterSymbol,
  TypeKind, UfcsTag, UserDefinedType, UserTypeKind,
};
pub use strip::{strip_aliases, strip_all, strip_wrapper_layers};
pub use value::{ConstValue, SymbolValue};
